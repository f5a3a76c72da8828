//! Driver for byte-oriented serial EEPROM devices on a shared I2C bus.
//!
//! The driver layers per-device state (device binding, address-word length,
//! write-settle time, and a reusable command buffer) on top of a
//! caller-supplied bus handle implementing [`bus::I2cBus`]. It owns the
//! transaction layout — address prefix followed by payload — and sequences
//! the combined write and write-then-read transactions these parts expect.
//!
//! EEPROM writes are self-timed: after a page write the device ignores the
//! bus for a few milliseconds while it commits the page. The driver exposes
//! that as an explicit [`eeprom::Eeprom::wait_idle`] step between a write
//! and any subsequent access, so callers keep control over scheduling.
//!
//! ```
//! use std::time::Duration;
//! use i2c_eeprom::{Eeprom, EepromConfig};
//! use i2c_eeprom::sim::SimBus;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), i2c_eeprom::EepromError> {
//! let bus = SimBus::new();
//! bus.install_device(0x50, Duration::from_millis(5));
//!
//! let mut eeprom = Eeprom::init(bus, &EepromConfig {
//!     device_address: 0x50,
//!     scl_speed_hz: 400_000,
//!     addr_word_len: 2,
//!     write_settle_ms: 5,
//! })
//! .await?;
//!
//! eeprom.write(0x10, &[0xde, 0xad, 0xbe, 0xef]).await?;
//! eeprom.wait_idle().await;
//!
//! let mut page = [0u8; 4];
//! eeprom.read(0x10, &mut page).await?;
//! assert_eq!(page, [0xde, 0xad, 0xbe, 0xef]);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod eeprom;
pub mod sim;
pub mod tracing;

pub use bus::{I2cBus, I2cDeviceConfig, I2cError};
pub use eeprom::{Eeprom, EepromConfig, EepromError, MAX_TRANSFER_UNIT, PAGE_SIZE};

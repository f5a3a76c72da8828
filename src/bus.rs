//! I2C bus abstraction the EEPROM driver is written against.
//!
//! The driver never talks to a bus controller directly. It consumes a bus
//! handle only to bind a device identity (address + clock speed), to run
//! combined transmit and transmit-then-receive transactions against that
//! binding, and to unbind it at teardown. Bus initialization, pin
//! assignment, and electrical timing belong to whoever implements this
//! trait.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a bus implementation.
#[derive(Debug, Error)]
pub enum I2cError {
    /// No acknowledgment from the device at the given address.
    #[error("no acknowledgment from device at address 0x{0:02x}")]
    NoAck(u8),

    /// The device rejected the transaction, typically because it is inside
    /// its self-timed write cycle.
    #[error("device busy, transaction rejected")]
    Busy,

    /// Bus arbitration lost to another controller.
    #[error("bus arbitration lost")]
    ArbitrationLost,

    /// Bus-level error (glitch, stuck line, controller fault).
    #[error("bus error")]
    Bus,

    /// Other bus-specific error.
    #[error("I2C error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, I2cError>;

/// Per-device bus parameters supplied when binding a device onto the bus.
#[derive(Debug, Clone, Copy)]
pub struct I2cDeviceConfig {
    /// 7-bit I2C address of the device.
    pub device_address: u8,

    /// SCL clock speed for transactions against this device, in Hz.
    pub scl_speed_hz: u32,
}

/// I2C bus handle abstraction.
///
/// Models controllers that keep per-device state: [`bind`](I2cBus::bind)
/// attaches a device identity and returns an opaque binding that every
/// transaction is issued against. Bus handle types are expected to be cheap
/// clones over shared controller state, so several drivers can bind devices
/// onto one bus; whether concurrent transactions from different handles are
/// safe is the implementation's guarantee to make.
///
/// A `timeout` of `None` means block until the transaction completes or
/// fails; there is no cancellation.
#[async_trait]
pub trait I2cBus: Send {
    /// Opaque per-device binding returned by [`bind`](I2cBus::bind).
    type Device: Send + Sync;

    /// Bind a device identity onto the bus.
    async fn bind(&mut self, config: &I2cDeviceConfig) -> Result<Self::Device>;

    /// Release a device binding.
    async fn unbind(&mut self, device: Self::Device) -> Result<()>;

    /// Transmit `bytes` to the device as one combined transaction.
    async fn transmit(
        &mut self,
        device: &Self::Device,
        bytes: &[u8],
        timeout: Option<Duration>,
    ) -> Result<()>;

    /// Transmit `tx`, then receive `rx.len()` bytes into `rx`, as one
    /// combined transaction (repeated start, no intervening stop).
    async fn transmit_receive(
        &mut self,
        device: &Self::Device,
        tx: &[u8],
        rx: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<()>;
}

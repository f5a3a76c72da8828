//! Serial EEPROM driver.
//!
//! Byte-oriented EEPROMs take address-prefixed transactions: a write is one
//! combined transmission of `[address, payload...]`, a read transmits the
//! address and receives the data under a repeated start. After a write the
//! device runs a self-timed internal write cycle during which it ignores
//! the bus; callers must run [`Eeprom::wait_idle`] between a write and any
//! subsequent access to the same device.

use std::time::Duration;

use thiserror::Error;

use crate::bus::{I2cBus, I2cDeviceConfig, I2cError};
use crate::tracing::prelude::*;

/// Largest payload a single transaction may carry. The command buffer is
/// sized against this at init and never grows.
pub const MAX_TRANSFER_UNIT: usize = 48;

/// Write granularity of the device. Writes must start on a page boundary;
/// the driver does not split transfers that would span one.
pub const PAGE_SIZE: u32 = 16;

/// Errors surfaced by the EEPROM driver.
#[derive(Debug, Error)]
pub enum EepromError {
    /// The device could not be bound onto the bus.
    #[error("failed to bind device 0x{address:02x} onto the bus: {source}")]
    Binding {
        address: u8,
        #[source]
        source: I2cError,
    },

    /// An underlying bus transaction failed.
    #[error("bus transaction failed: {0}")]
    Transaction(#[from] I2cError),

    /// The payload does not fit in a single transfer unit.
    #[error("payload of {len} bytes exceeds the 48-byte transfer unit")]
    PayloadTooLarge { len: usize },

    /// The target address does not start on a 16-byte page boundary.
    #[error("address {address:#06x} is not aligned to the 16-byte page")]
    MisalignedAddress { address: u32 },
}

/// Per-device driver configuration consumed by [`Eeprom::init`].
#[derive(Debug, Clone)]
pub struct EepromConfig {
    /// 7-bit I2C address of the device.
    pub device_address: u8,

    /// SCL clock speed for this device, in Hz.
    pub scl_speed_hz: u32,

    /// Number of bytes the device uses to encode a cell address. The
    /// command buffer is sized for it, but see the note on [`Eeprom`]
    /// about what is actually emitted on the wire.
    pub addr_word_len: usize,

    /// Duration of the device's self-timed write cycle, in milliseconds.
    /// Zero means [`Eeprom::wait_idle`] returns immediately.
    pub write_settle_ms: u64,
}

/// Handle to one EEPROM device bound onto a bus.
///
/// The handle owns a command buffer that every [`write`](Eeprom::write) and
/// [`read`](Eeprom::read) overwrites, so operations take `&mut self`;
/// callers sharing a device across tasks must serialize access to the
/// handle. Several handles may coexist on clones of the same bus handle.
///
/// Addressing note: only the low byte of the target address is emitted on
/// the wire, matching parts that select the high address bits through the
/// device address. `addr_word_len` sizes the command buffer for devices
/// with wider address words, but the transaction builder does not emit
/// multi-byte addresses; confirm the target part's addressing width before
/// widening it.
#[derive(Debug)]
pub struct Eeprom<B: I2cBus> {
    bus: B,
    device: B::Device,
    #[allow(dead_code)]
    addr_word_len: usize,
    write_settle_ms: u64,
    buf: Vec<u8>,
}

impl<B: I2cBus> Eeprom<B> {
    /// Bind a device onto `bus` and allocate its command buffer.
    ///
    /// On failure nothing stays bound; the bus handle is dropped with the
    /// error and can be recloned by the caller.
    pub async fn init(mut bus: B, config: &EepromConfig) -> Result<Self, EepromError> {
        let device_config = I2cDeviceConfig {
            device_address: config.device_address,
            scl_speed_hz: config.scl_speed_hz,
        };
        let device = bus
            .bind(&device_config)
            .await
            .map_err(|source| EepromError::Binding {
                address: config.device_address,
                source,
            })?;

        debug!(
            "bound EEPROM device 0x{:02x} (addr_word_len={}, write_settle_ms={})",
            config.device_address, config.addr_word_len, config.write_settle_ms
        );

        Ok(Self {
            bus,
            device,
            addr_word_len: config.addr_word_len,
            write_settle_ms: config.write_settle_ms,
            buf: vec![0u8; config.addr_word_len + MAX_TRANSFER_UNIT],
        })
    }

    /// Write `data` starting at `address`.
    ///
    /// One combined transmission of `data.len() + 1` bytes: the low address
    /// byte followed by the payload. `address` must start on a page
    /// boundary and `data` must fit in one transfer unit. Does not wait out
    /// the device's write cycle; call [`wait_idle`](Eeprom::wait_idle)
    /// before the next access.
    pub async fn write(&mut self, address: u32, data: &[u8]) -> Result<(), EepromError> {
        if data.len() > MAX_TRANSFER_UNIT {
            return Err(EepromError::PayloadTooLarge { len: data.len() });
        }
        if address % PAGE_SIZE != 0 {
            error!("write address {address:#06x} is not page-aligned");
            return Err(EepromError::MisalignedAddress { address });
        }

        self.buf[0] = (address & 0xff) as u8;
        self.buf[1..=data.len()].copy_from_slice(data);
        self.bus
            .transmit(&self.device, &self.buf[..data.len() + 1], None)
            .await?;
        Ok(())
    }

    /// Read `out.len()` bytes starting at `address`.
    ///
    /// Transmits the low address byte, then receives into `out`, as one
    /// combined transaction.
    pub async fn read(&mut self, address: u32, out: &mut [u8]) -> Result<(), EepromError> {
        if out.len() > MAX_TRANSFER_UNIT {
            return Err(EepromError::PayloadTooLarge { len: out.len() });
        }

        self.buf[0] = (address & 0xff) as u8;
        self.bus
            .transmit_receive(&self.device, &self.buf[..1], out, None)
            .await?;
        Ok(())
    }

    /// Wait out the device's self-timed write cycle.
    ///
    /// The device offers no ready signal, so this is a fixed conservative
    /// suspension for the configured settle time, not a poll.
    pub async fn wait_idle(&self) {
        tokio::time::sleep(Duration::from_millis(self.write_settle_ms)).await;
    }

    /// Release the device binding and hand the bus handle back.
    pub async fn close(self) -> Result<B, EepromError> {
        let Eeprom {
            mut bus, device, ..
        } = self;
        bus.unbind(device).await?;
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;
    use std::time::Duration;

    const DEVICE_ADDRESS: u8 = 0x50;

    async fn eeprom_on_sim(settle_ms: u64) -> (Eeprom<SimBus>, SimBus) {
        let bus = SimBus::new();
        bus.install_device(DEVICE_ADDRESS, Duration::from_millis(settle_ms));
        let config = EepromConfig {
            device_address: DEVICE_ADDRESS,
            scl_speed_hz: 400_000,
            addr_word_len: 2,
            write_settle_ms: settle_ms,
        };
        let eeprom = Eeprom::init(bus.clone(), &config)
            .await
            .expect("init against installed sim device");
        (eeprom, bus)
    }

    #[tokio::test]
    async fn write_wait_read_round_trips() {
        let (mut eeprom, _bus) = eeprom_on_sim(5).await;

        for (address, data) in [
            (0x00u32, &[0x01u8, 0x02, 0x03][..]),
            (0x10, &[0xff; 16][..]),
            (0x40, &[0xaa; 48][..]),
        ] {
            eeprom.write(address, data).await.unwrap();
            eeprom.wait_idle().await;

            let mut out = vec![0u8; data.len()];
            eeprom.read(address, &mut out).await.unwrap();
            assert_eq!(out, data);
        }
    }

    #[tokio::test]
    async fn init_fails_cleanly_when_device_missing() {
        let bus = SimBus::new();
        let config = EepromConfig {
            device_address: DEVICE_ADDRESS,
            scl_speed_hz: 400_000,
            addr_word_len: 2,
            write_settle_ms: 10,
        };

        let err = Eeprom::init(bus.clone(), &config).await.unwrap_err();
        assert!(matches!(
            err,
            EepromError::Binding {
                address: DEVICE_ADDRESS,
                source: I2cError::NoAck(DEVICE_ADDRESS),
            }
        ));
        assert_eq!(bus.bound_devices(), 0);
    }

    #[tokio::test]
    async fn oversized_transfers_are_rejected_before_bus_traffic() {
        let (mut eeprom, bus) = eeprom_on_sim(0).await;

        let data = [0u8; MAX_TRANSFER_UNIT + 1];
        let err = eeprom.write(0x10, &data).await.unwrap_err();
        assert!(matches!(err, EepromError::PayloadTooLarge { len } if len == MAX_TRANSFER_UNIT + 1));

        let mut out = [0u8; MAX_TRANSFER_UNIT + 1];
        let err = eeprom.read(0x10, &mut out).await.unwrap_err();
        assert!(matches!(err, EepromError::PayloadTooLarge { len } if len == MAX_TRANSFER_UNIT + 1));

        assert_eq!(bus.transactions(), 0);
    }

    #[tokio::test]
    async fn read_during_settle_window_is_rejected() {
        let (mut eeprom, _bus) = eeprom_on_sim(50).await;

        eeprom.write(0x10, &[1, 2, 3, 4]).await.unwrap();

        // No wait_idle: the device is still inside its write cycle.
        let mut out = [0u8; 4];
        let err = eeprom.read(0x10, &mut out).await.unwrap_err();
        assert!(matches!(err, EepromError::Transaction(I2cError::Busy)));
    }

    #[tokio::test]
    async fn misaligned_write_is_rejected() {
        let (mut eeprom, _bus) = eeprom_on_sim(0).await;

        eeprom.write(0x10, &[0x42]).await.unwrap();

        let err = eeprom.write(0x11, &[0x42]).await.unwrap_err();
        assert!(matches!(err, EepromError::MisalignedAddress { address: 0x11 }));
    }

    #[tokio::test]
    async fn zero_settle_time_needs_no_wait() {
        let (mut eeprom, _bus) = eeprom_on_sim(0).await;

        eeprom.write(0x20, &[9, 8, 7]).await.unwrap();

        // Settle window is zero-length; an immediate read must succeed.
        let mut out = [0u8; 3];
        eeprom.read(0x20, &mut out).await.unwrap();
        assert_eq!(out, [9, 8, 7]);
    }

    #[tokio::test]
    async fn two_byte_address_word_page_scenario() {
        let (mut eeprom, _bus) = eeprom_on_sim(10).await;

        let page = [
            2, 3, 5, 7, 0, 0, 7, 10, 0, 0, 0, 0, 0, 0, 0, 0x77,
        ];
        eeprom.write(0x10, &page).await.unwrap();
        eeprom.wait_idle().await;

        let mut out = [0u8; 16];
        eeprom.read(0x10, &mut out).await.unwrap();
        assert_eq!(out, page);
    }

    #[tokio::test]
    async fn close_unbinds_device() {
        let (eeprom, bus) = eeprom_on_sim(0).await;
        assert_eq!(bus.bound_devices(), 1);

        eeprom.close().await.unwrap();
        assert_eq!(bus.bound_devices(), 0);
    }
}

//! Simulated I2C bus with EEPROM device models.
//!
//! Synthesized devices rather than discovered hardware: tests and the demo
//! binary install an EEPROM model at an I2C address and drive the real
//! driver against it. The model keeps a persistent byte array and a settle
//! window after each write during which it rejects every transaction, the
//! way a real part ignores the bus during its self-timed write cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::bus::{I2cBus, I2cDeviceConfig, I2cError, Result};
use crate::tracing::prelude::*;

/// Cell capacity of a simulated device.
pub const SIM_MEMORY_SIZE: usize = 256;

/// Cloneable handle to a simulated bus. Clones share the same controller
/// state, so several drivers can bind devices onto one `SimBus`.
#[derive(Clone, Debug, Default)]
pub struct SimBus {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    devices: HashMap<u8, SimEeprom>,
    bound: u32,
    transactions: u64,
}

#[derive(Debug)]
struct SimEeprom {
    memory: Vec<u8>,
    settle: Duration,
    busy_until: Option<Instant>,
}

/// Device binding handed out by [`SimBus::bind`].
#[derive(Debug)]
pub struct SimDevice {
    address: u8,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an EEPROM model at `address` with the given write-settle
    /// duration. Binding an address with no installed device fails with
    /// [`I2cError::NoAck`].
    pub fn install_device(&self, address: u8, settle: Duration) {
        let mut inner = self.lock();
        inner.devices.insert(
            address,
            SimEeprom {
                memory: vec![0u8; SIM_MEMORY_SIZE],
                settle,
                busy_until: None,
            },
        );
    }

    /// Number of currently live device bindings.
    pub fn bound_devices(&self) -> u32 {
        self.lock().bound
    }

    /// Number of transactions the bus has carried.
    pub fn transactions(&self) -> u64 {
        self.lock().transactions
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("sim bus lock poisoned")
    }
}

impl Inner {
    fn device_mut(&mut self, address: u8) -> Result<&mut SimEeprom> {
        self.devices
            .get_mut(&address)
            .ok_or(I2cError::NoAck(address))
    }
}

impl SimEeprom {
    /// A device inside its write cycle ignores the bus entirely.
    fn check_idle(&mut self) -> Result<()> {
        match self.busy_until {
            Some(t) if Instant::now() < t => Err(I2cError::Busy),
            _ => {
                self.busy_until = None;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl I2cBus for SimBus {
    type Device = SimDevice;

    async fn bind(&mut self, config: &I2cDeviceConfig) -> Result<SimDevice> {
        let mut inner = self.lock();
        if !inner.devices.contains_key(&config.device_address) {
            return Err(I2cError::NoAck(config.device_address));
        }
        inner.bound += 1;
        trace!(
            "sim: bound device 0x{:02x} at {} Hz",
            config.device_address, config.scl_speed_hz
        );
        Ok(SimDevice {
            address: config.device_address,
        })
    }

    async fn unbind(&mut self, device: SimDevice) -> Result<()> {
        let mut inner = self.lock();
        inner.bound = inner.bound.saturating_sub(1);
        trace!("sim: unbound device 0x{:02x}", device.address);
        Ok(())
    }

    async fn transmit(
        &mut self,
        device: &SimDevice,
        bytes: &[u8],
        _timeout: Option<Duration>,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.transactions += 1;
        let dev = inner.device_mut(device.address)?;
        dev.check_idle()?;

        let (addr, payload) = bytes
            .split_first()
            .ok_or_else(|| I2cError::Other("empty transmission".into()))?;

        let start = *addr as usize;
        let len = dev.memory.len();
        for (offset, byte) in payload.iter().enumerate() {
            dev.memory[(start + offset) % len] = *byte;
        }

        if !payload.is_empty() && !dev.settle.is_zero() {
            dev.busy_until = Some(Instant::now() + dev.settle);
        }
        Ok(())
    }

    async fn transmit_receive(
        &mut self,
        device: &SimDevice,
        tx: &[u8],
        rx: &mut [u8],
        _timeout: Option<Duration>,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.transactions += 1;
        let dev = inner.device_mut(device.address)?;
        dev.check_idle()?;

        let start = *tx
            .first()
            .ok_or_else(|| I2cError::Other("empty transmission".into()))?
            as usize;
        let len = dev.memory.len();
        for (offset, slot) in rx.iter_mut().enumerate() {
            *slot = dev.memory[(start + offset) % len];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: u8 = 0x50;

    fn config() -> I2cDeviceConfig {
        I2cDeviceConfig {
            device_address: ADDRESS,
            scl_speed_hz: 400_000,
        }
    }

    #[tokio::test]
    async fn bind_requires_installed_device() {
        let mut bus = SimBus::new();
        let err = bus.bind(&config()).await.unwrap_err();
        assert!(matches!(err, I2cError::NoAck(ADDRESS)));

        bus.install_device(ADDRESS, Duration::ZERO);
        bus.bind(&config()).await.unwrap();
        assert_eq!(bus.bound_devices(), 1);
    }

    #[tokio::test]
    async fn settle_window_closes_after_configured_duration() {
        let mut bus = SimBus::new();
        bus.install_device(ADDRESS, Duration::from_millis(10));
        let device = bus.bind(&config()).await.unwrap();

        bus.transmit(&device, &[0x00, 0xab], None).await.unwrap();
        assert!(matches!(
            bus.transmit_receive(&device, &[0x00], &mut [0u8; 1], None)
                .await
                .unwrap_err(),
            I2cError::Busy
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut out = [0u8; 1];
        bus.transmit_receive(&device, &[0x00], &mut out, None)
            .await
            .unwrap();
        assert_eq!(out, [0xab]);
    }

    #[tokio::test]
    async fn unwritten_cells_read_back_as_zero() {
        let mut bus = SimBus::new();
        bus.install_device(ADDRESS, Duration::ZERO);
        let device = bus.bind(&config()).await.unwrap();

        bus.transmit(&device, &[0x20, 1, 2], None).await.unwrap();

        let mut out = [0xffu8; 4];
        bus.transmit_receive(&device, &[0x20], &mut out, None)
            .await
            .unwrap();
        assert_eq!(out, [1, 2, 0, 0]);
    }
}

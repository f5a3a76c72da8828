//! Write a one-page pattern to a simulated EEPROM, wait out the write
//! cycle, read it back, and hex-dump the result.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use i2c_eeprom::eeprom::{Eeprom, EepromConfig, PAGE_SIZE};
use i2c_eeprom::sim::SimBus;

/// EEPROM driver demo against a simulated bus
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target cell address (must be a multiple of the 16-byte page)
    #[arg(short, long, default_value_t = 0x10)]
    address: u32,

    /// I2C address of the device
    #[arg(long, default_value_t = 0x50)]
    device_address: u8,

    /// Post-write settle time in milliseconds
    #[arg(long, default_value_t = 10)]
    write_settle_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    i2c_eeprom::tracing::init();
    let args = Args::parse();

    let bus = SimBus::new();
    bus.install_device(
        args.device_address,
        Duration::from_millis(args.write_settle_ms),
    );

    let mut eeprom = Eeprom::init(
        bus,
        &EepromConfig {
            device_address: args.device_address,
            scl_speed_hz: 400_000,
            addr_word_len: 2,
            write_settle_ms: args.write_settle_ms,
        },
    )
    .await?;

    let mut page = [0u8; PAGE_SIZE as usize];
    page[0] = 2;
    page[1] = 3;
    page[2] = 5;
    page[3] = 0x07;
    page[6] = 0x07;
    page[7] = 0x0A;
    page[15] = 0x77;

    eeprom.write(args.address, &page).await?;
    // Needs wait for the EEPROM's self-timed write cycle, per datasheet.
    eeprom.wait_idle().await;

    let mut read_back = [0u8; PAGE_SIZE as usize];
    eeprom.read(args.address, &mut read_back).await?;

    for chunk in read_back.chunks(16) {
        let line: Vec<String> = chunk.iter().map(|b| format!("0x{b:02X}")).collect();
        println!("{}", line.join(" "));
    }

    eeprom.close().await?;
    Ok(())
}

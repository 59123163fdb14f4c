mod config;

use crate::config::Config;
use dotenv::dotenv;
use log::{debug, info};
use pisign_gpio::GpioOutput;
use pisign_gpio::delay::ThreadDelay;
use pisign_gpio::gpiod::GpiodDriver;
use pisign_gpio::lcd::hd44780::Hd44780Display;
use pisign_gpio::lcd::hd44780::driver::GpioHd44780Bus;
use std::env::var;
use std::thread;
use std::time::Duration;
use sysinfo::System;

/// 5x8 heart, uploaded to CGRAM slot 0 and appended to the message.
const HEART_GLYPH: [u8; 8] = [
    0b00000,
    0b01010,
    0b11111,
    0b11111,
    0b01110,
    0b00100,
    0b00000,
    0b00000,
];

fn parse_pin_list(pin_str: &str) -> eyre::Result<Vec<usize>> {
    Ok(pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?)
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "pisign starting on {}...",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    // Get pin numbers from env
    let e_pin_no: usize = var("PISIGN_LCD_PIN_E")?.parse()?;
    let rs_pin_no: usize = var("PISIGN_LCD_PIN_RS")?.parse()?;
    let rw_pin_no: Option<usize> = match var("PISIGN_LCD_PIN_RW") {
        Ok(s) => Some(s.parse()?),
        Err(_) => None,
    };
    let data_pin_nos = parse_pin_list(&var("PISIGN_LCD_PINS_DATA")?)?;

    info!(
        "LCD @ E: {}, RS: {}, RW: {:?}, Data: {:?}",
        e_pin_no, rs_pin_no, rw_pin_no, data_pin_nos
    );

    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    debug!("Initializing GPIO driver...");
    let chip_path = var("PISIGN_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LCD driver...");
    let pin_e = gpio.request_output(e_pin_no)?;
    let pin_rs = gpio.request_output(rs_pin_no)?;
    let pin_rw = match rw_pin_no {
        Some(no) => Some(gpio.request_output(no)?),
        None => None,
    };
    let delay = ThreadDelay;

    let data_bus_4;
    let data_bus_8;
    let mut bus = match data_pin_nos.len() {
        4 => {
            let pins: [usize; 4] = data_pin_nos
                .try_into()
                .map_err(|_| eyre::eyre!("Invalid number of data pins"))?;
            data_bus_4 = gpio.request_output_bus(pins)?;
            GpioHd44780Bus::new_4bit(
                &pin_rs,
                pin_rw.as_ref().map(|pin| pin as &dyn GpioOutput),
                &pin_e,
                &data_bus_4,
                &delay,
            )
        }
        8 => {
            let pins: [usize; 8] = data_pin_nos
                .try_into()
                .map_err(|_| eyre::eyre!("Invalid number of data pins"))?;
            data_bus_8 = gpio.request_output_bus(pins)?;
            GpioHd44780Bus::new_8bit(
                &pin_rs,
                pin_rw.as_ref().map(|pin| pin as &dyn GpioOutput),
                &pin_e,
                &data_bus_8,
                &delay,
            )
        }
        n => return Err(eyre::eyre!("Expected 4 or 8 data pins, got {}", n)),
    };

    let mut lcd = Hd44780Display::new(&mut bus, &delay, config.columns, config.lines);
    lcd.init()?;

    lcd.create_char(0, HEART_GLYPH)?;
    lcd.set_cursor(0, 0)?; // create_char leaves the address counter in CGRAM
    lcd.print(&config.message)?;
    lcd.write_byte(0)?;

    debug!("{:?} initialized.", lcd);

    info!("pisign initialized.");

    if config.scroll_ms == 0 {
        return Ok(());
    }

    info!("Starting scroll loop...");
    loop {
        thread::sleep(Duration::from_millis(config.scroll_ms));
        lcd.scroll_display_left()?;
    }
}

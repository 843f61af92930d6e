/*
 *  main.rs
 *
 *  ili9488-spi - serial TFT driver
 *	(c) 2020-26 Stuart Hunter
 *
 *	Bind a display, bring it up and drive it from control commands
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use env_logger::Env;
use log::{error, info, warn};

use ili9488_spi::config::{self, BusSettings, Cli, DisplaySettings};
use ili9488_spi::display::drivers::mock::MockBus;
use ili9488_spi::display::{
    BacklightLine, Color, ControlSurface, Controller, DeviceSession, Transport, WindowedSurface,
};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Settle time after the backlight comes on, before reset
const BACKLIGHT_SETTLE: Duration = Duration::from_millis(10);
const DEMO_PAUSE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    let (cfg, cli) = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_filter()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        println!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let settings = cfg.display_settings();
    info!(
        "Display {}x{} {:?} {:?} words",
        settings.width, settings.height, settings.pixel_format, settings.word_mode
    );

    match settings.bus.clone() {
        BusSettings::Mock => run_mock(&settings, &cli),
        BusSettings::Spi { bus, speed_hz, mode, reset_pin, backlight_pin } => {
            run_spi(&settings, &cli, &bus, speed_hz, mode, reset_pin, backlight_pin)
        }
    }
}

fn run_mock(settings: &DisplaySettings, cli: &Cli) -> Result<()> {
    info!("Dry run, bus traffic is recorded only");
    let bus = MockBus::new();
    let controller = Controller::new(
        bus.transport(settings.word_mode),
        bus.delay(),
        settings.word_mode,
        settings.pixel_format,
    )
    .with_reset(Box::new(bus.reset_line()));
    let session = DeviceSession::new(WindowedSurface::new(controller, settings.width, settings.height)?);

    let result = run_session(&session, Some(Box::new(bus.backlight())), cli);
    info!(
        "Dry run: {} transfers, {} commands, {} data words, {} windows",
        bus.send_calls(),
        bus.commands().len(),
        bus.data_count(),
        bus.windows().len()
    );
    result
}

#[cfg(feature = "spidev")]
fn run_spi(
    settings: &DisplaySettings,
    cli: &Cli,
    path: &str,
    speed_hz: u32,
    spi_mode: u8,
    reset_pin: Option<u64>,
    backlight_pin: Option<u64>,
) -> Result<()> {
    use ili9488_spi::display::drivers::gpio::{sysfs_output, PinBacklight, PinResetLine};
    use ili9488_spi::display::drivers::spidev::SpidevTransport;
    use linux_embedded_hal::Delay;

    let transport = SpidevTransport::open(path, speed_hz, spi_mode, settings.word_mode)?;
    let mut controller = Controller::new(transport, Delay, settings.word_mode, settings.pixel_format);
    if let Some(pin) = reset_pin {
        let line = PinResetLine::new(sysfs_output(pin)?, Delay);
        controller = controller.with_reset(Box::new(line));
        info!("Reset on GPIO {}", pin);
    } else {
        warn!("No reset line configured, relying on software reset");
    }

    let backlight: Option<Box<dyn BacklightLine>> = match backlight_pin {
        Some(pin) => Some(Box::new(PinBacklight::new(sysfs_output(pin)?))),
        None => None,
    };

    let session = DeviceSession::new(WindowedSurface::new(controller, settings.width, settings.height)?);
    run_session(&session, backlight, cli)
}

#[cfg(not(feature = "spidev"))]
fn run_spi(
    _settings: &DisplaySettings,
    _cli: &Cli,
    path: &str,
    _speed_hz: u32,
    _spi_mode: u8,
    _reset_pin: Option<u64>,
    _backlight_pin: Option<u64>,
) -> Result<()> {
    anyhow::bail!("built without the 'spidev' feature, cannot open {} (use --dry-run)", path)
}

/// Bring-up, optional demo, command processing, shutdown
fn run_session<T: Transport, D: DelayNs>(
    session: &DeviceSession<T, D>,
    mut backlight: Option<Box<dyn BacklightLine>>,
    cli: &Cli,
) -> Result<()> {
    if let Some(line) = backlight.as_mut() {
        line.set(true).context("switching backlight on")?;
        thread::sleep(BACKLIGHT_SETTLE);
    }

    if let Err(e) = session.initialize() {
        error!("Display initialization failed: {}", e);
        if let Some(line) = backlight.as_mut() {
            let _ = line.set(false);
        }
        return Err(e).context("initializing display");
    }
    info!("Display initialized");

    if cli.demo {
        let format = session.format();
        for name in ["red", "green", "blue"] {
            let color = Color::named(name, format)
                .with_context(|| format!("no {} in {:?}", name, format))?;
            session.fill(color).context("demo fill")?;
            info!("Demo fill {} (0x{:04X})", name, color.value());
            thread::sleep(DEMO_PAUSE);
        }
    }

    let mut control = ControlSurface::new(session, backlight);
    for line in &cli.commands {
        run_command(&mut control, line);
    }
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("reading stdin")?;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            run_command(&mut control, &line);
        }
    }

    if let Some(mut line) = control.into_backlight() {
        if let Err(e) = line.set(false) {
            warn!("Failed to switch backlight off: {}", e);
        }
    }
    info!("Display released");
    Ok(())
}

fn run_command<T: Transport, D: DelayNs>(control: &mut ControlSurface<'_, T, D>, line: &str) {
    match control.execute_line(line) {
        Ok(response) => println!("{}", response),
        Err(e) => {
            error!("'{}': {}", line.trim(), e);
            eprintln!("error: {}", e);
        }
    }
}

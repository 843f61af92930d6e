/*
 *  config.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration with command line overrides
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::display::codec::WordMode;
use crate::display::color::PixelFormat;

pub const DEFAULT_WIDTH: u16 = 320;
pub const DEFAULT_HEIGHT: u16 = 480;
pub const DEFAULT_SPI_BUS: &str = "/dev/spidev0.0";
pub const DEFAULT_SPEED_HZ: u32 = 1_000_000;
pub const DEFAULT_SPI_MODE: u8 = 3;
/// Largest side the controller's GRAM addresses
pub const MAX_DIMENSION: u16 = 480;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>, // e.g., "info" | "debug"
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub pixel_format: Option<PixelFormat>,
    pub word_mode: Option<WordMode>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    Spi {
        bus: String, // e.g. "/dev/spidev0.0"
        speed_hz: Option<u32>,
        mode: Option<u8>,
        reset_pin: Option<u64>,     // sysfs GPIO number
        backlight_pin: Option<u64>,
    },
    /// No hardware; traffic is recorded and summarised
    Mock,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig::Spi {
            bus: DEFAULT_SPI_BUS.to_string(),
            speed_hz: None,
            mode: None,
            reset_pin: None,
            backlight_pin: None,
        }
    }
}

/// Effective display settings with every default filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
    pub word_mode: WordMode,
    pub bus: BusSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusSettings {
    Spi {
        bus: String,
        speed_hz: u32,
        mode: u8,
        reset_pin: Option<u64>,
        backlight_pin: Option<u64>,
    },
    Mock,
}

impl Config {
    pub fn display_settings(&self) -> DisplaySettings {
        let d = self.display.clone().unwrap_or_default();
        let bus = match d.bus.unwrap_or_default() {
            BusConfig::Spi { bus, speed_hz, mode, reset_pin, backlight_pin } => BusSettings::Spi {
                bus,
                speed_hz: speed_hz.unwrap_or(DEFAULT_SPEED_HZ),
                mode: mode.unwrap_or(DEFAULT_SPI_MODE),
                reset_pin,
                backlight_pin,
            },
            BusConfig::Mock => BusSettings::Mock,
        };
        DisplaySettings {
            width: d.width.unwrap_or(DEFAULT_WIDTH),
            height: d.height.unwrap_or(DEFAULT_HEIGHT),
            pixel_format: d.pixel_format.unwrap_or_default(),
            word_mode: d.word_mode.unwrap_or_default(),
            bus,
        }
    }

    /// Filter string for env_logger
    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn parse_pixel_format(s: &str) -> Result<PixelFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "rgb111" | "3" => Ok(PixelFormat::Rgb111),
        "rgb565" | "16" => Ok(PixelFormat::Rgb565),
        _ => Err(format!("unknown pixel format '{}' (rgb111|rgb565)", s)),
    }
}

fn parse_word_mode(s: &str) -> Result<WordMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "native9" | "9" => Ok(WordMode::Native9),
        "emulated8" | "8" => Ok(WordMode::Emulated8),
        _ => Err(format!("unknown word mode '{}' (native9|emulated8)", s)),
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "ili9488", version, about = "ILI9488 3-wire SPI display tool")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub display_width: Option<u16>,
    #[arg(long)]
    pub display_height: Option<u16>,
    /// rgb111 (3 bpp, 8 colors) or rgb565
    #[arg(long, value_parser = parse_pixel_format)]
    pub pixel_format: Option<PixelFormat>,
    /// native9 (9-bit SPI words) or emulated8 (two 8-bit bytes per word)
    #[arg(long, value_parser = parse_word_mode)]
    pub word_mode: Option<WordMode>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub spi_bus: Option<String>,
    #[arg(long)]
    pub speed_hz: Option<u32>,
    #[arg(long)]
    pub spi_mode: Option<u8>,
    #[arg(long)]
    pub reset_pin: Option<u64>,
    #[arg(long)]
    pub backlight_pin: Option<u64>,
    /// Record bus traffic instead of touching hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
    /// Cycle red, green, blue after initialization
    #[arg(long, action = ArgAction::SetTrue)]
    pub demo: bool,
    /// Control command to run, e.g. -e "fill red" (repeatable)
    #[arg(short = 'e', long = "exec")]
    pub commands: Vec<String>,
    /// Read further control commands from stdin, one per line
    #[arg(long, action = ArgAction::SetTrue)]
    pub stdin: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Parse the command line, then load and merge configuration.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;
    Ok((cfg, cli))
}

/// defaults < YAML file < command line, then validate
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/ili9488/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/ili9488.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["ili9488.yaml", "config/ili9488.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()        { dst.width = src.width; }
    if src.height.is_some()       { dst.height = src.height; }
    if src.pixel_format.is_some() { dst.pixel_format = src.pixel_format; }
    if src.word_mode.is_some()    { dst.word_mode = src.word_mode; }
    if src.bus.is_some()          { dst.bus = src.bus; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug { cfg.log_level = Some("debug".into()); }

    let any_spi = cli.spi_bus.is_some()
        || cli.speed_hz.is_some()
        || cli.spi_mode.is_some()
        || cli.reset_pin.is_some()
        || cli.backlight_pin.is_some();
    let any_display = cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.pixel_format.is_some()
        || cli.word_mode.is_some()
        || any_spi
        || cli.dry_run;

    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    let Some(display) = cfg.display.as_mut() else { return };

    if cli.display_width.is_some()  { display.width = cli.display_width; }
    if cli.display_height.is_some() { display.height = cli.display_height; }
    if cli.pixel_format.is_some()   { display.pixel_format = cli.pixel_format; }
    if cli.word_mode.is_some()      { display.word_mode = cli.word_mode; }

    if cli.dry_run {
        display.bus = Some(BusConfig::Mock);
    } else if any_spi {
        // spi options on the command line imply a real bus
        if !matches!(display.bus, Some(BusConfig::Spi { .. })) {
            display.bus = Some(BusConfig::default());
        }
        if let Some(BusConfig::Spi { bus, speed_hz, mode, reset_pin, backlight_pin }) = display.bus.as_mut() {
            if let Some(b) = &cli.spi_bus         { *bus = b.clone(); }
            if cli.speed_hz.is_some()             { *speed_hz = cli.speed_hz; }
            if cli.spi_mode.is_some()             { *mode = cli.spi_mode; }
            if cli.reset_pin.is_some()            { *reset_pin = cli.reset_pin; }
            if cli.backlight_pin.is_some()        { *backlight_pin = cli.backlight_pin; }
        }
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let Some(display) = cfg.display.as_ref() else { return Ok(()) };

    for (name, v) in [("width", display.width), ("height", display.height)] {
        if let Some(v) = v {
            if v == 0 || v > MAX_DIMENSION {
                return Err(ConfigError::Validation(format!(
                    "display {} must be 1..={}, got {}", name, MAX_DIMENSION, v
                )));
            }
        }
    }

    if let Some(BusConfig::Spi { bus, speed_hz, mode, .. }) = display.bus.as_ref() {
        if bus.trim().is_empty() {
            return Err(ConfigError::Validation("spi bus path must not be empty".into()));
        }
        if *speed_hz == Some(0) {
            return Err(ConfigError::Validation("spi speed_hz must be > 0".into()));
        }
        if let Some(m) = mode {
            if *m > 3 {
                return Err(ConfigError::Validation("spi mode must be 0..=3".into()));
            }
        }
    }
    Ok(())
}

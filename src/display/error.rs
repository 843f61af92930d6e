/*
 *  display/error.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display subsystem
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

use std::fmt;
use std::error::Error;

/// Failure reported by a transport or control line.
///
/// The core never retries; this is carried back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TransportError {}

/// Which step of a multi-step command sequence was running when the
/// transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reset line toggling before the command sequence
    HardwareReset,

    /// Power-up command sequence
    Initialize,

    /// CASET / PASET / RAMWR
    WindowSet,

    /// Pixel data following RAMWR
    DataStream,

    /// DISPON / DISPOFF outside initialization
    Power,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::HardwareReset => "hardware reset",
            Phase::Initialize => "initialize",
            Phase::WindowSet => "window set",
            Phase::DataStream => "data stream",
            Phase::Power => "power",
        };
        f.write_str(name)
    }
}

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// Out-of-range color or zero-sized geometry
    InvalidArgument(String),

    /// Origin outside the screen extent
    OutOfBounds { x: u16, y: u16, width: u16, height: u16 },

    /// Transport failure; controller state is undefined until re-initialized
    Transport { phase: Phase, source: TransportError },

    /// Drawing requested before a successful initialize()
    ProtocolDesyncRisk,

    /// Invalid configuration
    InvalidConfiguration(String),

    /// SPI device could not be opened or configured
    SpiError(String),

    /// GPIO pin error
    GpioError(String),

    /// Unsupported operation for this display
    UnsupportedOperation,
}

impl DisplayError {
    pub(crate) fn transport(phase: Phase, source: TransportError) -> Self {
        DisplayError::Transport { phase, source }
    }

    /// True when the controller must be re-initialized before further use.
    pub fn requires_reinit(&self) -> bool {
        matches!(self, DisplayError::Transport { .. } | DisplayError::ProtocolDesyncRisk)
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InvalidArgument(msg) =>
                write!(f, "Invalid argument: {}", msg),
            DisplayError::OutOfBounds { x, y, width, height } =>
                write!(f, "Coordinates ({}, {}) outside {}x{} screen", x, y, width, height),
            DisplayError::Transport { phase, source } =>
                write!(f, "Transport error during {}: {}", phase, source),
            DisplayError::ProtocolDesyncRisk =>
                write!(f, "Display not initialized; run initialize() first"),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::SpiError(msg) =>
                write!(f, "SPI communication error: {}", msg),
            DisplayError::GpioError(msg) =>
                write!(f, "GPIO error: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

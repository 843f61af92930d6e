/*
 *  display/drivers/spidev.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux spidev transport for 3-wire (9-bit) SPI
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

use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::SpidevDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions, SpidevTransfer};

use crate::display::codec::{WireWord, WordMode};
use crate::display::error::{DisplayError, TransportError};
use crate::display::traits::Transport;

use log::info;

/// Most `spi_ioc_transfer`s one SPI_IOC_MESSAGE ioctl can carry
/// (14-bit ioctl size field / 32 bytes per transfer)
pub const MAX_TRANSFERS_PER_MESSAGE: usize = 511;

/// One spidev node.
///
/// Native 9-bit words go out as a single chip-select frame per `send`.
/// Emulated words must each sit in their own frame: the controller only
/// drops the 7 padding bits of the second byte when CS is released, so
/// every 2-byte pair is a separate transfer with CS toggled in between.
pub struct SpidevTransport {
    device: SpidevDevice,
    mode: WordMode,
    buf: Vec<u8>,
}

impl SpidevTransport {
    /// Open and configure a spidev node
    ///
    /// # Arguments
    ///
    /// * `spi_bus_path` - Path to SPI device (e.g., "/dev/spidev0.0")
    /// * `speed_hz` - Clock rate; 1 MHz is safe for 3-wire mode
    /// * `spi_mode` - Clock polarity/phase, 0..=3 (the ILI9488 wants 3)
    /// * `word_mode` - 9-bit native words or 8-bit emulation
    pub fn open(
        spi_bus_path: &str,
        speed_hz: u32,
        spi_mode: u8,
        word_mode: WordMode,
    ) -> Result<Self, DisplayError> {
        let flags = match spi_mode {
            0 => SpiModeFlags::SPI_MODE_0,
            1 => SpiModeFlags::SPI_MODE_1,
            2 => SpiModeFlags::SPI_MODE_2,
            3 => SpiModeFlags::SPI_MODE_3,
            other => {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "SPI mode must be 0..=3, got {}", other
                )))
            }
        };

        let mut device = SpidevDevice::open(spi_bus_path)
            .map_err(|e| DisplayError::SpiError(format!("Failed to open {}: {:?}", spi_bus_path, e)))?;

        let options = SpidevOptions::new()
            .bits_per_word(word_mode.bits_per_word())
            .max_speed_hz(speed_hz)
            .mode(flags)
            .build();
        device.0.configure(&options)
            .map_err(|e| DisplayError::SpiError(format!("Failed to configure {}: {}", spi_bus_path, e)))?;

        info!("SPI configured: {} mode={}, speed={}, bits={}",
              spi_bus_path, spi_mode, speed_hz, word_mode.bits_per_word());

        Ok(Self { device, mode: word_mode, buf: Vec::new() })
    }

    fn send_native(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        self.buf.clear();
        for word in words {
            match word {
                WireWord::Native(_) => word.extend_bytes(&mut self.buf),
                WireWord::Emulated(_) => return Err(misframed(word, self.mode)),
            }
        }

        self.device
            .write(&self.buf)
            .map_err(|e| TransportError::new(format!("spi write of {} words failed: {:?}", words.len(), e)))
    }

    fn send_emulated(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        let pairs = emulated_pairs(words)?;

        // a full burst spans several ioctls; a failure mid-way is still fatal
        // to the window, so the caller re-initializes either way
        for chunk in pairs.chunks(MAX_TRANSFERS_PER_MESSAGE) {
            let mut transfers: Vec<SpidevTransfer> = chunk
                .iter()
                .zip(cs_release_flags(chunk.len()))
                .map(|(pair, cs_change)| {
                    let mut t = SpidevTransfer::write(pair);
                    t.cs_change = cs_change;
                    t
                })
                .collect();

            self.device.0.transfer_multiple(&mut transfers).map_err(|e| {
                TransportError::new(format!("spi message of {} words failed: {}", chunk.len(), e))
            })?;
        }
        Ok(())
    }
}

fn misframed(word: &WireWord, mode: WordMode) -> TransportError {
    TransportError::new(format!("{:?} word on a {:?} bus", word, mode))
}

/// The byte pair of every emulated word, in order; one pair per transfer
fn emulated_pairs(words: &[WireWord]) -> Result<Vec<[u8; 2]>, TransportError> {
    words
        .iter()
        .map(|word| match word {
            WireWord::Emulated(pair) => Ok(*pair),
            WireWord::Native(_) => Err(misframed(word, WordMode::Emulated8)),
        })
        .collect()
}

/// `cs_change` for each transfer of one message: release CS after every
/// transfer but the last, which the end of the message releases anyway
/// (a set flag there would keep CS asserted past the message).
fn cs_release_flags(transfers: usize) -> Vec<u8> {
    (0..transfers).map(|i| u8::from(i + 1 < transfers)).collect()
}

impl Transport for SpidevTransport {
    fn send(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        match self.mode {
            WordMode::Native9 => self.send_native(words),
            WordMode::Emulated8 => self.send_emulated(words),
        }
    }
}

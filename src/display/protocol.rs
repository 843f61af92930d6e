/*
 *  display/protocol.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  ILI9488 command set, power-up sequence and window addressing
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

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, error};

use crate::display::codec::{WireWord, WordCodec, WordMode};
use crate::display::color::{Color, PixelFormat};
use crate::display::error::{DisplayError, Phase};
use crate::display::traits::{ResetLine, Transport};

/// ILI9488 opcodes
pub mod cmd {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVON: u8 = 0x21;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;    // Column address set
    pub const PASET: u8 = 0x2B;    // Page address set
    pub const RAMWR: u8 = 0x2C;    // Memory write
    pub const MADCTL: u8 = 0x36;   // Memory access control
    pub const COLMOD: u8 = 0x3A;   // Interface pixel format
}

/// MY=0, MX=1, MV=0, ML=0, BGR=1, MH=0
pub const MADCTL_ORIENTATION: u8 = 0x48;

/// Upper bound on wire words per transport call while streaming pixels.
/// 2048 words is 4096 bytes on the wire, the default spidev bufsiz.
pub const MAX_BURST_WORDS: usize = 2048;

/// Reset line held low, then high, in milliseconds
const RESET_LOW_MS: u64 = 20;
const RESET_HIGH_MS: u64 = 120;

/// Command-level driver for one controller.
///
/// Knows nothing about screen geometry; callers are responsible for keeping
/// windows on-screen and for supplying the exact pixel count after
/// [`Controller::set_window`].
pub struct Controller<T, D> {
    transport: T,
    delay: D,
    reset: Option<Box<dyn ResetLine>>,
    codec: WordCodec,
    format: PixelFormat,
}

impl<T: Transport, D: DelayNs> Controller<T, D> {
    pub fn new(transport: T, delay: D, mode: WordMode, format: PixelFormat) -> Self {
        Self {
            transport,
            delay,
            reset: None,
            codec: WordCodec::new(mode),
            format,
        }
    }

    /// Attach a hardware reset line; without one the reset phase is skipped
    pub fn with_reset(mut self, reset: Box<dyn ResetLine>) -> Self {
        self.reset = Some(reset);
        self
    }

    pub fn codec(&self) -> WordCodec {
        self.codec
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Issue one opcode followed by its parameter bytes as a single transfer
    pub fn command(&mut self, opcode: u8, args: &[u8], phase: Phase) -> Result<(), DisplayError> {
        let mut words = Vec::with_capacity(1 + args.len());
        words.push(self.codec.command(opcode));
        words.extend(args.iter().map(|&b| self.codec.data(b)));

        debug!("cmd 0x{:02X} args {:02X?}", opcode, args);
        self.transport.send(&words).map_err(|e| {
            error!("command 0x{:02X} failed during {}: {}", opcode, phase, e);
            DisplayError::transport(phase, e)
        })
    }

    fn hardware_reset(&mut self) -> Result<(), DisplayError> {
        let Some(reset) = self.reset.as_mut() else {
            debug!("no reset line, skipping hardware reset");
            return Ok(());
        };

        info!("Hardware reset...");
        reset.set(false).map_err(|e| DisplayError::transport(Phase::HardwareReset, e))?;
        reset.sleep(Duration::from_millis(RESET_LOW_MS));
        reset.set(true).map_err(|e| DisplayError::transport(Phase::HardwareReset, e))?;
        reset.sleep(Duration::from_millis(RESET_HIGH_MS));
        info!("Hardware reset done");
        Ok(())
    }

    /// Full power-up sequence. Not resumable: on failure start over.
    pub fn initialize(&mut self) -> Result<(), DisplayError> {
        info!("Starting {:?} initialization ({:?} words)", self.format, self.codec.mode());

        self.hardware_reset()?;

        let colmod = [self.format.colmod()];
        let madctl = [MADCTL_ORIENTATION];
        let sequence: [(u8, &[u8], u32); 7] = [
            (cmd::SWRESET, &[], 150),
            (cmd::SLPOUT, &[], 120),
            (cmd::COLMOD, &colmod, 10),
            (cmd::MADCTL, &madctl, 10),
            (cmd::INVON, &[], 10),
            (cmd::NORON, &[], 10),
            (cmd::DISPON, &[], 50),
        ];

        for (opcode, args, settle_ms) in sequence {
            self.command(opcode, args, Phase::Initialize)?;
            self.delay.delay_ms(settle_ms);
        }

        info!("{:?} initialization complete", self.format);
        Ok(())
    }

    /// Address the inclusive window and open a memory write.
    pub fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), DisplayError> {
        if x0 > x1 || y0 > y1 {
            return Err(DisplayError::InvalidArgument(format!(
                "inverted window ({}, {})..({}, {})", x0, y0, x1, y1
            )));
        }

        let [x0h, x0l] = x0.to_be_bytes();
        let [x1h, x1l] = x1.to_be_bytes();
        let [y0h, y0l] = y0.to_be_bytes();
        let [y1h, y1l] = y1.to_be_bytes();

        self.command(cmd::CASET, &[x0h, x0l, x1h, x1l], Phase::WindowSet)?;
        self.command(cmd::PASET, &[y0h, y0l, y1h, y1l], Phase::WindowSet)?;
        self.command(cmd::RAMWR, &[], Phase::WindowSet)
    }

    /// Stream `pixels` copies of `color` in bursts of at most
    /// [`MAX_BURST_WORDS`] words.
    pub fn stream_color(&mut self, color: Color, pixels: usize) -> Result<(), DisplayError> {
        let pixel: Vec<WireWord> = self
            .format
            .pixel_bytes(color)
            .into_iter()
            .map(|b| self.codec.data(b))
            .collect();
        let per_burst = (MAX_BURST_WORDS / pixel.len()).max(1);

        let burst: Vec<WireWord> = pixel
            .iter()
            .copied()
            .cycle()
            .take(per_burst.min(pixels) * pixel.len())
            .collect();

        let mut sent = 0usize;
        while sent < pixels {
            let n = per_burst.min(pixels - sent);
            self.transport.send(&burst[..n * pixel.len()]).map_err(|e| {
                error!("pixel stream failed after {} of {} pixels: {}", sent, pixels, e);
                DisplayError::transport(Phase::DataStream, e)
            })?;
            sent += n;
            debug!("streamed {} of {} pixels", sent, pixels);
        }
        Ok(())
    }

    pub fn power_on(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::DISPON, &[], Phase::Power)
    }

    pub fn power_off(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::DISPOFF, &[], Phase::Power)
    }

    /// Hand back the bus, delay and reset line
    pub fn into_parts(self) -> (T, D, Option<Box<dyn ResetLine>>) {
        (self.transport, self.delay, self.reset)
    }
}

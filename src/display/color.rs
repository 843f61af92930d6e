/*
 *  display/color.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel formats and color values as programmed into the controller
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

use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::pixelcolor::raw::RawU16;
use serde::{Deserialize, Serialize};

use super::error::DisplayError;

/// Interface pixel format written with COLMOD during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 3 bits per pixel (R[2] G[1] B[0]), one data byte per pixel - 8 colors
    #[default]
    Rgb111,

    /// 16 bits per pixel, two data bytes per pixel (high byte first)
    Rgb565,
}

impl PixelFormat {
    /// COLMOD parameter byte
    pub fn colmod(self) -> u8 {
        match self {
            PixelFormat::Rgb111 => 0x01,
            PixelFormat::Rgb565 => 0x55,
        }
    }

    /// Data words per pixel after RAMWR
    pub fn words_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb111 => 1,
            PixelFormat::Rgb565 => 2,
        }
    }

    pub fn max_value(self) -> u16 {
        match self {
            PixelFormat::Rgb111 => 0x07,
            PixelFormat::Rgb565 => 0xFFFF,
        }
    }

    /// Reject colors the programmed format cannot represent
    pub fn validate(self, color: Color) -> Result<(), DisplayError> {
        if color.value() > self.max_value() {
            return Err(DisplayError::InvalidArgument(format!(
                "color 0x{:04X} out of range for {:?} (max 0x{:X})",
                color.value(),
                self,
                self.max_value()
            )));
        }
        Ok(())
    }

    /// Payload bytes for one pixel, in wire order
    pub fn pixel_bytes(self, color: Color) -> Vec<u8> {
        match self {
            PixelFormat::Rgb111 => vec![color.value() as u8],
            PixelFormat::Rgb565 => color.value().to_be_bytes().to_vec(),
        }
    }
}

/// Raw controller color value, interpreted according to the [`PixelFormat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Color(u16);

/// Color names shared by both formats, indexed by their 3-bit value
const NAMES: [&str; 8] = ["black", "blue", "green", "cyan", "red", "magenta", "yellow", "white"];

impl Color {
    pub const BLACK: Color = Color(0x00);
    pub const BLUE: Color = Color(0x01);
    pub const GREEN: Color = Color(0x02);
    pub const CYAN: Color = Color(0x03);
    pub const RED: Color = Color(0x04);
    pub const MAGENTA: Color = Color(0x05);
    pub const YELLOW: Color = Color(0x06);
    pub const WHITE: Color = Color(0x07);

    pub const fn new(value: u16) -> Self {
        Color(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    /// Look up a color name (case-insensitive) for the given format.
    ///
    /// RGB565 names resolve to fully saturated channels.
    pub fn named(name: &str, format: PixelFormat) -> Option<Color> {
        let index = NAMES.iter().position(|n| n.eq_ignore_ascii_case(name.trim()))?;
        Some(Self::primary(index as u8, format))
    }

    fn primary(index: u8, format: PixelFormat) -> Color {
        match format {
            PixelFormat::Rgb111 => Color(index as u16),
            PixelFormat::Rgb565 => {
                let mut v = 0u16;
                if index & 0b100 != 0 { v |= 0xF800; }
                if index & 0b010 != 0 { v |= 0x07E0; }
                if index & 0b001 != 0 { v |= 0x001F; }
                Color(v)
            }
        }
    }

    /// Name of this value under `format`, if it is one of the primaries
    pub fn name(self, format: PixelFormat) -> Option<&'static str> {
        (0..NAMES.len() as u8)
            .find(|&i| Self::primary(i, format) == self)
            .map(|i| NAMES[i as usize])
    }
}

impl From<u16> for Color {
    fn from(value: u16) -> Self {
        Color(value)
    }
}

impl From<Color> for RawU16 {
    fn from(color: Color) -> Self {
        RawU16::new(color.0)
    }
}

impl From<RawU16> for Color {
    fn from(raw: RawU16) -> Self {
        use embedded_graphics::pixelcolor::raw::RawData;
        Color(raw.into_inner())
    }
}

impl PixelColor for Color {
    type Raw = RawU16;
}

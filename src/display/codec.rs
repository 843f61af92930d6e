/*
 *  display/codec.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  9-bit command/data word framing for 3-wire SPI
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

use serde::{Deserialize, Serialize};

/// How the D/C bit reaches the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordMode {
    /// Transport clocks 9-bit words; D/C sits in bit 8
    Native9,

    /// Transport is limited to 8-bit words; each unit becomes two bytes
    #[default]
    Emulated8,
}

impl WordMode {
    /// SPI bits-per-word the transport must be configured with
    pub fn bits_per_word(self) -> u8 {
        match self {
            WordMode::Native9 => 9,
            WordMode::Emulated8 => 8,
        }
    }
}

/// One framed command or data unit as it goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireWord {
    Native(u16),
    Emulated([u8; 2]),
}

impl WireWord {
    /// Append the transport bytes for this word.
    ///
    /// Native words are laid out in host order, two bytes per word, which is
    /// what spidev expects for bits_per_word > 8.
    pub fn extend_bytes(&self, out: &mut Vec<u8>) {
        match self {
            WireWord::Native(w) => out.extend_from_slice(&w.to_ne_bytes()),
            WireWord::Emulated(b) => out.extend_from_slice(b),
        }
    }
}

/// Stateless encoder for the selected [`WordMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordCodec {
    mode: WordMode,
}

impl WordCodec {
    pub const fn new(mode: WordMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WordMode {
        self.mode
    }

    pub fn encode(&self, is_data: bool, payload: u8) -> WireWord {
        let dc = is_data as u8;
        match self.mode {
            WordMode::Native9 => WireWord::Native(((dc as u16) << 8) | payload as u16),
            WordMode::Emulated8 => WireWord::Emulated([
                (dc << 7) | (payload >> 1),
                (payload & 0x01) << 7,
            ]),
        }
    }

    #[inline]
    pub fn command(&self, opcode: u8) -> WireWord {
        self.encode(false, opcode)
    }

    #[inline]
    pub fn data(&self, payload: u8) -> WireWord {
        self.encode(true, payload)
    }

    /// Recover (is_data, payload) from either encoding.
    pub fn decode(word: WireWord) -> (bool, u8) {
        match word {
            WireWord::Native(w) => (w & 0x100 != 0, (w & 0xFF) as u8),
            WireWord::Emulated([hi, lo]) => (hi & 0x80 != 0, (hi << 1) | (lo >> 7)),
        }
    }
}

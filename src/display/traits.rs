/*
 *  display/traits.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Contracts with the bus and control-line collaborators
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

use crate::display::codec::WireWord;
use crate::display::error::TransportError;

/// Serial link to the controller.
///
/// Each call is one logical operation: the words go out in order and either
/// all of them are delivered or the call fails. There is no partial success.
pub trait Transport: Send {
    fn send(&mut self, words: &[WireWord]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        T::send(self, words)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        T::send(self, words)
    }
}

/// Hardware reset line (RST)
///
/// `active` is the logical line value: `false` holds the controller in reset,
/// `true` lets it run.
pub trait ResetLine: Send {
    fn set(&mut self, active: bool) -> Result<(), TransportError>;

    fn sleep(&mut self, duration: Duration);
}

/// Backlight enable line. Never driven by the drawing core.
pub trait BacklightLine: Send {
    fn set(&mut self, on: bool) -> Result<(), TransportError>;

    /// Last level written, if known
    fn get(&self) -> Option<bool>;
}

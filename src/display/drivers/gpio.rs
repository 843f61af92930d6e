/*
 *  display/drivers/gpio.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Reset and backlight lines on top of embedded-hal output pins
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
use embedded_hal::digital::OutputPin;

use crate::display::error::TransportError;
use crate::display::traits::{BacklightLine, ResetLine};

fn pin_error<E: core::fmt::Debug>(what: &str, err: E) -> TransportError {
    TransportError::new(format!("{} pin: {:?}", what, err))
}

/// RST wired to a GPIO output; logical high lets the controller run
pub struct PinResetLine<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> PinResetLine<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }
}

impl<P, D> ResetLine for PinResetLine<P, D>
where
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn set(&mut self, active: bool) -> Result<(), TransportError> {
        let result = if active { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| pin_error("reset", e))
    }

    fn sleep(&mut self, duration: Duration) {
        self.delay.delay_ms(duration.as_millis().min(u32::MAX as u128) as u32);
    }
}

/// Backlight enable wired to a GPIO output
pub struct PinBacklight<P> {
    pin: P,
    level: Option<bool>,
}

impl<P: OutputPin> PinBacklight<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, level: None }
    }
}

impl<P: OutputPin + Send> BacklightLine for PinBacklight<P> {
    fn set(&mut self, on: bool) -> Result<(), TransportError> {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| pin_error("backlight", e))?;
        self.level = Some(on);
        Ok(())
    }

    fn get(&self) -> Option<bool> {
        self.level
    }
}

/// Export a sysfs GPIO and drive it low as an output
#[cfg(feature = "spidev")]
pub fn sysfs_output(pin: u64) -> Result<linux_embedded_hal::SysfsPin, crate::display::error::DisplayError> {
    use crate::display::error::DisplayError;
    use linux_embedded_hal::sysfs_gpio::Direction;

    let gpio = linux_embedded_hal::SysfsPin::new(pin);
    gpio.export()
        .map_err(|e| DisplayError::GpioError(format!("Failed to export GPIO {}: {}", pin, e)))?;
    gpio.set_direction(Direction::Low)
        .map_err(|e| DisplayError::GpioError(format!("Failed to configure GPIO {}: {}", pin, e)))?;
    Ok(gpio)
}

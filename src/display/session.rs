/*
 *  display/session.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Single-writer device session: the only way in to the drawing engine
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

use std::sync::{Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::display::color::{Color, PixelFormat};
use crate::display::error::DisplayError;
use crate::display::surface::{RectStyle, WindowedSurface};
use crate::display::traits::Transport;

struct SessionState<T, D> {
    surface: WindowedSurface<T, D>,
    initialized: bool,
    powered: bool,
    current_color: Color,
}

/// One bound display.
///
/// A single lock covers every multi-step command sequence and the cached
/// color, so two callers can never interleave window-set and pixel streams.
/// Share it across threads behind an `Arc`.
pub struct DeviceSession<T, D> {
    state: Mutex<SessionState<T, D>>,
}

impl<T: Transport, D: DelayNs> DeviceSession<T, D> {
    pub fn new(surface: WindowedSurface<T, D>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                surface,
                initialized: false,
                powered: false,
                current_color: Color::BLACK,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<T, D>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            // a panic mid-sequence leaves the controller addressing unknown
            warn!("display session lock poisoned, controller needs re-initialization");
            let mut guard = poisoned.into_inner();
            guard.initialized = false;
            guard
        })
    }

    /// Run the hardware reset and power-up sequence.
    ///
    /// Always starts from scratch; on failure the session stays unusable
    /// until this succeeds.
    pub fn initialize(&self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.initialized = false;
        state.powered = false;
        state.surface.initialize()?;
        state.initialized = true;
        state.powered = true;
        Ok(())
    }

    /// Run `f` with exclusive access to the surface.
    ///
    /// The cached color is updated only when `f` succeeds and performed a
    /// whole-screen fill. A transport failure marks the session
    /// uninitialized.
    pub fn with_exclusive_access<R, F>(&self, f: F) -> Result<R, DisplayError>
    where
        F: FnOnce(&mut WindowedSurface<T, D>) -> Result<R, DisplayError>,
    {
        let mut state = self.lock();
        if !state.initialized {
            return Err(DisplayError::ProtocolDesyncRisk);
        }

        state.surface.clear_fill_marker();
        match f(&mut state.surface) {
            Ok(value) => {
                if let Some(color) = state.surface.take_fill_marker() {
                    state.current_color = color;
                }
                Ok(value)
            }
            Err(err) => {
                state.surface.clear_fill_marker();
                if err.requires_reinit() {
                    warn!("display needs re-initialization: {}", err);
                    state.initialized = false;
                }
                Err(err)
            }
        }
    }

    /// Last color applied by a successful fill (black until then)
    pub fn current_color(&self) -> Color {
        self.lock().current_color
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn is_powered(&self) -> bool {
        self.lock().powered
    }

    /// Screen (width, height) in pixels
    pub fn dimensions(&self) -> (u16, u16) {
        let state = self.lock();
        (state.surface.width(), state.surface.height())
    }

    pub fn format(&self) -> PixelFormat {
        self.lock().surface.format()
    }

    pub fn fill(&self, color: Color) -> Result<(), DisplayError> {
        self.with_exclusive_access(|s| s.fill(color))
    }

    pub fn pixel(&self, x: u16, y: u16, color: Color) -> Result<(), DisplayError> {
        self.with_exclusive_access(|s| s.pixel(x, y, color))
    }

    pub fn hline(&self, x: u16, y: u16, len: u16, color: Color) -> Result<(), DisplayError> {
        self.with_exclusive_access(|s| s.hline(x, y, len, color))
    }

    pub fn vline(&self, x: u16, y: u16, len: u16, color: Color) -> Result<(), DisplayError> {
        self.with_exclusive_access(|s| s.vline(x, y, len, color))
    }

    pub fn rect(
        &self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: Color,
        style: RectStyle,
    ) -> Result<(), DisplayError> {
        self.with_exclusive_access(|s| s.rect(x, y, w, h, color, style))
    }

    /// DISPON / DISPOFF; the backlight is left alone
    pub fn set_power(&self, on: bool) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(DisplayError::ProtocolDesyncRisk);
        }
        if let Err(err) = state.surface.set_power(on) {
            state.initialized = false;
            return Err(err);
        }
        state.powered = on;
        info!("Display {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// Unbind: give back the surface and the hardware it owns
    pub fn into_surface(self) -> WindowedSurface<T, D> {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::codec::WordMode;
    use crate::display::drivers::mock::{MockBus, MockDelay, MockTransport};
    use crate::display::error::Phase;
    use crate::display::protocol::Controller;
    use std::sync::Arc;
    use std::thread;

    fn session(bus: &MockBus) -> DeviceSession<MockTransport, MockDelay> {
        let mode = WordMode::Native9;
        let ctl = Controller::new(bus.transport(mode), bus.delay(), mode, PixelFormat::Rgb111);
        DeviceSession::new(WindowedSurface::new(ctl, 32, 16).unwrap())
    }

    #[test]
    fn test_draw_before_init_is_rejected() {
        let bus = MockBus::new();
        let s = session(&bus);
        assert!(matches!(s.fill(Color::RED), Err(DisplayError::ProtocolDesyncRisk)));
        assert_eq!(bus.send_calls(), 0);
        assert_eq!(s.current_color(), Color::BLACK);
    }

    #[test]
    fn test_fill_updates_current_color() {
        let bus = MockBus::new();
        let s = session(&bus);
        s.initialize().unwrap();

        s.fill(Color::YELLOW).unwrap();
        assert_eq!(s.current_color(), Color::YELLOW);

        // non-fill drawing leaves the cache alone
        s.rect(0, 0, 32, 16, Color::BLUE, RectStyle::Filled).unwrap();
        assert_eq!(s.current_color(), Color::YELLOW);
    }

    #[test]
    fn test_failed_closure_does_not_update_color() {
        let bus = MockBus::new();
        let s = session(&bus);
        s.initialize().unwrap();

        let r: Result<(), _> = s.with_exclusive_access(|surf| {
            surf.fill(Color::GREEN)?;
            surf.pixel(99, 0, Color::GREEN)
        });
        assert!(matches!(r, Err(DisplayError::OutOfBounds { .. })));
        assert_eq!(s.current_color(), Color::BLACK);
        // argument errors keep the session usable
        assert!(s.is_initialized());
    }

    #[test]
    fn test_transport_failure_requires_reinit() {
        let bus = MockBus::new();
        let s = session(&bus);
        s.initialize().unwrap();
        s.fill(Color::WHITE).unwrap();

        bus.fail_on_data_word(20);
        let err = s.fill(Color::RED).unwrap_err();
        assert!(matches!(err, DisplayError::Transport { phase: Phase::DataStream, .. }));
        assert_eq!(s.current_color(), Color::WHITE);
        assert!(!s.is_initialized());
        assert!(matches!(s.pixel(0, 0, Color::RED), Err(DisplayError::ProtocolDesyncRisk)));

        bus.clear_failures();
        s.initialize().unwrap();
        s.fill(Color::RED).unwrap();
        assert_eq!(s.current_color(), Color::RED);
    }

    #[test]
    fn test_window_set_failure_reports_phase() {
        let bus = MockBus::new();
        let s = session(&bus);
        s.initialize().unwrap();
        s.fill(Color::CYAN).unwrap();
        bus.clear();

        // CASET goes through, PASET fails
        bus.fail_on_send(2);
        let err = s.rect(2, 2, 4, 4, Color::RED, RectStyle::Filled).unwrap_err();
        assert!(matches!(err, DisplayError::Transport { phase: Phase::WindowSet, .. }));
        assert_eq!(bus.commands(), vec![0x2A]);
        assert_eq!(bus.data_count(), 4);
        assert_eq!(bus.send_calls(), 2);
        assert_eq!(s.current_color(), Color::CYAN);
        assert!(!s.is_initialized());
    }

    #[test]
    fn test_power_toggles_without_window() {
        let bus = MockBus::new();
        let s = session(&bus);
        s.initialize().unwrap();
        assert!(s.is_powered());
        bus.clear();

        s.set_power(false).unwrap();
        assert!(!s.is_powered());
        s.set_power(true).unwrap();
        assert_eq!(bus.commands(), vec![0x28, 0x29]);
        assert!(bus.windows().is_empty());
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let bus = MockBus::new();
        let s = Arc::new(session(&bus));
        s.initialize().unwrap();
        bus.clear();

        let handles: Vec<_> = [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE]
            .into_iter()
            .map(|c| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for _ in 0..5 {
                        s.fill(c).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let windows = bus.windows();
        assert_eq!(windows.len(), 20);
        for w in windows {
            assert_eq!(w.data.len(), 32 * 16);
            assert!(w.data.iter().all(|&b| b == w.data[0]));
        }
    }

    #[test]
    fn test_unbind_returns_hardware() {
        let bus = MockBus::new();
        let s = session(&bus);
        let surface = s.into_surface();
        assert_eq!((surface.width(), surface.height()), (32, 16));
    }
}

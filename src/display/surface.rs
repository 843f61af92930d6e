/*
 *  display/surface.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Windowed drawing engine: every primitive is one or more addressed
 *  windows followed by a streamed run of pixels
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

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::display::color::{Color, PixelFormat};
use crate::display::error::DisplayError;
use crate::display::protocol::Controller;
use crate::display::traits::Transport;

/// How [`WindowedSurface::rect`] draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectStyle {
    Filled,
    Outline,
}

/// Drawing engine over one controller.
///
/// There is no framebuffer: geometry is validated and clamped here, then
/// pushed straight to controller RAM through a window.
pub struct WindowedSurface<T, D> {
    controller: Controller<T, D>,
    width: u16,
    height: u16,

    /// Color of the last fill() that completed, consumed by the session
    last_fill: Option<Color>,
}

impl<T: Transport, D: DelayNs> WindowedSurface<T, D> {
    pub fn new(controller: Controller<T, D>, width: u16, height: u16) -> Result<Self, DisplayError> {
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidConfiguration(format!(
                "screen must be at least 1x1, got {}x{}", width, height
            )));
        }
        Ok(Self { controller, width, height, last_fill: None })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.controller.format()
    }

    /// Paint the whole screen with one color
    pub fn fill(&mut self, color: Color) -> Result<(), DisplayError> {
        info!("Filling screen with 0x{:02X}", color.value());
        self.rect(0, 0, self.width, self.height, color, RectStyle::Filled)?;
        self.last_fill = Some(color);
        info!("Fill complete");
        Ok(())
    }

    pub fn pixel(&mut self, x: u16, y: u16, color: Color) -> Result<(), DisplayError> {
        self.check_color(color)?;
        self.check_origin(x, y)?;
        self.paint(x, y, x, y, color)
    }

    /// Horizontal run starting at (x, y), clipped at the right edge
    pub fn hline(&mut self, x: u16, y: u16, len: u16, color: Color) -> Result<(), DisplayError> {
        self.check_color(color)?;
        check_nonzero("line length", len)?;
        self.check_origin(x, y)?;
        let len = len.min(self.width - x);
        self.paint(x, y, x + len - 1, y, color)
    }

    /// Vertical run starting at (x, y), clipped at the bottom edge.
    ///
    /// Sent as one burst through a single-column window; the controller
    /// wraps to the next page after every column.
    pub fn vline(&mut self, x: u16, y: u16, len: u16, color: Color) -> Result<(), DisplayError> {
        self.check_color(color)?;
        check_nonzero("line length", len)?;
        self.check_origin(x, y)?;
        let len = len.min(self.height - y);
        self.paint(x, y, x, y + len - 1, color)
    }

    pub fn rect(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: Color,
        style: RectStyle,
    ) -> Result<(), DisplayError> {
        self.check_color(color)?;
        check_nonzero("rectangle width", w)?;
        check_nonzero("rectangle height", h)?;
        self.check_origin(x, y)?;

        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        let (x1, y1) = (x + w - 1, y + h - 1);

        match style {
            RectStyle::Filled => self.paint(x, y, x1, y1, color),
            RectStyle::Outline => {
                self.paint(x, y, x1, y, color)?;
                if h > 1 {
                    self.paint(x, y1, x1, y1, color)?;
                }
                // sides skip the corner rows already drawn
                if h > 2 {
                    self.paint(x, y + 1, x, y1 - 1, color)?;
                    if w > 1 {
                        self.paint(x1, y + 1, x1, y1 - 1, color)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Issue DISPOFF / DISPON
    pub fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        if on { self.controller.power_on() } else { self.controller.power_off() }
    }

    pub(crate) fn initialize(&mut self) -> Result<(), DisplayError> {
        self.controller.initialize()
    }

    pub(crate) fn clear_fill_marker(&mut self) {
        self.last_fill = None;
    }

    pub(crate) fn take_fill_marker(&mut self) -> Option<Color> {
        self.last_fill.take()
    }

    pub fn into_controller(self) -> Controller<T, D> {
        self.controller
    }

    fn paint(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: Color) -> Result<(), DisplayError> {
        let count = (x1 - x0 + 1) as usize * (y1 - y0 + 1) as usize;
        debug!("window ({}, {})..({}, {}) = {} px", x0, y0, x1, y1, count);
        self.controller.set_window(x0, y0, x1, y1)?;
        self.controller.stream_color(color, count)
    }

    fn check_color(&self, color: Color) -> Result<(), DisplayError> {
        self.format().validate(color)
    }

    fn check_origin(&self, x: u16, y: u16) -> Result<(), DisplayError> {
        if x >= self.width || y >= self.height {
            return Err(DisplayError::OutOfBounds { x, y, width: self.width, height: self.height });
        }
        Ok(())
    }
}

fn check_nonzero(what: &str, value: u16) -> Result<(), DisplayError> {
    if value == 0 {
        return Err(DisplayError::InvalidArgument(format!("{} must be > 0", what)));
    }
    Ok(())
}

impl<T: Transport, D: DelayNs> OriginDimensions for WindowedSurface<T, D> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

// Direct DrawTarget access so embedded-graphics primitives can be rendered
// inside DeviceSession::with_exclusive_access
impl<T: Transport, D: DelayNs> DrawTarget for WindowedSurface<T, D> {
    type Color = Color;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) else {
                continue;
            };
            if x < self.width && y < self.height {
                self.pixel(x, y, color)?;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.size.width == 0 || area.size.height == 0 {
            return Ok(());
        }
        self.rect(
            area.top_left.x as u16,
            area.top_left.y as u16,
            area.size.width as u16,
            area.size.height as u16,
            color,
            RectStyle::Filled,
        )
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::codec::WordMode;
    use crate::display::drivers::mock::{MockBus, MockDelay, MockTransport};
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    fn surface(bus: &MockBus, w: u16, h: u16) -> WindowedSurface<MockTransport, MockDelay> {
        let mode = WordMode::Emulated8;
        let ctl = Controller::new(bus.transport(mode), bus.delay(), mode, PixelFormat::Rgb111);
        WindowedSurface::new(ctl, w, h).unwrap()
    }

    #[test]
    fn test_pixel_bounds() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);

        assert!(matches!(s.pixel(320, 0, Color::RED), Err(DisplayError::OutOfBounds { .. })));
        assert!(matches!(s.pixel(0, 480, Color::RED), Err(DisplayError::OutOfBounds { .. })));
        assert_eq!(bus.send_calls(), 0);

        s.pixel(319, 479, Color::RED).unwrap();
        let windows = bus.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!((windows[0].x0, windows[0].y0, windows[0].x1, windows[0].y1), (319, 479, 319, 479));
        assert_eq!(windows[0].data, vec![0x04]);
    }

    #[test]
    fn test_invalid_color_rejected_before_traffic() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        assert!(matches!(s.fill(Color::new(8)), Err(DisplayError::InvalidArgument(_))));
        assert!(matches!(s.pixel(0, 0, Color::new(0x100)), Err(DisplayError::InvalidArgument(_))));
        assert_eq!(bus.send_calls(), 0);
    }

    #[test]
    fn test_rect_clamped_to_screen() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        s.rect(319, 0, 10, 1, Color::BLUE, RectStyle::Filled).unwrap();

        let windows = bus.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].area(), 1);
        assert_eq!(windows[0].data, vec![0x01]);
    }

    #[test]
    fn test_zero_sized_rect_is_invalid() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        assert!(matches!(
            s.rect(10, 10, 0, 5, Color::RED, RectStyle::Filled),
            Err(DisplayError::InvalidArgument(_))
        ));
        assert!(matches!(
            s.rect(10, 10, 5, 0, Color::RED, RectStyle::Outline),
            Err(DisplayError::InvalidArgument(_))
        ));
        assert!(matches!(s.hline(0, 0, 0, Color::RED), Err(DisplayError::InvalidArgument(_))));
        assert_eq!(bus.send_calls(), 0);
    }

    #[test]
    fn test_hline_is_one_burst_and_clamped() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        s.hline(300, 7, 100, Color::GREEN).unwrap();

        let windows = bus.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!((windows[0].x0, windows[0].x1, windows[0].y0, windows[0].y1), (300, 319, 7, 7));
        assert_eq!(windows[0].data.len(), 20);
        // CASET, PASET, RAMWR, one data burst
        assert_eq!(bus.send_calls(), 4);
    }

    #[test]
    fn test_vline_is_one_column_window() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        s.vline(5, 470, 50, Color::CYAN).unwrap();

        let windows = bus.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!((windows[0].x0, windows[0].x1, windows[0].y0, windows[0].y1), (5, 5, 470, 479));
        assert_eq!(windows[0].data, vec![0x03; 10]);
    }

    #[test]
    fn test_outline_window_layout() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);
        s.rect(10, 20, 5, 4, Color::WHITE, RectStyle::Outline).unwrap();

        let spans: Vec<_> = bus.windows().iter().map(|w| (w.x0, w.y0, w.x1, w.y1)).collect();
        assert_eq!(spans, vec![(10, 20, 14, 20), (10, 23, 14, 23), (10, 21, 10, 22), (14, 21, 14, 22)]);

        let total: usize = bus.windows().iter().map(|w| w.data.len()).sum();
        assert_eq!(total, 5 + 5 + 2 + 2);
    }

    #[test]
    fn test_outline_degenerate_heights() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 320, 480);

        s.rect(0, 0, 8, 1, Color::RED, RectStyle::Outline).unwrap();
        assert_eq!(bus.windows().len(), 1);

        bus.clear();
        s.rect(0, 0, 8, 2, Color::RED, RectStyle::Outline).unwrap();
        assert_eq!(bus.windows().len(), 2);

        bus.clear();
        s.rect(0, 0, 1, 5, Color::RED, RectStyle::Outline).unwrap();
        // top, bottom, single side column
        assert_eq!(bus.windows().len(), 3);
    }

    #[test]
    fn test_every_window_gets_exact_pixel_count() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 64, 32);
        s.fill(Color::BLACK).unwrap();
        s.rect(60, 30, 10, 10, Color::RED, RectStyle::Outline).unwrap();
        s.vline(0, 0, 100, Color::BLUE).unwrap();
        s.pixel(63, 31, Color::WHITE).unwrap();

        for w in bus.windows() {
            assert_eq!(w.data.len(), w.area());
        }
    }

    #[test]
    fn test_fill_marker_only_after_success() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 16, 16);
        s.rect(0, 0, 16, 16, Color::RED, RectStyle::Filled).unwrap();
        assert_eq!(s.take_fill_marker(), None);

        s.fill(Color::RED).unwrap();
        assert_eq!(s.take_fill_marker(), Some(Color::RED));
        assert_eq!(s.take_fill_marker(), None);
    }

    #[test]
    fn test_draw_target_clips_and_fills() {
        let bus = MockBus::new();
        let mut s = surface(&bus, 16, 16);

        Line::new(Point::new(-2, 0), Point::new(2, 0))
            .into_styled(PrimitiveStyle::with_stroke(Color::GREEN, 1))
            .draw(&mut s)
            .unwrap();
        assert_eq!(bus.windows().len(), 3);

        bus.clear();
        s.fill_solid(&Rectangle::new(Point::new(12, 12), Size::new(10, 10)), Color::BLUE).unwrap();
        let windows = bus.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].area(), 16);
    }
}

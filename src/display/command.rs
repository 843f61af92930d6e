/*
 *  display/command.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Text control surface: one line in, one session call out
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
use std::str::FromStr;

use embedded_hal::delay::DelayNs;
use log::{debug, info};
use thiserror::Error;

use crate::display::color::{Color, PixelFormat};
use crate::display::error::DisplayError;
use crate::display::session::DeviceSession;
use crate::display::surface::RectStyle;
use crate::display::traits::{BacklightLine, Transport};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command}: expected {expected}")]
    Usage { command: &'static str, expected: &'static str },
    #[error("{command}: bad argument '{arg}'")]
    BadArgument { command: &'static str, arg: String },
    #[error("unknown color name: {0}")]
    UnknownColor(String),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Color as typed by the user; names resolve against the session's format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpec {
    Value(u16),
    Name(String),
}

impl ColorSpec {
    pub fn resolve(&self, format: PixelFormat) -> Result<Color, CommandError> {
        match self {
            ColorSpec::Value(v) => Ok(Color::new(*v)),
            ColorSpec::Name(n) => Color::named(n, format).ok_or_else(|| CommandError::UnknownColor(n.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Fill(ColorSpec),
    Pixel { x: u16, y: u16, color: ColorSpec },
    HLine { x: u16, y: u16, len: u16, color: ColorSpec },
    VLine { x: u16, y: u16, len: u16, color: ColorSpec },
    Rect { x: u16, y: u16, w: u16, h: u16, color: ColorSpec, style: RectStyle },
    ShowColor,
    Backlight(bool),
    ShowBacklight,
    Power(bool),
    Init,
}

/// Integer with optional 0x / 0o / 0b prefix
fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();
    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d.to_string(), 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d.to_string(), 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d.to_string(), 2)
    } else {
        (lower, 10)
    };
    u32::from_str_radix(&digits, radix).ok()
}

fn coord(command: &'static str, arg: &str) -> Result<u16, CommandError> {
    parse_number(arg)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| CommandError::BadArgument { command, arg: arg.to_string() })
}

fn color_arg(command: &'static str, arg: &str) -> Result<ColorSpec, CommandError> {
    if arg.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return coord(command, arg).map(ColorSpec::Value);
    }
    Ok(ColorSpec::Name(arg.to_ascii_lowercase()))
}

fn switch_arg(command: &'static str, arg: &str) -> Result<bool, CommandError> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "1" => Ok(true),
        "off" | "0" => Ok(false),
        _ => Err(CommandError::BadArgument { command, arg: arg.to_string() }),
    }
}

impl FromStr for DrawCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = tokens.split_first() else {
            return Err(CommandError::Empty);
        };

        let cmd = match (head.to_ascii_lowercase().as_str(), args) {
            ("color?", []) | ("color", []) => DrawCommand::ShowColor,
            ("color", [c]) | ("fill", [c]) => DrawCommand::Fill(color_arg("fill", c)?),
            ("fill", _) => return Err(CommandError::Usage { command: "fill", expected: "fill <color>" }),
            ("pixel", [x, y, c]) => DrawCommand::Pixel {
                x: coord("pixel", x)?,
                y: coord("pixel", y)?,
                color: color_arg("pixel", c)?,
            },
            ("pixel", _) => return Err(CommandError::Usage { command: "pixel", expected: "pixel <x> <y> <color>" }),
            ("hline", [x, y, len, c]) => DrawCommand::HLine {
                x: coord("hline", x)?,
                y: coord("hline", y)?,
                len: coord("hline", len)?,
                color: color_arg("hline", c)?,
            },
            ("hline", _) => return Err(CommandError::Usage { command: "hline", expected: "hline <x> <y> <len> <color>" }),
            ("vline", [x, y, len, c]) => DrawCommand::VLine {
                x: coord("vline", x)?,
                y: coord("vline", y)?,
                len: coord("vline", len)?,
                color: color_arg("vline", c)?,
            },
            ("vline", _) => return Err(CommandError::Usage { command: "vline", expected: "vline <x> <y> <len> <color>" }),
            ("rect", [x, y, w, h, c, rest @ ..]) if rest.len() <= 1 => {
                let style = match rest.first().map(|s| s.to_ascii_lowercase()) {
                    None => RectStyle::Filled,
                    Some(s) if s == "fill" || s == "filled" => RectStyle::Filled,
                    Some(s) if s == "outline" => RectStyle::Outline,
                    Some(s) => return Err(CommandError::BadArgument { command: "rect", arg: s }),
                };
                DrawCommand::Rect {
                    x: coord("rect", x)?,
                    y: coord("rect", y)?,
                    w: coord("rect", w)?,
                    h: coord("rect", h)?,
                    color: color_arg("rect", c)?,
                    style,
                }
            }
            ("rect", _) => {
                return Err(CommandError::Usage {
                    command: "rect",
                    expected: "rect <x> <y> <w> <h> <color> [fill|outline]",
                })
            }
            ("backlight?", []) | ("backlight", []) => DrawCommand::ShowBacklight,
            ("backlight", [v]) => DrawCommand::Backlight(switch_arg("backlight", v)?),
            ("power", [v]) => DrawCommand::Power(switch_arg("power", v)?),
            ("init", []) => DrawCommand::Init,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(cmd)
    }
}

/// What a command reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ok,
    /// Current color, with the format it is to be read in
    Color(Color, PixelFormat),
    Backlight(Option<bool>),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "ok"),
            Response::Color(c, format) => match (format, c.name(*format)) {
                (PixelFormat::Rgb111, Some(name)) => write!(f, "{} ({})", c.value(), name),
                (PixelFormat::Rgb111, None) => write!(f, "{}", c.value()),
                (PixelFormat::Rgb565, Some(name)) => write!(f, "0x{:04X} ({})", c.value(), name),
                (PixelFormat::Rgb565, None) => write!(f, "0x{:04X}", c.value()),
            },
            Response::Backlight(Some(on)) => write!(f, "{}", *on as u8),
            Response::Backlight(None) => write!(f, "no-backlight"),
        }
    }
}

/// Maps parsed commands onto a session plus the optional backlight line
pub struct ControlSurface<'a, T, D> {
    session: &'a DeviceSession<T, D>,
    backlight: Option<Box<dyn BacklightLine>>,
}

impl<'a, T: Transport, D: DelayNs> ControlSurface<'a, T, D> {
    pub fn new(session: &'a DeviceSession<T, D>, backlight: Option<Box<dyn BacklightLine>>) -> Self {
        Self { session, backlight }
    }

    pub fn execute_line(&mut self, line: &str) -> Result<Response, CommandError> {
        let cmd: DrawCommand = line.parse()?;
        self.execute(&cmd)
    }

    pub fn execute(&mut self, cmd: &DrawCommand) -> Result<Response, CommandError> {
        debug!("control: {:?}", cmd);
        let format = self.session.format();
        let s = self.session;

        match cmd {
            DrawCommand::Fill(c) => s.fill(c.resolve(format)?)?,
            DrawCommand::Pixel { x, y, color } => s.pixel(*x, *y, color.resolve(format)?)?,
            DrawCommand::HLine { x, y, len, color } => s.hline(*x, *y, *len, color.resolve(format)?)?,
            DrawCommand::VLine { x, y, len, color } => s.vline(*x, *y, *len, color.resolve(format)?)?,
            DrawCommand::Rect { x, y, w, h, color, style } => {
                s.rect(*x, *y, *w, *h, color.resolve(format)?, *style)?
            }
            DrawCommand::ShowColor => return Ok(Response::Color(s.current_color(), format)),
            DrawCommand::Backlight(on) => {
                let line = self.backlight.as_mut().ok_or(DisplayError::UnsupportedOperation)?;
                line.set(*on).map_err(|e| DisplayError::GpioError(e.to_string()))?;
                info!("Backlight {}", if *on { "on" } else { "off" });
            }
            DrawCommand::ShowBacklight => {
                return Ok(Response::Backlight(self.backlight.as_ref().and_then(|b| b.get())));
            }
            DrawCommand::Power(on) => s.set_power(*on)?,
            DrawCommand::Init => s.initialize()?,
        }
        Ok(Response::Ok)
    }

    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    /// Hand the backlight back, e.g. to switch it off on shutdown
    pub fn into_backlight(self) -> Option<Box<dyn BacklightLine>> {
        self.backlight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::codec::WordMode;
    use crate::display::drivers::mock::{MockBus, MockDelay, MockTransport};
    use crate::display::protocol::Controller;
    use crate::display::surface::WindowedSurface;

    fn session(bus: &MockBus, format: PixelFormat) -> DeviceSession<MockTransport, MockDelay> {
        let mode = WordMode::Emulated8;
        let ctl = Controller::new(bus.transport(mode), bus.delay(), mode, format);
        let s = DeviceSession::new(WindowedSurface::new(ctl, 20, 10).unwrap());
        s.initialize().unwrap();
        bus.clear();
        s
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("color red".parse::<DrawCommand>().unwrap(), DrawCommand::Fill(ColorSpec::Name("red".into())));
        assert_eq!("FILL 0x4".parse::<DrawCommand>().unwrap(), DrawCommand::Fill(ColorSpec::Value(4)));
        assert_eq!("color".parse::<DrawCommand>().unwrap(), DrawCommand::ShowColor);
        assert_eq!(
            "rect 1 2 3 4 7 outline".parse::<DrawCommand>().unwrap(),
            DrawCommand::Rect { x: 1, y: 2, w: 3, h: 4, color: ColorSpec::Value(7), style: RectStyle::Outline }
        );
        assert_eq!(
            "vline 0b11 0o10 5 Blue".parse::<DrawCommand>().unwrap(),
            DrawCommand::VLine { x: 3, y: 8, len: 5, color: ColorSpec::Name("blue".into()) }
        );
        assert_eq!("backlight OFF".parse::<DrawCommand>().unwrap(), DrawCommand::Backlight(false));
        assert_eq!("power 1".parse::<DrawCommand>().unwrap(), DrawCommand::Power(true));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("".parse::<DrawCommand>(), Err(CommandError::Empty)));
        assert!(matches!("blink 3".parse::<DrawCommand>(), Err(CommandError::Unknown(_))));
        assert!(matches!("pixel 1 2".parse::<DrawCommand>(), Err(CommandError::Usage { .. })));
        assert!(matches!("pixel 70000 2 1".parse::<DrawCommand>(), Err(CommandError::BadArgument { .. })));
        assert!(matches!("rect 0 0 1 1 1 dotted".parse::<DrawCommand>(), Err(CommandError::BadArgument { .. })));
        assert!(matches!("backlight maybe".parse::<DrawCommand>(), Err(CommandError::BadArgument { .. })));
    }

    #[test]
    fn test_fill_and_show_color() {
        let bus = MockBus::new();
        let s = session(&bus, PixelFormat::Rgb111);
        let mut cs = ControlSurface::new(&s, None);

        assert_eq!(cs.execute_line("color magenta").unwrap(), Response::Ok);
        assert_eq!(
            cs.execute_line("color?").unwrap(),
            Response::Color(Color::MAGENTA, PixelFormat::Rgb111)
        );
        assert_eq!(Response::Color(Color::MAGENTA, PixelFormat::Rgb111).to_string(), "5 (magenta)");
        assert_eq!(bus.windows()[0].data, vec![0x05; 200]);
    }

    #[test]
    fn test_out_of_range_color_reaches_core_check() {
        let bus = MockBus::new();
        let s = session(&bus, PixelFormat::Rgb111);
        let mut cs = ControlSurface::new(&s, None);

        let err = cs.execute_line("color 8").unwrap_err();
        assert!(matches!(err, CommandError::Display(DisplayError::InvalidArgument(_))));
        assert!(matches!(cs.execute_line("color mauve"), Err(CommandError::UnknownColor(_))));
        assert_eq!(bus.send_calls(), 0);
    }

    #[test]
    fn test_rgb565_show_color_uses_565_names() {
        let bus = MockBus::new();
        let s = session(&bus, PixelFormat::Rgb565);
        let mut cs = ControlSurface::new(&s, None);

        // raw 4 is a dim blue in 565, not red
        cs.execute_line("fill 4").unwrap();
        assert_eq!(cs.execute_line("color?").unwrap().to_string(), "0x0004");

        cs.execute_line("fill red").unwrap();
        assert_eq!(cs.execute_line("color?").unwrap().to_string(), "0xF800 (red)");
        assert_eq!(s.current_color(), Color::new(0xF800));
    }

    #[test]
    fn test_rgb565_names() {
        let bus = MockBus::new();
        let s = session(&bus, PixelFormat::Rgb565);
        let mut cs = ControlSurface::new(&s, None);

        cs.execute_line("pixel 0 0 red").unwrap();
        assert_eq!(bus.windows()[0].data, vec![0xF8, 0x00]);
    }

    #[test]
    fn test_backlight() {
        let bus = MockBus::new();
        let s = session(&bus, PixelFormat::Rgb111);

        let mut without = ControlSurface::new(&s, None);
        assert_eq!(without.execute_line("backlight").unwrap(), Response::Backlight(None));
        assert_eq!(Response::Backlight(None).to_string(), "no-backlight");
        assert!(matches!(
            without.execute_line("backlight on"),
            Err(CommandError::Display(DisplayError::UnsupportedOperation))
        ));

        let mut with = ControlSurface::new(&s, Some(Box::new(bus.backlight())));
        with.execute_line("backlight on").unwrap();
        assert_eq!(with.execute_line("backlight?").unwrap(), Response::Backlight(Some(true)));
        // backlight never touches the controller
        assert_eq!(bus.send_calls(), 0);
    }
}

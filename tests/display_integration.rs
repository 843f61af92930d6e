/*
 *  tests/display_integration.rs
 *
 *  Integration tests for display system
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 */

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

use ili9488_spi::display::drivers::mock::{MockBus, MockDelay, MockEvent, MockTransport};
use ili9488_spi::display::{
    BacklightLine, Color, CommandError, ControlSurface, Controller, DeviceSession, DisplayError, Phase, PixelFormat,
    RectStyle, Response, WindowedSurface, WordMode,
};

fn bound_session(bus: &MockBus, mode: WordMode) -> DeviceSession<MockTransport, MockDelay> {
    let ctl = Controller::new(bus.transport(mode), bus.delay(), mode, PixelFormat::Rgb111)
        .with_reset(Box::new(bus.reset_line()));
    let session = DeviceSession::new(WindowedSurface::new(ctl, 320, 480).unwrap());
    session.initialize().unwrap();
    bus.clear();
    session
}

#[test]
fn test_fill_red_full_screen_trace() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Emulated8);

    session.fill(Color::RED).unwrap();

    assert_eq!(bus.commands(), vec![0x2A, 0x2B, 0x2C]);
    let data = bus.data_bytes();
    assert_eq!(&data[..4], &[0x00, 0x00, 0x01, 0x3F]);
    assert_eq!(&data[4..8], &[0x00, 0x00, 0x01, 0xDF]);
    assert_eq!(data.len() - 8, 153_600);
    assert!(data[8..].iter().all(|&b| b == 0x04));
    assert_eq!(session.current_color(), Color::RED);
}

#[test]
fn test_word_modes_produce_same_trace() {
    let native = MockBus::new();
    let emulated = MockBus::new();
    let a = bound_session(&native, WordMode::Native9);
    let b = bound_session(&emulated, WordMode::Emulated8);

    for s in [&a, &b] {
        s.rect(10, 10, 40, 30, Color::CYAN, RectStyle::Outline).unwrap();
        s.pixel(0, 0, Color::WHITE).unwrap();
    }
    assert_eq!(native.events(), emulated.events());
}

#[test]
fn test_fill_is_idempotent_on_the_wire() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Native9);

    session.fill(Color::MAGENTA).unwrap();
    let first = bus.events();
    bus.clear();
    session.fill(Color::MAGENTA).unwrap();
    assert_eq!(bus.events(), first);
}

#[test]
fn test_mid_stream_failure_needs_reinit() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Emulated8);
    session.fill(Color::BLUE).unwrap();

    // 8 window parameter bytes, then fail 50 pixels in
    bus.fail_on_data_word(8 + 50);
    let err = session.fill(Color::GREEN).unwrap_err();
    assert!(matches!(err, DisplayError::Transport { phase: Phase::DataStream, .. }));
    assert_eq!(session.current_color(), Color::BLUE);
    assert!(matches!(session.fill(Color::GREEN), Err(DisplayError::ProtocolDesyncRisk)));

    bus.clear_failures();
    session.initialize().unwrap();
    assert!(bus.events().contains(&MockEvent::Reset(false)));
    session.fill(Color::GREEN).unwrap();
    assert_eq!(session.current_color(), Color::GREEN);
}

#[test]
fn test_out_of_bounds_sends_nothing() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Emulated8);

    assert!(matches!(session.pixel(320, 0, Color::RED), Err(DisplayError::OutOfBounds { .. })));
    assert!(matches!(session.hline(0, 480, 5, Color::RED), Err(DisplayError::OutOfBounds { .. })));
    assert!(matches!(session.pixel(0, 0, Color::new(8)), Err(DisplayError::InvalidArgument(_))));
    assert_eq!(bus.send_calls(), 0);
    assert!(session.is_initialized());
}

#[test]
fn test_rect_clamps_to_screen() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Emulated8);

    session.rect(300, 470, 100, 100, Color::YELLOW, RectStyle::Filled).unwrap();
    let windows = bus.windows();
    assert_eq!(windows.len(), 1);
    assert_eq!((windows[0].x0, windows[0].y0, windows[0].x1, windows[0].y1), (300, 470, 319, 479));
    assert_eq!(windows[0].data.len(), 20 * 10);
    assert_eq!(session.current_color(), Color::BLACK);
}

#[test]
fn test_embedded_graphics_inside_exclusive_access() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Native9);

    session
        .with_exclusive_access(|surface| {
            Rectangle::new(Point::new(1, 1), Size::new(3, 2))
                .into_styled(PrimitiveStyle::with_fill(Color::GREEN))
                .draw(surface)
        })
        .unwrap();

    let windows = bus.windows();
    assert_eq!(windows.len(), 1);
    assert_eq!((windows[0].x0, windows[0].y0, windows[0].x1, windows[0].y1), (1, 1, 3, 2));
    assert!(windows[0].data.iter().all(|&b| b == Color::GREEN.value() as u8));
}

#[test]
fn test_control_surface_session() {
    let bus = MockBus::new();
    let session = bound_session(&bus, WordMode::Emulated8);
    let mut control = ControlSurface::new(&session, Some(Box::new(bus.backlight())));

    assert_eq!(control.execute_line("backlight on").unwrap(), Response::Ok);
    assert_eq!(control.execute_line("color red").unwrap(), Response::Ok);
    assert_eq!(control.execute_line("color?").unwrap().to_string(), "4 (red)");
    assert_eq!(control.execute_line("backlight?").unwrap().to_string(), "1");
    assert!(matches!(
        control.execute_line("pixel 400 0 1"),
        Err(CommandError::Display(DisplayError::OutOfBounds { .. }))
    ));
    assert!(matches!(control.execute_line("color mauve"), Err(CommandError::UnknownColor(_))));
    assert_eq!(control.execute_line("power off").unwrap(), Response::Ok);

    let mut backlight = control.into_backlight().unwrap();
    backlight.set(false).unwrap();
    assert_eq!(bus.backlight_level(), Some(false));
}

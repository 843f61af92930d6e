/*
 *  display/mod.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - word codec, controller protocol, drawing surface
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod codec;
pub mod color;

// Controller and drawing layers
pub mod protocol;
pub mod surface;
pub mod session;

// Text control surface
pub mod command;

// Hardware and mock backends
pub mod drivers;

// Re-exports for convenience
pub use traits::{Transport, ResetLine, BacklightLine};
pub use error::{DisplayError, TransportError, Phase};
pub use codec::{WordMode, WireWord, WordCodec};
pub use color::{Color, PixelFormat};
pub use protocol::Controller;
pub use surface::{WindowedSurface, RectStyle};
pub use session::DeviceSession;
pub use command::{DrawCommand, ControlSurface, Response, CommandError};

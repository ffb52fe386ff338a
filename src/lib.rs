#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time Mandelbrot renderer
//!
//! The Mandelbrot takes a point on the complex plane and repeatedly
//! multiplies it by itself, adding the point back in each time, and
//! measures how quickly that number goes to infinity.  This
//! "velocity" is the number used to render the image.
//!
//! A render is two steps.  First the escape field is computed: for
//! each pixel, the last iteration at which its point was still within
//! a radius of 2, and whether it ever left.  Then the finished field
//! is colored: the escape count picks the hue, escaped points are
//! bright, and the black heart of the set is exactly that, black.
//!
//! ```no_run
//! use mandelbrot::{FractalRenderer, RenderParams};
//!
//! let image = FractalRenderer::new().render(&RenderParams::default()).unwrap();
//! image.save("mandelbrot.png").unwrap();
//! ```

pub mod color;
pub mod encode;
pub mod error;
pub mod field;
pub mod planes;
pub mod raster;
pub mod renderer;

pub use crate::encode::{Format, GenerateResponse};
pub use crate::error::RenderError;
pub use crate::field::{escape_time, Deadline, Escape, Interrupt, Never, PixelField};
pub use crate::planes::{Pixel, PlaneMapper, Resolution, Viewport};
pub use crate::raster::Image;
pub use crate::renderer::{FractalRenderer, RenderParams};

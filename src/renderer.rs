// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The FractalRenderer: five numbers in, one image out.

use crate::color::colorize;
use crate::error::RenderError;
use crate::field::{self, Interrupt, Never, PixelField};
use crate::planes::{PlaneMapper, Resolution, Viewport};
use crate::raster::Image;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything a single render needs.  Deserializing accepts the
/// service's request body: every field is optional and falls back to
/// the defaults, and unknown fields are ignored.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// The iteration budget per pixel.
    #[serde(rename = "iterations")]
    pub max_iter: usize,
    /// Real coordinate of the first column.
    pub re_min: f64,
    /// Real coordinate of the last column.
    pub re_max: f64,
    /// Imaginary coordinate of row 0.
    pub im_min: f64,
    /// Imaginary coordinate of the last row.
    pub im_max: f64,
}

impl Default for RenderParams {
    fn default() -> Self {
        RenderParams {
            width: 640,
            height: 480,
            max_iter: 100,
            re_min: -2.0,
            re_max: 1.0,
            im_min: -1.0,
            im_max: 1.0,
        }
    }
}

impl RenderParams {
    /// The pixel grid.
    pub fn resolution(&self) -> Resolution {
        Resolution(self.width, self.height)
    }

    /// The region of the complex plane.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.re_min, self.re_max, self.im_min, self.im_max)
    }

    /// Checks every parameter without rendering anything.
    pub fn validate(&self) -> Result<PlaneMapper, RenderError> {
        if self.max_iter == 0 {
            return Err(RenderError::invalid("max_iter", "must be at least 1"));
        }
        PlaneMapper::new(self.resolution(), self.viewport())
    }
}

/// Renders escape-time images.  Holds nothing between calls except
/// the number of worker threads to use.
#[derive(Copy, Clone, Debug)]
pub struct FractalRenderer {
    threads: usize,
}

impl Default for FractalRenderer {
    fn default() -> Self {
        FractalRenderer::new()
    }
}

impl FractalRenderer {
    /// A renderer using one worker per CPU.
    pub fn new() -> Self {
        FractalRenderer::with_threads(num_cpus::get())
    }

    /// A renderer using `threads` workers; zero is treated as one.
    pub fn with_threads(threads: usize) -> Self {
        FractalRenderer {
            threads: threads.max(1),
        }
    }

    /// The number of workers each render uses.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Renders the image for `params`.
    pub fn render(&self, params: &RenderParams) -> Result<Image, RenderError> {
        self.render_interruptible(params, &Never)
    }

    /// Renders, consulting `interrupt` between iterations.  An
    /// interrupted render still returns a complete image: the points
    /// that had not escaped by then are drawn as interior points.
    pub fn render_interruptible(
        &self,
        params: &RenderParams,
        interrupt: &dyn Interrupt,
    ) -> Result<Image, RenderError> {
        let field = self.render_field_interruptible(params, interrupt)?;
        Ok(colorize(&field))
    }

    /// Computes the escape field without coloring it.
    pub fn render_field(&self, params: &RenderParams) -> Result<PixelField, RenderError> {
        self.render_field_interruptible(params, &Never)
    }

    /// Computes the escape field, consulting `interrupt` between
    /// batches of iterations.
    #[tracing::instrument(
        skip_all,
        fields(width = params.width, height = params.height, max_iter = params.max_iter)
    )]
    pub fn render_field_interruptible(
        &self,
        params: &RenderParams,
        interrupt: &dyn Interrupt,
    ) -> Result<PixelField, RenderError> {
        let plane = params.validate()?;
        let started = Instant::now();
        let field = field::compute(&plane, params.max_iter, self.threads, interrupt)?;
        if field.is_truncated() {
            tracing::warn!(
                completed = field.iterations_completed(),
                "render interrupted; undiverged points are approximate"
            );
        }
        tracing::info!(
            threads = self.threads,
            diverged = field.diverged_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "field computed"
        );
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn params(width: usize, height: usize, max_iter: usize) -> RenderParams {
        RenderParams {
            width,
            height,
            max_iter,
            ..RenderParams::default()
        }
    }

    #[test]
    fn defaults_match_the_service() {
        let defaults = RenderParams::default();
        assert_eq!((defaults.width, defaults.height), (640, 480));
        assert_eq!(defaults.max_iter, 100);
        assert_eq!(defaults.viewport(), Viewport::new(-2.0, 1.0, -1.0, 1.0));
    }

    #[test]
    fn image_has_the_requested_shape() {
        let img = FractalRenderer::with_threads(2)
            .render(&params(13, 7, 30))
            .unwrap();
        assert_eq!(img.width(), 13);
        assert_eq!(img.height(), 7);
        assert_eq!(img.as_bytes().len(), 13 * 7 * 3);
    }

    #[test]
    fn renders_are_deterministic() {
        let p = params(40, 30, 60);
        let first = FractalRenderer::with_threads(4).render(&p).unwrap();
        let second = FractalRenderer::with_threads(1).render(&p).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let renderer = FractalRenderer::with_threads(1);
        for bad in &[
            params(0, 4, 10),
            params(4, 0, 10),
            params(4, 4, 0),
            RenderParams {
                re_min: 1.0,
                re_max: -2.0,
                ..RenderParams::default()
            },
            RenderParams {
                im_max: std::f64::NAN,
                ..RenderParams::default()
            },
        ] {
            match renderer.render(bad) {
                Err(RenderError::InvalidParameter { .. }) => {}
                other => panic!("{:?} gave {:?}", bad, other),
            }
        }
    }

    #[test]
    fn unallocatable_resolutions_are_rejected() {
        let side = 1usize << (std::mem::size_of::<usize>() * 4 - 1);
        let huge = params(side, side, 1);
        match FractalRenderer::with_threads(1).render_field(&huge) {
            Err(RenderError::InvalidParameter { name, .. }) => assert_eq!(name, "width"),
            other => panic!("unexpected {:?}", other.map(|f| f.escapes().len())),
        }
    }

    #[test]
    fn single_pixel_renders_the_corner() {
        let corner = FractalRenderer::with_threads(3)
            .render_field(&params(1, 1, 5))
            .unwrap();
        assert_eq!(corner.escapes().len(), 1);
        assert_eq!(
            corner.escapes()[0],
            field::escape_time(num::Complex::new(-2.0, -1.0), 5)
        );
    }

    #[test]
    fn cancelled_render_still_returns_a_full_image() {
        let flag = AtomicBool::new(true);
        let img = FractalRenderer::with_threads(2)
            .render_interruptible(&params(10, 10, 1000), &flag)
            .unwrap();
        assert_eq!(img.as_bytes().len(), 300);
    }

    #[test]
    fn request_bodies_fill_in_defaults() {
        let p: RenderParams =
            serde_json::from_str(r#"{"width": 32, "iterations": 7, "delay": 3}"#).unwrap();
        assert_eq!(p.width, 32);
        assert_eq!(p.height, 480);
        assert_eq!(p.max_iter, 7);
        assert_eq!(p.re_min, -2.0);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane with an arbitrary pair of
//! corners defining the leftlower and rightupper corners of the
//! viewport.
//!
//! The mapping is an evenly spaced sampling that includes both
//! edges: column 0 lands on `re_min`, the last column lands exactly
//! on `re_max`, and likewise for rows and the imaginary axis.  Row 0
//! is the `im_min` edge; nothing is flipped.

use crate::error::RenderError;
use itertools::iproduct;
use num::Complex;
use std::mem;

/// Bytes per pixel of the widest buffer a render allocates: the sample
/// points and orbits are one `Complex<f64>` per pixel, and every other
/// per-pixel buffer is no wider.
pub const PIXEL_BYTES: usize = mem::size_of::<Complex<f64>>();

/// The most pixels a single render may have, so that no per-pixel
/// buffer exceeds the largest allocation the platform allows.
pub const MAX_PIXELS: usize = isize::max_value() as usize / PIXEL_BYTES;

/// Describes the width and height of an integral plane that is
/// assumed to start at 0,0.  Both must be at least one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Resolution(pub usize, pub usize);

/// Describes the lower-left corner and upper-right corner of the
/// Complex plane, treating the real part of each value as the
/// x-component and the imaginary part of each value as the
/// y-component.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport(pub Complex<f64>, pub Complex<f64>);

impl Viewport {
    /// Builds a viewport from its four bounds.
    pub fn new(re_min: f64, re_max: f64, im_min: f64, im_max: f64) -> Self {
        Viewport(Complex::new(re_min, im_min), Complex::new(re_max, im_max))
    }

    /// The left edge.
    pub fn re_min(&self) -> f64 {
        self.0.re
    }

    /// The right edge.
    pub fn re_max(&self) -> f64 {
        self.1.re
    }

    /// The lower edge, drawn as row 0.
    pub fn im_min(&self) -> f64 {
        self.0.im
    }

    /// The upper edge, drawn as the last row.
    pub fn im_max(&self) -> f64 {
        self.1.im
    }
}

/// Describes the x, y of a pixel in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Contains the definitions of two planes: an integral cartesian
/// plane and a complex one.  Maps pixels of the former onto sample
/// points of the latter.
#[derive(Debug)]
pub struct PlaneMapper {
    /// The right-upper hand corner of the integral cartesian plane.
    /// The left-lower is assumed to be at 0,0
    pub resolution: Resolution,
    /// The two corners defining the complex plane, left-lower and
    /// right-upper
    pub viewport: Viewport,
    // Distance in the complex plane between neighbouring columns and
    // neighbouring rows, respectively.  Zero along an axis that has a
    // single pixel.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Validates both planes and precomputes the
    /// sampling steps.
    pub fn new(resolution: Resolution, viewport: Viewport) -> Result<PlaneMapper, RenderError> {
        let Resolution(width, height) = resolution;
        if width == 0 {
            return Err(RenderError::invalid("width", "must be at least 1"));
        }
        if height == 0 {
            return Err(RenderError::invalid("height", "must be at least 1"));
        }
        if width > u32::max_value() as usize || height > u32::max_value() as usize {
            return Err(RenderError::invalid(
                "width",
                format!("{}x{} exceeds the largest encodable image", width, height),
            ));
        }
        let fits = width
            .checked_mul(height)
            .map_or(false, |pixels| pixels <= MAX_PIXELS);
        if !fits {
            return Err(RenderError::invalid(
                "width",
                format!("{}x{} pixels do not fit in memory", width, height),
            ));
        }

        let bounds = [
            ("re_min", viewport.re_min()),
            ("re_max", viewport.re_max()),
            ("im_min", viewport.im_min()),
            ("im_max", viewport.im_max()),
        ];
        for (name, value) in bounds.iter() {
            if !value.is_finite() {
                return Err(RenderError::invalid(*name, format!("{} is not finite", value)));
            }
        }

        if viewport.re_min() >= viewport.re_max() {
            return Err(RenderError::invalid(
                "re_min",
                "the left lower corner is not to the left of the right upper corner",
            ));
        }
        if viewport.im_min() >= viewport.im_max() {
            return Err(RenderError::invalid(
                "im_min",
                "the left lower corner is not lower than the right upper corner",
            ));
        }

        // The span itself can overflow even when both ends are finite.
        let region_width = viewport.re_max() - viewport.re_min();
        let region_height = viewport.im_max() - viewport.im_min();
        if !region_width.is_finite() || !region_height.is_finite() {
            return Err(RenderError::invalid("re_max", "the viewport is too large to sample"));
        }

        let steps = (step(region_width, width), step(region_height, height));

        Ok(PlaneMapper {
            resolution,
            viewport,
            steps,
        })
    }

    /// Columns in the integral plane.
    pub fn width(&self) -> usize {
        self.resolution.0
    }

    /// Rows in the integral plane.
    pub fn height(&self) -> usize {
        self.resolution.1
    }

    /// The total number of pixels in the integral grid.  Used to
    /// calculate memory needs.
    pub fn pixel_count(&self) -> usize {
        self.resolution.0 * self.resolution.1
    }

    /// Given a pixel on the integral cartesian plane, return the
    /// complex sample point it stands for.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            sample(
                self.viewport.re_min(),
                self.viewport.re_max(),
                self.steps.0,
                pixel.0,
                self.resolution.0,
            ),
            sample(
                self.viewport.im_min(),
                self.viewport.im_max(),
                self.steps.1,
                pixel.1,
                self.resolution.1,
            ),
        )
    }

    /// The sample points of a band of rows, in row-major order.
    pub fn row_points(
        &self,
        first_row: usize,
        rows: usize,
    ) -> impl Iterator<Item = Complex<f64>> + '_ {
        iproduct!(first_row..first_row + rows, 0..self.resolution.0)
            .map(move |(row, column)| self.pixel_to_point(&Pixel(column, row)))
    }
}

fn step(span: f64, count: usize) -> f64 {
    if count > 1 {
        span / ((count - 1) as f64)
    } else {
        0.0
    }
}

// The far edge is pinned rather than accumulated so that it lands on
// the bound exactly.
fn sample(low: f64, high: f64, step: f64, index: usize, count: usize) -> f64 {
    if count > 1 && index == count - 1 {
        high
    } else {
        (index as f64) * step + low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(width: usize, height: usize, viewport: Viewport) -> PlaneMapper {
        PlaneMapper::new(Resolution(width, height), viewport).unwrap()
    }

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(Resolution(4, 4), Viewport::new(-1.0, 1.0, 1.0, -1.0));
        assert!(pm.is_err());
        let pm = PlaneMapper::new(Resolution(4, 4), Viewport::new(1.0, -1.0, -1.0, 1.0));
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_fails_on_flat_shape() {
        let pm = PlaneMapper::new(Resolution(4, 4), Viewport::new(0.5, 0.5, -1.0, 1.0));
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(Resolution(4, 4), Viewport::new(-1.0, 1.0, -1.0, 1.0));
        assert!(pm.is_ok());
    }

    #[test]
    fn planemapper_rejects_empty_planes() {
        let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0);
        match PlaneMapper::new(Resolution(0, 4), viewport) {
            Err(RenderError::InvalidParameter { name, .. }) => assert_eq!(name, "width"),
            other => panic!("unexpected {:?}", other),
        }
        match PlaneMapper::new(Resolution(4, 0), viewport) {
            Err(RenderError::InvalidParameter { name, .. }) => assert_eq!(name, "height"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn planemapper_rejects_non_finite_bounds() {
        let pm = PlaneMapper::new(Resolution(4, 4), Viewport::new(std::f64::NAN, 1.0, -1.0, 1.0));
        assert!(pm.is_err());
        let pm = PlaneMapper::new(
            Resolution(4, 4),
            Viewport::new(-2.0, std::f64::INFINITY, -1.0, 1.0),
        );
        assert!(pm.is_err());
        let pm = PlaneMapper::new(
            Resolution(4, 4),
            Viewport::new(-std::f64::MAX, std::f64::MAX, -1.0, 1.0),
        );
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_rejects_overflowing_resolution() {
        let pm = PlaneMapper::new(
            Resolution(u32::max_value() as usize, u32::max_value() as usize),
            Viewport::new(-2.0, 1.0, -1.0, 1.0),
        );
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_rejects_resolutions_too_large_to_allocate() {
        let side = 1usize << (mem::size_of::<usize>() * 4 - 1);
        let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0);
        match PlaneMapper::new(Resolution(side, side), viewport) {
            Err(RenderError::InvalidParameter { name, reason }) => {
                assert_eq!(name, "width");
                assert!(reason.contains("do not fit in memory"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn planemapper_accepts_the_largest_allocatable_strip() {
        let width = MAX_PIXELS.min(u32::max_value() as usize);
        let pm = PlaneMapper::new(Resolution(width, 1), Viewport::new(-2.0, 1.0, -1.0, 1.0));
        assert!(pm.is_ok());
    }

    #[test]
    fn pixel_to_point_on_positive_planes() {
        let pm = mapper(5, 5, Viewport::new(0.0, 4.0, 0.0, 4.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(4.0, 4.0));
    }

    #[test]
    fn pixel_to_points_on_mixed_planes() {
        let pm = mapper(5, 5, Viewport::new(-2.0, 2.0, -2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(2.0, 2.0));
    }

    #[test]
    fn row_zero_is_the_lower_edge() {
        let pm = mapper(3, 3, Viewport::new(-2.0, 1.0, -1.0, 1.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)).im, -1.0);
        assert_eq!(pm.pixel_to_point(&Pixel(0, 1)).im, 0.0);
        assert_eq!(pm.pixel_to_point(&Pixel(0, 2)).im, 1.0);
        assert_eq!(pm.pixel_to_point(&Pixel(1, 0)).re, -0.5);
    }

    #[test]
    fn far_edges_are_exact() {
        let pm = mapper(7, 11, Viewport::new(-2.1, 0.7, -1.3, 1.1));
        assert_eq!(pm.pixel_to_point(&Pixel(6, 10)), Complex::new(0.7, 1.1));
    }

    #[test]
    fn single_pixel_samples_the_lower_left_corner() {
        let pm = mapper(1, 1, Viewport::new(-2.0, 1.0, -1.0, 1.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -1.0));
    }

    #[test]
    fn row_points_are_row_major() {
        let pm = mapper(3, 3, Viewport::new(-2.0, 1.0, -1.0, 1.0));
        let points: Vec<_> = pm.row_points(1, 2).collect();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], Complex::new(-2.0, 0.0));
        assert_eq!(points[2], Complex::new(1.0, 0.0));
        assert_eq!(points[3], Complex::new(-2.0, 1.0));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The rendered image: a caller-owned grid of RGB byte triples.

/// A width × height grid of 8-bit RGB pixels, stored row-major with
/// row 0 first.  Row 0 is the `im_min` edge of the viewport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Image {
    pub(crate) fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height * 3);
        Image {
            width,
            height,
            pixels,
        }
    }

    /// Columns of pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows of pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The raw bytes, three per pixel.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Hands the raw bytes to the caller.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// The color at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let offset = (y * self.width + x) * 3;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }

    /// Every pixel, row 0 first.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels.chunks(3).map(|p| [p[0], p[1], p[2]])
    }
}

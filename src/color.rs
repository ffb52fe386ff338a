// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a finished field into colors.
//!
//! The escape count, as a fraction of the iteration budget, is the
//! hue.  Saturation is always full.  Points that escaped are drawn at
//! full brightness and points that never did are black.  Channels are
//! scaled to bytes by truncation.

use crate::field::{Escape, PixelField};
use crate::raster::Image;

/// Standard HSV to RGB conversion for `h`, `s`, `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    if s == 0.0 {
        return [v, v, v];
    }
    let sector = (h * 6.0) as i64;
    let f = (h * 6.0) - sector as f64;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector.rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Scales a channel in `[0, 1]` to a byte, truncating.
#[inline]
pub fn quantize(channel: f64) -> u8 {
    (channel * 255.0) as u8
}

/// The color of a single pixel.
pub fn escape_color(escape: Escape, max_iter: usize) -> [u8; 3] {
    let hue = escape.count as f64 / max_iter as f64;
    let value = if escape.diverged { 1.0 } else { 0.0 };
    let [r, g, b] = hsv_to_rgb(hue, 1.0, value);
    [quantize(r), quantize(g), quantize(b)]
}

/// Colors every pixel of the field, row 0 first.
pub fn colorize(field: &PixelField) -> Image {
    let max_iter = field.max_iter();
    let mut pixels = Vec::with_capacity(field.escapes().len() * 3);
    for escape in field.escapes() {
        pixels.extend_from_slice(&escape_color(*escape, max_iter));
    }
    Image::from_raw(field.width(), field.height(), pixels)
}

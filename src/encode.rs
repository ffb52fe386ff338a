// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Serializing an image for files and for transport.
//!
//! The renderer itself only produces raw pixels.  These helpers wrap
//! them as PNG or binary PPM, and as the base64 PNG string that the
//! JSON service hands back to its clients.

use crate::error::RenderError;
use crate::raster::Image;
use base64::Engine;
use image::png::PNGEncoder;
use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The file formats an image can be written as.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    /// Portable Network Graphics, RGB8.
    Png,
    /// Binary (P6) portable pixmap.
    Ppm,
}

impl Format {
    /// Picks a format from a file extension; `.ppm` and `.pnm` are
    /// binary pixmaps, everything else is PNG.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Format {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_ref().map(String::as_str) {
            Some("ppm") | Some("pnm") => Format::Ppm,
            _ => Format::Png,
        }
    }
}

/// The body of a successful generate call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Base64-encoded PNG.
    pub image: String,
}

impl Image {
    /// Writes the image in the given format.
    pub fn write_to<W: Write>(&self, output: W, format: Format) -> Result<(), RenderError> {
        let (width, height) = (self.width() as u32, self.height() as u32);
        match format {
            Format::Png => {
                PNGEncoder::new(output).encode(self.as_bytes(), width, height, ColorType::RGB(8))?
            }
            Format::Ppm => {
                let mut encoder = PNMEncoder::new(output)
                    .with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
                encoder.encode(self.as_bytes(), width, height, ColorType::RGB(8))?
            }
        }
        Ok(())
    }

    /// The image as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, Format::Png)?;
        Ok(buffer)
    }

    /// The image as binary PPM bytes.
    pub fn to_ppm(&self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, Format::Ppm)?;
        Ok(buffer)
    }

    /// PNG, base64 encoded with the standard padded alphabet.
    pub fn to_base64_png(&self) -> Result<String, RenderError> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_png()?))
    }

    /// Wraps the image the way the JSON service answers.
    pub fn to_response(&self) -> Result<GenerateResponse, RenderError> {
        Ok(GenerateResponse {
            image: self.to_base64_png()?,
        })
    }

    /// Writes the image to `path`, choosing the format from its
    /// extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let format = Format::from_path(&path);
        let mut output = BufWriter::new(File::create(path)?);
        self.write_to(&mut output, format)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{FractalRenderer, RenderParams};

    fn small() -> Image {
        let params = RenderParams {
            width: 6,
            height: 4,
            max_iter: 20,
            ..RenderParams::default()
        };
        FractalRenderer::new().render(&params).unwrap()
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(Format::from_path("out.png"), Format::Png);
        assert_eq!(Format::from_path("out.PPM"), Format::Ppm);
        assert_eq!(Format::from_path("out.pnm"), Format::Ppm);
        assert_eq!(Format::from_path("out"), Format::Png);
    }

    #[test]
    fn png_round_trips_through_the_decoder() {
        let img = small();
        let png = img.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgb();
        assert_eq!(decoded.width(), 6);
        assert_eq!(decoded.height(), 4);
        assert_eq!(decoded.into_raw(), img.into_bytes());
    }

    #[test]
    fn ppm_carries_the_raw_pixels() {
        let img = small();
        let ppm = img.to_ppm().unwrap();
        assert_eq!(&ppm[..2], b"P6");
        assert!(ppm.ends_with(img.as_bytes()));
    }

    #[test]
    fn base64_decodes_to_the_png() {
        let img = small();
        let encoded = img.to_base64_png().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(decoded, img.to_png().unwrap());
    }

    #[test]
    fn response_serializes_as_an_image_field() {
        let response = small().to_response().unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["image"].as_str(), Some(response.image.as_str()));
    }
}

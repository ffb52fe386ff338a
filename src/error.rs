// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a render can be refused or fail.

use failure::Fail;
use std::io;

/// Everything the renderer can report back to its caller.  Invalid
/// input is always rejected up front; a render that has started either
/// completes or reports a worker failure, it never hands back a
/// partially written image.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// A width, height, iteration budget, or bound was out of range.
    #[fail(display = "invalid parameter `{}`: {}", name, reason)]
    InvalidParameter {
        /// The parameter as the caller named it.
        name: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// The image encoder, or the file underneath it, failed.
    #[fail(display = "could not encode image: {}", _0)]
    Encoding(#[cause] io::Error),

    /// One of the band workers panicked.
    #[fail(display = "a render worker panicked")]
    WorkerPanicked,
}

impl RenderError {
    pub(crate) fn invalid<S: Into<String>>(name: &'static str, reason: S) -> Self {
        RenderError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        RenderError::Encoding(err)
    }
}

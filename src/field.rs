// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time field.
//!
//! The Mandelbrot takes a point on the complex plane, starts z at
//! zero, and repeatedly replaces z with z² + c, measuring how quickly
//! that number runs past a radius of 2.  Every pixel of the field
//! records two things: the last iteration index at which its point
//! was still inside the radius, and whether it ever left at all.
//! Points that never leave are the black heart of the set.
//!
//! The field is a flat, row-major arena.  It is cut into contiguous
//! bands of rows, one per worker thread, and every band is advanced in
//! lockstep, one iteration at a time across all of its pixels.  Each
//! pixel's trajectory depends only on its own point, so the bands
//! share no pixel state.  Every `CHECK_INTERVAL` iterations the bands
//! meet at a checkpoint, where one of them polls the interrupt and all
//! of them abide by the answer; an interrupted field is therefore
//! exactly the field of a shorter budget.  Every buffer is reserved
//! before any worker starts.

use crate::error::RenderError;
use crate::planes::{Pixel, PlaneMapper, Resolution};
use num::Complex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::time::Instant;

/// Escape radius squared.
const RADIUS_SQR: f64 = 4.0;

/// Iterations between interrupt checkpoints.
pub const CHECK_INTERVAL: usize = 16;

/// The outcome of iterating a single point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Escape {
    /// The highest iteration index after which the point was still
    /// inside the escape radius.  Frozen once the point escapes.
    pub count: usize,
    /// Whether the point left the escape radius within the budget.
    pub diverged: bool,
}

/// Iterates a single point.  This is the classic iterator function,
/// kept for probing individual points; it agrees exactly with the
/// field computation.
pub fn escape_time(c: Complex<f64>, max_iter: usize) -> Escape {
    let mut escape = Escape::default();
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for i in 0..max_iter {
        z = z * z + c;
        if z.norm_sqr() > RADIUS_SQR {
            escape.diverged = true;
            break;
        }
        escape.count = i;
    }
    escape
}

/// Something a long render can consult between batches of iterations
/// to learn that it should stop early.  It is polled from a single
/// worker at each checkpoint; a panic while polling stops the render
/// and is reported as a worker failure.
pub trait Interrupt: Sync {
    /// True once the render should stop iterating.
    fn interrupted(&self) -> bool;
}

/// Never interrupts.
#[derive(Copy, Clone, Debug, Default)]
pub struct Never;

impl Interrupt for Never {
    fn interrupted(&self) -> bool {
        false
    }
}

/// A cancel flag, usually raised from another thread.
impl Interrupt for AtomicBool {
    fn interrupted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Interrupts once the given instant has passed.
#[derive(Copy, Clone, Debug)]
pub struct Deadline(pub Instant);

impl Interrupt for Deadline {
    fn interrupted(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// The per-pixel result of a render, before any color is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelField {
    resolution: Resolution,
    max_iter: usize,
    iterations_completed: usize,
    escapes: Vec<Escape>,
}

impl PixelField {
    /// Columns in the field.
    pub fn width(&self) -> usize {
        self.resolution.0
    }

    /// Rows in the field.
    pub fn height(&self) -> usize {
        self.resolution.1
    }

    /// The iteration budget the field was computed with.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// How many lockstep iterations ran, the same for every band.
    /// Equal to `max_iter` unless the render was interrupted, in which
    /// case the field is identical to one computed with this many
    /// iterations as its budget.
    pub fn iterations_completed(&self) -> usize {
        self.iterations_completed
    }

    /// True when the render was cut short by an interrupt.
    pub fn is_truncated(&self) -> bool {
        self.iterations_completed < self.max_iter
    }

    /// Every pixel, row 0 first.
    pub fn escapes(&self) -> &[Escape] {
        &self.escapes
    }

    /// The escape of a single pixel.
    pub fn get(&self, pixel: &Pixel) -> Escape {
        self.escapes[pixel.1 * self.resolution.0 + pixel.0]
    }

    /// How many pixels escaped.
    pub fn diverged_count(&self) -> usize {
        self.escapes.iter().filter(|e| e.diverged).count()
    }
}

/// Where the bands agree whether to go on.
struct Checkpoint<'a> {
    interrupt: &'a dyn Interrupt,
    barrier: Barrier,
    halted: AtomicBool,
    panicked: AtomicBool,
}

impl<'a> Checkpoint<'a> {
    fn new(interrupt: &'a dyn Interrupt, bands: usize) -> Self {
        Checkpoint {
            interrupt,
            barrier: Barrier::new(bands),
            halted: AtomicBool::new(false),
            panicked: AtomicBool::new(false),
        }
    }

    /// Every band must call this at the same iterations.
    fn should_stop(&self) -> bool {
        if self.barrier.wait().is_leader() {
            let halted = panic::catch_unwind(AssertUnwindSafe(|| self.interrupt.interrupted()))
                .unwrap_or_else(|_| {
                    self.panicked.store(true, Ordering::SeqCst);
                    true
                });
            self.halted.store(halted, Ordering::SeqCst);
        }
        self.barrier.wait();
        self.halted.load(Ordering::SeqCst)
    }
}

/// One worker's share of the field.
struct Band<'a> {
    first_row: usize,
    points: Vec<Complex<f64>>,
    orbits: Vec<Complex<f64>>,
    escapes: &'a mut [Escape],
}

/// Reserves a per-pixel buffer, refusing rather than aborting when the
/// allocator cannot provide it.
fn reserve<T>(len: usize) -> Result<Vec<T>, RenderError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| {
        RenderError::invalid("width", format!("{} pixels do not fit in memory", len))
    })?;
    Ok(buffer)
}

/// Computes the field for `plane` with `threads` workers.  The thread
/// count is clamped to the number of rows; results are identical for
/// every thread count.
pub fn compute(
    plane: &PlaneMapper,
    max_iter: usize,
    threads: usize,
    interrupt: &dyn Interrupt,
) -> Result<PixelField, RenderError> {
    if max_iter == 0 {
        return Err(RenderError::invalid("max_iter", "must be at least 1"));
    }

    let width = plane.width();
    let height = plane.height();
    let threads = threads.max(1).min(height);
    let band_rows = (height + threads - 1) / threads;

    let mut escapes = reserve(plane.pixel_count())?;
    escapes.resize(plane.pixel_count(), Escape::default());

    let mut bands = Vec::with_capacity(threads);
    for (band, escapes) in escapes.chunks_mut(band_rows * width).enumerate() {
        let first_row = band * band_rows;
        let mut points = reserve(escapes.len())?;
        points.extend(plane.row_points(first_row, escapes.len() / width));
        let mut orbits = reserve(escapes.len())?;
        orbits.resize(escapes.len(), Complex::new(0.0, 0.0));
        bands.push(Band {
            first_row,
            points,
            orbits,
            escapes,
        });
    }

    let checkpoint = Checkpoint::new(interrupt, bands.len());
    let completed = crossbeam::scope(|spawner| {
        let checkpoint = &checkpoint;
        let handles: Vec<_> = bands
            .into_iter()
            .enumerate()
            .map(|(index, mut band)| {
                spawner.spawn(move |_| {
                    let completed = iterate_band(&mut band, max_iter, checkpoint);
                    tracing::debug!(
                        band = index,
                        first_row = band.first_row,
                        rows = band.escapes.len() / width,
                        completed,
                        "band finished"
                    );
                    completed
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Result<Vec<usize>, _>>()
    })
    .map_err(|_| RenderError::WorkerPanicked)?
    .map_err(|_| RenderError::WorkerPanicked)?;

    if checkpoint.panicked.load(Ordering::SeqCst) {
        return Err(RenderError::WorkerPanicked);
    }

    Ok(PixelField {
        resolution: plane.resolution,
        max_iter,
        iterations_completed: completed.into_iter().min().unwrap_or(max_iter),
        escapes,
    })
}

/// Advances one band of pixels in lockstep and returns the number of
/// iterations that ran.  A band whose pixels have all escaped stops
/// doing work but keeps attending the checkpoints.
fn iterate_band(band: &mut Band, max_iter: usize, checkpoint: &Checkpoint) -> usize {
    let mut live = band.escapes.len();
    for i in 0..max_iter {
        if i > 0 && i % CHECK_INTERVAL == 0 && checkpoint.should_stop() {
            return i;
        }
        if live == 0 {
            continue;
        }
        live = 0;
        let pixels = band
            .orbits
            .iter_mut()
            .zip(&band.points)
            .zip(band.escapes.iter_mut());
        for ((z, c), escape) in pixels {
            if escape.diverged {
                continue;
            }
            *z = *z * *z + c;
            if z.norm_sqr() > RADIUS_SQR {
                escape.diverged = true;
            } else {
                escape.count = i;
                live += 1;
            }
        }
    }
    max_iter
}

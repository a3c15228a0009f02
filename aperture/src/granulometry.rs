// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Granulometric opening: the sequence of aperture integrals of
//! successive openings by growing Minkowski multiples of a rotating
//! pattern list. The accumulator ring-buffering is grounded
//! on `streamstats`'s fixed-capacity ring (`Streamstats<T>`); here the
//! ring holds whole opening snapshots rather than scalars, flushed into
//! a running accumulator once full.

use crate::array::ArrayView;
use crate::context::ArrayContext;
use crate::element::ElementKind;
use crate::morphology::{Morphology, SubtractionMode};
use crate::pattern::Pattern;
use crate::Error;

/// Result of a granulometry run: the non-increasing sequence of opening
/// sums, whether the source was fully eroded away, and the accumulated
/// sum of all openings observed.
pub struct GranulometryOutcome {
    pub sums_of_openings: Vec<f64>,
    pub done: bool,
    pub accumulator: Vec<f64>,
}

/// Scans once per index whether `dst` and `src` differ, then copies
/// `src` into `dst` in a single pass, avoiding a second scan to answer
/// "did anything change".
fn compare_and_copy(dst: &mut [f64], src: &[f64]) -> bool {
    let mut changed = false;
    for i in 0..dst.len() {
        if dst[i] != src[i] {
            changed = true;
        }
        dst[i] = src[i];
    }
    changed
}

/// Drives the iterative opening loop over a rotating list of patterns.
pub struct Granulometry<'a> {
    view: &'a ArrayView<'a>,
    patterns: Vec<Pattern>,
    kind: ElementKind,
    ring_capacity: usize,
}

impl<'a> Granulometry<'a> {
    pub fn new(view: &'a ArrayView<'a>, patterns: Vec<Pattern>, kind: ElementKind) -> Result<Self, Error> {
        if patterns.is_empty() {
            return Err(Error::invalid_argument("granulometry requires at least one pattern"));
        }
        Ok(Self {
            view,
            patterns,
            kind,
            ring_capacity: 4,
        })
    }

    /// Overrides the default ring capacity used to batch opening
    /// snapshots before flushing them into the accumulator.
    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity.max(1);
        self
    }

    pub fn run(&self, max_iterations: usize, ctx: &dyn ArrayContext) -> Result<GranulometryOutcome, Error> {
        log::debug!(
            "starting granulometry over {} pattern(s), max_iterations={max_iterations}",
            self.patterns.len()
        );
        let dims = self.view.dims().to_vec();
        let len = self.view.len();

        let mut current: Vec<f64> = self.view.as_slice().to_vec();
        let mut accumulator = vec![0.0f64; len];
        let mut ring: Vec<Vec<f64>> = Vec::with_capacity(self.ring_capacity);
        let mut sums = Vec::new();
        let mut m = 0usize;
        let mut k = 0usize;
        let mut use_carcasses = false;
        let mut done = false;

        for iter in 0..max_iterations {
            let pattern = &self.patterns[k % self.patterns.len()];

            let current_view = ArrayView::new(dims.clone(), &current)?;
            let morph = Morphology::new(&current_view, pattern.clone(), self.kind)?;
            let eroded = morph.erosion(SubtractionMode::None, ctx)?;

            let changed = compare_and_copy(&mut current, &eroded);
            if !changed {
                done = true;
                break;
            }

            m += 1;
            let multiple = pattern.minkowski_multiple(m + 1);
            let eroded_view = ArrayView::new(dims.clone(), &current)?;
            let dil_morph = Morphology::new(&eroded_view, multiple, self.kind)?;
            let opening = dil_morph.dilation(SubtractionMode::None, ctx)?;

            let sum: f64 = opening.iter().sum();
            sums.push(sum);

            ring.push(opening);
            if ring.len() >= self.ring_capacity {
                flush_ring(&mut ring, &mut accumulator);
            }

            k += 1;
            if k >= self.patterns.len() {
                // a fast carcass-based erosion path is not implemented;
                // `use_carcasses` is tracked but does not currently
                // change behavior.
                use_carcasses = true;
            }

            if ctx.part(iter as f64, max_iterations as f64).is_break() {
                log::debug!("granulometry cancelled at iteration {iter}");
                return Err(Error::Cancelled);
            }
        }

        log::debug!("granulometry finished after {} opening(s), done={done}", sums.len());
        flush_ring(&mut ring, &mut accumulator);
        Ok(GranulometryOutcome {
            sums_of_openings: sums,
            done,
            accumulator,
        })
    }
}

fn flush_ring(ring: &mut Vec<Vec<f64>>, accumulator: &mut [f64]) {
    for snapshot in ring.drain(..) {
        for (a, s) in accumulator.iter_mut().zip(snapshot.iter()) {
            *a += s;
        }
    }
}

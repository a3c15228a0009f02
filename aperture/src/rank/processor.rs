// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The incremental aperture engine.
//!
//! `RankOperationProcessor` slides one or two [`SummingHistogram`]s
//! across a pseudo-cyclically flat source of length `L`, using
//! precomputed linear `left`/`right` displacement lists (already
//! converted from the pattern's n-dimensional offsets by the
//! [`crate::stream`] façade, since the engine itself only ever deals in
//! linear pseudo-cyclic indices).

use crate::array::ArrayView;
use crate::element::{bucket_index, ElementKind};
use crate::histogram::SummingHistogram;
use crate::Error;

/// Linear (already strides-dotted) left/right/shifts displacement lists
/// for sliding an aperture by +1 along the flattened raster.
pub struct LinearPattern {
    pub shifts: Vec<i64>,
    pub left: Vec<i64>,
    pub right: Vec<i64>,
}

impl LinearPattern {
    pub fn from_pattern(pattern: &crate::pattern::Pattern, strides: &[usize]) -> Self {
        let to_linear = |offsets: &[Vec<i64>]| -> Vec<i64> {
            offsets
                .iter()
                .map(|o| {
                    o.iter()
                        .zip(strides.iter())
                        .map(|(c, s)| c * *s as i64)
                        .sum()
                })
                .collect()
        };
        Self {
            shifts: to_linear(pattern.shifts()),
            left: to_linear(pattern.left()),
            right: to_linear(pattern.right()),
        }
    }
}

/// Drives one or two shared histograms across the source, maintaining
/// the current aperture position.
pub struct RankOperationProcessor<'a> {
    source: &'a ArrayView<'a>,
    kind: ElementKind,
    bucket_bits: u32,
    coarse_bits: u32,
    simple: bool,
    linear: LinearPattern,
    /// the primary histogram position and the index it currently reflects
    histogram: SummingHistogram,
    position: Option<i64>,
}

impl<'a> RankOperationProcessor<'a> {
    pub fn new(
        source: &'a ArrayView<'a>,
        kind: ElementKind,
        bucket_bits: u32,
        coarse_bits: u32,
        simple: bool,
        linear: LinearPattern,
    ) -> Self {
        let width = 1usize << bucket_bits;
        let histogram = SummingHistogram::new(width, coarse_bits, simple);
        Self {
            source,
            kind,
            bucket_bits,
            coarse_bits,
            simple,
            linear,
            histogram,
            position: None,
        }
    }

    pub fn aperture_size(&self) -> usize {
        self.linear.shifts.len()
    }

    pub fn bucket_width(&self) -> usize {
        1usize << self.bucket_bits
    }

    fn bucket_of(&self, raw: f64) -> Result<usize, Error> {
        bucket_index(self.kind, raw, self.bucket_width())
    }

    /// A fresh histogram position sharing the current one's bucket
    /// table, used by two-value operators.
    pub fn share_histogram(&self) -> SummingHistogram {
        self.histogram.share()
    }

    /// Ensures the live histogram reflects the aperture at index `p`,
    /// rebuilding from scratch if this is the first access or if `p`
    /// does not immediately follow the last materialized index.
    pub fn seek(&mut self, p: i64) -> Result<(), Error> {
        match self.position {
            Some(prev) if prev + 1 == p => self.advance(p)?,
            Some(prev) if prev == p => {}
            _ => self.rebuild(p)?,
        }
        Ok(())
    }

    fn rebuild(&mut self, p: i64) -> Result<(), Error> {
        log::trace!("rebuilding aperture histogram at p={p} (non-sequential seek)");
        // Clear current contents by excluding everything we know about;
        // cheapest correct approach is to construct a fresh table-backed
        // histogram position with the same share-table topology is not
        // possible mid-flight (other holders may be pointing elsewhere),
        // so we instead exclude the previously included values directly.
        if let Some(prev) = self.position {
            for s in &self.linear.shifts {
                let raw = self.source.get_pseudo_cyclic(prev - s);
                let b = self.bucket_of(raw)?;
                self.histogram.exclude(b)?;
            }
        }
        for s in &self.linear.shifts {
            let raw = self.source.get_pseudo_cyclic(p - s);
            let b = self.bucket_of(raw)?;
            self.histogram.include(b);
        }
        self.position = Some(p);
        Ok(())
    }

    fn advance(&mut self, p: i64) -> Result<(), Error> {
        for s in &self.linear.right {
            let raw = self.source.get_pseudo_cyclic(p - 1 - s);
            let b = self.bucket_of(raw)?;
            self.histogram.exclude(b)?;
        }
        for s in &self.linear.left {
            let raw = self.source.get_pseudo_cyclic(p - s);
            let b = self.bucket_of(raw)?;
            self.histogram.include(b);
        }
        self.position = Some(p);
        Ok(())
    }

    pub fn histogram(&self) -> &SummingHistogram {
        &self.histogram
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn simple(&self) -> bool {
        self.simple
    }

    pub fn coarse_bits(&self) -> u32 {
        self.coarse_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    #[test]
    fn seek_sequential_matches_rebuild() {
        let data = [0.0, 3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        let view = ArrayView::new(vec![data.len()], &data).unwrap();
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let linear = LinearPattern::from_pattern(&pattern, view.strides());
        let mut proc = RankOperationProcessor::new(&view, ElementKind::U8, 4, 1, true, linear);

        for p in 0..data.len() as i64 {
            proc.seek(p).unwrap();
            let max_value = proc.histogram().percentile_value(proc.aperture_size() as u64);
            // brute-force aperture max
            let mut expect = f64::MIN;
            for s in [-1i64, 0, 1] {
                let raw = view.get_pseudo_cyclic(p - s);
                expect = expect.max(raw);
            }
            assert_eq!(max_value as f64, expect, "p={p}");
        }
    }
}

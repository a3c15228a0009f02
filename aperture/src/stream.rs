// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Binds a [`Pattern`]'s offsets and an array's dimensions to a
//! [`RankOperationProcessor`], driving it over the full index space
//!. Grounded on `rustcommon-heatmap`'s
//! `Window`-over-`Histogram` binding style: a thin façade that owns the
//! live processor and exposes per-index and whole-array entry points.

use crate::array::ArrayView;
use crate::context::ArrayContext;
use crate::element::ElementKind;
use crate::pattern::Pattern;
use crate::rank::{
    function_of_percentile_pair, function_of_sum, mean_between_percentiles, mean_between_values, percentile, rank,
    Filler, LinearPattern, RankOperationProcessor,
};
use crate::Error;

/// Bit-level / interpolation configuration, mirroring
/// `rustcommon_histogram::Builder` / `Histogram::builder()`.
#[derive(Clone, Debug)]
pub struct CustomRankPrecision {
    /// Intermediate aggregation levels; empty selects a single default
    /// level, which suffices for 8-bit sources.
    pub bit_levels: Vec<u32>,
    pub interpolated: bool,
    pub number_of_analyzed_bits: u32,
}

impl CustomRankPrecision {
    pub fn builder() -> CustomRankPrecisionBuilder {
        CustomRankPrecisionBuilder::default()
    }

    fn coarse_bits(&self) -> u32 {
        self.bit_levels
            .first()
            .copied()
            .unwrap_or_else(|| (self.number_of_analyzed_bits / 2).max(1))
            .min(self.number_of_analyzed_bits)
    }
}

/// Builder for [`CustomRankPrecision`], validating `bit_levels` and
/// `number_of_analyzed_bits`.
pub struct CustomRankPrecisionBuilder {
    bit_levels: Vec<u32>,
    interpolated: bool,
    number_of_analyzed_bits: u32,
}

impl Default for CustomRankPrecisionBuilder {
    fn default() -> Self {
        Self {
            bit_levels: Vec::new(),
            interpolated: false,
            number_of_analyzed_bits: 8,
        }
    }
}

impl CustomRankPrecisionBuilder {
    pub fn bit_levels(mut self, levels: Vec<u32>) -> Self {
        self.bit_levels = levels;
        self
    }

    pub fn interpolated(mut self, interpolated: bool) -> Self {
        self.interpolated = interpolated;
        self
    }

    pub fn number_of_analyzed_bits(mut self, bits: u32) -> Self {
        self.number_of_analyzed_bits = bits;
        self
    }

    pub fn build(self) -> Result<CustomRankPrecision, Error> {
        if self.number_of_analyzed_bits == 0 || self.number_of_analyzed_bits > 30 {
            return Err(Error::invalid_argument(
                "numberOfAnalyzedBits must be in 1..=30",
            ));
        }
        if self.bit_levels.len() > 31 {
            return Err(Error::invalid_argument("bitLevels must have at most 31 entries"));
        }
        if self.bit_levels.iter().any(|&b| b == 0 || b > 31) {
            return Err(Error::invalid_argument("bitLevels entries must be in 1..=31"));
        }
        if !self.bit_levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::invalid_argument("bitLevels must be strictly increasing"));
        }
        Ok(CustomRankPrecision {
            bit_levels: self.bit_levels,
            interpolated: self.interpolated,
            number_of_analyzed_bits: self.number_of_analyzed_bits,
        })
    }
}

/// Drives a live [`RankOperationProcessor`] over an entire array,
/// exposing both per-index (lazy) and whole-array (materializing)
/// entry points.
pub struct StreamingApertureProcessor<'a> {
    view: &'a ArrayView<'a>,
    proc: RankOperationProcessor<'a>,
}

impl<'a> StreamingApertureProcessor<'a> {
    pub fn new(
        view: &'a ArrayView<'a>,
        pattern: &Pattern,
        kind: ElementKind,
        precision: &CustomRankPrecision,
    ) -> Result<Self, Error> {
        if pattern.dim_count() != view.dims().len() {
            return Err(Error::size_mismatch(format!(
                "pattern has {} dimensions, array has {}",
                pattern.dim_count(),
                view.dims().len()
            )));
        }
        let linear = LinearPattern::from_pattern(pattern, view.strides());
        let proc = RankOperationProcessor::new(
            view,
            kind,
            precision.number_of_analyzed_bits,
            precision.coarse_bits(),
            !precision.interpolated,
            linear,
        );
        Ok(Self { view, proc })
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn percentile_at(&mut self, p: i64, r: f64) -> f64 {
        percentile(&mut self.proc, p, r)
    }

    pub fn rank_at(&mut self, p: i64, v: f64) -> f64 {
        rank(&mut self.proc, p, v)
    }

    pub fn mean_between_values_at(&mut self, p: i64, v1: f64, v2: f64, filler: Filler) -> f64 {
        mean_between_values(&mut self.proc, p, v1, v2, filler)
    }

    pub fn mean_between_percentiles_at(&mut self, p: i64, r1: f64, r2: f64, filler: Filler) -> f64 {
        mean_between_percentiles(&mut self.proc, p, r1, r2, filler)
    }

    pub fn function_of_sum_at(&mut self, p: i64, f: impl Fn(f64) -> f64) -> f64 {
        function_of_sum(&mut self.proc, p, f)
    }

    pub fn function_of_percentile_pair_at(
        &mut self,
        p: i64,
        src_p: f64,
        r1: f64,
        r2: f64,
        f: impl Fn(f64, f64, f64) -> f64,
    ) -> f64 {
        function_of_percentile_pair(&mut self.proc, p, src_p, r1, r2, f)
    }

    /// Materializes `meanBetweenValues(v1, v2)` for every index, per the
    /// same left-to-right seek order as [`Self::materialize_percentile`].
    pub fn materialize_mean_between_values(
        &mut self,
        v1: f64,
        v2: f64,
        filler: Filler,
        ctx: &dyn ArrayContext,
    ) -> Result<Vec<f64>, Error> {
        self.materialize(ctx, |s, p| s.mean_between_values_at(p, v1, v2, filler))
    }

    /// Materializes `percentile(p, r)` for every `p` in ascending linear
    /// order, honoring `ctx` cancellation at a coarse loop boundary.
    pub fn materialize_percentile(&mut self, r: f64, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        self.materialize(ctx, |s, p| s.percentile_at(p, r))
    }

    fn materialize(
        &mut self,
        ctx: &dyn ArrayContext,
        mut f: impl FnMut(&mut Self, i64) -> f64,
    ) -> Result<Vec<f64>, Error> {
        let len = self.len();
        if len == 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(len);
        for p in 0..len {
            out.push(f(self, p as i64));
            if p % 4096 == 0 && ctx.part(p as f64, len as f64).is_break() {
                log::debug!("materialize cancelled at index {p} of {len}");
                return Err(Error::Cancelled);
            }
        }
        Ok(out)
    }
}

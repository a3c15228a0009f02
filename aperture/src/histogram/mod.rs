// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The incremental bucketed summing histogram.
//!
//! A [`SummingHistogram`] represents the aperture multiset as bucket
//! counts and supports O(1)-amortized `include`/`exclude` as the pattern
//! slides, plus stepwise ("simple") and piecewise-linear ("precise")
//! rank/integral queries. Two histograms may [`SummingHistogram::share`]
//! a single [`table::BucketTable`] so that a difference between two
//! percentiles can be computed without duplicating bucket updates.

mod table;

pub use table::BucketTable;
use table::HolderState;

use crate::Error;
use std::cell::RefCell;
use std::rc::Rc;

/// Result of a one-shot (non-incremental) integral query between two
/// values, plus the boundary flags used to implement the "fill nearest"
/// mean-between-values policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegralBetween {
    pub integral: f64,
    pub count: f64,
    /// the interval lies entirely at or left of the non-empty range
    pub is_left_bound: bool,
    /// the interval lies entirely at or right of the non-empty range
    pub is_right_bound: bool,
}

/// The bucketed summing histogram. Construct with [`SummingHistogram::new`].
pub struct SummingHistogram {
    table: Rc<RefCell<BucketTable>>,
    state: Rc<RefCell<HolderState>>,
    /// `true` selects the stepwise ("simple") interpretation; `false`
    /// selects the piecewise-linear ("precise"/interpolated) one.
    simple: bool,
}

impl SummingHistogram {
    /// Constructs a new histogram with `width` buckets (a power of two),
    /// an intermediate aggregation level of `coarse_bits` width, under
    /// the requested interpretation.
    pub fn new(width: usize, coarse_bits: u32, simple: bool) -> Self {
        let mut table = BucketTable::new(width, coarse_bits);
        let state = Rc::new(RefCell::new(HolderState::default()));
        table.register(state.clone());
        Self {
            table: Rc::new(RefCell::new(table)),
            state,
            simple,
        }
    }

    pub fn is_simple(&self) -> bool {
        self.simple
    }

    pub fn width(&self) -> usize {
        self.table.borrow().width()
    }

    pub fn total(&self) -> u64 {
        self.table.borrow().total()
    }

    pub fn bars(&self) -> std::cell::Ref<'_, [u64]> {
        std::cell::Ref::map(self.table.borrow(), |t| t.bars())
    }

    pub fn current_value(&self) -> usize {
        self.state.borrow().current_value
    }

    /// Creates a second histogram position sharing this one's bucket
    /// table. The new position starts at value 0; callers typically
    /// `move_to_value`/`move_to_rank` it immediately afterwards.
    pub fn share(&self) -> Self {
        let state = Rc::new(RefCell::new(HolderState::default()));
        self.table.borrow_mut().register(state.clone());
        Self {
            table: self.table.clone(),
            state,
            simple: self.simple,
        }
    }

    pub fn share_count(&self) -> usize {
        self.table.borrow().share_count()
    }

    pub fn include(&self, v: usize) {
        self.table.borrow_mut().include(v);
    }

    pub fn exclude(&self, v: usize) -> Result<(), Error> {
        self.table.borrow_mut().exclude(v)
    }

    pub fn move_to_value(&self, v: usize) {
        let table = self.table.borrow();
        let mut state = self.state.borrow_mut();
        table.move_to_value(&mut state, v);
    }

    /// Moves to the smallest integer `v` with `r(v) > r` ("ties go
    /// left"). This is one more than the *percentile* value — callers
    /// wanting the percentile value itself should subtract one
    /// (saturating at zero), which also gives `percentile(p, N)` the
    /// maximum aperture value.
    pub fn move_to_rank(&self, r: u64) -> usize {
        let v = self.table.borrow().value_for_rank(r);
        self.move_to_value(v.min(self.width()));
        v
    }

    /// The percentile value for rank `r`: the integer `v` with
    /// `r(v) <= r < r(v+1)`, i.e. `move_to_rank(r) - 1`.
    pub fn percentile_value(&self, r: u64) -> usize {
        self.move_to_rank(r).saturating_sub(1)
    }

    /// Moves to the real-valued position `v = floor(v) + frac` used by
    /// precise/interpolated percentile results. `int_part` becomes the
    /// incremental pointer; `frac` is stashed for
    /// `current_precise_rank`/`current_precise_integral`.
    pub fn move_to_real_value(&self, int_part: usize, frac: f64) {
        self.move_to_value(int_part);
        self.state.borrow_mut().frac = frac.clamp(0.0, 1.0);
    }

    pub fn current_rank(&self) -> u64 {
        self.state.borrow().current_rank
    }

    pub fn current_integral(&self) -> u64 {
        self.state.borrow().current_sum
    }

    /// Precise (fractional) rank at the current real-valued position.
    pub fn current_precise_rank(&self) -> f64 {
        let state = self.state.borrow();
        let bar = self.bar_at(state.current_value);
        state.current_rank as f64 + state.frac * bar as f64
    }

    /// Precise (fractional) integral at the current real-valued position.
    pub fn current_precise_integral(&self) -> f64 {
        let state = self.state.borrow();
        let bar = self.bar_at(state.current_value);
        let v = state.current_value as f64;
        let d = state.frac;
        state.current_sum as f64 + d * bar as f64 * (v + 0.5 * d)
    }

    fn bar_at(&self, v: usize) -> u64 {
        let table = self.table.borrow();
        if v < table.width() {
            table.bars()[v]
        } else {
            0
        }
    }

    /// `other.currentIntegral() - self.currentIntegral()`, computed from
    /// the already-maintained partial sums (no bucket rescan) — valid
    /// only when `self` and `other` share a bucket table.
    pub fn current_integral_between_sharing(&self, other: &SummingHistogram) -> i64 {
        other.current_integral() as i64 - self.current_integral() as i64
    }

    /// Precise counterpart of [`Self::current_integral_between_sharing`].
    pub fn current_precise_integral_between_sharing(&self, other: &SummingHistogram) -> f64 {
        other.current_precise_integral() - self.current_precise_integral()
    }

    /// `other.currentRank() - self.currentRank()`.
    pub fn current_rank_between_sharing(&self, other: &SummingHistogram) -> i64 {
        other.current_rank() as i64 - self.current_rank() as i64
    }

    /// Whether the current position is at or left of the lowest
    /// populated bucket.
    pub fn left_from_or_at_bound_of_non_zero_part(&self) -> bool {
        self.current_value() <= self.table.borrow().min_populated()
    }

    /// Whether the current position is at or right of the highest
    /// populated bucket.
    pub fn right_from_or_at_bound_of_non_zero_part(&self) -> bool {
        self.current_value() >= self.table.borrow().max_populated() + 1
    }
}

/// One-shot (non-incremental) integral between two values, used by the
/// slow path that does not maintain a live incremental pointer.
pub fn integral_between_values(bars: &[u64], v1: usize, v2: usize) -> IntegralBetween {
    compute_between(bars, v1, v2, false)
}

/// Precise (piecewise-linear) counterpart of [`integral_between_values`].
pub fn precise_integral_between_values(bars: &[u64], v1: f64, v2: f64) -> IntegralBetween {
    let v1i = v1.floor().max(0.0) as usize;
    let v2i = v2.floor().max(0.0) as usize;
    let _ = (v1i, v2i);
    compute_between_precise(bars, v1, v2)
}

fn non_empty_bounds(bars: &[u64]) -> Option<(usize, usize)> {
    let lo = bars.iter().position(|&b| b > 0)?;
    let hi = bars.iter().rposition(|&b| b > 0)?;
    Some((lo, hi))
}

fn compute_between(bars: &[u64], v1: usize, v2: usize, _precise: bool) -> IntegralBetween {
    let (lo, hi) = match non_empty_bounds(bars) {
        Some(b) => b,
        None => {
            return IntegralBetween {
                integral: 0.0,
                count: 0.0,
                is_left_bound: true,
                is_right_bound: true,
            }
        }
    };
    let v2 = v2.min(bars.len());
    let mut integral = 0.0f64;
    let mut count = 0.0f64;
    for v in v1..v2 {
        let b = bars[v] as f64;
        integral += b * v as f64;
        count += b;
    }
    IntegralBetween {
        integral,
        count,
        is_left_bound: v2 <= lo,
        is_right_bound: v1 > hi,
    }
}

fn compute_between_precise(bars: &[u64], v1: f64, v2: f64) -> IntegralBetween {
    let (lo, hi) = match non_empty_bounds(bars) {
        Some(b) => b,
        None => {
            return IntegralBetween {
                integral: 0.0,
                count: 0.0,
                is_left_bound: true,
                is_right_bound: true,
            }
        }
    };
    let v1 = v1.max(0.0);
    let v2 = v2.min(bars.len() as f64);
    if v2 <= v1 {
        return IntegralBetween {
            integral: 0.0,
            count: 0.0,
            is_left_bound: v2 <= lo as f64,
            is_right_bound: v1 > hi as f64,
        };
    }
    let mut integral = 0.0f64;
    let mut count = 0.0f64;
    let start = v1.floor() as usize;
    let end = v2.ceil() as usize;
    for v in start..end.min(bars.len()) {
        let b = bars[v] as f64;
        if b == 0.0 {
            continue;
        }
        // fraction of this unit-width bar that lies within [v1, v2)
        let bar_lo = (v as f64).max(v1);
        let bar_hi = ((v + 1) as f64).min(v2);
        if bar_hi <= bar_lo {
            continue;
        }
        let frac = bar_hi - bar_lo;
        count += b * frac;
        // linear density within the bar: value ranges from v to v+1
        let mid = 0.5 * (bar_lo + bar_hi);
        integral += b * frac * mid;
    }
    IntegralBetween {
        integral,
        count,
        is_left_bound: v2 <= lo as f64,
        is_right_bound: v1 > hi as f64 + 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_then_exclude_restores_state() {
        let h = SummingHistogram::new(16, 2, true);
        h.move_to_value(8);
        let rank_before = h.current_rank();
        let sum_before = h.current_integral();
        h.include(3);
        h.include(3);
        h.exclude(3).unwrap();
        h.exclude(3).unwrap();
        assert_eq!(h.current_rank(), rank_before);
        assert_eq!(h.current_integral(), sum_before);
    }

    #[test]
    fn sharing_consistency() {
        let h1 = SummingHistogram::new(16, 2, true);
        let h2 = h1.share();
        for v in [1usize, 2, 2, 5, 9, 9, 9] {
            h1.include(v);
        }
        h1.move_to_value(4);
        h2.move_to_value(10);
        let diff = h1.current_integral_between_sharing(&h2);
        let expected = integral_between_values(&h1.bars(), 4, 10).integral as i64;
        assert_eq!(diff, expected);
    }

    #[test]
    fn percentile_rank_duality_for_distinct_values() {
        // With no duplicate values, every integer rank lands on a unique
        // bucket boundary, so the duality holds exactly (no ties).
        let h = SummingHistogram::new(32, 3, true);
        let values = [7usize, 2, 11, 0, 9, 4, 1, 3, 8, 5, 10, 6];
        for v in values {
            h.include(v);
        }
        let n = h.total();
        for r in 0..n {
            let value = h.percentile_value(r);
            let rank_at_value = {
                let bars = h.bars();
                bars[..value].iter().sum::<u64>()
            };
            assert_eq!(rank_at_value, r, "r={r} value={value}");
        }
    }

    #[test]
    fn dilation_erosion_are_percentiles_at_bounds() {
        let h = SummingHistogram::new(32, 3, true);
        let values = [0usize, 3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        for v in values {
            h.include(v);
        }
        let n = h.total();
        assert_eq!(h.percentile_value(n), *values.iter().max().unwrap());
        assert_eq!(h.percentile_value(0), *values.iter().min().unwrap());
    }
}

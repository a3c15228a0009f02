// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Operator semantics over the live aperture histogram.

use super::processor::RankOperationProcessor;
use crate::histogram::{precise_integral_between_values, SummingHistogram};

/// Resolves the "filler" policy for mean-between-{values,percentiles}
/// when the requested interval contains no aperture mass.
///
/// Modeled as a real discriminant rather than overloading `f64::NAN` as
/// a sentinel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filler {
    Numeric(f64),
    MinValue,
    MaxValue,
    Nearest,
}

/// Evaluates `percentile(p, r)` on the processor's live histogram: the
/// rank query at real index `r`.
pub fn percentile(proc: &mut RankOperationProcessor<'_>, p: i64, r: f64) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    evaluate_percentile(proc, r)
}

fn evaluate_percentile(proc: &RankOperationProcessor<'_>, r: f64) -> f64 {
    let n = proc.aperture_size() as u64;
    if proc.simple() {
        let r_int = r.round().clamp(0.0, n as f64) as u64;
        proc.histogram().percentile_value(r_int) as f64
    } else {
        let r_clamped = r.clamp(0.0, n as f64);
        let floor_r = r_clamped.floor() as u64;
        let v = proc.histogram().percentile_value(floor_r);
        let bar = proc.histogram().bars()[v.min(proc.bucket_width() - 1)];
        if bar == 0 || floor_r as f64 == r_clamped {
            v as f64
        } else {
            let rank_at_v = {
                let bars = proc.histogram().bars();
                bars[..v].iter().sum::<u64>()
            };
            let d = (r_clamped - rank_at_v as f64) / bar as f64;
            v as f64 + d.clamp(0.0, 1.0)
        }
    }
}

/// Evaluates `rank(p, v)`: the count of aperture elements strictly less
/// than `v` (plus a fractional within-bar correction in precise mode).
pub fn rank(proc: &mut RankOperationProcessor<'_>, p: i64, v: f64) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    let width = proc.bucket_width();
    let v_clamped = v.clamp(0.0, width as f64);
    let v_floor = v_clamped.floor() as usize;
    let bars = proc.histogram().bars();
    let rank_at_floor: u64 = bars[..v_floor.min(bars.len())].iter().sum();
    if proc.simple() {
        rank_at_floor as f64
    } else {
        let d = v_clamped - v_floor as f64;
        let bar = if v_floor < bars.len() { bars[v_floor] } else { 0 };
        rank_at_floor as f64 + d * bar as f64
    }
}

/// `meanBetweenPercentiles(p, r1, r2)`: translates to values and divides
/// the integral by the rank span; returns the `filler` when `r2 <= r1`.
pub fn mean_between_percentiles(
    proc: &mut RankOperationProcessor<'_>,
    p: i64,
    r1: f64,
    r2: f64,
    filler: Filler,
) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    if r2 <= r1 {
        return resolve_filler(filler, proc, p, None, None);
    }
    let v1 = evaluate_percentile(proc, r1);
    let v2 = evaluate_percentile(proc, r2);
    mean_between_values_inner(proc, p, v1, v2, filler)
}

/// `meanBetweenValues(p, v1, v2)`: `integral(v1,v2) / count(v1,v2)`,
/// falling back to the `filler` policy when the interval is empty.
pub fn mean_between_values(
    proc: &mut RankOperationProcessor<'_>,
    p: i64,
    v1: f64,
    v2: f64,
    filler: Filler,
) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    mean_between_values_inner(proc, p, v1, v2, filler)
}

fn mean_between_values_inner(
    proc: &RankOperationProcessor<'_>,
    p: i64,
    v1: f64,
    v2: f64,
    filler: Filler,
) -> f64 {
    if v2 <= v1 {
        return resolve_filler(filler, proc, p, Some(v1), Some(v2));
    }
    let bars = proc.histogram().bars();
    let between = if proc.simple() {
        let i1 = v1.floor().max(0.0) as usize;
        let i2 = v2.ceil().min(bars.len() as f64) as usize;
        crate::histogram::integral_between_values(&bars, i1, i2)
    } else {
        precise_integral_between_values(&bars, v1, v2)
    };
    if between.count == 0.0 {
        resolve_filler(filler, proc, p, Some(v1), Some(v2))
    } else {
        between.integral / between.count
    }
}

fn resolve_filler(
    filler: Filler,
    proc: &RankOperationProcessor<'_>,
    _p: i64,
    v1: Option<f64>,
    v2: Option<f64>,
) -> f64 {
    match filler {
        Filler::Numeric(v) => v,
        Filler::MinValue => v1.unwrap_or(0.0),
        Filler::MaxValue => v2.unwrap_or(proc.bucket_width() as f64),
        Filler::Nearest => {
            let bars = proc.histogram().bars();
            let left_bound = proc.histogram().left_from_or_at_bound_of_non_zero_part();
            let right_bound = proc.histogram().right_from_or_at_bound_of_non_zero_part();
            let _ = bars;
            match (left_bound, right_bound) {
                (true, false) => v2.unwrap_or(proc.bucket_width() as f64),
                (false, true) => v1.unwrap_or(0.0),
                _ => {
                    let (a, b) = (v1.unwrap_or(0.0), v2.unwrap_or(proc.bucket_width() as f64));
                    0.5 * (a + b)
                }
            }
        }
    }
}

/// `functionOfSum(p, f)`: `f(sum(aperture))`, evaluated with the running
/// sum of inserted buckets (the table's total integral, not the
/// current-value partial sum).
pub fn function_of_sum(
    proc: &mut RankOperationProcessor<'_>,
    p: i64,
    f: impl Fn(f64) -> f64,
) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    let bars = proc.histogram().bars();
    let sum: u64 = bars.iter().enumerate().map(|(v, &c)| v as u64 * c).sum();
    f(sum as f64)
}

/// `functionOfPercentilePair(p, r1, r2, f)`: `f(src(p), percentile(p,
/// r1), percentile(p, r2))`.
pub fn function_of_percentile_pair(
    proc: &mut RankOperationProcessor<'_>,
    p: i64,
    src_p: f64,
    r1: f64,
    r2: f64,
    f: impl Fn(f64, f64, f64) -> f64,
) -> f64 {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    let v1 = evaluate_percentile(proc, r1);
    let v2 = evaluate_percentile(proc, r2);
    f(src_p, v1, v2)
}

/// Shares a second histogram position off `proc`'s live one, positions
/// both at `r1`/`r2`, and returns `currentIntegralBetweenSharing` — the
/// grounding for property #4 (sharing consistency).
pub fn integral_between_sharing(
    proc: &mut RankOperationProcessor<'_>,
    p: i64,
    v1: usize,
    v2: usize,
) -> (SummingHistogram, SummingHistogram, i64) {
    proc.seek(p).expect("seek should not fail for in-bounds p");
    let h1 = proc.share_histogram();
    let h2 = proc.share_histogram();
    h1.move_to_value(v1);
    h2.move_to_value(v2);
    let diff = h1.current_integral_between_sharing(&h2);
    (h1, h2, diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayView;
    use crate::element::ElementKind;
    use crate::pattern::Pattern;
    use crate::rank::processor::LinearPattern;

    fn build<'a>(data: &'a [f64]) -> ArrayView<'a> {
        ArrayView::new(vec![data.len()], data).unwrap()
    }

    #[test]
    fn s1_dilation_matches_expected() {
        let data = [0.0, 3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        let view = build(&data);
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let linear = LinearPattern::from_pattern(&pattern, view.strides());
        let mut proc = RankOperationProcessor::new(&view, ElementKind::U8, 4, 1, true, linear);
        let expected = [5.0, 3.0, 4.0, 4.0, 5.0, 9.0, 9.0, 9.0, 6.0, 6.0, 5.0, 5.0];
        for (p, &exp) in expected.iter().enumerate() {
            let n = proc.aperture_size() as f64;
            let got = percentile(&mut proc, p as i64, n);
            assert_eq!(got, exp, "p={p}");
        }
    }

    #[test]
    fn s2_median_matches_expected() {
        let data = [0.0, 3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        let view = build(&data);
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let linear = LinearPattern::from_pattern(&pattern, view.strides());
        let mut proc = RankOperationProcessor::new(&view, ElementKind::U8, 4, 1, true, linear);
        let expected = [3.0, 1.0, 3.0, 1.0, 4.0, 5.0, 5.0, 6.0, 5.0, 5.0, 5.0, 3.0];
        for (p, &exp) in expected.iter().enumerate() {
            let got = percentile(&mut proc, p as i64, 1.0);
            assert_eq!(got, exp, "p={p}");
        }
    }

    #[test]
    fn s6_mean_between_values_fill_min() {
        let data = [100.0, 100.0, 100.0];
        let view = build(&data);
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let linear = LinearPattern::from_pattern(&pattern, view.strides());
        let mut proc = RankOperationProcessor::new(&view, ElementKind::U8, 8, 2, true, linear);
        for p in 0..3i64 {
            let got = mean_between_values(&mut proc, p, 0.0, 50.0, Filler::MinValue);
            assert_eq!(got, 0.0, "p={p}");
        }
    }
}

// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The `Pattern` abstraction: a finite set of integer offsets
//! in n-space, consumed by the rank/morphology engines. The concrete
//! Minkowski decomposition (sum/multiple) algorithms that produce a
//! pattern's offsets are an external collaborator; this module only
//! consumes the offset list and derives what the slide needs from it.

use std::collections::BTreeSet;

/// An integer offset in n-space.
pub type Offset = Vec<i64>;

/// A finite set of integer offsets (`shifts`), plus the derived
/// `left[]`/`right[]` arrays used to slide an aperture along coordinate
/// 0 by one step at a time.
#[derive(Clone, Debug)]
pub struct Pattern {
    dim_count: usize,
    shifts: Vec<Offset>,
    left: Vec<Offset>,
    right: Vec<Offset>,
}

impl Pattern {
    /// Builds a pattern from an explicit offset set. `offsets` must be
    /// non-empty and every offset must have the same length (`dim_count`).
    pub fn new(offsets: Vec<Offset>) -> Self {
        assert!(!offsets.is_empty(), "pattern must have at least one offset");
        let dim_count = offsets[0].len();
        assert!(
            offsets.iter().all(|o| o.len() == dim_count),
            "all offsets must share the same dimensionality"
        );

        let set: BTreeSet<Offset> = offsets.iter().cloned().collect();

        // left[] = S \ (S + e0): offsets that newly enter the aperture
        // when the position advances by +1 along coordinate 0.
        // right[] = S \ (S - e0): offsets that leave the aperture on the
        // same step. (S + e0) / (S - e0) shift every offset by +1 / -1
        // along coordinate 0.
        let shifted_plus: BTreeSet<Offset> = set
            .iter()
            .map(|o| {
                let mut shifted = o.clone();
                shifted[0] += 1;
                shifted
            })
            .collect();
        let shifted_minus: BTreeSet<Offset> = set
            .iter()
            .map(|o| {
                let mut shifted = o.clone();
                shifted[0] -= 1;
                shifted
            })
            .collect();

        let left: Vec<Offset> = set.difference(&shifted_plus).cloned().collect();
        let right: Vec<Offset> = set.difference(&shifted_minus).cloned().collect();

        Self {
            dim_count,
            shifts: set.into_iter().collect(),
            left,
            right,
        }
    }

    /// Convenience constructor for a rectangular (axis-aligned box)
    /// pattern covering `[-r0, r0] x [-r1, r1] x ...`, i.e. a square /
    /// cube structuring element of the given per-axis half-widths.
    pub fn rectangle(half_widths: &[i64]) -> Self {
        fn recurse(half_widths: &[i64], prefix: &mut Offset, out: &mut Vec<Offset>) {
            if prefix.len() == half_widths.len() {
                out.push(prefix.clone());
                return;
            }
            let axis = prefix.len();
            for d in -half_widths[axis]..=half_widths[axis] {
                prefix.push(d);
                recurse(half_widths, prefix, out);
                prefix.pop();
            }
        }
        let mut offsets = Vec::new();
        recurse(half_widths, &mut Vec::new(), &mut offsets);
        Self::new(offsets)
    }

    pub fn dim_count(&self) -> usize {
        self.dim_count
    }

    pub fn point_count(&self) -> usize {
        self.shifts.len()
    }

    /// The full offset set.
    pub fn shifts(&self) -> &[Offset] {
        &self.shifts
    }

    /// Offsets that newly enter the aperture when the position advances
    /// by +1 along coordinate 0.
    pub fn left(&self) -> &[Offset] {
        &self.left
    }

    /// Offsets that leave the aperture when the position advances by +1
    /// along coordinate 0.
    pub fn right(&self) -> &[Offset] {
        &self.right
    }

    /// "Rounded" offsets: this crate's `Pattern` is always integer, so
    /// this is identical to `shifts()`. Kept for interface parity with
    /// fractional/rounded pattern abstractions.
    pub fn rounded_points(&self) -> &[Offset] {
        &self.shifts
    }

    /// The minimum bounding box coordinate range `[min, max]` (inclusive)
    /// along `coord`.
    pub fn rounded_coord_range(&self, coord: usize) -> (i64, i64) {
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for o in &self.shifts {
            lo = lo.min(o[coord]);
            hi = hi.max(o[coord]);
        }
        (lo, hi)
    }

    /// Minkowski sum of `self` with `other`: the set `{a + b}`.
    pub fn minkowski_sum(&self, other: &Pattern) -> Pattern {
        assert_eq!(self.dim_count, other.dim_count);
        let mut set = BTreeSet::new();
        for a in &self.shifts {
            for b in &other.shifts {
                let sum: Offset = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();
                set.insert(sum);
            }
        }
        Pattern::new(set.into_iter().collect())
    }

    /// The `k`-fold Minkowski multiple `k ⊗ P`: `P` summed with itself
    /// `k` times (`k >= 1`).
    pub fn minkowski_multiple(&self, k: usize) -> Pattern {
        assert!(k >= 1, "Minkowski multiple requires k >= 1");
        let mut acc = self.clone();
        for _ in 1..k {
            acc = acc.minkowski_sum(self);
        }
        acc
    }

    /// The pattern's negation `{-s : s in S}`, used to derive the
    /// erosion aperture extent from the dilation one.
    pub fn negate(&self) -> Pattern {
        let offsets = self
            .shifts
            .iter()
            .map(|o| o.iter().map(|c| -c).collect())
            .collect();
        Pattern::new(offsets)
    }

    /// A minimal decomposition set for this pattern ("carcass"): a small
    /// set of generator offsets from which the full pattern can be
    /// rebuilt by repeated Minkowski sums, used by fast erosion/dilation
    /// paths that operate on generators instead of the full point set.
    /// This default implementation is adequate for the rectangular/disk
    /// reference patterns used in tests: a rectangle decomposes into unit
    /// steps along each axis.
    pub fn carcass(&self) -> Vec<Offset> {
        if self.shifts.len() <= 1 {
            return self.shifts.clone();
        }
        let mut generators = Vec::new();
        for axis in 0..self.dim_count {
            let (lo, hi) = self.rounded_coord_range(axis);
            if hi > lo {
                let mut unit = vec![0i64; self.dim_count];
                unit[axis] = 1;
                generators.push(unit);
            }
        }
        if generators.is_empty() {
            self.shifts.clone()
        } else {
            generators
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_dim_three_tap_left_right() {
        let p = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        assert_eq!(p.point_count(), 3);
        // advancing by +1: offset 1 leaves (right), offset -1 enters (left)
        assert_eq!(p.right(), &[vec![1]]);
        assert_eq!(p.left(), &[vec![-1]]);
    }

    #[test]
    fn rectangle_3x3() {
        let p = Pattern::rectangle(&[1, 1]);
        assert_eq!(p.point_count(), 9);
        assert_eq!(p.rounded_coord_range(0), (-1, 1));
    }

    #[test]
    fn minkowski_multiple_of_unit_matches_rectangle() {
        let unit = Pattern::new(vec![vec![-1, -1], vec![-1, 0], vec![-1, 1], vec![0, -1], vec![0, 0], vec![0, 1], vec![1, -1], vec![1, 0], vec![1, 1]]);
        let doubled = unit.minkowski_multiple(2);
        assert_eq!(doubled.rounded_coord_range(0), (-2, 2));
        assert_eq!(doubled.point_count(), 25);
    }

    #[test]
    fn negate_flips_offsets() {
        let p = Pattern::new(vec![vec![-1, 2], vec![3, -4]]);
        let n = p.negate();
        let mut got: Vec<Offset> = n.shifts().to_vec();
        got.sort();
        assert_eq!(got, vec![vec![-3, 4], vec![1, -2]]);
    }
}

// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Error;
use std::cell::RefCell;
use std::rc::Rc;

/// Mutable per-holder state kept alongside a shared [`BucketTable`].
///
/// Two `SummingHistogram`s may share one table while each keeping an
/// independent "current position" into it (see `share()`). `current_value`
/// is the integer pointer used for the O(1)-amortized incremental walk;
/// `frac` is the fractional offset within that bucket, used only by the
/// precise/interpolated queries.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct HolderState {
    pub current_value: usize,
    pub frac: f64,
    pub current_rank: u64,
    pub current_sum: u64,
}

/// The shared bucket table backing one or more histogram positions.
///
/// Buckets are stored at full (fine) resolution plus one coarser
/// aggregation level, so that `moveToValue`/`moveToRank` can skip empty
/// coarse blocks in bulk instead of visiting every fine bucket. Every
/// include/exclude updates all registered holders' partial-sum state,
/// which is what lets two histograms sharing a table report
/// `currentIntegralBetweenSharing` without re-scanning the buckets.
pub struct BucketTable {
    width: usize,
    fine: Vec<u64>,
    coarse_bits: u32,
    coarse: Vec<u64>,
    coarse_group: usize,
    total: u64,
    holders: Vec<Rc<RefCell<HolderState>>>,
}

impl BucketTable {
    /// `width` must be a power of two. `coarse_bits` selects the width of
    /// the single intermediate aggregation level (`2^coarse_bits`); a
    /// default of roughly `log2(width)/2` is a reasonable choice.
    pub fn new(width: usize, coarse_bits: u32) -> Self {
        assert!(width.is_power_of_two(), "bucket width must be a power of two");
        let fine_bits = width.trailing_zeros();
        let coarse_bits = coarse_bits.min(fine_bits);
        let coarse_width = 1usize << coarse_bits;
        let coarse_group = width / coarse_width;
        Self {
            width,
            fine: vec![0; width],
            coarse_bits,
            coarse: vec![0; coarse_width],
            coarse_group,
            total: 0,
            holders: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn bars(&self) -> &[u64] {
        &self.fine
    }

    fn block_of(&self, v: usize) -> usize {
        v / self.coarse_group
    }

    pub(crate) fn register(&mut self, holder: Rc<RefCell<HolderState>>) {
        self.holders.push(holder);
    }

    pub fn share_count(&self) -> usize {
        self.holders.len()
    }

    /// Increments `bars[v]` by one and updates every registered holder's
    /// rank/sum in O(holders) time (no bucket rescans).
    pub fn include(&mut self, v: usize) {
        debug_assert!(v < self.width);
        self.fine[v] += 1;
        self.coarse[self.block_of(v)] += 1;
        self.total += 1;
        for holder in &self.holders {
            let mut h = holder.borrow_mut();
            if v < h.current_value {
                h.current_rank += 1;
                h.current_sum += v as u64;
            }
        }
    }

    /// Decrements `bars[v]` by one. Fails with
    /// [`Error::InternalInvariantViolated`] if the bucket would go negative.
    pub fn exclude(&mut self, v: usize) -> Result<(), Error> {
        debug_assert!(v < self.width);
        if self.fine[v] == 0 {
            return Err(Error::invariant(
                v,
                "exclude() on a bucket with zero count",
            ));
        }
        self.fine[v] -= 1;
        self.coarse[self.block_of(v)] -= 1;
        self.total -= 1;
        for holder in &self.holders {
            let mut h = holder.borrow_mut();
            if v < h.current_value {
                h.current_rank -= 1;
                h.current_sum -= v as u64;
            }
        }
        Ok(())
    }

    /// Moves `holder`'s integer pointer to `new_value`, updating its
    /// rank/sum incrementally. Coarse, fully-empty blocks are skipped in
    /// one step rather than bucket-by-bucket.
    pub(crate) fn move_to_value(&self, holder: &mut HolderState, new_value: usize) {
        let new_value = new_value.min(self.width);
        if new_value > holder.current_value {
            let mut v = holder.current_value;
            while v < new_value {
                if v % self.coarse_group == 0 && v + self.coarse_group <= new_value {
                    let block = self.block_of(v);
                    if self.coarse[block] == 0 {
                        v += self.coarse_group;
                        continue;
                    }
                }
                holder.current_rank += self.fine[v];
                holder.current_sum += self.fine[v] * v as u64;
                v += 1;
            }
        } else if new_value < holder.current_value {
            let mut v = holder.current_value;
            while v > new_value {
                if v % self.coarse_group == 0 && v >= self.coarse_group && v - self.coarse_group >= new_value
                {
                    let block = self.block_of(v - 1);
                    if self.coarse[block] == 0 {
                        v -= self.coarse_group;
                        continue;
                    }
                }
                v -= 1;
                holder.current_rank -= self.fine[v];
                holder.current_sum -= self.fine[v] * v as u64;
            }
        }
        holder.current_value = new_value;
        holder.frac = 0.0;
    }

    /// Finds the smallest integer `v` such that `sum(bars[0..v]) > rank`
    /// ("ties go left"), skipping empty coarse blocks. No such `v` exists
    /// when `rank >= total`; per the resolved open question on
    /// `percentile(p, N)`, that case resolves to one past the highest
    /// populated bucket, so that `percentile == v - 1` lands on the
    /// maximum aperture value.
    pub(crate) fn value_for_rank(&self, rank: u64) -> usize {
        if self.total == 0 {
            return 0;
        }
        if rank >= self.total {
            return self.max_populated() + 1;
        }
        let mut cum = 0u64;
        let mut block = 0usize;
        while block < self.coarse.len() {
            let block_sum = self.coarse[block];
            if cum + block_sum <= rank {
                cum += block_sum;
                block += 1;
                continue;
            }
            break;
        }
        let start = block * self.coarse_group;
        let end = (start + self.coarse_group).min(self.width);
        for v in start..end {
            cum += self.fine[v];
            if cum > rank {
                return v + 1;
            }
        }
        self.width
    }

    /// Highest bucket index with a nonzero count, or 0 if empty.
    pub fn max_populated(&self) -> usize {
        for v in (0..self.width).rev() {
            if self.fine[v] > 0 {
                return v;
            }
        }
        0
    }

    /// Lowest bucket index with a nonzero count, or 0 if empty.
    pub fn min_populated(&self) -> usize {
        for v in 0..self.width {
            if self.fine[v] > 0 {
                return v;
            }
        }
        0
    }
}

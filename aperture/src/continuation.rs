// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Virtualizes an infinite extension of the source outside its bounds.
//! Unlike the core engine's pseudo-cyclic raster wrap (applied only at
//! the flattened linear index), a [`ContinuationMode`] is resolved per
//! axis against the array's actual dimensions, then materialized as a
//! padded array the parent morphology/rank engine can run on unmodified.

use crate::array::ArrayView;
use crate::Error;

/// How to read the source outside `[0, dim)` along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContinuationMode {
    Cyclic,
    PseudoCyclic,
    MirrorCyclic,
    ZeroConstant,
    Constant(u64),
    Nearest,
}

/// One coordinate resolved against a mode: either a valid in-bounds
/// index, or a constant fill value (for the constant modes).
enum Resolved {
    Index(usize),
    Constant(f64),
}

impl ContinuationMode {
    fn resolve_axis(self, coord: i64, dim: usize) -> Resolved {
        if dim == 0 {
            return Resolved::Constant(0.0);
        }
        if coord >= 0 && (coord as usize) < dim {
            return Resolved::Index(coord as usize);
        }
        match self {
            ContinuationMode::Cyclic | ContinuationMode::PseudoCyclic => {
                let d = dim as i64;
                let wrapped = ((coord % d) + d) % d;
                Resolved::Index(wrapped as usize)
            }
            ContinuationMode::MirrorCyclic => {
                if dim == 1 {
                    return Resolved::Index(0);
                }
                let period = 2 * (dim as i64 - 1);
                let m = ((coord % period) + period) % period;
                let idx = if m < dim as i64 { m } else { period - m };
                Resolved::Index(idx as usize)
            }
            ContinuationMode::ZeroConstant => Resolved::Constant(0.0),
            ContinuationMode::Constant(c) => Resolved::Constant(c as f64),
            ContinuationMode::Nearest => Resolved::Index(coord.clamp(0, dim as i64 - 1) as usize),
        }
    }
}

/// Expands `source` by `pad[axis] = (before, after)` elements on each
/// side, resolving every out-of-bounds read per `mode`, and returns the
/// padded dimensions alongside the materialized buffer.
pub fn materialize(
    source: &ArrayView<'_>,
    mode: ContinuationMode,
    pad: &[(usize, usize)],
) -> Result<(Vec<usize>, Vec<f64>), Error> {
    let dims = source.dims();
    if pad.len() != dims.len() {
        return Err(Error::size_mismatch(format!(
            "continuation padding has {} axes, source has {}",
            pad.len(),
            dims.len()
        )));
    }
    let padded_dims: Vec<usize> = dims
        .iter()
        .zip(pad.iter())
        .map(|(&d, &(before, after))| d + before + after)
        .collect();
    let padded_len: usize = padded_dims.iter().product();
    if padded_len > (i32::MAX as usize) {
        return Err(Error::out_of_index_range(
            "continuation padding would exceed the supported index range",
        ));
    }
    log::trace!("materializing {mode:?} continuation: {dims:?} -> {padded_dims:?}");

    let mut out = vec![0.0f64; padded_len];
    let mut padded_coord = vec![0i64; dims.len()];
    for (linear, slot) in out.iter_mut().enumerate() {
        let mut rem = linear;
        for axis in 0..dims.len() {
            padded_coord[axis] = (rem % padded_dims[axis]) as i64;
            rem /= padded_dims[axis];
        }
        let mut constant = None;
        let mut src_coord = vec![0i64; dims.len()];
        for axis in 0..dims.len() {
            let unpadded = padded_coord[axis] - pad[axis].0 as i64;
            match mode.resolve_axis(unpadded, dims[axis]) {
                Resolved::Index(i) => src_coord[axis] = i as i64,
                Resolved::Constant(c) => {
                    constant = Some(c);
                    break;
                }
            }
        }
        *slot = match constant {
            Some(c) => c,
            None => source.get_linear(source.coord_to_linear(&src_coord) as usize),
        };
    }
    Ok((padded_dims, out))
}

/// Crops a padded buffer of `padded_dims` back down to `orig_dims`,
/// inverting the padding applied by [`materialize`].
pub fn crop(padded_dims: &[usize], padded_data: &[f64], pad: &[(usize, usize)], orig_dims: &[usize]) -> Vec<f64> {
    let orig_len: usize = orig_dims.iter().product();
    let mut out = vec![0.0f64; orig_len];
    let mut coord = vec![0i64; orig_dims.len()];
    for (linear, slot) in out.iter_mut().enumerate() {
        let mut rem = linear;
        for axis in 0..orig_dims.len() {
            coord[axis] = (rem % orig_dims[axis]) as i64;
            rem /= orig_dims[axis];
        }
        let mut padded_linear = 0usize;
        let mut stride = 1usize;
        for axis in 0..orig_dims.len() {
            let p = coord[axis] as usize + pad[axis].0;
            padded_linear += p * stride;
            stride *= padded_dims[axis];
        }
        *slot = padded_data[padded_linear];
    }
    out
}

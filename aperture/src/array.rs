// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A minimal typed element view.
//!
//! `ArrayView`/`ArrayViewMut` borrow a caller-owned contiguous buffer and
//! expose it as an n-dimensional array addressed by a row-major
//! (`stride[0] == 1`), pseudo-cyclic linear index.

use crate::Error;

/// Row-major strides for the given dimensions, with `stride[0] == 1`.
fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for axis in 1..dims.len() {
        strides[axis] = strides[axis - 1] * dims[axis - 1];
    }
    strides
}

/// A read-only typed view over a borrowed, contiguous `f64` buffer.
///
/// Values are always communicated as `f64`; the caller chose the
/// `ElementKind` this buffer was produced from, and the bucket mapping
/// in `element.rs` is applied at the point a value is binned.
pub struct ArrayView<'a> {
    dims: Vec<usize>,
    strides: Vec<usize>,
    data: &'a [f64],
}

impl<'a> ArrayView<'a> {
    pub fn new(dims: Vec<usize>, data: &'a [f64]) -> Result<Self, Error> {
        let len: usize = dims.iter().product();
        if len != data.len() {
            return Err(Error::size_mismatch(format!(
                "array view of dims {dims:?} (len {len}) does not match buffer length {}",
                data.len()
            )));
        }
        let strides = strides(&dims);
        Ok(Self { dims, strides, data })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// The pseudo-cyclic raster length `L` (product of dimensions).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads the pseudo-cyclically wrapped linear index
    /// `(i % L + L) % L`.
    pub fn get_pseudo_cyclic(&self, i: i64) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let l = self.data.len() as i64;
        let wrapped = ((i % l) + l) % l;
        self.data[wrapped as usize]
    }

    pub fn get_linear(&self, i: usize) -> f64 {
        self.data[i]
    }

    pub fn coord_to_linear(&self, coord: &[i64]) -> i64 {
        coord
            .iter()
            .zip(self.strides.iter())
            .map(|(c, s)| c * *s as i64)
            .sum()
    }

    pub fn linear_to_coord(&self, mut i: usize) -> Vec<i64> {
        let mut coord = vec![0i64; self.dims.len()];
        for axis in 0..self.dims.len() {
            coord[axis] = (i % self.dims[axis]) as i64;
            i /= self.dims[axis];
        }
        coord
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }
}

/// A mutable typed view, used as a materializing destination.
pub struct ArrayViewMut<'a> {
    dims: Vec<usize>,
    strides: Vec<usize>,
    data: &'a mut [f64],
}

impl<'a> ArrayViewMut<'a> {
    pub fn new(dims: Vec<usize>, data: &'a mut [f64]) -> Result<Self, Error> {
        let len: usize = dims.iter().product();
        if len != data.len() {
            return Err(Error::size_mismatch(format!(
                "array view of dims {dims:?} (len {len}) does not match buffer length {}",
                data.len()
            )));
        }
        let strides = strides(&dims);
        Ok(Self { dims, strides, data })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn set_linear(&mut self, i: usize, v: f64) {
        self.data[i] = v;
    }

    pub fn as_view(&self) -> ArrayView<'_> {
        ArrayView {
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            data: self.data,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_is_rejected() {
        let buf = [0.0; 4];
        assert!(ArrayView::new(vec![3, 3], &buf).is_err());
    }

    #[test]
    fn pseudo_cyclic_wrap() {
        let buf = [1.0, 2.0, 3.0];
        let v = ArrayView::new(vec![3], &buf).unwrap();
        assert_eq!(v.get_pseudo_cyclic(-1), 3.0);
        assert_eq!(v.get_pseudo_cyclic(3), 1.0);
        assert_eq!(v.get_pseudo_cyclic(1), 2.0);
    }

    #[test]
    fn coord_round_trip() {
        let buf = vec![0.0; 12];
        let v = ArrayView::new(vec![3, 4], &buf).unwrap();
        for i in 0..12 {
            let coord = v.linear_to_coord(i);
            assert_eq!(v.coord_to_linear(&coord), i as i64);
        }
    }
}

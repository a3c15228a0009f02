// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Separable 2D rectangle mean filter, grounded on the
//! cyclic-buffer sliding-sum idiom in `streamstats`'s `Streamstats<T>`.
//! Rectangular apertures admit an O(1)-amortized row/column running sum
//! instead of routing through the general rank engine.

use crate::Error;

/// How a non-integer average is rounded to the destination kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rounding {
    HalfAwayFromZero,
    TruncateTowardZero,
}

/// How the row/column sums are turned into an average.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Division {
    Exact,
    ReciprocalMultiply,
}

fn round(value: f64, rounding: Rounding) -> f64 {
    match rounding {
        Rounding::HalfAwayFromZero => {
            if value >= 0.0 {
                (value + 0.5).floor()
            } else {
                (value - 0.5).ceil()
            }
        }
        Rounding::TruncateTowardZero => value.trunc(),
    }
}

fn divide(sum: f64, count: usize, division: Division) -> f64 {
    match division {
        Division::Exact => sum / count as f64,
        Division::ReciprocalMultiply => sum * (1.0 / count as f64),
    }
}

/// A row-major `sy x sx` rectangle mean filter over a 2D array of
/// `width x height`, wrapping along `y` (pseudo-cyclic) and clamping at
/// the row boundary along `x`.
pub struct QuickAverager {
    half_x: i64,
    half_y: i64,
    rounding: Rounding,
    division: Division,
}

impl QuickAverager {
    /// `(sx, sy)` are the full rectangle side lengths (must be odd, so
    /// the rectangle is centered on the current pixel); their product
    /// must fit in `i32::MAX`.9.
    pub fn new(sx: usize, sy: usize, rounding: Rounding, division: Division) -> Result<Self, Error> {
        if sx == 0 || sy == 0 || sx % 2 == 0 || sy % 2 == 0 {
            return Err(Error::invalid_argument(
                "quick averager rectangle sides must be odd and non-zero",
            ));
        }
        let area = sx.checked_mul(sy).ok_or_else(|| {
            Error::invalid_argument("quick averager rectangle area overflows")
        })?;
        if area > i32::MAX as usize {
            return Err(Error::invalid_argument(
                "quick averager rectangle area exceeds 2^31 - 1",
            ));
        }
        Ok(Self {
            half_x: (sx as i64 - 1) / 2,
            half_y: (sy as i64 - 1) / 2,
            rounding,
            division,
        })
    }

    fn area(&self) -> usize {
        (2 * self.half_x as usize + 1) * (2 * self.half_y as usize + 1)
    }

    /// Runs the row pass (sliding sum of `sx` adjacent elements, clamped
    /// at the row edges) then the column pass (pseudo-cyclic sliding sum
    /// of `sy` adjacent rows), producing the filtered `width x height`
    /// image.
    pub fn filter(&self, width: usize, height: usize, src: &[f64]) -> Result<Vec<f64>, Error> {
        if src.len() != width * height {
            return Err(Error::size_mismatch(format!(
                "quick averager expected {} samples, got {}",
                width * height,
                src.len()
            )));
        }
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        // row pass: row_sums[y][x] = sum of src[y][x-half_x ..= x+half_x], edge-clamped
        let mut row_sums = vec![0.0f64; width * height];
        for y in 0..height {
            let row = &src[y * width..(y + 1) * width];
            for x in 0..width {
                let mut sum = 0.0;
                for dx in -self.half_x..=self.half_x {
                    let xi = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
                    sum += row[xi];
                }
                row_sums[y * width + x] = sum;
            }
        }

        // column pass: sliding accumulator over sy rows, wrapping along y
        let sy = 2 * self.half_y as usize + 1;
        let area = self.area();
        let mut out = vec![0.0f64; width * height];
        for x in 0..width {
            let mut accumulator = 0.0f64;
            for dy in -self.half_y..=self.half_y {
                let yi = (((dy % height as i64) + height as i64) % height as i64) as usize;
                accumulator += row_sums[yi * width + x];
            }
            for y in 0..height {
                let raw = divide(accumulator, area, self.division);
                out[y * width + x] = round(raw, self.rounding);

                let leaving_y = (((y as i64 - self.half_y) % height as i64) + height as i64) % height as i64;
                let entering_y = (((y as i64 + self.half_y + 1) % height as i64) + height as i64) % height as i64;
                accumulator -= row_sums[leaving_y as usize * width + x];
                accumulator += row_sums[entering_y as usize * width + x];
                let _ = sy;
            }
        }
        Ok(out)
    }
}

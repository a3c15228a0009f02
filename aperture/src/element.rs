// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Error;

/// The element kind of a source array.
///
/// Dispatch happens once, at operator entry, on this discriminant; the
/// hot loop inside a chosen kind stays monomorphic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bit,
    U8,
    U16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementKind {
    /// Natural bucket width in bits for this kind when no explicit
    /// `numberOfAnalyzedBits` is requested.
    pub fn natural_bits(self) -> u32 {
        match self {
            ElementKind::Bit => 1,
            ElementKind::U8 => 8,
            ElementKind::U16 => 16,
            ElementKind::I32 | ElementKind::I64 | ElementKind::F32 | ElementKind::F64 => 16,
        }
    }

    /// Whether this kind stores values in `[0, 1)` and therefore needs
    /// the floating bucket mapping `floor(v * (M-1))`.
    pub fn is_floating(self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }

    fn name(self) -> &'static str {
        match self {
            ElementKind::Bit => "bit",
            ElementKind::U8 => "u8",
            ElementKind::U16 => "u16",
            ElementKind::I32 => "i32",
            ElementKind::I64 => "i64",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a raw source sample to an integer bucket index in `[0, bucket_count)`.
///
/// - Bit/u8/u16 values are used directly (u16/i32/i64 read as unsigned,
///   clamped to 0 when negative).
/// - i32/i64 values are treated as non-negative; negative values are
///   clamped to 0 before binning.
/// - f32/f64 values are expected in `[0, 1)`; they map to
///   `floor(v * (bucket_count - 1))`, clamped to `[0, bucket_count - 1]`.
pub fn bucket_index(kind: ElementKind, raw: f64, bucket_count: usize) -> Result<usize, Error> {
    if raw.is_nan() {
        return Err(Error::invalid_argument("NaN sample value"));
    }
    let max_index = bucket_count.saturating_sub(1);
    let idx = if kind.is_floating() {
        let scaled = raw * max_index as f64;
        if scaled <= 0.0 {
            0
        } else if scaled >= max_index as f64 {
            max_index
        } else {
            scaled.floor() as usize
        }
    } else {
        let v = if raw < 0.0 { 0.0 } else { raw };
        let v = v.floor() as i64;
        if v < 0 {
            0
        } else {
            (v as usize).min(max_index)
        }
    };
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_clamps_negative_to_zero() {
        assert_eq!(bucket_index(ElementKind::I32, -5.0, 16).unwrap(), 0);
    }

    #[test]
    fn float_clamps_to_range() {
        assert_eq!(bucket_index(ElementKind::F64, -0.1, 16).unwrap(), 0);
        assert_eq!(bucket_index(ElementKind::F64, 1.5, 16).unwrap(), 15);
        assert_eq!(bucket_index(ElementKind::F64, 0.5, 16).unwrap(), 7);
    }

    #[test]
    fn nan_is_rejected() {
        assert!(bucket_index(ElementKind::F64, f64::NAN, 16).is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(ElementKind::U8.to_string(), "u8");
        assert_eq!(ElementKind::F32.to_string(), "f32");
    }
}

// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sliding-window rank and mathematical-morphology operators over
//! n-dimensional numeric arrays.
//!
//! The engine slides a finite integer [`Pattern`] (a structuring
//! element / aperture) across a flattened [`array::ArrayView`], tracking
//! the multiset of values currently under the aperture in
//! a summing histogram so each step is O(1)-amortized instead of
//! O(aperture size). [`StreamingApertureProcessor`] exposes the rank
//! queries this buys (percentile, rank, mean-between-values);
//! [`morphology`] builds dilation/erosion/opening/closing on top of it.

mod array;
mod context;
pub mod continuation;
mod element;
mod error;
mod granulometry;
mod histogram;
mod morphology;
mod pattern;
mod quickmean;
mod rank;
mod stream;

pub use array::{ArrayView, ArrayViewMut};
pub use context::{ArrayContext, FlagContext, NullContext};
pub use continuation::ContinuationMode;
pub use element::ElementKind;
pub use error::Error;
pub use granulometry::{Granulometry, GranulometryOutcome};
pub use morphology::{Morphology, SubtractionMode};
pub use pattern::{Offset, Pattern};
pub use quickmean::{Division, QuickAverager, Rounding};
pub use rank::Filler;
pub use stream::{CustomRankPrecision, CustomRankPrecisionBuilder, StreamingApertureProcessor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_surface_builds_a_rectangle_pattern() {
        let p = Pattern::rectangle(&[1, 1]);
        assert_eq!(p.point_count(), 9);
    }
}

// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The sliding-window rank operator family.

pub mod ops;
pub mod processor;

pub use ops::{
    function_of_percentile_pair, function_of_sum, integral_between_sharing,
    mean_between_percentiles, mean_between_values, percentile, rank, Filler,
};
pub use processor::{LinearPattern, RankOperationProcessor};

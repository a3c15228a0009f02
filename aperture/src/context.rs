// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cooperative cancellation / progress reporting.
//!
//! There are no suspension points at the algorithm level; a driver calls
//! `part()` at loop boundaries (the end of a contiguous range, or an
//! iteration of the granulometry loop) to report fractional completion
//! and to learn whether the caller asked to stop. Signaled cancellation
//! causes the driver to stop at that boundary and propagate
//! `Error::Cancelled`; partially written output is not guaranteed valid.

use std::ops::ControlFlow;

/// A progress/cancellation callback, driven at loop boundaries only.
pub trait ArrayContext {
    /// Reports that `done` of `total` units of work have completed.
    /// Returning `ControlFlow::Break(())` requests cancellation.
    fn part(&self, done: f64, total: f64) -> ControlFlow<()>;
}

/// The default context: never cancels, ignores progress.
pub struct NullContext;

impl ArrayContext for NullContext {
    fn part(&self, _done: f64, _total: f64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// A context that cancels once a caller-supplied predicate (checked via
/// `should_cancel`) returns true. Useful for tests and for wiring up an
/// external cancellation flag without requiring `Send`/`Sync`.
pub struct FlagContext<'a> {
    flag: &'a std::cell::Cell<bool>,
}

impl<'a> FlagContext<'a> {
    pub fn new(flag: &'a std::cell::Cell<bool>) -> Self {
        Self { flag }
    }
}

impl<'a> ArrayContext for FlagContext<'a> {
    fn part(&self, _done: f64, _total: f64) -> ControlFlow<()> {
        if self.flag.get() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_context_never_cancels() {
        assert_eq!(NullContext.part(0.5, 1.0), ControlFlow::Continue(()));
    }

    #[test]
    fn flag_context_cancels_once_set() {
        let flag = std::cell::Cell::new(false);
        let ctx = FlagContext::new(&flag);
        assert_eq!(ctx.part(0.0, 1.0), ControlFlow::Continue(()));
        flag.set(true);
        assert_eq!(ctx.part(0.5, 1.0), ControlFlow::Break(()));
    }
}

// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The `Morphology` surface: dilation/erosion and the
//! composite operators built on top of the rank engine via
//! [`StreamingApertureProcessor`] (max = percentile at `N`, min =
//! percentile at `0`).

use crate::array::ArrayView;
use crate::context::ArrayContext;
use crate::element::ElementKind;
use crate::pattern::Pattern;
use crate::stream::{CustomRankPrecision, StreamingApertureProcessor};
use crate::Error;

/// Selects whether dilation/erosion subtract the source from the
/// result, the result from the source, or pass the raw result through.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubtractionMode {
    None,
    SubtractSrcFromResult,
    SubtractResultFromSrc,
}

fn saturating_sub(a: f64, b: f64, kind: ElementKind) -> f64 {
    if kind.is_floating() {
        a - b
    } else {
        (a - b).max(0.0)
    }
}

fn saturating_add(a: f64, b: f64, kind: ElementKind) -> f64 {
    if kind.is_floating() {
        a + b
    } else {
        let max = ((1u64 << kind.natural_bits().min(63)) - 1) as f64;
        (a + b).min(max)
    }
}

/// Runs `percentile(p, r)` over every index of a standalone `dims`/`data`
/// pair, without requiring the caller to own a long-lived `ArrayView`.
/// Used both by `Morphology`'s own operators and to chain a composite
/// operator's intermediate result into the next rank pass.
fn rank_over(
    dims: &[usize],
    data: &[f64],
    pattern: &Pattern,
    kind: ElementKind,
    precision: &CustomRankPrecision,
    r: f64,
    ctx: &dyn ArrayContext,
) -> Result<Vec<f64>, Error> {
    let view = ArrayView::new(dims.to_vec(), data)?;
    let mut stream = StreamingApertureProcessor::new(&view, pattern, kind, precision)?;
    stream.materialize_percentile(r, ctx)
}

/// Implements the full `Morphology` surface on top of a single source
/// array and pattern. Every operation is a materializing (`X`) form;
/// the per-index evaluation underneath (`percentile_at`/`rank_at` on
/// [`StreamingApertureProcessor`]) is the lazy (`asX`) entry point.
pub struct Morphology<'a> {
    view: &'a ArrayView<'a>,
    pattern: Pattern,
    kind: ElementKind,
    precision: CustomRankPrecision,
}

impl<'a> Morphology<'a> {
    pub fn new(view: &'a ArrayView<'a>, pattern: Pattern, kind: ElementKind) -> Result<Self, Error> {
        if pattern.dim_count() != view.dims().len() {
            return Err(Error::size_mismatch(format!(
                "pattern has {} dimensions, array has {}",
                pattern.dim_count(),
                view.dims().len()
            )));
        }
        let precision = CustomRankPrecision::builder()
            .number_of_analyzed_bits(kind.natural_bits())
            .build()?;
        Ok(Self {
            view,
            pattern,
            kind,
            precision,
        })
    }

    fn apply_subtraction(&self, out: &mut [f64], src: &[f64], mode: SubtractionMode) {
        if mode == SubtractionMode::None {
            return;
        }
        for i in 0..out.len() {
            out[i] = match mode {
                SubtractionMode::None => out[i],
                SubtractionMode::SubtractSrcFromResult => saturating_sub(out[i], src[i], self.kind),
                SubtractionMode::SubtractResultFromSrc => saturating_sub(src[i], out[i], self.kind),
            };
        }
    }

    /// `percentile(p, N)`: the maximum aperture value at every index.
    pub fn dilation(&self, mode: SubtractionMode, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let n = self.pattern.point_count() as f64;
        let mut out = rank_over(self.view.dims(), self.view.as_slice(), &self.pattern, self.kind, &self.precision, n, ctx)?;
        self.apply_subtraction(&mut out, self.view.as_slice(), mode);
        Ok(out)
    }

    /// `percentile(p, 0)`: the minimum aperture value at every index.
    pub fn erosion(&self, mode: SubtractionMode, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let mut out = rank_over(self.view.dims(), self.view.as_slice(), &self.pattern, self.kind, &self.precision, 0.0, ctx)?;
        self.apply_subtraction(&mut out, self.view.as_slice(), mode);
        Ok(out)
    }

    pub fn closing(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let dilated = self.dilation(SubtractionMode::None, ctx)?;
        rank_over(self.view.dims(), &dilated, &self.pattern, self.kind, &self.precision, 0.0, ctx)
    }

    pub fn opening(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let eroded = self.erosion(SubtractionMode::None, ctx)?;
        let n = self.pattern.point_count() as f64;
        rank_over(self.view.dims(), &eroded, &self.pattern, self.kind, &self.precision, n, ctx)
    }

    /// `dilation - (closing - src)`, saturating.
    pub fn weak_dilation(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let dil = self.dilation(SubtractionMode::None, ctx)?;
        let clos = self.closing(ctx)?;
        let src = self.view.as_slice();
        Ok((0..dil.len())
            .map(|i| {
                let gap = saturating_sub(clos[i], src[i], self.kind);
                saturating_sub(dil[i], gap, self.kind)
            })
            .collect())
    }

    /// `erosion + (src - opening)`, saturating.
    pub fn weak_erosion(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let ero = self.erosion(SubtractionMode::None, ctx)?;
        let open = self.opening(ctx)?;
        let src = self.view.as_slice();
        Ok((0..ero.len())
            .map(|i| {
                let gap = saturating_sub(src[i], open[i], self.kind);
                saturating_add(ero[i], gap, self.kind)
            })
            .collect())
    }

    /// `dilation - erosion`, saturating non-negative.
    pub fn beucher_gradient(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let dil = self.dilation(SubtractionMode::None, ctx)?;
        let ero = self.erosion(SubtractionMode::None, ctx)?;
        Ok((0..dil.len())
            .map(|i| saturating_sub(dil[i], ero[i], self.kind))
            .collect())
    }

    /// `min(closing(src), src)`: the dilation/erosion chain clamped so
    /// the result never exceeds the source.
    pub fn masked_dilation_erosion(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let clos = self.closing(ctx)?;
        let src = self.view.as_slice();
        Ok((0..clos.len()).map(|i| clos[i].min(src[i])).collect())
    }

    /// `max(opening(src), src)`: the erosion/dilation chain clamped so
    /// the result never falls below the source.
    pub fn masked_erosion_dilation(&self, ctx: &dyn ArrayContext) -> Result<Vec<f64>, Error> {
        let open = self.opening(ctx)?;
        let src = self.view.as_slice();
        Ok((0..open.len()).map(|i| open[i].max(src[i])).collect())
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullContext;

    #[test]
    fn s1_dilation_matches_expected() {
        let data = [0.0, 3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        let view = ArrayView::new(vec![data.len()], &data).unwrap();
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let morph = Morphology::new(&view, pattern, ElementKind::U8).unwrap();
        let out = morph.dilation(SubtractionMode::None, &NullContext).unwrap();
        assert_eq!(
            out,
            vec![5.0, 3.0, 4.0, 4.0, 5.0, 9.0, 9.0, 9.0, 6.0, 6.0, 5.0, 5.0]
        );
    }

    #[test]
    fn opening_is_bounded_by_source_bounded_by_closing() {
        let data = [5.0, 1.0, 5.0, 1.0, 5.0, 1.0, 5.0, 1.0];
        let view = ArrayView::new(vec![data.len()], &data).unwrap();
        let pattern = Pattern::new(vec![vec![-1], vec![0], vec![1]]);
        let morph = Morphology::new(&view, pattern, ElementKind::U8).unwrap();
        let opened = morph.opening(&NullContext).unwrap();
        let closed = morph.closing(&NullContext).unwrap();
        for i in 0..data.len() {
            assert!(opened[i] <= data[i], "opening not <= src at {i}");
            assert!(data[i] <= closed[i], "src not <= closing at {i}");
        }
    }

    #[test]
    fn s3_closing_restores_flat_region() {
        let mut data = vec![200.0f64; 16 * 16];
        data[8 * 16 + 8] = 50.0;
        let view = ArrayView::new(vec![16, 16], &data).unwrap();
        let pattern = Pattern::rectangle(&[1, 1]);
        let morph = Morphology::new(&view, pattern, ElementKind::U8).unwrap();
        let closed = morph.closing(&NullContext).unwrap();
        assert!(closed.iter().all(|&v| v == 200.0));
    }
}

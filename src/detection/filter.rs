//! Declarative blob filtering and ranking.
//!
//! A [`FilterSpec`] pairs a measure (what to read from a blob) with a
//! comparison and a mode. The default production rule is
//! [`FilterSpec::min_area`]: drop every blob whose area is below a threshold.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::UnknownAttribute;
use crate::models::{Blob, BlobCollection};

/// Something that can be read off a blob as a scalar.
pub trait BlobMeasure: Send + Sync {
    fn measure(&self, blob: &Blob) -> f64;

    fn name(&self) -> &str;
}

/// Built-in blob attributes, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobAttribute {
    Area,
    Perimeter,
    MinX,
    MaxX,
    MinY,
    MaxY,
    Width,
    Height,
    XCenter,
    YCenter,
    Compactness,
    Mean,
    StdDev,
    Orientation,
}

impl BlobAttribute {
    pub const ALL: [BlobAttribute; 14] = [
        BlobAttribute::Area,
        BlobAttribute::Perimeter,
        BlobAttribute::MinX,
        BlobAttribute::MaxX,
        BlobAttribute::MinY,
        BlobAttribute::MaxY,
        BlobAttribute::Width,
        BlobAttribute::Height,
        BlobAttribute::XCenter,
        BlobAttribute::YCenter,
        BlobAttribute::Compactness,
        BlobAttribute::Mean,
        BlobAttribute::StdDev,
        BlobAttribute::Orientation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobAttribute::Area => "area",
            BlobAttribute::Perimeter => "perimeter",
            BlobAttribute::MinX => "min_x",
            BlobAttribute::MaxX => "max_x",
            BlobAttribute::MinY => "min_y",
            BlobAttribute::MaxY => "max_y",
            BlobAttribute::Width => "width",
            BlobAttribute::Height => "height",
            BlobAttribute::XCenter => "x_center",
            BlobAttribute::YCenter => "y_center",
            BlobAttribute::Compactness => "compactness",
            BlobAttribute::Mean => "mean",
            BlobAttribute::StdDev => "std_dev",
            BlobAttribute::Orientation => "orientation",
        }
    }
}

impl BlobMeasure for BlobAttribute {
    fn measure(&self, blob: &Blob) -> f64 {
        let bbox = blob.bbox();
        match self {
            BlobAttribute::Area => blob.area() as f64,
            BlobAttribute::Perimeter => blob.perimeter() as f64,
            BlobAttribute::MinX => bbox.x as f64,
            BlobAttribute::MaxX => bbox.max_x() as f64,
            BlobAttribute::MinY => bbox.y as f64,
            BlobAttribute::MaxY => bbox.max_y() as f64,
            BlobAttribute::Width => bbox.width as f64,
            BlobAttribute::Height => bbox.height as f64,
            BlobAttribute::XCenter => blob.centroid().0,
            BlobAttribute::YCenter => blob.centroid().1,
            BlobAttribute::Compactness => blob.compactness(),
            BlobAttribute::Mean => blob.mean_intensity(),
            BlobAttribute::StdDev => blob.intensity_std_dev(),
            BlobAttribute::Orientation => blob.orientation(),
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for BlobAttribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        BlobAttribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == wanted)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for BlobAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named closure measure, for metrics without a [`BlobAttribute`].
pub struct MeasureFn<F> {
    name: String,
    f: F,
}

impl<F> MeasureFn<F>
where
    F: Fn(&Blob) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> BlobMeasure for MeasureFn<F>
where
    F: Fn(&Blob) -> f64 + Send + Sync,
{
    fn measure(&self, blob: &Blob) -> f64 {
        (self.f)(blob)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    /// `low <= v <= high`
    Inside,
    /// `v < low || v > high`
    Outside,
}

impl CompareOp {
    pub fn matches(&self, value: f64, low: f64, high: f64) -> bool {
        match self {
            CompareOp::Equal => value == low,
            CompareOp::NotEqual => value != low,
            CompareOp::Greater => value > low,
            CompareOp::Less => value < low,
            CompareOp::GreaterOrEqual => value >= low,
            CompareOp::LessOrEqual => value <= low,
            CompareOp::Inside => low <= value && value <= high,
            CompareOp::Outside => value < low || value > high,
        }
    }
}

/// Whether matching blobs are kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

/// A stateless keep/drop rule over blobs.
#[derive(Clone)]
pub struct FilterSpec {
    measure: Arc<dyn BlobMeasure>,
    operator: CompareOp,
    threshold: f64,
    upper: f64,
    mode: FilterMode,
}

impl FilterSpec {
    pub fn new(
        measure: impl BlobMeasure + 'static,
        operator: CompareOp,
        threshold: f64,
        mode: FilterMode,
    ) -> Self {
        Self {
            measure: Arc::new(measure),
            operator,
            threshold,
            upper: threshold,
            mode,
        }
    }

    /// Range rule for [`CompareOp::Inside`] / [`CompareOp::Outside`]
    pub fn range(
        measure: impl BlobMeasure + 'static,
        operator: CompareOp,
        low: f64,
        high: f64,
        mode: FilterMode,
    ) -> Self {
        Self {
            upper: high,
            ..Self::new(measure, operator, low, mode)
        }
    }

    /// Drop blobs whose area is below `min_size`
    pub fn min_area(min_size: u32) -> Self {
        Self::new(
            BlobAttribute::Area,
            CompareOp::Less,
            min_size as f64,
            FilterMode::Exclude,
        )
    }

    pub fn keeps(&self, blob: &Blob) -> bool {
        let value = self.measure.measure(blob);
        let matched = self.operator.matches(value, self.threshold, self.upper);
        match self.mode {
            FilterMode::Include => matched,
            FilterMode::Exclude => !matched,
        }
    }

    pub fn operator(&self) -> CompareOp {
        self.operator
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("measure", &self.measure.name())
            .field("operator", &self.operator)
            .field("threshold", &self.threshold)
            .field("upper", &self.upper)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Keep the blobs `spec` accepts, in their original order
pub fn filter(blobs: &BlobCollection, spec: &FilterSpec) -> BlobCollection {
    let (width, height) = blobs.dimensions();
    let kept = blobs.iter().filter(|b| spec.keeps(b)).cloned().collect();
    BlobCollection::new(width, height, kept)
}

/// Apply several specs in sequence; a blob survives only if every spec keeps it
pub fn filter_all(blobs: &BlobCollection, specs: &[FilterSpec]) -> BlobCollection {
    let (width, height) = blobs.dimensions();
    let kept = blobs
        .iter()
        .filter(|b| specs.iter().all(|spec| spec.keeps(b)))
        .cloned()
        .collect();
    BlobCollection::new(width, height, kept)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl BlobCollection {
    pub fn filter(&self, spec: &FilterSpec) -> BlobCollection {
        filter(self, spec)
    }

    /// Measure every blob, in collection order
    pub fn values(&self, measure: &dyn BlobMeasure) -> Vec<f64> {
        self.iter().map(|b| measure.measure(b)).collect()
    }

    /// Stable sort by `measure`; ties keep labeling order
    pub fn sorted_by(&self, measure: &dyn BlobMeasure, order: SortOrder) -> BlobCollection {
        let (width, height) = self.dimensions();
        let mut keyed: Vec<(f64, &Blob)> = self.iter().map(|b| (measure.measure(b), b)).collect();
        keyed.sort_by(|(a, _), (b, _)| match order {
            SortOrder::Ascending => a.total_cmp(b),
            SortOrder::Descending => b.total_cmp(a),
        });
        BlobCollection::new(
            width,
            height,
            keyed.into_iter().map(|(_, b)| b.clone()).collect(),
        )
    }

    /// The `n`-th blob (0-based) when ranked by `measure`
    pub fn nth_by(&self, measure: &dyn BlobMeasure, n: usize, order: SortOrder) -> Option<Blob> {
        self.sorted_by(measure, order).into_vec().into_iter().nth(n)
    }
}

use serde::Serialize;

/// Axis-aligned bounding box in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn max_x(&self) -> u32 {
        self.x + self.width - 1
    }

    pub fn max_y(&self) -> u32 {
        self.y + self.height - 1
    }
}

/// Horizontal run of member pixels, `x_start..=x_end` on row `y`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRun {
    pub y: u32,
    pub x_start: u32,
    pub x_end: u32,
}

impl PixelRun {
    pub fn len(&self) -> u32 {
        self.x_end - self.x_start + 1
    }

    fn overlap(&self, other: &PixelRun) -> u32 {
        let start = self.x_start.max(other.x_start);
        let end = self.x_end.min(other.x_end);
        if end >= start { end - start + 1 } else { 0 }
    }
}

/// Raw image moments up to order 2
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
}

/// A connected region found by one labeling pass.
///
/// Blobs are immutable; every metric is computed once by [`BlobBuilder::build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    id: u32,
    bbox: BoundingBox,
    area: u64,
    perimeter: u64,
    moments: Moments,
    mean_intensity: f64,
    intensity_std_dev: f64,
    #[serde(skip)]
    runs: Vec<PixelRun>,
}

impl Blob {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn width(&self) -> u32 {
        self.bbox.width
    }

    pub fn height(&self) -> u32 {
        self.bbox.height
    }

    /// Number of member pixels
    pub fn area(&self) -> u64 {
        self.area
    }

    /// Count of pixel edges shared with a non-member 4-neighbour
    pub fn perimeter(&self) -> u64 {
        self.perimeter
    }

    pub fn moments(&self) -> Moments {
        self.moments
    }

    pub fn mean_intensity(&self) -> f64 {
        self.mean_intensity
    }

    pub fn intensity_std_dev(&self) -> f64 {
        self.intensity_std_dev
    }

    pub fn runs(&self) -> &[PixelRun] {
        &self.runs
    }

    pub fn centroid(&self) -> (f64, f64) {
        let m = &self.moments;
        (m.m10 / m.m00, m.m01 / m.m00)
    }

    /// perimeter² / (4π·area); 1.0 is a disc, larger values are less compact
    pub fn compactness(&self) -> f64 {
        let perimeter = self.perimeter as f64;
        (perimeter * perimeter) / (4.0 * std::f64::consts::PI * self.area as f64)
    }

    /// Angle of the major axis in radians, in `(-π/2, π/2]`
    pub fn orientation(&self) -> f64 {
        let m = &self.moments;
        let (cx, cy) = self.centroid();
        let mu20 = m.m20 / m.m00 - cx * cx;
        let mu02 = m.m02 / m.m00 - cy * cy;
        let mu11 = m.m11 / m.m00 - cx * cy;
        0.5 * (2.0 * mu11).atan2(mu20 - mu02)
    }

    /// Raw moment Σ xᵖ·yᑫ over all member pixels
    pub fn moment(&self, p: i32, q: i32) -> f64 {
        self.pixels()
            .map(|(x, y)| (x as f64).powi(p) * (y as f64).powi(q))
            .sum()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        let idx = self
            .runs
            .partition_point(|r| r.y < y || (r.y == y && r.x_end < x));
        self.runs
            .get(idx)
            .is_some_and(|r| r.y == y && r.x_start <= x && x <= r.x_end)
    }

    /// Member pixels in raster order
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.runs
            .iter()
            .flat_map(|r| (r.x_start..=r.x_end).map(move |x| (x, r.y)))
    }
}

/// Accumulates pixels of one region and produces a [`Blob`].
#[derive(Debug, Default, Clone)]
pub struct BlobBuilder {
    runs: Vec<PixelRun>,
    first_pixel: Option<(u32, u32)>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    count: u64,
    moments: Moments,
    sum_value: f64,
    sum_value_sq: f64,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First pixel pushed, used to order blobs by raster position
    pub fn first_pixel(&self) -> Option<(u32, u32)> {
        self.first_pixel
    }

    /// Adds one member pixel with its gray value.
    pub fn push(&mut self, x: u32, y: u32, value: u8) {
        if self.count == 0 {
            self.first_pixel = Some((x, y));
            self.min_x = x;
            self.min_y = y;
            self.max_x = x;
            self.max_y = y;
        } else {
            self.min_x = self.min_x.min(x);
            self.min_y = self.min_y.min(y);
            self.max_x = self.max_x.max(x);
            self.max_y = self.max_y.max(y);
        }

        match self.runs.last_mut() {
            Some(run) if run.y == y && run.x_end + 1 == x => run.x_end = x,
            _ => self.runs.push(PixelRun {
                y,
                x_start: x,
                x_end: x,
            }),
        }

        let (fx, fy) = (x as f64, y as f64);
        self.count += 1;
        self.moments.m00 += 1.0;
        self.moments.m10 += fx;
        self.moments.m01 += fy;
        self.moments.m11 += fx * fy;
        self.moments.m20 += fx * fx;
        self.moments.m02 += fy * fy;

        let v = value as f64;
        self.sum_value += v;
        self.sum_value_sq += v * v;
    }

    /// Finalizes the blob. Returns `None` if no pixel was pushed.
    pub fn build(mut self, id: u32) -> Option<Blob> {
        if self.count == 0 {
            return None;
        }

        self.runs.sort_by_key(|r| (r.y, r.x_start));
        let runs = merge_runs(self.runs);

        let n = self.count as f64;
        let mean = self.sum_value / n;
        let variance = (self.sum_value_sq / n - mean * mean).max(0.0);

        Some(Blob {
            id,
            bbox: BoundingBox {
                x: self.min_x,
                y: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
            area: self.count,
            perimeter: run_perimeter(&runs),
            moments: self.moments,
            mean_intensity: mean,
            intensity_std_dev: variance.sqrt(),
            runs,
        })
    }
}

fn merge_runs(sorted: Vec<PixelRun>) -> Vec<PixelRun> {
    let mut merged: Vec<PixelRun> = Vec::with_capacity(sorted.len());
    for run in sorted {
        match merged.last_mut() {
            Some(last) if last.y == run.y && run.x_start <= last.x_end + 1 => {
                last.x_end = last.x_end.max(run.x_end);
            }
            _ => merged.push(run),
        }
    }
    merged
}

/// Exposed 4-neighbour edges of a set of sorted, merged runs.
fn run_perimeter(runs: &[PixelRun]) -> u64 {
    runs.iter()
        .map(|run| {
            let covered = |y: Option<u32>| -> u64 {
                y.map_or(0, |y| {
                    runs_on_row(runs, y)
                        .iter()
                        .map(|other| run.overlap(other) as u64)
                        .sum()
                })
            };
            let above = covered(run.y.checked_sub(1));
            let below = covered(run.y.checked_add(1));
            2 + 2 * run.len() as u64 - above - below
        })
        .sum()
}

fn runs_on_row(runs: &[PixelRun], y: u32) -> &[PixelRun] {
    let start = runs.partition_point(|r| r.y < y);
    let end = runs.partition_point(|r| r.y <= y);
    &runs[start..end]
}

/// Blobs from one labeling pass, in labeling order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobCollection {
    width: u32,
    height: u32,
    blobs: Vec<Blob>,
}

impl BlobCollection {
    /// Collection for a `width`×`height` source frame
    pub fn new(width: u32, height: u32, blobs: Vec<Blob>) -> Self {
        Self {
            width,
            height,
            blobs,
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, Vec::new())
    }

    /// Size of the frame the blobs were labeled on
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Blob> {
        self.blobs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Blob> {
        self.blobs.iter()
    }

    pub fn as_slice(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn total_area(&self) -> u64 {
        self.blobs.iter().map(|b| b.area()).sum()
    }

    pub fn into_vec(self) -> Vec<Blob> {
        self.blobs
    }
}

impl<'a> IntoIterator for &'a BlobCollection {
    type Item = &'a Blob;
    type IntoIter = std::slice::Iter<'a, Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.blobs.iter()
    }
}

impl IntoIterator for BlobCollection {
    type Item = Blob;
    type IntoIter = std::vec::IntoIter<Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.blobs.into_iter()
    }
}

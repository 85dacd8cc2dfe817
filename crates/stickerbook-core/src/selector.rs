//! Flood-fill region selection over a pixel grid.
//!
//! A scanline fill working column by column: each seed is grown up and down
//! into a vertical span, and the neighbouring columns are scanned for runs of
//! matching pixels that become new seeds. The result is a [`RangeSet`] of
//! inclusive vertical spans per column.

use std::collections::BTreeMap;
use std::sync::Arc;

/// An RGBA color with straight (non-premultiplied) alpha.
pub type Rgba = [u8; 4];

/// A rectangular grid of straight-alpha RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGrid {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ColorGrid {
    /// Wrap raw RGBA bytes. Returns `None` when the buffer size does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Self { width, height, data })
    }

    /// A grid filled with a single color.
    pub fn uniform(width: u32, height: u32, color: Rgba) -> Self {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Color at a pixel, or `None` outside the grid.
    pub fn get(&self, x: i32, y: i32) -> Option<Rgba> {
        if !self.contains(x, y) {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn set(&mut self, x: i32, y: i32, color: Rgba) {
        if self.contains(x, y) {
            let i = (y as usize * self.width as usize + x as usize) * 4;
            self.data[i..i + 4].copy_from_slice(&color);
        }
    }
}

/// An inclusive vertical span `min..=max` within one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: i32,
    pub max: i32,
}

impl Span {
    pub fn len(&self) -> usize {
        (self.max - self.min + 1) as usize
    }

    pub fn contains(&self, y: i32) -> bool {
        self.min <= y && y <= self.max
    }
}

/// Sorted, non-overlapping vertical spans keyed by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    columns: BTreeMap<i32, Vec<Span>>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Add `min..=max` to column `x`, merging with overlapping or adjacent spans.
    pub fn insert(&mut self, x: i32, min: i32, max: i32) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let spans = self.columns.entry(x).or_default();

        let start = spans.partition_point(|s| s.max + 1 < min);
        let end = spans.partition_point(|s| s.min <= max + 1);
        if start == end {
            spans.insert(start, Span { min, max });
            return;
        }
        let merged = Span {
            min: spans[start].min.min(min),
            max: spans[end - 1].max.max(max),
        };
        spans.splice(start..end, std::iter::once(merged));
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let Some(spans) = self.columns.get(&x) else {
            return false;
        };
        let i = spans.partition_point(|s| s.max < y);
        spans.get(i).is_some_and(|s| s.contains(y))
    }

    /// Spans of one column, sorted by `min`.
    pub fn column(&self, x: i32) -> &[Span] {
        self.columns.get(&x).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit every span as `(x, min, max)`, columns ascending.
    pub fn for_each_range(&self, mut f: impl FnMut(i32, i32, i32)) {
        for (x, span) in self.iter() {
            f(x, span.min, span.max);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, Span)> + '_ {
        self.columns
            .iter()
            .flat_map(|(&x, spans)| spans.iter().map(move |&span| (x, span)))
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.iter().map(|(_, span)| span.len()).sum()
    }
}

/// Selects contiguous regions of similar color from a pixel grid.
#[derive(Debug, Clone)]
pub struct FuzzySelector {
    grid: Arc<ColorGrid>,
}

impl FuzzySelector {
    pub fn new(grid: ColorGrid) -> Self {
        Self { grid: Arc::new(grid) }
    }

    pub fn from_shared(grid: Arc<ColorGrid>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &ColorGrid {
        &self.grid
    }

    /// Select the region containing `(x, y)` in one go.
    ///
    /// A pixel belongs to the region when it is 4-connected to the seed and
    /// every channel is within `tolerance` of the seed color.
    pub fn select(&self, x: i32, y: i32, tolerance: u8) -> RangeSet {
        let mut stepper = self.select_iteratively(x, y, tolerance);
        while !stepper.step().done {}
        stepper.into_region()
    }

    /// Start an incremental selection; see [`SelectionStepper::step`].
    pub fn select_iteratively(&self, x: i32, y: i32, tolerance: u8) -> SelectionStepper {
        SelectionStepper::new(Arc::clone(&self.grid), x, y, tolerance)
    }
}

/// Progress report from one [`SelectionStepper::step`].
#[derive(Debug)]
pub struct SelectionStep<'a> {
    /// Region selected so far.
    pub region: &'a RangeSet,
    pub done: bool,
}

/// Incremental flood fill. Each step consumes one seed.
#[derive(Debug)]
pub struct SelectionStepper {
    grid: Arc<ColorGrid>,
    target: Rgba,
    tolerance: u8,
    seeds: Vec<(i32, i32)>,
    region: RangeSet,
}

impl SelectionStepper {
    fn new(grid: Arc<ColorGrid>, x: i32, y: i32, tolerance: u8) -> Self {
        let (target, seeds) = match grid.get(x, y) {
            Some(color) => (color, vec![(x, y)]),
            None => {
                log::debug!("Selection seed ({x}, {y}) is outside the grid");
                ([0; 4], Vec::new())
            }
        };
        Self {
            grid,
            target,
            tolerance,
            seeds,
            region: RangeSet::new(),
        }
    }

    /// Process one seed. Once `done` is reported, further steps are no-ops.
    pub fn step(&mut self) -> SelectionStep<'_> {
        if let Some((x, y)) = self.seeds.pop() {
            self.fill_column(x, y);
        }
        SelectionStep {
            region: &self.region,
            done: self.seeds.is_empty(),
        }
    }

    pub fn region(&self) -> &RangeSet {
        &self.region
    }

    pub fn is_done(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn into_region(self) -> RangeSet {
        self.region
    }

    fn matches(&self, x: i32, y: i32) -> bool {
        if self.region.contains(x, y) {
            return false;
        }
        let tolerance = self.tolerance;
        self.grid.get(x, y).is_some_and(|color| {
            color
                .iter()
                .zip(self.target.iter())
                .all(|(&a, &b)| a.abs_diff(b) <= tolerance)
        })
    }

    fn fill_column(&mut self, x: i32, y: i32) {
        if !self.matches(x, y) {
            return;
        }
        let mut min = y;
        while self.matches(x, min - 1) {
            min -= 1;
        }
        let mut max = y;
        while self.matches(x, max + 1) {
            max += 1;
        }
        self.region.insert(x, min, max);

        for nx in [x - 1, x + 1] {
            let mut in_run = false;
            for ny in min..=max {
                let m = self.matches(nx, ny);
                if m && !in_run {
                    self.seeds.push((nx, ny));
                }
                in_run = m;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = [255, 255, 255, 255];
    const BLACK: Rgba = [0, 0, 0, 255];

    /// A 5x5 white grid with a black vertical wall at x = 2.
    fn walled() -> ColorGrid {
        let mut grid = ColorGrid::uniform(5, 5, WHITE);
        for y in 0..5 {
            grid.set(2, y, BLACK);
        }
        grid
    }

    #[test]
    fn test_from_rgba_checks_size() {
        assert!(ColorGrid::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(ColorGrid::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_range_set_merges() {
        let mut set = RangeSet::new();
        set.insert(0, 5, 7);
        set.insert(0, 0, 2);
        set.insert(0, 3, 4);
        assert_eq!(set.column(0), &[Span { min: 0, max: 7 }]);

        set.insert(0, 10, 12);
        set.insert(0, 6, 11);
        assert_eq!(set.column(0), &[Span { min: 0, max: 12 }]);
        assert_eq!(set.pixel_count(), 13);
    }

    #[test]
    fn test_range_set_contains() {
        let mut set = RangeSet::new();
        set.insert(3, 1, 2);
        set.insert(3, 6, 8);
        assert!(set.contains(3, 1));
        assert!(set.contains(3, 7));
        assert!(!set.contains(3, 4));
        assert!(!set.contains(4, 1));
    }

    #[test]
    fn test_uniform_grid_selects_everything() {
        let selector = FuzzySelector::new(ColorGrid::uniform(7, 4, WHITE));
        let region = selector.select(3, 2, 0);
        assert_eq!(region.pixel_count(), 28);
        for x in 0..7 {
            assert_eq!(region.column(x), &[Span { min: 0, max: 3 }]);
        }
    }

    #[test]
    fn test_wall_stops_fill() {
        let selector = FuzzySelector::new(walled());
        let region = selector.select(0, 0, 10);
        assert_eq!(region.pixel_count(), 10);
        assert!(region.contains(1, 4));
        assert!(!region.contains(2, 0));
        assert!(!region.contains(3, 0));
    }

    #[test]
    fn test_tolerance_admits_near_colors() {
        let mut grid = walled();
        for y in 0..5 {
            grid.set(2, y, [250, 250, 250, 255]);
        }
        let selector = FuzzySelector::new(grid);
        assert_eq!(selector.select(0, 0, 4).pixel_count(), 10);
        assert_eq!(selector.select(0, 0, 5).pixel_count(), 25);
    }

    #[test]
    fn test_alpha_channel_is_compared() {
        let mut grid = ColorGrid::uniform(3, 1, WHITE);
        grid.set(1, 0, [255, 255, 255, 0]);
        let region = FuzzySelector::new(grid).select(0, 0, 10);
        assert_eq!(region.pixel_count(), 1);
    }

    #[test]
    fn test_seed_outside_grid() {
        let selector = FuzzySelector::new(ColorGrid::uniform(4, 4, WHITE));
        assert!(selector.select(-1, 0, 10).is_empty());
        assert!(selector.select(4, 0, 10).is_empty());

        let mut stepper = selector.select_iteratively(0, 9, 10);
        let step = stepper.step();
        assert!(step.done);
        assert!(step.region.is_empty());
    }

    #[test]
    fn test_iterative_matches_sync() {
        let mut grid = ColorGrid::uniform(9, 9, WHITE);
        // a ring with a gap, so the fill has to wind around
        for i in 2..7 {
            grid.set(i, 2, BLACK);
            grid.set(i, 6, BLACK);
            grid.set(2, i, BLACK);
        }
        grid.set(6, 3, BLACK);
        grid.set(6, 5, BLACK);
        let selector = FuzzySelector::new(grid);

        let expected = selector.select(4, 4, 10);
        let mut stepper = selector.select_iteratively(4, 4, 10);
        let mut steps = 0;
        while !stepper.step().done {
            steps += 1;
        }
        assert!(steps > 1);
        assert!(stepper.is_done());
        assert_eq!(stepper.region(), &expected);
        // fully connected through the gap at (6, 4)
        assert_eq!(expected.pixel_count(), 81 - 5 - 5 - 3 - 2);
    }

    #[test]
    fn test_regions_grow_monotonically() {
        let selector = FuzzySelector::new(walled());
        let mut stepper = selector.select_iteratively(4, 4, 0);
        let mut last = 0;
        loop {
            let step = stepper.step();
            let count = step.region.pixel_count();
            assert!(count >= last);
            last = count;
            if step.done {
                break;
            }
        }
        assert_eq!(last, 10);
    }
}

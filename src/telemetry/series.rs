use serde::Serialize;

/// Bracketing samples further apart than this flag the interpolated value.
pub const MAX_INTERPOLATION_GAP_S: f64 = 0.5;

/// Values that can be blended between two bracketing samples.
pub trait Interpolate: Clone {
    fn lerp(&self, other: &Self, fraction: f64) -> Self;
}

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        self + (other - self) * fraction
    }
}

impl Interpolate for [f64; 3] {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        [
            self[0].lerp(&other[0], fraction),
            self[1].lerp(&other[1], fraction),
            self[2].lerp(&other[2], fraction),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample<T> {
    /// Seconds from log start.
    pub offset: f64,
    pub value: T,
}

/// A value read from a series at an arbitrary offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interpolated<T> {
    pub offset: f64,
    pub value: T,
    /// Set when the value was blended across a gap wider than
    /// [`MAX_INTERPOLATION_GAP_S`].
    pub is_interpolated: bool,
}

/// Samples ordered by non-decreasing offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries<T> {
    samples: Vec<Sample<T>>,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
        }
    }
}

impl<T> TimeSeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Returns `false` and drops it when it would break ordering.
    pub fn push(&mut self, offset: f64, value: T) -> bool {
        if !offset.is_finite() {
            return false;
        }
        if let Some(last) = self.samples.last() {
            if offset < last.offset {
                return false;
            }
        }
        self.samples.push(Sample { offset, value });
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample<T>] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample<T>> {
        self.samples.iter()
    }

    pub fn first(&self) -> Option<&Sample<T>> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample<T>> {
        self.samples.last()
    }

    /// First and last offsets.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.first()?.offset, self.last()?.offset))
    }

    /// Most recent sample at or before `offset`, for step-valued series.
    pub fn latest_at(&self, offset: f64) -> Option<&Sample<T>> {
        let idx = self.samples.partition_point(|s| s.offset <= offset);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }
}

impl<T: Interpolate> TimeSeries<T> {
    /// Linear interpolation between the bracketing samples, located with a
    /// binary search. Offsets outside the series clamp to the nearest end.
    pub fn sample_at(&self, offset: f64) -> Option<Interpolated<T>> {
        let idx = self.samples.partition_point(|s| s.offset < offset);

        let exact = |sample: &Sample<T>| Interpolated {
            offset,
            value: sample.value.clone(),
            is_interpolated: false,
        };

        if let Some(hit) = self.samples.get(idx).filter(|s| s.offset == offset) {
            return Some(exact(hit));
        }
        if idx == 0 {
            return self.samples.first().map(exact);
        }
        if idx == self.samples.len() {
            return self.samples.last().map(exact);
        }

        let lo = &self.samples[idx - 1];
        let hi = &self.samples[idx];
        let gap = hi.offset - lo.offset;
        let fraction = (offset - lo.offset) / gap;
        Some(Interpolated {
            offset,
            value: lo.value.lerp(&hi.value, fraction),
            is_interpolated: gap > MAX_INTERPOLATION_GAP_S,
        })
    }
}

impl<T> FromIterator<(f64, T)> for TimeSeries<T> {
    fn from_iter<I: IntoIterator<Item = (f64, T)>>(iter: I) -> Self {
        let mut series = TimeSeries::new();
        for (offset, value) in iter {
            series.push(offset, value);
        }
        series
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a Sample<T>;
    type IntoIter = std::slice::Iter<'a, Sample<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_samples(gap: f64) -> TimeSeries<f64> {
        [(10.0, 100.0), (10.0 + gap, 200.0)].into_iter().collect()
    }

    #[test]
    fn test_exact_endpoints_are_not_interpolated() {
        let series = two_samples(2.0);

        let first = series.sample_at(10.0).unwrap();
        assert_eq!(first.value, 100.0);
        assert!(!first.is_interpolated);

        let last = series.sample_at(12.0).unwrap();
        assert_eq!(last.value, 200.0);
        assert!(!last.is_interpolated);
    }

    #[test]
    fn test_wide_gap_is_flagged() {
        let series = two_samples(2.0);
        let mid = series.sample_at(11.0).unwrap();
        assert!((mid.value - 150.0).abs() < 1e-9);
        assert!(mid.is_interpolated);
    }

    #[test]
    fn test_narrow_gap_is_not_flagged() {
        let series = two_samples(0.2);
        let mid = series.sample_at(10.05).unwrap();
        assert!((mid.value - 125.0).abs() < 1e-9);
        assert!(!mid.is_interpolated);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let series = two_samples(1.0);
        assert_eq!(series.sample_at(0.0).unwrap().value, 100.0);
        assert_eq!(series.sample_at(99.0).unwrap().value, 200.0);
        assert!(TimeSeries::<f64>::new().sample_at(1.0).is_none());
    }

    #[test]
    fn test_rejects_out_of_order_push() {
        let mut series = TimeSeries::new();
        assert!(series.push(1.0, 1.0));
        assert!(series.push(1.0, 2.0));
        assert!(!series.push(0.5, 3.0));
        assert!(!series.push(f64::NAN, 3.0));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_latest_at_is_step_valued() {
        let series: TimeSeries<f64> = [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)].into_iter().collect();
        assert!(series.latest_at(-0.1).is_none());
        assert_eq!(series.latest_at(0.0).unwrap().value, 1.0);
        assert_eq!(series.latest_at(1.99).unwrap().value, 2.0);
        assert_eq!(series.latest_at(50.0).unwrap().value, 3.0);
    }

    #[test]
    fn test_bracket_search_on_large_series() {
        let series: TimeSeries<f64> = (0..100_000).map(|i| (i as f64 * 0.1, i as f64)).collect();
        let value = series.sample_at(4321.05).unwrap();
        assert!((value.value - 43210.5).abs() < 1e-6);
        assert!(!value.is_interpolated);
    }
}

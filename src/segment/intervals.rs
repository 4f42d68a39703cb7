//! Interval boundaries and sample classification.
//!
//! `N + 1` strictly increasing boundaries define `N` intervals:
//!
//! ```text
//! [b0, b1) [b1, b2) ... [b(N-1), bN]
//! ```
//!
//! Every interval is half-open except the last, which is closed so that the
//! final observed time is always classified. A sample sitting exactly on an
//! interior boundary belongs to the interval that starts there.

use serde::{Deserialize, Serialize};

use crate::domain::Interval;
use crate::error::FitError;

/// Validated, strictly increasing interval boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct IntervalBoundaries {
    points: Vec<f64>,
}

impl IntervalBoundaries {
    /// Accept `points` as-is: at least two, finite, strictly increasing.
    pub fn new(points: Vec<f64>) -> Result<Self, FitError> {
        if points.len() < 2 {
            return Err(FitError::InvalidBoundaries(format!(
                "need at least 2 boundaries to form an interval, got {}",
                points.len()
            )));
        }
        if let Some(b) = points.iter().find(|b| !b.is_finite()) {
            return Err(FitError::InvalidBoundaries(format!("boundary {b} is not finite")));
        }
        if let Some(w) = points.windows(2).find(|w| w[1] <= w[0]) {
            return Err(FitError::InvalidBoundaries(format!(
                "boundaries must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self { points })
    }

    /// Sort ascending first, then validate. Duplicates are still rejected.
    pub fn from_unsorted(mut points: Vec<f64>) -> Result<Self, FitError> {
        points.sort_by(|a, b| a.total_cmp(b));
        Self::new(points)
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn interval_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn start(&self) -> f64 {
        self.points[0]
    }

    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    pub fn interval(&self, index: usize) -> Option<Interval> {
        if index >= self.interval_count() {
            return None;
        }
        Some(Interval {
            index,
            start: self.points[index],
            end: self.points[index + 1],
            closed_right: index + 1 == self.interval_count(),
        })
    }

    pub fn intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        (0..self.interval_count()).filter_map(|i| self.interval(i))
    }

    /// Index of the interval containing `t`, or `None` outside `[b0, bN]`.
    pub fn locate(&self, t: f64) -> Option<usize> {
        if !(t >= self.start() && t <= self.end()) {
            return None;
        }
        // Number of boundaries <= t; at least 1 because b0 <= t.
        let j = self.points.partition_point(|&b| b <= t);
        Some((j - 1).min(self.interval_count() - 1))
    }
}

impl TryFrom<Vec<f64>> for IntervalBoundaries {
    type Error = FitError;

    fn try_from(points: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<IntervalBoundaries> for Vec<f64> {
    fn from(value: IntervalBoundaries) -> Self {
        value.points
    }
}

/// Interval index for every sample, in input order.
///
/// Fails on the first sample outside `[b0, bN]`; nothing is skipped.
pub fn classify(times: &[f64], boundaries: &IntervalBoundaries) -> Result<Vec<usize>, FitError> {
    times
        .iter()
        .enumerate()
        .map(|(index, &time)| {
            boundaries.locate(time).ok_or(FitError::UncoveredSample {
                index,
                time,
                start: boundaries.start(),
                end: boundaries.end(),
            })
        })
        .collect()
}

/// Sample indices grouped per interval (`out[i]` lists samples in interval `i`).
pub fn partition(times: &[f64], boundaries: &IntervalBoundaries) -> Result<Vec<Vec<usize>>, FitError> {
    let labels = classify(times, boundaries)?;
    let mut out = vec![Vec::new(); boundaries.interval_count()];
    for (sample, interval) in labels.into_iter().enumerate() {
        out[interval].push(sample);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn scenario() -> IntervalBoundaries {
        IntervalBoundaries::new(vec![0.0, 5.0, 10.0, 15.0, 20.0, 48.0]).unwrap()
    }

    #[test]
    fn rejects_malformed_boundaries() {
        assert!(IntervalBoundaries::new(vec![1.0]).is_err());
        assert!(IntervalBoundaries::new(vec![0.0, 5.0, 5.0]).is_err());
        assert!(IntervalBoundaries::new(vec![0.0, 10.0, 5.0]).is_err());
        assert!(IntervalBoundaries::new(vec![0.0, f64::NAN]).is_err());
        assert!(IntervalBoundaries::from_unsorted(vec![10.0, 0.0, 5.0]).is_ok());
        assert!(IntervalBoundaries::from_unsorted(vec![10.0, 5.0, 5.0]).is_err());
    }

    #[test]
    fn interior_boundary_goes_to_the_interval_it_starts() {
        let b = scenario();
        assert_eq!(b.locate(5.0), Some(1));
        assert_eq!(b.locate(10.0), Some(2));
        assert_eq!(b.locate(20.0), Some(4));
        assert_eq!(b.locate(4.999_999), Some(0));
    }

    #[test]
    fn outer_boundaries_are_covered() {
        let b = scenario();
        assert_eq!(b.locate(0.0), Some(0));
        // Final interval is closed on the right.
        assert_eq!(b.locate(48.0), Some(4));
    }

    #[test]
    fn samples_outside_coverage_are_uncovered() {
        let b = scenario();
        let err = classify(&[1.0, 48.5], &b).unwrap_err();
        assert_eq!(
            err,
            FitError::UncoveredSample {
                index: 1,
                time: 48.5,
                start: 0.0,
                end: 48.0
            }
        );
        assert!(classify(&[-0.1], &b).is_err());
        assert!(classify(&[f64::NAN], &b).is_err());
    }

    #[test]
    fn intervals_report_closed_right_only_for_the_last() {
        let b = scenario();
        let ivs: Vec<Interval> = b.intervals().collect();
        assert_eq!(ivs.len(), 5);
        assert!(ivs[..4].iter().all(|iv| !iv.closed_right));
        assert!(ivs[4].closed_right);
        assert_eq!((ivs[1].start, ivs[1].end), (5.0, 10.0));
    }

    #[test]
    fn random_samples_land_in_exactly_one_interval() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..200 {
            let n_points = rng.gen_range(2..8);
            let mut points: Vec<f64> = (0..n_points).map(|_| rng.gen_range(0.0..100.0)).collect();
            points.sort_by(|a, b| a.total_cmp(b));
            points.dedup();
            let Ok(b) = IntervalBoundaries::new(points) else {
                continue;
            };

            // Mix uniform draws with exact boundary hits.
            let mut times: Vec<f64> = (0..50).map(|_| rng.gen_range(b.start()..=b.end())).collect();
            times.extend_from_slice(b.points());

            let groups = partition(&times, &b).unwrap();
            let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..times.len()).collect::<Vec<_>>());

            for (i, members) in groups.iter().enumerate() {
                let iv = b.interval(i).unwrap();
                for &s in members {
                    assert!(iv.contains(times[s]));
                    // No other interval claims it.
                    let claims = b.intervals().filter(|other| other.contains(times[s])).count();
                    assert_eq!(claims, 1);
                }
            }

            let outside = [b.start() - 1.0, b.end() + 1.0];
            for t in outside {
                assert!(matches!(
                    classify(&[t], &b),
                    Err(FitError::UncoveredSample { .. })
                ));
            }
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: IntervalBoundaries = serde_json::from_str("[0, 5, 10]").unwrap();
        assert_eq!(ok.interval_count(), 2);
        assert!(serde_json::from_str::<IntervalBoundaries>("[0, 10, 5]").is_err());
    }
}

//! Online statistics accumulators (spec §4.7). Ported from
//! `original_source/include/filament-sliding/Statistics.hpp` and
//! `Histogram.hpp`.

use crate::error::{FilamentSlidingError, Result};

/// Welford's online mean/variance accumulator, avoiding the numerical
/// instability of a naive sum-of-squares formula over long runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (Bessel-corrected, divides by `n - 1`). `NaN`
    /// with fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean.
    pub fn sem(&self) -> f64 {
        self.standard_deviation() / (self.count as f64).sqrt()
    }
}

/// Half-open `[lower, upper)` bins plus two outer catch-all bins for
/// values below the first edge or at/above the last edge (spec §4.7,
/// B4).
#[derive(Debug, Clone)]
pub struct Histogram {
    edges: Vec<f64>,
    counts: Vec<u64>,
    below: u64,
    above: u64,
}

impl Histogram {
    /// `edges` must be strictly increasing and contain at least two
    /// values; it defines `edges.len() - 1` interior bins.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(FilamentSlidingError::precondition(
                "Histogram requires at least two bin edges",
            ));
        }
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(FilamentSlidingError::precondition(
                "Histogram edges must be strictly increasing",
            ));
        }
        let counts = vec![0u64; edges.len() - 1];
        Ok(Histogram {
            edges,
            counts,
            below: 0,
            above: 0,
        })
    }

    pub fn add_sample(&mut self, x: f64) {
        if x < self.edges[0] {
            self.below += 1;
            return;
        }
        if x >= *self.edges.last().unwrap() {
            self.above += 1;
            return;
        }
        // `partition_point` finds the first edge strictly greater than
        // `x`; the bin index is one less than that.
        let idx = self.edges.partition_point(|&e| e <= x) - 1;
        self.counts[idx] += 1;
    }

    pub fn below(&self) -> u64 {
        self.below
    }

    pub fn above(&self) -> u64 {
        self.above
    }

    pub fn bin_counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn total(&self) -> u64 {
        self.below + self.above + self.counts.iter().sum::<u64>()
    }
}

/// Where the mobile filament's leading (plus-end) tip sits relative to
/// the fixed filament's tip, used to bin drift/diffusion estimates
/// (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TipOffsetBin(pub i64);

/// Binned drift (mean displacement rate) and diffusion (variance rate)
/// as a function of the actin front's position relative to the
/// microtubule tip.
#[derive(Debug, Clone, Default)]
pub struct DynamicsEstimate {
    per_bin: std::collections::BTreeMap<i64, Statistics>,
}

impl DynamicsEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one macro step's displacement `delta_x` while the
    /// actin front sat `tip_offset` lattice sites from the microtubule
    /// tip.
    pub fn record(&mut self, tip_offset: TipOffsetBin, delta_x: f64) {
        self.per_bin.entry(tip_offset.0).or_default().add_sample(delta_x);
    }

    /// Drift rate for `bin`: mean displacement per macro step.
    pub fn drift(&self, bin: TipOffsetBin) -> Option<f64> {
        self.per_bin.get(&bin.0).map(Statistics::mean)
    }

    /// Diffusion rate for `bin`: half the per-step variance, the
    /// standard one-dimensional relation `Var = 2 D t`.
    pub fn diffusion(&self, bin: TipOffsetBin) -> Option<f64> {
        self.per_bin.get(&bin.0).map(|s| s.variance() / 2.0)
    }

    pub fn bins(&self) -> impl Iterator<Item = i64> + '_ {
        self.per_bin.keys().copied()
    }
}

/// Tracks entries into and exits out of the basin of attraction
/// (spec §4.7) and records the elapsed time of each excursion, the raw
/// material for a transition-path-time histogram.
#[derive(Debug, Clone, Default)]
pub struct TransitionPathRecorder {
    in_basin: bool,
    excursion_start: f64,
    completed_excursions: Vec<f64>,
}

impl TransitionPathRecorder {
    pub fn new() -> Self {
        TransitionPathRecorder {
            in_basin: true,
            excursion_start: 0.0,
            completed_excursions: Vec::new(),
        }
    }

    /// Feed one macro step's basin membership and current simulation
    /// time; records a completed excursion's duration on re-entry.
    pub fn observe(&mut self, currently_in_basin: bool, time: f64) {
        if self.in_basin && !currently_in_basin {
            self.excursion_start = time;
        } else if !self.in_basin && currently_in_basin {
            self.completed_excursions.push(time - self.excursion_start);
        }
        self.in_basin = currently_in_basin;
    }

    pub fn completed_excursions(&self) -> &[f64] {
        &self.completed_excursions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn statistics_mean_and_variance_match_known_sample() {
        let mut s = Statistics::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.add_sample(x);
        }
        assert_relative_eq!(s.mean(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(s.variance(), 4.571428571428571, epsilon = 1e-9);
    }

    #[test]
    fn statistics_variance_is_nan_with_fewer_than_two_samples() {
        let mut s = Statistics::new();
        assert!(s.variance().is_nan());
        s.add_sample(1.0);
        assert!(s.variance().is_nan());
    }

    #[test]
    fn histogram_routes_samples_to_correct_bins_and_outer_buckets() {
        let mut h = Histogram::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        h.add_sample(-1.0);
        h.add_sample(0.5);
        h.add_sample(1.5);
        h.add_sample(2.9);
        h.add_sample(3.0);
        h.add_sample(100.0);
        assert_eq!(h.below(), 1);
        assert_eq!(h.above(), 2);
        assert_eq!(h.bin_counts(), &[1, 1, 1]);
        assert_eq!(h.total(), 6);
    }

    #[test]
    fn histogram_rejects_non_increasing_edges() {
        assert!(Histogram::new(vec![1.0, 1.0, 2.0]).is_err());
        assert!(Histogram::new(vec![1.0]).is_err());
    }

    #[test]
    fn dynamics_estimate_separates_bins() {
        let mut d = DynamicsEstimate::new();
        d.record(TipOffsetBin(0), 0.1);
        d.record(TipOffsetBin(0), 0.3);
        d.record(TipOffsetBin(1), -0.2);
        assert_relative_eq!(d.drift(TipOffsetBin(0)).unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(d.drift(TipOffsetBin(1)).unwrap(), -0.2, epsilon = 1e-12);
        assert!(d.drift(TipOffsetBin(99)).is_none());
    }

    #[test]
    fn transition_path_recorder_times_one_excursion() {
        let mut rec = TransitionPathRecorder::new();
        rec.observe(true, 0.0);
        rec.observe(false, 1.0);
        rec.observe(false, 2.0);
        rec.observe(true, 3.5);
        assert_eq!(rec.completed_excursions(), &[2.5]);
    }
}

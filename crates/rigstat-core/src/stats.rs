//! Weighted hash-rate statistics.
//!
//! Every sample is weighted by its hash count. One sort by rate plus a few
//! linear passes produce a [`StatSnapshot`] (central tendency, percentile
//! ladder, dispersion and shape measures) and a [`HistogramSummary`]
//! (fixed-width bins, outliers, modes).
//!
//! Deviations, variance and the shape measures are taken about the harmonic
//! mean, which is the average of choice for rates.

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::EngineConfig;
use crate::record::HashSample;

// ---------------------------------------------------------------------------
// Percentile ladder
// ---------------------------------------------------------------------------

/// Position on the percentile ladder, named after the matching point of a
/// standard normal distribution. A tagging convention, not a normality
/// assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SigmaLevel {
    MinusThree,
    MinusTwoAndHalf,
    MinusTwo,
    MinusOneAndHalf,
    LowerQuartile,
    MinusOne,
    Median,
    PlusOne,
    UpperQuartile,
    PlusOneAndHalf,
    PlusTwo,
    PlusTwoAndHalf,
    PlusThree,
}

impl SigmaLevel {
    /// Every level in ascending threshold order.
    pub const ALL: [SigmaLevel; 13] = [
        Self::MinusThree,
        Self::MinusTwoAndHalf,
        Self::MinusTwo,
        Self::MinusOneAndHalf,
        Self::LowerQuartile,
        Self::MinusOne,
        Self::Median,
        Self::PlusOne,
        Self::UpperQuartile,
        Self::PlusOneAndHalf,
        Self::PlusTwo,
        Self::PlusTwoAndHalf,
        Self::PlusThree,
    ];

    /// Cumulative weight fraction at which this level is read off.
    pub fn threshold(self) -> f64 {
        match self {
            Self::MinusThree => 0.002_699_796_063_26,
            Self::MinusTwoAndHalf => 0.012_419_330_651_552,
            Self::MinusTwo => 0.045_500_263_896_358,
            Self::MinusOneAndHalf => 0.133_614_402_537_716,
            Self::LowerQuartile => 0.25,
            Self::MinusOne => 0.317_310_507_862_914,
            Self::Median => 0.5,
            Self::PlusOne => 0.682_689_492_137_086,
            Self::UpperQuartile => 0.75,
            Self::PlusOneAndHalf => 0.866_385_597_462_284,
            Self::PlusTwo => 0.954_499_736_103_642,
            Self::PlusTwoAndHalf => 0.987_580_669_348_448,
            Self::PlusThree => 0.997_300_203_936_74,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MinusThree => "-3σ",
            Self::MinusTwoAndHalf => "-2.5σ",
            Self::MinusTwo => "-2σ",
            Self::MinusOneAndHalf => "-1.5σ",
            Self::LowerQuartile => "Q1",
            Self::MinusOne => "-1σ",
            Self::Median => "0σ",
            Self::PlusOne => "+1σ",
            Self::UpperQuartile => "Q3",
            Self::PlusOneAndHalf => "+1.5σ",
            Self::PlusTwo => "+2σ",
            Self::PlusTwoAndHalf => "+2.5σ",
            Self::PlusThree => "+3σ",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SigmaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rates read off at each [`SigmaLevel`]. Serialized as a label → rate map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(try_from = "HashMap<String, f64>")]
pub struct PercentileLadder {
    values: [f64; 13],
}

impl PercentileLadder {
    pub fn get(&self, level: SigmaLevel) -> f64 {
        self.values[level.index()]
    }

    /// Levels and rates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (SigmaLevel, f64)> + '_ {
        SigmaLevel::ALL.into_iter().map(|level| (level, self.get(level)))
    }
}

impl Serialize for PercentileLadder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (level, rate) in self.iter() {
            map.serialize_entry(level.label(), &rate)?;
        }
        map.end()
    }
}

impl TryFrom<HashMap<String, f64>> for PercentileLadder {
    type Error = String;

    fn try_from(map: HashMap<String, f64>) -> Result<Self, Self::Error> {
        let mut values = [0.0; 13];
        for (label, rate) in map {
            let level =
                SigmaLevel::from_label(&label).ok_or_else(|| format!("unknown level {label}"))?;
            values[level.index()] = rate;
        }
        Ok(Self { values })
    }
}

// ---------------------------------------------------------------------------
// Absolute deviations
// ---------------------------------------------------------------------------

/// Center the absolute deviations are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationBasis {
    Median,
    Mean,
}

/// How the absolute deviations are folded into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationAggregate {
    Median,
    WeightedMean,
    Max,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Statistics of a session's hash history as of one recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// When the snapshot was computed (host clock).
    pub timestamp: i64,
    /// Productive seconds between session start and last update.
    pub running_time: u64,

    pub total_hash_count: u64,
    pub total_entries: usize,

    pub root_mean_square: f64,
    pub arithmetic_mean: f64,
    pub geometric_mean: f64,
    pub harmonic_mean: f64,
    /// Total hash count divided by running time.
    pub counted_hash_rate: f64,

    /// Q1, median and Q3 of the moving window only.
    pub moving_spread_bottom: f64,
    pub moving_median: f64,
    pub moving_spread_top: f64,

    pub percentiles: PercentileLadder,
    pub interquartile_range: f64,
    /// Lower and upper outer whisker.
    pub outer_whiskers: [f64; 2],
    pub range: f64,
    pub lowest_rate: f64,
    pub highest_rate: f64,

    pub mid_range: f64,
    pub mid_hinge: f64,
    pub tri_mean: f64,

    pub variance: f64,
    pub standard_deviation: f64,
    /// Rows: about median, about mean. Columns: median, weighted mean, max.
    pub absolute_deviations: [[f64; 3]; 2],
    pub std_mad_ratio: f64,
    pub dispersion_coefficient: f64,
    pub variation_coefficient: f64,
    pub quartile_coefficient: f64,
    pub range_coefficient: f64,

    pub skewness: f64,
    pub kurtosis: f64,
    pub non_parametric_skew: f64,

    pub found: u64,
    pub average_temperature: f64,
    pub average_pool_latency: f64,
}

impl StatSnapshot {
    pub fn median(&self) -> f64 {
        self.percentiles.get(SigmaLevel::Median)
    }

    pub fn absolute_deviation(&self, basis: DeviationBasis, aggregate: DeviationAggregate) -> f64 {
        let row = match basis {
            DeviationBasis::Median => 0,
            DeviationBasis::Mean => 1,
        };
        let col = match aggregate {
            DeviationAggregate::Median => 0,
            DeviationAggregate::WeightedMean => 1,
            DeviationAggregate::Max => 2,
        };
        self.absolute_deviations[row][col]
    }
}

/// Rates falling into one histogram bin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub rates: Vec<f64>,
    pub weight: u64,
}

/// Rate distribution of the session, rebuilt with every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Rate at the lower edge of bin 0.
    pub origin: f64,
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
    /// Distinct rates outside the outer whiskers, ascending.
    pub outliers: Vec<f64>,
    /// Distinct rates sharing the largest accumulated weight, ascending.
    pub modes: Vec<f64>,
    pub mode_weight: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Records the first rate at which the running weight fraction reaches
/// each threshold.
struct FirstReached<const N: usize> {
    thresholds: [f64; N],
    hits: [Option<f64>; N],
    cumulative: u64,
    total: u64,
}

impl<const N: usize> FirstReached<N> {
    fn new(thresholds: [f64; N], total: u64) -> Self {
        Self {
            thresholds,
            hits: [None; N],
            cumulative: 0,
            total,
        }
    }

    fn observe(&mut self, rate: f64, weight: u64) {
        if self.total == 0 {
            return;
        }
        self.cumulative += weight;
        let fraction = self.cumulative as f64 / self.total as f64;
        for (threshold, hit) in self.thresholds.iter().zip(self.hits.iter_mut()) {
            if hit.is_none() && fraction >= *threshold {
                *hit = Some(rate);
            }
        }
    }

    fn values(&self, fallback: f64) -> [f64; N] {
        self.hits.map(|hit| hit.unwrap_or(fallback))
    }
}

/// Compute a snapshot and histogram from a session's hash history.
///
/// Returns `None` when the samples carry no weight. Sensor averages, running
/// time and counted rate are left at zero for the caller to fill.
///
/// A history whose rates are all equal still yields a snapshot: every entry
/// lands in bin 0 and the histogram's `bin_width` is 0. Monitors that skip
/// zero-range histories entirely would report nothing here.
pub fn compute(
    samples: &[HashSample],
    config: &EngineConfig,
) -> Option<(StatSnapshot, HistogramSummary)> {
    let total_weight: u64 = samples.iter().map(|s| u64::from(s.hash_count)).sum();
    if total_weight == 0 {
        return None;
    }
    let total = total_weight as f64;

    let mut points: Vec<(f64, u64)> = samples
        .iter()
        .map(|s| (s.hash_rate, u64::from(s.hash_count)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let moving = moving_window(samples, config);
    let moving_weight: u64 = moving.iter().map(|&(_, w)| w).sum();

    // Pass 1: weighted sums for the three means.
    let mut weighted_sum = 0.0;
    let mut inverse_sum = 0.0;
    let mut log_sum = 0.0;
    for &(rate, weight) in &points {
        if weight == 0 {
            continue;
        }
        let w = weight as f64;
        weighted_sum += rate * w;
        inverse_sum += w / rate;
        log_sum += w * rate.ln();
    }
    let found: u64 = samples.iter().map(|s| u64::from(s.found)).sum();

    let lowest_rate = points[0].0;
    let highest_rate = points[points.len() - 1].0;
    let range = highest_rate - lowest_rate;

    // Every mean lies within the sample range; clamping removes rounding drift.
    let arithmetic_mean = (weighted_sum / total).clamp(lowest_rate, highest_rate);
    let geometric_mean = (log_sum / total).exp().clamp(lowest_rate, highest_rate);
    let harmonic_mean = if inverse_sum > 0.0 && inverse_sum.is_finite() {
        (total / inverse_sum).clamp(lowest_rate, highest_rate)
    } else {
        0.0
    };

    // Pass 2: moments, modes, histogram and percentile ladder.
    let bin_count = config.histogram_bins.max(1);
    let (bin_width, offset) = if range > 0.0 {
        let step = range / bin_count as f64;
        (step, (lowest_rate / step).floor())
    } else {
        (0.0, 0.0)
    };
    let mut bins = vec![HistogramBin::default(); bin_count];
    let mut frequencies: Vec<(f64, u64)> = Vec::new();
    let mut mode_weight = 0u64;
    let mut ladder = FirstReached::new(SigmaLevel::ALL.map(SigmaLevel::threshold), total_weight);
    let (mut pow2, mut pow3, mut pow4) = (0.0, 0.0, 0.0);

    for &(rate, weight) in &points {
        let w = weight as f64;
        let d = rate - harmonic_mean;
        pow2 += d * d * w;
        pow3 += d * d * d * w;
        pow4 += d * d * d * d * w;

        match frequencies.last_mut() {
            Some((r, acc)) if *r == rate => *acc += weight,
            _ => frequencies.push((rate, weight)),
        }
        if let Some(&(_, acc)) = frequencies.last() {
            mode_weight = mode_weight.max(acc);
        }

        let index = if bin_width > 0.0 {
            ((rate / bin_width).floor() - offset).max(0.0) as usize
        } else {
            0
        };
        let bin = &mut bins[index.min(bin_count - 1)];
        bin.rates.push(rate);
        bin.weight += weight;

        ladder.observe(rate, weight);
    }

    let mut moving_quartiles = FirstReached::new([0.25, 0.5, 0.75], moving_weight);
    for &(rate, weight) in &moving {
        moving_quartiles.observe(rate, weight);
    }
    let [moving_spread_bottom, moving_median, moving_spread_top] = if moving_weight > 0 {
        moving_quartiles.values(highest_rate)
    } else {
        [0.0; 3]
    };

    let percentiles = PercentileLadder {
        values: ladder.values(highest_rate),
    };
    let q1 = percentiles.get(SigmaLevel::LowerQuartile);
    let median = percentiles.get(SigmaLevel::Median);
    let q3 = percentiles.get(SigmaLevel::UpperQuartile);

    let interquartile_range = q3 - q1;
    let outer_whiskers = [
        (q1 - 1.5 * interquartile_range).max(0.0),
        (q3 + 1.5 * interquartile_range).min(highest_rate),
    ];

    let modes: Vec<f64> = frequencies
        .iter()
        .filter(|&&(_, acc)| acc == mode_weight)
        .map(|&(rate, _)| rate)
        .collect();

    // Pass 3: outliers and absolute deviations.
    let mut outliers: Vec<f64> = Vec::new();
    let mut about_median = Vec::with_capacity(points.len());
    let mut about_mean = Vec::with_capacity(points.len());
    let (mut weighted_median_dev, mut weighted_mean_dev) = (0.0, 0.0);
    for &(rate, weight) in &points {
        if (rate < outer_whiskers[0] || rate > outer_whiskers[1]) && outliers.last() != Some(&rate)
        {
            outliers.push(rate);
        }
        let dev_median = (rate - median).abs();
        let dev_mean = (rate - harmonic_mean).abs();
        weighted_median_dev += dev_median * weight as f64;
        weighted_mean_dev += dev_mean * weight as f64;
        about_median.push(dev_median);
        about_mean.push(dev_mean);
    }

    let absolute_deviations = [
        [
            median_of(&mut about_median),
            weighted_median_dev / total,
            max_of(&about_median),
        ],
        [
            median_of(&mut about_mean),
            weighted_mean_dev / total,
            max_of(&about_mean),
        ],
    ];

    let variance = pow2 / total;
    let standard_deviation = variance.sqrt();
    let mad = absolute_deviations[0][0];
    let quartile_sum = q1 + q3;
    let range_sum = lowest_rate + highest_rate;
    let mid_hinge = quartile_sum / 2.0;

    let snapshot = StatSnapshot {
        total_hash_count: total_weight,
        total_entries: samples.len(),

        root_mean_square: (harmonic_mean * harmonic_mean + variance).sqrt(),
        arithmetic_mean,
        geometric_mean,
        harmonic_mean,

        moving_spread_bottom,
        moving_median,
        moving_spread_top,

        percentiles,
        interquartile_range,
        outer_whiskers,
        range,
        lowest_rate,
        highest_rate,

        mid_range: range_sum / 2.0,
        mid_hinge,
        tri_mean: (median + mid_hinge) / 2.0,

        variance,
        standard_deviation,
        absolute_deviations,
        std_mad_ratio: ratio(standard_deviation, mad),
        dispersion_coefficient: ratio(variance, median),
        variation_coefficient: 100.0 * ratio(standard_deviation, harmonic_mean),
        quartile_coefficient: 100.0 * ratio(interquartile_range, quartile_sum),
        range_coefficient: 100.0 * ratio(range, range_sum),

        skewness: ratio(pow3, pow2.powf(1.5)),
        kurtosis: if pow2 > 0.0 {
            pow4 / (pow2 * pow2) - 3.0
        } else {
            0.0
        },
        non_parametric_skew: ratio(harmonic_mean - median, standard_deviation),

        found,
        ..StatSnapshot::default()
    };

    let histogram = HistogramSummary {
        origin: offset * bin_width,
        bin_width,
        bins,
        outliers,
        modes,
        mode_weight,
    };

    log::debug!(
        "computed snapshot over {} entries, harmonic mean {:.3}",
        samples.len(),
        harmonic_mean
    );
    Some((snapshot, histogram))
}

/// Samples of the moving window, as `(rate, weight)` sorted by rate.
///
/// The window holds the most recent `moving_window_items` samples in time
/// order, or every sample within `moving_window_secs` of the newest one,
/// whichever is larger.
fn moving_window(samples: &[HashSample], config: &EngineConfig) -> Vec<(f64, u64)> {
    let mut chronological: Vec<&HashSample> = samples.iter().collect();
    chronological.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.hash_rate.total_cmp(&b.hash_rate))
    });
    let Some(newest) = chronological.last() else {
        return Vec::new();
    };

    let keep_from = chronological.len().saturating_sub(config.moving_window_items);
    let cutoff = newest.timestamp - config.moving_window_secs;
    let mut window: Vec<(f64, u64)> = chronological
        .iter()
        .enumerate()
        .filter(|(i, s)| *i >= keep_from || s.timestamp >= cutoff)
        .map(|(_, s)| (s.hash_rate, u64::from(s.hash_count)))
        .collect();
    window.sort_by(|a, b| a.0.total_cmp(&b.0));
    window
}

/// Unweighted median; sorts the slice in place.
fn median_of(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let half = n / 2;
    if n % 2 == 0 {
        (values[half - 1] + values[half]) / 2.0
    } else {
        values[half]
    }
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// `num / den`, or 0 when the denominator is zero or not finite.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() {
        0.0
    } else {
        num / den
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64, hash_rate: f64, hash_count: u32) -> HashSample {
        HashSample {
            timestamp,
            hash_rate,
            hash_count,
            ..Default::default()
        }
    }

    fn five_equal() -> Vec<HashSample> {
        (1..=5).map(|i| sample(i, 10.0 * i as f64, 5)).collect()
    }

    fn lcg_samples(n: usize) -> Vec<HashSample> {
        let mut state: u64 = 0xdeadbeef;
        (0..n)
            .map(|i| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let rate = 4000.0 + ((state >> 33) % 2000) as f64 / 2.0;
                let count = 500 + ((state >> 20) % 1000) as u32;
                sample(1_000 + 30 * i as i64, rate, count)
            })
            .collect()
    }

    fn run(samples: &[HashSample]) -> (StatSnapshot, HistogramSummary) {
        compute(samples, &EngineConfig::default()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Sigma ladder
    // -----------------------------------------------------------------------

    #[test]
    fn test_thresholds_ascend() {
        for pair in SigmaLevel::ALL.windows(2) {
            assert!(pair[0].threshold() < pair[1].threshold());
        }
    }

    #[test]
    fn test_thresholds_match_normal_tails() {
        use statrs::function::erf::erfc;
        let tail = |k: f64| erfc(k / std::f64::consts::SQRT_2);
        assert!((SigmaLevel::MinusThree.threshold() - tail(3.0)).abs() < 1e-9);
        assert!((SigmaLevel::MinusTwo.threshold() - tail(2.0)).abs() < 1e-9);
        assert!((SigmaLevel::MinusOne.threshold() - tail(1.0)).abs() < 1e-9);
        assert!((SigmaLevel::PlusOne.threshold() - (1.0 - tail(1.0))).abs() < 1e-9);
        assert!((SigmaLevel::PlusTwoAndHalf.threshold() - (1.0 - tail(2.5))).abs() < 1e-9);
    }

    #[test]
    fn test_label_round_trip() {
        for level in SigmaLevel::ALL {
            assert_eq!(SigmaLevel::from_label(level.label()), Some(level));
        }
        assert_eq!(SigmaLevel::from_label("Q2"), None);
    }

    #[test]
    fn test_ladder_serializes_as_labelled_map() {
        let (snap, _) = run(&five_equal());
        let json = serde_json::to_value(snap.percentiles).unwrap();
        assert_eq!(json["Q1"], 20.0);
        assert_eq!(json["0σ"], 30.0);
        let back: PercentileLadder = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap.percentiles);
    }

    // -----------------------------------------------------------------------
    // Degenerate input
    // -----------------------------------------------------------------------

    #[test]
    fn test_no_weight_no_snapshot() {
        assert!(compute(&[], &EngineConfig::default()).is_none());
        let zero = vec![sample(1, 100.0, 0), sample(2, 200.0, 0)];
        assert!(compute(&zero, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_constant_rate() {
        let samples: Vec<_> = (0..4).map(|i| sample(i, 250.0, 10)).collect();
        let (snap, hist) = run(&samples);
        assert_eq!(snap.range, 0.0);
        assert_eq!(snap.variance, 0.0);
        assert_eq!(snap.skewness, 0.0);
        assert_eq!(snap.kurtosis, 0.0);
        assert_eq!(snap.non_parametric_skew, 0.0);
        assert_eq!(snap.std_mad_ratio, 0.0);
        assert!((snap.harmonic_mean - 250.0).abs() < 1e-9);
        assert_eq!(hist.bin_width, 0.0);
        assert_eq!(hist.bins[0].weight, 40);
        assert_eq!(hist.bins[0].rates.len(), 4);
        assert!(hist.outliers.is_empty());
        assert_eq!(hist.modes, vec![250.0]);
    }

    // -----------------------------------------------------------------------
    // Known values
    // -----------------------------------------------------------------------

    #[test]
    fn test_five_equal_weights() {
        let (snap, _) = run(&five_equal());
        assert!((snap.arithmetic_mean - 30.0).abs() < 1e-9);
        assert_eq!(snap.median(), 30.0);
        assert_eq!(snap.percentiles.get(SigmaLevel::LowerQuartile), 20.0);
        assert_eq!(snap.percentiles.get(SigmaLevel::UpperQuartile), 40.0);
        assert_eq!(snap.range, 40.0);
        assert_eq!(snap.lowest_rate, 10.0);
        assert_eq!(snap.highest_rate, 50.0);
        assert_eq!(snap.total_hash_count, 25);
        assert_eq!(snap.total_entries, 5);
        assert_eq!(snap.interquartile_range, 20.0);
        assert_eq!(snap.mid_range, 30.0);
        assert_eq!(snap.mid_hinge, 30.0);
        assert_eq!(snap.tri_mean, 30.0);
    }

    #[test]
    fn test_means_are_ordered() {
        let (snap, _) = run(&five_equal());
        // HM <= GM <= AM for positive rates.
        assert!(snap.harmonic_mean <= snap.geometric_mean);
        assert!(snap.geometric_mean <= snap.arithmetic_mean);
        let expected_hm = 5.0 / (1.0 / 10.0 + 1.0 / 20.0 + 1.0 / 30.0 + 1.0 / 40.0 + 1.0 / 50.0);
        assert!((snap.harmonic_mean - expected_hm).abs() < 1e-9);
    }

    #[test]
    fn test_weights_shift_the_median() {
        let samples = vec![sample(1, 10.0, 1), sample(2, 20.0, 1), sample(3, 30.0, 8)];
        let (snap, _) = run(&samples);
        assert_eq!(snap.median(), 30.0);
        assert!((snap.arithmetic_mean - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_whiskers_and_outliers() {
        let mut samples: Vec<_> = (0..20).map(|i| sample(i, 100.0 + i as f64, 10)).collect();
        samples.push(sample(100, 1000.0, 10));
        let (snap, hist) = run(&samples);
        assert!(snap.outer_whiskers[0] >= 0.0);
        assert!(snap.outer_whiskers[1] <= snap.highest_rate);
        assert_eq!(hist.outliers, vec![1000.0]);
        for rate in &hist.outliers {
            assert!(*rate < snap.outer_whiskers[0] || *rate > snap.outer_whiskers[1]);
        }
    }

    #[test]
    fn test_lower_whisker_clamped_at_zero() {
        let samples = vec![sample(1, 1.0, 10), sample(2, 2.0, 10), sample(3, 100.0, 10)];
        let (snap, _) = run(&samples);
        assert_eq!(snap.outer_whiskers[0], 0.0);
        assert_eq!(snap.outer_whiskers[1], 100.0);
    }

    #[test]
    fn test_repeated_outlier_collapses() {
        let mut samples: Vec<_> = (0..20).map(|i| sample(i, 100.0, 10)).collect();
        samples.push(sample(50, 500.0, 1));
        samples.push(sample(51, 500.0, 2));
        let (_, hist) = run(&samples);
        assert_eq!(hist.outliers, vec![500.0]);
    }

    #[test]
    fn test_modes_use_accumulated_weight() {
        let samples = vec![
            sample(1, 10.0, 3),
            sample(2, 10.0, 3),
            sample(3, 20.0, 6),
            sample(4, 30.0, 5),
        ];
        let (_, hist) = run(&samples);
        assert_eq!(hist.modes, vec![10.0, 20.0]);
        assert_eq!(hist.mode_weight, 6);
    }

    #[test]
    fn test_absolute_deviation_matrix() {
        let (snap, _) = run(&five_equal());
        // About the median (30): deviations 20, 10, 0, 10, 20.
        assert_eq!(
            snap.absolute_deviation(DeviationBasis::Median, DeviationAggregate::Median),
            10.0
        );
        assert!(
            (snap.absolute_deviation(DeviationBasis::Median, DeviationAggregate::WeightedMean)
                - 12.0)
                .abs()
                < 1e-9
        );
        assert_eq!(
            snap.absolute_deviation(DeviationBasis::Median, DeviationAggregate::Max),
            20.0
        );
        let about_mean_max = snap.absolute_deviation(DeviationBasis::Mean, DeviationAggregate::Max);
        assert!((about_mean_max - (50.0 - snap.harmonic_mean)).abs() < 1e-9);
        assert!((snap.std_mad_ratio - snap.standard_deviation / 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_dispersion_measures() {
        let (snap, _) = run(&five_equal());
        assert!((snap.standard_deviation.powi(2) - snap.variance).abs() < 1e-9);
        assert!(
            (snap.root_mean_square
                - (snap.harmonic_mean.powi(2) + snap.standard_deviation.powi(2)).sqrt())
            .abs()
                < 1e-9
        );
        assert!((snap.quartile_coefficient - 100.0 * 20.0 / 60.0).abs() < 1e-9);
        assert!((snap.range_coefficient - 100.0 * 40.0 / 60.0).abs() < 1e-9);
        assert!((snap.dispersion_coefficient - snap.variance / 30.0).abs() < 1e-9);
        assert!(
            (snap.variation_coefficient - 100.0 * snap.standard_deviation / snap.harmonic_mean)
                .abs()
                < 1e-9
        );
        assert!(
            (snap.non_parametric_skew - (snap.harmonic_mean - 30.0) / snap.standard_deviation)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_found_is_summed() {
        let mut samples = five_equal();
        samples[0].found = 2;
        samples[3].found = 1;
        let (snap, _) = run(&samples);
        assert_eq!(snap.found, 3);
    }

    // -----------------------------------------------------------------------
    // Histogram
    // -----------------------------------------------------------------------

    #[test]
    fn test_histogram_conserves_weight() {
        let samples = lcg_samples(500);
        let (snap, hist) = run(&samples);
        assert_eq!(hist.bins.len(), 100);
        let binned: u64 = hist.bins.iter().map(|b| b.weight).sum();
        assert_eq!(binned, snap.total_hash_count);
        let count: usize = hist.bins.iter().map(|b| b.rates.len()).sum();
        assert_eq!(count, 500);
    }

    #[test]
    fn test_histogram_extremes_land_in_end_bins() {
        let (_, hist) = run(&five_equal());
        assert_eq!(hist.bins[0].rates, vec![10.0]);
        assert_eq!(hist.bins[99].rates, vec![50.0]);
    }

    #[test]
    fn test_histogram_bin_count_from_config() {
        let config = EngineConfig {
            histogram_bins: 10,
            ..Default::default()
        };
        let (_, hist) = compute(&lcg_samples(50), &config).unwrap();
        assert_eq!(hist.bins.len(), 10);
    }

    // -----------------------------------------------------------------------
    // Percentiles and moving window
    // -----------------------------------------------------------------------

    #[test]
    fn test_percentiles_monotonic() {
        let (snap, _) = run(&lcg_samples(1000));
        let rates: Vec<f64> = snap.percentiles.iter().map(|(_, r)| r).collect();
        for pair in rates.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(rates[0] >= snap.lowest_rate);
        assert!(rates[12] <= snap.highest_rate);
    }

    #[test]
    fn test_moving_window_small_history_uses_everything() {
        let (snap, _) = run(&five_equal());
        assert_eq!(snap.moving_spread_bottom, 20.0);
        assert_eq!(snap.moving_median, 30.0);
        assert_eq!(snap.moving_spread_top, 40.0);
    }

    #[test]
    fn test_moving_window_tracks_recent_samples() {
        // 200 old slow samples spread over a day, then 100 recent fast ones.
        let mut samples: Vec<_> = (0..200).map(|i| sample(i * 400, 100.0, 10)).collect();
        samples.extend((0..100).map(|i| sample(100_000 + i, 900.0, 10)));
        let (snap, _) = run(&samples);
        assert_eq!(snap.moving_median, 900.0);
        assert_eq!(snap.median(), 100.0);
    }

    #[test]
    fn test_moving_window_time_span_can_exceed_item_count() {
        let config = EngineConfig {
            moving_window_items: 2,
            moving_window_secs: 3600,
            ..Default::default()
        };
        let samples: Vec<_> = (0..10).map(|i| sample(i * 60, 10.0 * (i + 1) as f64, 1)).collect();
        let window = moving_window(&samples, &config);
        assert_eq!(window.len(), 10);

        let tight = EngineConfig {
            moving_window_items: 2,
            moving_window_secs: 60,
            ..Default::default()
        };
        let window = moving_window(&samples, &tight);
        assert_eq!(window, vec![(90.0, 1), (100.0, 1)]);
    }

    #[test]
    fn test_median_of_even_and_odd() {
        assert_eq!(median_of(&mut []), 0.0);
        assert_eq!(median_of(&mut [3.0]), 3.0);
        assert_eq!(median_of(&mut [4.0, 1.0]), 2.5);
        assert_eq!(median_of(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median_of(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}

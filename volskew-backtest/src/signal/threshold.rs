//! Signal thresholds.
//!
//! Two modes:
//! - Static: fixed long/short skew levels
//! - Percentile: rolling percentiles of the skew series itself
//!
//! Either way a date gets -1 when skew is below the lower bound and +1 when
//! it is above the upper bound. The two are summed, so a configuration whose
//! bounds cross fires both and nets to 0.

use serde::{Deserialize, Serialize};

/// How the lower/upper skew bounds are derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Fixed levels.
    Static {
        long_threshold: f64,
        short_threshold: f64,
    },
    /// Rolling percentiles over the last `window` dates, current included.
    Percentile {
        window: usize,
        long_pct: f64,
        short_pct: f64,
    },
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::Percentile {
            window: 20,
            long_pct: 30.0,
            short_pct: 70.0,
        }
    }
}

impl ThresholdMode {
    /// Static levels used when percentile mode is switched off.
    pub fn static_defaults() -> Self {
        Self::Static {
            long_threshold: -0.55,
            short_threshold: 0.18,
        }
    }
}

/// Lower/upper bounds in effect on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Bounds for every date of a skew series.
pub fn bounds_series(skews: &[Option<f64>], mode: &ThresholdMode) -> Vec<Bounds> {
    match *mode {
        ThresholdMode::Static {
            long_threshold,
            short_threshold,
        } => vec![
            Bounds {
                lower: Some(long_threshold),
                upper: Some(short_threshold),
            };
            skews.len()
        ],
        ThresholdMode::Percentile {
            window,
            long_pct,
            short_pct,
        } => {
            let lower = rolling_quantile(skews, window, long_pct / 100.0);
            let upper = rolling_quantile(skews, window, short_pct / 100.0);
            lower
                .into_iter()
                .zip(upper)
                .map(|(lower, upper)| Bounds { lower, upper })
                .collect()
        }
    }
}

/// Rolling quantile with a full-window requirement.
///
/// The value at `i` covers `values[i + 1 - window..=i]`. It is `None` until
/// `window` values are available and whenever the window holds a missing
/// value.
pub fn rolling_quantile(values: &[Option<f64>], window: usize, q: f64) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let mut sample = values[i + 1 - window..=i]
                .iter()
                .copied()
                .collect::<Option<Vec<f64>>>()?;
            sample.sort_by(|a, b| a.total_cmp(b));
            quantile(&sample, q)
        })
        .collect()
}

/// Linear-interpolation quantile of an ascending sample.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Discrete signal for one date: long leg (-1) plus short leg (+1).
pub fn combine(skew: Option<f64>, bounds: Bounds) -> i8 {
    let Some(skew) = skew else {
        return 0;
    };

    let long = match bounds.lower {
        Some(lower) if skew < lower => -1,
        _ => 0,
    };
    let short = match bounds.upper {
        Some(upper) if skew > upper => 1,
        _ => 0,
    };

    long + short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let sample = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sample, 0.0), Some(1.0));
        assert_eq!(quantile(&sample, 0.5), Some(3.0));
        assert_eq!(quantile(&sample, 1.0), Some(5.0));
        // pos = 0.3 * 4 = 1.2 -> 2.0 + 0.2 * 1.0
        assert!((quantile(&sample, 0.3).unwrap() - 2.2).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_rolling_quantile_warmup_and_gaps() {
        let values = vec![Some(3.0), Some(1.0), Some(2.0), None, Some(5.0), Some(4.0), Some(6.0)];
        let rolled = rolling_quantile(&values, 3, 0.5);

        assert_eq!(rolled[0], None);
        assert_eq!(rolled[1], None);
        assert_eq!(rolled[2], Some(2.0));
        // windows touching the gap
        assert_eq!(rolled[3], None);
        assert_eq!(rolled[4], None);
        assert_eq!(rolled[5], None);
        assert_eq!(rolled[6], Some(5.0));
    }

    #[test]
    fn test_static_bounds() {
        let mode = ThresholdMode::static_defaults();
        let bounds = bounds_series(&[Some(0.0), None], &mode);
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[1].lower, Some(-0.55));
        assert_eq!(bounds[1].upper, Some(0.18));
    }

    #[test]
    fn test_combine() {
        let bounds = Bounds {
            lower: Some(-0.55),
            upper: Some(0.18),
        };
        assert_eq!(combine(Some(-0.60), bounds), -1);
        assert_eq!(combine(Some(0.20), bounds), 1);
        assert_eq!(combine(Some(0.0), bounds), 0);
        assert_eq!(combine(Some(-0.55), bounds), 0);
        assert_eq!(combine(None, bounds), 0);
        assert_eq!(combine(Some(1.0), Bounds::default()), 0);
    }

    #[test]
    fn test_crossed_bounds_cancel() {
        // lower above upper: a skew between them fires both legs
        let bounds = Bounds {
            lower: Some(0.5),
            upper: Some(0.1),
        };
        assert_eq!(combine(Some(0.3), bounds), 0);
    }

    #[test]
    fn test_mode_serde() {
        let mode: ThresholdMode = toml::from_str(
            r#"
            mode = "percentile"
            window = 10
            long_pct = 25.0
            short_pct = 75.0
            "#,
        )
        .unwrap();
        assert_eq!(
            mode,
            ThresholdMode::Percentile {
                window: 10,
                long_pct: 25.0,
                short_pct: 75.0
            }
        );
    }
}

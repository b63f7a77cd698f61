//! The accept/exclude decision rule.

/// Outcome of the residual test for one probe point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Exclude,
}

/// Classifies a probe point given the device's prediction for it.
///
/// The point is an anomaly when both residuals exceed the cutoff: the
/// absolute difference and the percentage difference relative to the true
/// value. When the true value is zero the percentage residual is taken as
/// `+inf`, so the test degrades to the absolute residual alone.
///
/// Pure function of its arguments; nothing else influences the decision.
pub fn classify(predicted: f64, actual: f64, cutoff: f64) -> Decision {
    let abs_diff = (predicted - actual).abs();
    let pct_diff = if actual == 0.0 {
        f64::INFINITY
    } else {
        abs_diff / actual.abs() * 100.0
    };

    if abs_diff.min(pct_diff) > cutoff {
        Decision::Exclude
    } else {
        Decision::Accept
    }
}

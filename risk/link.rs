//! Inverse link functions shared by the calculators.
//!
//! Each function maps a linear predictor (or point total) to a probability in
//! [0, 1]. Callers scale to percentages themselves.

/// The logistic inverse link, `1 / (1 + exp(-eta))`.
pub fn logistic(eta: f64) -> f64 {
    // Clamp eta to keep exp() finite.
    let eta = eta.clamp(-700.0, 700.0);
    1.0 / (1.0 + f64::exp(-eta))
}

/// Weibull / Fine-Gray absolute risk at `horizon` years:
/// `1 - exp(-(horizon^gamma) * exp(lp))`, clamped to [0, 1].
pub fn weibull_absolute_risk(lp: f64, gamma: f64, horizon: f64) -> f64 {
    let cumulative_hazard = horizon.powf(gamma) * lp.exp();
    (1.0 - (-cumulative_hazard).exp()).clamp(0.0, 1.0)
}

/// Proportional-hazards risk from a baseline survival: `1 - s0^exp(lp)`.
pub fn survival_risk(baseline_survival: f64, lp: f64) -> f64 {
    1.0 - baseline_survival.powf(lp.exp())
}

/// Survival-curve risk for point scores: `1 - s0^exp((points - mean) / scale)`.
pub fn points_survival_risk(points: f64, baseline_survival: f64, mean: f64, scale: f64) -> f64 {
    survival_risk(baseline_survival, (points - mean) / scale)
}

/// Smallest distance kept between a base risk and 0 or 1 before recalibration.
pub const RECALIBRATION_GUARD: f64 = 1e-15;

/// Complementary log-log recalibration with linear constants `(a, b)`:
/// `x = ln(-ln(1 - p))`, `x' = a + b x`, `p' = 1 - exp(-exp(x'))`.
///
/// `p` is first clamped to `[RECALIBRATION_GUARD, 1 - RECALIBRATION_GUARD]` so
/// both logarithms stay finite.
pub fn cloglog_recalibrate(p: f64, a: f64, b: f64) -> f64 {
    let p = p.clamp(RECALIBRATION_GUARD, 1.0 - RECALIBRATION_GUARD);
    let x = (-(1.0 - p).ln()).ln();
    let x_adj = a + b * x;
    1.0 - (-x_adj.exp()).exp()
}

//! Small numeric helpers shared by the objective and the optimizer.

/// Residual sum of squares `Σ (observed_i − predicted_i)²`.
///
/// Non-finite predictions propagate into a non-finite result; the optimizer
/// treats those as infeasible.
pub fn rss(observed: &[f64], predicted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| {
            let r = o - p;
            r * r
        })
        .sum()
}

/// Mean and population standard deviation of finite entries.
///
/// Returns `None` when no entry is finite.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let (n, sum) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let var = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / n as f64;
    Some((mean, var.sqrt()))
}

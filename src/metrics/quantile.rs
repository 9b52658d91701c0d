/// Sorts the finite values ascending, dropping NaN and infinities.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Continuous percentile over already-sorted values, interpolating linearly
/// between the two closest ranks (`PERCENTILE_CONT`).
pub fn percentile_sorted(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let fraction = fraction.clamp(0.0, 1.0);
    let rank = (sorted.len() - 1) as f64 * fraction;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let low_value = sorted[lower];
    let high_value = sorted[upper];
    Some(low_value + (high_value - low_value) * (rank - lower as f64))
}

pub fn percentile(values: &[f64], fraction: f64) -> Option<f64> {
    percentile_sorted(&sorted_finite(values), fraction)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); undefined below two points.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squared = values
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>();
    Some((squared / (values.len() - 1) as f64).sqrt())
}

//! Time-domain HRV measures over a cleaned RR series.
//!
//! All functions return 0.0 when the series has fewer than two values, so
//! a short window degrades to neutral features instead of failing.

/// Arithmetic mean of the RR series, milliseconds.
pub fn mean_rr(rr: &[f64]) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    rr.iter().sum::<f64>() / rr.len() as f64
}

/// Root mean square of successive differences.
pub fn rmssd(rr: &[f64]) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    (sum_sq / (rr.len() - 1) as f64).sqrt()
}

/// Sample standard deviation of the RR series (divisor N−1).
pub fn sdnn(rr: &[f64]) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    let mean = rr.iter().sum::<f64>() / rr.len() as f64;
    let variance = rr.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (rr.len() - 1) as f64;
    variance.sqrt()
}

/// Percentage of successive differences exceeding 50 ms.
pub fn pnn50(rr: &[f64]) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    let over = rr.windows(2).filter(|w| (w[1] - w[0]).abs() > 50.0).count();
    100.0 * over as f64 / (rr.len() - 1) as f64
}

/// Mean of the raw HR samples; 0.0 on an empty series.
pub fn hr_mean(hr: &[f64]) -> f64 {
    if hr.is_empty() {
        return 0.0;
    }
    hr.iter().sum::<f64>() / hr.len() as f64
}

//! Frequency-domain HRV measures.
//!
//! The RR series is an unevenly sampled signal (each value is both a datum
//! and the time step to the next one), so it is first interpolated onto a
//! uniform 4 Hz grid, Hann-windowed in a single segment, and transformed
//! with a direct discrete Fourier transform. Window lengths here are tens
//! of seconds at 4 Hz, small enough for the O(n²) DFT.

use std::f64::consts::PI;

/// Uniform resampling rate for the RR tachogram.
pub const RESAMPLE_HZ: f64 = 4.0;

const MIN_RAW_RR: usize = 10;
const MIN_RESAMPLED: usize = 16;

const VLF_BAND: (f64, f64) = (0.0033, 0.04);
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Integrated band powers and their derived ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectralPowers {
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    pub total_power: f64,
    pub lf_nu: f64,
    pub hf_nu: f64,
    pub lf_hf_ratio: f64,
}

/// Computes band powers from the raw RR series. Series too short for a
/// stable estimate yield all-zero powers rather than an error.
pub fn spectral_powers(rr_ms: &[f64]) -> SpectralPowers {
    if rr_ms.len() < MIN_RAW_RR {
        return SpectralPowers::default();
    }

    let resampled = resample_uniform(rr_ms, RESAMPLE_HZ);
    if resampled.len() < MIN_RESAMPLED {
        return SpectralPowers::default();
    }

    let windowed = apply_hann(&resampled);
    let psd = power_spectrum(&windowed);

    let n = windowed.len();
    let freq_resolution = RESAMPLE_HZ / (2.0 * n as f64);
    let bin_hz = RESAMPLE_HZ / n as f64;

    let band_power = |band: (f64, f64)| -> f64 {
        psd.iter()
            .enumerate()
            .filter(|(k, _)| {
                let f = *k as f64 * bin_hz;
                f >= band.0 && f < band.1
            })
            .map(|(_, p)| p)
            .sum::<f64>()
            * freq_resolution
    };

    let vlf = band_power(VLF_BAND);
    let lf = band_power(LF_BAND);
    let hf = band_power(HF_BAND);

    let lf_plus_hf = lf + hf;
    SpectralPowers {
        vlf,
        lf,
        hf,
        total_power: vlf + lf + hf,
        lf_nu: if lf_plus_hf > 0.0 { lf / lf_plus_hf } else { 0.0 },
        hf_nu: if lf_plus_hf > 0.0 { hf / lf_plus_hf } else { 0.0 },
        lf_hf_ratio: if hf > 0.0 { lf / hf } else { 0.0 },
    }
}

/// Linear interpolation of the RR tachogram onto a uniform grid.
///
/// The time axis is the cumulative sum of the RR durations, so each beat
/// sits at the instant it was observed.
fn resample_uniform(rr_ms: &[f64], rate_hz: f64) -> Vec<f64> {
    let mut times = Vec::with_capacity(rr_ms.len());
    let mut t = 0.0;
    for rr in rr_ms {
        t += rr / 1000.0;
        times.push(t);
    }

    let start = times[0];
    let end = times[times.len() - 1];
    let step = 1.0 / rate_hz;
    let count = ((end - start) / step).floor() as usize + 1;

    let mut resampled = Vec::with_capacity(count);
    let mut knot = 0usize;
    for i in 0..count {
        let target = start + i as f64 * step;
        while knot + 1 < times.len() - 1 && times[knot + 1] < target {
            knot += 1;
        }
        let (t0, t1) = (times[knot], times[knot + 1]);
        let (v0, v1) = (rr_ms[knot], rr_ms[knot + 1]);
        let value = if t1 > t0 {
            let frac = ((target - t0) / (t1 - t0)).clamp(0.0, 1.0);
            v0 + (v1 - v0) * frac
        } else {
            v0
        };
        resampled.push(value);
    }
    resampled
}

fn apply_hann(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    signal
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let w = 0.5 * (1.0 - (2.0 * PI * i as f64 / (n - 1) as f64).cos());
            v * w
        })
        .collect()
}

/// Direct O(n²) DFT power spectrum: `psd[k] = (Re² + Im²) / n` for
/// k in [0, n/2).
fn power_spectrum(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let mut psd = Vec::with_capacity(n / 2);
    for k in 0..n / 2 {
        let mut re = 0.0;
        let mut im = 0.0;
        for (j, v) in signal.iter().enumerate() {
            let angle = 2.0 * PI * k as f64 * j as f64 / n as f64;
            re += v * angle.cos();
            im -= v * angle.sin();
        }
        psd.push((re * re + im * im) / n as f64);
    }
    psd
}

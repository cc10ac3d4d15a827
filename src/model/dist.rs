//! Normal distribution helpers and survival-curve summaries

use std::f64::consts::{PI, SQRT_2};

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal density
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Approximation of the error function (Abramowitz & Stegun 7.1.26,
/// absolute error below 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9). `p` must lie strictly inside (0, 1).
pub fn norm_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -norm_ppf(1.0 - p)
    }
}

/// Force a survival curve to be non-increasing across lines
pub fn monotone_survival(mut survival: Vec<f64>) -> Vec<f64> {
    for j in 1..survival.len() {
        if survival[j] > survival[j - 1] {
            survival[j] = survival[j - 1];
        }
    }
    survival
}

/// P(value > line), interpolated between the tracked lines and clamped at
/// the ends
pub fn survival_at(lines: &[f64], survival: &[f64], line: f64) -> f64 {
    let n = lines.len();
    if n == 0 {
        return 0.5;
    }
    if line <= lines[0] {
        return survival[0];
    }
    if line >= lines[n - 1] {
        return survival[n - 1];
    }
    let j = lines.partition_point(|l| *l <= line);
    let (l0, l1) = (lines[j - 1], lines[j]);
    let w = (line - l0) / (l1 - l0);
    survival[j - 1] + w * (survival[j] - survival[j - 1])
}

/// Value below which a fraction `q` of the distribution lies
pub fn quantile(lines: &[f64], survival: &[f64], q: f64) -> f64 {
    let n = lines.len();
    if n == 0 {
        return 0.0;
    }
    let cdf: Vec<f64> = survival.iter().map(|s| 1.0 - s).collect();
    if q <= cdf[0] {
        return lines[0];
    }
    if q >= cdf[n - 1] {
        return lines[n - 1];
    }
    let j = cdf.partition_point(|c| *c < q);
    let (c0, c1) = (cdf[j - 1], cdf[j]);
    if c1 <= c0 {
        return lines[j];
    }
    lines[j - 1] + (q - c0) / (c1 - c0) * (lines[j] - lines[j - 1])
}

/// Expected value, placing each bin's mass at its midpoint and the tails on
/// the outermost lines
pub fn mean(lines: &[f64], survival: &[f64]) -> f64 {
    let n = lines.len();
    if n == 0 {
        return 0.0;
    }
    let mut total = lines[0] * (1.0 - survival[0]);
    for j in 0..n - 1 {
        let mass = survival[j] - survival[j + 1];
        total += mass * 0.5 * (lines[j] + lines[j + 1]);
    }
    total + lines[n - 1] * survival[n - 1]
}

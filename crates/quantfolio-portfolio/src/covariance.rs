//! Covariance estimation with Ledoit-Wolf shrinkage.
//!
//! The raw sample covariance is numerically unstable when the asset count
//! approaches the observation count; shrinking toward a scaled identity
//! target with a data-driven intensity keeps the matrix well-conditioned
//! and positive semi-definite.

use nalgebra::DMatrix;

use crate::returns::TRADING_DAYS_PER_YEAR;

/// Annualized sample covariance of daily returns (population normalization).
pub fn sample_covariance(returns: &DMatrix<f64>) -> DMatrix<f64> {
    let t = returns.nrows() as f64;
    let demeaned = demean(returns);
    (demeaned.transpose() * &demeaned) / t * TRADING_DAYS_PER_YEAR
}

/// Ledoit-Wolf shrinkage toward the scaled identity target.
///
/// Returns the annualized estimator and the shrinkage intensity in [0, 1].
pub fn ledoit_wolf(returns: &DMatrix<f64>) -> (DMatrix<f64>, f64) {
    let t = returns.nrows();
    let n = returns.ncols();
    let t_f = t as f64;
    let n_f = n as f64;

    let demeaned = demean(returns);
    let sample = (demeaned.transpose() * &demeaned) / t_f;

    // Target: mu * I with mu the average sample variance.
    let mu = sample.trace() / n_f;

    // Squared distance between the sample and the target.
    let mut d2 = 0.0;
    for i in 0..n {
        for j in 0..n {
            let target = if i == j { mu } else { 0.0 };
            d2 += (sample[(i, j)] - target).powi(2);
        }
    }
    d2 /= n_f;

    if d2 <= f64::EPSILON {
        // Sample already equals the target; nothing to shrink.
        let annualized = sample * TRADING_DAYS_PER_YEAR;
        return (annualized, 0.0);
    }

    // Average squared distance of single-observation outer products from
    // the sample, capped by d2.
    let mut b2_bar = 0.0;
    for row in 0..t {
        let x = demeaned.row(row);
        for i in 0..n {
            for j in 0..n {
                b2_bar += (x[i] * x[j] - sample[(i, j)]).powi(2);
            }
        }
    }
    b2_bar /= t_f * t_f * n_f;
    let b2 = b2_bar.min(d2);

    let intensity = b2 / d2;
    let mut shrunk = sample * (1.0 - intensity);
    for i in 0..n {
        shrunk[(i, i)] += intensity * mu;
    }

    (shrunk * TRADING_DAYS_PER_YEAR, intensity)
}

fn demean(returns: &DMatrix<f64>) -> DMatrix<f64> {
    let mut demeaned = returns.clone();
    for mut col in demeaned.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }
    demeaned
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise so tests need no RNG dependency.
    fn noisy_returns(t: usize, n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(t, n, |row, col| {
            let phase = (row * (col + 3) + col * 7) as f64;
            0.001 * (phase * 0.37).sin() + 0.0005 * ((phase + 1.0) * 0.11).cos()
        })
    }

    #[test]
    fn shrinkage_intensity_is_bounded() {
        let returns = noisy_returns(300, 4);
        let (_, intensity) = ledoit_wolf(&returns);
        assert!((0.0..=1.0).contains(&intensity));
    }

    #[test]
    fn estimator_is_symmetric() {
        let returns = noisy_returns(300, 4);
        let (cov, _) = ledoit_wolf(&returns);
        for i in 0..4 {
            for j in 0..4 {
                assert!((cov[(i, j)] - cov[(j, i)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn diagonal_moves_toward_average_variance() {
        let returns = noisy_returns(300, 4);
        let sample = sample_covariance(&returns);
        let (shrunk, intensity) = ledoit_wolf(&returns);
        assert!(intensity > 0.0);

        // Shrinking pulls extreme variances toward the common mean.
        let sample_spread = diag_spread(&sample);
        let shrunk_spread = diag_spread(&shrunk);
        assert!(shrunk_spread <= sample_spread + 1e-12);
    }

    #[test]
    fn constant_returns_need_no_shrinkage() {
        let returns = DMatrix::from_element(260, 3, 0.001);
        let (cov, intensity) = ledoit_wolf(&returns);
        assert_eq!(intensity, 0.0);
        assert!(cov.iter().all(|v| v.abs() < 1e-15));
    }

    fn diag_spread(m: &DMatrix<f64>) -> f64 {
        let diag: Vec<f64> = (0..m.nrows()).map(|i| m[(i, i)]).collect();
        let max = diag.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = diag.iter().copied().fold(f64::INFINITY, f64::min);
        max - min
    }
}

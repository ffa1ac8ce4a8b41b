//! Fit of the low-dimensional similarity curve `1 / (1 + a d^(2b))`

use windclass_core::{Error, Result};

const N_POINTS: usize = 300;
const MAX_ITER: usize = 500;

/// Curve parameters `(a, b)` approximating an offset exponential decay
///
/// The target is 1 below `min_dist` and `exp(-(d - min_dist) / spread)`
/// beyond it, sampled on `[0, 3 * spread]`. Fitted by Levenberg-Marquardt
/// least squares from `(1, 1)`.
pub fn find_ab_params(spread: f64, min_dist: f64) -> Result<(f64, f64)> {
    if spread <= 0.0 || min_dist < 0.0 || min_dist > spread {
        return Err(Error::InvalidParameter(format!(
            "need 0 <= min_dist <= spread, got min_dist {min_dist} and spread {spread}"
        )));
    }

    let xs: Vec<f64> = (0..N_POINTS)
        .map(|i| 3.0 * spread * i as f64 / (N_POINTS - 1) as f64)
        .collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();

    let cost = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| (curve(x, a, b) - y).powi(2))
            .sum()
    };

    let (mut a, mut b) = (1.0, 1.0);
    let mut current = cost(a, b);
    let mut lambda = 1e-3;

    for _ in 0..MAX_ITER {
        let mut jtj = [[0.0; 2]; 2];
        let mut jtr = [0.0; 2];
        for (&x, &y) in xs.iter().zip(&ys) {
            let u = if x > 0.0 { x.powf(2.0 * b) } else { 0.0 };
            let f = 1.0 / (1.0 + a * u);
            let r = f - y;
            let da = -u * f * f;
            let db = if x > 0.0 {
                -2.0 * a * u * x.ln() * f * f
            } else {
                0.0
            };
            let jac = [da, db];
            for i in 0..2 {
                jtr[i] += jac[i] * r;
                for j in 0..2 {
                    jtj[i][j] += jac[i] * jac[j];
                }
            }
        }

        let mut improved = false;
        while lambda < 1e12 {
            let m00 = jtj[0][0] * (1.0 + lambda);
            let m11 = jtj[1][1] * (1.0 + lambda);
            let det = m00 * m11 - jtj[0][1] * jtj[1][0];
            if det.abs() > f64::MIN_POSITIVE {
                let step_a = -(m11 * jtr[0] - jtj[0][1] * jtr[1]) / det;
                let step_b = -(m00 * jtr[1] - jtj[1][0] * jtr[0]) / det;
                let (na, nb) = (a + step_a, b + step_b);
                if na > 0.0 && nb > 0.0 {
                    let next = cost(na, nb);
                    if next < current {
                        let change = current - next;
                        a = na;
                        b = nb;
                        current = next;
                        lambda = (lambda / 10.0).max(1e-12);
                        improved = change > 1e-15 * current.max(1e-300);
                        break;
                    }
                }
            }
            lambda *= 10.0;
        }
        if !improved {
            break;
        }
    }

    if !(a.is_finite() && b.is_finite()) {
        return Err(Error::Computation(
            "curve fit for embedding similarity diverged".to_string(),
        ));
    }
    Ok((a, b))
}

#[inline]
fn curve(x: f64, a: f64, b: f64) -> f64 {
    1.0 / (1.0 + a * x.powf(2.0 * b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_parameters() {
        let (a, b) = find_ab_params(1.0, 0.1).unwrap();
        assert_relative_eq!(a, 1.577, epsilon = 5e-3);
        assert_relative_eq!(b, 0.895, epsilon = 5e-3);
    }

    #[test]
    fn test_tight_spread() {
        let (a, b) = find_ab_params(0.5, 0.0).unwrap();
        assert_relative_eq!(a, 5.782, epsilon = 2e-2);
        assert_relative_eq!(b, 0.790, epsilon = 5e-3);
    }

    #[test]
    fn test_invalid() {
        assert!(find_ab_params(0.0, 0.0).is_err());
        assert!(find_ab_params(1.0, 2.0).is_err());
    }
}

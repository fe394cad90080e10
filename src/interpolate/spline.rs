// src/interpolate/spline.rs

use super::densify_partitions;
use crate::error::{EngineError, Result};
use crate::table::{GroupKey, Observation, Table};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument};

/// End condition of the cubic spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplineMethod {
    /// Zero second derivative at both ends.
    Natural,
    /// Forsythe, Malcolm & Moler: the end third derivatives match those of the
    /// cubic through the four outermost points. Exact for cubic data.
    #[default]
    Fmm,
}

impl FromStr for SplineMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "natural" => Ok(SplineMethod::Natural),
            "fmm" => Ok(SplineMethod::Fmm),
            other => Err(EngineError::Configuration(format!(
                "unknown spline method `{}` (expected natural or fmm)",
                other
            ))),
        }
    }
}

/// Interpolating cubic spline stored as knot values plus second derivatives.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit through `points`, which must be sorted by strictly increasing x.
    /// Returns `None` for fewer than two points. Two points give a line.
    pub fn fit(points: &[(f64, f64)], method: SplineMethod) -> Option<Self> {
        let n = points.len();
        if n < 2 {
            return None;
        }
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        if n == 2 {
            return Some(Self { xs, ys, m: vec![0.0; 2] });
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        for i in 1..n - 1 {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];
            rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }

        match method {
            SplineMethod::Natural => {
                diag[0] = 1.0;
                diag[n - 1] = 1.0;
            }
            SplineMethod::Fmm => {
                let (h0, hn) = (h[0], h[n - 2]);
                diag[0] = -h0;
                upper[0] = h0;
                lower[n - 1] = hn;
                diag[n - 1] = -hn;
                // with three points both conditions are zero and the fit is a parabola
                if n >= 4 {
                    rhs[0] = 6.0 * h0 * h0 * divided_difference(&xs[..4], &ys[..4]);
                    rhs[n - 1] =
                        -6.0 * hn * hn * divided_difference(&xs[n - 4..], &ys[n - 4..]);
                }
            }
        }

        let m = solve_tridiagonal(&lower, &diag, &upper, &rhs);
        Some(Self { xs, ys, m })
    }

    /// Evaluate inside the fitted range. Knots return their observed value
    /// exactly; x outside the range is clamped to the nearest end segment.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let idx = self.xs.partition_point(|k| *k < x);
        if idx < n && self.xs[idx] == x {
            return self.ys[idx];
        }
        let i = idx.clamp(1, n - 1) - 1;
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - x, x - x0);
        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Newton divided difference f[x0, ..., xk].
fn divided_difference(xs: &[f64], ys: &[f64]) -> f64 {
    let mut table = ys.to_vec();
    for level in 1..xs.len() {
        for i in 0..xs.len() - level {
            table[i] = (table[i + 1] - table[i]) / (xs[i + level] - xs[i]);
        }
    }
    table[0]
}

/// Thomas algorithm. `lower[0]` and `upper[n-1]` are ignored.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];
    c[0] = upper[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - lower[i] * c[i - 1];
        if i < n - 1 {
            c[i] = upper[i] / denom;
        }
        d[i] = (rhs[i] - lower[i] * d[i - 1]) / denom;
    }
    let mut x = vec![0.0; n];
    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
    x
}

/// Annual values from the first to the last of `points` (sorted, ≥2).
pub(crate) fn densify(points: &[(i32, f64)], method: SplineMethod) -> Vec<(i32, f64)> {
    let knots: Vec<(f64, f64)> = points.iter().map(|(y, v)| (f64::from(*y), *v)).collect();
    let Some(spline) = CubicSpline::fit(&knots, method) else {
        return points.to_vec();
    };
    let (first, last) = (points[0].0, points[points.len() - 1].0);
    (first..=last)
        .map(|year| (year, spline.eval(f64::from(year))))
        .collect()
}

/// Densify every partition of `table` (grouped by `key`) with a cubic spline.
#[instrument(level = "info", skip(table, key), fields(rows = table.len()))]
pub fn interpolate_spline<R>(table: &Table<R>, key: &GroupKey, method: SplineMethod) -> Result<Table<R>>
where
    R: Observation + Clone + Send + Sync,
{
    let out = densify_partitions(table, key, |_, points| densify(points, method))?;
    info!(rows_in = table.len(), rows_out = out.len(), ?method, "spline interpolation done");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::test_support::{series, values_of};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn two_points_degenerate_to_a_line() -> anyhow::Result<()> {
        let table = Table::new(series("GDP|PPP", &[(2020, 100.0), (2030, 200.0)]));
        let out = interpolate_spline(&table, &GroupKey::default(), SplineMethod::default())?;
        let vals = values_of(&out, "GDP|PPP");
        assert_eq!(vals.len(), 11);
        assert!(close(vals[5].1, 150.0));
        assert_eq!(vals[0], (2020, 100.0));
        assert_eq!(vals[10], (2030, 200.0));
        Ok(())
    }

    #[test]
    fn observed_values_are_preserved_and_years_dense() -> anyhow::Result<()> {
        let obs = [(2010, 5.0), (2015, 9.0), (2020, 4.0), (2030, 12.0), (2040, 11.0)];
        let table = Table::new(series("GDP|PPP", &obs));
        for method in [SplineMethod::Natural, SplineMethod::Fmm] {
            let out = interpolate_spline(&table, &GroupKey::default(), method)?;
            let vals = values_of(&out, "GDP|PPP");
            let years: Vec<i32> = vals.iter().map(|v| v.0).collect();
            assert_eq!(years, (2010..=2040).collect::<Vec<_>>());
            for (y, v) in obs {
                assert_eq!(vals[(y - 2010) as usize].1, v);
            }
        }
        Ok(())
    }

    #[test]
    fn fmm_reproduces_cubic_data() {
        let p = |x: f64| 0.5 * x.powi(3) - 2.0 * x * x + x + 7.0;
        let knots: Vec<(f64, f64)> = [0.0, 1.0, 3.0, 4.0, 7.0].iter().map(|x| (*x, p(*x))).collect();
        let s = CubicSpline::fit(&knots, SplineMethod::Fmm).unwrap();
        for x in [0.5, 2.0, 3.3, 5.5, 6.9] {
            assert!(close(s.eval(x), p(x)), "x={} got {} want {}", x, s.eval(x), p(x));
        }
    }

    #[test]
    fn natural_spline_keeps_linear_data_linear() {
        let knots: Vec<(f64, f64)> = (0..5).map(|i| (i as f64 * 5.0, 3.0 * i as f64 * 5.0 + 1.0)).collect();
        let s = CubicSpline::fit(&knots, SplineMethod::Natural).unwrap();
        assert!(close(s.eval(7.0), 22.0));
        assert!(close(s.eval(18.0), 55.0));
    }

    #[test]
    fn dense_input_is_returned_unchanged() -> anyhow::Result<()> {
        let obs: Vec<(i32, f64)> = (2020..2026).map(|y| (y, (y - 2000) as f64 * 1.7)).collect();
        let table = Table::new(series("GDP|PPP", &obs));
        let out = interpolate_spline(&table, &GroupKey::default(), SplineMethod::Fmm)?;
        assert_eq!(out, table);
        Ok(())
    }

    #[test]
    fn single_point_passes_through() -> anyhow::Result<()> {
        let table = Table::new(series("GDP|PPP", &[(2050, 3.0)]));
        let out = interpolate_spline(&table, &GroupKey::default(), SplineMethod::Fmm)?;
        assert_eq!(out, table);
        Ok(())
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("FMM".parse::<SplineMethod>().unwrap(), SplineMethod::Fmm);
        assert_eq!("natural".parse::<SplineMethod>().unwrap(), SplineMethod::Natural);
        assert!("akima".parse::<SplineMethod>().is_err());
    }
}

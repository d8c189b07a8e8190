use serde::Serialize;

use crate::dataset::Dataset;
use crate::model::Variable;

/// Pearson correlation between two equally-sized samples.
///
/// Returns 0.0 when either sample has zero variance, and NaN on a length
/// mismatch or empty input.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return f64::NAN;
    }

    let n = x.len() as f64;
    let mean_x: f64 = x.iter().sum::<f64>() / n;
    let mean_y: f64 = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator.abs() < 1e-10 {
        0.0
    } else {
        cov / denominator
    }
}

/// Correlation between one pair of variables.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEntry {
    pub left: Variable,
    pub right: Variable,
    pub coefficient: f64,
}

impl CorrelationEntry {
    /// Human-readable form, coefficient to two decimal places.
    pub fn sentence(&self) -> String {
        format!(
            "Correlation between {} and {}: {:.2}",
            self.left.label(),
            self.right.label(),
            self.coefficient
        )
    }
}

/// Pearson coefficients for every variable pair of the dataset.
pub fn correlation_report(dataset: &Dataset) -> Vec<CorrelationEntry> {
    Variable::pairs()
        .iter()
        .map(|&(left, right)| {
            let xs = dataset.series(left);
            let ys = dataset.series(right);

            CorrelationEntry {
                left,
                right,
                coefficient: pearson(xs.values(), ys.values()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_with_itself_is_one() {
        let xs = [14.0, 15.5, 13.2, 18.9, 21.0];
        assert!((pearson(&xs, &xs) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_is_symmetric() {
        let xs = [14.0, 15.5, 13.2, 18.9, 21.0];
        let ys = [82.0, 78.5, 85.1, 60.0, 55.2];
        assert_eq!(pearson(&xs, &ys), pearson(&ys, &xs));
    }

    #[test]
    fn perfectly_anticorrelated_samples() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&xs, &ys) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_yields_zero() {
        let xs = [5.0, 5.0, 5.0];
        let ys = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&xs, &ys), 0.0);
    }

    #[test]
    fn length_mismatch_yields_nan() {
        assert!(pearson(&[1.0, 2.0], &[1.0]).is_nan());
        assert!(pearson(&[], &[]).is_nan());
    }

    #[test]
    fn report_covers_all_pairs() {
        let body = "Time,Temperature (C),Relative Humidity (%),Wind Speed (m/s)\n\
                    2019-01-01 00:00:00,14.0,82.0,2.1\n\
                    2019-01-02 00:00:00,15.0,78.0,2.5\n\
                    2019-01-03 00:00:00,16.0,70.0,3.0\n";
        let dataset = Dataset::from_reader(body.as_bytes()).unwrap();

        let report = correlation_report(&dataset);
        assert_eq!(report.len(), 3);
        for entry in &report {
            assert!(entry.coefficient.abs() <= 1.0 + 1e-12);
        }

        let sentence = report[0].sentence();
        assert!(sentence.starts_with("Correlation between Temperature and Relative Humidity:"));
    }
}

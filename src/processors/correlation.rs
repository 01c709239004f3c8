use crate::error::{ProcessingError, Result};
use crate::models::{CorrelationMatrix, MetVariable};

/// Sample Pearson correlation of two equal-length series.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len();
    if n < 2 || b.len() != n {
        return None;
    }

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }

    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Full correlation matrix over co-filtered series.
///
/// The diagonal is exactly 1.0 and only the upper triangle is computed, so
/// the result is symmetric by construction.
pub fn correlation_matrix(series: &[(MetVariable, Vec<f64>)]) -> Result<CorrelationMatrix> {
    let n = series.len();
    let variables: Vec<MetVariable> = series.iter().map(|(v, _)| *v).collect();

    let points = series.first().map(|(_, values)| values.len()).unwrap_or(0);
    if let Some((variable, values)) = series.iter().find(|(_, values)| values.len() != points) {
        return Err(ProcessingError::InvalidFormat(format!(
            "Series for {} has {} points, expected {}",
            variable,
            values.len(),
            points
        )));
    }
    if points < 2 {
        return Err(ProcessingError::InsufficientData {
            points,
            context: "correlation needs at least 2 points".to_string(),
        });
    }

    for (variable, values) in series {
        if has_zero_variance(values) {
            return Err(ProcessingError::DegenerateSeries {
                variable: variable.to_string(),
            });
        }
    }

    let mut matrix = CorrelationMatrix::undefined(variables);
    for i in 0..n {
        matrix.set(i, i, Some(1.0));
        for j in (i + 1)..n {
            let r = pearson(&series[i].1, &series[j].1);
            matrix.set(i, j, r);
            matrix.set(j, i, r);
        }
    }

    Ok(matrix)
}

fn has_zero_variance(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::MATRIX_TOLERANCE;

    fn series(values: &[(MetVariable, &[f64])]) -> Vec<(MetVariable, Vec<f64>)> {
        values.iter().map(|(v, s)| (*v, s.to_vec())).collect()
    }

    #[test]
    fn test_perfect_correlations() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let c = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_properties() {
        let input = series(&[
            (MetVariable::AtmosPressure, &[1.0, 3.0, 2.0, 5.0, 4.0]),
            (MetVariable::TempMean, &[0.5, 0.1, 0.9, 0.3, 0.7]),
            (MetVariable::RhMean, &[10.0, 30.0, 25.0, 45.0, 41.0]),
        ]);
        let matrix = correlation_matrix(&input).unwrap();

        assert_eq!(matrix.size(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), Some(1.0));
            for j in 0..3 {
                let r = matrix.get(i, j).unwrap();
                assert!((-1.0..=1.0).contains(&r));
            }
        }
        assert!(matrix.is_symmetric(MATRIX_TOLERANCE));
        assert!(matrix.between(MetVariable::AtmosPressure, MetVariable::RhMean).unwrap() > 0.9);
    }

    #[test]
    fn test_too_few_points() {
        let input = series(&[
            (MetVariable::AtmosPressure, &[1.0]),
            (MetVariable::TempMean, &[2.0]),
        ]);
        assert!(matches!(
            correlation_matrix(&input),
            Err(ProcessingError::InsufficientData { points: 1, .. })
        ));
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let input = series(&[
            (MetVariable::AtmosPressure, &[1.0, 2.0, 3.0]),
            (MetVariable::WspdArithMean, &[0.0, 0.0, 0.0]),
        ]);
        match correlation_matrix(&input) {
            Err(ProcessingError::DegenerateSeries { variable }) => {
                assert_eq!(variable, "wspd_arith_mean")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_length_mismatch() {
        let input = series(&[
            (MetVariable::AtmosPressure, &[1.0, 2.0, 3.0]),
            (MetVariable::TempMean, &[1.0, 2.0]),
        ]);
        assert!(matches!(
            correlation_matrix(&input),
            Err(ProcessingError::InvalidFormat(_))
        ));
    }
}

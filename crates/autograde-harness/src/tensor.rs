use ndarray::{Array, ArrayD, ShapeBuilder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::Fault;

pub const ATOL: f32 = 1e-3;
pub const RTOL: f32 = 1e-3;

/// Generator for one trial. Same index, same numbers, on every platform.
pub fn trial_rng(trial: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(trial)
}

/// Standard normal `f32` values in the given shape.
pub fn normal_array<Sh: ShapeBuilder>(rng: &mut ChaCha8Rng, shape: Sh) -> Array<f32, Sh::Dim> {
    Array::from_shape_simple_fn(shape, || rng.sample::<f32, _>(StandardNormal))
}

fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &dim) in index.iter_mut().zip(shape).rev() {
        if dim == 0 {
            continue;
        }
        *slot = flat % dim;
        flat /= dim;
    }
    index
}

/// Elementwise `|actual - expected| <= atol + rtol * |expected|`, after an
/// exact shape check. NaN never compares close.
pub fn assert_close(
    actual: &ArrayD<f32>,
    expected: &ArrayD<f32>,
    atol: f32,
    rtol: f32,
) -> Result<(), Fault> {
    if actual.shape() != expected.shape() {
        return Err(Fault::ShapeMismatch {
            expected: expected.shape().to_vec(),
            actual: actual.shape().to_vec(),
        });
    }

    let mut mismatched = 0;
    let mut worst: Option<(usize, f32)> = None;

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        if a == e {
            continue;
        }
        let diff = (a - e).abs();
        if diff <= atol + rtol * e.abs() {
            continue;
        }
        mismatched += 1;
        let is_worse = match worst {
            None => true,
            Some((_, d)) => diff > d || diff.is_nan(),
        };
        if is_worse {
            worst = Some((i, diff));
        }
    }

    match worst {
        None => Ok(()),
        Some((flat, max_abs_diff)) => Err(Fault::ValueMismatch {
            mismatched,
            total: expected.len(),
            max_abs_diff,
            index: unravel(flat, expected.shape()),
            atol,
            rtol,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array3};

    #[test]
    fn test_same_seed_same_values() {
        let a: Array3<f32> = normal_array(&mut trial_rng(1), [2, 3, 4]);
        let b: Array3<f32> = normal_array(&mut trial_rng(1), [2, 3, 4]);
        let c: Array3<f32> = normal_array(&mut trial_rng(2), [2, 3, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_close_within_tolerance() {
        let expected = arr1(&[1.0f32, -2.0, 100.0]).into_dyn();
        let actual = arr1(&[1.0005f32, -2.0009, 100.05]).into_dyn();
        assert!(assert_close(&actual, &expected, ATOL, RTOL).is_ok());
    }

    #[test]
    fn test_reports_worst_element() {
        let expected = ArrayD::<f32>::zeros(vec![2, 2]);
        let mut actual = expected.clone();
        actual[[0, 1]] = 0.5;
        actual[[1, 0]] = 2.0;

        match assert_close(&actual, &expected, ATOL, RTOL) {
            Err(Fault::ValueMismatch {
                mismatched,
                total,
                index,
                max_abs_diff,
                ..
            }) => {
                assert_eq!(mismatched, 2);
                assert_eq!(total, 4);
                assert_eq!(index, vec![1, 0]);
                assert_eq!(max_abs_diff, 2.0);
            }
            other => panic!("expected value mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let expected = ArrayD::<f32>::zeros(vec![5, 5, 6]);
        let actual = ArrayD::<f32>::zeros(vec![3, 5]);
        let err = assert_close(&actual, &expected, ATOL, RTOL).unwrap_err();
        assert!(err.to_string().contains("expected [5, 5, 6], got [3, 5]"));
    }

    #[test]
    fn test_nan_is_never_close() {
        let expected = arr1(&[f32::NAN]).into_dyn();
        let actual = arr1(&[f32::NAN]).into_dyn();
        assert!(assert_close(&actual, &expected, ATOL, RTOL).is_err());
    }
}

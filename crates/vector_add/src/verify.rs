//! Host-side reference computation for checking kernel output.

use crate::buffer::Element;

/// Relative tolerance used by [`allclose`] callers that have no better choice.
pub const DEFAULT_RTOL: f64 = 1e-5;
/// Absolute tolerance used by [`allclose`] callers that have no better choice.
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Element-wise `x + y`, computed serially on the host.
pub fn reference_add<T: Element>(x: &[T], y: &[T]) -> Vec<T> {
    x.iter().zip(y).map(|(&a, &b)| a + b).collect()
}

/// The first index where `actual` and `expected` differ by more than
/// `atol + rtol * |expected|`, or where their lengths stop matching.
pub fn first_mismatch<T: Element>(
    actual: &[T],
    expected: &[T],
    rtol: f64,
    atol: f64,
) -> Option<usize> {
    if actual.len() != expected.len() {
        return Some(actual.len().min(expected.len()));
    }
    actual.iter().zip(expected).position(|(&a, &b)| {
        let (a, b) = (a.to_f64(), b.to_f64());
        // NaN never compares close
        !((a - b).abs() <= atol + rtol * b.abs())
    })
}

/// Whether every element of `actual` is within `atol + rtol * |expected|` of `expected`.
pub fn allclose<T: Element>(actual: &[T], expected: &[T], rtol: f64, atol: f64) -> bool {
    first_mismatch(actual, expected, rtol, atol).is_none()
}

#[cfg(test)]
mod test_verify {
    use super::*;

    #[test]
    fn test_reference_add() {
        assert_eq!(
            reference_add(&[1.0f32, 2.0, 3.0], &[10.0, 20.0, 30.0]),
            [11.0, 22.0, 33.0]
        );
        assert!(reference_add::<f64>(&[], &[]).is_empty());
    }

    #[test]
    fn test_allclose_tolerances() {
        let expected = [1.0f32, 1000.0];
        assert!(allclose(&expected, &expected, 0.0, 0.0));
        assert!(allclose(&[1.0f32, 1000.001], &expected, DEFAULT_RTOL, DEFAULT_ATOL));
        assert!(!allclose(&[1.0f32, 1000.1], &expected, DEFAULT_RTOL, DEFAULT_ATOL));
        assert!(!allclose(&[1.0f32], &expected, DEFAULT_RTOL, DEFAULT_ATOL));
    }

    #[test]
    fn test_first_mismatch() {
        let expected = [0.5f64, 0.25, 0.125];
        assert_eq!(first_mismatch(&[0.5, 0.3, 0.125], &expected, 1e-5, 1e-8), Some(1));
        assert_eq!(first_mismatch(&[0.5, 0.25, f64::NAN], &expected, 1e-5, 1e-8), Some(2));
        assert_eq!(first_mismatch(&expected, &expected, 0.0, 0.0), None);
    }
}

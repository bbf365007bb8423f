use std::fmt::Debug;

use num_traits::Float;
use serde::{de::DeserializeOwned, Serialize};

///
/// Scalar type of knots and control points. Implemented for `f32` and `f64`.
///
pub trait Real : Float + Debug + Default + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Converts from an `f32` payload value. Exact for both supported scalars.
    fn from_payload(value: f32) -> Self;
    /// Narrows to the `f32` payload width used by the persisted formats.
    fn to_payload(self) -> f32;
    fn from_count(value: usize) -> Self;
}

impl Real for f64
{
    #[inline]
    fn from_payload(value: f32) -> Self {
        value as f64
    }
    #[inline]
    fn to_payload(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_count(value: usize) -> Self {
        value as f64
    }
}

impl Real for f32
{
    #[inline]
    fn from_payload(value: f32) -> Self {
        value
    }
    #[inline]
    fn to_payload(self) -> f32 {
        self
    }
    #[inline]
    fn from_count(value: usize) -> Self {
        value as f32
    }
}

#[test]
fn check_f32_roundtrip_through_f64()
{
    let values = [0.1_f32, -3.75e-7, 1.0e30, f32::MIN_POSITIVE];
    for v in values
    {
        assert_eq!(<f64 as Real>::from_payload(v).to_payload().to_bits(), v.to_bits());
    }
}

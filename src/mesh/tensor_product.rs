use serde::{Deserialize, Serialize};

use crate::{errors::MfaError, utilities::{float::Real, multi_index::{delinearize, lattice_strides, linearize}}};

///
/// One tensor region: a dense control-point lattice. Entry `i` of the flattened
/// lattice occupies `ctrl_pts[i * pt_dim..(i + 1) * pt_dim]`, with lattice
/// dimension 0 varying fastest.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Real")]
pub struct TensorProduct<T: Real>
{
    shape: Vec<usize>,
    pt_dim: usize,
    ctrl_pts: Vec<T>,
    #[serde(skip)]
    strides: Vec<usize>,
}

impl<T: Real> TensorProduct<T>
{
    pub fn new(shape: Vec<usize>, pt_dim: usize, ctrl_pts: Vec<T>) -> Result<Self, MfaError>
    {
        if pt_dim == 0
        {
            return Err(MfaError::UnsupportedShape("output point dimension is zero".into()));
        }
        let expected = shape.iter().product::<usize>() * pt_dim;
        if ctrl_pts.len() != expected
        {
            return Err(MfaError::ControlPointCountMismatch { expected, found: ctrl_pts.len() });
        }
        let strides = lattice_strides(&shape);
        Ok(Self { shape, pt_dim, ctrl_pts, strides })
    }

    ///
    /// Restores the derived strides after deserialization and rechecks the payload length.
    ///
    pub(crate) fn validate(&mut self) -> Result<(), MfaError>
    {
        let expected = self.shape.iter().product::<usize>() * self.pt_dim;
        if self.pt_dim == 0 || self.ctrl_pts.len() != expected
        {
            return Err(MfaError::ControlPointCountMismatch { expected, found: self.ctrl_pts.len() });
        }
        self.strides = lattice_strides(&self.shape);
        Ok(())
    }

    #[inline]
    pub fn shape(&self) -> &[usize]
    {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize]
    {
        &self.strides
    }

    #[inline]
    pub fn pt_dim(&self) -> usize
    {
        self.pt_dim
    }

    /// Number of control points (not scalars).
    #[inline]
    pub fn len(&self) -> usize
    {
        self.ctrl_pts.len() / self.pt_dim
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.ctrl_pts.is_empty()
    }

    #[inline]
    pub fn ctrl_pts(&self) -> &[T]
    {
        &self.ctrl_pts
    }

    #[inline]
    pub fn control_point(&self, flat: usize) -> &[T]
    {
        &self.ctrl_pts[flat * self.pt_dim..(flat + 1) * self.pt_dim]
    }

    pub fn control_point_at(&self, index: &[usize]) -> &[T]
    {
        self.control_point(linearize(index, &self.strides))
    }

    pub fn lattice_index(&self, flat: usize) -> Vec<usize>
    {
        delinearize(flat, &self.shape)
    }

    pub fn into_ctrl_pts(self) -> Vec<T>
    {
        self.ctrl_pts
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn control_points_are_addressed_first_dimension_fastest()
    {
        let ctrl_pts: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let tensor = TensorProduct::new(vec![3, 2], 2, ctrl_pts).unwrap();
        assert_eq!(tensor.len(), 6);
        assert_eq!(tensor.control_point_at(&[1, 0]), &[2.0, 3.0]);
        assert_eq!(tensor.control_point_at(&[0, 1]), &[6.0, 7.0]);
        assert_eq!(tensor.lattice_index(5), vec![2, 1]);
    }

    #[test]
    fn rejects_wrong_payload_length()
    {
        let err = TensorProduct::new(vec![3, 3], 1, vec![0.0_f32; 8]).unwrap_err();
        assert!(matches!(err, MfaError::ControlPointCountMismatch { expected: 9, found: 8 }));
        assert!(TensorProduct::new(vec![2], 0, Vec::<f64>::new()).is_err());
    }
}

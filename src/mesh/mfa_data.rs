use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{decoder::Decoder, errors::MfaError, utilities::{float::Real, multi_index::delinearize}};

use super::{knot_mesh::KnotMesh, tensor_product::TensorProduct};

///
/// One modeled variable: the knot mesh plus its tensor regions. Every region
/// spans the full knot mesh and shares the same output point dimension.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Real")]
pub struct MfaData<T: Real>
{
    knot_mesh: KnotMesh<T>,
    tensor_prods: Vec<TensorProduct<T>>,
}

impl<T: Real> MfaData<T>
{
    pub fn new(knot_mesh: KnotMesh<T>, tensor: TensorProduct<T>) -> Result<Self, MfaError>
    {
        let mut mfa = Self { knot_mesh, tensor_prods: Vec::new() };
        mfa.append_tensor(tensor)?;
        Ok(mfa)
    }

    ///
    /// Builds a single-region model from degrees, knot vectors and the
    /// flattened control points.
    ///
    pub fn from_parts(degrees: Vec<usize>, knots: Vec<Vec<T>>, pt_dim: usize, ctrl_pts: Vec<T>) -> Result<Self, MfaError>
    {
        let knot_mesh = KnotMesh::new(degrees, knots)?;
        let tensor = TensorProduct::new(knot_mesh.control_lattice_shape(), pt_dim, ctrl_pts)?;
        for dim in (0..knot_mesh.dom_dim()).filter(|&d| !knot_mesh.is_clamped(d))
        {
            warn!(dim, "knot vector is not clamped, boundary values will not interpolate corner control points");
        }
        Self::new(knot_mesh, tensor)
    }

    ///
    /// Model whose control points are `f` sampled at the Greville abscissae.
    /// Reproduces affine fields exactly for degree >= 1.
    ///
    pub fn sample_at_greville<F>(knot_mesh: KnotMesh<T>, pt_dim: usize, f: F) -> Result<Self, MfaError>
        where F: Fn(&[T], &mut [T])
    {
        if pt_dim == 0
        {
            return Err(MfaError::UnsupportedShape("output point dimension is zero".into()));
        }
        let shape = knot_mesh.control_lattice_shape();
        let abscissae: Vec<Vec<T>> = (0..knot_mesh.dom_dim()).map(|d| knot_mesh.greville(d)).collect();
        let count: usize = shape.iter().product();
        let mut ctrl_pts = vec![T::zero(); count * pt_dim];
        let mut param = vec![T::zero(); shape.len()];
        for (flat, value) in ctrl_pts.chunks_exact_mut(pt_dim).enumerate()
        {
            for (d, i) in delinearize(flat, &shape).into_iter().enumerate()
            {
                param[d] = abscissae[d][i];
            }
            f(&param, value);
        }
        let tensor = TensorProduct::new(shape, pt_dim, ctrl_pts)?;
        Self::new(knot_mesh, tensor)
    }

    ///
    /// Adds a region and returns its index.
    ///
    pub fn append_tensor(&mut self, tensor: TensorProduct<T>) -> Result<usize, MfaError>
    {
        let shape = self.knot_mesh.control_lattice_shape();
        if tensor.shape() != shape.as_slice()
        {
            return Err(MfaError::UnsupportedShape(format!("region lattice {:?} does not match knot mesh lattice {:?}", tensor.shape(), shape)));
        }
        if let Some(first) = self.tensor_prods.first()
        {
            if first.pt_dim() != tensor.pt_dim()
            {
                return Err(MfaError::UnsupportedShape(format!("region output dimension {} differs from {}", tensor.pt_dim(), first.pt_dim())));
            }
        }
        self.tensor_prods.push(tensor);
        Ok(self.tensor_prods.len() - 1)
    }

    pub(crate) fn validate(&mut self) -> Result<(), MfaError>
    {
        self.knot_mesh.validate()?;
        let tensors = std::mem::take(&mut self.tensor_prods);
        if tensors.is_empty()
        {
            return Err(MfaError::InvalidRegion(0));
        }
        for mut tensor in tensors
        {
            tensor.validate()?;
            self.append_tensor(tensor)?;
        }
        Ok(())
    }

    #[inline]
    pub fn dom_dim(&self) -> usize
    {
        self.knot_mesh.dom_dim()
    }

    #[inline]
    pub fn pt_dim(&self) -> usize
    {
        self.tensor_prods[0].pt_dim()
    }

    #[inline]
    pub fn knot_mesh(&self) -> &KnotMesh<T>
    {
        &self.knot_mesh
    }

    #[inline]
    pub fn num_tensors(&self) -> usize
    {
        self.tensor_prods.len()
    }

    pub fn tensor(&self, region: usize) -> Result<&TensorProduct<T>, MfaError>
    {
        self.tensor_prods.get(region).ok_or(MfaError::InvalidRegion(region))
    }

    pub fn decoder(&self, region: usize) -> Result<Decoder<'_, T>, MfaError>
    {
        Decoder::new(self, region)
    }
}

pub mod state;

use rayon::prelude::*;
use tracing::debug;

use crate::{basis::bspline::{basis_funs, clamp_to_domain, ders_basis_funs, find_span}, errors::MfaError, mesh::{mfa_data::MfaData, tensor_product::TensorProduct}, utilities::{float::Real, multi_index::advance_odometer}};

use self::state::DecodeState;

///
/// Point evaluator for one tensor region of a model. Holds only shared
/// references, so one decoder can serve any number of threads as long as each
/// thread brings its own `DecodeState`.
///
#[derive(Clone)]
pub struct Decoder<'a, T: Real>
{
    mfa: &'a MfaData<T>,
    tensor: &'a TensorProduct<T>,
    region: usize,
}

impl<'a, T: Real> Decoder<'a, T>
{
    pub fn new(mfa: &'a MfaData<T>, region: usize) -> Result<Self, MfaError>
    {
        let tensor = mfa.tensor(region)?;
        debug!(region, dom_dim = mfa.dom_dim(), pt_dim = tensor.pt_dim(), degrees = ?mfa.knot_mesh().degrees(), lattice = ?tensor.shape(), "created decoder");
        Ok(Self { mfa, tensor, region })
    }

    #[inline]
    pub fn dom_dim(&self) -> usize
    {
        self.mfa.dom_dim()
    }

    #[inline]
    pub fn pt_dim(&self) -> usize
    {
        self.tensor.pt_dim()
    }

    #[inline]
    pub fn region(&self) -> usize
    {
        self.region
    }

    pub fn create_state(&self) -> DecodeState<T>
    {
        DecodeState::new(self.mfa.knot_mesh().degrees())
    }

    fn check_input(&self, param: &[T], out: &[T], out_len: usize, state: &mut DecodeState<T>) -> Result<(), MfaError>
    {
        if param.len() != self.dom_dim()
        {
            return Err(MfaError::DimensionMismatch { expected: self.dom_dim(), found: param.len() });
        }
        if let Some(dim) = param.iter().position(|u| !u.is_finite())
        {
            return Err(MfaError::NonFiniteParameter { dim });
        }
        if out.len() != out_len
        {
            return Err(MfaError::OutputSizeMismatch { expected: out_len, found: out.len() });
        }
        if state.degrees.as_slice() != self.mfa.knot_mesh().degrees()
        {
            *state = self.create_state();
        }
        Ok(())
    }

    ///
    /// Fills spans and basis rows `0..=max_order` of every dimension.
    ///
    fn compute_basis(&self, param: &[T], state: &mut DecodeState<T>, max_order: usize)
    {
        let mesh = self.mfa.knot_mesh();
        state.resize_ders(max_order);
        for (d, &u) in param.iter().enumerate()
        {
            let knots = mesh.knots(d);
            let p = mesh.degree(d);
            let u = clamp_to_domain(knots, p, u);
            let span = find_span(knots, p, u);
            state.spans[d] = span;
            if max_order == 0
            {
                basis_funs(knots, p, span, u, &mut state.scratch[d], &mut state.ders[d][..p + 1]);
            }
            else
            {
                ders_basis_funs(knots, p, span, u, max_order, &mut state.scratch[d], &mut state.ders[d][..(max_order + 1) * (p + 1)]);
            }
        }
    }

    ///
    /// Tensor-product sum over the `(p+1)^d` active control points, using basis
    /// row `state.rows[d]` in dimension `d`. Summation order is fixed: dimension 0 fastest.
    ///
    #[allow(clippy::needless_range_loop)]
    fn accumulate(&self, state: &mut DecodeState<T>, out: &mut [T])
    {
        let DecodeState { degrees, spans, ders, offsets, rows, .. } = state;
        let strides = self.tensor.strides();
        let pt_dim = self.tensor.pt_dim();
        let ctrl_pts = self.tensor.ctrl_pts();
        let dom_dim = degrees.len();
        let mut base = 0;
        for d in 0..dom_dim
        {
            base += (spans[d] - degrees[d]) * strides[d];
        }
        out.fill(T::zero());
        offsets.fill(0);
        loop
        {
            let mut coeff = T::one();
            let mut index = base;
            for d in 0..dom_dim
            {
                coeff = coeff * ders[d][rows[d] * (degrees[d] + 1) + offsets[d]];
                index += offsets[d] * strides[d];
            }
            let ctrl_pt = &ctrl_pts[index * pt_dim..(index + 1) * pt_dim];
            for (value, &c) in out.iter_mut().zip(ctrl_pt)
            {
                *value = *value + coeff * c;
            }
            if !advance_odometer(offsets, |d| degrees[d])
            {
                break;
            }
        }
    }

    ///
    /// Value of the model at parametric location `param`, written to `out`
    /// (`pt_dim` values). Coordinates outside the domain are clamped to it.
    ///
    pub fn evaluate_point(&self, param: &[T], state: &mut DecodeState<T>, out: &mut [T]) -> Result<(), MfaError>
    {
        self.check_input(param, out, self.pt_dim(), state)?;
        self.compute_basis(param, state, 0);
        state.rows.fill(0);
        self.accumulate(state, out);
        Ok(())
    }

    ///
    /// Partial derivatives with respect to every parameter. `grad` holds
    /// `dom_dim` rows of `pt_dim` values; row `k` is d/du_k.
    ///
    pub fn evaluate_gradient(&self, param: &[T], state: &mut DecodeState<T>, grad: &mut [T]) -> Result<(), MfaError>
    {
        let pt_dim = self.pt_dim();
        self.check_input(param, grad, self.dom_dim() * pt_dim, state)?;
        self.compute_basis(param, state, 1);
        for (k, row) in grad.chunks_exact_mut(pt_dim).enumerate()
        {
            state.rows.fill(0);
            state.rows[k] = 1;
            self.accumulate(state, row);
        }
        Ok(())
    }

    ///
    /// Mixed partial derivative taking `derivs[d]` derivatives in dimension `d`.
    /// All zeros gives the value, orders above the degree give zero.
    ///
    pub fn evaluate_derivative(&self, param: &[T], derivs: &[usize], state: &mut DecodeState<T>, out: &mut [T]) -> Result<(), MfaError>
    {
        if derivs.len() != self.dom_dim()
        {
            return Err(MfaError::DimensionMismatch { expected: self.dom_dim(), found: derivs.len() });
        }
        self.check_input(param, out, self.pt_dim(), state)?;
        let degrees = self.mfa.knot_mesh().degrees();
        if derivs.iter().zip(degrees).any(|(&order, &p)| order > p)
        {
            out.fill(T::zero());
            return Ok(());
        }
        // bounded by the largest degree after the check above
        let max_order = derivs.iter().copied().max().unwrap_or(0);
        self.compute_basis(param, state, max_order);
        state.rows.copy_from_slice(derivs);
        self.accumulate(state, out);
        Ok(())
    }

    ///
    /// Evaluates a flat list of parameters (`dom_dim` values each) in parallel.
    /// Returns `pt_dim` values per parameter, in input order.
    ///
    pub fn evaluate_batch(&self, params: &[T]) -> Result<Vec<T>, MfaError>
    {
        let (dom_dim, pt_dim) = (self.dom_dim(), self.pt_dim());
        let count = self.batch_len(params)?;
        let mut values = vec![T::zero(); count * pt_dim];
        params.par_chunks_exact(dom_dim).zip(values.par_chunks_exact_mut(pt_dim)).try_for_each_init(
            || self.create_state(),
            |state, (param, value)| self.evaluate_point(param, state, value)
        )?;
        Ok(values)
    }

    ///
    /// Parallel counterpart of `evaluate_gradient`: `dom_dim * pt_dim` values per parameter.
    ///
    pub fn evaluate_gradient_batch(&self, params: &[T]) -> Result<Vec<T>, MfaError>
    {
        let dom_dim = self.dom_dim();
        let row = dom_dim * self.pt_dim();
        let count = self.batch_len(params)?;
        let mut grads = vec![T::zero(); count * row];
        params.par_chunks_exact(dom_dim).zip(grads.par_chunks_exact_mut(row)).try_for_each_init(
            || self.create_state(),
            |state, (param, grad)| self.evaluate_gradient(param, state, grad)
        )?;
        Ok(grads)
    }

    fn batch_len(&self, params: &[T]) -> Result<usize, MfaError>
    {
        let dom_dim = self.dom_dim();
        if params.len() % dom_dim != 0
        {
            return Err(MfaError::RaggedBatch { dom_dim, len: params.len() });
        }
        Ok(params.len() / dom_dim)
    }
}

//! Reusable scratch state for zero-allocation repeated decoding.

use crate::{basis::bspline::BasisScratch, utilities::float::Real};

///
/// Per-caller scratch for `Decoder`: knot spans, basis rows and the odometer
/// over the active control points. Not shareable between threads; create one
/// per worker and reuse it across calls.
///
/// # Example
/// ```ignore
/// let mut state = decoder.create_state();
/// for param in params {
///     decoder.evaluate_point(param, &mut state, &mut out)?;
/// }
/// ```
#[derive(Clone, Debug)]
pub struct DecodeState<T: Real>
{
    pub(crate) degrees: Vec<usize>,
    pub(crate) spans: Vec<usize>,
    /// per dimension: rows `0..=max_ders` of `degree + 1` basis values or derivatives
    pub(crate) ders: Vec<Vec<T>>,
    pub(crate) scratch: Vec<BasisScratch<T>>,
    pub(crate) offsets: Vec<usize>,
    pub(crate) rows: Vec<usize>,
    max_ders: usize,
}

impl<T: Real> DecodeState<T>
{
    pub fn new(degrees: &[usize]) -> Self
    {
        let dom_dim = degrees.len();
        Self
        {
            degrees: degrees.to_vec(),
            spans: vec![0; dom_dim],
            ders: degrees.iter().map(|&p| vec![T::zero(); p + 1]).collect(),
            scratch: degrees.iter().map(|&p| BasisScratch::new(p, 0)).collect(),
            offsets: vec![0; dom_dim],
            rows: vec![0; dom_dim],
            max_ders: 0,
        }
    }

    ///
    /// Makes room for derivatives up to order `max_ders` in every dimension.
    ///
    pub fn resize_ders(&mut self, max_ders: usize)
    {
        if max_ders <= self.max_ders
        {
            return;
        }
        for ((ders, scratch), &p) in self.ders.iter_mut().zip(self.scratch.iter_mut()).zip(&self.degrees)
        {
            ders.resize((max_ders + 1) * (p + 1), T::zero());
            scratch.reserve(p, max_ders);
        }
        self.max_ders = max_ders;
    }

    #[inline]
    pub fn max_ders(&self) -> usize
    {
        self.max_ders
    }

    #[inline]
    pub fn dom_dim(&self) -> usize
    {
        self.degrees.len()
    }
}

#[test]
fn check_resize_ders_grows_rows()
{
    let mut state = DecodeState::<f64>::new(&[2, 3]);
    assert_eq!(state.ders[0].len(), 3);
    state.resize_ders(2);
    assert_eq!(state.max_ders(), 2);
    assert_eq!(state.ders[0].len(), 9);
    assert_eq!(state.ders[1].len(), 12);
    state.resize_ders(1);
    assert_eq!(state.ders[1].len(), 12);
}

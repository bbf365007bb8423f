//! B-spline basis evaluation on a single knot vector.
//!
//! Span search plus the Cox-de Boor triangle for basis values and derivatives.
//! All routines write into caller-owned buffers so the decoder hot path does
//! not allocate once a `BasisScratch` has been sized.

use crate::utilities::float::Real;

///
/// Work arrays for the basis triangle. Grows on demand, never shrinks.
///
#[derive(Clone, Debug, Default)]
pub struct BasisScratch<T: Real>
{
    left: Vec<T>,
    right: Vec<T>,
    /// (p+1) x (p+1), row major: upper triangle holds basis values, lower triangle knot differences.
    ndu: Vec<T>,
    /// two alternating rows of derivative coefficients, 2 x (p+1)
    a: Vec<T>,
    /// output rows for the public evaluate_* helpers, (order+1) x (p+1)
    ders: Vec<T>,
}

impl<T: Real> BasisScratch<T>
{
    pub fn new(degree: usize, max_order: usize) -> Self
    {
        let mut scratch = Self::default();
        scratch.reserve(degree, max_order);
        scratch
    }

    pub fn reserve(&mut self, degree: usize, max_order: usize)
    {
        self.reserve_triangle(degree);
        let n = degree + 1;
        if self.ders.len() < (max_order + 1) * n
        {
            self.ders.resize((max_order + 1) * n, T::zero());
        }
    }

    #[inline]
    fn reserve_triangle(&mut self, degree: usize)
    {
        let n = degree + 1;
        if self.left.len() < n
        {
            self.left.resize(n, T::zero());
            self.right.resize(n, T::zero());
            self.a.resize(2 * n, T::zero());
        }
        if self.ndu.len() < n * n
        {
            self.ndu.resize(n * n, T::zero());
        }
    }
}

///
/// Index of the knot span owning `u`: the rightmost `i` with `knots[i] <= u`,
/// clamped to `[degree, ncp - 1]`. At or beyond the right end of the domain the
/// last non-empty span is returned.
///
#[inline]
pub fn find_span<T: Real>(knots: &[T], degree: usize, u: T) -> usize
{
    let ncp = knots.len() - degree - 1;
    let upper = knots[ncp];
    if u >= upper
    {
        return knots[..=ncp].partition_point(|&k| k < upper) - 1;
    }
    knots.partition_point(|&k| k <= u).saturating_sub(1).clamp(degree, ncp - 1)
}

///
/// Clamps `u` into the valid parameter domain `[knots[degree], knots[ncp]]`.
///
#[inline]
pub fn clamp_to_domain<T: Real>(knots: &[T], degree: usize, u: T) -> T
{
    let ncp = knots.len() - degree - 1;
    u.max(knots[degree]).min(knots[ncp])
}

///
/// Nonzero basis values at `u` within `span` (A2.2 of Piegl & Tiller).
/// `out[j]` multiplies control point `span - degree + j`.
///
pub fn basis_funs<T: Real>(knots: &[T], degree: usize, span: usize, u: T, scratch: &mut BasisScratch<T>, out: &mut [T])
{
    scratch.reserve_triangle(degree);
    let left = &mut scratch.left;
    let right = &mut scratch.right;
    out[0] = T::one();
    for j in 1..=degree
    {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = T::zero();
        for r in 0..j
        {
            let temp = out[r] / (right[r + 1] + left[j - r]);
            out[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        out[j] = saved;
    }
}

///
/// Nonzero basis values and their derivatives up to `order` at `u` within `span`
/// (A2.3 of Piegl & Tiller). `out` is laid out in rows of `degree + 1`: row `k`
/// holds the k-th derivatives. Rows above the degree are zero.
///
pub fn ders_basis_funs<T: Real>(knots: &[T], degree: usize, span: usize, u: T, order: usize, scratch: &mut BasisScratch<T>, out: &mut [T])
{
    let p = degree;
    let n = p + 1;
    scratch.reserve_triangle(degree);
    let BasisScratch { left, right, ndu, a, .. } = scratch;

    ndu[0] = T::one();
    for j in 1..=p
    {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = T::zero();
        for r in 0..j
        {
            ndu[j * n + r] = right[r + 1] + left[j - r];
            let temp = ndu[r * n + j - 1] / ndu[j * n + r];
            ndu[r * n + j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j * n + j] = saved;
    }
    for j in 0..=p
    {
        out[j] = ndu[j * n + p];
    }

    let top = order.min(p);
    for r in 0..=p
    {
        let (mut s1, mut s2) = (0, n);
        a[0] = T::one();
        for k in 1..=top
        {
            let mut d = T::zero();
            let rk = r as isize - k as isize;
            let pk = p - k;
            if rk >= 0
            {
                a[s2] = a[s1] / ndu[(pk + 1) * n + rk as usize];
                d = a[s2] * ndu[rk as usize * n + pk];
            }
            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };
            for j in j1..=j2
            {
                let col = (rk + j as isize) as usize;
                a[s2 + j] = (a[s1 + j] - a[s1 + j - 1]) / ndu[(pk + 1) * n + col];
                d = d + a[s2 + j] * ndu[col * n + pk];
            }
            if r <= pk
            {
                a[s2 + k] = -a[s1 + k - 1] / ndu[(pk + 1) * n + r];
                d = d + a[s2 + k] * ndu[r * n + pk];
            }
            out[k * n + r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = T::from_count(p);
    for k in 1..=top
    {
        for value in out[k * n..(k + 1) * n].iter_mut()
        {
            *value = *value * factor;
        }
        factor = factor * T::from_count(p - k);
    }
    for value in out[(top + 1) * n..(order + 1) * n].iter_mut()
    {
        *value = T::zero();
    }
}

///
/// Span index and the `degree + 1` nonzero basis values at `u`. Out-of-domain
/// parameters are clamped to the domain boundary.
///
pub fn evaluate_basis<'s, T: Real>(knots: &[T], degree: usize, u: T, scratch: &'s mut BasisScratch<T>) -> (usize, &'s [T])
{
    let u = clamp_to_domain(knots, degree, u);
    let span = find_span(knots, degree, u);
    scratch.reserve(degree, 0);
    let mut values = std::mem::take(&mut scratch.ders);
    basis_funs(knots, degree, span, u, scratch, &mut values[..degree + 1]);
    scratch.ders = values;
    (span, &scratch.ders[..degree + 1])
}

///
/// Span index and the `order`-th derivatives of the `degree + 1` nonzero basis
/// functions at `u`.
///
pub fn evaluate_basis_derivative<'s, T: Real>(knots: &[T], degree: usize, u: T, order: usize, scratch: &'s mut BasisScratch<T>) -> (usize, &'s [T])
{
    let u = clamp_to_domain(knots, degree, u);
    let span = find_span(knots, degree, u);
    let n = degree + 1;
    scratch.reserve(degree, order);
    let mut rows = std::mem::take(&mut scratch.ders);
    ders_basis_funs(knots, degree, span, u, order, scratch, &mut rows[..(order + 1) * n]);
    scratch.ders = rows;
    (span, &scratch.ders[order * n..(order + 1) * n])
}

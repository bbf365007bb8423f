use serde::{Deserialize, Serialize};

use crate::{errors::MfaError, utilities::float::Real};

///
/// Degree and knot vector of every domain dimension. The control lattice shape
/// follows from these: `num_control_points(d) = knots[d].len() - degrees[d] - 1`.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Real")]
pub struct KnotMesh<T: Real>
{
    degrees: Vec<usize>,
    knots: Vec<Vec<T>>,
}

impl<T: Real> KnotMesh<T>
{
    pub fn new(degrees: Vec<usize>, knots: Vec<Vec<T>>) -> Result<Self, MfaError>
    {
        let mesh = Self { degrees, knots };
        mesh.validate()?;
        Ok(mesh)
    }

    ///
    /// Open (clamped) uniform knot vectors on `[0, 1]` for the given degrees and
    /// control point counts.
    ///
    pub fn uniform(degrees: &[usize], control_counts: &[usize]) -> Result<Self, MfaError>
    {
        if degrees.len() != control_counts.len()
        {
            return Err(MfaError::DimensionMismatch { expected: degrees.len(), found: control_counts.len() });
        }
        let knots = degrees.iter().zip(control_counts).enumerate().map(|(dim, (&p, &ncp))|
        {
            if ncp < p + 1
            {
                return Err(MfaError::InvalidKnotVector { dim, reason: "fewer control points than degree + 1" });
            }
            let intervals = ncp - p;
            let mut knots = Vec::with_capacity(ncp + p + 1);
            knots.extend(std::iter::repeat(T::zero()).take(p + 1));
            knots.extend((1..intervals).map(|i| T::from_count(i) / T::from_count(intervals)));
            knots.extend(std::iter::repeat(T::one()).take(p + 1));
            Ok(knots)
        }).collect::<Result<Vec<_>, _>>()?;
        Self::new(degrees.to_vec(), knots)
    }

    pub(crate) fn validate(&self) -> Result<(), MfaError>
    {
        if self.knots.is_empty()
        {
            return Err(MfaError::InvalidKnotVector { dim: 0, reason: "mesh has no dimensions" });
        }
        if self.degrees.len() != self.knots.len()
        {
            return Err(MfaError::DimensionMismatch { expected: self.knots.len(), found: self.degrees.len() });
        }
        for (dim, (knots, &p)) in self.knots.iter().zip(&self.degrees).enumerate()
        {
            if knots.len() < 2 * (p + 1)
            {
                return Err(MfaError::InvalidKnotVector { dim, reason: "fewer than 2 * (degree + 1) knots" });
            }
            if knots.iter().any(|k| !k.is_finite())
            {
                return Err(MfaError::InvalidKnotVector { dim, reason: "non-finite knot" });
            }
            if knots.windows(2).any(|w| w[1] < w[0])
            {
                return Err(MfaError::InvalidKnotVector { dim, reason: "knots decrease" });
            }
            let ncp = knots.len() - p - 1;
            if knots[p] >= knots[ncp]
            {
                return Err(MfaError::InvalidKnotVector { dim, reason: "empty parameter domain" });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn dom_dim(&self) -> usize
    {
        self.knots.len()
    }

    #[inline]
    pub fn degree(&self, dim: usize) -> usize
    {
        self.degrees[dim]
    }

    #[inline]
    pub fn degrees(&self) -> &[usize]
    {
        &self.degrees
    }

    #[inline]
    pub fn knots(&self, dim: usize) -> &[T]
    {
        &self.knots[dim]
    }

    #[inline]
    pub fn all_knots(&self) -> &[Vec<T>]
    {
        &self.knots
    }

    #[inline]
    pub fn num_control_points(&self, dim: usize) -> usize
    {
        self.knots[dim].len() - self.degrees[dim] - 1
    }

    pub fn control_lattice_shape(&self) -> Vec<usize>
    {
        (0..self.dom_dim()).map(|d| self.num_control_points(d)).collect()
    }

    pub fn num_control_points_total(&self) -> usize
    {
        (0..self.dom_dim()).map(|d| self.num_control_points(d)).product()
    }

    ///
    /// Valid parameter interval `[knots[degree], knots[ncp]]` of dimension `dim`.
    ///
    #[inline]
    pub fn domain(&self, dim: usize) -> (T, T)
    {
        let knots = &self.knots[dim];
        (knots[self.degrees[dim]], knots[self.num_control_points(dim)])
    }

    ///
    /// True when both ends of the knot vector repeat `degree + 1` times.
    ///
    pub fn is_clamped(&self, dim: usize) -> bool
    {
        let knots = &self.knots[dim];
        let p = self.degrees[dim];
        let n = knots.len();
        knots[..=p].iter().all(|&k| k == knots[0]) && knots[n - p - 1..].iter().all(|&k| k == knots[n - 1])
    }

    ///
    /// Greville abscissae: the parameter each control point is most associated with.
    ///
    pub fn greville(&self, dim: usize) -> Vec<T>
    {
        let knots = &self.knots[dim];
        let p = self.degrees[dim];
        let two = T::one() + T::one();
        (0..self.num_control_points(dim)).map(|i|
        {
            if p == 0
            {
                (knots[i] + knots[i + 1]) / two
            }
            else
            {
                knots[i + 1..=i + p].iter().fold(T::zero(), |acc, &k| acc + k) / T::from_count(p)
            }
        }).collect()
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn shape_follows_knot_count_and_degree()
    {
        let mesh = KnotMesh::<f64>::uniform(&[2, 3, 1], &[6, 5, 2]).unwrap();
        assert_eq!(mesh.dom_dim(), 3);
        for d in 0..3
        {
            assert_eq!(mesh.num_control_points(d), mesh.knots(d).len() - mesh.degree(d) - 1);
            assert!(mesh.is_clamped(d));
            assert_eq!(mesh.domain(d), (0.0, 1.0));
        }
        assert_eq!(mesh.control_lattice_shape(), vec![6, 5, 2]);
        assert_eq!(mesh.num_control_points_total(), 60);
    }

    #[test]
    fn uniform_knots_are_open()
    {
        let mesh = KnotMesh::<f64>::uniform(&[2], &[5]).unwrap();
        assert_eq!(mesh.knots(0), &[0.0, 0.0, 0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn rejects_decreasing_knots()
    {
        let err = KnotMesh::new(vec![1], vec![vec![0.0, 0.0, 0.6, 0.4, 1.0, 1.0]]).unwrap_err();
        assert!(matches!(err, MfaError::InvalidKnotVector { dim: 0, .. }));
    }

    #[test]
    fn rejects_short_knot_vector()
    {
        let err = KnotMesh::new(vec![2], vec![vec![0.0, 0.0, 1.0, 1.0]]).unwrap_err();
        assert!(matches!(err, MfaError::InvalidKnotVector { .. }));
    }

    #[test]
    fn rejects_empty_domain_and_nan()
    {
        assert!(KnotMesh::new(vec![1], vec![vec![0.0, 0.0, 0.0, 1.0]]).is_err());
        assert!(KnotMesh::new(vec![1], vec![vec![0.0, 0.0, f64::NAN, 1.0, 1.0]]).is_err());
        assert!(KnotMesh::<f64>::new(vec![], vec![]).is_err());
        assert!(KnotMesh::new(vec![1, 1], vec![vec![0.0, 0.0, 1.0, 1.0]]).is_err());
    }

    #[test]
    fn unclamped_knots_are_reported()
    {
        let mesh = KnotMesh::new(vec![1], vec![vec![0.0, 0.25, 0.5, 0.75, 1.0]]).unwrap();
        assert!(!mesh.is_clamped(0));
        assert_eq!(mesh.domain(0), (0.25, 0.75));
    }

    #[test]
    fn greville_abscissae()
    {
        let mesh = KnotMesh::<f64>::uniform(&[2], &[4]).unwrap();
        let g = mesh.greville(0);
        let expected = [0.0, 0.25, 0.75, 1.0];
        for (a, b) in g.iter().zip(expected)
        {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-15);
        }
    }
}

//! Point evaluation and differentiation of multivariate functional
//! approximation (MFA) models: tensor-product B-spline surrogates described
//! by a degree and knot vector per domain dimension plus a lattice of
//! control points.
//!
//! * [`basis::bspline`] locates knot spans and evaluates basis functions and their derivatives.
//! * [`mesh`] holds the knot mesh and the control-point lattices (tensor regions).
//! * [`decoder::Decoder`] combines the per-dimension bases into values, gradients and mixed derivatives.
//! * [`serialization`] reads and writes the `.mfab` / `.cpts` exchange formats and block snapshots.
//! * [`block::Block`] groups the variables of one domain block with its bounds.

pub mod basis;
pub mod block;
pub mod decoder;
pub mod errors;
pub mod mesh;
pub mod serialization;
pub mod utilities;

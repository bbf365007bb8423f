pub mod bspline;

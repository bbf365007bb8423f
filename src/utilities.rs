pub mod float;
pub mod multi_index;

pub mod knot_mesh;
pub mod mfa_data;
pub mod tensor_product;

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{decoder::Decoder, errors::MfaError, mesh::mfa_data::MfaData, serialization::{deserialize, serialize, SerializationFormat}, utilities::float::Real};

///
/// A domain block: the modeled variables over one axis-aligned box of the
/// input domain. Parameters are the unit coordinates of that box.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Real")]
pub struct Block<T: Real>
{
    pub dom_dim: usize,
    /// sum of the output dimensions of all variables
    pub pt_dim: usize,
    pub vars: Vec<MfaData<T>>,
    pub bounds_mins: Vec<T>,
    pub bounds_maxs: Vec<T>,
}

impl<T: Real> Block<T>
{
    pub fn new(vars: Vec<MfaData<T>>, bounds_mins: Vec<T>, bounds_maxs: Vec<T>) -> Result<Self, MfaError>
    {
        let dom_dim = vars.first().map(|v| v.dom_dim()).unwrap_or(bounds_mins.len());
        let pt_dim = vars.iter().map(|v| v.pt_dim()).sum();
        let block = Self { dom_dim, pt_dim, vars, bounds_mins, bounds_maxs };
        block.check_shape()?;
        Ok(block)
    }

    fn check_shape(&self) -> Result<(), MfaError>
    {
        if self.dom_dim == 0
        {
            return Err(MfaError::InvalidBounds("block needs at least one domain dimension"));
        }
        for len in [self.bounds_mins.len(), self.bounds_maxs.len()]
        {
            if len != self.dom_dim
            {
                return Err(MfaError::DimensionMismatch { expected: self.dom_dim, found: len });
            }
        }
        if let Some(var) = self.vars.iter().find(|v| v.dom_dim() != self.dom_dim)
        {
            return Err(MfaError::DimensionMismatch { expected: self.dom_dim, found: var.dom_dim() });
        }
        if self.pt_dim != self.vars.iter().map(|v| v.pt_dim()).sum::<usize>()
        {
            return Err(MfaError::UnsupportedShape(format!("block pt_dim {} differs from its variables", self.pt_dim)));
        }
        if self.bounds_mins.iter().zip(&self.bounds_maxs).any(|(lo, hi)| !lo.is_finite() || !hi.is_finite() || lo >= hi)
        {
            return Err(MfaError::InvalidBounds("every dimension needs finite bounds with min < max"));
        }
        Ok(())
    }

    pub fn extents(&self) -> Vec<T>
    {
        self.bounds_mins.iter().zip(&self.bounds_maxs).map(|(&lo, &hi)| hi - lo).collect()
    }

    ///
    /// Unit parameter of a point given in domain coordinates.
    ///
    pub fn param_of(&self, point: &[T]) -> Result<Vec<T>, MfaError>
    {
        if point.len() != self.dom_dim
        {
            return Err(MfaError::DimensionMismatch { expected: self.dom_dim, found: point.len() });
        }
        Ok(point.iter().zip(self.bounds_mins.iter().zip(&self.bounds_maxs)).map(|(&x, (&lo, &hi))| (x - lo) / (hi - lo)).collect())
    }

    ///
    /// Converts a parameter-space gradient (`dom_dim` rows of `pt_dim` values)
    /// to domain coordinates in place.
    ///
    pub fn gradient_to_domain(&self, grad: &mut [T]) -> Result<(), MfaError>
    {
        if grad.len() % self.dom_dim != 0
        {
            return Err(MfaError::OutputSizeMismatch { expected: self.dom_dim, found: grad.len() });
        }
        let row = grad.len() / self.dom_dim;
        for (values, extent) in grad.chunks_exact_mut(row.max(1)).zip(self.extents())
        {
            values.iter_mut().for_each(|v| *v = *v / extent);
        }
        Ok(())
    }

    pub fn decoder(&self, var: usize, region: usize) -> Result<Decoder<'_, T>, MfaError>
    {
        let mfa = self.vars.get(var).ok_or(MfaError::InvalidVariable(var))?;
        Decoder::new(mfa, region)
    }

    ///
    /// Saves the block to file as an LZ4-compressed bincode snapshot.
    ///
    pub fn save(&self, path: &str) -> Result<(), MfaError>
    {
        self.save_with_format(path, SerializationFormat::default())
    }

    pub fn save_with_format(&self, path: &str, format: SerializationFormat) -> Result<(), MfaError>
    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let buffer = serialize(self, format)?;
        file.write_all(&buffer).map_err(|_| MfaError::WriteBufferFailed)?;
        file.flush().map_err(|_| MfaError::WriteBufferFailed)?;
        info!(path, bytes = buffer.len(), ?format, "saved block");
        Ok(())
    }

    ///
    /// Reads a block snapshot from a buffer and re-validates it.
    ///
    pub fn read_buffer(buffer: &[u8], format: SerializationFormat) -> Result<Self, MfaError>
    {
        let mut block: Self = deserialize(buffer, format)?;
        for var in block.vars.iter_mut()
        {
            var.validate()?;
        }
        block.check_shape()?;
        Ok(block)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader, format: SerializationFormat) -> Result<Self, MfaError>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|_| MfaError::ReadBufferFailed)?;
        Self::read_buffer(&bytes, format)
    }

    pub fn load(path: &str) -> Result<Self, MfaError>
    {
        Self::load_with_format(path, SerializationFormat::default())
    }

    pub fn load_with_format(path: &str, format: SerializationFormat) -> Result<Self, MfaError>
    {
        let block = Self::read(std::fs::File::open(path)?, format)?;
        info!(path, vars = block.vars.len(), dom_dim = block.dom_dim, pt_dim = block.pt_dim, "loaded block");
        Ok(block)
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_abs_diff_eq;

    use crate::mesh::knot_mesh::KnotMesh;

    use super::*;

    fn block() -> Block<f64>
    {
        let mesh = KnotMesh::<f64>::uniform(&[2, 2], &[6, 5]).unwrap();
        let temperature = MfaData::sample_at_greville(mesh.clone(), 1, |x, out| out[0] = 3.0 * x[0] + x[1]).unwrap();
        let velocity = MfaData::sample_at_greville(mesh, 2, |x, out| { out[0] = x[1]; out[1] = -x[0]; }).unwrap();
        Block::new(vec![temperature, velocity], vec![-1.0, 10.0], vec![1.0, 20.0]).unwrap()
    }

    #[test]
    fn shape_is_derived_from_variables()
    {
        let block = block();
        assert_eq!(block.dom_dim, 2);
        assert_eq!(block.pt_dim, 3);
        assert_eq!(block.extents(), vec![2.0, 10.0]);
    }

    #[test]
    fn domain_points_map_to_unit_parameters()
    {
        let block = block();
        let param = block.param_of(&[0.0, 12.5]).unwrap();
        assert_abs_diff_eq!(param[0], 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(param[1], 0.25, epsilon = 1e-15);
        assert!(block.param_of(&[0.0]).is_err());
    }

    #[test]
    fn gradients_scale_by_extent()
    {
        let block = block();
        let decoder = block.decoder(0, 0).unwrap();
        let mut state = decoder.create_state();
        let mut grad = [0.0; 2];
        let param = block.param_of(&[0.2, 14.0]).unwrap();
        decoder.evaluate_gradient(&param, &mut state, &mut grad).unwrap();
        block.gradient_to_domain(&mut grad).unwrap();
        assert_abs_diff_eq!(grad[0], 3.0 / 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(grad[1], 1.0 / 10.0, epsilon = 1e-10);
    }

    #[test]
    fn rejects_bad_bounds_and_unknown_variables()
    {
        let block = block();
        let vars = block.vars.clone();
        assert!(matches!(Block::new(vars.clone(), vec![0.0, 1.0], vec![0.0, 2.0]), Err(MfaError::InvalidBounds(_))));
        assert!(matches!(Block::new(vars, vec![0.0], vec![1.0]), Err(MfaError::DimensionMismatch { .. })));
        assert!(matches!(block.decoder(2, 0), Err(MfaError::InvalidVariable(2))));
        assert!(matches!(block.decoder(1, 1), Err(MfaError::InvalidRegion(1))));
    }

    #[test]
    fn snapshot_roundtrip_in_memory()
    {
        let block = block();
        for format in [SerializationFormat::Bincode, SerializationFormat::BincodeLz4]
        {
            let bytes = serialize(&block, format).unwrap();
            let restored = Block::read(bytes.as_slice(), format).unwrap();
            assert_eq!(restored, block);
            let decoder = restored.decoder(1, 0).unwrap();
            let mut state = decoder.create_state();
            let mut out = [0.0; 2];
            decoder.evaluate_point(&[0.25, 0.75], &mut state, &mut out).unwrap();
            assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-12);
            assert_abs_diff_eq!(out[1], -0.25, epsilon = 1e-12);
        }
    }
}

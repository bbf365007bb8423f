//! Raw little-endian exchange formats.
//!
//! * Legacy `.mfab`: `u32 degree`, `u32 knot_count`, three knot vectors of
//!   `knot_count` `f32` each, then the scalar control points as `f32`. Only
//!   3-d models with equal degree and knot count in every dimension and a
//!   scalar output fit this layout.
//! * `.mfab` version 2: the `MFAB` tag, `u32` version, `u32` dom_dim,
//!   `u32` pt_dim, then per dimension `u32` degrees, knot counts and control
//!   point counts, followed by all knots and all control points as `f32`.
//! * `.cpts`: control points only, `f32`, no header.
//!
//! Control points are written in lattice order, dimension 0 fastest.

use std::{fs::File, io::{BufWriter, Read, Write}, path::Path};

use tracing::{debug, info};

use crate::{errors::MfaError, mesh::mfa_data::MfaData, utilities::float::Real};

pub const MFAB_MAGIC: &[u8; 4] = b"MFAB";
pub const MFAB_VERSION: u32 = 2;

const WORD: usize = 4;

///
/// Bounds-checked cursor over a fully read payload.
///
struct ByteReader<'a>
{
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a>
{
    fn new(bytes: &'a [u8]) -> Self
    {
        Self { bytes, pos: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize
    {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], MfaError>
    {
        if len > self.remaining()
        {
            return Err(MfaError::Truncated { expected: self.pos + len, found: self.bytes.len() });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, MfaError>
    {
        let mut word = [0_u8; WORD];
        word.copy_from_slice(self.take(WORD)?);
        Ok(u32::from_le_bytes(word))
    }

    fn usize(&mut self) -> Result<usize, MfaError>
    {
        Ok(self.u32()? as usize)
    }

    fn reals<T: Real>(&mut self, count: usize) -> Result<Vec<T>, MfaError>
    {
        let len = count.checked_mul(WORD).ok_or_else(|| MfaError::UnsupportedShape(format!("{count} values overflow the payload size")))?;
        Ok(self.take(len)?.chunks_exact(WORD).map(|word|
        {
            T::from_payload(f32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        }).collect())
    }

    ///
    /// Requires exactly `expected` bytes left.
    ///
    fn expect_remaining(&self, expected: usize) -> Result<(), MfaError>
    {
        match self.remaining()
        {
            found if found < expected => Err(MfaError::Truncated { expected: self.pos + expected, found: self.bytes.len() }),
            found if found > expected => Err(MfaError::TrailingBytes(found - expected)),
            _ => Ok(()),
        }
    }
}

fn write_u32<W: Write>(writer: &mut W, value: usize) -> Result<(), MfaError>
{
    let value = u32::try_from(value).map_err(|_| MfaError::UnsupportedShape(format!("{value} does not fit a u32 header field")))?;
    writer.write_all(&value.to_le_bytes()).map_err(|_| MfaError::WriteBufferFailed)
}

fn write_reals<W: Write, T: Real>(writer: &mut W, values: &[T]) -> Result<(), MfaError>
{
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_payload().to_le_bytes()).collect();
    writer.write_all(&bytes).map_err(|_| MfaError::WriteBufferFailed)
}

fn checked_product(values: impl IntoIterator<Item = usize>) -> Result<usize, MfaError>
{
    values.into_iter().try_fold(1_usize, |acc, v| acc.checked_mul(v))
        .ok_or_else(|| MfaError::UnsupportedShape("lattice size overflows".into()))
}

///
/// Writes region `region` of `mfa` in the self-describing version 2 layout.
///
pub fn write_mfab<W: Write, T: Real>(writer: &mut W, mfa: &MfaData<T>, region: usize) -> Result<(), MfaError>
{
    let tensor = mfa.tensor(region)?;
    let mesh = mfa.knot_mesh();
    writer.write_all(MFAB_MAGIC).map_err(|_| MfaError::WriteBufferFailed)?;
    write_u32(writer, MFAB_VERSION as usize)?;
    write_u32(writer, mfa.dom_dim())?;
    write_u32(writer, tensor.pt_dim())?;
    for &p in mesh.degrees()
    {
        write_u32(writer, p)?;
    }
    for knots in mesh.all_knots()
    {
        write_u32(writer, knots.len())?;
    }
    for &n in tensor.shape()
    {
        write_u32(writer, n)?;
    }
    for knots in mesh.all_knots()
    {
        write_reals(writer, knots)?;
    }
    write_reals(writer, tensor.ctrl_pts())?;
    debug!(dom_dim = mfa.dom_dim(), pt_dim = tensor.pt_dim(), lattice = ?tensor.shape(), "wrote mfab v2 payload");
    Ok(())
}

///
/// Writes region `region` of `mfa` in the legacy layout. Rejects models the
/// layout cannot describe instead of writing an ambiguous file.
///
pub fn write_legacy_mfab<W: Write, T: Real>(writer: &mut W, mfa: &MfaData<T>, region: usize) -> Result<(), MfaError>
{
    let tensor = mfa.tensor(region)?;
    let mesh = mfa.knot_mesh();
    if mfa.dom_dim() != 3
    {
        return Err(MfaError::UnsupportedShape(format!("legacy mfab stores exactly 3 dimensions, model has {}", mfa.dom_dim())));
    }
    if tensor.pt_dim() != 1
    {
        return Err(MfaError::UnsupportedShape(format!("legacy mfab stores scalar outputs, model has {}", tensor.pt_dim())));
    }
    let degree = mesh.degree(0);
    let knot_count = mesh.knots(0).len();
    if mesh.degrees().iter().any(|&p| p != degree) || mesh.all_knots().iter().any(|k| k.len() != knot_count)
    {
        return Err(MfaError::UnsupportedShape("legacy mfab needs equal degree and knot count in every dimension".into()));
    }
    write_u32(writer, degree)?;
    write_u32(writer, knot_count)?;
    for knots in mesh.all_knots()
    {
        write_reals(writer, knots)?;
    }
    write_reals(writer, tensor.ctrl_pts())?;
    debug!(degree, knot_count, ctrl_pts = tensor.len(), "wrote legacy mfab payload");
    Ok(())
}

fn read_v2<T: Real>(reader: &mut ByteReader) -> Result<MfaData<T>, MfaError>
{
    reader.take(MFAB_MAGIC.len())?;
    let version = reader.u32()?;
    if version != MFAB_VERSION
    {
        return Err(MfaError::UnsupportedVersion(version));
    }
    let dom_dim = reader.usize()?;
    let pt_dim = reader.usize()?;
    if dom_dim == 0 || pt_dim == 0
    {
        return Err(MfaError::UnsupportedShape(format!("header declares dom_dim {dom_dim}, pt_dim {pt_dim}")));
    }
    let degrees = (0..dom_dim).map(|_| reader.usize()).collect::<Result<Vec<_>, _>>()?;
    let knot_counts = (0..dom_dim).map(|_| reader.usize()).collect::<Result<Vec<_>, _>>()?;
    let ctrl_counts = (0..dom_dim).map(|_| reader.usize()).collect::<Result<Vec<_>, _>>()?;
    for (d, ((&p, &m), &n)) in degrees.iter().zip(&knot_counts).zip(&ctrl_counts).enumerate()
    {
        if m.checked_sub(p + 1) != Some(n)
        {
            return Err(MfaError::UnsupportedShape(format!("dimension {d}: {n} control points do not match {m} knots of degree {p}")));
        }
    }
    let knot_total = knot_counts.iter().try_fold(0_usize, |acc, &m| acc.checked_add(m))
        .ok_or_else(|| MfaError::UnsupportedShape("knot count overflows".into()))?;
    let ctrl_total = checked_product(ctrl_counts.iter().copied().chain(std::iter::once(pt_dim)))?;
    let payload = knot_total.checked_add(ctrl_total).and_then(|v| v.checked_mul(WORD))
        .ok_or_else(|| MfaError::UnsupportedShape("payload size overflows".into()))?;
    reader.expect_remaining(payload)?;

    let knots = knot_counts.iter().map(|&m| reader.reals(m)).collect::<Result<Vec<_>, _>>()?;
    let ctrl_pts = reader.reals(ctrl_total)?;
    debug!(dom_dim, pt_dim, ?degrees, lattice = ?ctrl_counts, "read mfab v2 payload");
    MfaData::from_parts(degrees, knots, pt_dim, ctrl_pts)
}

fn read_legacy<T: Real>(reader: &mut ByteReader) -> Result<MfaData<T>, MfaError>
{
    let degree = reader.usize()?;
    let knot_count = reader.usize()?;
    let ncp = knot_count.checked_sub(degree + 1)
        .ok_or(MfaError::InvalidKnotVector { dim: 0, reason: "fewer knots than degree + 1" })?;
    let ctrl_total = checked_product([ncp, ncp, ncp])?;
    let knot_total = knot_count.checked_mul(3).ok_or_else(|| MfaError::UnsupportedShape("knot count overflows".into()))?;
    let payload = knot_total.checked_add(ctrl_total).and_then(|v| v.checked_mul(WORD))
        .ok_or_else(|| MfaError::UnsupportedShape("payload size overflows".into()))?;
    reader.expect_remaining(payload)?;

    let knots = (0..3).map(|_| reader.reals(knot_count)).collect::<Result<Vec<_>, _>>()?;
    let ctrl_pts = reader.reals(ctrl_total)?;
    debug!(degree, knot_count, ctrl_pts = ctrl_total, "read legacy mfab payload");
    MfaData::from_parts(vec![degree; 3], knots, 1, ctrl_pts)
}

///
/// Parses either `.mfab` layout, told apart by the `MFAB` tag.
///
pub fn read_mfab_buffer<T: Real>(bytes: &[u8]) -> Result<MfaData<T>, MfaError>
{
    let mut reader = ByteReader::new(bytes);
    if bytes.starts_with(MFAB_MAGIC)
    {
        read_v2(&mut reader)
    }
    else
    {
        read_legacy(&mut reader)
    }
}

///
/// Parses a legacy `.mfab` payload only.
///
pub fn read_legacy_mfab_buffer<T: Real>(bytes: &[u8]) -> Result<MfaData<T>, MfaError>
{
    read_legacy(&mut ByteReader::new(bytes))
}

pub fn read_mfab<T: Real, Reader: Read>(mut reader: Reader) -> Result<MfaData<T>, MfaError>
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|_| MfaError::ReadBufferFailed)?;
    read_mfab_buffer(&bytes)
}

pub fn save_mfab<T: Real, P: AsRef<Path>>(path: P, mfa: &MfaData<T>, region: usize) -> Result<(), MfaError>
{
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    write_mfab(&mut file, mfa, region)?;
    file.flush().map_err(|_| MfaError::WriteBufferFailed)?;
    info!(path = %path.as_ref().display(), "saved mfab model");
    Ok(())
}

pub fn save_legacy_mfab<T: Real, P: AsRef<Path>>(path: P, mfa: &MfaData<T>, region: usize) -> Result<(), MfaError>
{
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    write_legacy_mfab(&mut file, mfa, region)?;
    file.flush().map_err(|_| MfaError::WriteBufferFailed)?;
    info!(path = %path.as_ref().display(), "saved legacy mfab model");
    Ok(())
}

pub fn load_mfab<T: Real, P: AsRef<Path>>(path: P) -> Result<MfaData<T>, MfaError>
{
    let bytes = std::fs::read(path.as_ref())?;
    let mfa = read_mfab_buffer(&bytes)?;
    info!(path = %path.as_ref().display(), bytes = bytes.len(), "loaded mfab model");
    Ok(mfa)
}

///
/// Writes headerless control points.
///
pub fn write_control_points<W: Write, T: Real>(writer: &mut W, ctrl_pts: &[T]) -> Result<(), MfaError>
{
    write_reals(writer, ctrl_pts)?;
    debug!(values = ctrl_pts.len(), "wrote control points");
    Ok(())
}

///
/// Reads headerless control points. `expected` is the scalar count known out
/// of band; when given, any other payload length is an error.
///
pub fn read_control_points<T: Real, Reader: Read>(mut reader: Reader, expected: Option<usize>) -> Result<Vec<T>, MfaError>
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|_| MfaError::ReadBufferFailed)?;
    let count = match expected
    {
        Some(count) =>
        {
            let len = count.checked_mul(WORD).ok_or_else(|| MfaError::UnsupportedShape("payload size overflows".into()))?;
            ByteReader::new(&bytes).expect_remaining(len)?;
            count
        }
        None =>
        {
            if bytes.len() % WORD != 0
            {
                return Err(MfaError::TrailingBytes(bytes.len() % WORD));
            }
            bytes.len() / WORD
        }
    };
    ByteReader::new(&bytes).reals(count)
}

pub fn save_control_points<T: Real, P: AsRef<Path>>(path: P, ctrl_pts: &[T]) -> Result<(), MfaError>
{
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    write_control_points(&mut file, ctrl_pts)?;
    file.flush().map_err(|_| MfaError::WriteBufferFailed)?;
    info!(path = %path.as_ref().display(), "saved control points");
    Ok(())
}

pub fn load_control_points<T: Real, P: AsRef<Path>>(path: P, expected: Option<usize>) -> Result<Vec<T>, MfaError>
{
    let file = File::open(path.as_ref())?;
    read_control_points(file, expected)
}

///
/// Strides of a control lattice flattened in declared dimension order, with
/// dimension 0 varying fastest: `flat = i_0 + n_0 * (i_1 + n_1 * (...))`.
///
/// This is column-major (Fortran) order over `(i_0, .., i_{d-1})`, not C
/// row-major: it is the layout fitted MFA lattices are written in, so `.mfab`
/// and `.cpts` payloads store the first dimension's index as the fastest one.
///
pub fn lattice_strides(shape: &[usize]) -> Vec<usize>
{
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1;
    for &n in shape
    {
        strides.push(stride);
        stride *= n;
    }
    strides
}

#[inline]
pub fn linearize(index: &[usize], strides: &[usize]) -> usize
{
    index.iter().zip(strides).map(|(&i, &s)| i * s).sum()
}

///
/// Inverse of `linearize` for the shape the strides were built from.
///
pub fn delinearize(mut flat: usize, shape: &[usize]) -> Vec<usize>
{
    let mut index = vec![0; shape.len()];
    for (i, &n) in index.iter_mut().zip(shape)
    {
        *i = flat % n;
        flat /= n;
    }
    index
}

///
/// Advances an odometer over the box `[0, extent_d]` (inclusive) in each
/// dimension, dimension 0 fastest. Returns false once every index wrapped.
///
#[inline]
pub fn advance_odometer(offsets: &mut [usize], extents: impl Fn(usize) -> usize) -> bool
{
    for (d, offset) in offsets.iter_mut().enumerate()
    {
        *offset += 1;
        if *offset <= extents(d)
        {
            return true;
        }
        *offset = 0;
    }
    false
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn strides_put_first_dimension_fastest()
    {
        let shape = [4, 3, 2];
        let strides = lattice_strides(&shape);
        assert_eq!(strides, vec![1, 4, 12]);
        assert_eq!(linearize(&[1, 0, 0], &strides), 1);
        assert_eq!(linearize(&[0, 1, 0], &strides), 4);
        assert_eq!(linearize(&[3, 2, 1], &strides), 23);
    }

    #[test]
    fn delinearize_inverts_linearize()
    {
        let shape = [5, 7, 3];
        let strides = lattice_strides(&shape);
        for flat in 0..shape.iter().product()
        {
            assert_eq!(linearize(&delinearize(flat, &shape), &strides), flat);
        }
    }

    #[test]
    fn odometer_visits_every_offset_once()
    {
        let mut offsets = [0_usize; 3];
        let mut visited = 1;
        while advance_odometer(&mut offsets, |d| d + 1)
        {
            visited += 1;
        }
        assert_eq!(visited, 2 * 3 * 4);
        assert_eq!(offsets, [0, 0, 0]);
    }
}

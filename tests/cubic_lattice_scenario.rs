use mfa_eval::{decoder::{state::DecodeState, Decoder}, mesh::{knot_mesh::KnotMesh, mfa_data::MfaData}, serialization::mfab::{load_control_points, load_mfab, save_control_points, save_legacy_mfab, save_mfab}};
use tempfile::tempdir;

const DEGREE: usize = 2;
const KNOTS: usize = 79;
const SIDE: usize = KNOTS - DEGREE - 1;

fn field(x: &[f32], out: &mut [f32])
{
    out[0] = (2.0 * x[0]).sin() * (3.0 * x[1]).cos() + x[2] * x[2];
}

fn build_model() -> MfaData<f32>
{
    let mesh = KnotMesh::<f32>::uniform(&[DEGREE; 3], &[SIDE; 3]).unwrap();
    MfaData::sample_at_greville(mesh, 1, field).unwrap()
}

fn central_difference(decoder: &Decoder<f64>, state: &mut DecodeState<f64>, param: [f64; 3], dim: usize, eps: f64) -> f64
{
    let (mut plus, mut minus) = (param, param);
    plus[dim] += eps;
    minus[dim] -= eps;
    let (mut hi, mut lo) = ([0.0], [0.0]);
    decoder.evaluate_point(&plus, state, &mut hi).unwrap();
    decoder.evaluate_point(&minus, state, &mut lo).unwrap();
    (hi[0] - lo[0]) / (2.0 * eps)
}

#[test]
fn shape_follows_knot_count()
{
    let mfa = build_model();
    for d in 0..3
    {
        assert_eq!(mfa.knot_mesh().knots(d).len(), KNOTS);
        assert_eq!(mfa.knot_mesh().num_control_points(d), KNOTS - DEGREE - 1);
    }
    assert_eq!(mfa.tensor(0).unwrap().len(), SIDE * SIDE * SIDE);
}

#[test]
fn value_and_gradient_at_interior_point()
{
    let mfa = build_model();
    let decoder = mfa.decoder(0).unwrap();
    let mut state = decoder.create_state();
    let mut value = [0.0_f32];
    let mut grad = [0.0_f32; 3];
    decoder.evaluate_point(&[0.3, 0.3, 0.3], &mut state, &mut value).unwrap();
    decoder.evaluate_gradient(&[0.3, 0.3, 0.3], &mut state, &mut grad).unwrap();
    assert!(value[0].is_finite());
    assert!(grad.iter().all(|g| g.is_finite()));

    let mut expected = [0.0_f32];
    field(&[0.3, 0.3, 0.3], &mut expected);
    assert!((value[0] - expected[0]).abs() < 5e-3);
}

#[test]
fn gradient_matches_central_differences()
{
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.mfab");
    save_mfab(&path, &build_model(), 0).unwrap();
    // the f32 payload widened to f64 keeps the finite differences clear of rounding noise
    let mfa: MfaData<f64> = load_mfab(&path).unwrap();
    let decoder = mfa.decoder(0).unwrap();
    let mut state = decoder.create_state();
    let param = [0.3, 0.3, 0.3];
    let mut grad = [0.0; 3];
    decoder.evaluate_gradient(&param, &mut state, &mut grad).unwrap();
    for (dim, &g) in grad.iter().enumerate()
    {
        let coarse = (central_difference(&decoder, &mut state, param, dim, 5e-2) - g).abs();
        let fine = (central_difference(&decoder, &mut state, param, dim, 1e-3) - g).abs();
        let finer = (central_difference(&decoder, &mut state, param, dim, 1e-4) - g).abs();
        assert!(fine <= coarse + 1e-9, "dim {dim}: {fine} > {coarse}");
        assert!(fine < 1e-6 * (1.0 + g.abs()), "dim {dim}: {fine}");
        assert!(finer < 1e-5 * (1.0 + g.abs()), "dim {dim}: {finer}");
    }
}

#[test]
fn legacy_file_roundtrip_reproduces_verification_entries()
{
    let mfa = build_model();
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.mfab");
    save_legacy_mfab(&path, &mfa, 0).unwrap();
    let size = std::fs::metadata(&path).unwrap().len() as usize;
    assert_eq!(size, (1 + 1 + 3 * KNOTS + SIDE * SIDE * SIDE) * 4);

    let restored: MfaData<f32> = load_mfab(&path).unwrap();
    assert_eq!(restored.knot_mesh().degrees(), &[DEGREE; 3]);
    assert_eq!(restored.knot_mesh().all_knots()[1][34].to_bits(), mfa.knot_mesh().all_knots()[1][34].to_bits());
    let (before, after) = (mfa.tensor(0).unwrap().ctrl_pts(), restored.tensor(0).unwrap().ctrl_pts());
    assert_eq!(before.len(), after.len());
    for i in [0, 100_000, before.len() - 1]
    {
        assert_eq!(before[i].to_bits(), after[i].to_bits(), "control point {i}");
    }
    assert_eq!(restored, mfa);
}

#[test]
fn self_describing_and_control_point_files_roundtrip()
{
    let mfa = build_model();
    let dir = tempdir().unwrap();
    let mfab = dir.path().join("model.mfab");
    let cpts = dir.path().join("test.cpts");
    save_mfab(&mfab, &mfa, 0).unwrap();
    save_control_points(&cpts, mfa.tensor(0).unwrap().ctrl_pts()).unwrap();

    let restored: MfaData<f32> = load_mfab(&mfab).unwrap();
    assert_eq!(restored, mfa);
    let ctrl_pts: Vec<f32> = load_control_points(&cpts, Some(SIDE * SIDE * SIDE)).unwrap();
    assert_eq!(ctrl_pts.as_slice(), mfa.tensor(0).unwrap().ctrl_pts());
    assert!(load_control_points::<f32, _>(&cpts, Some(SIDE * SIDE)).is_err());
    assert!(load_mfab::<f32, _>(dir.path().join("missing.mfab")).is_err());
}

use mfa_eval::{errors::MfaError, mesh::{knot_mesh::KnotMesh, mfa_data::MfaData}, serialization::mfab::{load_control_points, load_mfab, save_control_points, save_legacy_mfab}};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEGREE: usize = 2;
const KNOTS: usize = 79;

fn main() -> Result<(), MfaError>
{
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    // 79 knots per dimension gives a 76^3 control lattice
    let side = KNOTS - DEGREE - 1;
    let mesh = KnotMesh::<f32>::uniform(&[DEGREE; 3], &[side; 3])?;
    let mfa: MfaData<f32> = MfaData::sample_at_greville(mesh, 1, |x, out| out[0] = (2.0 * x[0]).sin() * (3.0 * x[1]).cos() + x[2] * x[2])?;

    let decoder = mfa.decoder(0)?;
    let mut state = decoder.create_state();
    let param = [0.3, 0.3, 0.3];
    let mut value = [0.0_f32];
    let mut grad = [0.0_f32; 3];
    decoder.evaluate_point(&param, &mut state, &mut value)?;
    decoder.evaluate_gradient(&param, &mut state, &mut grad)?;
    info!(?param, value = value[0], ?grad, "evaluated model");

    let ctrl_pts = mfa.tensor(0)?.ctrl_pts();
    let last = ctrl_pts.len() - 1;
    info!(knot = mfa.knot_mesh().all_knots()[1][34], first = ctrl_pts[0], middle = ctrl_pts[100_000], last = ctrl_pts[last], "verification entries");

    save_legacy_mfab("test.mfab", &mfa, 0)?;
    save_control_points("test.cpts", ctrl_pts)?;

    let restored: MfaData<f32> = load_mfab("test.mfab")?;
    let restored_pts: Vec<f32> = load_control_points("test.cpts", Some(ctrl_pts.len()))?;
    let restored_ctrl = restored.tensor(0)?.ctrl_pts();
    info!(
        knot = restored.knot_mesh().all_knots()[1][34],
        first = restored_ctrl[0],
        middle = restored_ctrl[100_000],
        last = restored_ctrl[last],
        cpts_match = restored_pts.as_slice() == ctrl_pts,
        "read back model"
    );
    Ok(())
}

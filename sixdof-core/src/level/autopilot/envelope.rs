//! Envelope limiting: alpha/beta ceilings and the 1-g hold bias,
//! recomputed before every controller pass.

use math::Angle;

use super::{CommonController, ControllerCtx};

/// Recomputes `limited_min_alpha`, `limited_max_alpha`, `limited_beta`
/// and the g-bias for the current state.
pub(super) fn calc_alpha_beta_g_limits(ctl: &mut CommonController, ctx: &ControllerCtx<'_>) {
    calc_g_bias(ctl, ctx);

    let state = ctx.state;
    let limits = &ctl.current_limits;

    let alpha_min = limits.alpha_min;
    let alpha_max = limits.alpha_max;

    let alpha_at_max_g = ctl.aero.alpha_at_gload(
        limits.pitch_gload_max,
        state.mach,
        state.dynamic_pressure_psf,
        ctx.vehicle.mass_lbm,
        ctx.vehicle.wing_area_ft2,
    );
    let alpha_at_min_g = ctl.aero.alpha_at_gload(
        limits.pitch_gload_min,
        state.mach,
        state.dynamic_pressure_psf,
        ctx.vehicle.mass_lbm,
        ctx.vehicle.wing_area_ft2,
    );

    ctl.limited_max_alpha = match alpha_at_max_g {
        Some(alpha) if alpha < alpha_max => alpha,
        _ => alpha_max,
    };
    ctl.limited_min_alpha = match alpha_at_min_g {
        Some(alpha) if alpha > alpha_min => alpha,
        _ => alpha_min,
    };

    if ctl.limited_max_alpha < ctl.limited_min_alpha {
        ctl.limited_min_alpha = ctl.limited_max_alpha;
    }

    let beta_max = limits.beta_max;
    ctl.limited_beta = if ctl.control_method.is_yaw_to_turn() {
        match ctl.aero.beta_at_gload(limits.yaw_gload_max) {
            Some(beta) => beta.abs().min(beta_max),
            None => beta_max,
        }
    } else {
        beta_max
    };
}

/// The load factor (and equivalent alpha) that holds one g of vertical
/// acceleration at the current pitch and roll.
fn calc_g_bias(ctl: &mut CommonController, ctx: &ControllerCtx<'_>) {
    let state = ctx.state;
    let limits = &ctl.current_limits;

    let cos_roll = state.roll.cos();
    let mut g_bias = if cos_roll == 0.0 { limits.pitch_gload_max } else { 1.0 / cos_roll };

    g_bias *= state.pitch.cos();
    g_bias = g_bias.clamp(limits.pitch_gload_min, limits.pitch_gload_max);

    ctl.g_bias = g_bias;
    ctl.g_bias_alpha = ctl.aero.alpha_at_gload(
        g_bias,
        state.mach,
        state.dynamic_pressure_psf,
        ctx.vehicle.mass_lbm,
        ctx.vehicle.wing_area_ft2,
    );
}

impl CommonController {
    /// Feed-forward alpha of the 1-g hold, in degrees; zero when the
    /// aerodynamic tables cannot resolve it.
    pub(super) fn g_bias_alpha_deg(&self) -> f64 {
        self.g_bias_alpha.map_or(0.0, Angle::into_degrees)
    }
}

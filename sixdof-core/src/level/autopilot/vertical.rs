//! Vertical channel cascades. Shared by both control families.

use math::{Angle, AngularSpeed, Length, STANDARD_GRAVITY_FPS2, Speed};

use super::super::route;
use super::{CommonController, ControllerCtx, VerticalMode};

impl CommonController {
    pub(super) fn process_vertical_channel(&mut self, ctx: &ControllerCtx<'_>) {
        match ctx.action.vertical {
            VerticalMode::Waypoint => self.vertical_waypoint(ctx),
            VerticalMode::Altitude(altitude) => self.standard_altitude(ctx, altitude),
            VerticalMode::VertSpeed(rate) => self.standard_vert_speed(ctx, rate),
            VerticalMode::Point(_) => {
                // Point mode has no vertical law yet; the last stick
                // command holds.
            }
            VerticalMode::PitchGLoad(gload) => self.vertical_pitch_gload(ctx, gload),
            VerticalMode::PitchAng(pitch) => self.vertical_pitch_angle(ctx, pitch),
            VerticalMode::PitchRate(rate) => self.vertical_pitch_rate(ctx, rate),
            VerticalMode::FltPathAng(angle) => self.vertical_flight_path_angle(ctx, angle),
            VerticalMode::DeltaPitch(delta) => self.vertical_delta_pitch(ctx, delta),
            VerticalMode::Alpha(alpha) => self.standard_alpha(ctx, alpha),
            VerticalMode::Undefined => self.vertical_no_control(),
        }
    }

    fn vertical_no_control(&mut self) { self.controls.stick_back = 0.0; }

    /// Waypoint vertical law: follow the leg's altitude profile when the
    /// waypoint asks for it, otherwise capture the waypoint altitude.
    fn vertical_waypoint(&mut self, ctx: &ControllerCtx<'_>) {
        let Some(nav) = ctx.resolve_nav() else {
            // No route installed: hold the current altitude.
            let altitude = ctx.state.position.alt;
            self.standard_altitude(ctx, altitude);
            return;
        };

        let Some(curr) = nav.curr else {
            // Route complete: hold the altitude of the final waypoint.
            let altitude =
                nav.prev.map_or(ctx.state.position.alt, |prev| prev.position.alt);
            self.standard_altitude(ctx, altitude);
            return;
        };

        // During a turn the previous waypoint still owns the leg.
        let commanded_altitude = if !self.nav_data.execute_turn {
            curr.position.alt
        } else if let Some(prev) = nav.prev {
            prev.position.alt
        } else {
            Length::ZERO
        };

        let follows_track = nav.curr.is_some_and(|curr| curr.follow_vertical_track);
        let altitude_changes =
            nav.prev.is_some_and(|prev| prev.position.alt != curr.position.alt);

        if follows_track && altitude_changes {
            route::calc_vertical_speed(&mut self.nav_data);
            let rate = self.nav_data.vert_speed;
            self.standard_vert_speed(ctx, rate);
        } else {
            self.standard_altitude(ctx, commanded_altitude);
        }
    }

    fn vertical_pitch_gload(&mut self, ctx: &ControllerCtx<'_>, gload: f64) {
        let alpha = crate::try_log!(
            self.alpha_at_gload(ctx, gload),
            expect "alpha table resolves the commanded {} g" (gload)
            or self.last_commanded_alpha
        );
        self.standard_alpha(ctx, alpha);
    }

    fn vertical_pitch_angle(&mut self, ctx: &ControllerCtx<'_>, pitch: Angle) {
        let dt = ctx.dt_sec();

        let mut commanded_alpha = self.last_commanded_alpha;

        if self.vertical_gate.execute_middle {
            let commanded_pitch = pitch.clamp(-Angle::RIGHT, Angle::RIGHT);

            self.pids.pitch_angle.set_bias(self.g_bias_alpha_deg());

            commanded_alpha =
                Angle::from_degrees(self.pids.pitch_angle.update_to_target_limited(
                    commanded_pitch.into_degrees(),
                    ctx.state.pitch.into_degrees(),
                    dt,
                    self.limited_min_alpha.into_degrees(),
                    self.limited_max_alpha.into_degrees(),
                ));
        }

        self.standard_alpha(ctx, commanded_alpha);
    }

    fn vertical_pitch_rate(&mut self, ctx: &ControllerCtx<'_>, rate: AngularSpeed) {
        let dt = ctx.dt_sec();

        let mut commanded_alpha = self.last_commanded_alpha;

        if self.vertical_gate.execute_middle {
            let commanded_rate = rate
                .clamp(self.current_limits.pitch_rate_min, self.current_limits.pitch_rate_max);

            // Feed forward the alpha of the acceleration this rate implies,
            // plus one g to stay level for the bank-to-turn family.
            let speed_fps = ctx.state.speed.into_fps();
            let mut target_accel_g =
                speed_fps * commanded_rate.into_radians_per_sec() / STANDARD_GRAVITY_FPS2;
            if self.control_method.is_bank_to_turn() {
                target_accel_g += 1.0;
            }
            if let Some(ff_alpha) = self.alpha_at_gload(ctx, target_accel_g) {
                self.pids.pitch_rate.set_bias(ff_alpha.into_degrees());
            }

            commanded_alpha = Angle::from_degrees(self.pids.pitch_rate.update_to_target_limited(
                commanded_rate.into_degrees_per_sec(),
                ctx.state.pitch_rate.into_degrees_per_sec(),
                dt,
                self.limited_min_alpha.into_degrees(),
                self.limited_max_alpha.into_degrees(),
            ));
        }

        self.standard_alpha(ctx, commanded_alpha);
    }

    fn vertical_flight_path_angle(&mut self, ctx: &ControllerCtx<'_>, angle: Angle) {
        let dt = ctx.dt_sec();

        let mut commanded_alpha = self.last_commanded_alpha;

        if self.vertical_gate.execute_middle {
            let commanded_angle = angle.clamp(-Angle::RIGHT, Angle::RIGHT);

            self.pids.fltpath_angle.set_bias(self.g_bias_alpha_deg());

            commanded_alpha =
                Angle::from_degrees(self.pids.fltpath_angle.update_to_target_limited(
                    commanded_angle.into_degrees(),
                    ctx.state.flight_path_angle.into_degrees(),
                    dt,
                    self.limited_min_alpha.into_degrees(),
                    self.limited_max_alpha.into_degrees(),
                ));
        }

        self.standard_alpha(ctx, commanded_alpha);
    }

    fn vertical_delta_pitch(&mut self, ctx: &ControllerCtx<'_>, delta: Angle) {
        let dt = ctx.dt_sec();

        let mut commanded_alpha = self.last_commanded_alpha;

        if self.vertical_gate.execute_middle {
            self.pids.delta_pitch.set_bias(self.g_bias);

            commanded_alpha =
                Angle::from_degrees(self.pids.delta_pitch.update_to_target_limited(
                    delta.into_degrees(),
                    self.integrated_delta_pitch.into_degrees(),
                    dt,
                    self.limited_min_alpha.into_degrees(),
                    self.limited_max_alpha.into_degrees(),
                ));
        }

        self.standard_alpha(ctx, commanded_alpha);
    }

    pub(super) fn standard_altitude(&mut self, ctx: &ControllerCtx<'_>, altitude: Length) {
        let dt = ctx.dt_sec();

        let mut commanded_vert_rate = self.last_commanded_vert_rate;

        if self.vertical_gate.execute_outer {
            commanded_vert_rate = Speed::from_fpm(self.pids.altitude.update_to_target_limited(
                altitude.into_feet(),
                ctx.state.position.alt.into_feet(),
                dt,
                self.current_limits.vert_speed_min.into_fpm(),
                self.current_limits.vert_speed_max.into_fpm(),
            ));
        }

        self.standard_vert_speed(ctx, commanded_vert_rate);
    }

    pub(super) fn standard_vert_speed(&mut self, ctx: &ControllerCtx<'_>, rate: Speed) {
        let dt = ctx.dt_sec();

        let commanded_rate =
            rate.clamp(self.current_limits.vert_speed_min, self.current_limits.vert_speed_max);

        let mut commanded_alpha = self.last_commanded_alpha;

        if self.vertical_gate.execute_middle {
            // The 1-g hold alpha keeps the vehicle level through bank and
            // pitch while the regulator works the residual error.
            self.pids.vert_speed.set_bias(self.g_bias_alpha_deg());

            commanded_alpha = Angle::from_degrees(self.pids.vert_speed.update_to_target_limited(
                commanded_rate.into_fpm(),
                ctx.state.vert_speed.into_fpm(),
                dt,
                self.limited_min_alpha.into_degrees(),
                self.limited_max_alpha.into_degrees(),
            ));
        }

        self.standard_alpha(ctx, commanded_alpha);

        self.last_commanded_vert_rate = rate;
    }

    pub(super) fn standard_alpha(&mut self, ctx: &ControllerCtx<'_>, alpha: Angle) {
        let dt = ctx.dt_sec();

        let commanded_alpha = alpha.clamp(self.limited_min_alpha, self.limited_max_alpha);

        if let Some(stick) = self.aero.stick_for_zero_moment(
            ctx.state.mach,
            commanded_alpha,
            self.controls.throttle_military,
        ) {
            self.pids.alpha.set_feed_forward(stick);
        }

        self.controls.stick_back = self.pids.alpha.update_to_target(
            commanded_alpha.into_degrees(),
            ctx.state.alpha.into_degrees(),
            dt,
        );

        self.last_commanded_alpha = alpha;
    }

    /// Alpha that sustains the given load factor at the current flight
    /// condition; `None` when the aero tables cannot resolve it.
    fn alpha_at_gload(&self, ctx: &ControllerCtx<'_>, gload: f64) -> Option<Angle> {
        self.aero.alpha_at_gload(
            gload,
            ctx.state.mach,
            ctx.state.dynamic_pressure_psf,
            ctx.vehicle.mass_lbm,
            ctx.vehicle.wing_area_ft2,
        )
    }
}

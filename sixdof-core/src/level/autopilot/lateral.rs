//! Lateral channel cascades for both control families, plus the taxi
//! steering cascades.

use math::{Angle, AngularSpeed, GeoPoint, Heading, Length, STANDARD_GRAVITY_FPS2, Speed};

use super::super::route::{self, NavInputs};
use super::{CommonController, ControllerCtx, LateralMode};

impl CommonController {
    pub(super) fn process_lateral_channels_bank_to_turn(&mut self, ctx: &ControllerCtx<'_>) {
        if self.taxi_mode {
            match ctx.action.lateral {
                LateralMode::Waypoint => self.lateral_taxi_waypoint(ctx),
                LateralMode::Heading(heading) => self.lateral_taxi_heading(ctx, heading),
                LateralMode::YawRate(rate) => self.standard_taxi_yaw_rate(ctx, rate),
                _ => self.lateral_no_control(),
            }
            return;
        }

        let mut stabilizing_channel_is_controlled = false;

        match ctx.action.lateral {
            LateralMode::Waypoint => self.lateral_roll_waypoint(ctx),
            LateralMode::Heading(heading) => self.standard_roll_heading(ctx, heading),
            LateralMode::Point(point) => self.lateral_roll_point(ctx, point),
            LateralMode::RollRate(rate) => self.standard_roll_rate(ctx, rate),
            LateralMode::Bank(bank) => self.standard_bank(ctx, bank),
            LateralMode::DeltaRoll(delta) => self.lateral_delta_roll(ctx, delta),
            // Yaw modes here are mostly vestigial for bank-to-turn, but
            // remain available for tuning the stabilizing regulators.
            LateralMode::YawGLoad(gload) => {
                self.lateral_yaw_gload(ctx, gload);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::YawRate(rate) => {
                self.standard_yaw_rate(ctx, rate);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::Beta(beta) => {
                self.standard_beta(ctx, beta);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::Undefined => self.lateral_no_roll_control(),
        }

        if !stabilizing_channel_is_controlled {
            match ctx.action.stabilizing {
                LateralMode::YawGLoad(gload) => self.lateral_yaw_gload(ctx, gload),
                LateralMode::YawRate(rate) => self.standard_yaw_rate(ctx, rate),
                LateralMode::Beta(beta) => self.standard_beta(ctx, beta),
                LateralMode::Undefined => {
                    // In lieu of an explicit stabilizing control, use the
                    // control method's default.
                    if self.control_method == store::ControlMethod::BankToTurnWithYaw {
                        self.standard_beta(ctx, Angle::ZERO);
                    } else {
                        self.lateral_no_yaw_control();
                    }
                }
                _ => self.lateral_no_yaw_control(),
            }
        }
    }

    pub(super) fn process_lateral_channels_yaw_to_turn(&mut self, ctx: &ControllerCtx<'_>) {
        if self.taxi_mode {
            match ctx.action.lateral {
                LateralMode::Waypoint => self.lateral_taxi_waypoint(ctx),
                LateralMode::Heading(heading) => self.lateral_taxi_heading(ctx, heading),
                LateralMode::YawRate(rate) => self.standard_taxi_yaw_rate(ctx, rate),
                _ => self.lateral_no_control(),
            }
            return;
        }

        let mut stabilizing_channel_is_controlled = false;

        match ctx.action.lateral {
            LateralMode::Waypoint => self.lateral_yaw_waypoint(ctx),
            LateralMode::Heading(heading) => self.standard_yaw_heading(ctx, heading),
            LateralMode::Point(point) => self.lateral_yaw_point(ctx, point),
            LateralMode::YawGLoad(gload) => self.lateral_yaw_gload(ctx, gload),
            LateralMode::YawRate(rate) => self.standard_yaw_rate(ctx, rate),
            LateralMode::Beta(beta) => self.standard_beta(ctx, beta),
            // Roll modes here are mostly vestigial for yaw-to-turn, but
            // remain available for tuning the stabilizing regulators.
            LateralMode::RollRate(rate) => {
                self.standard_roll_rate(ctx, rate);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::Bank(bank) => {
                self.standard_bank(ctx, bank);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::DeltaRoll(delta) => {
                self.lateral_delta_roll(ctx, delta);
                stabilizing_channel_is_controlled = true;
            }
            LateralMode::Undefined => self.lateral_no_yaw_control(),
        }

        if !stabilizing_channel_is_controlled {
            match ctx.action.stabilizing {
                LateralMode::RollRate(rate) => self.standard_roll_rate(ctx, rate),
                LateralMode::Bank(bank) => self.standard_bank(ctx, bank),
                LateralMode::DeltaRoll(delta) => self.lateral_delta_roll(ctx, delta),
                LateralMode::Undefined => match self.control_method {
                    store::ControlMethod::YawToTurnRollRate => {
                        self.standard_roll_rate(ctx, AngularSpeed::ZERO);
                    }
                    store::ControlMethod::YawToTurnZeroBank => {
                        self.standard_bank(ctx, Angle::ZERO);
                    }
                    _ => self.lateral_no_roll_control(),
                },
                _ => self.lateral_no_roll_control(),
            }
        }
    }

    fn lateral_no_control(&mut self) {
        self.lateral_no_roll_control();
        self.lateral_no_yaw_control();
    }

    fn lateral_no_roll_control(&mut self) { self.controls.stick_right = 0.0; }

    fn lateral_no_yaw_control(&mut self) { self.controls.rudder_right = 0.0; }

    // Roll family --------------------------------------------------------

    fn lateral_roll_waypoint(&mut self, ctx: &ControllerCtx<'_>) {
        let heading = self.waypoint_aim_heading(ctx);
        // The navigator's bank ceiling applies on top of the configured one.
        let max_bank = self.nav_data.commanded_bank.min(self.current_limits.bank_angle_max);
        self.calc_roll_heading_core(ctx, heading, max_bank);
    }

    fn lateral_roll_point(&mut self, ctx: &ControllerCtx<'_>, point: GeoPoint) {
        let heading = ctx.state.position.initial_bearing(point);
        self.standard_roll_heading(ctx, heading);
    }

    pub(super) fn standard_roll_heading(&mut self, ctx: &ControllerCtx<'_>, heading: Heading) {
        let max_bank = self.current_limits.bank_angle_max;
        self.calc_roll_heading_core(ctx, heading, max_bank);
    }

    /// Heading-to-bank geometry of the roll-heading cascade.
    ///
    /// The outer loop turns heading error into a turn-rate command, then
    /// converts the turn rate into a bank angle through the level-turn
    /// relation v^2/(R*g), corrected for pitch attitude and clamped to
    /// the bank ceiling.
    fn calc_roll_heading_core(
        &mut self,
        ctx: &ControllerCtx<'_>,
        heading: Heading,
        mut max_bank: Angle,
    ) {
        let state = ctx.state;
        let dt = ctx.dt_sec();

        self.aim_heading = heading;

        let mut commanded_bank = self.last_commanded_bank;

        if self.lateral_gate.execute_outer {
            let epsilon = f64::EPSILON;

            if max_bank.into_radians() < epsilon {
                // Bank ceiling too small to maneuver.
                self.standard_bank(ctx, Angle::ZERO);
                return;
            }

            let hdg_error_deg = state.heading.closest_distance(heading).into_degrees();

            let max_g = self.current_limits.pitch_gload_max;
            if max_g < epsilon {
                self.standard_bank(ctx, Angle::ZERO);
                return;
            }

            let mut lateral_g;
            if max_bank > Angle::RIGHT {
                // Past 90 degrees of bank the lateral g is simply the max.
                max_bank = Angle::RIGHT;
                lateral_g = max_g;
            } else {
                // One-g vertical component.
                lateral_g = max_bank.tan();
            }

            // Pitch steepens the required lateral g, up to a 57x factor.
            let max_pitch_effect = Angle::from_degrees(89.0);
            let pitch = state.pitch.clamp(-max_pitch_effect, max_pitch_effect);
            let pitch_factor = 1.0 / pitch.cos();

            lateral_g = (lateral_g * pitch_factor).min(max_g);

            let speed_fps = state.speed.into_fps();
            let min_speed_to_consider_fps = 0.001;
            if speed_fps < min_speed_to_consider_fps {
                // Too slow to turn.
                self.standard_bank(ctx, Angle::ZERO);
                return;
            }

            let radius_ft = speed_fps * speed_fps / (STANDARD_GRAVITY_FPS2 * lateral_g);
            let circumference_ft = std::f64::consts::TAU * radius_ft;
            let time_to_circle_sec = circumference_ft / speed_fps;
            if time_to_circle_sec < epsilon {
                // Degenerate geometry: turn at the full ceiling.
                let bank = if hdg_error_deg < 0.0 { -max_bank } else { max_bank };
                self.standard_bank(ctx, bank);
                return;
            }

            let max_turn_rate_dps = 360.0 / time_to_circle_sec;

            let commanded_turn_rate_dps = self.pids.roll_heading.update_from_error_limited(
                hdg_error_deg,
                dt,
                -max_turn_rate_dps,
                max_turn_rate_dps,
            );

            if commanded_turn_rate_dps.abs() < epsilon {
                self.standard_bank(ctx, Angle::ZERO);
                return;
            }

            // Convert the commanded turn rate back into a bank angle.
            let time_to_circle_sec = 360.0 / commanded_turn_rate_dps.abs();
            let circumference_ft = time_to_circle_sec * speed_fps;
            let radius_ft = circumference_ft / std::f64::consts::TAU;
            let lateral_g = speed_fps * speed_fps / (radius_ft * STANDARD_GRAVITY_FPS2);

            let mut bank = Angle::atan2(lateral_g, pitch_factor);
            if commanded_turn_rate_dps < 0.0 {
                bank = -bank;
            }

            let bank_limit = self.current_limits.bank_angle_max;
            commanded_bank = bank.clamp(-bank_limit, bank_limit);
        }

        self.standard_bank(ctx, commanded_bank);
    }

    pub(super) fn standard_bank(&mut self, ctx: &ControllerCtx<'_>, bank: Angle) {
        let dt = ctx.dt_sec();

        let mut commanded_roll_rate = self.last_commanded_roll_rate;

        if self.lateral_gate.execute_middle {
            let bank_limit = self.current_limits.bank_angle_max;
            let commanded_bank = bank.clamp(-bank_limit, bank_limit);

            let bank_error_deg = (commanded_bank - ctx.state.roll).normalized().into_degrees();

            let rate_limit_dps = self.current_limits.roll_rate_max.into_degrees_per_sec();
            commanded_roll_rate = AngularSpeed::from_degrees_per_sec(
                self.pids.bank_angle.update_from_error_limited(
                    bank_error_deg,
                    dt,
                    -rate_limit_dps,
                    rate_limit_dps,
                ),
            );
        }

        self.standard_roll_rate(ctx, commanded_roll_rate);

        self.last_commanded_bank = bank;
    }

    pub(super) fn standard_roll_rate(&mut self, ctx: &ControllerCtx<'_>, rate: AngularSpeed) {
        let dt = ctx.dt_sec();
        self.last_commanded_roll_rate = rate;

        let limit = self.current_limits.roll_rate_max;
        let commanded = rate.clamp(-limit, limit);

        self.controls.stick_right = self.pids.roll_rate.update_to_target(
            commanded.into_degrees_per_sec(),
            ctx.state.roll_rate.into_degrees_per_sec(),
            dt,
        );
    }

    fn lateral_delta_roll(&mut self, ctx: &ControllerCtx<'_>, delta: Angle) {
        let dt = ctx.dt_sec();

        let mut commanded_roll_rate = self.last_commanded_roll_rate;

        if self.lateral_gate.execute_middle {
            let rate_limit_dps = self.current_limits.roll_rate_max.into_degrees_per_sec();
            commanded_roll_rate =
                AngularSpeed::from_degrees_per_sec(self.pids.delta_roll.update_to_target_limited(
                    delta.into_degrees(),
                    self.integrated_delta_roll.into_degrees(),
                    dt,
                    -rate_limit_dps,
                    rate_limit_dps,
                ));
        }

        self.standard_roll_rate(ctx, commanded_roll_rate);
    }

    // Yaw family ---------------------------------------------------------

    fn lateral_yaw_waypoint(&mut self, ctx: &ControllerCtx<'_>) {
        let heading = self.waypoint_aim_heading(ctx);
        self.standard_yaw_heading(ctx, heading);
    }

    fn lateral_yaw_point(&mut self, ctx: &ControllerCtx<'_>, point: GeoPoint) {
        let heading = ctx.state.position.initial_bearing(point);
        self.standard_yaw_heading(ctx, heading);
    }

    fn lateral_yaw_gload(&mut self, ctx: &ControllerCtx<'_>, gload: f64) {
        let beta = crate::try_log!(
            self.aero.beta_at_gload(gload),
            expect "beta table resolves the commanded {} g" (gload)
            or Angle::ZERO
        );
        self.standard_beta(ctx, beta);
    }

    pub(super) fn standard_yaw_heading(&mut self, ctx: &ControllerCtx<'_>, heading: Heading) {
        let dt = ctx.dt_sec();

        self.aim_heading = heading;

        let mut commanded_yaw_rate = self.last_commanded_yaw_rate;

        if self.lateral_gate.execute_outer {
            let hdg_error_deg = ctx.state.heading.closest_distance(heading).into_degrees();
            let rate_limit_dps = self.current_limits.yaw_rate_max.into_degrees_per_sec();
            commanded_yaw_rate = AngularSpeed::from_degrees_per_sec(
                self.pids.yaw_heading.update_from_error_limited(
                    hdg_error_deg,
                    dt,
                    -rate_limit_dps,
                    rate_limit_dps,
                ),
            );
        }

        self.standard_yaw_rate(ctx, commanded_yaw_rate);
    }

    pub(super) fn standard_yaw_rate(&mut self, ctx: &ControllerCtx<'_>, rate: AngularSpeed) {
        let dt = ctx.dt_sec();

        let mut commanded_beta = self.last_commanded_beta;

        let limit = self.current_limits.yaw_rate_max;
        let commanded_rate = rate.clamp(-limit, limit);

        if self.lateral_gate.execute_middle {
            if self.control_method.is_yaw_to_turn() {
                // Feed forward the sideslip that produces the commanded
                // lateral acceleration: a = v * omega.
                let speed_fps = ctx.state.speed.into_fps();
                let target_accel_g =
                    speed_fps * commanded_rate.into_radians_per_sec() / STANDARD_GRAVITY_FPS2;
                if let Some(ff_beta) = self.aero.beta_at_gload(target_accel_g) {
                    self.pids.yaw_rate.set_bias(ff_beta.into_degrees());
                }
            }

            let limited_beta_deg = self.limited_beta.into_degrees();
            let mut beta_deg = self.pids.yaw_rate.update_to_target_limited(
                commanded_rate.into_degrees_per_sec(),
                ctx.state.yaw_rate.into_degrees_per_sec(),
                dt,
                -limited_beta_deg,
                limited_beta_deg,
            );

            // Beta is opposite in sign compared to yaw rate.
            if !self.use_legacy_beta {
                beta_deg = -beta_deg;
            }

            commanded_beta = Angle::from_degrees(beta_deg);
        }

        self.standard_beta(ctx, commanded_beta);

        self.last_commanded_yaw_rate = rate;
    }

    pub(super) fn standard_beta(&mut self, ctx: &ControllerCtx<'_>, beta: Angle) {
        let dt = ctx.dt_sec();

        let commanded_beta = beta.clamp(-self.limited_beta, self.limited_beta);
        let current_beta_deg = ctx.state.beta.into_degrees();

        let yaw_to_turn = self.control_method.is_yaw_to_turn();

        if yaw_to_turn {
            // Rudder-for-zero-moment feed-forward, from the symmetric
            // control surface applied to the sideslip plane.
            if let Some(mut rudder) = self.aero.stick_for_zero_moment(
                ctx.state.mach,
                commanded_beta,
                self.controls.throttle_military,
            ) {
                if self.use_legacy_beta {
                    // Beta has opposite sense to alpha.
                    rudder = -rudder;
                }
                self.pids.beta.set_feed_forward(rudder);
            }
        }

        let output =
            self.pids.beta.update_to_target(commanded_beta.into_degrees(), current_beta_deg, dt);

        // The legacy convention emits the regulator output directly; the
        // modern one negates it (rudder command is opposite to beta).
        self.controls.rudder_right = if self.use_legacy_beta { output } else { -output };

        self.last_commanded_beta = commanded_beta;
    }

    // Taxi family --------------------------------------------------------

    fn lateral_taxi_waypoint(&mut self, ctx: &ControllerCtx<'_>) {
        let (heading, turn_rate) = self.taxi_waypoint_aim_heading(ctx);
        self.standard_taxi_heading(ctx, heading, turn_rate);
    }

    fn lateral_taxi_heading(&mut self, ctx: &ControllerCtx<'_>, heading: Heading) {
        let turn_rate = self.turn_rate_for_radius(ctx, self.desired_taxi_turn_radius);
        self.standard_taxi_heading(ctx, heading, turn_rate);
    }

    fn standard_taxi_heading(
        &mut self,
        ctx: &ControllerCtx<'_>,
        heading: Heading,
        turn_rate: AngularSpeed,
    ) {
        let dt = ctx.dt_sec();

        self.aim_heading = heading;

        let mut commanded_yaw_rate = self.last_commanded_yaw_rate;

        if self.lateral_gate.execute_middle {
            let hdg_error_deg = ctx.state.heading.closest_distance(heading).into_degrees();

            let autopilot_rate = self
                .turn_rate_for_radius(ctx, self.desired_taxi_turn_radius)
                .min(self.current_limits.taxi_yaw_rate_max);
            let max_rate = turn_rate.abs().min(autopilot_rate).into_degrees_per_sec();

            commanded_yaw_rate = AngularSpeed::from_degrees_per_sec(
                self.pids.taxi_heading.update_from_error_limited(
                    hdg_error_deg,
                    dt,
                    -max_rate,
                    max_rate,
                ),
            );
        }

        self.standard_taxi_yaw_rate(ctx, commanded_yaw_rate);
    }

    fn standard_taxi_yaw_rate(&mut self, ctx: &ControllerCtx<'_>, rate: AngularSpeed) {
        let dt = ctx.dt_sec();

        let max_rate = self
            .turn_rate_for_radius(ctx, self.desired_taxi_turn_radius)
            .min(self.current_limits.taxi_yaw_rate_max);
        let commanded = rate.clamp(-max_rate, max_rate);

        // Steering authority fades out as ground speed approaches zero.
        let speed_fps = ctx.state.speed.into_fps();
        let speed_gain = (speed_fps / 1.0).clamp(0.0, 1.0);

        let mut command = self.pids.taxi_yaw_rate.update_to_target_limited(
            commanded.into_degrees_per_sec(),
            ctx.state.yaw_rate.into_degrees_per_sec(),
            dt,
            -1.0,
            1.0,
        );
        command *= speed_gain;

        self.controls.rudder_right = command;
        self.controls.nose_wheel_steering = command;
        self.controls.nws_enabled = true;

        self.last_commanded_yaw_rate = rate;
    }

    /// Yaw rate that traces the given turn radius at the current ground
    /// speed.
    fn turn_rate_for_radius(&self, ctx: &ControllerCtx<'_>, radius: Length) -> AngularSpeed {
        let radius_ft = radius.into_feet().abs().max(0.01);
        AngularSpeed::from_radians_per_sec(ctx.state.speed.into_fps() / radius_ft)
    }

    /// Turn radius traced at the current ground speed under the given
    /// yaw rate; effectively infinite for a near-zero rate.
    fn radius_for_turn_rate(&self, ctx: &ControllerCtx<'_>, rate: AngularSpeed) -> Length {
        let rate_rps = rate.into_radians_per_sec();
        if rate_rps.abs() < 1.0e-8 {
            return Length::from_feet(1.0e10);
        }
        Length::from_feet(ctx.state.speed.into_fps() / rate_rps)
    }

    // Waypoint navigation ------------------------------------------------

    /// Runs the route navigator for the current action and returns the aim
    /// heading. Without a resolvable waypoint the last aim heading holds.
    fn waypoint_aim_heading(&mut self, ctx: &ControllerCtx<'_>) -> Heading {
        let Some(curr) = ctx.resolve_nav().and_then(|nav| nav.curr) else {
            self.nav_data.execute_turn = false;
            return self.nav_data.aim_heading;
        };
        let nav = ctx.resolve_nav().expect("nav resolved above");

        let waypoint_speed =
            route::waypoint_speed(curr.speed, curr.position.alt).max(Speed::ZERO);
        let waypoint_speed =
            if waypoint_speed.is_positive() { waypoint_speed } else { ctx.state.speed };

        let inputs = NavInputs {
            prev: nav.prev,
            curr,
            next: nav.next,
            curr_segment: nav.curr_segment,
            next_segment: nav.next_segment,
            position: ctx.state.position,
            heading: ctx.state.heading,
            speed: ctx.state.speed,
            dt: ctx.dt,
        };

        let achieved = if self.control_method.is_bank_to_turn() {
            route::calc_aim_heading_and_bank(
                &inputs,
                &mut self.nav_data,
                waypoint_speed,
                self.current_limits.turn_roll_in_multiplier,
                self.default_limits.route_allowable_angle_error,
                self.current_limits.bank_angle_max,
            )
        } else {
            route::calc_yaw_aim_heading(
                &inputs,
                &mut self.nav_data,
                self.default_limits.route_allowable_angle_error,
                self.current_limits.pitch_gload_max,
            )
        };

        if achieved {
            self.achieved_waypoint = true;
        }
        if self.nav_data.execute_turn {
            self.turning = true;
            self.turn_direction = self.nav_data.turn_direction;
        }

        self.nav_data.aim_heading
    }

    /// Taxi navigator: aim heading plus the turn rate of the desired taxi
    /// radius, rate-limited by the taxi yaw-rate ceiling.
    fn taxi_waypoint_aim_heading(&mut self, ctx: &ControllerCtx<'_>) -> (Heading, AngularSpeed) {
        let Some(curr) = ctx.resolve_nav().and_then(|nav| nav.curr) else {
            self.nav_data.execute_turn = false;
            return (self.nav_data.aim_heading, AngularSpeed::ZERO);
        };
        let nav = ctx.resolve_nav().expect("nav resolved above");

        let mut desired_radius = self.desired_taxi_turn_radius;
        let rate_limited_radius =
            self.radius_for_turn_rate(ctx, self.current_limits.taxi_yaw_rate_max);
        if desired_radius < rate_limited_radius {
            desired_radius = rate_limited_radius;
        }

        let inputs = NavInputs {
            prev: nav.prev,
            curr,
            next: nav.next,
            curr_segment: nav.curr_segment,
            next_segment: nav.next_segment,
            position: ctx.state.position,
            heading: ctx.state.heading,
            speed: ctx.state.speed,
            dt: ctx.dt,
        };

        let achieved = route::calc_taxi_aim_heading(
            &inputs,
            &mut self.nav_data,
            self.default_limits.route_allowable_angle_error,
            desired_radius,
        );
        if achieved {
            self.achieved_waypoint = true;
        }

        let turn_rate = self.turn_rate_for_radius(ctx, desired_radius);
        (self.nav_data.aim_heading, turn_rate)
    }
}

//! Speed channel: the selected regulator produces a scalar command that
//! the afterburner/speed-brake partition turns into throttle settings.

use math::{Speed, atmosphere};

use super::super::route;
use super::{CommonController, ControllerCtx, SpeedMode};

impl CommonController {
    pub(super) fn process_speed_channel(&mut self, ctx: &ControllerCtx<'_>) {
        let mut controlled = true;

        let speed_command = if self.taxi_mode {
            let command = match ctx.action.speed {
                SpeedMode::Waypoint => self.speed_taxi_waypoint(ctx),
                SpeedMode::ForwardAccel(gload) => self.standard_forward_accel(ctx, gload),
                SpeedMode::Kias(kcas) => self.speed_kias(ctx, kcas),
                SpeedMode::Ktas(ktas) => self.speed_ktas(ctx, ktas),
                SpeedMode::Mach(mach) => self.speed_mach(ctx, mach),
                SpeedMode::Fps(speed) => self.standard_speed_fps(ctx, speed),
                SpeedMode::Undefined => {
                    controlled = false;
                    0.0
                }
            };

            // On the ground a braking command engages the wheel brakes.
            if command < 0.0 {
                self.combined_wheel_braking = self.current_limits.speed_brake_threshold - command;
            }

            command
        } else {
            match ctx.action.speed {
                SpeedMode::Waypoint => self.speed_waypoint(ctx),
                SpeedMode::ForwardAccel(gload) => self.standard_forward_accel(ctx, gload),
                SpeedMode::Kias(kcas) => self.speed_kias(ctx, kcas),
                SpeedMode::Ktas(ktas) => self.speed_ktas(ctx, ktas),
                SpeedMode::Mach(mach) => self.speed_mach(ctx, mach),
                SpeedMode::Fps(speed) => self.standard_speed_fps(ctx, speed),
                SpeedMode::Undefined => {
                    controlled = false;
                    0.0
                }
            }
        };

        if controlled {
            self.partition_speed_command(speed_command);
        }
    }

    /// Splits the scalar speed command across throttle, afterburner and
    /// speed brake by the configured thresholds.
    fn partition_speed_command(&mut self, command: f64) {
        let limits = &self.current_limits;

        if limits.enable_afterburner_auto_control && command > limits.afterburner_threshold {
            self.controls.throttle_afterburner = command - limits.afterburner_threshold;
            self.controls.throttle_military = 1.0;
            self.controls.speed_brake = 0.0;
        } else if limits.enable_speed_brake_auto_control && command < limits.speed_brake_threshold
        {
            self.controls.throttle_afterburner = 0.0;
            self.controls.throttle_military = 0.0;
            self.controls.speed_brake = limits.speed_brake_threshold - command;
        } else {
            self.controls.throttle_afterburner = 0.0;
            self.controls.throttle_military = command;
            self.controls.speed_brake = 0.0;
        }
    }

    /// Speed of the waypoint being flown to; during a turn or past the end
    /// of the route, the previous waypoint's speed holds.
    fn waypoint_target_speed(&mut self, ctx: &ControllerCtx<'_>) -> Speed {
        let Some(nav) = ctx.resolve_nav() else {
            return Speed::ZERO;
        };

        // During a turn or once the route is complete, the previous
        // waypoint's speed holds.
        let spec = if self.nav_data.execute_turn {
            nav.prev.map(|prev| prev.speed)
        } else {
            nav.curr.map(|curr| curr.speed)
        };
        let Some(spec) = spec.or_else(|| nav.prev.map(|prev| prev.speed)) else {
            return Speed::ZERO;
        };

        route::waypoint_speed(spec, ctx.state.position.alt)
    }

    fn speed_waypoint(&mut self, ctx: &ControllerCtx<'_>) -> f64 {
        let target = self.waypoint_target_speed(ctx);
        self.standard_speed_fps(ctx, target)
    }

    fn speed_taxi_waypoint(&mut self, ctx: &ControllerCtx<'_>) -> f64 {
        let target = self.waypoint_target_speed(ctx).min(self.current_limits.taxi_speed_max);
        self.standard_taxi_speed_fps(ctx, target)
    }

    fn speed_kias(&mut self, ctx: &ControllerCtx<'_>, kcas: f64) -> f64 {
        let target = atmosphere::fps_from_kcas(ctx.state.position.alt, kcas);
        self.standard_speed_fps(ctx, target)
    }

    fn speed_ktas(&mut self, ctx: &ControllerCtx<'_>, ktas: f64) -> f64 {
        let target = atmosphere::fps_from_ktas(ktas);
        self.standard_speed_fps(ctx, target)
    }

    fn speed_mach(&mut self, ctx: &ControllerCtx<'_>, mach: f64) -> f64 {
        let target = atmosphere::fps_from_mach(ctx.state.position.alt, mach);
        self.standard_speed_fps(ctx, target)
    }

    /// Throttle that balances the current drag against available thrust;
    /// feed-forward of every speed regulator.
    fn throttle_bias(&self, ctx: &ControllerCtx<'_>) -> f64 {
        let state = ctx.state;
        let vehicle = ctx.vehicle;

        let drag = state.dynamic_pressure_psf * vehicle.flat_plate_area_ft2;
        let cos_alpha = state.alpha.cos();
        let max_thrust = vehicle.max_potential_thrust_lbs() * cos_alpha;
        let min_thrust = vehicle.min_potential_thrust_lbs() * cos_alpha;
        let delta_thrust = max_thrust - min_thrust;

        if drag > max_thrust {
            1.0
        } else if drag < min_thrust {
            -1.0
        } else if delta_thrust == 0.0 {
            0.0
        } else {
            (drag - min_thrust) / delta_thrust
        }
    }

    fn standard_speed_fps(&mut self, ctx: &ControllerCtx<'_>, target: Speed) -> f64 {
        let dt = ctx.dt_sec();

        self.pids.speed.set_bias(self.throttle_bias(ctx));

        self.pids.speed.update_to_target_limited(
            target.into_fps(),
            ctx.state.speed.into_fps(),
            dt,
            -1.0,
            2.0,
        )
    }

    fn standard_taxi_speed_fps(&mut self, ctx: &ControllerCtx<'_>, target: Speed) -> f64 {
        let dt = ctx.dt_sec();

        self.pids.taxi_speed.set_bias(self.throttle_bias(ctx));

        self.pids.taxi_speed.update_to_target_limited(
            target.into_fps(),
            ctx.state.speed.into_fps(),
            dt,
            -1.0,
            2.0,
        )
    }

    fn standard_forward_accel(&mut self, ctx: &ControllerCtx<'_>, gload: f64) -> f64 {
        let dt = ctx.dt_sec();

        self.pids.forward_accel.set_bias(self.throttle_bias(ctx));

        let commanded = gload
            .clamp(self.current_limits.forward_accel_min, self.current_limits.forward_accel_max);

        self.pids.forward_accel.update_to_target(commanded, ctx.state.nx, dt)
    }
}

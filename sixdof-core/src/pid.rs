//! PID regulators with scheduled gains.
//!
//! Every regulator of the common controller is an instance of [`Pid`]:
//! a PID with a gain table keyed by a *controlling value* (dynamic
//! pressure), optional derivative filtering, and a selection of
//! anti-windup techniques enabled per-PID by [`PidFlags`].

use bitflags::bitflags;

#[cfg(test)]
mod tests;

bitflags! {
    /// Packed feature byte of one PID.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PidFlags: u8 {
        /// Low-pass filter the derivative with the row's alpha.
        const USE_ALPHA = 0x01;
        /// Clamp the accumulator to the row's max-accum magnitude.
        const LIMIT_MAX = 0x02;
        /// Freeze the accumulator while |error| exceeds the row's threshold.
        const ZERO_GT_MAX = 0x04;
        /// Freeze the accumulator while |error| is below the row's threshold.
        const ZERO_LT_MIN = 0x08;
        /// Back-calculate an effective Ki from output saturation.
        const USE_KT = 0x10;
        /// Clear the accumulator when (re)loading gain data.
        const CLEAR_ACCUM = 0x20;
    }
}

/// One fully-resolved row of a gain table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GainRow {
    /// Controlling value at which this row applies.
    pub control_value: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Accumulator clamp magnitude (`LIMIT_MAX`).
    pub max_accum: f64,
    /// Derivative filter alpha (`USE_ALPHA`).
    pub lowpass_alpha: f64,
    /// Large-error accumulation freeze threshold (`ZERO_GT_MAX`).
    pub max_error_zero: f64,
    /// Small-error accumulation freeze threshold (`ZERO_LT_MIN`).
    pub min_error_zero: f64,
    /// Back-calculation gain (`USE_KT`).
    pub kt: f64,
}

impl GainRow {
    /// A scalar-gain row, placed at controlling value zero.
    #[must_use]
    pub fn scalar(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, ..Self::default() }
    }

    fn lerp(self, other: Self, fraction: f64) -> Self {
        let f = |a: f64, b: f64| a + (b - a) * fraction;
        Self {
            control_value: f(self.control_value, other.control_value),
            kp: f(self.kp, other.kp),
            ki: f(self.ki, other.ki),
            kd: f(self.kd, other.kd),
            max_accum: f(self.max_accum, other.max_accum),
            lowpass_alpha: f(self.lowpass_alpha, other.lowpass_alpha),
            max_error_zero: f(self.max_error_zero, other.max_error_zero),
            min_error_zero: f(self.min_error_zero, other.min_error_zero),
            kt: f(self.kt, other.kt),
        }
    }
}

/// An ordered gain table.
///
/// Rows are strictly increasing in controlling value; a single-row table
/// collapses to scalar gains, and sampling clamps outside the endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GainTable {
    rows: Vec<GainRow>,
}

/// Rejection reasons for a gain table.
#[derive(Debug, thiserror::Error)]
pub enum GainTableError {
    #[error("gain table control values must be strictly increasing ({prev} then {next})")]
    NotIncreasing { prev: f64, next: f64 },
}

impl GainTable {
    /// Builds a table after checking the monotonicity invariant.
    pub fn new(rows: Vec<GainRow>) -> Result<Self, GainTableError> {
        for pair in rows.windows(2) {
            let [prev, next] = pair else { unreachable!() };
            if next.control_value <= prev.control_value {
                return Err(GainTableError::NotIncreasing {
                    prev: prev.control_value,
                    next: next.control_value,
                });
            }
        }
        Ok(Self { rows })
    }

    /// Builds a single-row (scalar) table.
    #[must_use]
    pub fn scalar(row: GainRow) -> Self { Self { rows: vec![row] } }

    #[must_use]
    pub fn rows(&self) -> &[GainRow] { &self.rows }

    /// Samples the table at `controlling_value`.
    ///
    /// Linear interpolation between the bracketing rows, clamped at the
    /// endpoints. An empty table samples to all-zero gains.
    #[must_use]
    pub fn sample(&self, controlling_value: f64) -> GainRow {
        let Some((first, rest)) = self.rows.split_first() else {
            return GainRow::default();
        };
        if rest.is_empty() || controlling_value <= first.control_value {
            return *first;
        }

        let last = rest.last().expect("rest is non-empty");
        if controlling_value >= last.control_value {
            return *last;
        }

        for pair in self.rows.windows(2) {
            let [low, high] = pair else { unreachable!() };
            if controlling_value < high.control_value {
                let fraction = (controlling_value - low.control_value)
                    / (high.control_value - low.control_value);
                return low.lerp(*high, fraction);
            }
        }

        *last
    }
}

/// A PID regulator with scheduled gains.
#[derive(Debug, Clone, Default)]
pub struct Pid {
    set_point: f64,
    current_value: f64,
    current_error: f64,
    current_deriv: f64,
    last_error: f64,
    last_derivative: f64,
    error_accum: f64,
    prelimited_output: f64,
    output: f64,

    kp_contrib: f64,
    ki_contrib: f64,
    kd_contrib: f64,

    bias_active: bool,
    bias: f64,

    controlling_value: f64,

    flags: PidFlags,
    gains: GainTable,
}

/// Observable state of one PID after an update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTelemetry {
    pub set_point: f64,
    pub current_value: f64,
    pub kp_contrib: f64,
    pub ki_contrib: f64,
    pub kd_contrib: f64,
    pub feed_forward: f64,
    pub feed_forward_active: bool,
    pub output_prelimited: f64,
    pub output_limited: f64,
    pub error_accum: f64,
}

impl Pid {
    #[must_use]
    pub fn new(gains: GainTable, flags: PidFlags) -> Self {
        Self { gains, flags, ..Self::default() }
    }

    /// Replaces the gain data, clearing the accumulator when the
    /// `CLEAR_ACCUM` flag is set in `flags`.
    pub fn set_gain_data(&mut self, gains: GainTable, flags: PidFlags) {
        if flags.contains(PidFlags::CLEAR_ACCUM) {
            self.error_accum = 0.0;
        }
        self.flags = flags - PidFlags::CLEAR_ACCUM;
        self.gains = gains;
    }

    #[must_use]
    pub fn flags(&self) -> PidFlags { self.flags }

    #[must_use]
    pub fn gains(&self) -> &GainTable { &self.gains }

    #[must_use]
    pub fn gains_mut(&mut self) -> &mut GainTable { &mut self.gains }

    /// Sets the scheduling input sampled on the next update.
    pub fn set_controlling_value(&mut self, controlling_value: f64) {
        self.controlling_value = controlling_value;
    }

    /// Installs a feed-forward added to the output before limiting.
    pub fn set_feed_forward(&mut self, feed_forward: f64) {
        self.bias_active = true;
        self.bias = feed_forward;
    }

    /// Same operation as [`Self::set_feed_forward`]; the two names mirror
    /// how the term is used (additive bias vs. model feed-forward).
    pub fn set_bias(&mut self, bias: f64) { self.set_feed_forward(bias); }

    #[must_use]
    pub fn feed_forward(&self) -> Option<f64> { self.bias_active.then_some(self.bias) }

    /// Regulates `current` towards `set_point` with the output clamped to
    /// `[min_output, max_output]`.
    pub fn update_to_target_limited(
        &mut self,
        set_point: f64,
        current: f64,
        dt_sec: f64,
        min_output: f64,
        max_output: f64,
    ) -> f64 {
        self.current_value = current;
        self.set_point = set_point;
        self.current_error = set_point - current;
        self.run(dt_sec, min_output, max_output, true)
    }

    /// Regulates `current` towards `set_point` without output limiting.
    pub fn update_to_target(&mut self, set_point: f64, current: f64, dt_sec: f64) -> f64 {
        self.current_value = current;
        self.set_point = set_point;
        self.current_error = set_point - current;
        self.run(dt_sec, 0.0, 0.0, false)
    }

    /// Regulates a pre-computed error towards zero with output limits.
    pub fn update_from_error_limited(
        &mut self,
        error: f64,
        dt_sec: f64,
        min_output: f64,
        max_output: f64,
    ) -> f64 {
        self.set_point = error;
        self.current_error = error;
        self.run(dt_sec, min_output, max_output, true)
    }

    /// Regulates a pre-computed error towards zero without output limits.
    pub fn update_from_error(&mut self, error: f64, dt_sec: f64) -> f64 {
        self.set_point = error;
        self.current_error = error;
        self.run(dt_sec, 0.0, 0.0, false)
    }

    fn run(&mut self, dt_sec: f64, min_output: f64, max_output: f64, use_limits: bool) -> f64 {
        if dt_sec <= 0.0 {
            // The caller violated the positive-dt contract; hold the latch.
            return self.output;
        }

        let gains = self.gains.sample(self.controlling_value);

        let raw_derivative = (self.current_error - self.last_error) / dt_sec;
        self.current_deriv = if self.flags.contains(PidFlags::USE_ALPHA) {
            gains.lowpass_alpha * raw_derivative
                + (1.0 - gains.lowpass_alpha) * self.last_derivative
        } else {
            raw_derivative
        };

        let mut allow_accumulation = true;
        if self.flags.contains(PidFlags::ZERO_GT_MAX)
            && self.current_error.abs() > gains.max_error_zero
        {
            allow_accumulation = false;
        }
        if self.flags.contains(PidFlags::ZERO_LT_MIN)
            && self.current_error.abs() < gains.min_error_zero
        {
            allow_accumulation = false;
        }

        // Back-calculation: feed the limiting error into the integral gain.
        let effective_ki = if self.flags.contains(PidFlags::USE_KT) {
            gains.ki + gains.kt * (self.output - self.prelimited_output)
        } else {
            gains.ki
        };

        if allow_accumulation {
            self.error_accum += self.current_error * dt_sec;
        }

        if self.flags.contains(PidFlags::LIMIT_MAX) {
            self.error_accum = self.error_accum.clamp(-gains.max_accum, gains.max_accum);
        }

        self.kp_contrib = gains.kp * self.current_error;
        self.ki_contrib = effective_ki * self.error_accum;
        self.kd_contrib = gains.kd * self.current_deriv;

        self.prelimited_output =
            self.kp_contrib + self.ki_contrib + self.kd_contrib + self.bias;

        self.output = if use_limits {
            self.prelimited_output.clamp(min_output, max_output)
        } else {
            self.prelimited_output
        };

        self.last_error = self.current_error;
        self.last_derivative = raw_derivative;

        self.output
    }

    /// Clears every piece of dynamic state, keeping gains and flags.
    pub fn reset(&mut self) {
        self.set_point = 0.0;
        self.current_value = 0.0;
        self.current_error = 0.0;
        self.current_deriv = 0.0;
        self.last_error = 0.0;
        self.last_derivative = 0.0;
        self.error_accum = 0.0;
        self.prelimited_output = 0.0;
        self.output = 0.0;
        self.kp_contrib = 0.0;
        self.ki_contrib = 0.0;
        self.kd_contrib = 0.0;
    }

    #[must_use]
    pub fn output(&self) -> f64 { self.output }

    #[must_use]
    pub fn error_accum(&self) -> f64 { self.error_accum }

    #[must_use]
    pub fn telemetry(&self) -> PidTelemetry {
        PidTelemetry {
            set_point: self.set_point,
            current_value: self.current_value,
            kp_contrib: self.kp_contrib,
            ki_contrib: self.ki_contrib,
            kd_contrib: self.kd_contrib,
            feed_forward: self.bias,
            feed_forward_active: self.bias_active,
            output_prelimited: self.prelimited_output,
            output_limited: self.output,
            error_accum: self.error_accum,
        }
    }
}

/// Identity of each regulator in a [`PidGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum PidKind {
    Alpha,
    VertSpeed,
    PitchAngle,
    PitchRate,
    FltPathAngle,
    DeltaPitch,
    Altitude,
    Beta,
    YawRate,
    YawHeading,
    TaxiHeading,
    RollRate,
    DeltaRoll,
    BankAngle,
    RollHeading,
    ForwardAccel,
    Speed,
    TaxiForwardAccel,
    TaxiSpeed,
    TaxiYawRate,
}

/// The twenty regulators owned by one common controller.
#[derive(Debug, Clone, Default)]
pub struct PidGroup {
    pub alpha: Pid,
    pub vert_speed: Pid,
    pub pitch_angle: Pid,
    pub pitch_rate: Pid,
    pub fltpath_angle: Pid,
    pub delta_pitch: Pid,
    pub altitude: Pid,
    pub beta: Pid,
    pub yaw_rate: Pid,
    pub yaw_heading: Pid,
    pub taxi_heading: Pid,
    pub roll_rate: Pid,
    pub delta_roll: Pid,
    pub bank_angle: Pid,
    pub roll_heading: Pid,
    pub forward_accel: Pid,
    pub speed: Pid,
    pub taxi_forward_accel: Pid,
    pub taxi_speed: Pid,
    pub taxi_yaw_rate: Pid,
}

impl PidGroup {
    #[must_use]
    pub fn get(&self, kind: PidKind) -> &Pid {
        match kind {
            PidKind::Alpha => &self.alpha,
            PidKind::VertSpeed => &self.vert_speed,
            PidKind::PitchAngle => &self.pitch_angle,
            PidKind::PitchRate => &self.pitch_rate,
            PidKind::FltPathAngle => &self.fltpath_angle,
            PidKind::DeltaPitch => &self.delta_pitch,
            PidKind::Altitude => &self.altitude,
            PidKind::Beta => &self.beta,
            PidKind::YawRate => &self.yaw_rate,
            PidKind::YawHeading => &self.yaw_heading,
            PidKind::TaxiHeading => &self.taxi_heading,
            PidKind::RollRate => &self.roll_rate,
            PidKind::DeltaRoll => &self.delta_roll,
            PidKind::BankAngle => &self.bank_angle,
            PidKind::RollHeading => &self.roll_heading,
            PidKind::ForwardAccel => &self.forward_accel,
            PidKind::Speed => &self.speed,
            PidKind::TaxiForwardAccel => &self.taxi_forward_accel,
            PidKind::TaxiSpeed => &self.taxi_speed,
            PidKind::TaxiYawRate => &self.taxi_yaw_rate,
        }
    }

    #[must_use]
    pub fn get_mut(&mut self, kind: PidKind) -> &mut Pid {
        match kind {
            PidKind::Alpha => &mut self.alpha,
            PidKind::VertSpeed => &mut self.vert_speed,
            PidKind::PitchAngle => &mut self.pitch_angle,
            PidKind::PitchRate => &mut self.pitch_rate,
            PidKind::FltPathAngle => &mut self.fltpath_angle,
            PidKind::DeltaPitch => &mut self.delta_pitch,
            PidKind::Altitude => &mut self.altitude,
            PidKind::Beta => &mut self.beta,
            PidKind::YawRate => &mut self.yaw_rate,
            PidKind::YawHeading => &mut self.yaw_heading,
            PidKind::TaxiHeading => &mut self.taxi_heading,
            PidKind::RollRate => &mut self.roll_rate,
            PidKind::DeltaRoll => &mut self.delta_roll,
            PidKind::BankAngle => &mut self.bank_angle,
            PidKind::RollHeading => &mut self.roll_heading,
            PidKind::ForwardAccel => &mut self.forward_accel,
            PidKind::Speed => &mut self.speed,
            PidKind::TaxiForwardAccel => &mut self.taxi_forward_accel,
            PidKind::TaxiSpeed => &mut self.taxi_speed,
            PidKind::TaxiYawRate => &mut self.taxi_yaw_rate,
        }
    }

    /// Broadcasts the scheduling input to every regulator.
    pub fn set_controlling_value(&mut self, controlling_value: f64) {
        self.for_each_mut(|pid| pid.set_controlling_value(controlling_value));
    }

    /// Clears the dynamic state of every regulator.
    pub fn reset_all(&mut self) {
        self.for_each_mut(Pid::reset);
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut Pid)) {
        use strum::IntoEnumIterator;
        for kind in PidKind::iter() {
            f(self.get_mut(kind));
        }
    }
}

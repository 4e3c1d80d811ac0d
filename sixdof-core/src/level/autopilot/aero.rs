//! Aerodynamic lookup tables consumed for feed-forward and envelope
//! limiting.
//!
//! Any table left empty in the configuration disables the lookups
//! depending on it; callers degrade to configuration limits or drop the
//! feed-forward.

use math::Angle;

/// A validated one-dimensional lookup: linear interpolation, endpoint
/// clamping, strictly increasing breakpoints.
#[derive(Debug, Clone, Default)]
pub struct Lookup1 {
    points: Vec<(f64, f64)>,
}

/// Rejection reasons for a support curve or table.
#[derive(Debug, thiserror::Error)]
pub enum SupportTableError {
    #[error("support table {table}: breakpoints must be strictly increasing ({prev} then {next})")]
    NotIncreasing { table: &'static str, prev: f64, next: f64 },
}

impl Lookup1 {
    pub(crate) fn from_curve(
        curve: &store::Curve,
        table: &'static str,
    ) -> Result<Option<Self>, SupportTableError> {
        if curve.is_empty() {
            return Ok(None);
        }
        let points: Vec<_> =
            curve.points.iter().map(|point| (point.input, point.output)).collect();
        for pair in points.windows(2) {
            let [(prev, _), (next, _)] = pair else { unreachable!() };
            if next <= prev {
                return Err(SupportTableError::NotIncreasing { table, prev: *prev, next: *next });
            }
        }
        Ok(Some(Self { points }))
    }

    pub(crate) fn sample(&self, input: f64) -> f64 {
        let Some(&(first_in, first_out)) = self.points.first() else { return 0.0 };
        if input <= first_in {
            return first_out;
        }
        let &(last_in, last_out) = self.points.last().expect("non-empty");
        if input >= last_in {
            return last_out;
        }
        for pair in self.points.windows(2) {
            let [(low_in, low_out), (high_in, high_out)] = pair else { unreachable!() };
            if input < *high_in {
                let fraction = (input - low_in) / (high_in - low_in);
                return low_out + (high_out - low_out) * fraction;
            }
        }
        last_out
    }

    /// Inverse sample: the input whose output is closest to `output`,
    /// assuming the outputs are monotonic. Used for alpha-from-CL style
    /// reversals in tests.
    fn sample_inverse(&self, output: f64) -> f64 {
        let Some(&(first_in, first_out)) = self.points.first() else { return 0.0 };
        let &(last_in, last_out) = self.points.last().expect("non-empty");
        let ascending = last_out >= first_out;
        if (ascending && output <= first_out) || (!ascending && output >= first_out) {
            return first_in;
        }
        if (ascending && output >= last_out) || (!ascending && output <= last_out) {
            return last_in;
        }
        for pair in self.points.windows(2) {
            let [(low_in, low_out), (high_in, high_out)] = pair else { unreachable!() };
            let inside = if ascending {
                output < *high_out
            } else {
                output > *high_out
            };
            if inside {
                let fraction = (output - low_out) / (high_out - low_out);
                return low_in + (high_in - low_in) * fraction;
            }
        }
        last_in
    }
}

/// A validated two-dimensional lookup: bilinear interpolation over a
/// family of curves keyed by an outer value (Mach).
#[derive(Debug, Clone, Default)]
pub struct Lookup2 {
    rows: Vec<(f64, Lookup1)>,
}

impl Lookup2 {
    fn from_table(
        table: &store::Table2d,
        name: &'static str,
    ) -> Result<Option<Self>, SupportTableError> {
        if table.is_empty() {
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let Some(curve) = Lookup1::from_curve(&row.curve, name)? else {
                continue;
            };
            rows.push((row.key, curve));
        }
        for pair in rows.windows(2) {
            let [(prev, _), (next, _)] = pair else { unreachable!() };
            if next <= prev {
                return Err(SupportTableError::NotIncreasing {
                    table: name,
                    prev: *prev,
                    next: *next,
                });
            }
        }
        Ok(Some(Self { rows }))
    }

    fn sample(&self, key: f64, input: f64) -> f64 {
        let Some((first_key, first_row)) = self.rows.first() else { return 0.0 };
        if self.rows.len() == 1 || key <= *first_key {
            return first_row.sample(input);
        }
        let (last_key, last_row) = self.rows.last().expect("non-empty");
        if key >= *last_key {
            return last_row.sample(input);
        }
        for pair in self.rows.windows(2) {
            let [(low_key, low_row), (high_key, high_row)] = pair else { unreachable!() };
            if key < *high_key {
                let fraction = (key - low_key) / (high_key - low_key);
                let low = low_row.sample(input);
                let high = high_row.sample(input);
                return low + (high - low) * fraction;
            }
        }
        last_row.sample(input)
    }
}

/// The aerodynamic lookup surface owned by one common controller.
#[derive(Debug, Clone, Default)]
pub struct AeroTables {
    cl_max_mach: Option<Lookup1>,
    cl_min_mach: Option<Lookup1>,
    alpha_max_mach: Option<Lookup1>,
    alpha_min_mach: Option<Lookup1>,
    stick_zero_moment: Option<Lookup2>,
    stick_zero_moment_thrust_delta: Option<Lookup2>,
    effective_cl: Option<Lookup2>,
    alpha_vs_cl: Option<Lookup2>,
    beta_vs_g: Option<Lookup1>,
}

impl AeroTables {
    /// Validates and indexes the configured support tables.
    pub fn from_config(config: &store::SupportTables) -> Result<Self, SupportTableError> {
        Ok(Self {
            cl_max_mach: Lookup1::from_curve(&config.cl_max_mach, "cl_max_mach")?,
            cl_min_mach: Lookup1::from_curve(&config.cl_min_mach, "cl_min_mach")?,
            alpha_max_mach: Lookup1::from_curve(&config.alpha_max_mach, "alpha_max_mach")?,
            alpha_min_mach: Lookup1::from_curve(&config.alpha_min_mach, "alpha_min_mach")?,
            stick_zero_moment: Lookup2::from_table(&config.stick_zero_moment, "stick_zero_moment")?,
            stick_zero_moment_thrust_delta: Lookup2::from_table(
                &config.stick_zero_moment_thrust_delta,
                "stick_zero_moment_thrust_delta",
            )?,
            effective_cl: Lookup2::from_table(&config.effective_cl, "effective_cl")?,
            alpha_vs_cl: Lookup2::from_table(&config.alpha_vs_cl, "alpha_vs_cl")?,
            beta_vs_g: Lookup1::from_curve(&config.beta_vs_g, "beta_vs_g")?,
        })
    }

    /// Maximum usable lift coefficient at `mach`.
    #[must_use]
    pub fn cl_max(&self, mach: f64) -> Option<f64> {
        self.cl_max_mach.as_ref().map(|curve| curve.sample(mach))
    }

    /// Minimum usable lift coefficient at `mach`.
    #[must_use]
    pub fn cl_min(&self, mach: f64) -> Option<f64> {
        self.cl_min_mach.as_ref().map(|curve| curve.sample(mach))
    }

    /// Maximum usable angle of attack at `mach`.
    #[must_use]
    pub fn alpha_max(&self, mach: f64) -> Option<Angle> {
        self.alpha_max_mach.as_ref().map(|curve| Angle::from_degrees(curve.sample(mach)))
    }

    /// Minimum usable angle of attack at `mach`.
    #[must_use]
    pub fn alpha_min(&self, mach: f64) -> Option<Angle> {
        self.alpha_min_mach.as_ref().map(|curve| Angle::from_degrees(curve.sample(mach)))
    }

    /// Stick-back position producing zero pitching moment at the given
    /// flight condition and throttle setting.
    #[must_use]
    pub fn stick_for_zero_moment(&self, mach: f64, alpha: Angle, throttle: f64) -> Option<f64> {
        let base =
            self.stick_zero_moment.as_ref().map(|table| table.sample(mach, alpha.into_degrees()))?;
        let delta = self
            .stick_zero_moment_thrust_delta
            .as_ref()
            .map_or(0.0, |table| table.sample(mach, alpha.into_degrees()) * throttle);
        Some(base + delta)
    }

    /// Effective lift coefficient at the given flight condition.
    #[must_use]
    pub fn effective_cl(&self, mach: f64, alpha: Angle) -> Option<f64> {
        self.effective_cl.as_ref().map(|table| table.sample(mach, alpha.into_degrees()))
    }

    /// Angle of attack producing the given lift coefficient.
    #[must_use]
    pub fn alpha_at_cl(&self, mach: f64, cl: f64) -> Option<Angle> {
        self.alpha_vs_cl.as_ref().map(|table| Angle::from_degrees(table.sample(mach, cl)))
    }

    /// Angle of attack that sustains `gload` at the given flight
    /// condition, via the lift coefficient the load factor requires.
    #[must_use]
    pub fn alpha_at_gload(
        &self,
        gload: f64,
        mach: f64,
        dynamic_pressure_psf: f64,
        weight_lbs: f64,
        wing_area_ft2: f64,
    ) -> Option<Angle> {
        if dynamic_pressure_psf <= 0.0 || wing_area_ft2 <= 0.0 {
            return None;
        }
        let cl = gload * weight_lbs / (dynamic_pressure_psf * wing_area_ft2);
        self.alpha_at_cl(mach, cl)
    }

    /// Sideslip that produces the given lateral load factor.
    #[must_use]
    pub fn beta_at_gload(&self, gload: f64) -> Option<Angle> {
        self.beta_vs_g.as_ref().map(|curve| Angle::from_degrees(curve.sample(gload)))
    }

    /// Lateral load factor at the given sideslip (inverse of
    /// [`Self::beta_at_gload`]).
    #[must_use]
    pub fn gload_at_beta(&self, beta: Angle) -> Option<f64> {
        self.beta_vs_g.as_ref().map(|curve| curve.sample_inverse(beta.into_degrees()))
    }
}

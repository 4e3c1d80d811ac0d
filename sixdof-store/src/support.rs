use serde::{Deserialize, Serialize};

/// Aerodynamic support curves and tables.
///
/// Consumed for feed-forward and envelope limiting. Any member left empty
/// disables the lookups that depend on it; the affected features degrade
/// to their configuration limits.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SupportTables {
    /// Maximum usable lift coefficient versus Mach.
    #[serde(default)]
    pub cl_max_mach: Curve,
    /// Minimum usable lift coefficient versus Mach.
    #[serde(default)]
    pub cl_min_mach: Curve,
    /// Maximum usable angle of attack (degrees) versus Mach.
    #[serde(default)]
    pub alpha_max_mach: Curve,
    /// Minimum usable angle of attack (degrees) versus Mach.
    #[serde(default)]
    pub alpha_min_mach: Curve,
    /// Stick-back position producing zero pitching moment,
    /// versus Mach and alpha (degrees).
    #[serde(default)]
    pub stick_zero_moment: Table2d,
    /// Correction to [`Self::stick_zero_moment`] per unit of throttle,
    /// versus Mach and alpha (degrees).
    #[serde(default)]
    pub stick_zero_moment_thrust_delta: Table2d,
    /// Effective lift coefficient versus Mach and alpha (degrees).
    #[serde(default)]
    pub effective_cl: Table2d,
    /// Alpha (degrees) versus Mach and lift coefficient.
    #[serde(default)]
    pub alpha_vs_cl: Table2d,
    /// Sideslip (degrees) versus lateral load factor (g).
    #[serde(default)]
    pub beta_vs_g: Curve,
}

/// A one-dimensional lookup curve.
///
/// Breakpoints must be strictly increasing in `input`; lookups interpolate
/// linearly and clamp outside the endpoints.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Curve {
    /// Breakpoints of the curve.
    pub points: Vec<CurvePoint>,
}

/// One breakpoint of a [`Curve`].
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Independent value.
    pub input: f64,
    /// Dependent value.
    pub output: f64,
}

impl Curve {
    /// Convenience constructor from `(input, output)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            points: pairs.iter().map(|&(input, output)| CurvePoint { input, output }).collect(),
        }
    }

    /// Whether the curve has no breakpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.points.is_empty() }
}

/// A two-dimensional lookup table: a family of [`Curve`]s keyed by an
/// outer independent value (typically Mach).
///
/// Outer keys must be strictly increasing; lookups interpolate bilinearly
/// and clamp outside the hull.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Table2d {
    /// Rows of the table, one inner curve per outer key.
    pub rows: Vec<Table2dRow>,
}

/// One row of a [`Table2d`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Table2dRow {
    /// Outer independent value of this row.
    pub key: f64,
    /// Inner curve at this outer value.
    pub curve: Curve,
}

impl Table2d {
    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

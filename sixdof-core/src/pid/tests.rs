use super::{GainRow, GainTable, Pid, PidFlags};

fn two_row_table() -> GainTable {
    GainTable::new(vec![
        GainRow { control_value: 1000.0, kp: 0.5, ..GainRow::default() },
        GainRow { control_value: 5000.0, kp: 0.2, ..GainRow::default() },
    ])
    .expect("rows are increasing")
}

#[test]
fn gain_interpolation_linear() {
    let table = two_row_table();
    let sampled = table.sample(3000.0);
    assert!((sampled.kp - 0.35).abs() < 1e-12, "midway kp is the linear blend");
}

#[test]
fn gain_interpolation_endpoint_clamp() {
    let table = two_row_table();
    assert!((table.sample(10000.0).kp - 0.2).abs() < 1e-12, "above the last row");
    assert!((table.sample(500.0).kp - 0.5).abs() < 1e-12, "below the first row");
}

#[test]
fn gain_interpolation_is_convex() {
    let table = two_row_table();
    for q in [1000.0, 1500.0, 2500.0, 4000.0, 5000.0] {
        let kp = table.sample(q).kp;
        assert!((0.2..=0.5).contains(&kp), "kp {kp} at q {q} is within the row range");
    }
}

#[test]
fn single_row_collapses_to_scalars() {
    let table = GainTable::scalar(GainRow::scalar(0.7, 0.1, 0.0));
    assert!((table.sample(-1e9).kp - 0.7).abs() < 1e-12);
    assert!((table.sample(1e9).kp - 0.7).abs() < 1e-12);
}

#[test]
fn non_increasing_rows_rejected() {
    let result = GainTable::new(vec![
        GainRow { control_value: 100.0, ..GainRow::default() },
        GainRow { control_value: 100.0, ..GainRow::default() },
    ]);
    assert!(result.is_err(), "equal control values are rejected");

    let result = GainTable::new(vec![
        GainRow { control_value: 100.0, ..GainRow::default() },
        GainRow { control_value: 50.0, ..GainRow::default() },
    ]);
    assert!(result.is_err(), "decreasing control values are rejected");
}

#[test]
fn proportional_only_tracks_error() {
    let mut pid = Pid::new(GainTable::scalar(GainRow::scalar(2.0, 0.0, 0.0)), PidFlags::empty());
    let out = pid.update_to_target(10.0, 4.0, 0.01);
    assert!((out - 12.0).abs() < 1e-12, "kp * error");
}

#[test]
fn accumulator_clamped_when_limit_max() {
    let row = GainRow { ki: 1.0, max_accum: 0.5, ..GainRow::scalar(0.0, 1.0, 0.0) };
    let mut pid = Pid::new(GainTable::scalar(row), PidFlags::LIMIT_MAX);

    for _ in 0..1000 {
        pid.update_from_error(100.0, 0.01);
        assert!(pid.error_accum().abs() <= 0.5, "accumulator stays within the clamp");
    }
    assert!((pid.error_accum() - 0.5).abs() < 1e-12, "accumulator saturates at the clamp");
}

#[test]
fn accumulator_frozen_above_large_error_threshold() {
    let row = GainRow { ki: 1.0, max_error_zero: 10.0, ..GainRow::default() };
    let mut pid = Pid::new(GainTable::scalar(row), PidFlags::ZERO_GT_MAX);

    pid.update_from_error(50.0, 0.1);
    assert_eq!(pid.error_accum(), 0.0, "no accumulation while far from the set point");

    pid.update_from_error(5.0, 0.1);
    assert!((pid.error_accum() - 0.5).abs() < 1e-12, "accumulates once the error is small");
}

#[test]
fn accumulator_frozen_below_small_error_threshold() {
    let row = GainRow { ki: 1.0, min_error_zero: 1.0, ..GainRow::default() };
    let mut pid = Pid::new(GainTable::scalar(row), PidFlags::ZERO_LT_MIN);

    pid.update_from_error(0.5, 0.1);
    assert_eq!(pid.error_accum(), 0.0, "no accumulation inside the dead band");

    pid.update_from_error(2.0, 0.1);
    assert!((pid.error_accum() - 0.2).abs() < 1e-12);
}

#[test]
fn kt_back_calculation_bleeds_integral_term() {
    let row = GainRow { ki: 1.0, kt: 0.1, ..GainRow::default() };
    let mut pid = Pid::new(GainTable::scalar(row), PidFlags::USE_KT);

    // First update saturates: pre-limit output 1.0 clamps to 0.5.
    pid.update_from_error_limited(10.0, 0.1, -0.5, 0.5);
    let first = pid.telemetry();
    assert!((first.output_prelimited - 1.0).abs() < 1e-12);
    assert!((first.output_limited - 0.5).abs() < 1e-12);

    // Second update sees the saturation error: ki drops to 1 + 0.1*(0.5-1).
    pid.update_from_error_limited(10.0, 0.1, -0.5, 0.5);
    let second = pid.telemetry();
    assert!((second.error_accum - 2.0).abs() < 1e-12);
    assert!(
        (second.ki_contrib - 0.95 * 2.0).abs() < 1e-12,
        "effective ki is reduced by the saturation error"
    );
}

#[test]
fn derivative_low_pass_smooths_steps() {
    let row = GainRow { kd: 1.0, lowpass_alpha: 0.1, ..GainRow::default() };
    let mut filtered = Pid::new(GainTable::scalar(row), PidFlags::USE_ALPHA);
    let mut raw = Pid::new(
        GainTable::scalar(GainRow { kd: 1.0, ..GainRow::default() }),
        PidFlags::empty(),
    );

    filtered.update_from_error(0.0, 0.1);
    raw.update_from_error(0.0, 0.1);
    let f = filtered.update_from_error(1.0, 0.1);
    let r = raw.update_from_error(1.0, 0.1);
    assert!(f.abs() < r.abs(), "the filtered derivative responds slower to a step");
}

#[test]
fn non_positive_dt_latches_output() {
    let mut pid = Pid::new(GainTable::scalar(GainRow::scalar(1.0, 0.0, 0.0)), PidFlags::empty());
    let first = pid.update_from_error(3.0, 0.01);
    let latched = pid.update_from_error(100.0, 0.0);
    assert_eq!(first, latched, "zero dt returns the latched output");
}

#[test]
fn feed_forward_added_before_limiting() {
    let mut pid = Pid::new(GainTable::scalar(GainRow::scalar(1.0, 0.0, 0.0)), PidFlags::empty());
    pid.set_feed_forward(0.8);
    let out = pid.update_from_error_limited(0.5, 0.01, -1.0, 1.0);
    assert!((out - 1.0).abs() < 1e-12, "ff + p saturates at the limit");
    assert!((pid.telemetry().output_prelimited - 1.3).abs() < 1e-12);
}

#[test]
fn reset_clears_dynamic_state() {
    let row = GainRow { ki: 1.0, ..GainRow::scalar(1.0, 1.0, 1.0) };
    let mut pid = Pid::new(GainTable::scalar(row), PidFlags::empty());
    for _ in 0..10 {
        pid.update_from_error(5.0, 0.1);
    }
    assert!(pid.error_accum() != 0.0);

    pid.reset();
    assert_eq!(pid.error_accum(), 0.0);
    assert_eq!(pid.output(), 0.0);
    assert_eq!(pid.telemetry().output_prelimited, 0.0);
}

//! Tests for features module

use chrono::{Duration, NaiveDate, NaiveDateTime};
use flocktrack::features::*;
use flocktrack::geo_utils::seconds_since_midnight;
use flocktrack::{GpsPoint, Position, TrajectoryObservation};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 7, 15)
        .unwrap()
        .and_hms_opt(hour, min, sec)
        .unwrap()
}

/// Distance between two times of day on the 24h clock, in seconds.
fn clock_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 86_400.0;
    d.min(86_400.0 - d)
}

#[test]
fn test_encode_quarter_days() {
    let cases = [
        (at(0, 0, 0), 1.0, 0.0),
        (at(6, 0, 0), 0.0, 1.0),
        (at(12, 0, 0), -1.0, 0.0),
        (at(18, 0, 0), 0.0, -1.0),
    ];
    for (t, ex, ey) in cases {
        let (tx, ty) = encode_time_of_day(&t);
        assert!(approx_eq(tx, ex, 1e-12), "{t}: tx {tx}");
        assert!(approx_eq(ty, ey, 1e-12), "{t}: ty {ty}");
    }
}

#[test]
fn test_encoding_is_on_unit_circle() {
    for minutes in (0..1440).step_by(7) {
        let (tx, ty) = encode_time_of_day(&(at(0, 0, 0) + Duration::minutes(minutes)));
        assert!(approx_eq(tx.hypot(ty), 1.0, 1e-12));
    }
}

#[test]
fn test_midnight_wraparound_is_close() {
    let (ax, ay) = encode_time_of_day(&at(23, 59, 0));
    let (bx, by) = encode_time_of_day(&at(0, 1, 0));
    let (cx, cy) = encode_time_of_day(&at(12, 0, 0));

    let near = (ax - bx).hypot(ay - by);
    let far = (ax - cx).hypot(ay - cy);
    assert!(near < 0.01);
    assert!(far > 1.9);
}

#[test]
fn test_decode_round_trip() {
    let start = at(0, 0, 0);
    for step in 0..2000 {
        let t = start + Duration::milliseconds(step * 432_173);
        let (tx, ty) = encode_time_of_day(&t);
        let decoded = decode_time_of_day(tx, ty);

        assert!((0.0..86_400.0).contains(&decoded));
        assert!(clock_diff(decoded, seconds_since_midnight(&t)) < 1e-6);
    }
}

#[test]
fn test_decode_last_second_of_day() {
    let t = at(23, 59, 59) + Duration::milliseconds(500);
    let (tx, ty) = encode_time_of_day(&t);
    let decoded = decode_time_of_day(tx, ty);
    assert!(clock_diff(decoded, 86_399.5) < 1e-6);
}

#[test]
fn test_decode_accepts_non_unit_vectors() {
    // A short mean vector still points at 06:00
    assert!(approx_eq(decode_time_of_day(0.0, 0.25), 21_600.0, 1e-6));
    assert_eq!(decode_time_of_day(0.0, 0.0), 0.0);
}

#[test]
fn test_timestamp_is_not_timezone_shifted() {
    // Angle derives from the wall-clock time on the timestamp's own day
    let a = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap().and_hms_opt(15, 30, 0).unwrap();
    let b = NaiveDate::from_ymd_opt(2023, 8, 20).unwrap().and_hms_opt(15, 30, 0).unwrap();
    assert_eq!(time_of_day_angle(&a), time_of_day_angle(&b));
}

#[test]
fn test_extract_features_preserves_rows() {
    let trajectories: Vec<TrajectoryObservation> = (0..5)
        .map(|i| TrajectoryObservation {
            trajectory_id: 3,
            position: Position {
                device_id: 9,
                t: at(i * 4, 0, 0),
                pos: GpsPoint::new(63.4, 11.7),
            },
            dt: 14_400.0,
            velocity: 0.1 * i as f64,
        })
        .collect();

    let rows = extract_features(&trajectories);

    assert_eq!(rows.len(), trajectories.len());
    for (row, obs) in rows.iter().zip(&trajectories) {
        assert_eq!(row.trajectory_id, obs.trajectory_id);
        assert_eq!(row.device_id, obs.position.device_id);
        assert_eq!(row.t, obs.position.t);
        assert_eq!(row.velocity, obs.velocity);
        assert_eq!(row.dt, obs.dt);
        let (tx, ty) = encode_time_of_day(&obs.position.t);
        assert_eq!(row.vector(), [obs.velocity, tx, ty]);
    }
}

#[test]
fn test_extract_features_empty() {
    assert!(extract_features(&[]).is_empty());
}

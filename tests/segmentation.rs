//! Tests for segmentation module

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use flocktrack::geo_utils::{elapsed_seconds, geodesic_distance};
use flocktrack::segmentation::*;
use flocktrack::synthetic::HerdScenario;
use flocktrack::{GpsPoint, Position, QualityConfig, TrackError, clean_observations};

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn pos_at(device_id: i64, seconds: i64, lat: f64, lng: f64) -> Position {
    Position {
        device_id,
        t: epoch() + Duration::seconds(seconds),
        pos: GpsPoint::new(lat, lng),
    }
}

fn stationary(device_id: i64, hours: &[i64]) -> Vec<Position> {
    hours
        .iter()
        .map(|h| pos_at(device_id, h * 3600, 63.4, 11.7))
        .collect()
}

fn trajectory_sizes(result: &Segmentation) -> Vec<(u64, usize)> {
    result
        .by_trajectory()
        .into_iter()
        .map(|(id, rows)| (id, rows.len()))
        .collect()
}

#[test]
fn test_gap_exactly_at_threshold_does_not_split() {
    // 2h -> 50h is exactly 48h; the comparison is strict
    let positions = stationary(1, &[0, 1, 2, 50, 51]);
    let result = identify_trajectories(&positions, &SegmentationConfig::default());

    assert_eq!(result.stats.discarded, 1);
    assert_eq!(trajectory_sizes(&result), vec![(1, 4)]);
}

#[test]
fn test_gap_over_threshold_splits_and_discards_break_row() {
    let positions = stationary(1, &[0, 1, 2, 50, 51]);
    let config = SegmentationConfig {
        time_threshold: 47.0 * 3600.0,
        ..SegmentationConfig::default()
    };

    let segmented = segment_observations(&positions, &config);
    let flags: Vec<bool> = segmented.iter().map(|s| s.break_flag).collect();
    assert_eq!(flags, vec![true, false, false, true, false]);

    let result = identify_trajectories(&positions, &config);
    assert_eq!(result.stats.discarded, 2);
    // The 0h and 50h rows opened trajectories and are dropped
    assert_eq!(trajectory_sizes(&result), vec![(1, 2), (2, 1)]);
    assert_eq!(result.trajectories[2].position.t, epoch() + Duration::hours(51));
}

#[test]
fn test_first_observation_has_no_kinematics() {
    let positions = stationary(1, &[0, 1]);
    let segmented = segment_observations(&positions, &SegmentationConfig::default());

    assert_eq!(segmented[0].dt, None);
    assert_eq!(segmented[0].velocity, None);
    assert!(segmented[0].break_flag);

    assert_eq!(segmented[1].dt, Some(3600.0));
    assert!(segmented[1].velocity.unwrap() < 1e-9);
    assert!(!segmented[1].break_flag);
}

#[test]
fn test_single_observation_device_contributes_nothing() {
    let mut positions = stationary(1, &[0]);
    positions.extend(stationary(2, &[0, 1, 2]));

    let result = identify_trajectories(&positions, &SegmentationConfig::default());

    assert_eq!(result.stats.devices, 2);
    assert_eq!(result.stats.discarded, 2);
    assert!(result.trajectories.iter().all(|o| o.position.device_id == 2));
    assert_eq!(trajectory_sizes(&result), vec![(2, 2)]);
}

#[test]
fn test_zero_dt_is_a_break() {
    let positions = vec![
        pos_at(1, 0, 63.4, 11.7),
        pos_at(1, 600, 63.4, 11.7),
        pos_at(1, 600, 63.401, 11.7),
        pos_at(1, 1200, 63.401, 11.7),
    ];

    let segmented = segment_observations(&positions, &SegmentationConfig::default());

    assert_eq!(segmented[2].dt, Some(0.0));
    assert_eq!(segmented[2].velocity, None);
    assert!(segmented[2].break_flag);
    assert!(!segmented[3].break_flag);
}

#[test]
fn test_velocity_spike_is_a_break() {
    // ~11 km in 10 minutes is ~18.5 m/s
    let positions = vec![
        pos_at(1, 0, 63.40, 11.7),
        pos_at(1, 600, 63.401, 11.7),
        pos_at(1, 1200, 63.50, 11.7),
        pos_at(1, 1800, 63.501, 11.7),
    ];

    let segmented = segment_observations(&positions, &SegmentationConfig::default());
    assert!(!segmented[1].break_flag);
    assert!(segmented[2].velocity.unwrap() > 10.0);
    assert!(segmented[2].break_flag);
    assert!(!segmented[3].break_flag);

    let result = identify_trajectories(&positions, &SegmentationConfig::default());
    assert_eq!(trajectory_sizes(&result), vec![(1, 1), (2, 1)]);
}

#[test]
fn test_velocity_matches_geodesic_distance() {
    let a = pos_at(1, 0, 63.40, 11.70);
    let b = pos_at(1, 900, 63.41, 11.72);

    let segmented = segment_observations(&[a, b], &SegmentationConfig::default());
    let expected = geodesic_distance(&a.pos, &b.pos) / 900.0;

    assert!((segmented[1].velocity.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn test_trajectory_ids_are_global_across_devices() {
    // Input deliberately unordered
    let mut positions = stationary(2, &[0, 1, 2]);
    positions.extend(stationary(1, &[2, 0, 1]));

    let result = identify_trajectories(&positions, &SegmentationConfig::default());

    let ids: Vec<(i64, u64)> = result
        .trajectories
        .iter()
        .map(|o| (o.position.device_id, o.trajectory_id))
        .collect();
    assert_eq!(ids, vec![(1, 1), (1, 1), (2, 2), (2, 2)]);
}

#[test]
fn test_is_break_rules() {
    let config = SegmentationConfig::default();
    assert!(config.is_break(None, None));
    assert!(config.is_break(Some(10.0), None));
    assert!(config.is_break(Some(48.0 * 3600.0 + 1.0), Some(0.0)));
    assert!(config.is_break(Some(60.0), Some(10.5)));
    assert!(!config.is_break(Some(48.0 * 3600.0), Some(10.0)));
}

#[test]
fn test_config_validation() {
    assert!(SegmentationConfig::default().validate().is_ok());

    let negative = SegmentationConfig {
        time_threshold: -1.0,
        ..SegmentationConfig::default()
    };
    assert!(matches!(negative.validate(), Err(TrackError::InvalidConfig(_))));

    let nan = SegmentationConfig {
        velocity_threshold: f64::NAN,
        ..SegmentationConfig::default()
    };
    assert!(matches!(nan.validate(), Err(TrackError::InvalidConfig(_))));
}

#[test]
fn test_empty_input() {
    let result = identify_trajectories(&[], &SegmentationConfig::default());
    assert!(result.trajectories.is_empty());
    assert_eq!(result.stats, SegmentationStats::default());
    assert_eq!(result.max_trajectory_id(), 0);
}

// ============================================================================
// Properties over synthetic herds
// ============================================================================

fn synthetic_positions(seed: u64) -> Vec<Position> {
    let dataset = HerdScenario {
        device_count: 6,
        days: 5,
        outage_devices: 2,
        spikes_per_device: 3,
        duplicate_fraction: 0.02,
        missing_fix_fraction: 0.02,
        seed,
        ..HerdScenario::default()
    }
    .generate();
    clean_observations(&dataset.observations, &QualityConfig::default())
}

#[test]
fn test_trajectory_homogeneity() {
    let config = SegmentationConfig::default();

    for seed in [1, 2, 3] {
        let result = identify_trajectories(&synthetic_positions(seed), &config);
        assert!(!result.trajectories.is_empty());

        for (_, rows) in result.by_trajectory() {
            let device = rows[0].position.device_id;
            for o in rows {
                assert_eq!(o.position.device_id, device);
                assert!(o.dt > 0.0 && o.dt <= config.time_threshold);
                assert!(o.velocity >= 0.0 && o.velocity <= config.velocity_threshold);
            }
            for pair in rows.windows(2) {
                assert!(pair[0].position.t < pair[1].position.t);
                let dt = elapsed_seconds(&pair[0].position.t, &pair[1].position.t);
                let v = geodesic_distance(&pair[0].position.pos, &pair[1].position.pos) / dt;
                assert!(dt <= config.time_threshold);
                assert!(v <= config.velocity_threshold);
            }
        }
    }
}

#[test]
fn test_trajectory_ids_never_span_devices() {
    let result = identify_trajectories(&synthetic_positions(7), &SegmentationConfig::default());

    let mut owner: HashMap<u64, i64> = HashMap::new();
    for o in &result.trajectories {
        let device = *owner.entry(o.trajectory_id).or_insert(o.position.device_id);
        assert_eq!(device, o.position.device_id);
    }
    assert!(owner.len() > 6);
}

#[test]
fn test_segmentation_is_deterministic_under_reordering() {
    let positions = synthetic_positions(11);
    let mut reversed = positions.clone();
    reversed.reverse();

    let config = SegmentationConfig::default();
    let a = identify_trajectories(&positions, &config);
    let b = identify_trajectories(&reversed, &config);

    assert_eq!(a.trajectories, b.trajectories);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn test_discarded_count_equals_running_break_count() {
    let dataset = HerdScenario {
        device_count: 4,
        days: 4,
        outage_devices: 1,
        seed: 5,
        ..HerdScenario::default()
    }
    .generate();
    let positions = clean_observations(&dataset.observations, &QualityConfig::default());
    let config = SegmentationConfig::default();

    let segmented = segment_observations(&positions, &config);
    let result = identify_trajectories(&positions, &config);

    // The final row of the last device is a regular ping, so the last running
    // count is carried by a retained row
    assert!(!segmented.last().unwrap().break_flag);
    assert_eq!(result.stats.discarded as u64, result.max_trajectory_id());
    assert_eq!(
        result.stats.discarded + result.stats.retained,
        result.stats.input_positions
    );
}

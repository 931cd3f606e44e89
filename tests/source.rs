//! Tests for source module

use std::io::{Cursor, Write};

use chrono::NaiveDate;
use flocktrack::source::*;
use flocktrack::{GpsPoint, Observation, TrackError};

const SAMPLE: &str = r#"{"device_id": 1, "t": "2022-06-01T12:00:00", "longitude": 11.75, "latitude": 63.42}
{"device_id": 1, "t": "2022-06-01T12:15:00", "longitude": null, "latitude": null}

{"device_id": 2, "t": "2022-06-01T12:00:30.500"}
"#;

#[test]
fn test_parse_json_lines() {
    let observations = parse_json_lines(Cursor::new(SAMPLE)).unwrap();

    assert_eq!(observations.len(), 3);

    let first = &observations[0];
    assert_eq!(first.device_id, 1);
    assert_eq!(
        first.t,
        NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    );
    assert_eq!(first.pos, Some(GpsPoint::new(63.42, 11.75)));

    // Explicit nulls and absent fields both mean "no fix"
    assert_eq!(observations[1].pos, None);
    assert_eq!(observations[2].pos, None);
    assert_eq!(
        observations[2].t,
        NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 30, 500)
            .unwrap()
    );
}

#[test]
fn test_half_missing_coordinates_are_no_fix() {
    let line = r#"{"device_id": 3, "t": "2022-06-01T00:00:00", "longitude": 11.0, "latitude": null}"#;
    let observations = parse_json_lines(Cursor::new(line)).unwrap();
    assert_eq!(observations[0].pos, None);
}

#[test]
fn test_malformed_line_reports_line_number() {
    let input = r#"{"device_id": 1, "t": "2022-06-01T12:00:00", "longitude": 11.75, "latitude": 63.42}
{"device_id": 1, "t": "2022-06-01T12:15:00", "longitude": 11.75, "latitude": 63.42}
{"device_id": "one", "t": "2022-06-01T12:30:00"}
"#;

    match parse_json_lines(Cursor::new(input)) {
        Err(TrackError::Parse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_record_round_trip_through_observation() {
    let t = NaiveDate::from_ymd_opt(2023, 9, 1)
        .unwrap()
        .and_hms_opt(4, 0, 0)
        .unwrap();
    let obs = Observation::new(5, t, Some(GpsPoint::new(61.0, 9.5)));

    let record = PositionRecord::from(&obs);
    assert_eq!(record.latitude, Some(61.0));
    assert_eq!(record.longitude, Some(9.5));
    assert_eq!(Observation::from(record), obs);
}

#[test]
fn test_in_memory_source() {
    let t = NaiveDate::from_ymd_opt(2023, 9, 1)
        .unwrap()
        .and_hms_opt(4, 0, 0)
        .unwrap();
    let observations = vec![Observation::new(5, t, None)];

    assert_eq!(observations.observations().unwrap(), observations);
    assert_eq!(observations[..].observations().unwrap(), observations);
}

#[test]
fn test_json_lines_source_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    file.flush().unwrap();

    let source = JsonLinesSource::new(file.path());
    assert_eq!(source.path(), file.path());

    let observations = source.observations().unwrap();
    assert_eq!(observations.len(), 3);
    assert_eq!(observations[2].device_id, 2);
}

#[test]
fn test_json_lines_source_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonLinesSource::new(dir.path().join("absent.jsonl"));

    assert!(matches!(source.observations(), Err(TrackError::Io(_))));
}

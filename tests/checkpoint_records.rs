use throughline::{CheckpointRecord, OpaqueParseError, TargetVbOpaque};

fn record(seqno: u64, opaque: TargetVbOpaque) -> CheckpointRecord {
    CheckpointRecord {
        failover_uuid: 0xdead_beef,
        seqno,
        dcp_snapshot_seqno: seqno,
        dcp_snapshot_end_seqno: seqno + 10,
        target_vb_opaque: opaque,
        target_seqno: seqno / 2,
    }
}

#[test]
fn numeric_uuid_shape_round_trips() {
    let opaque = TargetVbOpaque::Uuid {
        target_vb_uuid: 1234567890,
    };
    let json = serde_json::to_string(&opaque).unwrap();
    assert_eq!(json, r#"{"target_vb_uuid":1234567890}"#);
    assert_eq!(serde_json::from_str::<TargetVbOpaque>(&json).unwrap(), opaque);
}

#[test]
fn string_uuid_shape_round_trips() {
    let opaque = TargetVbOpaque::UuidStr {
        target_vb_uuid: "abc-123".to_string(),
    };
    let json = serde_json::to_string(&opaque).unwrap();
    assert_eq!(json, r#"{"target_vb_uuid":"abc-123"}"#);
    assert_eq!(serde_json::from_str::<TargetVbOpaque>(&json).unwrap(), opaque);
}

#[test]
fn uuid_with_startup_time_shape_round_trips() {
    let opaque = TargetVbOpaque::UuidAndStartupTime {
        target_vb_uuid: "abc-123".to_string(),
        startup_time: "1418011920".to_string(),
    };
    let json = serde_json::to_string(&opaque).unwrap();
    let parsed: TargetVbOpaque = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, opaque);
}

#[test]
fn shape_is_inferred_from_field_count_and_value_type() {
    let numeric: TargetVbOpaque = serde_json::from_str(r#"{"target_vb_uuid":42}"#).unwrap();
    assert!(matches!(numeric, TargetVbOpaque::Uuid { target_vb_uuid: 42 }));

    let text: TargetVbOpaque = serde_json::from_str(r#"{"target_vb_uuid":"42"}"#).unwrap();
    assert!(matches!(text, TargetVbOpaque::UuidStr { .. }));

    let timed: TargetVbOpaque =
        serde_json::from_str(r#"{"target_vb_uuid":"42","startup_time":"99"}"#).unwrap();
    assert!(matches!(timed, TargetVbOpaque::UuidAndStartupTime { .. }));
}

#[test]
fn malformed_opaque_shapes_are_rejected() {
    let malformed = [
        "17",
        r#""not-an-object""#,
        "{}",
        r#"{"unexpected_field":1}"#,
        r#"{"target_vb_uuid":true}"#,
        r#"{"target_vb_uuid":42,"startup_time":"99"}"#,
        r#"{"target_vb_uuid":"42","startup_time":7}"#,
        r#"{"target_vb_uuid":"a","startup_time":"b","extra":"c"}"#,
    ];
    for payload in malformed {
        assert!(
            serde_json::from_str::<TargetVbOpaque>(payload).is_err(),
            "accepted {payload}"
        );
    }
}

#[test]
fn from_value_reports_the_offending_shape() {
    let err = TargetVbOpaque::from_value(&serde_json::json!(17)).unwrap_err();
    assert!(matches!(err, OpaqueParseError::NotAnObject(_)));

    let err = TargetVbOpaque::from_value(&serde_json::json!({"x": 1})).unwrap_err();
    assert!(matches!(err, OpaqueParseError::UnrecognizedShape(_)));
}

#[test]
fn equality_is_false_across_shapes() {
    let numeric = TargetVbOpaque::Uuid { target_vb_uuid: 42 };
    let text = TargetVbOpaque::UuidStr {
        target_vb_uuid: "42".to_string(),
    };
    let timed = TargetVbOpaque::UuidAndStartupTime {
        target_vb_uuid: "42".to_string(),
        startup_time: "99".to_string(),
    };
    assert_ne!(numeric, text);
    assert_ne!(text, timed);
    assert_ne!(numeric, timed);
}

#[test]
fn equality_within_a_shape_is_field_wise() {
    let a = TargetVbOpaque::UuidAndStartupTime {
        target_vb_uuid: "42".to_string(),
        startup_time: "99".to_string(),
    };
    let b = a.clone();
    let c = TargetVbOpaque::UuidAndStartupTime {
        target_vb_uuid: "42".to_string(),
        startup_time: "100".to_string(),
    };
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn checkpoint_record_round_trips_with_every_opaque_shape() {
    let shapes = [
        TargetVbOpaque::Uuid { target_vb_uuid: 7 },
        TargetVbOpaque::UuidStr {
            target_vb_uuid: "es-uuid".to_string(),
        },
        TargetVbOpaque::UuidAndStartupTime {
            target_vb_uuid: "uuid".to_string(),
            startup_time: "1418011920".to_string(),
        },
    ];
    for opaque in shapes {
        let original = record(100, opaque);
        let restored = CheckpointRecord::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(restored, original);
    }
}

#[test]
fn record_with_malformed_opaque_fails_as_a_whole() {
    let payload = r#"{
        "failover_uuid": 1,
        "seqno": 100,
        "dcp_snapshot_seqno": 100,
        "dcp_snapshot_end_seqno": 110,
        "target_vb_opaque": {"bogus": true},
        "target_seqno": 50
    }"#;
    assert!(CheckpointRecord::from_json(payload).is_err());
}

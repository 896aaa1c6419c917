// Snapshot JSON round-trips and forward/backward compatibility.

use lumo_core::params::VisualParams;
use lumo_core::persist::{CameraPose, MediaSlot, Snapshot};

#[test]
fn round_trip_preserves_everything() {
    let mut snap = Snapshot::default();
    snap.ts = 1_726_000_000_000.0;
    snap.params.point_size = 4.5;
    snap.params.spectrum_hue_shift = 0.33;
    snap.camera = CameraPose {
        position: [1.0, 3.0, -2.5],
        target: [0.0, 1.5, 0.0],
    };
    snap.media = MediaSlot {
        index: 7,
        url: Some("/static/media/clips/loop%202.webm".into()),
    };
    snap.loop_current = true;

    let json = snap.to_json().unwrap();
    let back = Snapshot::from_json(&json).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn loop_field_uses_the_short_key() {
    let mut snap = Snapshot::default();
    snap.loop_current = true;
    let json = snap.to_json().unwrap();
    assert!(json.contains("\"loop\":true"));
    assert!(!json.contains("loop_current"));
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    // an older save that predates the media slot and loop flag
    let back = Snapshot::from_json(r#"{"ts": 12.0}"#).unwrap();
    assert_eq!(back.ts, 12.0);
    assert_eq!(back.params, VisualParams::default());
    assert_eq!(back.camera, CameraPose::default());
    assert_eq!(back.media, MediaSlot::default());
    assert!(!back.loop_current);
}

#[test]
fn empty_object_is_a_full_default() {
    let back = Snapshot::from_json("{}").unwrap();
    assert_eq!(back, Snapshot::default());
}

#[test]
fn partial_params_merge_over_defaults() {
    let back = Snapshot::from_json(r#"{"params":{"point_size":9.0}}"#).unwrap();
    assert_eq!(back.params.point_size, 9.0);
    assert_eq!(
        back.params.noise_freq,
        VisualParams::default().noise_freq
    );
}

#[test]
fn garbage_is_rejected() {
    assert!(Snapshot::from_json("not json").is_err());
    assert!(Snapshot::from_json(r#"{"ts": "yesterday"}"#).is_err());
}

#[test]
fn default_pose_matches_the_initial_camera() {
    let pose = CameraPose::default();
    assert_eq!(pose.position, [0.0, 2.2, 6.0]);
    assert_eq!(pose.target, [0.0, 1.0, 0.0]);
}

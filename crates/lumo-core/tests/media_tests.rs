// Generation-token arbitration for overlapping media loads.

use lumo_core::media::{ActiveSource, MediaKind, MediaSession};

fn loaded(url: &str, index: usize) -> ActiveSource {
    ActiveSource::Loaded {
        kind: MediaKind::Video,
        url: url.to_string(),
        index,
    }
}

#[test]
fn fresh_session_is_idle() {
    let s = MediaSession::new();
    assert_eq!(*s.source(), ActiveSource::None);
    assert_eq!(s.source().kind(), None);
}

#[test]
fn commit_publishes_the_source() {
    let mut s = MediaSession::new();
    let t = s.begin_load();
    assert!(!s.is_stale(t));
    assert!(s.commit(t, loaded("/a.mp4", 0)));
    assert_eq!(s.source().url(), Some("/a.mp4"));
    assert_eq!(s.source().index(), Some(0));
    assert_eq!(s.source().kind(), Some(MediaKind::Video));
}

#[test]
fn newer_load_invalidates_older_token() {
    let mut s = MediaSession::new();
    let t1 = s.begin_load();
    let t2 = s.begin_load();
    assert!(s.is_stale(t1));
    assert!(!s.is_stale(t2));
}

#[test]
fn stale_commit_is_a_no_op() {
    let mut s = MediaSession::new();
    let t1 = s.begin_load();
    let t2 = s.begin_load();
    assert!(s.commit(t2, loaded("/winner.mp4", 1)));
    // the slow first load finishes afterward and must not clobber
    assert!(!s.commit(t1, loaded("/loser.mp4", 0)));
    assert_eq!(s.source().url(), Some("/winner.mp4"));
}

#[test]
fn loser_resuming_after_winner_commit_sees_stale_at_every_step() {
    let mut s = MediaSession::new();
    let t_loser = s.begin_load();
    let t_winner = s.begin_load();
    assert!(s.commit(t_winner, loaded("/winner.mp4", 1)));
    // the slow loser wakes up between its awaits and re-checks each time
    assert!(s.is_stale(t_loser));
    assert!(s.is_stale(t_loser));
    assert!(!s.commit(t_loser, loaded("/loser.mp4", 0)));
    assert_eq!(s.source().url(), Some("/winner.mp4"));
    assert!(!s.is_stale(t_winner));
}

#[test]
fn out_of_order_completion_keeps_last_writer() {
    let mut s = MediaSession::new();
    let t1 = s.begin_load();
    let t2 = s.begin_load();
    let t3 = s.begin_load();
    assert!(!s.commit(t1, loaded("/one.mp4", 0)));
    assert!(s.commit(t3, loaded("/three.mp4", 2)));
    assert!(!s.commit(t2, loaded("/two.mp4", 1)));
    assert_eq!(s.source().index(), Some(2));
}

#[test]
fn clear_resets_and_invalidates_in_flight() {
    let mut s = MediaSession::new();
    let t = s.begin_load();
    s.clear();
    assert!(s.is_stale(t));
    assert!(!s.commit(t, loaded("/late.mp4", 0)));
    assert_eq!(*s.source(), ActiveSource::None);
}

#[test]
fn webcam_source_reports_its_kind() {
    let mut s = MediaSession::new();
    let t = s.begin_load();
    assert!(s.commit(t, ActiveSource::Webcam));
    assert_eq!(s.source().kind(), Some(MediaKind::Webcam));
    assert_eq!(s.source().url(), None);
    assert_eq!(s.source().index(), None);
}

#[test]
fn kind_visual_and_audio_flags() {
    assert!(MediaKind::Video.is_visual());
    assert!(MediaKind::Image.is_visual());
    assert!(!MediaKind::Audio.is_visual());
    assert!(MediaKind::Audio.has_audio());
    assert!(MediaKind::Video.has_audio());
    assert!(!MediaKind::Image.has_audio());
}

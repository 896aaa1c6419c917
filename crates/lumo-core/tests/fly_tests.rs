// Camera fly paths: digit mapping, mode blending, and pose handback.

use glam::Vec3;

use lumo_core::camera_fly::{lerp_factor, CameraFly, FlyMode, LookTargets};
use lumo_core::constants::{FLY_CENTER, FLY_LOOK_LERP, FLY_POS_LERP};

fn targets() -> LookTargets {
    LookTargets {
        emitter: Vec3::new(2.0, 1.4, 0.0),
        external: Some(Vec3::new(-1.0, 1.0, 1.0)),
    }
}

#[test]
fn every_digit_maps_to_a_distinct_mode() {
    let modes: Vec<FlyMode> = (0..10).map(|d| FlyMode::from_digit(d).unwrap()).collect();
    for (i, a) in modes.iter().enumerate() {
        for b in &modes[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert!(FlyMode::from_digit(10).is_none());
}

#[test]
fn inactive_fly_returns_no_pose() {
    let mut fly = CameraFly::new();
    assert!(fly.update(1.0 / 60.0, &targets()).is_none());
}

#[test]
fn start_from_rest_takes_one_bounded_step() {
    let mut fly = CameraFly::new();
    let eye = Vec3::new(0.0, 2.2, 6.0);
    let look = Vec3::new(0.0, 1.0, 0.0);
    fly.start(FlyMode::WideRing, eye, look, &targets());

    // from rest the state snaps to the handed-in pose, so the first update
    // is a single 60 Hz lerp step from there toward the path
    let dt = 1.0 / 60.0;
    let (p, t) = fly.update(dt, &targets()).unwrap();
    let expected_p = eye.lerp(FlyMode::WideRing.position(dt), lerp_factor(FLY_POS_LERP, dt));
    let expected_t = look.lerp(FLY_CENTER, lerp_factor(FLY_LOOK_LERP, dt));
    assert!((p - expected_p).length() < 1e-4, "got {p:?}, want {expected_p:?}");
    assert!((t - expected_t).length() < 1e-4, "got {t:?}, want {expected_t:?}");
}

#[test]
fn lerp_factor_floors_at_one_sixtieth_step() {
    let full = lerp_factor(0.18, 1.0 / 60.0);
    assert!((lerp_factor(0.18, 1e-6) - full).abs() < 1e-6);
    let double = lerp_factor(0.18, 2.0 / 60.0);
    assert!((double - (1.0 - 0.82f32 * 0.82)).abs() < 1e-5);
}

#[test]
fn pose_converges_toward_the_path() {
    let mut fly = CameraFly::new();
    let eye = Vec3::new(0.0, 2.2, 6.0);
    let look = Vec3::new(0.0, 1.0, 0.0);
    fly.start(FlyMode::FarOrbit, eye, look, &targets());
    let mut last = eye;
    for _ in 0..600 {
        let (p, _) = fly.update(1.0 / 60.0, &targets()).unwrap();
        last = p;
    }
    // ten seconds in, the orbit has carried the camera well away from rest
    assert!((last - eye).length() > 1.0, "never left rest: {last:?}");
    assert!(last.is_finite());
}

#[test]
fn mode_switch_does_not_teleport() {
    let mut fly = CameraFly::new();
    let t = targets();
    fly.start(FlyMode::WideRing, Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, &t);
    let mut prev = Vec3::ZERO;
    for _ in 0..120 {
        let (p, _) = fly.update(1.0 / 60.0, &t).unwrap();
        prev = p;
    }
    fly.start(FlyMode::Riser, prev, Vec3::ZERO, &t);
    let (p, _) = fly.update(1.0 / 60.0, &t).unwrap();
    assert!(
        (p - prev).length() < 0.5,
        "teleported {} on mode switch",
        (p - prev).length()
    );
}

#[test]
fn shared_clock_survives_mode_switches() {
    // switching modes must not rewind the path clock, so two flies that
    // diverge in mode history still share phase when they reconverge
    let t = targets();
    let mut a = CameraFly::new();
    let mut b = CameraFly::new();
    let eye = Vec3::new(0.0, 2.0, 6.0);
    a.start(FlyMode::Pendulum, eye, Vec3::ZERO, &t);
    b.start(FlyMode::Pendulum, eye, Vec3::ZERO, &t);
    for _ in 0..300 {
        a.update(1.0 / 60.0, &t);
        b.update(1.0 / 60.0, &t);
    }
    b.start(FlyMode::Lissajous, eye, Vec3::ZERO, &t);
    for _ in 0..300 {
        a.update(1.0 / 60.0, &t);
        b.update(1.0 / 60.0, &t);
    }
    b.start(FlyMode::Pendulum, eye, Vec3::ZERO, &t);
    // long settle so the cross-blend completes
    let mut pa = Vec3::ZERO;
    let mut pb = Vec3::ZERO;
    for _ in 0..1200 {
        pa = a.update(1.0 / 60.0, &t).unwrap().0;
        pb = b.update(1.0 / 60.0, &t).unwrap().0;
    }
    assert!(
        (pa - pb).length() < 0.2,
        "clocks diverged: {} apart",
        (pa - pb).length()
    );
}

#[test]
fn stop_halts_updates_immediately() {
    let mut fly = CameraFly::new();
    let t = targets();
    fly.start(FlyMode::CloseOrbit, Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, &t);
    assert!(fly.update(1.0 / 60.0, &t).is_some());
    fly.stop();
    assert!(fly.update(1.0 / 60.0, &t).is_none());
}

#[test]
fn close_orbit_looks_at_the_emitter() {
    let mut fly = CameraFly::new();
    let t = targets();
    fly.start(FlyMode::CloseOrbit, Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, &t);
    let mut look = Vec3::ZERO;
    for _ in 0..1200 {
        look = fly.update(1.0 / 60.0, &t).unwrap().1;
    }
    assert!(
        (look - t.emitter).length() < 0.3,
        "look {look:?} vs emitter {:?}",
        t.emitter
    );
}

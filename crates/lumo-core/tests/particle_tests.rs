// Particle lifecycle, determinism, and the blob collision response.

use glam::{Mat4, Vec2, Vec3};

use lumo_core::constants::{BLOB_CENTER, P_COUNT};
use lumo_core::particles::{pointer_world_at_y, AmbientFlow, FlowConfig, FlowTuning, ParticleArena};
use lumo_core::probe::{BlobSurface, MediaProbe};
use lumo_core::rng::SeededRng;

fn seeded_arena(seed: u64) -> (AmbientFlow, ParticleArena) {
    let cfg = FlowConfig {
        seed: Some(seed),
        ..FlowConfig::default()
    };
    let mut rng = SeededRng::new(Some(seed));
    let arena = ParticleArena::new(&mut rng, &cfg, 8);
    (AmbientFlow::new(cfg), arena)
}

fn step_many(flow: &mut AmbientFlow, arena: &mut ParticleArena, steps: usize, dt: f32) {
    let vp = Mat4::IDENTITY;
    for _ in 0..steps {
        flow.step(
            arena,
            dt,
            FlowTuning::default(),
            None,
            &vp,
            Vec2::new(800.0, 600.0),
        );
    }
}

#[test]
fn arena_starts_full_with_staggered_lifetimes() {
    let (_, arena) = seeded_arena(7);
    assert_eq!(arena.len(), P_COUNT);
    for i in 0..arena.len() {
        assert!(arena.ttl[i] > 0.0);
        assert!(arena.life[i] >= 0.0 && arena.life[i] <= arena.ttl[i]);
    }
    // not all at the same age
    let first = arena.life[0];
    assert!(arena.life.iter().any(|&l| (l - first).abs() > 1e-3));
}

#[test]
fn life_stays_within_ttl_across_many_steps() {
    let (mut flow, mut arena) = seeded_arena(11);
    step_many(&mut flow, &mut arena, 600, 1.0 / 60.0);
    for i in 0..arena.len() {
        assert!(
            arena.life[i] >= 0.0 && arena.life[i] <= arena.ttl[i] + 1e-4,
            "slot {i}: life {} ttl {}",
            arena.life[i],
            arena.ttl[i]
        );
    }
}

#[test]
fn positions_stay_finite_under_long_integration() {
    let (mut flow, mut arena) = seeded_arena(3);
    step_many(&mut flow, &mut arena, 1200, 1.0 / 60.0);
    for p in &arena.positions {
        assert!(p.is_finite(), "non-finite position {p:?}");
    }
    for v in &arena.velocities {
        assert!(v.is_finite(), "non-finite velocity {v:?}");
    }
}

#[test]
fn same_seed_reproduces_the_same_field() {
    let (mut fa, mut aa) = seeded_arena(42);
    let (mut fb, mut ab) = seeded_arena(42);
    step_many(&mut fa, &mut aa, 240, 1.0 / 60.0);
    step_many(&mut fb, &mut ab, 240, 1.0 / 60.0);
    for i in 0..aa.len() {
        assert_eq!(aa.positions[i], ab.positions[i], "slot {i} diverged");
        assert_eq!(aa.life[i], ab.life[i]);
    }
}

#[test]
fn different_seeds_diverge() {
    let (mut fa, mut aa) = seeded_arena(1);
    let (mut fb, mut ab) = seeded_arena(2);
    step_many(&mut fa, &mut aa, 60, 1.0 / 60.0);
    step_many(&mut fb, &mut ab, 60, 1.0 / 60.0);
    let same = (0..aa.len())
        .filter(|&i| aa.positions[i] == ab.positions[i])
        .count();
    assert!(same < aa.len() / 2, "{same} identical of {}", aa.len());
}

#[test]
fn pointer_unprojection_recovers_a_projected_point() {
    let viewport = Vec2::new(800.0, 600.0);
    let proj = Mat4::perspective_rh(60f32.to_radians(), viewport.x / viewport.y, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 2.2, 6.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
    let view_proj = proj * view;

    let world = Vec3::new(0.6, 0.8, 1.5);
    let clip = view_proj * world.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    // canvas pixels are top-origin
    let px = Vec2::new(
        (ndc.x * 0.5 + 0.5) * viewport.x,
        (1.0 - (ndc.y * 0.5 + 0.5)) * viewport.y,
    );

    let inv = view_proj.inverse();
    let hit = pointer_world_at_y(px, world.y, &inv, viewport).unwrap();
    assert!(
        (hit - world).length() < 1e-3,
        "expected {world:?}, got {hit:?}"
    );
}

#[test]
fn tints_relax_toward_base_without_a_pointer() {
    let (mut flow, mut arena) = seeded_arena(13);
    for i in 0..arena.len() {
        arena.tints[i] = arena.base_tints[i] + Vec3::splat(0.5);
    }
    let before: f32 = (0..arena.len())
        .map(|i| (arena.tints[i] - arena.base_tints[i]).length())
        .sum();
    step_many(&mut flow, &mut arena, 30, 1.0 / 60.0);
    let after: f32 = (0..arena.len())
        .map(|i| (arena.tints[i] - arena.base_tints[i]).length())
        .sum();
    assert!(after < before * 0.5, "tints did not decay: {before} -> {after}");
}

#[test]
fn collision_pushes_outward_with_damped_y() {
    let surface = BlobSurface::new(9);
    let probe = MediaProbe::new();
    let mut rng = SeededRng::new(Some(5));
    let cfg = FlowConfig::default();
    let mut arena = ParticleArena::new(&mut rng, &cfg, 0);

    // park slot 0 just inside the surface along a diagonal
    let n = Vec3::new(1.0, 1.0, 0.0).normalize();
    arena.positions[0] = BLOB_CENTER + n * 0.5;
    arena.velocities[0] = Vec3::ZERO;

    surface.collision_pass(&mut arena, 1.0 / 60.0, 0.0, &probe, 0.2, 10.0);

    let v = arena.velocities[0];
    assert!(v.x > 0.0, "expected outward x push, got {v:?}");
    // vertical response is scaled down relative to horizontal
    assert!(v.y > 0.0 && v.y < v.x, "expected damped y push, got {v:?}");
}

#[test]
fn collision_leaves_distant_particles_alone() {
    let surface = BlobSurface::new(9);
    let probe = MediaProbe::new();
    let mut rng = SeededRng::new(Some(5));
    let cfg = FlowConfig::default();
    let mut arena = ParticleArena::new(&mut rng, &cfg, 0);

    arena.positions[0] = BLOB_CENTER + Vec3::new(10.0, 0.0, 0.0);
    arena.velocities[0] = Vec3::ZERO;
    surface.collision_pass(&mut arena, 1.0 / 60.0, 0.0, &probe, 0.2, 10.0);
    assert_eq!(arena.velocities[0], Vec3::ZERO);
}

#[test]
fn displaced_radius_is_bounded_by_amp() {
    let surface = BlobSurface::new(21);
    let probe = MediaProbe::new();
    let lim = surface.amp * 1.35;
    for i in 0..64 {
        let a = i as f32 * 0.37;
        let n = Vec3::new(a.cos(), (a * 0.7).sin(), a.sin()).normalize();
        let r = surface.displaced_radius(n, 1.5, &probe);
        assert!(
            r >= 1.0 - lim - 1e-5 && r <= 1.0 + lim + 1e-5,
            "radius {r} outside [1±{lim}]"
        );
    }
}

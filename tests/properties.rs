use dino_rl::config::{GameConfig, PerceptionConfig};
use dino_rl::game::SurfaceClass;
use dino_rl::geometry::{Point, Rect, Segment, segment_rect_hit};
use dino_rl::perception::Ray;
use dino_rl::{Action, Game, ObstacleKind, Posture};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_action(rng: &mut SmallRng) -> Action {
    match rng.gen_range(0..3) {
        0 => Action::Jump,
        1 => Action::Duck,
        _ => Action::None,
    }
}

#[test]
fn never_more_than_one_live_obstacle() {
    for seed in 0..20 {
        let cfg = GameConfig { spawn_probability: 0.5 + 0.025 * seed as f64, ..GameConfig::default() };
        let mut game = Game::new(cfg, seed);
        let mut rng = SmallRng::seed_from_u64(1000 + seed);
        for _ in 0..2_000 {
            let report = game.step(random_action(&mut rng));
            assert!(game.obstacles.len() <= 1);
            game.check_invariants().unwrap();
            if report.done {
                game.reset();
            }
        }
    }
}

#[test]
fn speed_ramps_monotonically_up_to_the_cap() {
    for (initial, increment, max) in [(8.0, 0.002, 16.0), (3.0, 0.7, 10.0), (12.0, 0.5, 12.0), (0.0, 1.3, 5.0)] {
        let cfg = GameConfig {
            initial_speed: initial,
            speed_increment: increment,
            max_speed: max,
            max_ticks: 10_000,
            spawn_probability: 0.0,
            ..GameConfig::default()
        };
        let mut game = Game::new(cfg, 0);
        let mut last = game.state.speed;
        // enough ticks to reach the cap, plus some time spent on it
        let ramp_ticks = ((max - initial) / increment).ceil() as usize + 50;
        for _ in 0..ramp_ticks {
            game.step(Action::Duck);
            assert!(game.state.speed >= last);
            assert!(game.state.speed <= max);
            last = game.state.speed;
        }
        assert_eq!(last, max);
    }
}

#[test]
fn every_jump_lands_exactly_on_the_ground() {
    for impulse in 1..=40 {
        for gravity in [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0] {
            let cfg = GameConfig {
                jump_impulse: impulse as f32,
                gravity,
                spawn_probability: 0.0,
                ..GameConfig::default()
            };
            let mut game = Game::new(cfg, 0);
            game.step(Action::Jump);
            let mut ticks = 1;
            while game.actor.posture == Posture::Jumping {
                game.step(Action::None);
                ticks += 1;
                assert!(ticks < 1_000, "impulse {impulse} gravity {gravity} never landed");
            }
            assert_eq!(game.actor.y, game.config.ground_y);
            assert_eq!(game.actor.velocity, 0.0);
        }
    }
}

/// Slab clipping as an independent reference: entry parameter of the segment
/// into the closed box, if any.
fn slab_entry(seg: &Segment, rect: &Rect) -> Option<(f32, f32)> {
    let d = (seg.b.x - seg.a.x, seg.b.y - seg.a.y);
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;
    for (p, d, lo, hi) in [(seg.a.x, d.0, rect.x, rect.right()), (seg.a.y, d.1, rect.y, rect.bottom())] {
        if d.abs() < 1e-9 {
            if p < lo || p > hi {
                return None;
            }
            continue;
        }
        let (mut t1, mut t2) = ((lo - p) / d, (hi - p) / d);
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some((t_min, t_max))
}

#[test]
fn ray_hits_a_box_iff_it_crosses_an_edge() {
    let mut rng = SmallRng::seed_from_u64(17);
    let rect = Rect::new(300.0, 250.0, 60.0, 80.0);
    let mut hits = 0;
    let mut misses = 0;
    for _ in 0..5_000 {
        let origin = Point::new(rng.gen_range(0.0..700.0), rng.gen_range(100.0..500.0));
        if rect.contains(origin) {
            continue;
        }
        let angle: f32 = rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let length = rng.gen_range(10.0..600.0);
        let seg = Segment::new(origin, Point::new(origin.x + length * angle.cos(), origin.y + length * angle.sin()));

        let reference = slab_entry(&seg, &rect);
        // grazing a corner or ending on an edge is numerically ambiguous
        if let Some((t_in, t_out)) = reference {
            if t_out - t_in < 1e-3 || (1.0 - t_in).abs() < 1e-3 {
                continue;
            }
        }

        match (segment_rect_hit(&seg, &rect), reference) {
            (Some((distance, point)), Some((t_in, _))) => {
                hits += 1;
                assert!((distance - origin.distance(point)).abs() < 1e-3);
                assert!((distance - t_in * length).abs() < 1e-2, "{distance} vs {}", t_in * length);
            }
            (None, None) => misses += 1,
            (got, want) => panic!("disagreement for {seg:?}: kernel {got:?}, slab {want:?}"),
        }
    }
    assert!(hits > 100 && misses > 100, "hits {hits} misses {misses}");
}

#[test]
fn ray_cast_distance_matches_the_reported_point() {
    let mut game = Game::new(GameConfig { spawn_probability: 0.0, ..GameConfig::default() }, 0);
    game.obstacles.push(dino_rl::game::Obstacle::spawn(ObstacleKind::LargeCactus, 240.0));
    let floor_y = PerceptionConfig::default().floor_y;
    let origin = Point::new(167.0, 330.0);
    let mut last_obstacle_distance = 0.0;
    for deg in [-20.0f32, -10.0, 0.0, 10.0, 20.0] {
        let ray = Ray { origin, angle: deg.to_radians(), length: 500.0 };
        let hit = ray.cast(&game, floor_y).unwrap();
        assert_eq!(hit.surface, SurfaceClass::Cactus);
        assert!((hit.distance - origin.distance(hit.point)).abs() < 1e-3);
        // the cactus face is a vertical line, so distance grows with |angle|
        if deg >= 0.0 {
            assert!(hit.distance >= last_obstacle_distance);
            last_obstacle_distance = hit.distance;
        }
    }
}

//! Ray-fan and scalar-feature views of the simulation.
//!
//! Vision mode casts `n_rays` rays from just ahead of the actor's head and
//! reports, per ray, the colour of the nearest surface faded by distance.
//! Lean mode reduces the scene to a handful of numbers about the next
//! obstacle and the actor itself.

use crate::config::{GameConfig, PerceptionConfig, PerceptionMode};
use crate::game::{Game, SurfaceClass};
use crate::geometry::{Point, Segment, segment_rect_hit};

impl SurfaceClass {
    pub const fn color(self) -> [f32; 3] {
        match self {
            SurfaceClass::Sky => [255.0, 255.0, 255.0],
            SurfaceClass::Floor => [83.0, 83.0, 83.0],
            SurfaceClass::Cactus => [34.0, 139.0, 34.0],
            SurfaceClass::Bird => [200.0, 40.0, 40.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point,
    /// Radians; positive angles point below the horizon.
    pub angle: f32,
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub surface: SurfaceClass,
    pub point: Point,
    pub distance: f32,
}

impl Ray {
    pub fn end(&self) -> Point {
        Point::new(
            self.origin.x + self.length * self.angle.cos(),
            self.origin.y + self.length * self.angle.sin(),
        )
    }

    pub fn segment(&self) -> Segment {
        Segment::new(self.origin, self.end())
    }

    /// Nearest obstacle crossing, else the floor for downward rays, else sky.
    pub fn cast(&self, game: &Game, floor_y: f32) -> Option<RayHit> {
        let seg = self.segment();
        let nearest = game
            .obstacles
            .iter()
            .filter_map(|o| segment_rect_hit(&seg, &o.rect).map(|(d, p)| (d, p, o.kind.profile().surface)))
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((distance, point, surface)) = nearest {
            return Some(RayHit { surface, point, distance });
        }
        if self.angle > 0.0 {
            let dy = (floor_y - self.origin.y).max(0.0);
            let dx = dy / self.angle.tan();
            let point = Point::new(self.origin.x + dx, self.origin.y + dy);
            return Some(RayHit { surface: SurfaceClass::Floor, point, distance: self.origin.distance(point) });
        }
        None
    }

    pub fn sense(&self, game: &Game, floor_y: f32) -> [f32; 3] {
        match self.cast(game, floor_y) {
            Some(hit) => {
                let fade = (1.0 - hit.distance / self.length).max(0.0);
                hit.surface.color().map(|c| c * fade)
            }
            None => SurfaceClass::Sky.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// `n_rays` triples in `[0, 255]`, ordered by ascending ray angle.
    Vision(Vec<[f32; 3]>),
    /// `(distance, type id, airborne[, height])`.
    Lean(Vec<f32>),
}

impl Observation {
    pub fn to_vec(&self) -> Vec<f32> {
        match self {
            Observation::Vision(rays) => rays.iter().flatten().copied().collect(),
            Observation::Lean(features) => features.clone(),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Observation::Vision(rays) => vec![rays.len(), 3],
            Observation::Lean(features) => vec![features.len()],
        }
    }

    /// Element-wise `value * scale`, the form the value network consumes.
    pub fn scaled(&self, scale: &[f32]) -> Vec<f32> {
        self.to_vec().iter().zip(scale).map(|(v, s)| v * s).collect()
    }
}

pub struct Perception {
    pub config: PerceptionConfig,
    screen_width: f32,
    ground_y: f32,
}

impl Perception {
    pub fn new(config: PerceptionConfig, game: &GameConfig) -> Self {
        Self { config, screen_width: game.screen_width, ground_y: game.ground_y }
    }

    pub fn observation_len(&self) -> usize {
        match self.config.mode {
            PerceptionMode::Vision => self.config.n_rays * 3,
            PerceptionMode::Lean if self.config.lean_height => 4,
            PerceptionMode::Lean => 3,
        }
    }

    pub fn input_scale(&self) -> Vec<f32> {
        match self.config.mode {
            PerceptionMode::Vision => vec![1.0 / 255.0; self.observation_len()],
            PerceptionMode::Lean => {
                let mut scale = vec![1.0 / self.screen_width, 1.0 / 3.0, 1.0];
                if self.config.lean_height {
                    scale.push(1.0 / self.ground_y);
                }
                scale
            }
        }
    }

    pub fn rays(&self, game: &Game) -> Vec<Ray> {
        let actor = game.actor_rect();
        let origin = Point::new(actor.right() + self.config.origin_offset.0, actor.y + self.config.origin_offset.1);
        let n = self.config.n_rays;
        let fov = self.config.fov_degrees.to_radians();
        // fraction of the fan in [-0.5, 0.5]; the middle ray of an odd fan is exactly 0
        let offset = |i: usize| if n > 1 { i as f32 / (n - 1) as f32 - 0.5 } else { 0.0 };
        (0..n)
            .map(|i| Ray { origin, angle: fov * offset(i), length: self.config.ray_length })
            .collect()
    }

    pub fn observe(&self, game: &Game) -> Observation {
        match self.config.mode {
            PerceptionMode::Vision => {
                Observation::Vision(self.rays(game).iter().map(|r| r.sense(game, self.config.floor_y)).collect())
            }
            PerceptionMode::Lean => Observation::Lean(self.lean_features(game)),
        }
    }

    fn lean_features(&self, game: &Game) -> Vec<f32> {
        let actor = game.actor_rect();
        let upcoming = game
            .obstacles
            .iter()
            .filter(|o| o.rect.right() >= actor.x)
            .min_by(|a, b| a.rect.x.total_cmp(&b.rect.x));
        let (distance, type_id) = match upcoming {
            Some(o) => (o.rect.x - actor.right(), o.kind.profile().type_id as f32),
            None => (self.screen_width, 0.0),
        };
        let airborne = if game.actor.airborne() { 1.0 } else { 0.0 };
        let mut features = vec![distance, type_id, airborne];
        if self.config.lean_height {
            features.push(self.ground_y - game.actor.y);
        }
        features
    }
}

//! Weapon events между ECS и хостом.
//!
//! ECS не владеет физикой: выстрел уходит хосту как `ShotFired`, хост делает
//! raycast / симулирует снаряд и возвращает `RaycastHit` / `ExplosionHits`.
//! Визуальные эффекты (muzzle flash, camera shake, трассеры) идут
//! fire-and-forget через `WeaponEffect`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Параметры снаряда (граната, ракета)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct ProjectileSpec {
    pub damage: f32,
    pub explosion_radius: f32,
    /// Через сколько секунд взрывается сам (если ни во что не попал)
    pub fuse_time: f32,
    pub speed: f32,
    pub bounce: bool,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            damage: 100.0,
            explosion_radius: 500.0,
            fuse_time: 3.0,
            speed: 2000.0,
            bounce: true,
        }
    }
}

/// Что именно хост должен выполнить для выстрела
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotPayload {
    Raycast { damage: f32, range: f32 },
    Projectile(ProjectileSpec),
}

/// Event: выстрел произошёл (ECS → host)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ShotFired {
    pub shooter: Entity,
    pub weapon: Entity,
    pub payload: ShotPayload,
    /// Сколько патронов реально ушло на выстрел
    pub bullets: u32,
}

/// Тип поверхности, в которую попал trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum SurfaceType {
    Flesh,
    Vulnerable,
    Other,
}

impl SurfaceType {
    /// Множитель урона по поверхности
    pub fn damage_multiplier(&self) -> f32 {
        match self {
            SurfaceType::Flesh => 1.0,
            SurfaceType::Vulnerable => 2.0,
            SurfaceType::Other => 0.0,
        }
    }
}

/// Event: результат raycast (host → ECS)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RaycastHit {
    pub shooter: Entity,
    pub weapon: Entity,
    /// None = промах (trace ни во что не попал)
    pub target: Option<Entity>,
    pub surface: SurfaceType,
    pub impact_point: Vec3,
    pub base_damage: f32,
}

/// Event: взрыв нужно посчитать (ECS → host overlap query)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ExplosionRequested {
    pub source: Entity,
    pub instigator: Option<Entity>,
    pub base_damage: f32,
    pub radius: f32,
    pub knockback: f32,
}

/// Event: кого задел взрыв (host → ECS)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ExplosionHits {
    pub source: Entity,
    pub instigator: Option<Entity>,
    pub center: Vec3,
    pub radius: f32,
    pub base_damage: f32,
    pub victims: Vec<Entity>,
}

/// Визуальный side-effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    MuzzleFlash,
    CameraShake,
    Impact { surface: SurfaceType, point: Vec3 },
    Tracer { end: Vec3 },
    Explosion { center: Vec3, radius: f32, debug_sphere: bool },
    Zoom { enabled: bool },
    Visibility { visible: bool },
}

/// Event: fire-and-forget эффект для rendering/VFX слоя
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponEffect {
    pub source: Entity,
    pub kind: EffectKind,
}

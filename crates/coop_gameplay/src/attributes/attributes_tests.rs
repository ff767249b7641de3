//! Tests for attributes, damage and explosive hazards.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::*;
    use crate::config::GameplayConfig;
    use crate::timers::TimerManager;
    use crate::weapon::{EffectKind, ExplosionRequested, WeaponEffect};

    fn damage_app() -> App {
        let mut app = App::new();
        app.add_event::<PointDamage>()
            .add_event::<RadialDamage>()
            .add_event::<HealthChanged>()
            .add_event::<EntityDied>()
            .add_event::<AttributesInitialized>()
            .add_event::<ExplosionRequested>()
            .add_event::<WeaponEffect>()
            .insert_resource(TimerManager::new())
            .insert_resource(GameplayConfig::default())
            .add_systems(
                Update,
                (
                    broadcast_initial_attributes,
                    apply_damage_events,
                    detonate_explosive_hazards,
                )
                    .chain(),
            );
        app
    }

    fn collect<E: Event + Clone>(app: &App) -> Vec<E> {
        let events = app.world().resource::<Events<E>>();
        let mut cursor = events.get_cursor();
        cursor.read(events).cloned().collect()
    }

    fn point(target: Entity, amount: f32) -> PointDamage {
        PointDamage {
            target,
            amount,
            damage_type: DamageType::Bullet,
            instigator: None,
            causer: Entity::PLACEHOLDER,
        }
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut attributes = Attributes::default();
        let outcome = attributes.apply_damage(250.0).expect("non-zero damage");

        assert_eq!(outcome.current_hp, 0.0);
        assert!(outcome.died);
        assert!(!attributes.is_alive());
    }

    #[test]
    fn test_revive_reports_restored_hp() {
        let mut attributes = Attributes::new(80.0, 10.0);
        attributes.apply_damage(30.0);

        assert_eq!(attributes.revive(), 30.0);
        assert_eq!(attributes.current_hp, 80.0);
        assert_eq!(attributes.revive(), 0.0, "already full");

        attributes.apply_damage(500.0);
        assert_eq!(attributes.revive(), 80.0);
        assert!(attributes.is_alive());
    }

    #[test]
    fn test_negative_damage_heals_up_to_max() {
        let mut attributes = Attributes::default();
        attributes.apply_damage(40.0);
        let outcome = attributes.apply_damage(-100.0).expect("heal");

        assert_eq!(outcome.current_hp, 100.0);
        assert!(!outcome.died);
    }

    #[test]
    fn test_zero_damage_is_noop() {
        let mut attributes = Attributes::new(50.0, 10.0);

        assert!(attributes.apply_damage(0.0).is_none());
        assert_eq!(attributes.current_hp, 50.0);
    }

    #[test]
    fn test_delta_is_hp_after_minus_amount() {
        let mut attributes = Attributes::default();
        let outcome = attributes.apply_damage(30.0).expect("damage");

        // 70 - 30
        assert_eq!(outcome.delta, 40.0);
    }

    #[test]
    fn test_death_reported_once() {
        let mut attributes = Attributes::default();

        assert!(attributes.apply_damage(100.0).is_some_and(|o| o.died));
        assert!(attributes.apply_damage(10.0).is_some_and(|o| !o.died));
        attributes.apply_damage(-50.0);
        assert!(attributes.apply_damage(100.0).is_some_and(|o| !o.died));
        assert!(attributes.has_died());
    }

    #[test]
    fn test_initial_broadcast_on_spawn() {
        let mut app = damage_app();
        let entity = app.world_mut().spawn(Attributes::new(120.0, 30.0)).id();

        app.update();

        let initialized = collect::<AttributesInitialized>(&app);
        assert_eq!(
            initialized,
            vec![AttributesInitialized {
                entity,
                max_hp: 120.0,
                max_atp: 30.0
            }]
        );

        app.update();
        assert!(collect::<AttributesInitialized>(&app).iter().all(|e| e.entity == entity));
    }

    #[test]
    fn test_lethal_hits_in_one_tick_kill_once() {
        let mut app = damage_app();
        let target = app.world_mut().spawn(Attributes::default()).id();

        app.world_mut().send_event(point(target, 60.0));
        app.world_mut().send_event(point(target, 60.0));
        app.world_mut().send_event(RadialDamage {
            victims: vec![target],
            amount: 60.0,
            damage_type: DamageType::Explosion,
            instigator: None,
            causer: Entity::PLACEHOLDER,
        });
        app.update();

        let changes = collect::<HealthChanged>(&app);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].current_hp, 40.0);
        assert_eq!(changes[1].current_hp, 0.0);
        assert_eq!(changes[2].damage_type, DamageType::Explosion);

        assert_eq!(collect::<EntityDied>(&app).len(), 1);
        assert!(app.world().entity(target).contains::<Dead>());
    }

    #[test]
    fn test_damage_to_entity_without_attributes_skipped() {
        let mut app = damage_app();
        let prop = app.world_mut().spawn_empty().id();

        app.world_mut().send_event(point(prop, 10.0));
        app.update();

        assert!(collect::<HealthChanged>(&app).is_empty());
    }

    #[test]
    fn test_barrel_explodes_once_and_schedules_despawn() {
        let mut app = damage_app();
        let barrel = app
            .world_mut()
            .spawn((
                Attributes::new(20.0, 0.0),
                ExplosiveHazard::default(),
                Transform::from_xyz(1.0, 2.0, 3.0),
            ))
            .id();

        app.world_mut().send_event(point(barrel, 50.0));
        app.world_mut().send_event(point(barrel, 50.0));
        app.update();

        let requests = collect::<ExplosionRequested>(&app);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].radius, 500.0);
        assert_eq!(requests[0].base_damage, 100.0);
        assert_eq!(requests[0].knockback, 50_000.0);

        let explosions: Vec<_> = collect::<WeaponEffect>(&app)
            .into_iter()
            .filter(|e| matches!(e.kind, EffectKind::Explosion { .. }))
            .collect();
        assert_eq!(explosions.len(), 1);
        assert_eq!(
            explosions[0].kind,
            EffectKind::Explosion {
                center: Vec3::new(1.0, 2.0, 3.0),
                radius: 500.0,
                debug_sphere: false
            }
        );

        let hazard = app.world().get::<ExplosiveHazard>(barrel).expect("hazard");
        assert!(!hazard.is_armed());
        assert_eq!(app.world().resource::<TimerManager>().active_count_for(barrel), 1);

        // Ещё урон по мёртвой бочке: второго despawn таймера нет
        app.world_mut().send_event(point(barrel, 5.0));
        app.update();
        assert_eq!(app.world().resource::<TimerManager>().active_count_for(barrel), 1);
    }

    #[test]
    fn test_healing_does_not_detonate() {
        let mut hazard = ExplosiveHazard::default();

        assert!(!hazard.try_detonate(10.0));
        assert!(hazard.try_detonate(0.0));
        assert!(!hazard.try_detonate(0.0));
    }
}

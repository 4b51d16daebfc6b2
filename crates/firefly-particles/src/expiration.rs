//! Lifetime expiry

use crate::particle::Particle;
use crate::variant::VariantParams;
use firefly_ecs::{DeferredCommands, Entity, FireflyWorld, SharedIndex};
use rayon::prelude::*;
use std::collections::HashMap;

/// A particle dies once its age is strictly past its randomized life
pub fn is_expired(age: f32, life: f32, life_random: f32) -> bool {
    age > life * life_random
}

/// Queue every expired particle for destruction, then apply the queue.
///
/// The scan is parallel and only reads; structural changes happen after it
/// completes. Returns the number of particles destroyed.
pub fn expire(world: &mut FireflyWorld, commands: &mut DeferredCommands) -> usize {
    let lives: HashMap<SharedIndex<VariantParams>, f32> = world
        .shared::<VariantParams>()
        .map(|store| store.iter().map(|(key, params)| (key, params.life)).collect())
        .unwrap_or_default();

    let candidates: Vec<(Entity, f32, f32, SharedIndex<VariantParams>)> = {
        let mut query = world
            .ecs()
            .query::<(&Particle, &SharedIndex<VariantParams>)>();
        query
            .iter()
            .map(|(entity, (particle, variant))| {
                (entity, particle.age, particle.life_random, *variant)
            })
            .collect()
    };

    let expired: Vec<Entity> = candidates
        .par_iter()
        .filter(|(_, age, life_random, variant)| {
            lives
                .get(variant)
                .is_some_and(|life| is_expired(*age, *life, *life_random))
        })
        .map(|(entity, ..)| *entity)
        .collect();

    if expired.is_empty() {
        return 0;
    }
    commands.destroy_all(expired);
    let destroyed = world.apply(commands);
    log::debug!("[firefly] expired {destroyed} particle(s)");
    destroyed
}

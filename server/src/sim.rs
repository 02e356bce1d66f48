//! One deterministic advance of the world.
//!
//! The step takes the RNG as a parameter so tests can drive it with a
//! seeded generator and no networking. Pass order is load-bearing:
//! bullet-alien resolution runs strictly before alien-ship resolution,
//! which lets a bullet and the ship it protects both hit the same alien
//! in one tick without double-removal.

use crate::world::World;
use rand::Rng;
use shared::{
    collides, Alien, ALIEN_SPAWN_CHANCE, ALIEN_SPAWN_X_MAX, ALIEN_SPAWN_Y, ALIEN_SPEED,
    BULLET_SPEED, KILL_SCORE, WORLD_HEIGHT,
};

/// Result of a single simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    GameOver { loser: u32 },
}

/// Advances the world by one tick: bullet movement, alien spawning, alien
/// movement, then the two collision passes.
pub fn step<R: Rng>(world: &mut World, rng: &mut R) -> StepOutcome {
    advance_bullets(world);
    maybe_spawn_alien(world, rng);
    advance_aliens(world);
    resolve_bullet_hits(world);
    resolve_ship_hits(world)
}

/// Bullets travel up; anything past the top edge is dropped.
fn advance_bullets(world: &mut World) {
    for bullet in &mut world.bullets {
        bullet.y -= BULLET_SPEED;
    }
    world.bullets.retain(|bullet| bullet.y >= 0.0);
}

/// Independent 2% chance per tick of one new alien above the playfield.
fn maybe_spawn_alien<R: Rng>(world: &mut World, rng: &mut R) {
    if rng.gen_bool(ALIEN_SPAWN_CHANCE) {
        world.aliens.push(Alien {
            x: rng.gen_range(0..=ALIEN_SPAWN_X_MAX) as f32,
            y: ALIEN_SPAWN_Y,
            health: rng.gen_range(2..=4),
            kind: rng.gen_range(1..=3),
        });
    }
}

/// Aliens descend; anything past the bottom edge is dropped.
fn advance_aliens(world: &mut World) {
    for alien in &mut world.aliens {
        alien.y += ALIEN_SPEED;
    }
    world.aliens.retain(|alien| alien.y <= WORLD_HEIGHT);
}

/// Each bullet hits at most the first alien it overlaps, in alien
/// insertion order. The bullet is always consumed on a hit; the alien is
/// removed only when its health runs out, crediting the shooter if they
/// still hold a score entry.
fn resolve_bullet_hits(world: &mut World) {
    let mut i = 0;
    while i < world.bullets.len() {
        let hit = world
            .aliens
            .iter()
            .position(|alien| collides(&world.bullets[i], alien));

        match hit {
            Some(j) => {
                world.aliens[j].health -= 1;
                if world.aliens[j].health <= 0 {
                    world.aliens.remove(j);
                    let owner = world.bullets[i].owner;
                    if let Some(points) = world.scores.get_mut(&owner) {
                        *points += KILL_SCORE;
                    }
                }
                world.bullets.remove(i);
            }
            None => i += 1,
        }
    }
}

/// Each alien rams at most the first ship it overlaps, in ascending
/// player-id order. The alien is always consumed; a ship reduced to zero
/// health ends the session immediately, aborting the rest of the pass.
fn resolve_ship_hits(world: &mut World) -> StepOutcome {
    let mut k = 0;
    while k < world.aliens.len() {
        let rammed = world
            .ships
            .iter()
            .find(|(_, ship)| collides(&world.aliens[k], *ship))
            .map(|(&id, _)| id);

        match rammed {
            Some(id) => {
                world.aliens.remove(k);
                if let Some(ship) = world.ships.get_mut(&id) {
                    ship.health -= 1;
                    if ship.health <= 0 {
                        return StepOutcome::GameOver { loser: id };
                    }
                }
            }
            None => k += 1,
        }
    }
    StepOutcome::Running
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{Bullet, GameMode};

    /// Never produces a spawn: every draw is the largest possible value.
    fn no_spawn_rng() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn active_world_with_player(id: u32) -> World {
        let mut world = World::new();
        world.reset(GameMode::Endless);
        world.register_player(id);
        world
    }

    fn alien_at(x: f32, y: f32, health: i32) -> Alien {
        Alien {
            x,
            y,
            health,
            kind: 1,
        }
    }

    #[test]
    fn test_bullets_advance_and_exit_top() {
        let mut world = World::new();
        world.bullets.push(Bullet {
            x: 100.0,
            y: 3.0,
            owner: 1,
        });
        world.bullets.push(Bullet {
            x: 200.0,
            y: 400.0,
            owner: 1,
        });

        step(&mut world, &mut no_spawn_rng());

        assert_eq!(world.bullets.len(), 1);
        assert_approx_eq!(world.bullets[0].y, 400.0 - BULLET_SPEED, 0.001);
    }

    #[test]
    fn test_aliens_advance_and_exit_bottom() {
        let mut world = World::new();
        world.aliens.push(alien_at(100.0, 799.5, 3));
        world.aliens.push(alien_at(200.0, 100.0, 3));

        step(&mut world, &mut no_spawn_rng());

        assert_eq!(world.aliens.len(), 1);
        assert_approx_eq!(world.aliens[0].y, 100.0 + ALIEN_SPEED, 0.001);
    }

    #[test]
    fn test_cleanup_invariant_holds_after_step() {
        let mut world = World::new();
        for y in [-20.0, 0.0, 2.0, 4.9, 750.0, 799.0] {
            world.bullets.push(Bullet {
                x: 0.0,
                y,
                owner: 1,
            });
            world.aliens.push(alien_at(1100.0, y, 3));
        }

        step(&mut world, &mut no_spawn_rng());

        assert!(world.bullets.iter().all(|b| b.y >= 0.0));
        assert!(world.aliens.iter().all(|a| a.y <= WORLD_HEIGHT));
    }

    #[test]
    fn test_spawned_aliens_respect_bounds() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(42);
        let mut spawned = 0;

        for _ in 0..5000 {
            let before = world.aliens.len();
            maybe_spawn_alien(&mut world, &mut rng);
            if world.aliens.len() > before {
                let alien = world.aliens.last().unwrap();
                assert!(alien.x >= 0.0 && alien.x <= ALIEN_SPAWN_X_MAX as f32);
                assert_eq!(alien.y, ALIEN_SPAWN_Y);
                assert!((2..=4).contains(&alien.health));
                assert!((1..=3).contains(&alien.kind));
                spawned += 1;
            }
        }

        // 2% of 5000 ticks; far enough from zero to be stable per seed
        assert!(spawned > 20, "only {} aliens spawned", spawned);
    }

    #[test]
    fn test_bullet_wounds_alien_without_killing() {
        // Ship at spawn, alien dead ahead, bullet already in flight.
        let mut world = active_world_with_player(1);
        world.apply_move(1, 100.0, 700.0); // park the ship out of ram range
        world.aliens.push(alien_at(600.0, 700.0, 2));
        world.bullets.push(Bullet {
            x: 600.0,
            y: 680.0,
            owner: 1,
        });

        let outcome = step(&mut world, &mut no_spawn_rng());

        // Bullet moved to 675, alien to 702, delta 27 < 40: a hit.
        assert_eq!(outcome, StepOutcome::Running);
        assert!(world.bullets.is_empty());
        assert_eq!(world.aliens.len(), 1);
        assert_eq!(world.aliens[0].health, 1);
        assert_eq!(world.scores.get(&1), Some(&0));
    }

    #[test]
    fn test_kill_credits_shooter() {
        let mut world = active_world_with_player(1);
        world.apply_move(1, 100.0, 700.0);
        world.aliens.push(alien_at(600.0, 300.0, 1));
        world.bullets.push(Bullet {
            x: 600.0,
            y: 320.0,
            owner: 1,
        });

        step(&mut world, &mut no_spawn_rng());

        assert!(world.aliens.is_empty());
        assert!(world.bullets.is_empty());
        assert_eq!(world.scores.get(&1), Some(&KILL_SCORE));
    }

    #[test]
    fn test_kill_by_unregistered_owner_still_removes_alien() {
        let mut world = active_world_with_player(1);
        world.apply_move(1, 100.0, 700.0);
        world.aliens.push(alien_at(600.0, 300.0, 1));
        world.bullets.push(Bullet {
            x: 600.0,
            y: 320.0,
            owner: 99, // no such player
        });

        step(&mut world, &mut no_spawn_rng());

        assert!(world.aliens.is_empty());
        assert!(world.bullets.is_empty());
        assert_eq!(world.scores.get(&1), Some(&0));
        assert!(!world.scores.contains_key(&99));
    }

    #[test]
    fn test_bullet_stops_at_first_alien_in_insertion_order() {
        let mut world = active_world_with_player(1);
        world.apply_move(1, 1000.0, 700.0);
        // Two aliens both overlapping the bullet's post-move position.
        world.aliens.push(alien_at(590.0, 310.0, 2));
        world.aliens.push(alien_at(610.0, 310.0, 2));
        world.bullets.push(Bullet {
            x: 600.0,
            y: 320.0,
            owner: 1,
        });

        step(&mut world, &mut no_spawn_rng());

        assert!(world.bullets.is_empty());
        assert_eq!(world.aliens[0].health, 1); // first inserted took the hit
        assert_eq!(world.aliens[1].health, 2);
    }

    #[test]
    fn test_alien_rams_ship_and_game_continues() {
        let mut world = active_world_with_player(1);
        world.apply_move(1, 600.0, 698.0);
        world.aliens.push(alien_at(600.0, 700.0, 1));

        let outcome = step(&mut world, &mut no_spawn_rng());

        assert_eq!(outcome, StepOutcome::Running);
        assert!(world.aliens.is_empty());
        assert_eq!(world.ships.get(&1).unwrap().health, 2);
        assert!(world.active);
    }

    #[test]
    fn test_fatal_ram_reports_game_over() {
        let mut world = active_world_with_player(1);
        world.apply_move(1, 600.0, 698.0);
        world.ships.get_mut(&1).unwrap().health = 1;
        world.aliens.push(alien_at(600.0, 700.0, 1));

        let outcome = step(&mut world, &mut no_spawn_rng());

        assert_eq!(outcome, StepOutcome::GameOver { loser: 1 });
        assert_eq!(world.ships.get(&1).unwrap().health, 0);
        assert!(world.aliens.is_empty());
    }

    #[test]
    fn test_fatal_ram_aborts_rest_of_pass() {
        let mut world = active_world_with_player(1);
        world.register_player(2);
        world.apply_move(1, 200.0, 700.0);
        world.apply_move(2, 800.0, 700.0);
        world.ships.get_mut(&1).unwrap().health = 1;
        // First alien kills ship 1; second would hit ship 2 but the pass
        // aborts before reaching it.
        world.aliens.push(alien_at(200.0, 700.0, 3));
        world.aliens.push(alien_at(800.0, 700.0, 3));

        let outcome = step(&mut world, &mut no_spawn_rng());

        assert_eq!(outcome, StepOutcome::GameOver { loser: 1 });
        assert_eq!(world.ships.get(&2).unwrap().health, 3);
        assert_eq!(world.aliens.len(), 1);
    }

    #[test]
    fn test_bullet_pass_runs_before_ship_pass() {
        // One alien overlapping both a bullet and the ship it threatens.
        // The bullet wounds it first, then the ram consumes it; the kill
        // is not double-counted and no score is awarded for the ram.
        let mut world = active_world_with_player(1);
        world.apply_move(1, 600.0, 700.0);
        world.aliens.push(alien_at(600.0, 700.0, 2));
        world.bullets.push(Bullet {
            x: 600.0,
            y: 680.0,
            owner: 1,
        });

        let outcome = step(&mut world, &mut no_spawn_rng());

        assert_eq!(outcome, StepOutcome::Running);
        assert!(world.bullets.is_empty());
        assert!(world.aliens.is_empty());
        assert_eq!(world.ships.get(&1).unwrap().health, 2);
        assert_eq!(world.scores.get(&1), Some(&0));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed: u64| {
            let mut world = active_world_with_player(1);
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..2000 {
                if step(&mut world, &mut rng) != StepOutcome::Running {
                    break;
                }
            }
            world.snapshot()
        };

        assert_eq!(run(7), run(7));
    }
}

//! The authoritative world state.
//!
//! [`World`] is the single owner of every entity collection and the session
//! flags. Command handlers and the simulation step mutate it from the same
//! serialized loop, so no locking happens at this level. Ships and scores
//! live in `BTreeMap`s keyed by player id: every enumeration (snapshots,
//! winner computation, alien-ship scans) runs in ascending-id order, which
//! is the documented tie-break rule throughout.

use log::info;
use shared::{
    Alien, Bullet, GameMode, PowerUp, Ship, Snapshot, BULLET_MUZZLE_OFFSET,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct World {
    pub ships: BTreeMap<u32, Ship>,
    pub aliens: Vec<Alien>,
    pub bullets: Vec<Bullet>,
    pub power_ups: Vec<PowerUp>,
    pub scores: BTreeMap<u32, u32>,
    pub active: bool,
    pub mode: Option<GameMode>,
}

impl World {
    /// An empty, inactive world. No session is running until the first
    /// start command arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything from the previous session and activates a new
    /// one. Every start command goes through here, so starting a game
    /// also wipes the entities and scores of players who did not ask for
    /// the restart.
    pub fn reset(&mut self, mode: GameMode) {
        self.ships.clear();
        self.aliens.clear();
        self.bullets.clear();
        self.power_ups.clear();
        self.scores.clear();
        self.active = true;
        self.mode = Some(mode);
        info!("World reset, new session in mode '{}'", mode.as_str());
    }

    /// Marks the session over. The tick loop checks the flag once per
    /// iteration, so the scheduler stops within one tick.
    pub fn end(&mut self) {
        self.active = false;
    }

    /// Creates a ship at the spawn point and a zero score for the player.
    /// A rejoin overwrites both, re-initializing only that player.
    pub fn register_player(&mut self, id: u32) {
        self.ships.insert(id, Ship::new());
        self.scores.insert(id, 0);
        info!("Registered player {}", id);
    }

    /// Removes the player's ship and score. Disconnects can race with
    /// resets, so a missing entry is not an error.
    pub fn unregister_player(&mut self, id: u32) {
        self.ships.remove(&id);
        self.scores.remove(&id);
        info!("Unregistered player {}", id);
    }

    /// Absolute position overwrite. The client clamps to the playfield;
    /// the server trusts the coordinates as-is. No-op for unknown ids.
    pub fn apply_move(&mut self, id: u32, x: f32, y: f32) {
        if let Some(ship) = self.ships.get_mut(&id) {
            ship.x = x;
            ship.y = y;
        }
    }

    /// Spawns a bullet just above the player's ship. No-op for unknown ids.
    pub fn apply_shoot(&mut self, id: u32) {
        if let Some(ship) = self.ships.get(&id) {
            self.bullets.push(Bullet {
                x: ship.x,
                y: ship.y - BULLET_MUZZLE_OFFSET,
                owner: id,
            });
        }
    }

    /// Owned deep copy of the whole world, handed to the broadcast path so
    /// serialization never observes a half-applied mutation.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ships: self.ships.clone(),
            aliens: self.aliens.clone(),
            bullets: self.bullets.clone(),
            power_ups: self.power_ups.clone(),
            scores: self.scores.clone(),
            game_active: self.active,
            game_mode: self.mode,
        }
    }

    /// Highest-scoring player. Ties go to the lowest id because scores are
    /// enumerated in ascending key order and only a strictly greater score
    /// displaces the current best.
    pub fn winner(&self) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for (&id, &points) in &self.scores {
            match best {
                Some((_, top)) if points <= top => {}
                _ => best = Some((id, points)),
            }
        }
        best.map(|(id, _)| id)
    }
}

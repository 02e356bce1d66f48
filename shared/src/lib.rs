//! Wire protocol and entity definitions shared between the authoritative
//! server and any client implementation.
//!
//! The playfield is a fixed 1200x800 logical area. The server owns the
//! canonical state; everything here is passive data plus the collision
//! predicate both sides must agree on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WORLD_WIDTH: f32 = 1200.0;
pub const WORLD_HEIGHT: f32 = 800.0;

pub const SHIP_SPAWN_X: f32 = 600.0;
pub const SHIP_SPAWN_Y: f32 = 700.0;
pub const SHIP_START_HEALTH: i32 = 3;

pub const BULLET_SPEED: f32 = 5.0;
pub const BULLET_MUZZLE_OFFSET: f32 = 20.0;

pub const ALIEN_SPEED: f32 = 2.0;
pub const ALIEN_SPAWN_Y: f32 = -50.0;
pub const ALIEN_SPAWN_X_MAX: u32 = 1150;
pub const ALIEN_SPAWN_CHANCE: f64 = 0.02;

/// Two entities collide when both coordinate deltas are below this.
pub const HIT_RANGE: f32 = 40.0;
pub const KILL_SCORE: u32 = 50;

pub const PROTOCOL_VERSION: u32 = 1;

/// Selectable game modes. Only the mode tag differs server-side; the
/// simulation rules are identical across modes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Endless,
    Feature,
    TwoPlayer,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Endless => "endless",
            GameMode::Feature => "feature",
            GameMode::TwoPlayer => "twoPlayer",
        }
    }
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "endless" => Ok(GameMode::Endless),
            "feature" => Ok(GameMode::Feature),
            "twoPlayer" => Ok(GameMode::TwoPlayer),
            other => Err(format!("unknown game mode: {}", other)),
        }
    }
}

/// A player-controlled ship. One exists per registered player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ship {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    /// Reserved for collected power-up effects; currently never populated.
    pub power_ups: BTreeMap<String, u32>,
}

impl Ship {
    pub fn new() -> Self {
        Self {
            x: SHIP_SPAWN_X,
            y: SHIP_SPAWN_Y,
            health: SHIP_START_HEALTH,
            power_ups: BTreeMap::new(),
        }
    }
}

impl Default for Ship {
    fn default() -> Self {
        Self::new()
    }
}

/// A server-spawned enemy descending toward the bottom edge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Alien {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub kind: u8,
}

/// A projectile fired by a ship, travelling toward the top edge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub owner: u32,
}

/// Defined for wire compatibility; no current rule ever spawns one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PowerUp {
    pub x: f32,
    pub y: f32,
    pub kind: u8,
}

/// Anything with a 2D position that can participate in collision checks.
pub trait Position {
    fn pos(&self) -> (f32, f32);
}

impl Position for Ship {
    fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Position for Alien {
    fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Position for Bullet {
    fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Position for PowerUp {
    fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Axis-aligned proximity test. Deliberately cheaper than per-sprite
/// bounding boxes; both axes must be within [`HIT_RANGE`].
pub fn collides<A: Position, B: Position>(a: &A, b: &B) -> bool {
    let (x1, y1) = a.pos();
    let (x2, y2) = b.pos();
    (x1 - x2).abs() < HIT_RANGE && (y1 - y2).abs() < HIT_RANGE
}

/// Point-in-time copy of the whole world, safe to serialize while the
/// simulation keeps mutating the original.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub ships: BTreeMap<u32, Ship>,
    pub aliens: Vec<Alien>,
    pub bullets: Vec<Bullet>,
    pub power_ups: Vec<PowerUp>,
    pub scores: BTreeMap<u32, u32>,
    pub game_active: bool,
    pub game_mode: Option<GameMode>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // client -> server
    Connect {
        client_version: u32,
    },
    StartGame {
        mode: GameMode,
    },
    PlayerMove {
        x: f32,
        y: f32,
    },
    PlayerShoot,
    Disconnect,

    // server -> client
    Connected {
        client_id: u32,
    },
    GameState {
        snapshot: Snapshot,
    },
    GameStarted {
        mode: GameMode,
        player_id: u32,
    },
    GameOver {
        scores: BTreeMap<u32, u32>,
        winner: u32,
    },
    Disconnected {
        reason: String,
    },
}

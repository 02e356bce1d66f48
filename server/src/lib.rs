//! # Authoritative Game Server Library
//!
//! This library implements the server side of a real-time arcade combat
//! game. The server owns the one true copy of the world — ships, aliens,
//! bullets, and scores — advances it on a fixed ~60Hz cadence, and streams
//! snapshots to every connected client so they all render the same state.
//!
//! ## Architecture
//!
//! ### Single Serialized Loop
//! All world mutation happens on one task: inbound commands and tick
//! firings are two arms of the same `tokio::select!` in
//! [`network::Server::run`]. Command application and simulation steps
//! therefore interleave at whole-operation granularity and the world
//! needs no lock. Socket receive, socket send, and timeout checking run
//! as separate tasks that only talk to the main loop over channels.
//!
//! ### Module Organization
//!
//! - [`world`] — the authoritative state store: entity collections,
//!   session flags, command application, and snapshot extraction.
//! - [`sim`] — one deterministic simulation step: movement, spawning,
//!   and the two collision-resolution passes. Takes its RNG as a
//!   parameter so tests can drive it without networking.
//! - [`client_manager`] — connected transport sessions, address lookup,
//!   and silence-based timeout detection.
//! - [`network`] — UDP transport, command dispatch, the tick scheduler,
//!   and snapshot fan-out.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(16), // ~60Hz tick
//!         16,
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Philosophy
//!
//! No inbound command can corrupt the world or kill the process. A
//! command referring to a missing player is a silent no-op, a datagram
//! that fails to decode is logged and dropped, and lifecycle-order
//! violations (moving before any game has started) fall out naturally as
//! no-ops because the ship does not exist yet.

pub mod client_manager;
pub mod network;
pub mod sim;
pub mod world;

//! Server network layer: UDP transport, command dispatch, and the tick loop.
//!
//! All world mutation happens on the one task running [`Server::run`].
//! Inbound commands and tick firings are two arms of the same
//! `tokio::select!`, so command application and simulation steps are
//! serialized by construction and the world needs no lock. Outbound
//! traffic goes through a dedicated sender task over a channel; a slow
//! receiver queues there and never stalls a tick.

use crate::client_manager::ClientManager;
use crate::sim::{self, StepOutcome};
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the outbound sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// Main server coordinating networking and the authoritative simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: World,
    rng: StdRng,
    tick_duration: Duration,
    tick: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            world: World::new(),
            rng: StdRng::from_entropy(),
            tick_duration,
            tick: 0,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx,
        })
    }

    /// The address the server socket is bound to. Useful when binding to
    /// port 0 and needing the kernel-assigned port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the task that continuously listens for incoming datagrams
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 4096];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            // Bad request: log and drop, never fault the session
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outbound queue onto the socket
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut outbound_rx = std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that watches for silent clients
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.outbound_tx.send(OutboundMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: &Packet) {
        if let Err(e) = self.outbound_tx.send(OutboundMessage::BroadcastPacket {
            packet: packet.clone(),
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Queues the current world snapshot for fan-out to every client
    fn broadcast_game_state(&self) {
        let packet = Packet::GameState {
            snapshot: self.world.snapshot(),
        };
        self.broadcast_packet(&packet);
    }

    /// Applies one inbound command to the world
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        // Resolve the sender first; gameplay packets from unknown
        // addresses are dropped below.
        let sender_id = {
            let clients = self.clients.read().await;
            clients.find_client_by_addr(addr)
        };

        if let Some(client_id) = sender_id {
            let mut clients = self.clients.write().await;
            clients.touch(client_id);
        }

        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // A reconnect from the same address replaces the old session
                if let Some(existing_id) = sender_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.world.unregister_player(existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => {
                        self.send_packet(&Packet::Connected { client_id }, addr);
                        // One immediate snapshot so a fresh client can
                        // render the world before the next tick broadcast.
                        let snapshot = self.world.snapshot();
                        self.send_packet(&Packet::GameState { snapshot }, addr);
                    }
                    None => {
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_packet(&response, addr);
                    }
                }
            }

            Packet::StartGame { mode } => {
                if let Some(client_id) = sender_id {
                    info!("Player {} starting game in mode '{}'", client_id, mode.as_str());
                    self.world.reset(mode);
                    self.world.register_player(client_id);
                    self.broadcast_packet(&Packet::GameStarted {
                        mode,
                        player_id: client_id,
                    });
                }
            }

            Packet::PlayerMove { x, y } => {
                if let Some(client_id) = sender_id {
                    self.world.apply_move(client_id, x, y);
                    self.broadcast_game_state();
                }
            }

            Packet::PlayerShoot => {
                if let Some(client_id) = sender_id {
                    self.world.apply_shoot(client_id);
                    self.broadcast_game_state();
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = sender_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.world.unregister_player(client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Runs one scheduled tick: advance the simulation and broadcast.
    /// Skipped entirely while no session is active.
    fn run_tick(&mut self) {
        if !self.world.active {
            return;
        }

        self.tick += 1;

        if let StepOutcome::GameOver { loser } = sim::step(&mut self.world, &mut self.rng) {
            self.world.end();
            let winner = self.world.winner().unwrap_or(loser);
            info!(
                "Game over at tick {}: player {} destroyed, winner is {}",
                self.tick, loser, winner
            );
            self.broadcast_packet(&Packet::GameOver {
                scores: self.world.scores.clone(),
                winner,
            });
        }

        // Broadcast the post-step snapshot even on the game-over tick so
        // clients see the final world with game_active already false.
        self.broadcast_game_state();

        if self.tick % 60 == 0 {
            debug!(
                "Tick {}: {} ships, {} aliens, {} bullets",
                self.tick,
                self.world.ships.len(),
                self.world.aliens.len(),
                self.world.bullets.len()
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.world.unregister_player(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.run_tick();
                },
            }
        }

        Ok(())
    }
}

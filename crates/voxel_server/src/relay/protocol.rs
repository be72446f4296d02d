//! Session protocol handling.
//!
//! [`Relay`] is the single piece of shared mutable state in the server: the
//! world grid plus the registry of connected sessions. Connection handlers
//! hold it behind one `tokio::sync::Mutex` and call into it for every
//! connect, inbound message and disconnect. Each call mutates state and
//! enqueues the resulting broadcast before returning, so every session sees
//! events in the order the relay accepted them.

use super::dispatcher::{broadcast, send_to};
use super::stats::RelayStats;
use crate::config::ServerConfig;
use crate::connection::{ClientRegistry, OutboundSender, Pose, SessionId};
use crate::error::RelayError;
use crate::messaging::{BlockCoords, ClientMessage, PlayerState, ServerMessage};
use crate::world::{Color, VoxelPos, WorldGrid, FLOOR_LAYER};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Outcome of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// State changed and the change was broadcast
    Applied,
    /// Nothing changed and nothing was sent
    Ignored(IgnoreReason),
}

/// Why a well-formed message had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Attempt to edit the bottom layer
    ProtectedFloor,
    /// Block coordinates outside the grid or not integral
    OutOfBounds,
    UnknownAction,
    /// The sender is not (or no longer) registered
    UnknownSession,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            IgnoreReason::ProtectedFloor => "protected floor",
            IgnoreReason::OutOfBounds => "out of bounds",
            IgnoreReason::UnknownAction => "unknown action",
            IgnoreReason::UnknownSession => "unknown session",
        };
        f.write_str(reason)
    }
}

/// Which block edit a client asked for.
#[derive(Debug, Clone, Copy)]
enum BlockEdit {
    Place,
    Break,
}

/// The world and every session connected to it.
#[derive(Debug)]
pub struct Relay {
    world: WorldGrid,
    registry: ClientRegistry,
    spawn: Pose,
    max_connections: usize,
    stats: Arc<RelayStats>,
}

impl Relay {
    /// Builds a fresh world from the configuration with no sessions.
    pub fn new(config: &ServerConfig, stats: Arc<RelayStats>) -> Self {
        let world = WorldGrid::new(&config.world);
        let spawn = Pose::at(
            config.world.width as f64 / 2.0,
            config.world.spawn_height,
            config.world.depth as f64 / 2.0,
        );

        Self {
            world,
            registry: ClientRegistry::new(),
            spawn,
            max_connections: config.max_connections,
            stats,
        }
    }

    /// Registers a new session and brings it up to date.
    ///
    /// The session first receives a private `connect` message with its own
    /// state, a snapshot of the world and a record of every other live
    /// session. A `join` for it is then broadcast to all sessions, itself
    /// included.
    pub fn connect(&mut self, outbound: OutboundSender) -> Result<SessionId, RelayError> {
        if self.registry.len() >= self.max_connections {
            self.stats.session_refused();
            return Err(RelayError::ServerFull {
                capacity: self.max_connections,
            });
        }

        let players: Vec<PlayerState> = self.registry.iter().map(|session| session.state()).collect();
        let id = self.registry.insert(self.spawn, outbound);
        self.stats.session_opened();

        let session = self
            .registry
            .get(id)
            .ok_or(RelayError::UnknownSession(id))?;
        let state = session.state();

        send_to(
            session,
            ServerMessage::Connect {
                player: state,
                map: self.world.snapshot(),
                players,
            },
        );
        let delivered = broadcast(&self.registry, ServerMessage::Join(state));
        self.stats.events_broadcast(delivered);

        info!("👋 Session {} joined ({} connected)", id, self.registry.len());
        Ok(id)
    }

    /// Applies one decoded client message from session `id`.
    pub fn handle_message(&mut self, id: SessionId, message: ClientMessage) -> Disposition {
        let disposition = self.apply(id, message);

        match disposition {
            Disposition::Applied => self.stats.message_applied(),
            Disposition::Ignored(reason) => {
                debug!("Ignoring message from session {}: {}", id, reason);
                self.stats.message_ignored();
            }
        }

        disposition
    }

    /// Removes session `id` and announces its departure.
    ///
    /// Returns false if the session was not registered.
    pub fn disconnect(&mut self, id: SessionId) -> bool {
        if self.registry.remove(id).is_none() {
            return false;
        }
        self.stats.session_closed();

        let delivered = broadcast(&self.registry, ServerMessage::Leave { id });
        self.stats.events_broadcast(delivered);

        info!("🚪 Session {} left ({} connected)", id, self.registry.len());
        true
    }

    pub fn world(&self) -> &WorldGrid {
        &self.world
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    fn apply(&mut self, id: SessionId, message: ClientMessage) -> Disposition {
        let Some(session) = self.registry.get_mut(id) else {
            return Disposition::Ignored(IgnoreReason::UnknownSession);
        };

        let event = match message {
            ClientMessage::Color { color } => {
                session.color = color;
                ServerMessage::Color { id, color }
            }
            ClientMessage::Move(pose) => {
                session.pose = pose;
                ServerMessage::Move { id, pose }
            }
            ClientMessage::Place(coords) => {
                let color = session.color;
                match self.edit_block(coords, BlockEdit::Place, color) {
                    Ok(event) => event,
                    Err(reason) => return Disposition::Ignored(reason),
                }
            }
            ClientMessage::Break(coords) => {
                let color = session.color;
                match self.edit_block(coords, BlockEdit::Break, color) {
                    Ok(event) => event,
                    Err(reason) => return Disposition::Ignored(reason),
                }
            }
            ClientMessage::Unknown => return Disposition::Ignored(IgnoreReason::UnknownAction),
        };

        trace!("Session {} applied {}", id, event.action());
        let delivered = broadcast(&self.registry, event);
        self.stats.events_broadcast(delivered);
        Disposition::Applied
    }

    /// Mutates one voxel and describes its resulting state.
    fn edit_block(
        &mut self,
        coords: BlockCoords,
        edit: BlockEdit,
        color: Color,
    ) -> Result<ServerMessage, IgnoreReason> {
        let pos = self.target(coords)?;

        match edit {
            BlockEdit::Place => self.world.set(pos, Some(color)),
            BlockEdit::Break => self.world.set(pos, None),
        }

        Ok(ServerMessage::block(pos, self.world.get(pos)))
    }

    fn target(&self, coords: BlockCoords) -> Result<VoxelPos, IgnoreReason> {
        match self.world.locate(coords.x, coords.y, coords.z) {
            Some(pos) if self.world.is_protected(pos) => Err(IgnoreReason::ProtectedFloor),
            Some(pos) => Ok(pos),
            None if coords.y == FLOOR_LAYER as f64 => Err(IgnoreReason::ProtectedFloor),
            None => Err(IgnoreReason::OutOfBounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::connection::{outbound_channel, OutboundReceiver};

    fn relay() -> Relay {
        Relay::new(&ServerConfig::default(), Arc::new(RelayStats::new()))
    }

    fn join(relay: &mut Relay) -> (SessionId, OutboundReceiver) {
        let (tx, rx) = outbound_channel();
        let id = relay.connect(tx).expect("relay has capacity");
        (id, rx)
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<Arc<ServerMessage>> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn place(x: f64, y: f64, z: f64) -> ClientMessage {
        ClientMessage::Place(BlockCoords { x, y, z })
    }

    fn break_at(x: f64, y: f64, z: f64) -> ClientMessage {
        ClientMessage::Break(BlockCoords { x, y, z })
    }

    #[test]
    fn test_connect_sends_private_state_then_self_join() {
        let mut relay = relay();
        let (id, mut rx) = join(&mut relay);
        assert_eq!(id, 0);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);

        match &*messages[0] {
            ServerMessage::Connect { player, map, players } => {
                assert_eq!(player.id, 0);
                assert_eq!(player.color, Color::WHITE);
                assert_eq!(player.pose, Pose::at(10.0, 6.0, 10.0));
                assert_eq!(map.dimensions(), relay.world().dimensions());
                assert!(players.is_empty());
            }
            other => panic!("expected connect, got {:?}", other),
        }
        assert!(matches!(&*messages[1], ServerMessage::Join(state) if state.id == 0));
    }

    #[test]
    fn test_join_catch_up() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        let (b, mut rx_b) = join(&mut relay);
        drain(&mut rx_a);
        drain(&mut rx_b);

        let (c, mut rx_c) = join(&mut relay);
        assert_eq!(c, 2);

        let messages = drain(&mut rx_c);
        let connects: Vec<_> = messages
            .iter()
            .filter(|m| matches!(***m, ServerMessage::Connect { .. }))
            .collect();
        assert_eq!(connects.len(), 1);
        match &*messages[0] {
            ServerMessage::Connect { players, .. } => {
                let ids: Vec<_> = players.iter().map(|p| p.id).collect();
                assert_eq!(ids, vec![a, b]);
            }
            other => panic!("expected connect first, got {:?}", other),
        }
        assert!(matches!(&*messages[1], ServerMessage::Join(state) if state.id == c));

        for rx in [&mut rx_a, &mut rx_b] {
            let seen = drain(rx);
            assert_eq!(seen.len(), 1);
            assert!(matches!(&*seen[0], ServerMessage::Join(state) if state.id == c));
        }
    }

    #[test]
    fn test_catch_up_carries_current_state() {
        let mut relay = relay();
        let (a, _rx_a) = join(&mut relay);
        let green = Color::new(0x00ff00).unwrap();
        relay.handle_message(a, ClientMessage::Color { color: green });
        relay.handle_message(a, ClientMessage::Move(Pose::at(1.0, 2.0, 3.0)));

        let (_b, mut rx_b) = join(&mut relay);
        match &*drain(&mut rx_b)[0] {
            ServerMessage::Connect { players, .. } => {
                assert_eq!(players[0].color, green);
                assert_eq!(players[0].pose, Pose::at(1.0, 2.0, 3.0));
            }
            other => panic!("expected connect, got {:?}", other),
        }
    }

    #[test]
    fn test_id_reuse_after_disconnect() {
        let mut relay = relay();
        let (a, _rx_a) = join(&mut relay);
        let (b, _rx_b) = join(&mut relay);
        assert_eq!((a, b), (0, 1));

        assert!(relay.disconnect(a));
        let (c, _rx_c) = join(&mut relay);
        assert_eq!(c, 0);
    }

    #[test]
    fn test_disconnect_broadcasts_leave() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        let (b, mut rx_b) = join(&mut relay);
        drain(&mut rx_a);
        drain(&mut rx_b);

        assert!(relay.disconnect(a));
        assert!(!relay.disconnect(a));

        let seen = drain(&mut rx_b);
        assert_eq!(seen.len(), 1);
        assert!(matches!(*seen[0], ServerMessage::Leave { id } if id == a));
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(relay.registry().len(), 1);
        assert!(relay.registry().get(b).is_some());
    }

    #[test]
    fn test_server_full() {
        let config = ServerConfig {
            max_connections: 2,
            ..ServerConfig::default()
        };
        let stats = Arc::new(RelayStats::new());
        let mut relay = Relay::new(&config, Arc::clone(&stats));
        let (a, _rx_a) = join(&mut relay);
        let (_b, _rx_b) = join(&mut relay);

        let (tx, _rx) = outbound_channel();
        assert_eq!(relay.connect(tx), Err(RelayError::ServerFull { capacity: 2 }));
        assert_eq!(stats.snapshot().sessions_refused, 1);

        relay.disconnect(a);
        let (c, _rx_c) = join(&mut relay);
        assert_eq!(c, a);
    }

    #[test]
    fn test_bounds_rejection() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        drain(&mut rx_a);
        let filled = relay.world().count_filled();

        for message in [
            place(-1.0, 5.0, 0.0),
            place(0.0, 5.0, 100.0),
            place(20.0, 5.0, 0.0),
            place(0.0, 64.0, 0.0),
            place(2.5, 5.0, 1.0),
            break_at(0.0, -3.0, 0.0),
        ] {
            assert_eq!(
                relay.handle_message(a, message),
                Disposition::Ignored(IgnoreReason::OutOfBounds)
            );
        }

        assert_eq!(relay.world().count_filled(), filled);
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn test_floor_protection() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        drain(&mut rx_a);

        let floor = relay.world().locate(5.0, 0.0, 5.0).unwrap();
        let before = relay.world().get(floor);
        assert!(before.is_some());

        assert_eq!(
            relay.handle_message(a, break_at(5.0, 0.0, 5.0)),
            Disposition::Ignored(IgnoreReason::ProtectedFloor)
        );
        assert_eq!(
            relay.handle_message(a, place(5.0, 0.0, 5.0)),
            Disposition::Ignored(IgnoreReason::ProtectedFloor)
        );
        assert_eq!(
            relay.handle_message(a, break_at(500.0, 0.0, 5.0)),
            Disposition::Ignored(IgnoreReason::ProtectedFloor)
        );

        assert_eq!(relay.world().get(floor), before);
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn test_place_broadcasts_resulting_state() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        let (_b, mut rx_b) = join(&mut relay);
        drain(&mut rx_a);
        drain(&mut rx_b);

        let red = Color::new(0xff0000).unwrap();
        relay.handle_message(a, ClientMessage::Color { color: red });

        // y = 1 is pre-filled by the palette; placing overwrites it.
        assert_eq!(relay.handle_message(a, place(3.0, 1.0, 4.0)), Disposition::Applied);
        let pos = relay.world().locate(3.0, 1.0, 4.0).unwrap();
        assert_eq!(relay.world().get(pos), Some(red));

        for rx in [&mut rx_a, &mut rx_b] {
            let seen = drain(rx);
            assert_eq!(seen.len(), 2);
            assert!(matches!(*seen[0], ServerMessage::Color { id, color } if id == a && color == red));
            match *seen[1] {
                ServerMessage::Place { x, y, z, color } => {
                    assert_eq!((x, y, z), (3, 1, 4));
                    assert_eq!(color, Some(red));
                }
                ref other => panic!("expected place, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_break_on_empty_voxel_broadcasts_break() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        drain(&mut rx_a);

        assert_eq!(relay.handle_message(a, break_at(1.0, 30.0, 1.0)), Disposition::Applied);
        let seen = drain(&mut rx_a);
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            *seen[0],
            ServerMessage::Break { x: 1, y: 30, z: 1, color: None }
        ));

        relay.handle_message(a, place(1.0, 30.0, 1.0));
        relay.handle_message(a, break_at(1.0, 30.0, 1.0));
        let pos = relay.world().locate(1.0, 30.0, 1.0).unwrap();
        assert_eq!(relay.world().get(pos), None);
    }

    #[test]
    fn test_move_overwrites_pose() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        drain(&mut rx_a);

        // Poses are trusted, even outside the grid.
        let pose = Pose {
            x: -40.0,
            y: 900.0,
            z: 3.5,
            pitch: 1.2,
            yaw: -0.4,
        };
        assert_eq!(relay.handle_message(a, ClientMessage::Move(pose)), Disposition::Applied);
        assert_eq!(relay.registry().get(a).map(|s| s.pose), Some(pose));

        let seen = drain(&mut rx_a);
        assert!(matches!(*seen[0], ServerMessage::Move { id, pose: p } if id == a && p == pose));
    }

    #[test]
    fn test_unknown_action_and_session() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        drain(&mut rx_a);

        assert_eq!(
            relay.handle_message(a, ClientMessage::Unknown),
            Disposition::Ignored(IgnoreReason::UnknownAction)
        );
        assert_eq!(
            relay.handle_message(7, place(1.0, 5.0, 1.0)),
            Disposition::Ignored(IgnoreReason::UnknownSession)
        );
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(relay.stats().snapshot().messages_ignored, 2);
    }

    #[test]
    fn test_broadcast_order_is_shared() {
        let mut relay = relay();
        let (a, mut rx_a) = join(&mut relay);
        let (b, mut rx_b) = join(&mut relay);
        let (_c, mut rx_c) = join(&mut relay);
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            drain(rx);
        }

        relay.handle_message(b, place(2.0, 9.0, 2.0));
        relay.handle_message(a, place(3.0, 9.0, 3.0));
        relay.handle_message(b, break_at(2.0, 9.0, 2.0));

        let expected = vec![(2, "place"), (3, "place"), (2, "break")];
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let seen: Vec<_> = drain(rx)
                .iter()
                .map(|m| match **m {
                    ServerMessage::Place { x, .. } | ServerMessage::Break { x, .. } => (x, m.action()),
                    ref other => panic!("unexpected {:?}", other),
                })
                .collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_spawn_follows_world_config() {
        let config = ServerConfig {
            world: WorldConfig {
                width: 9,
                depth: 4,
                height: 16,
                spawn_height: 12.0,
                ..WorldConfig::default()
            },
            ..ServerConfig::default()
        };
        let mut relay = Relay::new(&config, Arc::new(RelayStats::new()));
        let (a, _rx) = join(&mut relay);
        assert_eq!(relay.registry().get(a).map(|s| s.pose), Some(Pose::at(4.5, 12.0, 2.0)));
    }

    #[test]
    fn test_stats_follow_activity() {
        let mut relay = relay();
        let (a, _rx_a) = join(&mut relay);
        let (_b, _rx_b) = join(&mut relay);
        relay.handle_message(a, place(1.0, 8.0, 1.0));
        relay.disconnect(a);

        let snapshot = relay.stats().snapshot();
        assert_eq!(snapshot.sessions_opened, 2);
        assert_eq!(snapshot.sessions_closed, 1);
        assert_eq!(snapshot.live_sessions, 1);
        assert_eq!(snapshot.messages_applied, 1);
        // join(a)=1, join(b)=2, place=2, leave=1
        assert_eq!(snapshot.events_broadcast, 6);
    }
}

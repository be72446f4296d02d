//! Fan-out of relay events to session queues.

use crate::connection::{ClientRegistry, Session};
use crate::messaging::ServerMessage;
use std::sync::Arc;
use tracing::trace;

/// Hands one shared copy of `message` to every registered session, in
/// ascending id order.
///
/// Returns the number of queues that accepted the message. A session whose
/// writer has already gone away is skipped; its close path will remove it.
pub fn broadcast(registry: &ClientRegistry, message: ServerMessage) -> usize {
    let message = Arc::new(message);
    let mut delivered = 0;

    for session in registry.iter() {
        if session.send(Arc::clone(&message)) {
            delivered += 1;
        } else {
            trace!(
                "Skipping {} for session {}: outbound queue closed",
                message.action(),
                session.id()
            );
        }
    }

    delivered
}

/// Queues a message for a single session.
pub fn send_to(session: &Session, message: ServerMessage) -> bool {
    let action = message.action();
    let sent = session.send(Arc::new(message));
    if !sent {
        trace!("Dropping {} for session {}: outbound queue closed", action, session.id());
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{outbound_channel, Pose};

    #[test]
    fn test_broadcast_reaches_every_session_in_order() {
        let mut registry = ClientRegistry::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = outbound_channel();
            registry.insert(Pose::default(), tx);
            receivers.push(rx);
        }

        assert_eq!(broadcast(&registry, ServerMessage::Leave { id: 9 }), 3);
        assert_eq!(broadcast(&registry, ServerMessage::Leave { id: 10 }), 3);

        for rx in receivers.iter_mut() {
            let first = rx.try_recv().unwrap();
            let second = rx.try_recv().unwrap();
            assert!(matches!(*first, ServerMessage::Leave { id: 9 }));
            assert!(matches!(*second, ServerMessage::Leave { id: 10 }));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_closed_queue_is_skipped() {
        let mut registry = ClientRegistry::new();
        let (tx_a, rx_a) = outbound_channel();
        let (tx_b, mut rx_b) = outbound_channel();
        registry.insert(Pose::default(), tx_a);
        let b = registry.insert(Pose::default(), tx_b);
        drop(rx_a);

        assert_eq!(broadcast(&registry, ServerMessage::Leave { id: 4 }), 1);
        assert!(rx_b.try_recv().is_ok());

        let session_b = registry.get(b).unwrap();
        assert!(send_to(session_b, ServerMessage::Leave { id: 5 }));
        drop(rx_b);
        assert!(!send_to(session_b, ServerMessage::Leave { id: 6 }));
    }

    #[test]
    fn test_broadcast_to_empty_registry() {
        let registry = ClientRegistry::new();
        assert_eq!(broadcast(&registry, ServerMessage::Leave { id: 0 }), 0);
    }
}

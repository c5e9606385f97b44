// service/rooms.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

/// Identifies one subscription of one socket. A user connected from two
/// devices holds two distinct ids in the same room, so dropping one device
/// never detaches the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct RoomMember {
    id: SubscriberId,
    user_id: Uuid,
    sender: UnboundedSender<String>,
}

/// Live broadcast groups, one per order. Coarse on purpose: every
/// authorized participant of an order shares the same room, while persisted
/// history stays filtered per counterpart pair.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Vec<RoomMember>>>>,
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry").finish()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's outbound channel to an order room.
    pub async fn subscribe(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        sender: UnboundedSender<String>,
    ) -> SubscriberId {
        let member = RoomMember {
            id: SubscriberId::new(),
            user_id,
            sender,
        };
        let member_id = member.id;

        let mut guard = self.inner.write().await;
        guard.entry(order_id).or_default().push(member);

        tracing::debug!(
            "subscribed {:?} (user {}) to order room {}",
            member_id,
            user_id,
            order_id
        );

        member_id
    }

    /// Detach a single subscription. Called for every joined room when its
    /// connection goes away; empty rooms are dropped from the map.
    pub async fn unsubscribe(&self, order_id: Uuid, member_id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(members) = guard.get_mut(&order_id) {
            members.retain(|m| m.id != member_id);
            if members.is_empty() {
                guard.remove(&order_id);
            }
        }
    }

    /// Fan a serialized event out to every socket in the order's room.
    /// Members whose channel is gone are pruned on the way through.
    pub async fn broadcast(&self, order_id: Uuid, frame: String) {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.get_mut(&order_id) {
            let before = members.len();
            members.retain(|member| member.sender.send(frame.clone()).is_ok());

            if members.len() != before {
                tracing::debug!(
                    "pruned {} dead subscriber(s) from order room {}",
                    before - members.len(),
                    order_id
                );
            }
        }
    }

    /// Whether the user currently has at least one live socket in the room.
    pub async fn is_user_present(&self, order_id: Uuid, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard
            .get(&order_id)
            .map(|members| members.iter().any(|m| m.user_id == user_id))
            .unwrap_or(false)
    }

    #[cfg(test)]
    async fn member_count(&self, order_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&order_id).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn broadcast_reaches_every_room_member() {
        let registry = RoomRegistry::new();
        let order_id = Uuid::new_v4();

        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        registry.subscribe(order_id, Uuid::new_v4(), tx_a).await;
        registry.subscribe(order_id, Uuid::new_v4(), tx_b).await;

        registry.broadcast(order_id, "hello".to_string()).await;

        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn broadcast_is_scoped_to_the_order() {
        let registry = RoomRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        registry.subscribe(Uuid::new_v4(), Uuid::new_v4(), tx).await;

        registry.broadcast(Uuid::new_v4(), "elsewhere".to_string()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_that_member() {
        let registry = RoomRegistry::new();
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let (tx_a, _rx_a) = unbounded_channel();
        let (tx_b, _rx_b) = unbounded_channel();
        let first = registry.subscribe(order_id, user_id, tx_a).await;
        registry.subscribe(order_id, user_id, tx_b).await;

        registry.unsubscribe(order_id, first).await;
        assert_eq!(registry.member_count(order_id).await, 1);
        assert!(registry.is_user_present(order_id, user_id).await);
    }

    #[tokio::test]
    async fn empty_rooms_are_dropped() {
        let registry = RoomRegistry::new();
        let order_id = Uuid::new_v4();

        let (tx, _rx) = unbounded_channel();
        let member = registry.subscribe(order_id, Uuid::new_v4(), tx).await;
        registry.unsubscribe(order_id, member).await;

        assert_eq!(registry.member_count(order_id).await, 0);
        assert!(registry.inner.read().await.get(&order_id).is_none());
    }

    #[tokio::test]
    async fn dead_senders_are_pruned_on_broadcast() {
        let registry = RoomRegistry::new();
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let (tx, rx) = unbounded_channel();
        registry.subscribe(order_id, user_id, tx).await;
        drop(rx);

        registry.broadcast(order_id, "anyone there?".to_string()).await;

        assert_eq!(registry.member_count(order_id).await, 0);
        assert!(!registry.is_user_present(order_id, user_id).await);
    }
}

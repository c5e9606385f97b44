// service/chat_service.rs
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, db::DBClient, orderdb::OrderExt, userdb::UserExt},
    dtos::chatdtos::{ChatListEntry, ChatParticipant},
    models::{
        chatmodel::Message,
        ordermodel::{Order, OrderApplication},
        usermodel::User,
    },
    service::{
        access::{self, Resolution, ResolveError},
        chat_list::{merge_candidates, ChatCandidate},
        error::ChatError,
        rooms::RoomRegistry,
    },
};

/// Result of a join: either a live conversation with its history, or the
/// applicant list the customer has to choose from first.
#[derive(Debug)]
pub enum JoinOutcome {
    Joined { messages: Vec<Message> },
    SelectionRequired { applicants: Vec<ChatParticipant> },
}

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
    rooms: RoomRegistry,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        ChatService {
            db_client,
            rooms: RoomRegistry::new(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Load the order and its applications and check the caller against the
    /// relationship graph. Runs on every state-changing operation, since
    /// connections are long-lived and access can be revoked mid-session.
    async fn load_authorized(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<(Order, Vec<OrderApplication>), ChatError> {
        let order = self
            .db_client
            .get_order_by_id(order_id)
            .await?
            .ok_or(ChatError::OrderNotFound(order_id))?;

        let applications = self.db_client.get_order_applications(order_id).await?;
        let applicant_ids: Vec<Uuid> = applications.iter().map(|a| a.freelancer_id).collect();

        if !access::can_access_order(&order, &applicant_ids, user_id) {
            return Err(ChatError::AccessDenied(user_id, order_id));
        }

        Ok((order, applications))
    }

    /// Join an order conversation: resolve the counterpart, return the
    /// relevant history and acknowledge delivery of everything addressed to
    /// the joiner. Room subscription is the gateway's side of the join.
    pub async fn join_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        explicit_freelancer_id: Option<Uuid>,
    ) -> Result<JoinOutcome, ChatError> {
        let (order, applications) = self.load_authorized(order_id, user_id).await?;
        let applicant_ids: Vec<Uuid> = applications.iter().map(|a| a.freelancer_id).collect();

        match access::resolve_counterpart(&order, &applicant_ids, user_id, explicit_freelancer_id)
        {
            Ok(Resolution::Counterpart(counterpart_id)) => {
                // The customer side is pair-filtered so parallel applicant
                // conversations stay separate; the freelancer side is the
                // plain 1:1 order history.
                let messages = if user_id == order.customer_id {
                    self.db_client
                        .get_messages_between(order_id, user_id, counterpart_id)
                        .await?
                } else {
                    self.db_client.get_order_messages(order_id).await?
                };

                self.db_client
                    .mark_messages_delivered(order_id, user_id)
                    .await?;

                Ok(JoinOutcome::Joined { messages })
            }
            Ok(Resolution::SelectionRequired) => {
                let users = self.db_client.get_users_by_ids(&applicant_ids).await?;
                let applicants = users.iter().map(ChatParticipant::filter_user).collect();
                Ok(JoinOutcome::SelectionRequired { applicants })
            }
            Err(ResolveError::NotAnApplicant(freelancer_id)) => {
                Err(ChatError::FreelancerNotApplied(freelancer_id))
            }
        }
    }

    /// Persist a message and fan it out to the order's live room. The
    /// insert is never rolled back once it succeeds; a receiver that missed
    /// the push picks the message up from history on its next join.
    pub async fn send_message(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        content: String,
        explicit_receiver_id: Option<Uuid>,
    ) -> Result<Message, ChatError> {
        let (order, applications) = self.load_authorized(order_id, user_id).await?;
        let applicant_ids: Vec<Uuid> = applications.iter().map(|a| a.freelancer_id).collect();

        let receiver_id =
            match access::resolve_counterpart(&order, &applicant_ids, user_id, explicit_receiver_id)
            {
                Ok(Resolution::Counterpart(counterpart_id)) => counterpart_id,
                Ok(Resolution::SelectionRequired) => return Err(ChatError::SelectionRequired),
                Err(ResolveError::NotAnApplicant(freelancer_id)) => {
                    return Err(ChatError::FreelancerNotApplied(freelancer_id))
                }
            };

        let message = self
            .db_client
            .create_message(order_id, user_id, receiver_id, content)
            .await?;

        let frame = serde_json::json!({ "event": "message", "message": &message }).to_string();
        self.rooms.broadcast(order_id, frame).await;

        Ok(message)
    }

    pub async fn order_history(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<Message>, ChatError> {
        self.load_authorized(order_id, user_id).await?;
        Ok(self.db_client.get_order_messages(order_id).await?)
    }

    pub async fn mark_delivered(&self, user_id: Uuid, order_id: Uuid) -> Result<u64, ChatError> {
        self.load_authorized(order_id, user_id).await?;
        Ok(self
            .db_client
            .mark_messages_delivered(order_id, user_id)
            .await?)
    }

    pub async fn mark_read(&self, user_id: Uuid, order_id: Uuid) -> Result<u64, ChatError> {
        self.load_authorized(order_id, user_id).await?;
        Ok(self.db_client.mark_messages_read(order_id, user_id).await?)
    }

    /// Build the caller's inbox from the three relationship sources.
    pub async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatListEntry>, ChatError> {
        let mut candidates: Vec<ChatCandidate> = Vec::new();

        // Orders the caller commissioned with an assigned freelancer.
        for order in self
            .db_client
            .get_assigned_orders_for_customer(user_id)
            .await?
        {
            if let Some(freelancer_id) = order.freelancer_id {
                candidates.push(
                    self.candidate_for(order.id, order.title, user_id, freelancer_id, false)
                        .await?,
                );
            }
        }

        // Unassigned orders the caller commissioned: one entry per
        // applicant, unread counts scoped to that applicant.
        for order in self
            .db_client
            .get_unassigned_orders_for_customer(user_id)
            .await?
        {
            for application in self.db_client.get_order_applications(order.id).await? {
                candidates.push(
                    self.candidate_for(
                        order.id,
                        order.title.clone(),
                        user_id,
                        application.freelancer_id,
                        true,
                    )
                    .await?,
                );
            }
        }

        // Orders where the caller is the assigned freelancer or an
        // applicant; the counterpart is always the customer.
        let mut freelance_side = self.db_client.get_orders_for_freelancer(user_id).await?;
        freelance_side.extend(self.db_client.get_applied_orders(user_id).await?);
        for order in freelance_side {
            candidates.push(
                self.candidate_for(order.id, order.title, user_id, order.customer_id, false)
                    .await?,
            );
        }

        let merged = merge_candidates(candidates);

        let counterpart_ids: Vec<Uuid> = merged.iter().map(|c| c.counterpart_id).collect();
        let users = self.db_client.get_users_by_ids(&counterpart_ids).await?;
        let users_by_id: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();

        let mut entries = Vec::with_capacity(merged.len());
        for candidate in merged {
            let Some(counterpart) = users_by_id.get(&candidate.counterpart_id) else {
                tracing::warn!(
                    "chat list for {}: counterpart {} no longer exists, skipping order {}",
                    user_id,
                    candidate.counterpart_id,
                    candidate.order_id
                );
                continue;
            };

            let is_online = self
                .rooms
                .is_user_present(candidate.order_id, candidate.counterpart_id)
                .await;

            entries.push(ChatListEntry {
                order_id: candidate.order_id,
                order_title: candidate.order_title.clone(),
                counterpart: ChatParticipant::filter_user(counterpart),
                last_message_at: candidate.last_message_at(),
                last_message: candidate.last_message.map(|m| m.content),
                unread_count: candidate.unread_count,
                is_online,
            });
        }

        Ok(entries)
    }

    async fn candidate_for(
        &self,
        order_id: Uuid,
        order_title: String,
        user_id: Uuid,
        counterpart_id: Uuid,
        scope_unread_to_counterpart: bool,
    ) -> Result<ChatCandidate, ChatError> {
        let last_message = self
            .db_client
            .get_last_message_between(order_id, user_id, counterpart_id)
            .await?;

        let unread_count = if scope_unread_to_counterpart {
            self.db_client
                .get_unread_count_between(order_id, user_id, counterpart_id)
                .await?
        } else {
            self.db_client.get_unread_count(order_id, user_id).await?
        };

        Ok(ChatCandidate {
            order_id,
            order_title,
            counterpart_id,
            last_message,
            unread_count,
        })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::usermodel::User;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl ChatParticipant {
    pub fn filter_user(user: &User) -> Self {
        ChatParticipant {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// One inbox row: a (order, counterpart) conversation with its preview.
#[derive(Debug, Serialize, Clone)]
pub struct ChatListEntry {
    pub order_id: Uuid,
    pub order_title: String,
    pub counterpart: ChatParticipant,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub is_online: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageDto {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub receiver_id: Option<Uuid>,
}

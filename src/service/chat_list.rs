// service/chat_list.rs
//
// Inbox assembly. The store-facing half lives on ChatService::list_chats;
// this module is the pure middle step so the union/dedup/ordering rules can
// be pinned down in tests without a database.
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::chatmodel::Message;

/// A conversation candidate drawn from one of the three relationship
/// sources (customer with assignee, customer per applicant, freelancer or
/// applicant side), before user profiles are attached.
#[derive(Debug, Clone)]
pub struct ChatCandidate {
    pub order_id: Uuid,
    pub order_title: String,
    pub counterpart_id: Uuid,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

impl ChatCandidate {
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().and_then(|m| m.created_at)
    }
}

/// Union the sources: one entry per (order, counterpart) pair, newest
/// conversation first, chats with no messages at the end.
///
/// The same pair can arrive twice, e.g. a user who applied and was later
/// assigned shows up through both the assignment and the application
/// source; the first occurrence wins.
pub fn merge_candidates(candidates: Vec<ChatCandidate>) -> Vec<ChatCandidate> {
    let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut merged: Vec<ChatCandidate> = Vec::new();

    for candidate in candidates {
        if seen.insert((candidate.order_id, candidate.counterpart_id)) {
            merged.push(candidate);
        }
    }

    merged.sort_by_key(|c| std::cmp::Reverse(c.last_message_at()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chatmodel::MessageStatus;
    use chrono::TimeZone;

    fn message_at(ts: i64, sender: Uuid, receiver: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            content: "hi".to_string(),
            status: MessageStatus::Sent,
            created_at: Some(Utc.timestamp_opt(ts, 0).unwrap()),
        }
    }

    fn candidate(
        order_id: Uuid,
        counterpart_id: Uuid,
        last_message: Option<Message>,
    ) -> ChatCandidate {
        ChatCandidate {
            order_id,
            order_title: "Logo design".to_string(),
            counterpart_id,
            last_message,
            unread_count: 0,
        }
    }

    #[test]
    fn deduplicates_by_order_and_counterpart() {
        let order_id = Uuid::new_v4();
        let customer = Uuid::new_v4();
        let user = Uuid::new_v4();

        // Assigned freelancer who also still has an application row: both
        // sources yield the same (order, customer) pair.
        let merged = merge_candidates(vec![
            candidate(order_id, customer, Some(message_at(10, customer, user))),
            candidate(order_id, customer, Some(message_at(10, customer, user))),
        ]);

        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn keeps_distinct_counterparts_on_the_same_order() {
        let order_id = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();

        let merged = merge_candidates(vec![
            candidate(order_id, f1, None),
            candidate(order_id, f2, None),
        ]);

        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn sorts_newest_first_with_empty_chats_last() {
        let customer = Uuid::new_v4();
        let user = Uuid::new_v4();
        let older = candidate(Uuid::new_v4(), customer, Some(message_at(100, customer, user)));
        let newest = candidate(Uuid::new_v4(), customer, Some(message_at(200, customer, user)));
        let empty = candidate(Uuid::new_v4(), customer, None);

        let merged = merge_candidates(vec![empty.clone(), older.clone(), newest.clone()]);

        assert_eq!(merged[0].order_id, newest.order_id);
        assert_eq!(merged[1].order_id, older.order_id);
        assert_eq!(merged[2].order_id, empty.order_id);
    }
}

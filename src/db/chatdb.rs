// db/chatdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::Message;

/// Message store. Messages are insert-once and immutable except for their
/// delivery status; status changes are scoped bulk transitions guarded in
/// SQL so concurrent acknowledgements from several devices of the same
/// receiver cannot race or move a status backwards.
#[async_trait]
pub trait ChatExt {
    async fn create_message(
        &self,
        order_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, sqlx::Error>;

    async fn get_order_messages(&self, order_id: Uuid) -> Result<Vec<Message>, sqlx::Error>;

    async fn get_messages_between(
        &self,
        order_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<Message>, sqlx::Error>;

    async fn mark_messages_delivered(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<u64, sqlx::Error>;

    async fn mark_messages_read(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<u64, sqlx::Error>;

    async fn get_unread_count(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<i64, sqlx::Error>;

    async fn get_unread_count_between(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
        counterpart_id: Uuid,
    ) -> Result<i64, sqlx::Error>;

    async fn get_last_message_between(
        &self,
        order_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Message>, sqlx::Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_message(
        &self,
        order_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (order_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, sender_id, receiver_id, content, status, created_at
            "#,
        )
        .bind(order_id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_order_messages(&self, order_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, order_id, sender_id, receiver_id, content, status, created_at
            FROM messages
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_messages_between(
        &self,
        order_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, order_id, sender_id, receiver_id, content, status, created_at
            FROM messages
            WHERE order_id = $1
              AND ((sender_id = $2 AND receiver_id = $3)
                OR (sender_id = $3 AND receiver_id = $2))
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_delivered(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = 'delivered'::message_status
            WHERE order_id = $1
              AND receiver_id = $2
              AND status = 'sent'::message_status
            "#,
        )
        .bind(order_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_messages_read(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = 'read'::message_status
            WHERE order_id = $1
              AND receiver_id = $2
              AND status IN ('sent'::message_status, 'delivered'::message_status)
            "#,
        )
        .bind(order_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_unread_count(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE order_id = $1
              AND receiver_id = $2
              AND status IN ('sent'::message_status, 'delivered'::message_status)
            "#,
        )
        .bind(order_id)
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_unread_count_between(
        &self,
        order_id: Uuid,
        receiver_id: Uuid,
        counterpart_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE order_id = $1
              AND receiver_id = $2
              AND sender_id = $3
              AND status IN ('sent'::message_status, 'delivered'::message_status)
            "#,
        )
        .bind(order_id)
        .bind(receiver_id)
        .bind(counterpart_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_last_message_between(
        &self,
        order_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, order_id, sender_id, receiver_id, content, status, created_at
            FROM messages
            WHERE order_id = $1
              AND ((sender_id = $2 AND receiver_id = $3)
                OR (sender_id = $3 AND receiver_id = $2))
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await
    }
}

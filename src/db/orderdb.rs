// db/orderdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ordermodel::{Order, OrderApplication};

/// Read-only view over the orders service's tables. Order lifecycle and
/// application CRUD are owned elsewhere; the chat core only consults them.
#[async_trait]
pub trait OrderExt {
    async fn get_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error>;

    async fn get_order_applications(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderApplication>, sqlx::Error>;

    async fn get_assigned_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error>;

    async fn get_unassigned_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error>;

    async fn get_orders_for_freelancer(&self, freelancer_id: Uuid)
        -> Result<Vec<Order>, sqlx::Error>;

    async fn get_applied_orders(&self, freelancer_id: Uuid) -> Result<Vec<Order>, sqlx::Error>;
}

#[async_trait]
impl OrderExt for DBClient {
    async fn get_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, freelancer_id, title, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_order_applications(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderApplication>, sqlx::Error> {
        sqlx::query_as::<_, OrderApplication>(
            r#"
            SELECT id, order_id, freelancer_id, created_at
            FROM order_applications
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_assigned_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, freelancer_id, title, status, created_at
            FROM orders
            WHERE customer_id = $1
              AND freelancer_id IS NOT NULL
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_unassigned_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, freelancer_id, title, status, created_at
            FROM orders
            WHERE customer_id = $1
              AND freelancer_id IS NULL
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_orders_for_freelancer(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, freelancer_id, title, status, created_at
            FROM orders
            WHERE freelancer_id = $1
            "#,
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_applied_orders(&self, freelancer_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT o.id, o.customer_id, o.freelancer_id, o.title, o.status, o.created_at
            FROM orders o
            INNER JOIN order_applications a ON a.order_id = o.id
            WHERE a.freelancer_id = $1
            "#,
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }
}

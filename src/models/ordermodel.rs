// models/ordermodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Work request owned by the orders service. `freelancer_id` stays NULL
/// until the customer assigns one of the applicants.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub freelancer_id: Option<Uuid>,
    pub title: String,
    pub status: Option<OrderStatus>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A freelancer's bid on an order. Its existence grants provisional chat
/// access before assignment.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct OrderApplication {
    pub id: Uuid,
    pub order_id: Uuid,
    pub freelancer_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

pub mod cart;
pub mod catalog;
pub mod customer;
pub mod error;
pub mod inventory;
pub mod order;
pub mod product;
pub mod query;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use cart::{CartLine, CartService, CartStats};
pub use catalog::{CatalogRepository, CatalogStore, InMemoryCatalog, JsonFileCatalog};
pub use customer::{Customer, CustomerDirectory, NewCustomer};
pub use error::{ShopError, ShopResult};
pub use inventory::InventoryLedger;
pub use order::{Order, OrderItem, OrderService, OrderStatus};
pub use product::{seed_catalog, seed_inventory, Product};
pub use query::{CategoryFilter, ProductFilter, ProductQuery, SortDirection, SortKey};

/// Domain events published through the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    OrderCreated {
        order_id: Uuid,
        customer_id: Uuid,
        total_amount: f64,
        items: Vec<OrderedItem>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::OrderCreated { order_id, .. } => *order_id,
            OrderEvent::OrderStatusChanged { order_id, .. } => *order_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => "OrderCreated",
            OrderEvent::OrderStatusChanged { .. } => "OrderStatusChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn new(event: &OrderEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id: event.order_id(),
            event_type: event.event_type().to_string(),
            event_data: serde_json::to_value(event)?,
            processed: false,
            created_at: Utc::now(),
        })
    }
}

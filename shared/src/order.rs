use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart::{CartLine, CartService};
use crate::error::{ShopError, ShopResult};
use crate::inventory::InventoryLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Processing | Shipped, Cancelled)
        )
    }

    /// Returns `next` if the transition table allows it.
    pub fn transition(self, next: OrderStatus) -> ShopResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ShopError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ShopError::Validation(format!("unknown order status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Customer email or identifier.
    pub customer: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

pub fn order_total(items: &[OrderItem]) -> f64 {
    items
        .iter()
        .map(|item| item.unit_price * f64::from(item.quantity))
        .sum()
}

/// Creates orders against an [`InventoryLedger`]. Either every line is
/// debited and the order recorded, or nothing changes.
#[derive(Debug)]
pub struct OrderService {
    ledger: Arc<InventoryLedger>,
    orders: DashMap<Uuid, Order>,
}

impl OrderService {
    pub fn new(ledger: Arc<InventoryLedger>) -> Self {
        Self {
            ledger,
            orders: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn create_order(&self, customer: &str, lines: &[CartLine]) -> ShopResult<Order> {
        if lines.is_empty() {
            return Err(ShopError::Validation("order has no line items".into()));
        }
        if customer.trim().is_empty() {
            return Err(ShopError::Validation("order has no customer".into()));
        }

        let mut debited: Vec<(&str, u32)> = Vec::with_capacity(lines.len());
        for line in lines {
            if let Err(err) = self.ledger.decrease(&line.product_id, line.quantity) {
                for (product_id, quantity) in debited.iter().rev() {
                    self.ledger.increase(product_id, *quantity);
                }
                warn!(customer, product_id = %line.product_id, "order rejected: {}", err);
                return Err(err);
            }
            debited.push((line.product_id.as_str(), line.quantity));
        }

        let items: Vec<OrderItem> = lines.iter().map(OrderItem::from).collect();
        let order = Order {
            id: Uuid::new_v4(),
            customer: customer.to_string(),
            total: order_total(&items),
            items,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        info!("Order {} created for {} ({:.2})", order.id, customer, order.total);
        Ok(order)
    }

    /// Turns the session's cart into an order. The cart is emptied only when
    /// the order goes through.
    pub fn checkout(&self, carts: &CartService, session_id: &str, customer: &str) -> ShopResult<Order> {
        let lines = carts.lines(session_id);
        let order = self.create_order(customer, &lines)?;
        carts.clear(session_id);
        Ok(order)
    }

    pub fn get(&self, order_id: Uuid) -> ShopResult<Order> {
        self.orders
            .get(&order_id)
            .map(|order| order.value().clone())
            .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))
    }

    /// Orders placed by `customer`, oldest first.
    pub fn orders_for(&self, customer: &str) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.customer == customer)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }

    pub fn update_status(&self, order_id: Uuid, next: OrderStatus) -> ShopResult<Order> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))?;
        order.status = order.status.transition(next)?;
        info!("Order {} moved to {}", order_id, next);
        Ok(order.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::seed_catalog;

    fn line(product_id: &str, quantity: u32) -> CartLine {
        let product = seed_catalog()
            .into_iter()
            .find(|p| p.id == product_id)
            .unwrap();
        CartLine {
            product_id: product.id,
            name: product.name,
            price: product.price,
            image: product.image,
            quantity,
            added_at: Utc::now(),
        }
    }

    fn service() -> OrderService {
        OrderService::new(Arc::new(InventoryLedger::seeded()))
    }

    #[test]
    fn create_order_debits_stock_and_totals_lines() {
        let orders = service();
        let order = orders
            .create_order("ann@example.com", &[line("roadster-200", 2), line("city-hybrid", 1)])
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, 699.0 * 2.0 + 529.0);
        assert_eq!(orders.ledger().get("roadster-200"), 28);
        assert_eq!(orders.ledger().get("city-hybrid"), 39);
        assert_eq!(orders.get(order.id).unwrap(), order);
    }

    #[test]
    fn failed_line_rolls_back_earlier_debits() {
        let orders = service();
        let err = orders
            .create_order(
                "ann@example.com",
                &[line("roadster-200", 2), line("summit-mtn", 1), line("speedster-elite", 6)],
            )
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { available: 5, .. }));
        assert_eq!(orders.ledger().get("roadster-200"), 30);
        assert_eq!(orders.ledger().get("summit-mtn"), 15);
        assert_eq!(orders.ledger().get("speedster-elite"), 5);
        assert!(orders.orders_for("ann@example.com").is_empty());
    }

    #[test]
    fn empty_order_is_rejected() {
        let err = service().create_order("ann@example.com", &[]).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn checkout_clears_cart_only_on_success() {
        let orders = service();
        let carts = CartService::new();
        let bike = seed_catalog().remove(6);
        assert_eq!(bike.id, "speedster-elite");

        carts.add_item("s1", &bike, 9).unwrap();
        assert!(orders.checkout(&carts, "s1", "ann@example.com").is_err());
        assert_eq!(carts.lines("s1").len(), 1);

        carts.set_quantity("s1", "speedster-elite", 2);
        let order = orders.checkout(&carts, "s1", "ann@example.com").unwrap();
        assert_eq!(order.items[0].quantity, 2);
        assert!(carts.lines("s1").is_empty());
        assert_eq!(orders.orders_for("ann@example.com").len(), 1);
    }

    #[test]
    fn status_follows_transition_table() {
        let orders = service();
        let order = orders.create_order("ann@example.com", &[line("summit-mtn", 1)]).unwrap();

        let err = orders.update_status(order.id, OrderStatus::Delivered).unwrap_err();
        assert_eq!(
            err,
            ShopError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            }
        );

        orders.update_status(order.id, OrderStatus::Processing).unwrap();
        orders.update_status(order.id, OrderStatus::Shipped).unwrap();
        let delivered = orders.update_status(order.id, OrderStatus::Delivered).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(orders.update_status(order.id, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn cancellation_allowed_from_non_terminal_states() {
        for from in [OrderStatus::Pending, OrderStatus::Processing, OrderStatus::Shipped] {
            assert!(from.can_transition_to(OrderStatus::Cancelled));
        }
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn unknown_order_is_not_found() {
        let err = service().update_status(Uuid::new_v4(), OrderStatus::Shipped).unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[test]
    fn status_parses_lowercase_names() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
    }
}

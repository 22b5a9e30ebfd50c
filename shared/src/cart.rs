use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ShopError, ShopResult};
use crate::product::Product;

/// One product in a session's cart. Name, price and image are captured when
/// the product is first added and do not follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartStats {
    /// Distinct lines.
    pub item_count: usize,
    /// Sum of quantities.
    pub total_items: u64,
    pub total_price: f64,
}

/// Session-scoped carts. Each operation is atomic for its session.
#[derive(Debug, Default)]
pub struct CartService {
    carts: DashMap<String, Vec<CartLine>>,
}

impl CartService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, session_id: &str, product: &Product, quantity: u32) -> ShopResult<Vec<CartLine>> {
        if quantity == 0 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }

        let mut cart = self.carts.entry(session_id.to_string()).or_default();
        match cart.iter_mut().find(|line| line.product_id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => cart.push(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                price: product.price,
                image: product.image.clone(),
                quantity,
                added_at: Utc::now(),
            }),
        }
        debug!(session_id, product_id = %product.id, quantity, "cart line added");
        Ok(cart.value().clone())
    }

    pub fn remove_item(&self, session_id: &str, product_id: &str) -> Vec<CartLine> {
        match self.carts.get_mut(session_id) {
            Some(mut cart) => {
                cart.retain(|line| line.product_id != product_id);
                cart.value().clone()
            }
            None => Vec::new(),
        }
    }

    /// Sets a line's quantity, raising anything below 1 to 1. Unknown products
    /// are ignored.
    pub fn set_quantity(&self, session_id: &str, product_id: &str, quantity: u32) -> Vec<CartLine> {
        match self.carts.get_mut(session_id) {
            Some(mut cart) => {
                if let Some(line) = cart.iter_mut().find(|line| line.product_id == product_id) {
                    line.quantity = quantity.max(1);
                }
                cart.value().clone()
            }
            None => Vec::new(),
        }
    }

    pub fn clear(&self, session_id: &str) {
        self.carts.remove(session_id);
    }

    pub fn lines(&self, session_id: &str) -> Vec<CartLine> {
        self.carts
            .get(session_id)
            .map(|cart| cart.value().clone())
            .unwrap_or_default()
    }

    pub fn stats(&self, session_id: &str) -> CartStats {
        let lines = self.lines(session_id);
        CartStats {
            item_count: lines.len(),
            total_items: lines.iter().map(|line| u64::from(line.quantity)).sum(),
            total_price: lines.iter().map(CartLine::subtotal).sum(),
        }
    }
}

//! Inventory Ledger: per-product stock levels.
//!
//! Every read-modify-write runs while holding the product's `DashMap` entry, so
//! concurrent callers touching the same product are serialized while different
//! products proceed in parallel.

use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{ShopError, ShopResult};
use crate::product::seed_inventory;

#[derive(Debug, Default)]
pub struct InventoryLedger {
    levels: DashMap<String, u32>,
    seed: HashMap<String, u32>,
    baseline: u32,
}

impl InventoryLedger {
    /// Ledger whose entries start at `baseline` unless the seed table names them.
    pub fn new(seed: HashMap<String, u32>, baseline: u32) -> Self {
        Self {
            levels: DashMap::new(),
            seed,
            baseline,
        }
    }

    /// Ledger seeded with the stock levels of the built-in catalog.
    pub fn seeded() -> Self {
        Self::new(seed_inventory(), 0)
    }

    fn initial(&self, product_id: &str) -> u32 {
        self.seed.get(product_id).copied().unwrap_or(self.baseline)
    }

    /// Current quantity. Materializes the entry on first access.
    pub fn get(&self, product_id: &str) -> u32 {
        *self
            .levels
            .entry(product_id.to_string())
            .or_insert_with(|| self.initial(product_id))
    }

    /// Applies `max(0, current + delta)` atomically and returns the new quantity.
    pub fn adjust(&self, product_id: &str, delta: i64) -> u32 {
        let mut entry = self
            .levels
            .entry(product_id.to_string())
            .or_insert_with(|| self.initial(product_id));
        let next = i64::from(*entry)
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX)) as u32;
        debug!(product_id, delta, from = *entry, to = next, "inventory adjusted");
        *entry = next;
        next
    }

    pub fn increase(&self, product_id: &str, quantity: u32) -> u32 {
        self.adjust(product_id, i64::from(quantity))
    }

    /// Debits `quantity`, or fails without touching the stock when less than
    /// `quantity` is available.
    pub fn decrease(&self, product_id: &str, quantity: u32) -> ShopResult<u32> {
        let mut entry = self
            .levels
            .entry(product_id.to_string())
            .or_insert_with(|| self.initial(product_id));
        let available = *entry;
        if quantity > available {
            warn!(product_id, requested = quantity, available, "insufficient stock");
            return Err(ShopError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
                available,
            });
        }
        *entry = available - quantity;
        debug!(product_id, quantity, remaining = *entry, "inventory debited");
        Ok(*entry)
    }

    /// Debits up to `quantity`, stopping at zero. Oversells silently; prefer
    /// [`InventoryLedger::decrease`].
    pub fn decrease_saturating(&self, product_id: &str, quantity: u32) -> u32 {
        self.adjust(product_id, -i64::from(quantity))
    }

    pub fn is_in_stock(&self, product_id: &str) -> bool {
        self.get(product_id) > 0
    }

    /// Every stock level, materializing seeded entries that were never touched.
    pub fn snapshot(&self) -> HashMap<String, u32> {
        for id in self.seed.keys() {
            self.get(id);
        }
        self.levels
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_defaults_to_seed_then_baseline() {
        let ledger = InventoryLedger::new(HashMap::from([("a".to_string(), 4)]), 2);
        assert_eq!(ledger.get("a"), 4);
        assert_eq!(ledger.get("unknown"), 2);
    }

    #[test]
    fn saturating_decrease_clamps_at_zero() {
        let ledger = InventoryLedger::seeded();
        assert_eq!(ledger.decrease_saturating("roadster-200", 2), 28);
        for _ in 0..20 {
            ledger.decrease_saturating("roadster-200", 2);
        }
        assert_eq!(ledger.get("roadster-200"), 0);
        assert!(!ledger.is_in_stock("roadster-200"));
    }

    #[test]
    fn adjust_never_goes_negative() {
        let ledger = InventoryLedger::seeded();
        for start in [0_i64, 1, 5, 40] {
            for k in [0_i64, 1, 5, 41, i64::MAX / 2] {
                let id = format!("p-{start}-{k}");
                ledger.adjust(&id, start);
                let after = ledger.adjust(&id, -k);
                assert_eq!(i64::from(after), (start - k).max(0));
            }
        }
    }

    #[test]
    fn strict_decrease_rejects_oversell_and_keeps_stock() {
        let ledger = InventoryLedger::seeded();
        assert_eq!(ledger.decrease("speedster-elite", 3), Ok(2));
        let err = ledger.decrease("speedster-elite", 3).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientStock {
                product_id: "speedster-elite".into(),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(ledger.get("speedster-elite"), 2);
    }

    #[test]
    fn increase_adds_stock() {
        let ledger = InventoryLedger::seeded();
        assert_eq!(ledger.increase("city-hybrid", 5), 45);
    }

    #[test]
    fn snapshot_lists_seeded_products() {
        let ledger = InventoryLedger::seeded();
        ledger.increase("extra", 3);
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot["summit-mtn"], 15);
        assert_eq!(snapshot["extra"], 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_never_oversell() {
        let ledger = Arc::new(InventoryLedger::seeded());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger.decrease("pro-racer-x", 1).is_ok()
            }));
        }

        let mut sold = 0;
        for task in tasks {
            if task.await.unwrap() {
                sold += 1;
            }
        }
        assert_eq!(sold, 8);
        assert_eq!(ledger.get("pro-racer-x"), 0);
    }
}

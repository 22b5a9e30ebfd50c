//! Catalog Store and its pluggable repositories.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::error::{ShopError, ShopResult};
use crate::product::{seed_catalog, Product};

/// Where the catalog lives. Implementations seed the built-in catalog the first
/// time they are read and find nothing stored.
pub trait CatalogRepository: Send + Sync {
    fn load(&self) -> ShopResult<Vec<Product>>;
    fn save(&self, products: &[Product]) -> ShopResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Option<Vec<Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(Some(products)),
        }
    }
}

impl CatalogRepository for InMemoryCatalog {
    fn load(&self) -> ShopResult<Vec<Product>> {
        let mut guard = self
            .products
            .write()
            .map_err(|_| ShopError::Storage("catalog lock poisoned".into()))?;
        Ok(guard.get_or_insert_with(seed_catalog).clone())
    }

    fn save(&self, products: &[Product]) -> ShopResult<()> {
        let mut guard = self
            .products
            .write()
            .map_err(|_| ShopError::Storage("catalog lock poisoned".into()))?;
        *guard = Some(products.to_vec());
        Ok(())
    }
}

/// Catalog persisted as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogRepository for JsonFileCatalog {
    fn load(&self) -> ShopResult<Vec<Product>> {
        if !self.path.exists() {
            let seed = seed_catalog();
            self.save(&seed)?;
            info!("Seeded catalog file {}", self.path.display());
            return Ok(seed);
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, products: &[Product]) -> ShopResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(products)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(count = products.len(), "catalog saved");
        Ok(())
    }
}

fn validate(product: &Product) -> ShopResult<()> {
    if product.id.trim().is_empty() {
        return Err(ShopError::Validation("product id is required".into()));
    }
    if product.name.trim().is_empty() {
        return Err(ShopError::Validation("product name is required".into()));
    }
    if !(product.price > 0.0) {
        return Err(ShopError::Validation(format!("price of {} must be positive", product.id)));
    }
    if !(0.0..=5.0).contains(&product.rating) {
        return Err(ShopError::Validation(format!("rating of {} must be within 0-5", product.id)));
    }
    Ok(())
}

/// Owns the product lifecycle on top of a [`CatalogRepository`]. Writes are
/// serialized so each load, modify and save cycle sees the previous one.
pub struct CatalogStore<R> {
    repository: R,
    writes: Mutex<()>,
}

impl<R: CatalogRepository> CatalogStore<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            writes: Mutex::new(()),
        }
    }

    fn write_guard(&self) -> ShopResult<MutexGuard<'_, ()>> {
        self.writes
            .lock()
            .map_err(|_| ShopError::Storage("catalog write lock poisoned".into()))
    }

    pub fn products(&self) -> ShopResult<Vec<Product>> {
        self.repository.load()
    }

    pub fn get(&self, id: &str) -> ShopResult<Product> {
        self.repository
            .load()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    pub fn add(&self, product: Product) -> ShopResult<Product> {
        validate(&product)?;
        let _guard = self.write_guard()?;
        let mut products = self.repository.load()?;
        if products.iter().any(|p| p.id == product.id) {
            return Err(ShopError::Conflict(format!("product {} already exists", product.id)));
        }
        products.push(product.clone());
        self.repository.save(&products)?;
        info!("Product {} added", product.id);
        Ok(product)
    }

    pub fn update(&self, product: Product) -> ShopResult<Product> {
        validate(&product)?;
        let _guard = self.write_guard()?;
        let mut products = self.repository.load()?;
        let slot = products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| ShopError::NotFound(format!("product {}", product.id)))?;
        *slot = product.clone();
        self.repository.save(&products)?;
        info!("Product {} updated", product.id);
        Ok(product)
    }

    /// Folds a 1-5 review score into the product's rating and review count.
    pub fn record_review(&self, id: &str, score: u8) -> ShopResult<Product> {
        if !(1..=5).contains(&score) {
            return Err(ShopError::Validation("rating must be between 1 and 5".into()));
        }
        let _guard = self.write_guard()?;
        let mut products = self.repository.load()?;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))?;
        product.apply_review(f64::from(score));
        let updated = product.clone();
        self.repository.save(&products)?;
        Ok(updated)
    }
}

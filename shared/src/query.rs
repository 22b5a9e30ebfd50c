//! Product Query Engine.
//!
//! Pure functions over a product snapshot: free-text search, multi-criteria
//! filtering, stable sorting, and catalog analytics. Nothing here performs I/O;
//! callers load the corpus from a [`crate::catalog::CatalogRepository`] or the
//! database and pass a slice in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

use crate::error::{ShopError, ShopResult};
use crate::product::Product;

/// Category criterion. `All` is the explicit "no filtering" sentinel, which is
/// distinct from leaving the criterion out altogether.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(value: String) -> Self {
        if value == "all" {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(value)
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        CategoryFilter::from(value.to_string())
    }
}

impl From<CategoryFilter> for String {
    fn from(value: CategoryFilter) -> Self {
        match value {
            CategoryFilter::All => "all".to_string(),
            CategoryFilter::Only(category) => category,
        }
    }
}

/// Conjunctive product filter. Every field is optional; an absent field does
/// not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// Only `Some(true)` constrains; `Some(false)` keeps everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reviews: Option<u32>,
}

impl ProductFilter {
    pub fn category(mut self, category: impl Into<CategoryFilter>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn min_price(mut self, price: f64) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: f64) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    pub fn min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn min_reviews(mut self, reviews: u32) -> Self {
        self.min_reviews = Some(reviews);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if !category.matches(&product.category) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        if self.in_stock == Some(true) && !product.in_stock {
            return false;
        }
        if let Some(min) = self.min_rating {
            if product.rating < min {
                return false;
            }
        }
        if let Some(min) = self.min_reviews {
            if product.review_count < min {
                return false;
            }
        }
        true
    }
}

/// Product field used as a sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Category,
    Price,
    Rating,
    ReviewCount,
    /// A field the engine does not know. Every product compares equal, so a
    /// sort by it returns the input order.
    Unrecognized(String),
}

impl FromStr for SortKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "category" => SortKey::Category,
            "price" => SortKey::Price,
            "rating" | "reviews" => SortKey::Rating,
            "reviewCount" | "review_count" => SortKey::ReviewCount,
            other => SortKey::Unrecognized(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(ShopError::Validation(format!(
                "sort direction must be asc or desc, got {other:?}"
            ))),
        }
    }
}

fn compare_by(key: &SortKey, a: &Product, b: &Product) -> Ordering {
    match key {
        SortKey::Id => a.id.to_lowercase().cmp(&b.id.to_lowercase()),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
        SortKey::Price => a.price.total_cmp(&b.price),
        SortKey::Rating => a.rating.total_cmp(&b.rating),
        SortKey::ReviewCount => a.review_count.cmp(&b.review_count),
        SortKey::Unrecognized(_) => Ordering::Equal,
    }
}

/// Case-insensitive substring search across name, description, category and
/// spec values. An empty (or all-whitespace) query returns the corpus as is.
pub fn search(query: &str, corpus: &[Product]) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return corpus.to_vec();
    }

    corpus
        .iter()
        .filter(|product| {
            product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
                || product.category.to_lowercase().contains(&needle)
                || product
                    .specs
                    .values()
                    .any(|value| value.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub fn filter(criteria: &ProductFilter, corpus: &[Product]) -> Vec<Product> {
    corpus
        .iter()
        .filter(|product| criteria.matches(product))
        .cloned()
        .collect()
}

/// Returns a sorted copy of `corpus`. The sort is stable in both directions:
/// products with equal keys keep their input order.
pub fn sort(corpus: &[Product], key: &SortKey, direction: SortDirection) -> Vec<Product> {
    let mut sorted = corpus.to_vec();
    match direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare_by(key, a, b)),
        SortDirection::Desc => sorted.sort_by(|a, b| compare_by(key, b, a)),
    }
    sorted
}

pub fn search_and_filter(query: &str, criteria: &ProductFilter, corpus: &[Product]) -> Vec<Product> {
    filter(criteria, &search(query, corpus))
}

pub fn top_rated(n: usize, corpus: &[Product]) -> Vec<Product> {
    sort(corpus, &SortKey::Rating, SortDirection::Desc)
        .into_iter()
        .take(n)
        .collect()
}

pub fn most_reviewed(n: usize, corpus: &[Product]) -> Vec<Product> {
    sort(corpus, &SortKey::ReviewCount, SortDirection::Desc)
        .into_iter()
        .take(n)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub count: usize,
    pub total_price: f64,
    pub avg_price: f64,
    pub total_rating: f64,
    pub avg_rating: f64,
}

/// Per-category count, price and rating aggregates. A category only appears
/// when at least one product belongs to it.
pub fn category_stats(corpus: &[Product]) -> BTreeMap<String, CategoryStats> {
    let mut sums: BTreeMap<String, (usize, f64, f64)> = BTreeMap::new();
    for product in corpus {
        let entry = sums.entry(product.category.clone()).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += product.price;
        entry.2 += product.rating;
    }

    sums.into_iter()
        .map(|(category, (count, total_price, total_rating))| {
            let n = count as f64;
            let stats = CategoryStats {
                count,
                total_price,
                avg_price: total_price / n,
                total_rating,
                avg_rating: total_rating / n,
            };
            (category, stats)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

pub fn price_range(corpus: &[Product]) -> ShopResult<PriceRange> {
    let first = corpus.first().ok_or(ShopError::EmptyCatalog)?;
    let (min, max, sum) = corpus.iter().fold(
        (first.price, first.price, 0.0),
        |(min, max, sum), product| {
            (min.min(product.price), max.max(product.price), sum + product.price)
        },
    );
    Ok(PriceRange {
        min,
        max,
        average: sum / corpus.len() as f64,
    })
}

/// A complete catalog query: optional text search, then filter, then an
/// optional sort.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub text: Option<String>,
    pub filter: ProductFilter,
    pub sort: Option<(SortKey, SortDirection)>,
}

impl ProductQuery {
    pub fn run(&self, corpus: &[Product]) -> Vec<Product> {
        let matched = search_and_filter(self.text.as_deref().unwrap_or(""), &self.filter, corpus);
        match &self.sort {
            Some((key, direction)) => sort(&matched, key, *direction),
            None => matched,
        }
    }
}

use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use shared::query::{self, CategoryStats, PriceRange};
use shared::{
    seed_catalog, seed_inventory, NewCustomer, OrderEvent, OrderStatus, OrderedItem, OutboxEvent,
    Product, ProductFilter, ProductQuery, ShopError,
};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Matches `cart_items.session_id VARCHAR(128)`.
pub const MAX_SESSION_ID_LEN: usize = 128;
/// Matches the `cart_items.quantity` check constraint.
pub const MAX_CART_LINE_QUANTITY: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Validates order lines and folds repeated products into one line, sorted by
/// product id. Locking rows in that order keeps concurrent orders over the
/// same products from deadlocking.
pub fn merge_order_lines(items: &[OrderLineRequest]) -> Result<Vec<OrderLineRequest>, ShopError> {
    if items.is_empty() {
        return Err(ShopError::Validation("an order needs at least one item".to_string()));
    }

    let mut merged: BTreeMap<&str, u32> = BTreeMap::new();
    for line in items {
        if line.quantity == 0 {
            return Err(ShopError::Validation(format!(
                "quantity for {} must be positive",
                line.product_id
            )));
        }
        let quantity = merged.entry(line.product_id.as_str()).or_default();
        *quantity = quantity.checked_add(line.quantity).ok_or_else(|| {
            ShopError::Validation(format!("quantity for {} is too large", line.product_id))
        })?;
    }

    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| OrderLineRequest {
            product_id: product_id.to_string(),
            quantity,
        })
        .collect())
}

/// An order as submitted by a client. Prices are taken from the catalog at
/// the moment the order is placed, not from the request.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub customer_id: Uuid,
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLevel {
    pub product_id: String,
    pub quantity: u32,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ShopError> {
        shared::customer::validate_email(&self.email)?;
        if self.password.chars().count() < 8 {
            return Err(ShopError::Validation(
                "password must be at least 8 characters".to_string(),
            ));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ShopError::Validation(
                "first and last name are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// PostgreSQL-backed storefront. Every operation checks out its own pooled
/// connection; multi-row writes run inside a single transaction.
#[derive(Clone)]
pub struct Storefront {
    pool: DbPool,
}

impl Storefront {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts the built-in catalog when the products table is empty.
    /// Returns the number of rows inserted.
    pub async fn seed_catalog_if_empty(&self) -> anyhow::Result<usize> {
        let mut conn = self.pool.get().await?;

        let existing: i64 = products::table.count().get_result(&mut conn).await?;
        if existing > 0 {
            return Ok(0);
        }

        let stock = seed_inventory();
        let rows = seed_catalog()
            .iter()
            .map(|product| {
                let quantity = stock.get(&product.id).copied().unwrap_or_default();
                NewProduct::from_product(product, quantity)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let inserted = diesel::insert_into(products::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;

        info!("Seeded {} catalog products", inserted);
        Ok(inserted)
    }

    async fn load_catalog(&self) -> ApiResult<Vec<Product>> {
        let mut conn = self.pool.get().await?;

        let rows = products::table
            .order(products::name.asc())
            .select(DbProduct::as_select())
            .load::<DbProduct>(&mut conn)
            .await?;

        rows.into_iter()
            .map(|row| Product::try_from(row).map_err(ApiError::from))
            .collect()
    }

    pub async fn products(&self) -> ApiResult<Vec<Product>> {
        self.load_catalog().await
    }

    pub async fn product(&self, product_id: &str) -> ApiResult<Product> {
        let mut conn = self.pool.get().await?;

        let row = products::table
            .find(product_id)
            .select(DbProduct::as_select())
            .first::<DbProduct>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ShopError::NotFound(format!("product {}", product_id)))?;

        Ok(Product::try_from(row)?)
    }

    pub async fn products_in_category(&self, category: &str) -> ApiResult<Vec<Product>> {
        let catalog = self.load_catalog().await?;
        Ok(query::filter(&ProductFilter::default().category(category), &catalog))
    }

    pub async fn search(&self, text: &str) -> ApiResult<Vec<Product>> {
        let catalog = self.load_catalog().await?;
        Ok(query::search(text, &catalog))
    }

    pub async fn query(&self, product_query: &ProductQuery) -> ApiResult<Vec<Product>> {
        let catalog = self.load_catalog().await?;
        Ok(product_query.run(&catalog))
    }

    pub async fn top_rated(&self, limit: usize) -> ApiResult<Vec<Product>> {
        let catalog = self.load_catalog().await?;
        Ok(query::top_rated(limit, &catalog))
    }

    pub async fn most_reviewed(&self, limit: usize) -> ApiResult<Vec<Product>> {
        let catalog = self.load_catalog().await?;
        Ok(query::most_reviewed(limit, &catalog))
    }

    pub async fn category_stats(&self) -> ApiResult<BTreeMap<String, CategoryStats>> {
        let catalog = self.load_catalog().await?;
        Ok(query::category_stats(&catalog))
    }

    pub async fn price_range(&self) -> ApiResult<PriceRange> {
        let catalog = self.load_catalog().await?;
        Ok(query::price_range(&catalog)?)
    }

    pub async fn stock_level(&self, product_id: &str) -> ApiResult<StockLevel> {
        let mut conn = self.pool.get().await?;

        let quantity = products::table
            .find(product_id)
            .select(products::stock_quantity)
            .first::<i32>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ShopError::NotFound(format!("product {}", product_id)))?;

        let quantity = u32::try_from(quantity).unwrap_or_default();
        Ok(StockLevel {
            product_id: product_id.to_string(),
            quantity,
            in_stock: quantity > 0,
        })
    }

    pub async fn create_customer(&self, customer: NewCustomer) -> ApiResult<DbCustomer> {
        customer.validate()?;
        let row = NewCustomerRow::from(customer);
        let mut conn = self.pool.get().await?;

        let taken = customers::table
            .filter(customers::email.eq(&row.email))
            .select(customers::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()?;
        if taken.is_some() {
            return Err(ShopError::Conflict(format!("customer {} already exists", row.email)).into());
        }

        let created = diesel::insert_into(customers::table)
            .values(&row)
            .returning(DbCustomer::as_returning())
            .get_result::<DbCustomer>(&mut conn)
            .await?;

        info!("Created customer {}", created.id);
        Ok(created)
    }

    pub async fn customer_by_email(&self, email: &str) -> ApiResult<DbCustomer> {
        let mut conn = self.pool.get().await?;

        customers::table
            .filter(customers::email.eq(email.trim().to_lowercase()))
            .select(DbCustomer::as_select())
            .first::<DbCustomer>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ShopError::NotFound(format!("customer {}", email)).into())
    }

    /// Places an order in one transaction: each product row is locked in
    /// product id order, its stock checked and debited, then the order, its lines and an
    /// `OrderCreated` outbox row are written. Any failure leaves stock as it
    /// was.
    pub async fn place_order(&self, request: PlaceOrder) -> ApiResult<OrderPlaced> {
        let order_lines = merge_order_lines(&request.items)?;

        let mut conn = self.pool.get().await?;

        let customer_exists = customers::table
            .find(request.customer_id)
            .select(customers::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()?
            .is_some();
        if !customer_exists {
            return Err(ShopError::NotFound(format!("customer {}", request.customer_id)).into());
        }

        let order_id = Uuid::new_v4();
        let placed = conn
            .transaction::<_, ApiError, _>(|conn| {
                Box::pin(async move {
                    let mut rows = Vec::with_capacity(order_lines.len());
                    let mut event_items = Vec::with_capacity(order_lines.len());
                    let mut total = BigDecimal::from(0);

                    for line in &order_lines {
                        let product = products::table
                            .find(&line.product_id)
                            .select(DbProduct::as_select())
                            .for_update()
                            .first::<DbProduct>(conn)
                            .await
                            .optional()?
                            .ok_or_else(|| {
                                ShopError::NotFound(format!("product {}", line.product_id))
                            })?;

                        let available = u32::try_from(product.stock_quantity).unwrap_or_default();
                        if available < line.quantity {
                            warn!(
                                "Rejecting order for {}: requested {}, available {}",
                                line.product_id, line.quantity, available
                            );
                            return Err(ShopError::InsufficientStock {
                                product_id: line.product_id.clone(),
                                requested: line.quantity,
                                available,
                            }
                            .into());
                        }

                        let remaining = available - line.quantity;
                        diesel::update(products::table.find(&line.product_id))
                            .set((
                                products::stock_quantity.eq(i32::try_from(remaining).map_err(anyhow::Error::from)?),
                                products::in_stock.eq(product.in_stock && remaining > 0),
                            ))
                            .execute(conn)
                            .await?;

                        let quantity = i32::try_from(line.quantity).map_err(anyhow::Error::from)?;
                        let subtotal = product.price.clone() * BigDecimal::from(quantity);
                        total = total + subtotal.clone();

                        event_items.push(OrderedItem {
                            product_id: line.product_id.clone(),
                            quantity: line.quantity,
                            unit_price: money(&product.price),
                        });
                        rows.push(NewOrderItem {
                            id: Uuid::new_v4(),
                            order_id,
                            product_id: line.product_id.clone(),
                            quantity,
                            unit_price: product.price,
                            subtotal,
                        });
                    }

                    diesel::insert_into(orders::table)
                        .values(&NewOrder {
                            id: order_id,
                            customer_id: request.customer_id,
                            total_amount: total.clone(),
                            status: OrderStatus::Pending.as_str().to_string(),
                            shipping_address: request.shipping_address,
                            notes: request.notes,
                        })
                        .execute(conn)
                        .await?;

                    diesel::insert_into(order_items::table)
                        .values(&rows)
                        .execute(conn)
                        .await?;

                    let event = OrderEvent::OrderCreated {
                        order_id,
                        customer_id: request.customer_id,
                        total_amount: money(&total),
                        items: event_items,
                    };
                    let outbox = OutboxEvent::new(&event).map_err(anyhow::Error::from)?;
                    diesel::insert_into(outbox_events::table)
                        .values(&NewOutboxEvent::from(outbox))
                        .execute(conn)
                        .await?;

                    Ok(OrderPlaced {
                        order_id,
                        total_amount: money(&total),
                    })
                })
            })
            .await?;

        info!("Created order {} for {:.2}", placed.order_id, placed.total_amount);
        Ok(placed)
    }

    pub async fn orders_for_customer(&self, customer_id: Uuid) -> ApiResult<Vec<OrderView>> {
        let mut conn = self.pool.get().await?;

        let rows = orders::table
            .filter(orders::customer_id.eq(customer_id))
            .order(orders::created_at.desc())
            .select(DbOrder::as_select())
            .load::<DbOrder>(&mut conn)
            .await?;

        Ok(rows.into_iter().map(OrderView::from).collect())
    }

    pub async fn order_details(&self, order_id: Uuid) -> ApiResult<OrderDetails> {
        let mut conn = self.pool.get().await?;

        let order = orders::table
            .find(order_id)
            .select(DbOrder::as_select())
            .first::<DbOrder>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ShopError::NotFound(format!("order {}", order_id)))?;

        let items = order_items::table
            .inner_join(products::table)
            .filter(order_items::order_id.eq(order_id))
            .select((
                order_items::id,
                order_items::product_id,
                order_items::quantity,
                order_items::unit_price,
                order_items::subtotal,
                products::name,
                products::image,
            ))
            .load::<(Uuid, String, i32, BigDecimal, BigDecimal, String, String)>(&mut conn)
            .await?;

        Ok(OrderDetails {
            order: order.into(),
            items: items.into_iter().map(OrderItemView::from).collect(),
        })
    }

    /// Moves an order to `next` if the transition table allows it, recording
    /// an `OrderStatusChanged` outbox row in the same transaction.
    pub async fn update_order_status(&self, order_id: Uuid, next: OrderStatus) -> ApiResult<OrderView> {
        let mut conn = self.pool.get().await?;

        let updated = conn
            .transaction::<_, ApiError, _>(|conn| {
                Box::pin(async move {
                    let order = orders::table
                        .find(order_id)
                        .select(DbOrder::as_select())
                        .for_update()
                        .first::<DbOrder>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| ShopError::NotFound(format!("order {}", order_id)))?;

                    let current: OrderStatus = order.status.parse().map_err(|e| {
                        anyhow::anyhow!("order {} has unreadable status: {}", order_id, e)
                    })?;
                    let next = current.transition(next)?;

                    let updated = diesel::update(orders::table.find(order_id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::updated_at.eq(Utc::now()),
                        ))
                        .returning(DbOrder::as_returning())
                        .get_result::<DbOrder>(conn)
                        .await?;

                    let event = OrderEvent::OrderStatusChanged {
                        order_id,
                        from: current,
                        to: next,
                    };
                    let outbox = OutboxEvent::new(&event).map_err(anyhow::Error::from)?;
                    diesel::insert_into(outbox_events::table)
                        .values(&NewOutboxEvent::from(outbox))
                        .execute(conn)
                        .await?;

                    Ok(updated)
                })
            })
            .await?;

        info!("Order {} is now {}", order_id, updated.status);
        Ok(updated.into())
    }

    /// Adds `quantity` of a product to a session's cart, summing with any
    /// line already present for that product. A merged line above
    /// [`MAX_CART_LINE_QUANTITY`] is refused by the table's check constraint.
    pub async fn add_to_cart(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: u32,
        customer_id: Option<Uuid>,
    ) -> ApiResult<()> {
        if session_id.trim().is_empty() {
            return Err(ShopError::Validation("session_id is required".to_string()).into());
        }
        if session_id.chars().count() > MAX_SESSION_ID_LEN {
            return Err(ShopError::Validation(format!(
                "session_id must be at most {} characters",
                MAX_SESSION_ID_LEN
            ))
            .into());
        }
        if quantity == 0 || quantity > MAX_CART_LINE_QUANTITY {
            return Err(ShopError::Validation(format!(
                "quantity must be between 1 and {}",
                MAX_CART_LINE_QUANTITY
            ))
            .into());
        }
        let quantity = i32::try_from(quantity).map_err(anyhow::Error::from)?;

        let mut conn = self.pool.get().await?;

        let known = products::table
            .find(product_id)
            .select(products::id)
            .first::<String>(&mut conn)
            .await
            .optional()?
            .is_some();
        if !known {
            return Err(ShopError::NotFound(format!("product {}", product_id)).into());
        }

        diesel::insert_into(cart_items::table)
            .values(&NewCartItem {
                session_id: session_id.to_string(),
                product_id: product_id.to_string(),
                customer_id,
                quantity,
            })
            .on_conflict((cart_items::session_id, cart_items::product_id))
            .do_update()
            .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn cart(&self, session_id: &str) -> ApiResult<Vec<CartItemView>> {
        let mut conn = self.pool.get().await?;

        let rows = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::session_id.eq(session_id))
            .order(cart_items::added_at.asc())
            .select((
                cart_items::session_id,
                cart_items::product_id,
                cart_items::customer_id,
                cart_items::quantity,
                cart_items::added_at,
                products::name,
                products::price,
                products::image,
                products::category,
            ))
            .load::<(
                String,
                String,
                Option<Uuid>,
                i32,
                chrono::DateTime<Utc>,
                String,
                BigDecimal,
                String,
                String,
            )>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(session_id, product_id, customer_id, quantity, added_at, name, price, image, category)| {
                    CartItemView {
                        session_id,
                        product_id,
                        customer_id,
                        quantity,
                        added_at,
                        name,
                        price: money(&price),
                        image,
                        category,
                    }
                },
            )
            .collect())
    }

    pub async fn remove_from_cart(&self, session_id: &str, product_id: &str) -> ApiResult<usize> {
        let mut conn = self.pool.get().await?;

        let removed = diesel::delete(
            cart_items::table
                .filter(cart_items::session_id.eq(session_id))
                .filter(cart_items::product_id.eq(product_id)),
        )
        .execute(&mut conn)
        .await?;

        Ok(removed)
    }

    pub async fn clear_cart(&self, session_id: &str) -> ApiResult<usize> {
        let mut conn = self.pool.get().await?;

        let removed = diesel::delete(cart_items::table.filter(cart_items::session_id.eq(session_id)))
            .execute(&mut conn)
            .await?;

        Ok(removed)
    }

    /// Stores a 1-5 review and folds it into the product's running rating.
    pub async fn add_review(
        &self,
        product_id: &str,
        customer_id: Option<Uuid>,
        rating: i32,
        review_text: Option<String>,
    ) -> ApiResult<Uuid> {
        if !(1..=5).contains(&rating) {
            return Err(ShopError::Validation("rating must be between 1 and 5".to_string()).into());
        }

        let mut conn = self.pool.get().await?;
        let product_id = product_id.to_string();

        let review_id = conn
            .transaction::<_, ApiError, _>(|conn| {
                Box::pin(async move {
                    let row = products::table
                        .find(&product_id)
                        .select(DbProduct::as_select())
                        .for_update()
                        .first::<DbProduct>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| ShopError::NotFound(format!("product {}", product_id)))?;

                    let mut product = Product::try_from(row)?;
                    product.apply_review(f64::from(rating));

                    let review = Review {
                        id: Uuid::new_v4(),
                        product_id: product_id.clone(),
                        customer_id,
                        rating,
                        review_text,
                        created_at: Utc::now(),
                    };
                    diesel::insert_into(product_reviews::table)
                        .values(&review)
                        .execute(conn)
                        .await?;

                    diesel::update(products::table.find(&product_id))
                        .set((
                            products::rating.eq(product.rating),
                            products::review_count
                                .eq(i32::try_from(product.review_count).map_err(anyhow::Error::from)?),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(review.id)
                })
            })
            .await?;

        Ok(review_id)
    }

    pub async fn reviews_for_product(&self, product_id: &str) -> ApiResult<Vec<Review>> {
        let mut conn = self.pool.get().await?;

        let reviews = product_reviews::table
            .filter(product_reviews::product_id.eq(product_id))
            .order(product_reviews::created_at.desc())
            .select(Review::as_select())
            .load::<Review>(&mut conn)
            .await?;

        Ok(reviews)
    }

    pub async fn register_user(&self, registration: Registration) -> ApiResult<UserProfile> {
        registration.validate()?;
        let email = registration.email.trim().to_lowercase();
        let mut conn = self.pool.get().await?;

        let taken = users::table
            .filter(users::email.eq(&email))
            .select(users::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()?;
        if taken.is_some() {
            return Err(ShopError::Conflict("email is already registered".to_string()).into());
        }

        let password_hash = auth::hash_password(registration.password).await?;
        let user = diesel::insert_into(users::table)
            .values(&NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash,
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
            })
            .returning(DbUser::as_returning())
            .get_result::<DbUser>(&mut conn)
            .await?;

        info!("Registered user {}", user.id);
        Ok(user.into())
    }

    /// Returns the account for a matching email and password. Unknown emails
    /// and wrong passwords fail identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let mut conn = self.pool.get().await?;

        let user = users::table
            .filter(users::email.eq(email.trim().to_lowercase()))
            .select(DbUser::as_select())
            .first::<DbUser>(&mut conn)
            .await
            .optional()?;

        let rejected = || ApiError::from(ShopError::Unauthorized("invalid email or password".to_string()));
        let user = user.ok_or_else(rejected)?;
        if !auth::verify_password(password.to_string(), user.password_hash.clone()).await {
            warn!("Failed login for {}", user.email);
            return Err(rejected());
        }

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            email: "rider@example.com".into(),
            password: "long-enough".into(),
            first_name: "Ada".into(),
            last_name: "Rider".into(),
        }
    }

    #[test]
    fn registration_requires_valid_fields() {
        assert!(registration().validate().is_ok());

        let short = Registration {
            password: "short".into(),
            ..registration()
        };
        assert!(matches!(short.validate(), Err(ShopError::Validation(_))));

        let bad_email = Registration {
            email: "not-an-email".into(),
            ..registration()
        };
        assert!(matches!(bad_email.validate(), Err(ShopError::Validation(_))));

        let nameless = Registration {
            last_name: "  ".into(),
            ..registration()
        };
        assert!(matches!(nameless.validate(), Err(ShopError::Validation(_))));
    }

    fn line(product_id: &str, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }

    #[test]
    fn order_lines_are_merged_and_sorted_by_product() {
        let forward = merge_order_lines(&[line("roadster-200", 1), line("city-hybrid", 2)]).unwrap();
        let reverse = merge_order_lines(&[line("city-hybrid", 2), line("roadster-200", 1)]).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward[0].product_id, "city-hybrid");

        let merged = merge_order_lines(&[
            line("summit-mtn", 2),
            line("city-hybrid", 1),
            line("summit-mtn", 3),
        ])
        .unwrap();
        assert_eq!(merged, vec![line("city-hybrid", 1), line("summit-mtn", 5)]);
    }

    #[test]
    fn order_lines_reject_empty_zero_and_overflowing_quantities() {
        assert!(matches!(merge_order_lines(&[]), Err(ShopError::Validation(_))));
        assert!(matches!(
            merge_order_lines(&[line("city-hybrid", 0)]),
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            merge_order_lines(&[line("city-hybrid", u32::MAX), line("city-hybrid", 1)]),
            Err(ShopError::Validation(_))
        ));
    }

    #[test]
    fn order_request_ignores_client_prices() {
        let request: PlaceOrder = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::nil(),
            "items": [{"product_id": "roadster-200", "quantity": 2, "unit_price": 0.01}]
        }))
        .unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
        assert!(request.shipping_address.is_none());
    }
}

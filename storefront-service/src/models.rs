use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use num_traits::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use shared::{OutboxEvent, Product};
use uuid::Uuid;

pub fn money(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

pub fn to_decimal(value: f64) -> anyhow::Result<BigDecimal> {
    BigDecimal::from_f64(value)
        .map(|d| d.round(2))
        .ok_or_else(|| anyhow::anyhow!("price {} is not representable", value))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub image: String,
    pub description: String,
    pub specs: serde_json::Value,
    pub in_stock: bool,
    pub rating: f64,
    pub review_count: i32,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub image: String,
    pub description: String,
    pub specs: serde_json::Value,
    pub in_stock: bool,
    pub rating: f64,
    pub review_count: i32,
    pub stock_quantity: i32,
}

impl NewProduct {
    pub fn from_product(product: &Product, stock_quantity: u32) -> anyhow::Result<Self> {
        Ok(Self {
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: to_decimal(product.price)?,
            image: product.image.clone(),
            description: product.description.clone(),
            specs: serde_json::to_value(&product.specs)?,
            in_stock: product.in_stock && stock_quantity > 0,
            rating: product.rating,
            review_count: i32::try_from(product.review_count)?,
            stock_quantity: i32::try_from(stock_quantity)?,
        })
    }
}

impl TryFrom<DbProduct> for Product {
    type Error = anyhow::Error;

    fn try_from(row: DbProduct) -> Result<Self, Self::Error> {
        Ok(Self {
            price: money(&row.price),
            specs: serde_json::from_value(row.specs)?,
            review_count: u32::try_from(row.review_count)?,
            id: row.id,
            name: row.name,
            category: row.category,
            image: row.image,
            description: row.description,
            in_stock: row.in_stock,
            rating: row.rating,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbCustomer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::customers)]
pub struct NewCustomerRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl From<shared::NewCustomer> for NewCustomerRow {
    fn from(customer: shared::NewCustomer) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: customer.email.trim().to_lowercase(),
            name: customer.name.trim().to_string(),
            phone: customer.phone,
            address: customer.address,
            city: customer.city,
            state: customer.state,
            postal_code: customer.postal_code,
            country: customer.country,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Account fields that are safe to hand back to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<DbUser> for UserProfile {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: f64,
    pub status: String,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbOrder> for OrderView {
    fn from(order: DbOrder) -> Self {
        Self {
            total_amount: money(&order.total_amount),
            id: order.id,
            customer_id: order.customer_id,
            status: order.status,
            shipping_address: order.shipping_address,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::order_items)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

/// An order line joined with the product's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl From<(Uuid, String, i32, BigDecimal, BigDecimal, String, String)> for OrderItemView {
    fn from(
        (id, product_id, quantity, unit_price, subtotal, name, image): (
            Uuid,
            String,
            i32,
            BigDecimal,
            BigDecimal,
            String,
            String,
        ),
    ) -> Self {
        Self {
            id,
            product_id,
            name,
            image,
            quantity,
            unit_price: money(&unit_price),
            subtotal: money(&subtotal),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct NewCartItem {
    pub session_id: String,
    pub product_id: String,
    pub customer_id: Option<Uuid>,
    pub quantity: i32,
}

/// A cart line joined with the live product row.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub session_id: String,
    pub product_id: String,
    pub customer_id: Option<Uuid>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::product_reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Review {
    pub id: Uuid,
    pub product_id: String,
    pub customer_id: Option<Uuid>,
    pub rating: i32,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::outbox_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct NewOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

impl From<OutboxEvent> for NewOutboxEvent {
    fn from(event: OutboxEvent) -> Self {
        Self {
            id: event.id,
            aggregate_id: event.aggregate_id,
            event_type: event.event_type,
            event_data: event.event_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn product_row_round_trips_through_domain_type() {
        let product = shared::seed_catalog().remove(3);
        let row = NewProduct::from_product(&product, 8).unwrap();
        assert_eq!(row.price, BigDecimal::from(1299));
        assert_eq!(row.specs["frame"], "Carbon Fiber");

        let db = DbProduct {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            image: row.image,
            description: row.description,
            specs: row.specs,
            in_stock: row.in_stock,
            rating: row.rating,
            review_count: row.review_count,
            stock_quantity: row.stock_quantity,
            created_at: Utc::now(),
        };
        assert_eq!(Product::try_from(db).unwrap(), product);
    }

    #[test]
    fn out_of_stock_seed_row_is_not_in_stock() {
        let product = shared::seed_catalog().remove(0);
        assert!(!NewProduct::from_product(&product, 0).unwrap().in_stock);
    }

    #[test]
    fn prices_are_rounded_to_cents() {
        assert_eq!(to_decimal(19.999).unwrap(), BigDecimal::from_str("20.00").unwrap());
        assert!(to_decimal(f64::NAN).is_err());
        assert_eq!(money(&BigDecimal::from_str("692.50").unwrap()), 692.5);
    }

    #[test]
    fn customer_rows_normalize_email() {
        let row = NewCustomerRow::from(shared::NewCustomer {
            email: "  Ann@Example.COM ".into(),
            name: " Ann ".into(),
            ..Default::default()
        });
        assert_eq!(row.email, "ann@example.com");
        assert_eq!(row.name, "Ann");
    }
}

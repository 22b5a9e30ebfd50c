//! Storefront operations against a live PostgreSQL. Every test returns early
//! when `DATABASE_URL` is not set.

use std::sync::Once;
use std::time::Duration;

use axum::http::StatusCode;
use diesel::prelude::*;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use shared::{NewCustomer, OrderStatus};
use storefront_service::models::NewProduct;
use storefront_service::schema::products;
use storefront_service::store::{DbPool, OrderLineRequest, PlaceOrder, Storefront};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
static MIGRATE: Once = Once::new();

struct TestDb {
    pool: DbPool,
    store: Storefront,
}

impl TestDb {
    async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };

        MIGRATE.call_once(|| {
            let mut conn = PgConnection::establish(&url).unwrap();
            conn.run_pending_migrations(MIGRATIONS).unwrap();
        });

        let pool = Pool::builder()
            .max_size(10)
            .connection_timeout(Duration::from_secs(30))
            .build(AsyncDieselConnectionManager::<AsyncPgConnection>::new(&url))
            .await
            .unwrap();
        let store = Storefront::new(pool.clone());
        Some(Self { pool, store })
    }

    /// Inserts a copy of a seed bike under a fresh id with the given stock.
    async fn product(&self, stock: u32) -> String {
        let mut bike = shared::seed_catalog().remove(1);
        bike.id = format!("test-{}", Uuid::new_v4());
        bike.rating = 0.0;
        bike.review_count = 0;
        bike.in_stock = true;

        let mut conn = self.pool.get().await.unwrap();
        diesel::insert_into(products::table)
            .values(&NewProduct::from_product(&bike, stock).unwrap())
            .execute(&mut conn)
            .await
            .unwrap();
        bike.id
    }

    async fn customer(&self) -> Uuid {
        self.store
            .create_customer(NewCustomer {
                email: format!("{}@example.com", Uuid::new_v4()),
                name: "Test Rider".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, product_id: &str) -> u32 {
        self.store.stock_level(product_id).await.unwrap().quantity
    }
}

fn order(customer_id: Uuid, items: &[(&str, u32)]) -> PlaceOrder {
    PlaceOrder {
        customer_id,
        items: items
            .iter()
            .map(|(product_id, quantity)| OrderLineRequest {
                product_id: product_id.to_string(),
                quantity: *quantity,
            })
            .collect(),
        shipping_address: None,
        notes: None,
    }
}

#[tokio::test]
async fn failing_last_line_leaves_stock_untouched() {
    let Some(db) = TestDb::connect().await else { return };
    let plenty = db.product(10).await;
    let scarce = db.product(1).await;
    let customer = db.customer().await;

    let err = db
        .store
        .place_order(order(customer, &[(&plenty, 3), (&scarce, 2)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(db.stock(&plenty).await, 10);
    assert_eq!(db.stock(&scarce).await, 1);
    assert!(db.store.orders_for_customer(customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_products_become_one_order_line() {
    let Some(db) = TestDb::connect().await else { return };
    let bike = db.product(10).await;
    let customer = db.customer().await;

    let placed = db
        .store
        .place_order(order(customer, &[(&bike, 2), (&bike, 3)]))
        .await
        .unwrap();
    assert_eq!(db.stock(&bike).await, 5);

    let details = db.store.order_details(placed.order_id).await.unwrap();
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].quantity, 5);
    assert_eq!(details.order.status, "pending");
    assert!((details.order.total_amount - 5.0 * details.items[0].unit_price).abs() < 0.01);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn orders_in_opposite_item_order_do_not_deadlock() {
    let Some(db) = TestDb::connect().await else { return };
    let first = db.product(1_000).await;
    let second = db.product(1_000).await;
    let customer = db.customer().await;

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let store = db.store.clone();
            let items = if i % 2 == 0 {
                [(first.clone(), 1), (second.clone(), 1)]
            } else {
                [(second.clone(), 1), (first.clone(), 1)]
            };
            tokio::spawn(async move {
                let items: Vec<(&str, u32)> = items.iter().map(|(id, q)| (id.as_str(), *q)).collect();
                store.place_order(order(customer, &items)).await.map(|_| ())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(db.stock(&first).await, 900);
    assert_eq!(db.stock(&second).await, 900);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let Some(db) = TestDb::connect().await else { return };
    let bike = db.product(10).await;
    let customer = db.customer().await;

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let store = db.store.clone();
            let bike = bike.clone();
            tokio::spawn(async move { store.place_order(order(customer, &[(&bike, 1)])).await })
        })
        .collect();

    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert_eq!(err.status(), StatusCode::CONFLICT),
        }
    }
    assert_eq!(placed, 10);
    let level = db.store.stock_level(&bike).await.unwrap();
    assert_eq!(level.quantity, 0);
    assert!(!level.in_stock);
}

#[tokio::test]
async fn status_changes_follow_the_transition_table() {
    let Some(db) = TestDb::connect().await else { return };
    let bike = db.product(5).await;
    let customer = db.customer().await;
    let placed = db
        .store
        .place_order(order(customer, &[(&bike, 1)]))
        .await
        .unwrap();

    let err = db
        .store
        .update_order_status(placed.order_id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let updated = db
        .store
        .update_order_status(placed.order_id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(updated.status, "processing");
}

#[tokio::test]
async fn cart_adds_sum_and_respect_the_line_cap() {
    let Some(db) = TestDb::connect().await else { return };
    let bike = db.product(5).await;
    let session = Uuid::new_v4().to_string();

    db.store.add_to_cart(&session, &bike, 2, None).await.unwrap();
    db.store.add_to_cart(&session, &bike, 3, None).await.unwrap();
    let cart = db.store.cart(&session).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 5);

    db.store.add_to_cart(&session, &bike, 9_995, None).await.unwrap();
    let err = db
        .store
        .add_to_cart(&session, &bike, 1, None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db.store.cart(&session).await.unwrap()[0].quantity, 10_000);

    assert_eq!(db.store.clear_cart(&session).await.unwrap(), 1);
    assert!(db.store.cart(&session).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reviews_keep_an_exact_running_average() {
    let Some(db) = TestDb::connect().await else { return };
    let bike = db.product(5).await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let store = db.store.clone();
            let bike = bike.clone();
            let score = if i % 2 == 0 { 5 } else { 3 };
            tokio::spawn(async move { store.add_review(&bike, None, score, None).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let product = db.store.product(&bike).await.unwrap();
    assert_eq!(product.review_count, 20);
    assert!((product.rating - 4.0).abs() < 1e-9);
    assert_eq!(db.store.reviews_for_product(&bike).await.unwrap().len(), 20);
}

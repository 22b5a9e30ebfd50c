use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::query::{CategoryStats, PriceRange};
use shared::{NewCustomer, OrderStatus, Product, ProductFilter, ProductQuery, SortDirection, SortKey};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{AuthKeys, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{CartItemView, OrderView, Review, UserProfile};
use crate::store::{OrderDetails, OrderPlaced, PlaceOrder, Registration, StockLevel, Storefront};

const DEFAULT_LIMIT: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub store: Storefront,
    pub auth: Arc<AuthKeys>,
}

impl FromRef<AppState> for Arc<AuthKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub total_amount: f64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Query string of `GET /api/products/filter`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock: Option<bool>,
    pub min_rating: Option<f64>,
    pub min_reviews: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl FilterParams {
    pub fn into_query(self) -> Result<ProductQuery, ApiError> {
        let mut filter = ProductFilter::default();
        if let Some(category) = self.category {
            filter = filter.category(category);
        }
        if let Some(price) = self.min_price {
            filter = filter.min_price(price);
        }
        if let Some(price) = self.max_price {
            filter = filter.max_price(price);
        }
        if let Some(in_stock) = self.in_stock {
            filter = filter.in_stock(in_stock);
        }
        if let Some(rating) = self.min_rating {
            filter = filter.min_rating(rating);
        }
        if let Some(reviews) = self.min_reviews {
            filter = filter.min_reviews(reviews);
        }

        let direction = match self.direction.as_deref() {
            Some(direction) => direction.parse::<SortDirection>()?,
            None => SortDirection::Asc,
        };
        let sort = self.sort.map(|key| {
            let key: SortKey = match key.parse() {
                Ok(key) => key,
                Err(never) => match never {},
            };
            (key, direction)
        });

        Ok(ProductQuery {
            text: self.q,
            filter,
            sort,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub session_id: String,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub product_id: String,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub rating: i32,
    #[serde(default)]
    pub review_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserProfile,
}

pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/products", get(list_products))
        .route("/api/products/filter", get(filter_products))
        .route("/api/products/top-rated", get(top_rated))
        .route("/api/products/most-reviewed", get(most_reviewed))
        .route("/api/products/stats/categories", get(category_stats))
        .route("/api/products/stats/price-range", get(price_range))
        .route("/api/products/category/:category", get(products_by_category))
        .route("/api/products/search/:query", get(search_products))
        .route("/api/products/:id", get(get_product))
        .route("/api/customers", post(create_customer))
        .route("/api/customers/:email", get(get_customer))
        .route("/api/orders", post(create_order))
        .route("/api/orders/customer/:customer_id", get(customer_orders))
        .route("/api/orders/:id/details", get(order_details))
        .route("/api/orders/:id/status", put(update_order_status))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/:session_id", get(get_cart).delete(clear_cart))
        .route("/api/cart/:session_id/:product_id", delete(remove_from_cart))
        .route("/api/reviews", post(add_review))
        .route("/api/reviews/product/:product_id", get(product_reviews))
        .route("/api/inventory/:product_id", get(stock_level))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/logout", post(logout))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.products().await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.store.product(&id).await?))
}

async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.products_in_category(&category).await?))
}

async fn search_products(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.search(&query).await?))
}

async fn filter_products(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let query = params.into_query()?;
    Ok(Json(state.store.query(&query).await?))
}

async fn top_rated(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.top_rated(limit).await?))
}

async fn most_reviewed(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.most_reviewed(limit).await?))
}

async fn category_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, CategoryStats>>> {
    Ok(Json(state.store.category_stats().await?))
}

async fn price_range(State(state): State<AppState>) -> ApiResult<Json<PriceRange>> {
    Ok(Json(state.store.price_range().await?))
}

async fn stock_level(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<StockLevel>> {
    Ok(Json(state.store.stock_level(&product_id).await?))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<NewCustomer>,
) -> ApiResult<Json<CreatedResponse>> {
    let customer = state.store.create_customer(request).await?;
    Ok(Json(CreatedResponse {
        id: customer.id,
        message: "Customer created successfully".to_string(),
    }))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<crate::models::DbCustomer>> {
    Ok(Json(state.store.customer_by_email(&email).await?))
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrder>,
) -> ApiResult<Json<CreateOrderResponse>> {
    let OrderPlaced {
        order_id,
        total_amount,
    } = state.store.place_order(request).await?;
    Ok(Json(CreateOrderResponse {
        order_id,
        total_amount,
        message: "Order created successfully".to_string(),
    }))
}

async fn customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<Vec<OrderView>>> {
    Ok(Json(state.store.orders_for_customer(customer_id).await?))
}

async fn order_details(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(state.store.order_details(order_id).await?))
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let next: OrderStatus = request.status.parse()?;
    state.store.update_order_status(order_id, next).await?;
    Ok(MessageResponse::new("Order status updated successfully"))
}

async fn add_to_cart(
    State(state): State<AppState>,
    Json(request): Json<AddToCartRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .store
        .add_to_cart(
            &request.session_id,
            &request.product_id,
            request.quantity,
            request.customer_id,
        )
        .await?;
    Ok(MessageResponse::new("Item added to cart"))
}

async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<CartItemView>>> {
    Ok(Json(state.store.cart(&session_id).await?))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    Path((session_id, product_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state.store.remove_from_cart(&session_id, &product_id).await?;
    Ok(MessageResponse::new("Item removed from cart"))
}

async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.store.clear_cart(&session_id).await?;
    Ok(MessageResponse::new("Cart cleared"))
}

async fn add_review(
    State(state): State<AppState>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let id = state
        .store
        .add_review(
            &request.product_id,
            request.customer_id,
            request.rating,
            request.review_text,
        )
        .await?;
    Ok(Json(CreatedResponse {
        id,
        message: "Review added successfully".to_string(),
    }))
}

async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.store.reviews_for_product(&product_id).await?))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<Registration>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let user = state.store.register_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.store.authenticate(&request.email, &request.password).await?;
    let token = state.auth.issue(&user)?;
    tracing::info!("User {} logged in", user.id);
    Ok(Json(LoginResponse { token, user }))
}

async fn verify(AuthUser(claims): AuthUser) -> ApiResult<Json<VerifyResponse>> {
    let id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| shared::ShopError::Forbidden("invalid or expired token".to_string()))?;
    Ok(Json(VerifyResponse {
        valid: true,
        user: UserProfile {
            id,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
        },
    }))
}

/// Tokens are stateless; logging out only tells the client to drop its copy.
async fn logout() -> Json<MessageResponse> {
    MessageResponse::new("Logged out successfully")
}

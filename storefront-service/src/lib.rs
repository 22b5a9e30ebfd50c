pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod outbox;
pub mod schema;
pub mod store;

//! HTTP surface: routes, errors and middleware

pub mod middleware;
pub mod routes;

pub use routes::{build_router, AppError};

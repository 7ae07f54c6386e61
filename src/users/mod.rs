mod dto;
pub mod form;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::User;

pub fn router() -> Router<AppState> {
    Router::new().nest("/user", handlers::user_routes())
}

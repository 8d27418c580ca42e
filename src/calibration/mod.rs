pub mod category;
pub mod handlers;
pub mod normalize;
pub mod ranges;
pub mod runner;
pub mod scoring;
pub mod units;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}

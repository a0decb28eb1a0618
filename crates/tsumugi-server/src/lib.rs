pub mod error;
pub mod redis_cache;
pub mod routes;
pub mod state;

pub use routes::app;
pub use state::AppState;

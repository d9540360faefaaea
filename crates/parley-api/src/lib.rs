pub mod error;
pub mod health;
pub mod messages;

use std::sync::Arc;

use parley_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    /// Cap on how many messages `GET /api/messages` returns
    pub history_limit: u32,
}

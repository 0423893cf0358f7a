use ndsom_core::MarketCalendar;
use ndsom_db::Database;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    /// Calendar used to bucket rows into trading days.
    pub calendar: MarketCalendar,
}

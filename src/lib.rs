// Dropping Area Logistics Tracker - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod items; // Drop item model + lenient money parsing
pub mod store; // Item Store Adapter (SQLite, batched writes, snapshots)
pub mod session; // Session / Role Resolver
pub mod auth; // Logins and seller account management
pub mod view; // Item View Engine (filter / sort / paginate)
pub mod balance; // Balance Aggregator (who is owed what)
pub mod cashout; // Cash-Out Workflow (chunked batched payout)
pub mod export; // Mass delete + CSV export

// Re-export commonly used types
pub use items::{
    parse_lenient_decimal, DropItem, FieldError, ItemStatus, NewItem, ADMIN_PIN, APP_NAME,
    DEFAULT_TOWN, PICKUP_TOWNS,
};
pub use store::{
    apply_status_change, setup_database, BatchOp, Event, ItemPatch, ItemStore, SellerStore,
    SnapshotListener, SqliteStore, MAX_BATCH_OPS,
};
pub use session::{FileSessionStore, MemorySessionStore, Role, Session, SessionStore};
pub use auth::{hash_password, seller_id_from_name, AuthError, AuthService, SellerAccount};
pub use view::{
    compute_stats, compute_view, ItemView, SortKey, SortOrder, Stats, StatusFilter, ViewFilters,
    DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};
pub use balance::{
    compute_balances, BalanceBrowser, BalancePage, SellerBalance, BALANCE_PAGE_SIZE,
};
pub use cashout::{CashOutEngine, CashOutError, CashOutOutcome, CASH_OUT_CHUNK_SIZE};
pub use export::{
    export_filename, export_selected, format_short_date, mass_delete, MassDeleteError,
    CSV_HEADERS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

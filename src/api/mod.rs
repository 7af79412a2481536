pub mod handlers;

pub use handlers::{health_check, learn_names, reconcile, reconcile_batch, reconcile_csv, AppState};

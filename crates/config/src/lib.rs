pub mod env;
pub mod sync;
pub mod tracing_init;

pub use env::AppConfig;
pub use sync::{load_all, SyncConfig};
pub use tracing_init::init_tracing;

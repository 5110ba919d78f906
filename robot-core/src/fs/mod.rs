pub mod instrument_loader;
pub mod paths;
pub mod persistence;

pub use instrument_loader::{load_instrument_db, save_instrument_db};
pub use paths::PathManager;
pub use persistence::{load_state, load_state_opt, save_state};

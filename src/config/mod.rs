pub mod load;
pub mod save;
pub mod types;

pub use types::{Config, FilterDefinition, MAX_RECENT_PATHS, Preset, UserSettings};

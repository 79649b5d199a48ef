pub mod errors;
pub mod loader;
pub mod schema;

pub use errors::{ConfigError, ValidationError, ValidationIssue};
pub use loader::{load_from_path, load_from_str};
pub use schema::{
    EngineConfig, LocalizationConfig, RepairConfig, SkeletonConfig, MAX_CONTEXT_WINDOW,
};

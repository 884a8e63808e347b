mod env_overrides;
mod loader;
pub mod schema;

pub use schema::{
    Config, DatabaseConfig, ExtensionConfig, GenerationConfig, IdentityConfig, ServerConfig,
    SessionEntry,
};

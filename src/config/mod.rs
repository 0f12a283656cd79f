//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → RegistryBuilder (timeouts, server settings, cookie policy)
//!
//! At runtime:
//!     AuctionRegistry::update_server(ServerConfig)
//!     → atomic swap of the server settings
//!     → connectors created afterwards observe the new host/account
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Timeouts are configured in milliseconds; the adaptive timeout starts
//!   from `timeouts.default_ms`

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ClientConfig;
pub use schema::CookieConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServerConfig;
pub use schema::TimeoutConfig;

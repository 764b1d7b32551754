//! Application settings and self-configuration.
//!
//! # Data Flow
//! ```text
//! ApplicationBuilder setters
//!     → AppSettings (snapshot taken by build())
//!     → file_listener.rs (TOML files join the environment)
//!     → binding.rs (liftoff.main.* → new AppSettings)
//!     → validation.rs (semantic checks)
//!     → consumed read-only by the rest of the run
//! ```
//!
//! # Design Decisions
//! - Bindable settings live in `MainSettings`, code-only collaborators in
//!   `AppSettings`
//! - All fields have defaults to allow a minimal builder
//! - Binding produces a new snapshot instead of mutating the original

pub mod binding;
pub mod file_listener;
pub mod loader;
pub mod schema;
pub mod validation;

pub use binding::{bind_main_settings, BindError, Binding, MAIN_BINDINGS, MAIN_PREFIX};
pub use file_listener::ConfigFileListener;
pub use loader::{load_config_source, parse_properties, ConfigError};
pub use schema::{AppSettings, BannerMode, MainSettings};
pub use validation::{validate_settings, ValidationError, ValidationErrors};

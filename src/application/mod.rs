//! Application orchestration.
//!
//! # Data Flow
//! ```text
//! ApplicationBuilder (builder.rs)
//!     → build(): deduce deployment type (deployment.rs), discover extensions
//!     → Application::run (orchestrator.rs)
//!         → parsed arguments (arguments.rs)
//!         → banner (banner.rs), startup log lines (startup_info.rs)
//! ```

pub mod arguments;
pub mod banner;
pub mod builder;
pub mod deployment;
pub mod orchestrator;
pub mod startup_info;

pub use arguments::{ApplicationArguments, ArgumentError};
pub use banner::{print_banner, Banner, DefaultBanner};
pub use builder::ApplicationBuilder;
pub use deployment::{Classpath, DeploymentType};
pub use orchestrator::{
    headless_flag, run_with, Application, APPLICATION_ARGUMENTS_NAME, BANNER_NAME, HEADLESS_VAR,
    NAME_GENERATOR_NAME,
};

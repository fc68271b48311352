//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod health;
pub mod query;

pub use health::run as health_run;
pub use query::{run as query_run, QueryArgs};

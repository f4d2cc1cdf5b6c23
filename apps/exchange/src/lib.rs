//! One point-to-point exchange: put a text message on a queue, get one back,
//! and map the result to a console report and an exit status.
pub mod cli;
pub mod config;
pub mod report;
pub mod runner;

pub use cli::Cli;
pub use config::{ExchangeConfig, ProviderKind};
pub use report::Console;
pub use runner::ExchangeRunner;

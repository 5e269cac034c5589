mod args;
mod commands;
mod handlers;
pub mod output;

pub use args::{Cli, Commands, ConfigCommand};
pub use commands::run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "elog")]
#[command(about = "Inspect the aggregates and events of an event-sourced application", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration directory (defaults to $ELOG_PATH, then the user config directory)
    #[arg(long, global = true)]
    pub config_dir: Option<String>,

    /// Profile to use instead of the default one
    #[arg(long, short, global = true)]
    pub profile: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List the aggregates found in the binaries")]
    Aggregates,

    #[command(about = "List the entities of an aggregate with their event counts")]
    Entities { aggregate: String },

    #[command(about = "Show the event history of one entity")]
    History {
        aggregate: String,

        /// Entity id, or a unique prefix of it
        entity: String,

        /// Show only this event (numbered from 0) with its payload
        #[arg(long)]
        event: Option<usize>,
    },

    #[command(about = "List event types, or show how often one was applied")]
    Events {
        /// Event type name
        #[arg(long)]
        name: Option<String>,
    },

    #[command(about = "Follow new events of an aggregate until interrupted")]
    Watch { aggregate: String },

    #[command(about = "Manage configuration profiles")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Create or replace a profile")]
    Init {
        #[arg(long, default_value = "default")]
        name: String,

        /// Folder holding the application binaries
        #[arg(long)]
        binaries_path: PathBuf,

        #[arg(long, default_value = "localhost")]
        server: String,

        #[arg(long, default_value_t = 27017)]
        port: u16,

        /// Event store database name
        #[arg(long)]
        database: String,

        /// Make this the default profile
        #[arg(long)]
        make_default: bool,

        /// Replace an existing profile with the same name
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Show the configured profiles")]
    Show,
}

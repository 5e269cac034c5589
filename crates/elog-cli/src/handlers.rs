use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, bail};
use elog_runtime::{Config, Profile, Runtime};
use serde::Serialize;

use crate::args::{Commands, ConfigCommand};
use crate::output;

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, value)?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", text(value))?;
    }
    Ok(())
}

pub async fn query(runtime: &Runtime, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Aggregates => {
            let aggregates = runtime.aggregates().await?;
            emit(json, &aggregates, |a| output::aggregates(a))
        }

        Commands::Entities { aggregate } => {
            let entities = runtime.entities(&aggregate).await?;
            emit(json, &entities, |e| output::entities(&aggregate, e))
        }

        Commands::History {
            aggregate,
            entity,
            event: Some(index),
        } => {
            let entry = runtime.history_entry(&aggregate, &entity, index).await?;
            emit(json, &entry, output::history_entry)
        }

        Commands::History {
            aggregate,
            entity,
            event: None,
        } => {
            let history = runtime.history(&aggregate, &entity).await?;
            emit(json, &history, |h| output::history(&entity, h))
        }

        Commands::Events { name: None } => {
            let events = runtime.event_types().await?;
            emit(json, &events, |e| output::event_types(e))
        }

        Commands::Events { name: Some(name) } => {
            let report = runtime.event_usage(&name).await?;
            emit(json, &report, |r| output::event_usage(&name, r.as_ref()))
        }

        Commands::Watch { aggregate } => {
            if !json {
                eprintln!("Watching {} events, press Ctrl+C to stop", aggregate);
            }
            let mut failed = None;
            let forwarded = runtime
                .watch(&aggregate, |fired| {
                    if failed.is_some() {
                        return;
                    }
                    if let Err(err) = emit_line(json, &fired) {
                        failed = Some(err);
                        runtime.cancel_token().cancel();
                    }
                })
                .await?;
            if !json {
                eprintln!("Stopped after {} events", forwarded);
            }
            match failed {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        Commands::Config { .. } => bail!("config commands run without a profile"),
    }
}

/// One fired event per line, so output can be piped while the watch runs
fn emit_line(json: bool, fired: &elog_types::EventFired) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, fired)?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{}", output::fired(fired))?;
    }
    stdout.flush()?;
    Ok(())
}

pub fn config(command: ConfigCommand, config_path: &PathBuf, json: bool) -> Result<()> {
    match command {
        ConfigCommand::Init {
            name,
            binaries_path,
            server,
            port,
            database,
            make_default,
            force,
        } => {
            let mut config = Config::load_from(config_path)?;
            if config.profiles.contains_key(&name) && !force {
                bail!(
                    "Profile '{}' already exists in {} (use --force to replace it)",
                    name,
                    config_path.display()
                );
            }

            let mut profile = Profile::new(binaries_path, server, database);
            profile.store.port = port;
            config.set_profile(name.clone(), profile);
            if make_default {
                config.default_profile = Some(name.clone());
            }
            config.save_to(config_path)?;

            if !json {
                println!("Saved profile '{}' to {}", name, config_path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let config = Config::load_from(config_path)?;
            emit(json, &config, |c| output::config(config_path, c))
        }
    }
}

// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlor: real-time chat delivery.
//!
//! This is the main binary entry point. It parses CLI arguments, loads and
//! validates configuration, then dispatches to the selected command.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parlor_config::{ParlorConfig, load_and_validate, load_and_validate_path, render_errors};

/// Parlor - real-time chat delivery service.
#[derive(Parser, Debug)]
#[command(name = "parlor", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the chat gateway (WebSocket + REST).
    Serve,
    /// Validate configuration and print the resolved settings.
    CheckConfig,
    /// Reclaim expired recency-cache entries once and exit.
    Sweep,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::CheckConfig => {
            print_summary(&config);
            Ok(())
        }
        Commands::Sweep => sweep::run_sweep(config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load(
    path: Option<&std::path::Path>,
) -> Result<ParlorConfig, Vec<parlor_config::ConfigError>> {
    match path {
        Some(path) => load_and_validate_path(path),
        None => load_and_validate(),
    }
}

fn print_summary(config: &ParlorConfig) {
    println!("parlor: configuration OK");
    println!("  listen:   {}:{}", config.server.host, config.server.port);
    println!("  database: {}", config.storage.database_path);
    println!(
        "  cache:    {:?} (ttl {}s, {} entries)",
        config.cache.backend, config.cache.ttl_secs, config.cache.max_entries
    );
    println!(
        "  bus:      {:?} (prefix {:?})",
        config.bus.backend, config.bus.channel_prefix
    );
    if let Some(room) = &config.rooms.general_room {
        println!("  general:  {room}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["parlor"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_each_subcommand() {
        let cli = Cli::try_parse_from(["parlor", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));

        let cli = Cli::try_parse_from(["parlor", "check-config"]).unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));

        let cli = Cli::try_parse_from(["parlor", "sweep"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Sweep));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["parlor", "sweep", "--config", "/tmp/p.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["parlor", "migrate"]).is_err());
    }

    #[test]
    fn explicit_path_loads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn unknown_key_in_explicit_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        std::fs::write(&path, "[server]\nprot = 9100\n").unwrap();

        let errors = load(Some(&path)).unwrap_err();
        assert!(!errors.is_empty());
    }
}

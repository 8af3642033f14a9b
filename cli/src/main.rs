mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use canopy_core::format::Flavor;

#[derive(Parser)]
#[command(name = "canopy", about = "Inspect, convert and migrate canopy outlines")]
struct Cli {
    /// Outline save file
    #[arg(long, short, global = true, default_value = "canopy.json")]
    file: PathBuf,
    /// Engine configuration
    #[arg(long, global = true, default_value = "canopy.toml")]
    config: PathBuf,
    /// Settings database
    #[arg(long, global = true, default_value = "canopy.db")]
    settings: PathBuf,
    /// More log output; repeat for trace level
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the save file (with demo content), config and settings store
    Init,
    /// Report integrity violations
    Check,
    /// Rewrite an older save file in the current format
    Migrate {
        /// Copy the file aside before rewriting it
        #[arg(long)]
        backup: bool,
    },
    /// Print the outline as a tree
    Dump {
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a subtree as a markdown outline
    Export {
        /// Node to export; the root by default
        #[arg(long)]
        node: Option<String>,
        /// Markdown dialect; the configured one by default
        #[arg(long)]
        flavor: Option<Flavor>,
    },
    /// Import a Logseq page or a whole Logseq graph directory
    ImportLogseq {
        path: PathBuf,
        /// Node to import under; the root by default
        #[arg(long)]
        under: Option<String>,
    },
    /// Convert a Tana JSON export into a new save file
    ImportTana {
        path: PathBuf,
        /// Overwrite an existing save file
        #[arg(long)]
        force: bool,
    },
    /// Read and write the settings store
    Setting {
        #[command(subcommand)]
        action: SettingAction,
    },
}

#[derive(Subcommand)]
enum SettingAction {
    /// Print one setting
    Get { key: String },
    /// Store a setting; the value is JSON, or a plain string otherwise
    Set { key: String, value: String },
    /// Remove a setting
    Delete { key: String },
    /// Print all settings
    List,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = commands::Paths {
        file: cli.file,
        config: cli.config,
        settings: cli.settings,
    };

    match cli.command {
        Command::Init => commands::init(&paths),
        Command::Check => commands::check(&paths),
        Command::Migrate { backup } => commands::migrate(&paths, backup),
        Command::Dump { json } => commands::dump(&paths, json),
        Command::Export { node, flavor } => commands::export(&paths, node.as_deref(), flavor),
        Command::ImportLogseq { path, under } => commands::import_logseq(&paths, &path, under.as_deref()),
        Command::ImportTana { path, force } => commands::import_tana(&paths, &path, force),
        Command::Setting { action } => match action {
            SettingAction::Get { key } => commands::setting_get(&paths, &key),
            SettingAction::Set { key, value } => commands::setting_set(&paths, &key, &value),
            SettingAction::Delete { key } => commands::setting_delete(&paths, &key),
            SettingAction::List => commands::setting_list(&paths),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_accepts_flavor() {
        let cli = Cli::try_parse_from(["canopy", "export", "--flavor", "obsidian", "--node", "n1"])
            .expect("export should parse");
        match cli.command {
            Command::Export { node, flavor } => {
                assert_eq!(node.as_deref(), Some("n1"));
                assert_eq!(flavor, Some(Flavor::Obsidian));
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["canopy", "dump", "--json", "--file", "x.json", "-vv"])
            .expect("dump should parse");
        assert_eq!(cli.file, PathBuf::from("x.json"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn unknown_flavor_is_rejected() {
        assert!(Cli::try_parse_from(["canopy", "export", "--flavor", "org"]).is_err());
    }
}

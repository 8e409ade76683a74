//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "alter",
    about = "Content-addressed incremental machine provisioning",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Directory holding the declaration (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Declaration file (defaults to machine.toml in the root directory)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Machine to provision (overrides ALTER_MACHINE and the declaration)
    #[arg(short, long, global = true)]
    pub machine: Option<String>,

    /// Snapshot file (defaults to the user cache directory)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply everything that changed since the last run
    Provision(ProvisionOpts),
    /// Remove the links the machine declares and forget its snapshot
    Clean(CleanOpts),
    /// Print version information
    Version,
}

/// Options for the `provision` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ProvisionOpts {
    /// Run only these tasks (and their dependencies)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Create missing parent directories of link destinations
    #[arg(long)]
    pub parents: bool,

    /// Replace real files and directories at link destinations
    #[arg(long)]
    pub clobber: bool,

    /// Do not create links
    #[arg(long)]
    pub no_links: bool,

    /// Do not run commands
    #[arg(long)]
    pub no_commands: bool,
}

/// Options for the `clean` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct CleanOpts {
    /// Clean only these tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_provision_defaults() {
        let cli = Cli::parse_from(["alter", "provision"]);
        assert!(!cli.global.dry_run);
        assert!(cli.global.machine.is_none());
        let Command::Provision(opts) = cli.command else {
            panic!("expected provision");
        };
        assert!(opts.only.is_empty());
        assert!(!opts.parents && !opts.clobber && !opts.no_links && !opts.no_commands);
    }

    #[test]
    fn parse_provision_only_tasks() {
        let cli = Cli::parse_from(["alter", "provision", "--only", "shell,vim"]);
        let Command::Provision(opts) = cli.command else {
            panic!("expected provision");
        };
        assert_eq!(opts.only, vec!["shell", "vim"]);
    }

    #[test]
    fn parse_provision_flags() {
        let cli = Cli::parse_from([
            "alter",
            "provision",
            "--parents",
            "--clobber",
            "--no-links",
            "--no-commands",
        ]);
        let Command::Provision(opts) = cli.command else {
            panic!("expected provision");
        };
        assert!(opts.parents && opts.clobber && opts.no_links && opts.no_commands);
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "alter",
            "clean",
            "--machine",
            "laptop",
            "--root",
            "/tmp/dots",
            "--snapshot",
            "/tmp/snap.json",
            "-d",
        ]);
        assert_eq!(cli.global.machine.as_deref(), Some("laptop"));
        assert_eq!(cli.global.root, Some(PathBuf::from("/tmp/dots")));
        assert_eq!(cli.global.snapshot, Some(PathBuf::from("/tmp/snap.json")));
        assert!(cli.global.dry_run);
        assert!(matches!(cli.command, Command::Clean(_)));
    }

    #[test]
    fn parse_file_short() {
        let cli = Cli::parse_from(["alter", "-f", "other.toml", "provision"]);
        assert_eq!(cli.global.file, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["alter", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["alter", "-v", "provision"]);
        assert!(cli.verbose);
    }
}

//! # Krystal CLI Module
//!
//! This module implements the CLI interface for Krystal.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show network status
//! - `load` - Replace the network from a JSON file
//! - `analyze` - Analyse the stored network or a JSON file
//! - `influence` - Influence score of one entity
//! - `paths` - Connection paths between two entities
//! - `neighbors` - Neighbours of an entity
//! - `export` / `import` - Move networks in and out of the database
//! - `init` - Initialize a new database
//! - `sample` - Load the built-in sample network
//! - `search` / `news` / `trending` / `funding` - Query the data sources
//! - `investigate` - Build a network from a news query
//! - `hash` - BLAKE3 hash of the canonical export
//! - `config` - Print the effective configuration

mod commands;

use crate::config::KrystalConfig;
use clap::{Parser, Subcommand};
use krystal_core::{KrystalError, primitives::DEFAULT_MAX_PATHS};
use std::path::{Path, PathBuf};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Krystal - Power Structure Mapping
///
/// Builds influence networks of corporations, government bodies and
/// officials, and analyses who holds power in them.
#[derive(Parser, Debug)]
#[command(name = "krystal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the network database
    #[arg(short = 'D', long, global = true, default_value = "krystal.db")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "file" (canonical file)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Configuration file (default: krystal.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show network status
    Status,

    /// Replace the network with a JSON document
    Load {
        /// JSON file with `entities` and `relationships`
        #[arg(short, long)]
        file: PathBuf,

        /// Add to the stored network instead of replacing it
        #[arg(short, long)]
        append: bool,
    },

    /// Analyse the stored network, or a JSON file without storing it
    Analyze {
        /// JSON file to analyse instead of the database
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Influence score of one entity
    Influence {
        /// Entity id
        #[arg(short, long)]
        entity: String,
    },

    /// Connection paths between two entities
    Paths {
        /// Start entity id
        #[arg(long)]
        from: String,

        /// End entity id
        #[arg(long)]
        to: String,

        /// Maximum number of paths
        #[arg(short, long, default_value_t = DEFAULT_MAX_PATHS)]
        max: usize,
    },

    /// Neighbours of an entity
    Neighbors {
        /// Entity id
        #[arg(short, long)]
        entity: String,

        /// Only follow relationships of this type
        #[arg(short = 't', long)]
        relationship_type: Option<String>,
    },

    /// Export the network to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, canonical)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Import a network from a canonical or JSON file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Load the built-in sample network
    Sample,

    /// Search LittleSis for entities
    Search {
        /// Search text
        query: String,

        /// Result page
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long, default_value = "20")]
        per_page: u32,
    },

    /// Search news articles
    News {
        /// Search text
        query: String,

        /// Maximum number of articles
        #[arg(short, long, default_value = "10")]
        max: usize,

        /// Article language
        #[arg(short, long, default_value = "en")]
        language: String,
    },

    /// Show trending news topics
    Trending {
        /// News category
        #[arg(long, default_value = "general")]
        category: String,
    },

    /// Campaign funding of a candidate or lobbying totals of an organization
    Funding {
        /// OpenSecrets candidate id
        #[arg(long, conflicts_with = "organization", required_unless_present = "organization")]
        candidate: Option<String>,

        /// OpenSecrets organization id
        #[arg(long)]
        organization: Option<String>,

        /// Election cycle
        #[arg(long, default_value = crate::sources::opensecrets::DEFAULT_CYCLE)]
        cycle: String,
    },

    /// Build and analyse a network from a news query
    Investigate {
        /// Search text
        query: String,
    },

    /// Compute BLAKE3 cryptographic hash of the network
    Hash,

    /// Reclaim unused space in the database
    Compact,

    /// Print the effective configuration (keys masked)
    Config,
}

// =============================================================================
// COMMAND CONTEXT
// =============================================================================

/// Global options shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub database: &'a Path,
    pub backend: &'a str,
    pub json_mode: bool,
    pub config: &'a KrystalConfig,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli, config: KrystalConfig) -> Result<(), KrystalError> {
    let ctx = Context {
        database: &cli.database,
        backend: cli.backend.as_str(),
        json_mode: cli.json_mode,
        config: &config,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(ctx, &host, port).await,
        Some(Commands::Status) | None => cmd_status(ctx),
        Some(Commands::Load { file, append }) => cmd_load(ctx, &file, append),
        Some(Commands::Analyze { file }) => cmd_analyze(ctx, file.as_deref()),
        Some(Commands::Influence { entity }) => cmd_influence(ctx, &entity),
        Some(Commands::Paths { from, to, max }) => cmd_paths(ctx, &from, &to, max),
        Some(Commands::Neighbors {
            entity,
            relationship_type,
        }) => cmd_neighbors(ctx, &entity, relationship_type.as_deref()),
        Some(Commands::Export { output, format }) => cmd_export(ctx, &output, &format),
        Some(Commands::Import { input }) => cmd_import(ctx, &input),
        Some(Commands::Init { force }) => cmd_init(ctx, force),
        Some(Commands::Sample) => cmd_sample(ctx),
        Some(Commands::Search {
            query,
            page,
            per_page,
        }) => cmd_search(ctx, &query, page, per_page).await,
        Some(Commands::News {
            query,
            max,
            language,
        }) => cmd_news(ctx, &query, max, &language).await,
        Some(Commands::Trending { category }) => cmd_trending(ctx, &category).await,
        Some(Commands::Funding {
            candidate,
            organization,
            cycle,
        }) => cmd_funding(ctx, candidate.as_deref(), organization.as_deref(), &cycle).await,
        Some(Commands::Investigate { query }) => cmd_investigate(ctx, &query).await,
        Some(Commands::Hash) => cmd_hash(ctx),
        Some(Commands::Compact) => cmd_compact(ctx),
        Some(Commands::Config) => cmd_config(ctx),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "krystal", "paths", "--from", "a", "--to", "b", "-B", "file", "--json-mode",
        ])
        .expect("parse");

        assert_eq!(cli.backend, "file");
        assert!(cli.json_mode);
        assert!(matches!(
            cli.command,
            Some(Commands::Paths { ref from, ref to, max })
                if from == "a" && to == "b" && max == DEFAULT_MAX_PATHS
        ));
    }

    #[test]
    fn funding_requires_a_target() {
        assert!(Cli::try_parse_from(["krystal", "funding"]).is_err());
        assert!(
            Cli::try_parse_from(["krystal", "funding", "--candidate", "N1", "--organization", "D1"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["krystal", "funding", "--organization", "D1"]).is_ok());
    }

    #[test]
    fn no_subcommand_defaults_to_status() {
        let cli = Cli::try_parse_from(["krystal", "-q"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.database, PathBuf::from("krystal.db"));
    }
}

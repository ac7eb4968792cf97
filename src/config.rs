//! Configuration types for filetree-walker
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Walk configuration with validation
//! - Parsing of the composite `path::org` request token

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Separator between the path and the organize flag in a request token
pub const TOKEN_SEPARATOR: &str = "::";

/// Flag value requesting the organized layout
pub const ORGANIZE_FLAG: &str = "org";

/// Build a JSON tree of a directory using a bounded pool of walker threads
#[derive(Parser, Debug, Clone)]
#[command(
    name = "filetree-walker",
    version,
    about = "Build a JSON tree of a directory using a bounded pool of walker threads",
    long_about = "Walks a local directory with a fixed number of concurrent directory listings \
                  and prints the resulting tree as JSON.\n\n\
                  Hidden entries (names starting with '.') are skipped at every depth.\n\
                  Append '::org' to the path, or pass --organize, to get a flat \
                  dirs/files listing instead of a nested tree.",
    after_help = "EXAMPLES:\n    \
        filetree-walker /srv/data\n    \
        filetree-walker '/srv/data::org' --pretty\n    \
        filetree-walker /srv/data -w 16 --timeout 30 -o tree.json\n    \
        filetree-walker serve --port 8080   # HTTP API (with feature)",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct CliArgs {
    /// Directory to walk, optionally suffixed with '::org'
    #[arg(value_name = "TOKEN")]
    pub token: Option<String>,

    /// Subcommand (serve)
    #[cfg(feature = "server")]
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Return the flat dirs/files layout
    #[arg(long)]
    pub organize: bool,

    /// Maximum number of concurrent directory listings
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Abort the walk after this many seconds, keeping the partial tree
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Write JSON to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long)]
    pub pretty: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-entry errors and worker activity)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Subcommands
#[cfg(feature = "server")]
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve file trees over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, env = "FILETREE_PORT", default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,

        /// Maximum number of concurrent directory listings per request
        #[arg(short = 'w', long, default_value_t = default_workers(), value_name = "NUM")]
        workers: usize,

        /// Per-request walk timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Verbose output
        #[arg(short = 'v', long)]
        verbose: bool,
    },
}

fn default_workers() -> usize {
    // Directory listings are blocking I/O; one per core
    num_cpus::get()
}

/// A decoded tree request: which path, and in which layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRequest {
    pub path: String,
    pub organize: bool,
}

impl TreeRequest {
    /// Parse a composite token.
    ///
    /// Accepts:
    /// - `path` → nested tree
    /// - `path::org` → organized layout
    ///
    /// Any other suffix, or more than one separator, yields the first
    /// segment with the nested layout.
    pub fn parse(token: &str) -> Self {
        let parts: Vec<&str> = token.split(TOKEN_SEPARATOR).collect();
        let path = parts[0].to_string();
        let organize = parts.len() == 2 && parts[1] == ORGANIZE_FLAG;
        Self { path, organize }
    }
}

/// Validated walk configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkConfig {
    /// Number of worker threads, and so of concurrent directory listings
    pub concurrency: usize,

    /// Deadline for the whole walk
    pub timeout: Option<Duration>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_workers(),
            timeout: None,
        }
    }
}

impl WalkConfig {
    /// Create and validate a walk configuration
    pub fn new(concurrency: usize, timeout_secs: Option<u64>) -> Result<Self, ConfigError> {
        let config = Self {
            concurrency,
            timeout: timeout_secs.map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check worker count and timeout bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.concurrency,
                max: MAX_WORKERS,
            });
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout {
                    secs: timeout.as_secs(),
                });
            }
        }

        Ok(())
    }
}

/// Validated configuration for a single CLI walk
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory to walk
    pub root: String,

    /// Return the organized layout
    pub organize: bool,

    /// Walk settings
    pub walk: WalkConfig,

    /// JSON destination (stdout if unset)
    pub output: Option<PathBuf>,

    /// Pretty-print JSON
    pub pretty: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl RunConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let token = args.token.as_deref().ok_or(ConfigError::MissingToken)?;
        let request = TreeRequest::parse(token);
        let walk = WalkConfig::new(args.workers, args.timeout)?;

        Ok(Self {
            root: request.path,
            organize: request.organize || args.organize,
            walk,
            output: args.output,
            pretty: args.pretty,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(token: &str) -> CliArgs {
        CliArgs::parse_from(["filetree-walker", token])
    }

    #[test]
    fn test_parse_token_plain() {
        let req = TreeRequest::parse("/srv/data");
        assert_eq!(req.path, "/srv/data");
        assert!(!req.organize);
    }

    #[test]
    fn test_parse_token_organize() {
        let req = TreeRequest::parse("/srv/data::org");
        assert_eq!(req.path, "/srv/data");
        assert!(req.organize);
    }

    #[test]
    fn test_parse_token_unknown_flag() {
        let req = TreeRequest::parse("/srv/data::flat");
        assert_eq!(req.path, "/srv/data");
        assert!(!req.organize);

        let req = TreeRequest::parse("/a::org::org");
        assert_eq!(req.path, "/a");
        assert!(!req.organize);
    }

    #[test]
    fn test_walk_config_validation() {
        assert!(WalkConfig::new(4, None).is_ok());
        assert!(matches!(
            WalkConfig::new(0, None),
            Err(ConfigError::InvalidWorkerCount { count: 0, .. })
        ));
        assert!(WalkConfig::new(MAX_WORKERS + 1, None).is_err());
        assert!(matches!(
            WalkConfig::new(4, Some(0)),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert_eq!(
            WalkConfig::new(2, Some(5)).unwrap().timeout,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_default_walk_config() {
        let config = WalkConfig::default();
        assert!(config.concurrency >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_config_from_args() {
        let config = RunConfig::from_args(args("/srv/data::org")).unwrap();
        assert_eq!(config.root, "/srv/data");
        assert!(config.organize);
        assert!(config.show_progress);

        let cli = CliArgs::parse_from(["filetree-walker", "/srv", "--organize", "-w", "2", "-q"]);
        let config = RunConfig::from_args(cli).unwrap();
        assert!(config.organize);
        assert_eq!(config.walk.concurrency, 2);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_run_config_requires_token() {
        let cli = CliArgs::parse_from(["filetree-walker"]);
        assert!(matches!(
            RunConfig::from_args(cli),
            Err(ConfigError::MissingToken)
        ));
    }
}

//! Configuration for stacksmith.
//!
//! CLI arguments and environment variable handling using clap. Endpoint
//! paths that drifted across catalog deployments are configuration, not
//! constants, so they can be confirmed against the target instance.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::hierarchy::TemplateScope;

/// Default request timeout for single-shot API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout per page of the paginated document fetch.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for the bulk document submission.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(120);

/// Stacksmith - bulk metadata companion for catalog hubs
#[derive(Parser, Debug, Clone)]
#[command(name = "stacksmith")]
#[command(about = "Generate sheet templates and bulk-create catalog documents")]
pub struct Args {
    /// Path of the JSON connection profile (base URL + tokens)
    #[arg(long, env = "STACKSMITH_PROFILE", default_value = "config.json")]
    pub profile: PathBuf,

    /// Directory for cached API collections
    #[arg(long, env = "STACKSMITH_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Directory for upload audit logs
    #[arg(long, env = "STACKSMITH_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Endpoint path for visual configs (differs between deployments)
    #[arg(long, env = "VISUAL_CONFIG_PATH", default_value = "/integration/visual_config/")]
    pub visual_config_path: String,

    /// Endpoint path for exchanging a refresh token
    #[arg(
        long,
        env = "TOKEN_REFRESH_PATH",
        default_value = "/integration/v1/createAPIAccessToken/"
    )]
    pub token_refresh_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check whether the stored access token is accepted by the API
    CheckToken,

    /// Exchange the refresh token for a new access token and persist it
    RefreshToken,

    /// List document hubs (parentless, template-less documents)
    Hubs {
        /// Skip the local cache and fetch from the API
        #[arg(long)]
        force: bool,
    },

    /// List folders inside a hub
    Folders {
        /// Hub selection: a numeric id or a "{title} (ID: {id})" label
        #[arg(long)]
        hub: String,
    },

    /// List templates compatible with a hub
    Templates {
        #[arg(long)]
        hub: String,

        /// Compatibility strategy: visual-configs (default) or documents
        #[arg(long, value_enum, default_value_t = TemplateScope::VisualConfigs)]
        scope: TemplateScope,

        #[arg(long)]
        force: bool,
    },

    /// Generate a fill-in sheet from a template's field schema
    Generate {
        #[arg(long)]
        hub: String,

        /// Folder id; omit to target the hub root
        #[arg(long)]
        folder: Option<i64>,

        /// Template selection: numeric id or title
        #[arg(long)]
        template: String,

        /// Output path for the sheet data file
        #[arg(long)]
        out: PathBuf,
    },

    /// Upload documents from a filled-in sheet
    Upload {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        hub: String,

        /// Folder id; omit to target the hub root
        #[arg(long)]
        folder: Option<i64>,

        #[arg(long)]
        template: String,

        /// What to do when incoming titles collide with existing documents
        #[arg(long, value_enum, default_value_t = DuplicatePolicy::Cancel)]
        on_duplicate: DuplicatePolicy,
    },

    /// Bulk-create empty placeholder documents
    CreateEmpty {
        #[arg(long)]
        hub: String,

        #[arg(long)]
        folder: Option<i64>,

        /// Template id to stamp onto the placeholders
        #[arg(long)]
        template: Option<i64>,

        /// How many placeholders to create
        #[arg(long)]
        count: usize,

        /// Titles become "{prefix} 1", "{prefix} 2", ...
        #[arg(long, default_value = "Untitled")]
        title_prefix: String,
    },

    /// Mirror a hub's folder structure as a local directory tree
    ExportHub {
        #[arg(long)]
        hub: String,

        /// Base directory the hub tree is created under
        #[arg(long)]
        out_dir: PathBuf,
    },
}

/// Non-interactive answer to the duplicate-resolution question.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Drop duplicate rows and upload the remainder
    Skip,
    /// Upload every row, duplicates included
    All,
    /// Abort the whole upload when duplicates exist
    Cancel,
}

impl Args {
    /// Validate configuration before anything runs.
    pub fn validate(&self) -> Result<(), String> {
        if !self.visual_config_path.starts_with('/') {
            return Err(format!(
                "visual config path must start with '/': {}",
                self.visual_config_path
            ));
        }
        if !self.token_refresh_path.starts_with('/') {
            return Err(format!(
                "token refresh path must start with '/': {}",
                self.token_refresh_path
            ));
        }
        if let Command::CreateEmpty { count, .. } = &self.command {
            if *count == 0 {
                return Err("create-empty needs a count of at least 1".into());
            }
        }
        Ok(())
    }
}

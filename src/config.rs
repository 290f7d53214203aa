use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use crate::extension::AvatarSettings;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub avatar_meta_key: String,
    pub avatar_domain: String,
    pub allow_anonymous_comments: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Comment avatars and RPC custom fields")]
pub struct Args {
    /// Host to bind to (overrides COMMENT_EXTRAS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides COMMENT_EXTRAS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides COMMENT_EXTRAS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Comment metadata key holding the avatar URL (overrides COMMENT_EXTRAS_AVATAR_META_KEY)
    #[arg(long)]
    pub avatar_meta_key: Option<String>,

    /// Trusted image host for avatars (overrides COMMENT_EXTRAS_AVATAR_DOMAIN)
    #[arg(long)]
    pub avatar_domain: Option<String>,

    /// Accept comments from anonymous callers (overrides COMMENT_EXTRAS_ALLOW_ANONYMOUS)
    #[arg(long)]
    pub allow_anonymous: Option<bool>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args)?, migrate))
    }

    /// CLI values win over environment values, which win over defaults.
    pub fn merge(args: Args) -> Result<Self> {
        let defaults = AvatarSettings::default();

        let env_host = env::var("COMMENT_EXTRAS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("COMMENT_EXTRAS_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing COMMENT_EXTRAS_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading COMMENT_EXTRAS_PORT"),
        };
        let env_db = env::var("COMMENT_EXTRAS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/comments.db".into());
        let env_meta_key =
            env::var("COMMENT_EXTRAS_AVATAR_META_KEY").unwrap_or(defaults.meta_key);
        let env_domain =
            env::var("COMMENT_EXTRAS_AVATAR_DOMAIN").unwrap_or(defaults.trusted_domain);
        let env_anonymous = match env::var("COMMENT_EXTRAS_ALLOW_ANONYMOUS") {
            Ok(value) => parse_flag(&value).with_context(|| {
                format!("parsing COMMENT_EXTRAS_ALLOW_ANONYMOUS value `{}`", value)
            })?,
            Err(env::VarError::NotPresent) => true,
            Err(err) => return Err(err).context("reading COMMENT_EXTRAS_ALLOW_ANONYMOUS"),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            avatar_meta_key: args.avatar_meta_key.unwrap_or(env_meta_key),
            avatar_domain: args.avatar_domain.unwrap_or(env_domain),
            allow_anonymous_comments: args.allow_anonymous.unwrap_or(env_anonymous),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn avatar_settings(&self) -> AvatarSettings {
        AvatarSettings {
            meta_key: self.avatar_meta_key.clone(),
            trusted_domain: self.avatar_domain.clone(),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{}`", other),
    }
}

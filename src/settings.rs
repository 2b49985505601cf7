use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::parser::DEFAULT_ORIGIN;

const DEFAULT_DB_PATH: &str = "data/wol.sqlite";
const DEFAULT_USER_AGENT: &str = concat!("wol_study/", env!("CARGO_PKG_VERSION"));

/// What to do when study content for a chapter is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    /// Keep the stored record untouched.
    Skip,
    /// Replace the stored record with the fresh scrape.
    Overwrite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub origin: String,
    pub existing: ExistingPolicy,
    pub concurrency: usize,
    pub user_agent: String,
}

/// Defaults, overridden by `WOL_*` environment variables
/// (`WOL_DB_PATH`, `WOL_ORIGIN`, `WOL_EXISTING`, `WOL_CONCURRENCY`, `WOL_USER_AGENT`).
pub fn load() -> Result<Settings> {
    from_builder(Config::builder().add_source(Environment::with_prefix("WOL").try_parsing(true)))
}

fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings> {
    let settings: Settings = builder
        .set_default("db_path", DEFAULT_DB_PATH)?
        .set_default("origin", DEFAULT_ORIGIN)?
        .set_default("existing", "skip")?
        .set_default("concurrency", 1_i64)?
        .set_default("user_agent", DEFAULT_USER_AGENT)?
        .build()?
        .try_deserialize()
        .context("Invalid WOL_* settings")?;
    Ok(Settings {
        concurrency: settings.concurrency.max(1),
        ..settings
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = from_builder(Config::builder()).unwrap();
        assert_eq!(s.db_path, PathBuf::from("data/wol.sqlite"));
        assert_eq!(s.origin, "https://wol.jw.org");
        assert_eq!(s.existing, ExistingPolicy::Skip);
        assert_eq!(s.concurrency, 1);
        assert!(s.user_agent.starts_with("wol_study/"));
    }

    #[test]
    fn overrides() {
        let builder = Config::builder()
            .set_override("existing", "overwrite")
            .unwrap()
            .set_override("concurrency", 0_i64)
            .unwrap()
            .set_override("origin", "http://localhost:9000")
            .unwrap();
        let s = from_builder(builder).unwrap();
        assert_eq!(s.existing, ExistingPolicy::Overwrite);
        assert_eq!(s.concurrency, 1);
        assert_eq!(s.origin, "http://localhost:9000");
    }

    #[test]
    fn rejects_unknown_policy() {
        let builder = Config::builder().set_override("existing", "merge").unwrap();
        assert!(from_builder(builder).is_err());
    }
}

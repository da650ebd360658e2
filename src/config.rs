//! Operator configuration loaded once at startup from `config.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::RunnerEnv;

/// Relative path of the config file under the working directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Directory holding prebuilt native libraries some PoCs link against.
pub const DEPENDENCIES_DIR: &str = "dependencies";
/// Local working copy of the advisory-database fork.
pub const ADVISORY_DB_DIR: &str = "advisory-db";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub name: String,
    pub email: String,
    pub token: String,
    pub rustsec_fork_url: String,
}

/// Load `config.toml` from `root`. Its absence is fatal.
pub fn load_config(root: &Path) -> Result<Config> {
    let path = root.join(CONFIG_FILE);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("`{}` does not exist", path.display()))?;
    let config: Config = toml::from_str(&text).context("parse config.toml")?;
    Ok(config)
}

/// Build the explicit invocation environment: the native-library search
/// path under `root`, the shared build cache, and warning suppression.
pub fn runner_env(root: &Path) -> Result<RunnerEnv> {
    let link_path = absolute(&root.join(DEPENDENCIES_DIR))?;
    Ok(RunnerEnv {
        link_path,
        rustc_wrapper: Some("sccache".to_string()),
        extra_rustflags: "-A warnings".to_string(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("resolve current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_reads_all_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "name = \"Jane Doe\"\n\
             email = \"jane@example.com\"\n\
             token = \"ghp_secret\"\n\
             rustsec_fork_url = \"https://github.com/jane/advisory-db\"\n",
        )
        .expect("write config");

        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.name, "Jane Doe");
        assert_eq!(config.email, "jane@example.com");
        assert_eq!(config.token, "ghp_secret");
        assert_eq!(config.rustsec_fork_url, "https://github.com/jane/advisory-db");
    }

    #[test]
    fn missing_config_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(load_config(dir.path()).is_err());
    }

    #[test]
    fn runner_env_points_at_the_dependencies_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = runner_env(dir.path()).expect("runner env");
        assert!(env.link_path.is_absolute());
        assert!(env.link_path.ends_with(DEPENDENCIES_DIR));
        assert_eq!(env.rustc_wrapper.as_deref(), Some("sccache"));
        assert_eq!(env.extra_rustflags, "-A warnings");
    }
}

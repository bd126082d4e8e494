pub mod init;
pub mod run;
pub mod schema;

use std::path::Path;

use anyhow::Context;

use crate::config::Config;

/// Load `path` if given, otherwise discover the config from the working
/// directory. Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?.with_env(|key| std::env::var(key).ok())),
        None => {
            let cwd = std::env::current_dir().context("resolving working directory")?;
            Config::discover(&cwd)
        }
    }
}

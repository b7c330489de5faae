use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::config::Seq2SeqConfig;

pub const LOCAL_CONFIG_FILE: &str = "./seqweave.toml";

/// Load configuration with standard priority:
/// explicit path > ./seqweave.toml > ~/.config/seqweave/config.toml > defaults
pub fn load_config(explicit: Option<&Path>) -> Result<Seq2SeqConfig> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }

    if let Some(config) = try_load_from_path(LOCAL_CONFIG_FILE)? {
        return Ok(config);
    }

    if let Some(user_config) = user_config_path() {
        if let Some(config) = try_load_from_path(&user_config)? {
            return Ok(config);
        }
    }

    log::debug!("No config file found, using defaults");
    Ok(Seq2SeqConfig::default())
}

/// Load from a specific path.
pub fn load_config_from_path(path: &Path) -> Result<Seq2SeqConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Seq2SeqConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// `<config_dir>/seqweave/config.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("seqweave").join("config.toml"))
}

fn try_load_from_path(path: impl AsRef<Path>) -> Result<Option<Seq2SeqConfig>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(load_config_from_path(path)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generation]\nmax_steps = 7").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.generation.max_steps, 7);
        assert_eq!(config.embeddings.dims, vec![300]);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generation\nmax_steps = ").unwrap();
        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_try_load_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(try_load_from_path(dir.path().join("absent.toml"))
            .unwrap()
            .is_none());
    }
}

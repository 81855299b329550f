use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The two values remembered between runs. The password is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub email: String,
    pub subdomain: String,
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PreferenceStore { path: path.into() }
    }

    /// `$HOME/.config/timeclock_client/settings.toml`, or `settings.toml` when there is no home.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".config").join("timeclock_client").join("settings.toml"),
            None => PathBuf::from("settings.toml"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Preferences> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Preferences::default()),
            Err(err) => return Err(err).with_context(|| format!("unable to read {}", self.path.display())),
        };

        toml::from_str(&raw).with_context(|| format!("unable to parse {}", self.path.display()))
    }

    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }

        let raw = toml::to_string(preferences).context("unable to serialize preferences")?;
        fs::write(&self.path, raw).with_context(|| format!("unable to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_test() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("nope.toml"));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn save_and_load_test() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested").join("settings.toml"));
        let preferences = Preferences { email: "me@acme.com".to_owned(), subdomain: "acme".to_owned() };

        store.save(&preferences).unwrap();
        assert_eq!(store.load().unwrap(), preferences);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("email = \"me@acme.com\""));
        assert!(!raw.contains("password"));
    }

    #[test]
    fn partial_file_test() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "subdomain = \"acme\"\n").unwrap();
        let loaded = PreferenceStore::new(&path).load().unwrap();
        assert_eq!(loaded.email, "");
        assert_eq!(loaded.subdomain, "acme");
    }

    #[test]
    fn broken_file_test() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "email = ").unwrap();
        assert!(PreferenceStore::new(&path).load().is_err());
    }
}

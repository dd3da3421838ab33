//! File-backed store of tunnel records
//!
//! One `<name>.toml` per tunnel inside an explicitly chosen directory. The
//! store never writes on its own; callers decide when a record is durable.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use super::{load_config, save_config, TunnelConfig};
use crate::error::ConfigError;
use crate::types::sanitize_tunnel_name;

const RECORD_EXTENSION: &str = "toml";

/// Handle on the directory of tunnel records
#[derive(Debug, Clone)]
pub struct TunnelStore {
    dir: PathBuf,
}

impl TunnelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, RECORD_EXTENSION))
    }

    /// Whether a record with this name is stored
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Sorted names of all stored tunnels
    pub fn list_names(&self) -> Result<Vec<String>, ConfigError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load one record; the file name wins over any `name` inside it
    pub fn load(&self, name: &str) -> Result<TunnelConfig, ConfigError> {
        let path = self.path_for(name);
        let mut config: TunnelConfig = match load_config(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                return Err(ConfigError::TunnelNotFound(name.to_string()))
            }
            Err(e) => return Err(e),
        };
        config.name = name.to_string();
        Ok(config)
    }

    /// Load every readable record, skipping (and logging) broken ones
    pub fn load_all(&self) -> Result<Vec<TunnelConfig>, ConfigError> {
        let mut configs = Vec::new();
        for name in self.list_names()? {
            match self.load(&name) {
                Ok(config) => configs.push(config),
                Err(e) => tracing::warn!("Skipping unreadable tunnel record {}: {}", name, e),
            }
        }
        Ok(configs)
    }

    /// Persist a record under its name
    pub fn save(&self, config: &TunnelConfig) -> Result<(), ConfigError> {
        let name = sanitize_tunnel_name(&config.name)?;
        if name != config.name {
            return Err(ConfigError::InvalidName(config.name.clone()));
        }
        save_config(&self.path_for(&name), config)?;
        tracing::info!("Saved tunnel record {}", name);
        Ok(())
    }

    /// Remove a record; returns false if none was stored
    pub fn delete(&self, name: &str) -> Result<bool, ConfigError> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted tunnel record {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ConfigError::io(path, e)),
        }
    }

    /// Build a new, unsaved record for `name`
    ///
    /// The interface index is the smallest one not used by a stored record,
    /// and the default ids are derived from it. Any unreadable record blocks
    /// allocation, since its index may belong to a live interface.
    pub fn allocate(&self, name: &str) -> Result<TunnelConfig, ConfigError> {
        let name = sanitize_tunnel_name(name)?;
        if self.exists(&name) {
            return Err(ConfigError::TunnelExists(name));
        }

        let mut used = BTreeSet::new();
        for stored in self.list_names()? {
            let config = self.load(&stored).map_err(|e| {
                ConfigError::Invalid(format!(
                    "tunnel record '{}' is unreadable, so its interface index is unknown: {}",
                    stored, e
                ))
            })?;
            used.insert(config.interface_index());
        }
        let index = (0..).find(|i| !used.contains(i)).unwrap_or_default();

        tracing::debug!("Allocated interface index {} for {}", index, name);
        Ok(TunnelConfig::new(name, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    fn store() -> (TempDir, TunnelStore) {
        let dir = TempDir::new().unwrap();
        let store = TunnelStore::new(dir.path().join("tunnels"));
        (dir, store)
    }

    #[test]
    fn test_empty_store() {
        let (_dir, store) = store();
        assert!(store.list_names().unwrap().is_empty());
        assert!(!store.exists("edge"));
        assert!(matches!(store.load("edge"), Err(ConfigError::TunnelNotFound(_))));
        assert!(!store.delete("edge").unwrap());
    }

    #[test]
    fn test_allocate_is_not_persisted() {
        let (_dir, store) = store();
        let config = store.allocate("edge").unwrap();
        assert_eq!(config.interface_index(), 0);
        assert!(!store.exists("edge"));
    }

    #[test]
    fn test_sequential_allocation() {
        let (_dir, store) = store();
        let mut indices = Vec::new();
        let mut tunnel_ids = Vec::new();
        for name in ["a", "b", "c"] {
            let config = store.allocate(name).unwrap();
            indices.push(config.interface_index());
            tunnel_ids.push(config.ids.tunnel_id);
            store.save(&config).unwrap();
        }
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(tunnel_ids, vec![1000, 1100, 1200]);
    }

    #[test]
    fn test_allocation_reuses_smallest_free_index() {
        let (_dir, store) = store();
        for name in ["a", "b", "c"] {
            let config = store.allocate(name).unwrap();
            store.save(&config).unwrap();
        }
        assert!(store.delete("b").unwrap());
        assert_eq!(store.allocate("d").unwrap().interface_index(), 1);
    }

    #[test]
    fn test_allocate_refuses_with_unreadable_record() {
        let (dir, store) = store();
        let config = store.allocate("a").unwrap();
        store.save(&config).unwrap();
        std::fs::write(
            dir.path().join("tunnels/b.toml"),
            "name = \"b\"\ninterface_index = \"one\"\n",
        )
        .unwrap();

        // the broken record still hides from listings but not from allocation
        assert_eq!(store.load_all().unwrap().len(), 1);
        let err = store.allocate("c").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_allocate_rejects_existing_name() {
        let (_dir, store) = store();
        let config = store.allocate("Edge").unwrap();
        assert_eq!(config.name, "edge");
        store.save(&config).unwrap();
        assert!(matches!(store.allocate("edge"), Err(ConfigError::TunnelExists(_))));
    }

    #[test]
    fn test_save_load_delete() {
        let (_dir, store) = store();
        let mut config = store.allocate("edge").unwrap();
        config.local_ip = Some(Ipv4Addr::new(1, 2, 3, 4));
        config.remote_ip = Some(Ipv4Addr::new(5, 6, 7, 8));
        store.save(&config).unwrap();

        assert_eq!(store.list_names().unwrap(), vec!["edge".to_string()]);
        assert_eq!(store.load("edge").unwrap(), config);
        assert!(store.delete("edge").unwrap());
        assert!(store.list_names().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        let config = store.allocate("edge").unwrap();
        store.save(&config).unwrap();

        let mode = std::fs::metadata(store.dir().join("edge.toml"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_broken_record_is_skipped() {
        let (_dir, store) = store();
        let config = store.allocate("good").unwrap();
        store.save(&config).unwrap();
        std::fs::write(store.dir().join("bad.toml"), "name = [").unwrap();
        std::fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list_names().unwrap(), vec!["bad", "good"]);
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "good");
    }

    #[test]
    fn test_save_rejects_unsanitized_name() {
        let (_dir, store) = store();
        let config = TunnelConfig::new("Bad Name", 0);
        assert!(matches!(store.save(&config), Err(ConfigError::InvalidName(_))));
    }
}

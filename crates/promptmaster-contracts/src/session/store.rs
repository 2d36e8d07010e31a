use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub const TOKEN_KEY: &str = "PROMPT_MASTER_API_KEY";
pub const ENDPOINT_KEY: &str = "PROMPT_MASTER_BASE_URL";

/// String key-value store persisted as a single JSON object.
///
/// Reads always refresh from disk. Writes merge only the keys this instance
/// touched into whatever is on disk, so two stores sharing a file do not
/// clobber each other's keys.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
    payload: Option<Map<String, Value>>,
    dirty_keys: Vec<String>,
}

impl KeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: None,
            dirty_keys: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.reload()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let snapshot = Value::String(value.to_string());
        let payload = self.reload();
        if payload.get(key) == Some(&snapshot) {
            return Ok(());
        }
        payload.insert(key.to_string(), snapshot);
        self.mark_dirty(key);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let payload = self.reload();
        if payload.remove(key).is_none() {
            return Ok(());
        }
        self.mark_dirty(key);
        self.flush()
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        if self.dirty_keys.is_empty() {
            return Ok(());
        }
        let Some(payload) = self.payload.as_ref() else {
            return Ok(());
        };

        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        for key in &self.dirty_keys {
            match payload.get(key) {
                Some(value) => {
                    on_disk.insert(key.clone(), value.clone());
                }
                None => {
                    on_disk.remove(key);
                }
            }
        }
        write_json_object(&self.path, &on_disk)?;
        self.payload = Some(on_disk);
        self.dirty_keys.clear();
        Ok(())
    }

    fn mark_dirty(&mut self, key: &str) {
        if !self.dirty_keys.iter().any(|existing| existing == key) {
            self.dirty_keys.push(key.to_string());
        }
    }

    fn reload(&mut self) -> &mut Map<String, Value> {
        self.payload
            .insert(read_json_object(&self.path).unwrap_or_default())
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, ENDPOINT_KEY, TOKEN_KEY};

    #[test]
    fn store_basic() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = KeyValueStore::new(temp.path().join("credentials.json"));
        assert_eq!(store.get(TOKEN_KEY), None);
        store.set(TOKEN_KEY, "AIzaExample123")?;
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("AIzaExample123"));
        Ok(())
    }

    #[test]
    fn values_survive_a_fresh_instance() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("credentials.json");
        KeyValueStore::new(&path).set(ENDPOINT_KEY, "https://proxy.example")?;

        let mut reloaded = KeyValueStore::new(&path);
        assert_eq!(
            reloaded.get(ENDPOINT_KEY).as_deref(),
            Some("https://proxy.example")
        );
        Ok(())
    }

    #[test]
    fn remove_deletes_only_that_key() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        let mut store = KeyValueStore::new(&path);
        store.set(TOKEN_KEY, "token-value")?;
        store.set(ENDPOINT_KEY, "https://proxy.example")?;
        store.remove(TOKEN_KEY)?;

        let mut reloaded = KeyValueStore::new(path);
        assert_eq!(reloaded.get(TOKEN_KEY), None);
        assert_eq!(
            reloaded.get(ENDPOINT_KEY).as_deref(),
            Some("https://proxy.example")
        );
        Ok(())
    }

    #[test]
    fn set_merges_with_concurrent_writer() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        let mut store_a = KeyValueStore::new(&path);
        let mut store_b = KeyValueStore::new(&path);

        store_a.set("a", "1")?;
        store_b.set("b", "2")?;
        store_a.set("c", "3")?;

        let mut reloaded = KeyValueStore::new(path);
        assert_eq!(reloaded.get("a").as_deref(), Some("1"));
        assert_eq!(reloaded.get("b").as_deref(), Some("2"));
        assert_eq!(reloaded.get("c").as_deref(), Some("3"));
        Ok(())
    }

    #[test]
    fn set_does_not_noop_on_stale_local_snapshot() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        let mut store_a = KeyValueStore::new(&path);
        let mut store_b = KeyValueStore::new(&path);

        store_a.set(TOKEN_KEY, "first-token")?;
        store_b.set(TOKEN_KEY, "second-token")?;
        store_a.set(TOKEN_KEY, "first-token")?;

        let mut reloaded = KeyValueStore::new(path);
        assert_eq!(reloaded.get(TOKEN_KEY).as_deref(), Some("first-token"));
        Ok(())
    }
}

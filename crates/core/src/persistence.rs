use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{from_reader, to_writer_pretty};

use crate::cue::cue::Cue;
use crate::ports::traits::PersistencePort;

/// Cue storage in a single pretty-printed JSON file. Every mutation rewrites
/// the file; cue counts are small enough that read-modify-write is fine.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, cues: &[Cue]) -> Result<()> {
        let file = File::create(&self.path)?;
        to_writer_pretty(file, cues)?;
        Ok(())
    }
}

impl PersistencePort for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Cue>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        Ok(from_reader(file)?)
    }

    fn store(&mut self, cue: &Cue) -> Result<()> {
        let mut cues = self.load_all()?;
        match cues.iter_mut().find(|c| c.id == cue.id) {
            Some(existing) => *existing = cue.clone(),
            None => cues.push(cue.clone()),
        }
        self.write_all(&cues)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let mut cues = self.load_all()?;
        cues.retain(|c| c.id != id);
        self.write_all(&cues)
    }
}

/// Volatile storage for tests and rehearsal sessions.
#[derive(Default)]
pub struct MemoryStore {
    cues: Vec<Cue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistencePort for MemoryStore {
    fn load_all(&self) -> Result<Vec<Cue>> {
        Ok(self.cues.clone())
    }

    fn store(&mut self, cue: &Cue) -> Result<()> {
        match self.cues.iter_mut().find(|c| c.id == cue.id) {
            Some(existing) => *existing = cue.clone(),
            None => self.cues.push(cue.clone()),
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        self.cues.retain(|c| c.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn cue(id: &str, index: u32) -> Cue {
        Cue {
            id: id.to_string(),
            index,
            name: format!("Cue {}", index),
            snapshot: Default::default(),
            duration: 0.0,
            autofollow: false,
            actions: Vec::new(),
            created: "2026-01-01 12:00:00".to_string(),
            modified: "2026-01-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn json_store_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cues.json"));

        store.store(&cue("a", 1)).unwrap();
        store.store(&cue("b", 2)).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[1].name, "Cue 2");
    }

    #[test]
    fn json_store_updates_by_id() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cues.json"));

        store.store(&cue("a", 1)).unwrap();
        let mut updated = cue("a", 1);
        updated.name = "Renamed".to_string();
        store.store(&updated).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Renamed");
    }

    #[test]
    fn json_store_removes_by_id() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cues.json"));

        store.store(&cue("a", 1)).unwrap();
        store.store(&cue("b", 2)).unwrap();
        store.remove("a").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "b");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load_all().unwrap().is_empty());
    }
}

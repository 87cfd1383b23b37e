use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::cue::cue::{Cue, CueDraft};
use crate::error::EngineError;
use crate::ports::traits::PersistencePort;

/// Owns the ordered cue collection and enforces the index invariant: across
/// all cues, indices are a permutation of `1..=N` — except after `delete`,
/// which intentionally leaves a gap (matching the behavior cue files in the
/// wild already rely on; renumbering would change `reorder`'s arithmetic).
///
/// Every mutation is written through to the persistence port; a write failure
/// is logged and the in-memory state stays authoritative for the session.
pub struct CueStore {
    cues: Vec<Cue>,
    persistence: Box<dyn PersistencePort>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub id: String,
    pub index: u32,
    pub created: bool,
    pub component_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderOutcome {
    pub id: String,
    pub old_index: u32,
    pub new_index: u32,
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl CueStore {
    /// Create a store hydrated from the persistence port.
    pub fn new(persistence: Box<dyn PersistencePort>) -> Result<Self, EngineError> {
        let cues = persistence
            .load_all()
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(Self { cues, persistence })
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Cue> {
        self.cues.iter().find(|c| c.id == id)
    }

    pub fn find_by_index(&self, index: u32) -> Option<&Cue> {
        self.cues.iter().find(|c| c.index == index)
    }

    /// Cues sorted by index, recomputed on each call.
    pub fn list(&self) -> Vec<&Cue> {
        let mut cues: Vec<&Cue> = self.cues.iter().collect();
        cues.sort_by_key(|c| c.index);
        cues
    }

    /// Create or update a cue. A draft whose `id` matches an existing cue
    /// updates it in place, keeping its index and `created` timestamp. A new
    /// cue is appended at `max(existing indices) + 1` with a generated id
    /// unless the draft supplies an unused one.
    pub fn save(&mut self, draft: CueDraft) -> Result<SaveOutcome, EngineError> {
        let now = timestamp();
        let name = draft.name.unwrap_or_else(|| "Untitled".to_string());

        if let Some(id) = draft.id.clone() {
            if let Some(cue) = self.cues.iter_mut().find(|c| c.id == id) {
                cue.name = name;
                cue.snapshot = draft.snapshot;
                cue.duration = draft.duration;
                cue.autofollow = draft.autofollow;
                cue.actions = draft.actions;
                cue.modified = now;

                let outcome = SaveOutcome {
                    id,
                    index: cue.index,
                    created: false,
                    component_count: cue.component_count(),
                };
                let cue = cue.clone();
                self.write_through(&cue);
                return Ok(outcome);
            }
        }

        let id = draft
            .id
            .unwrap_or_else(|| format!("cue_{}", &Uuid::new_v4().simple().to_string()[..8]));
        let index = self.cues.iter().map(|c| c.index).max().unwrap_or(0) + 1;

        let cue = Cue {
            id: id.clone(),
            index,
            name,
            snapshot: draft.snapshot,
            duration: draft.duration,
            autofollow: draft.autofollow,
            actions: draft.actions,
            created: now.clone(),
            modified: now,
        };
        let component_count = cue.component_count();
        self.write_through(&cue);
        self.cues.push(cue);

        log::info!("Saved cue {} at index {}", id, index);
        Ok(SaveOutcome {
            id,
            index,
            created: true,
            component_count,
        })
    }

    /// Remove a cue. Remaining indices are NOT renumbered; the gap stays.
    pub fn delete(&mut self, id: &str) -> Result<(), EngineError> {
        let pos = self
            .cues
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| EngineError::CueNotFound(id.to_string()))?;
        self.cues.remove(pos);

        if let Err(e) = self.persistence.remove(id) {
            log::warn!("Failed to remove cue {} from storage: {}", id, e);
        }
        log::info!("Deleted cue {}", id);
        Ok(())
    }

    /// Move a cue to `new_index`, shifting every cue strictly between the old
    /// and new position by one to keep the permutation intact.
    pub fn reorder(&mut self, id: &str, new_index: u32) -> Result<ReorderOutcome, EngineError> {
        if new_index < 1 || new_index as usize > self.cues.len() {
            return Err(EngineError::IndexOutOfRange(new_index));
        }

        let pos = self
            .cues
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| EngineError::CueNotFound(id.to_string()))?;
        let old_index = self.cues[pos].index;

        for (i, cue) in self.cues.iter_mut().enumerate() {
            if i == pos {
                continue;
            }
            let idx = cue.index;
            if old_index < new_index {
                if idx > old_index && idx <= new_index {
                    cue.index = idx - 1;
                }
            } else if idx >= new_index && idx < old_index {
                cue.index = idx + 1;
            }
        }
        self.cues[pos].index = new_index;

        for cue in self.cues.clone() {
            self.write_through(&cue);
        }

        Ok(ReorderOutcome {
            id: id.to_string(),
            old_index,
            new_index,
        })
    }

    fn write_through(&mut self, cue: &Cue) {
        if let Err(e) = self.persistence.store(cue) {
            log::warn!("Failed to persist cue {}: {}", cue.id, e);
        }
    }
}

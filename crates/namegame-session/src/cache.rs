//! The round-scoped list of names this client submitted.
//!
//! Stored under [`NAMES_KEY`] as the JSON document
//! `[epoch, [[name, id], ...]]`, where `id` is the identifier's hyphenated
//! text. The list is only meaningful for the round it was written in.

use namegame_protocol::Identifier;
use tracing::{debug, warn};

use crate::{SessionError, Storage};

/// The storage key holding the submitted names.
pub const NAMES_KEY: &str = "names";

/// A name this client submitted, and the identifier the server gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedName {
    pub name: String,
    pub id: Identifier,
}

impl SubmittedName {
    pub fn new(name: impl Into<String>, id: Identifier) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

type StoredNames = (u64, Vec<(String, String)>);

/// Epoch-checked access to the submitted-names entry.
#[derive(Debug, Clone)]
pub struct NameCache<S> {
    storage: S,
}

impl<S: Storage> NameCache<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the names stored for `current_epoch`.
    ///
    /// A missing entry yields an empty list. An entry from another epoch,
    /// or one that can't be decoded, is removed and also yields an empty
    /// list.
    ///
    /// # Errors
    /// Only failures of the storage backend itself.
    pub fn get_names(&mut self, current_epoch: u64) -> Result<Vec<SubmittedName>, SessionError> {
        let Some(json) = self.storage.get(NAMES_KEY)? else {
            return Ok(Vec::new());
        };

        let (stored_epoch, names) = match decode(&json) {
            Ok(stored) => stored,
            Err(reason) => {
                warn!(key = NAMES_KEY, %reason, "discarding unreadable stored names");
                self.storage.remove(NAMES_KEY)?;
                return Ok(Vec::new());
            }
        };

        if stored_epoch != current_epoch {
            debug!(stored_epoch, current_epoch, "stored names are from another round");
            self.storage.remove(NAMES_KEY)?;
            return Ok(Vec::new());
        }
        Ok(names)
    }

    /// Replaces the stored names with `names` for `epoch`.
    pub fn set_names(&mut self, epoch: u64, names: &[SubmittedName]) -> Result<(), SessionError> {
        let stored: StoredNames = (
            epoch,
            names
                .iter()
                .map(|entry| (entry.name.clone(), entry.id.to_text()))
                .collect(),
        );
        let json = serde_json::to_string(&stored)?;
        self.storage.set(NAMES_KEY, json)
    }

    /// Forgets the stored names.
    pub fn clear_names(&mut self) -> Result<(), SessionError> {
        self.storage.remove(NAMES_KEY)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

fn decode(json: &str) -> Result<(u64, Vec<SubmittedName>), String> {
    let (epoch, pairs): StoredNames = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let names = pairs
        .into_iter()
        .map(|(name, id)| {
            Identifier::from_text(&id)
                .map(|id| SubmittedName { name, id })
                .map_err(|e| e.to_string())
        })
        .collect::<Result<_, _>>()?;
    Ok((epoch, names))
}

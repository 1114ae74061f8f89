//! Resolving relationship words ("wife", "son") against an account holder.

use crate::Error;
#[cfg(feature = "serde")]
use crate::{ErrorLevel, ErrorType, Source};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Resolves `relationship` of `person` to zero or more names.
pub trait RelationshipLookup {
    fn resolve(&self, person: &str, relationship: &str) -> Vec<String>;
}

impl<L: RelationshipLookup + ?Sized> RelationshipLookup for &L {
    fn resolve(&self, person: &str, relationship: &str) -> Vec<String> {
        (**self).resolve(person, relationship)
    }
}

/// A lookup that knows nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelationships;

impl RelationshipLookup for NoRelationships {
    fn resolve(&self, _person: &str, _relationship: &str) -> Vec<String> {
        Vec::new()
    }
}

/// An in-memory table: person → relationship → names. Keys are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipTable {
    table: HashMap<String, HashMap<String, Vec<String>>>,
}

impl RelationshipTable {
    pub fn insert(&mut self, person: &str, relationship: &str, name: impl Into<String>) {
        self.table
            .entry(person.trim().to_lowercase())
            .or_default()
            .entry(relationship.trim().to_lowercase())
            .or_default()
            .push(name.into());
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Reads `{ "holder": { "wife": ["Name"] } }`.
    #[cfg(feature = "serde")]
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, HashMap<String, Vec<String>>> = serde_json::from_str(data)?;
        let mut table = RelationshipTable::default();
        for (person, relations) in raw {
            for (relationship, names) in relations {
                for name in names {
                    table.insert(&person, &relationship, name);
                }
            }
        }
        Ok(table)
    }

    #[cfg(feature = "serde")]
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let src = Source::row(&Arc::new(path.to_string()), 0);
        let data = std::fs::read_to_string(path).map_err(|io_error| Error {
            msg: format!("Couldn't read {}: {:?}", path, io_error),
            src: src.clone(),
            r#type: ErrorType::Io,
            level: ErrorLevel::Error,
        })?;
        Self::from_json(&data).map_err(|json_error| Error {
            msg: format!("Invalid relationship table {}: {}", path, json_error),
            src,
            r#type: ErrorType::Syntax,
            level: ErrorLevel::Error,
        })
    }
}

impl RelationshipLookup for RelationshipTable {
    fn resolve(&self, person: &str, relationship: &str) -> Vec<String> {
        self.table
            .get(&person.trim().to_lowercase())
            .and_then(|relations| relations.get(&relationship.trim().to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }
}

pub type TableLoader = Box<dyn Fn() -> Result<RelationshipTable, Error> + Send + Sync>;

/// A [`RelationshipTable`] reloaded from its source once it is older than
/// `interval`. A failed reload keeps serving the previous table.
pub struct CachedLookup {
    loader: TableLoader,
    interval: Duration,
    state: RwLock<(Arc<RelationshipTable>, DateTime<Utc>)>,
}

impl CachedLookup {
    pub fn new(loader: TableLoader, interval: Duration) -> Result<Self, Error> {
        let table = loader()?;
        Ok(CachedLookup {
            loader,
            interval,
            state: RwLock::new((Arc::new(table), Utc::now())),
        })
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).1
    }

    fn current(&self) -> Arc<RelationshipTable> {
        let now = Utc::now();
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if now - state.1 < self.interval {
                return state.0.clone();
            }
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if now - state.1 >= self.interval {
            match (self.loader)() {
                Ok(table) => {
                    log::debug!("relationship table reloaded: {} people", table.len());
                    state.0 = Arc::new(table);
                }
                Err(err) => log::warn!("relationship table reload failed: {}", err.msg),
            }
            state.1 = now;
        }
        state.0.clone()
    }
}

impl RelationshipLookup for CachedLookup {
    fn resolve(&self, person: &str, relationship: &str) -> Vec<String> {
        self.current().resolve(person, relationship)
    }
}

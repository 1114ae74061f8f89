use crate::relations::{NoRelationships, RelationshipLookup};
use crate::words::WordIndex;
use crate::Error;
use chrono::Duration;
use std::path::PathBuf;

/// Environment variable overriding the number of parser threads.
pub const THREADS_ENV: &str = "SCRIVENER_PARSER_THREADS";

/// Settings for one parsing run.
#[derive(Debug, Clone)]
pub struct Config {
    pub threads: usize,
    /// Item word list; the built-in list is used when absent.
    pub item_words: Option<PathBuf>,
    /// Amount word list; the built-in list is used when absent.
    pub amount_words: Option<PathBuf>,
    /// JSON relationship table.
    pub relationships: Option<PathBuf>,
    /// How long a loaded relationship table is served before reloading.
    pub refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let threads = std::env::var(THREADS_ENV)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get);
        Config {
            threads,
            item_words: None,
            amount_words: None,
            relationships: None,
            refresh_interval: Duration::hours(1),
        }
    }
}

impl Config {
    pub fn word_index(&self) -> Result<WordIndex, Error> {
        WordIndex::from_files(self.item_words.as_deref(), self.amount_words.as_deref())
    }

    /// Builds the relationship lookup. Without a table file nobody resolves.
    #[cfg(feature = "serde")]
    pub fn relationship_lookup(&self) -> Result<Box<dyn RelationshipLookup + Send + Sync>, Error> {
        use crate::relations::{CachedLookup, RelationshipTable};
        match &self.relationships {
            Some(path) => {
                let path = path.display().to_string();
                let lookup = CachedLookup::new(
                    Box::new(move || RelationshipTable::from_file(&path)),
                    self.refresh_interval,
                )?;
                Ok(Box::new(lookup))
            }
            None => Ok(Box::new(NoRelationships)),
        }
    }

    #[cfg(not(feature = "serde"))]
    pub fn relationship_lookup(&self) -> Result<Box<dyn RelationshipLookup + Send + Sync>, Error> {
        if let Some(path) = &self.relationships {
            log::warn!(
                "ignoring relationship table {}: built without the serde feature",
                path.display()
            );
        }
        Ok(Box::new(NoRelationships))
    }
}

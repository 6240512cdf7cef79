//! Seeding a store from a JSON file of records

use super::identifier::create_identifier;
use super::memory::Store;
use super::record::{Record, ID_FIELD};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Read a JSON array of record objects from disk
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;

    let values: Vec<Value> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse data file {}", path.display()))?;

    Ok(values)
}

/// Insert records into the store, returning how many were stored.
///
/// The key is the record's `id`. Records without one get an id derived
/// from their `name`; records with neither are skipped.
pub fn seed_store(store: &Store, values: Vec<Value>) -> usize {
    let mut stored = 0;

    for (index, value) in values.into_iter().enumerate() {
        let Some(mut record) = Record::from_value(value) else {
            warn!("Skipping data entry {}: not an object", index);
            continue;
        };

        let key = match record.id() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => match record.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => {
                    let id = create_identifier(name);
                    record.insert(ID_FIELD, id.clone());
                    id
                }
                _ => {
                    warn!("Skipping data entry {}: no id or name", index);
                    continue;
                }
            },
        };

        if store.set(&key, record) {
            stored += 1;
        }
    }

    stored
}

/// Load a data file into the store
pub fn load_file(store: &Store, path: &Path) -> Result<usize> {
    let values = read_records(path)?;
    let stored = seed_store(store, values);
    info!("Loaded {} records from {}", stored, path.display());
    Ok(stored)
}

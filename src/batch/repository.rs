// src/batch/repository.rs

use std::collections::BTreeMap;

use crate::batch::engine::ItemUpdate;
use crate::error::{ReplenishError, Result};
use crate::model::{ExceptionRecord, ItemRecord};

/// Read/write contract with the persistence layer.
///
/// The runner loads every item once per run and commits one update per
/// item that completed its whole pipeline. Implementations decide what
/// "commit" means; the engine never writes partial state.
pub trait ItemRepository {
    fn load_items(&self) -> Result<Vec<ItemRecord>>;

    fn commit(&mut self, update: &ItemUpdate) -> Result<()>;
}

/// Repository held in memory, keyed by item id.
///
/// Superseded updates stay in the audit trail so a run can be inspected or
/// rolled back by hand.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    items: BTreeMap<String, ItemRecord>,
    audit: Vec<ItemUpdate>,
    exceptions: Vec<ExceptionRecord>,
}

impl InMemoryRepository {
    pub fn new(items: impl IntoIterator<Item = ItemRecord>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.item_id.clone(), i)).collect(),
            ..Self::default()
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemRecord> {
        self.items.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every committed update, oldest first.
    pub fn audit_trail(&self) -> &[ItemUpdate] {
        &self.audit
    }

    pub fn exceptions(&self) -> &[ExceptionRecord] {
        &self.exceptions
    }
}

impl ItemRepository for InMemoryRepository {
    fn load_items(&self) -> Result<Vec<ItemRecord>> {
        Ok(self.items.values().cloned().collect())
    }

    fn commit(&mut self, update: &ItemUpdate) -> Result<()> {
        let item = self
            .items
            .get_mut(&update.item_id)
            .ok_or_else(|| ReplenishError::Persistence {
                reason: format!("unknown item '{}'", update.item_id),
            })?;

        update.apply_to(item);
        self.exceptions.extend(update.exceptions.iter().cloned());
        self.audit.push(update.clone());
        Ok(())
    }
}

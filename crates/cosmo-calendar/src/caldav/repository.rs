//! Where candidate items come from.

use std::collections::HashMap;

use cosmo_rfc::rfc::ical::core::{Component, ComponentKind, names};
use cosmo_rfc::rfc::ical::expand::Zone;

use crate::error::SchemaError;
use crate::model::{CalendarEntity, Modification};

/// Identifies a calendar collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(String);

impl CollectionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Storage the query engine reads from.
pub trait ItemRepository: Send + Sync {
    /// ## Summary
    /// Masters stored in a collection.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when stored data cannot be read.
    fn find_items_by_collection(
        &self,
        collection: &CollectionId,
    ) -> Result<Vec<CalendarEntity>, SchemaError>;

    /// ## Summary
    /// Modifications of the master with `master_uid`.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when stored data cannot be read.
    fn find_overrides(&self, master_uid: &str) -> Result<Vec<Modification>, SchemaError>;

    /// The collection's `CALDAV:calendar-timezone`, if set.
    fn collection_timezone(&self, collection: &CollectionId) -> Option<Zone>;
}

/// A repository held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    items: HashMap<CollectionId, Vec<CalendarEntity>>,
    overrides: HashMap<String, Vec<Modification>>,
    timezones: HashMap<CollectionId, Zone>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, collection: &CollectionId, item: CalendarEntity) {
        self.items.entry(collection.clone()).or_default().push(item);
    }

    pub fn add_override(&mut self, modification: Modification) {
        self.overrides
            .entry(modification.master_uid.clone())
            .or_default()
            .push(modification);
    }

    pub fn set_timezone(&mut self, collection: &CollectionId, zone: Zone) {
        self.timezones.insert(collection.clone(), zone);
    }

    /// ## Summary
    /// Stores every item of a VCALENDAR.
    ///
    /// Components with a RECURRENCE-ID become modifications of their
    /// master; VTIMEZONE definitions are skipped.
    ///
    /// ## Errors
    /// Returns the first [`SchemaError`] met; items read before it stay
    /// stored.
    pub fn import_calendar(
        &mut self,
        collection: &CollectionId,
        calendar: &Component,
    ) -> Result<usize, SchemaError> {
        let mut imported = 0;
        for child in &calendar.children {
            if child.kind == Some(ComponentKind::Timezone) {
                continue;
            }
            if child.get_property(names::RECURRENCE_ID).is_some() {
                self.add_override(Modification::from_component(child)?);
            } else {
                self.add_item(collection, CalendarEntity::from_component(child)?);
            }
            imported += 1;
        }
        tracing::debug!(%collection, imported, "Calendar imported");
        Ok(imported)
    }
}

impl ItemRepository for InMemoryRepository {
    fn find_items_by_collection(
        &self,
        collection: &CollectionId,
    ) -> Result<Vec<CalendarEntity>, SchemaError> {
        Ok(self.items.get(collection).cloned().unwrap_or_default())
    }

    fn find_overrides(&self, master_uid: &str) -> Result<Vec<Modification>, SchemaError> {
        Ok(self.overrides.get(master_uid).cloned().unwrap_or_default())
    }

    fn collection_timezone(&self, collection: &CollectionId) -> Option<Zone> {
        self.timezones.get(collection).cloned()
    }
}

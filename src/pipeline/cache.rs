// src/pipeline/cache.rs

//! Per-type record cache.
//!
//! Kinds are appended in the order they were fetched and stay cached until
//! the whole cache is invalidated. Individual records may still be patched
//! or removed after a mutation.

use std::collections::HashMap;

use crate::models::Record;

/// Records already fetched, grouped by kind.
#[derive(Debug, Clone)]
pub struct TypedCache<R: Record> {
    entries: HashMap<R::Kind, Vec<R>>,
    order: Vec<R::Kind>,
}

impl<R: Record> Default for TypedCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<R: Record> TypedCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: R::Kind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn get(&self, kind: R::Kind) -> Option<&[R]> {
        self.entries.get(&kind).map(Vec::as_slice)
    }

    /// Kinds from `wanted` that have not been fetched yet, in `wanted` order.
    pub fn missing(&self, wanted: &[R::Kind]) -> Vec<R::Kind> {
        wanted.iter().copied().filter(|k| !self.contains(*k)).collect()
    }

    /// Store a freshly fetched kind. A kind that is already cached is kept.
    ///
    /// Returns `false` when the kind was already present.
    pub fn insert(&mut self, kind: R::Kind, records: Vec<R>) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.entries.insert(kind, records);
        self.order.push(kind);
        true
    }

    /// Every cached record, kinds concatenated in fetch order.
    pub fn all(&self) -> impl Iterator<Item = &R> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k))
            .flat_map(|records| records.iter())
    }

    /// Kinds in fetch order.
    pub fn kinds(&self) -> &[R::Kind] {
        &self.order
    }

    /// Record count for every cached kind, in fetch order.
    pub fn counts(&self) -> Vec<(R::Kind, usize)> {
        self.order
            .iter()
            .map(|k| (*k, self.entries.get(k).map_or(0, Vec::len)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop one record. Returns the removed record if it was cached.
    pub fn remove(&mut self, kind: R::Kind, id: &str) -> Option<R> {
        let records = self.entries.get_mut(&kind)?;
        let pos = records.iter().position(|r| r.id() == id)?;
        Some(records.remove(pos))
    }

    /// Replace a cached record in place, keeping its position.
    ///
    /// If the record changed kind it moves to the end of its new kind, when
    /// that kind is cached. Returns `false` when the record was not found.
    pub fn replace(&mut self, record: R) -> bool {
        let kind = record.kind();
        if let Some(slot) = self
            .entries
            .get_mut(&kind)
            .and_then(|records| records.iter_mut().find(|r| r.id() == record.id()))
        {
            *slot = record;
            return true;
        }

        let previous = self.order.iter().copied().find(|k| {
            self.entries
                .get(k)
                .is_some_and(|records| records.iter().any(|r| r.id() == record.id()))
        });
        match previous {
            Some(old_kind) => {
                self.remove(old_kind, record.id());
                if let Some(records) = self.entries.get_mut(&kind) {
                    records.push(record);
                }
                true
            }
            None => false,
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

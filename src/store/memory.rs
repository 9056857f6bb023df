use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, DocumentStore, Query, RawDocument, UniqueKey, compare_values, value_at};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
struct StoredDocument {
    version: i64,
    body: Value,
    keys: Vec<UniqueKey>,
}

type KeySlot = (Collection, &'static str, String);

/// In-process store backed by `dashmap`. Writes to one document are
/// serialised by the map's entry lock, which makes the version check and
/// unique-key claims atomic per document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(Collection, Uuid), StoredDocument>,
    unique_keys: DashMap<KeySlot, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.documents.iter().filter(|e| e.key().0 == collection).count()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn slot(collection: Collection, key: &UniqueKey) -> KeySlot {
        (collection, key.field, key.value.clone())
    }

    /// Claims every key for `id`, rolling back on the first taken one.
    fn claim_keys(&self, collection: Collection, id: Uuid, keys: &[UniqueKey]) -> AppResult<Vec<KeySlot>> {
        let mut claimed = Vec::new();
        for key in keys {
            let slot = Self::slot(collection, key);
            match self.unique_keys.entry(slot.clone()) {
                Entry::Occupied(owner) if *owner.get() != id => {
                    drop(owner);
                    for slot in claimed {
                        self.unique_keys.remove(&slot);
                    }
                    return Err(AppError::Duplicate {
                        field: key.field.to_string(),
                        value: key.value.clone(),
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(vacant) => {
                    vacant.insert(id);
                    claimed.push(slot);
                }
            }
        }
        Ok(claimed)
    }

    fn release_keys(&self, collection: Collection, id: Uuid, keys: &[UniqueKey]) {
        for key in keys {
            self.unique_keys
                .remove_if(&Self::slot(collection, key), |_, owner| *owner == id);
        }
    }
}

pub(super) fn stamp_version(body: &mut Value, version: i64) {
    if let Some(fields) = body.as_object_mut() {
        fields.insert("version".to_string(), Value::from(version));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        Ok(self.documents.get(&(collection, id)).map(|d| d.body.clone()))
    }

    async fn find(&self, collection: Collection, query: &Query) -> AppResult<Vec<Value>> {
        let mut matches: Vec<(Uuid, Value)> = self
            .documents
            .iter()
            .filter(|e| e.key().0 == collection && query.matches(&e.value().body))
            .map(|e| (e.key().1, e.value().body.clone()))
            .collect();

        match &query.sort {
            Some(sort) => matches.sort_by(|(a_id, a), (b_id, b)| {
                let ordering = compare_values(value_at(a, &sort.path), value_at(b, &sort.path));
                let ordering = if sort.descending { ordering.reverse() } else { ordering };
                ordering.then(a_id.cmp(b_id))
            }),
            None => matches.sort_by_key(|(id, _)| *id),
        }

        Ok(matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(_, body)| body)
            .collect())
    }

    async fn save(&self, document: RawDocument) -> AppResult<i64> {
        let RawDocument {
            collection,
            id,
            expected_version,
            mut body,
            unique_keys,
        } = document;
        let stale = || AppError::StaleWrite {
            entity: collection.as_str(),
            id,
        };

        match self.documents.entry((collection, id)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().version != expected_version {
                    return Err(stale());
                }
                self.claim_keys(collection, id, &unique_keys)?;
                let dropped: Vec<UniqueKey> = occupied
                    .get()
                    .keys
                    .iter()
                    .filter(|k| !unique_keys.contains(k))
                    .cloned()
                    .collect();
                self.release_keys(collection, id, &dropped);

                let version = expected_version + 1;
                stamp_version(&mut body, version);
                occupied.insert(StoredDocument {
                    version,
                    body,
                    keys: unique_keys,
                });
                debug!("Updated {} {} to version {}", collection.as_str(), id, version);
                Ok(version)
            }
            Entry::Vacant(vacant) => {
                if expected_version != 0 {
                    return Err(stale());
                }
                self.claim_keys(collection, id, &unique_keys)?;
                stamp_version(&mut body, 1);
                vacant.insert(StoredDocument {
                    version: 1,
                    body,
                    keys: unique_keys,
                });
                debug!("Inserted {} {}", collection.as_str(), id);
                Ok(1)
            }
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool> {
        match self.documents.remove(&(collection, id)) {
            Some((_, stored)) => {
                self.release_keys(collection, id, &stored.keys);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::RelationError;

pub type RelationId = u32;

/// One application's side of a relation: opaque string keys and values
pub type RelationRecord = BTreeMap<String, String>;

/// An established relation as seen from the local application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Relation {
    pub id: RelationId,
    pub name: String,
    /// Unknown until the remote application has joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_app: Option<String>,
}

/// Replicated key-value storage of relation data, owned by the orchestration host.
///
/// Every read returns a snapshot. The local application can only write its own side.
pub trait RelationStore {
    /// Name of the application this store is viewed from
    fn local_app(&self) -> &str;

    /// All established relations with this name
    fn relations(&self, name: &str) -> Vec<Relation>;

    /// First established relation with this name
    fn relation(&self, name: &str) -> Option<Relation> {
        self.relations(name).into_iter().next()
    }

    fn relation_by_id(&self, name: &str, id: RelationId) -> Option<Relation> {
        self.relations(name).into_iter().find(|relation| relation.id == id)
    }

    /// Snapshot of `app`'s side of the relation, `None` if either is unknown
    fn read(&self, id: RelationId, app: &str) -> Option<RelationRecord>;

    /// Merge `fields` into the local application's side of the relation
    fn update(&mut self, id: RelationId, fields: &RelationRecord) -> Result<(), RelationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RelationEntry {
    #[serde(flatten)]
    relation: Relation,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, RelationRecord>,
}

/// In-process relation store.
///
/// Serializes to the YAML host state used by the command line dispatcher, and lets
/// callers act as the remote application through [`MemoryRelationStore::update_app_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryRelationStore {
    local_app: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    relations: Vec<RelationEntry>,
}

impl MemoryRelationStore {
    pub fn new(local_app: impl Into<String>) -> Self {
        Self {
            local_app: local_app.into(),
            relations: vec![],
        }
    }

    /// Establish a new relation and return its id
    pub fn add_relation(&mut self, name: &str, remote_app: Option<&str>) -> RelationId {
        let id = self
            .relations
            .iter()
            .map(|entry| entry.relation.id + 1)
            .max()
            .unwrap_or_default();
        debug!(relation = name, id, ?remote_app, "adding relation");
        self.relations.push(RelationEntry {
            relation: Relation {
                id,
                name: name.to_owned(),
                remote_app: remote_app.map(str::to_owned),
            },
            data: BTreeMap::new(),
        });
        id
    }

    pub fn set_remote_app(&mut self, id: RelationId, app: &str) -> Result<(), RelationError> {
        let entry = self.entry_mut(id)?;
        entry.relation.remote_app = Some(app.to_owned());
        Ok(())
    }

    /// Tear down a relation, dropping the data of both sides
    pub fn remove_relation(&mut self, id: RelationId) -> Option<Relation> {
        let position = self
            .relations
            .iter()
            .position(|entry| entry.relation.id == id)?;
        Some(self.relations.remove(position).relation)
    }

    /// Merge `fields` into `app`'s side of the relation.
    ///
    /// Returns whether any value actually changed.
    pub fn update_app_data(
        &mut self,
        id: RelationId,
        app: &str,
        fields: &RelationRecord,
    ) -> Result<bool, RelationError> {
        let entry = self.entry_mut(id)?;
        let record = entry.data.entry(app.to_owned()).or_default();
        let mut changed = false;
        for (key, value) in fields {
            if record.get(key) != Some(value) {
                record.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        if changed {
            debug!(id, app, keys = fields.len(), "relation data updated");
        } else {
            trace!(id, app, "relation data unchanged");
        }
        Ok(changed)
    }

    fn entry_mut(&mut self, id: RelationId) -> Result<&mut RelationEntry, RelationError> {
        self.relations
            .iter_mut()
            .find(|entry| entry.relation.id == id)
            .ok_or(RelationError::UnknownRelation(id))
    }
}

impl RelationStore for MemoryRelationStore {
    fn local_app(&self) -> &str {
        &self.local_app
    }

    fn relations(&self, name: &str) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|entry| entry.relation.name == name)
            .map(|entry| entry.relation.clone())
            .collect()
    }

    fn read(&self, id: RelationId, app: &str) -> Option<RelationRecord> {
        self.relations
            .iter()
            .find(|entry| entry.relation.id == id)
            .and_then(|entry| entry.data.get(app))
            .cloned()
    }

    fn update(&mut self, id: RelationId, fields: &RelationRecord) -> Result<(), RelationError> {
        let local_app = self.local_app.clone();
        self.update_app_data(id, &local_app, fields)?;
        Ok(())
    }
}

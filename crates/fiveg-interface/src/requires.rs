use std::marker::PhantomData;

use tracing::{debug, info, instrument, warn};

use crate::schema::{CapabilityPayload, Validation};
use crate::store::{RelationId, RelationRecord, RelationStore};

/// Progress of a capability negotiation on one relation name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NegotiationState {
    #[default]
    NoRelation,
    AwaitingData,
    Available,
}

/// Signal raised every time the peer's record is found complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityAvailable<P> {
    pub relation_id: RelationId,
    pub payload: P,
}

/// Requirer side of a capability interface.
///
/// Re-evaluates the peer's record on every change notification and signals availability
/// whenever all required fields are present, including repeatedly. The field accessors
/// read the store directly and never fail, so they can gate work synchronously.
#[derive(Debug)]
pub struct CapabilityRequires<P> {
    relation_name: String,
    state: NegotiationState,
    payload: PhantomData<P>,
}

impl<P> CapabilityRequires<P>
where
    P: CapabilityPayload,
{
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            state: NegotiationState::default(),
            payload: PhantomData,
        }
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// State reached by the last notification
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Handle a change notification for relation `relation_id`
    #[instrument(skip(self, store), fields(relation = %self.relation_name))]
    pub fn on_relation_changed(
        &mut self,
        store: &dyn RelationStore,
        relation_id: RelationId,
    ) -> Option<CapabilityAvailable<P>> {
        let Some(relation) = store.relation_by_id(&self.relation_name, relation_id) else {
            debug!("relation not established");
            self.state = NegotiationState::NoRelation;
            return None;
        };

        let Some(remote_app) = relation.remote_app.as_deref() else {
            warn!("No remote application in relation: {}", self.relation_name);
            self.state = NegotiationState::AwaitingData;
            return None;
        };

        let record = store.read(relation.id, remote_app).unwrap_or_default();
        match P::validate(&record) {
            Validation::Complete(payload) => {
                info!(
                    capability = P::CAPABILITY,
                    remote_app, "capability available in relation data"
                );
                self.state = NegotiationState::Available;
                Some(CapabilityAvailable {
                    relation_id,
                    payload,
                })
            }
            Validation::Incomplete(missing) => {
                info!(
                    capability = P::CAPABILITY,
                    ?missing,
                    "No {} in relation data - not signalling availability",
                    missing.first().copied().unwrap_or_default()
                );
                self.state = NegotiationState::AwaitingData;
                None
            }
        }
    }

    /// The relation is being torn down, its data is gone for good
    pub fn on_relation_broken(&mut self) {
        debug!(relation = %self.relation_name, "relation broken");
        self.state = NegotiationState::NoRelation;
    }

    /// One consistent read of the peer's record, validated
    pub fn snapshot(&self, store: &dyn RelationStore) -> Validation<P> {
        P::validate(&self.remote_record(store).unwrap_or_default())
    }

    /// Same as [`Self::snapshot`], for the relation with id `relation_id`
    pub fn snapshot_for(
        &self,
        store: &dyn RelationStore,
        relation_id: RelationId,
    ) -> Validation<P> {
        P::validate(&self.remote_record_for(store, relation_id).unwrap_or_default())
    }

    /// Peer's side of the first relation with our name
    pub fn remote_record(&self, store: &dyn RelationStore) -> Option<RelationRecord> {
        let relation = store.relation(&self.relation_name)?;
        self.remote_record_for(store, relation.id)
    }

    fn remote_record_for(
        &self,
        store: &dyn RelationStore,
        relation_id: RelationId,
    ) -> Option<RelationRecord> {
        let relation = store.relation_by_id(&self.relation_name, relation_id)?;
        let remote_app = relation.remote_app?;
        store.read(relation.id, &remote_app)
    }

    /// Value of `key` in the peer's record, `None` when absent or empty
    pub fn field(&self, store: &dyn RelationStore, key: &str) -> Option<String> {
        self.remote_record(store)?
            .remove(key)
            .filter(|value| !value.is_empty())
    }

    pub fn is_field_available(&self, store: &dyn RelationStore, key: &str) -> bool {
        self.field(store, key).is_some()
    }
}

/// Generates a typed value accessor and availability check per payload field
macro_rules! field_accessors {
    ($($field:ident, $available:ident => $key:expr;)*) => {
        $(
            #[doc = concat!("`", stringify!($field), "` from relation data")]
            pub fn $field(&self, store: &dyn $crate::RelationStore) -> Option<String> {
                self.requires.field(store, $key)
            }

            #[doc = concat!("Whether `", stringify!($field), "` is available in relation data")]
            pub fn $available(&self, store: &dyn $crate::RelationStore) -> bool {
                self.requires.is_field_available(store, $key)
            }
        )*
    };
}

pub(crate) use field_accessors;

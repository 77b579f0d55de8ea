use std::marker::PhantomData;

use tracing::{debug, instrument};

use crate::error::RelationError;
use crate::schema::CapabilityPayload;
use crate::store::{RelationId, RelationStore};

/// Provider side of a capability interface.
///
/// Publishing merges the payload fields into the local application's side of the
/// relation, so keys written by anything else survive and re-publishing is a no-op.
#[derive(Debug)]
pub struct CapabilityProvides<P> {
    relation_name: String,
    payload: PhantomData<P>,
}

impl<P> CapabilityProvides<P>
where
    P: CapabilityPayload,
{
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            payload: PhantomData,
        }
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    #[instrument(skip(self, store, payload), fields(relation = %self.relation_name))]
    pub fn publish(
        &self,
        store: &mut dyn RelationStore,
        relation_id: RelationId,
        payload: &P,
    ) -> Result<(), RelationError> {
        if store
            .relation_by_id(&self.relation_name, relation_id)
            .is_none()
        {
            return Err(RelationError::RelationNotEstablished {
                relation: self.relation_name.clone(),
                id: relation_id,
            });
        }

        store.update(relation_id, &payload.to_record())?;
        debug!(capability = P::CAPABILITY, "published capability");
        Ok(())
    }
}

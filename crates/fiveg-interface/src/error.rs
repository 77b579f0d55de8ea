use crate::store::RelationId;

/// Errors raised while reading or writing relation data
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationError {
    /// The relation instance has not been established for this application
    #[error("Relation {relation} (id {id}) not created yet")]
    RelationNotEstablished { relation: String, id: RelationId },
    /// No relation instance with this id exists in the store
    #[error("Unknown relation id {0}")]
    UnknownRelation(RelationId),
}

//!
//! # 5G network function relation interfaces
//!
//! Each interface is a fixed set of string fields that one application (the provider)
//! publishes into its side of a relation and that the peer (the requirer) waits for.
//! Providers merge their fields through [`CapabilityProvides`], requirers watch for
//! completeness through [`CapabilityRequires`].
//!

mod error;
mod provides;
mod requires;
mod schema;
mod store;

pub mod nrf;
pub mod upf;

pub use error::RelationError;
pub use provides::CapabilityProvides;
pub use requires::{CapabilityAvailable, CapabilityRequires, NegotiationState};
pub use schema::{CapabilityPayload, Validation};
pub use store::{MemoryRelationStore, Relation, RelationId, RelationRecord, RelationStore};

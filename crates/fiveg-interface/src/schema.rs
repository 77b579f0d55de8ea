use std::fmt::Debug;

use crate::store::RelationRecord;

/// A capability published over a relation as a fixed set of string fields
pub trait CapabilityPayload: Sized + Clone + Debug + PartialEq {
    /// Relation keys making up the payload, all of them required
    const FIELDS: &'static [&'static str];

    /// Name used in log messages and signals, e.g. `nrf`
    const CAPABILITY: &'static str;

    /// Build the payload from a record already known to hold every field
    fn from_record(record: &RelationRecord) -> Self;

    fn to_record(&self) -> RelationRecord;

    /// Check a record snapshot for completeness.
    ///
    /// A field counts as present only if it is set and non-empty.
    fn validate(record: &RelationRecord) -> Validation<Self> {
        let missing: Vec<&'static str> = Self::FIELDS
            .iter()
            .copied()
            .filter(|key| !has_value(record, key))
            .collect();

        if missing.is_empty() {
            Validation::Complete(Self::from_record(record))
        } else {
            Validation::Incomplete(missing)
        }
    }
}

/// Outcome of checking a record against a capability schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation<P> {
    Complete(P),
    /// Required keys absent from the record, in schema order
    Incomplete(Vec<&'static str>),
}

impl<P> Validation<P> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            Self::Complete(payload) => Some(payload),
            Self::Incomplete(_) => None,
        }
    }

    pub fn into_payload(self) -> Option<P> {
        match self {
            Self::Complete(payload) => Some(payload),
            Self::Incomplete(_) => None,
        }
    }

    pub fn missing(&self) -> &[&'static str] {
        match self {
            Self::Complete(_) => &[],
            Self::Incomplete(missing) => missing,
        }
    }
}

pub(crate) fn has_value(record: &RelationRecord, key: &str) -> bool {
    record.get(key).is_some_and(|value| !value.is_empty())
}

/// Value of `key`, empty when absent
pub(crate) fn field(record: &RelationRecord, key: &str) -> String {
    record.get(key).cloned().unwrap_or_default()
}

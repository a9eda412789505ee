//! Entity types and identity management.
//!
//! Entities are the shared vocabulary of both engines: every disease and
//! symptom extracted from the knowledge base becomes exactly one `Entity`,
//! and both the graph store and the probabilistic network reference it by
//! its [`EntityId`]. Identity is resolved by normalized name, so the same
//! mention in two different sentences resolves to the same id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Namespace under which deterministic entity ids are derived.
const ENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x8f2d_41bc_a0e7_4c55_9d3a_6b1f_02c8_77e4);

/// Globally unique, stable entity identifier.
///
/// Ids are deterministic: they are derived (UUIDv5) from the entity kind and
/// the normalized name, so rebuilding the knowledge base from the same facts
/// reproduces identical ids regardless of processing order.
///
/// # Examples
///
/// ```
/// use nosograph::{EntityId, EntityKind};
///
/// let a = EntityId::derive(EntityKind::Symptom, "fever");
/// let b = EntityId::derive(EntityKind::Symptom, "fever");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Derives the stable id for a kind and normalized name.
    #[must_use]
    pub fn derive(kind: EntityKind, normalized_name: &str) -> Self {
        let tagged = format!("{kind}:{normalized_name}");
        Self(Uuid::new_v5(&ENTITY_NAMESPACE, tagged.as_bytes()))
    }

    /// Creates an entity id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Classification of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityKind {
    /// A diagnosable condition.
    Disease,
    /// An observable finding that supports a diagnosis.
    Symptom,
}

impl TryFrom<String> for EntityKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("disease") {
            Ok(Self::Disease)
        } else if value.eq_ignore_ascii_case("symptom") {
            Ok(Self::Symptom)
        } else {
            Err(format!("unknown entity kind: {value}. Use disease or symptom"))
        }
    }
}

impl From<EntityKind> for String {
    fn from(value: EntityKind) -> Self {
        match value {
            EntityKind::Disease => "disease".to_string(),
            EntityKind::Symptom => "symptom".to_string(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disease => write!(f, "disease"),
            Self::Symptom => write!(f, "symptom"),
        }
    }
}

/// Normalizes a raw mention into the canonical dedup key.
///
/// Rules (documented contract, see also `extract`):
/// - leading/trailing whitespace is stripped
/// - internal whitespace runs collapse to a single space
/// - the result is lowercased
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapses whitespace but preserves the original casing.
///
/// Used for the display name, which keeps the casing of the first mention.
#[must_use]
pub fn display_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A named node representing a disease or symptom.
///
/// Entities are created during extraction and immutable afterward. Two
/// mentions with the same normalized name resolve to the same id; the
/// display name keeps the casing of the first mention seen.
///
/// # Examples
///
/// ```
/// use nosograph::{Entity, EntityKind};
///
/// let flu = Entity::new("Flu", EntityKind::Disease).unwrap();
/// assert_eq!(flu.name, "Flu");
/// assert_eq!(flu.normalized(), "flu");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable deterministic identifier.
    pub id: EntityId,

    /// Display name (whitespace-collapsed, first-seen casing).
    pub name: String,

    /// Disease or symptom.
    pub kind: EntityKind,
}

impl Entity {
    /// Creates an entity from a raw mention.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyEntityName`] if the mention is empty
    /// after normalization.
    pub fn new(raw_name: &str, kind: EntityKind) -> Result<Self, ValidationError> {
        let normalized = normalize_name(raw_name);
        if normalized.is_empty() {
            return Err(ValidationError::EmptyEntityName);
        }
        Ok(Self {
            id: EntityId::derive(kind, &normalized),
            name: display_name(raw_name),
            kind,
        })
    }

    /// Returns the normalized dedup key for this entity.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_name(&self.name)
    }

    /// Returns true if this entity is a disease.
    #[must_use]
    pub const fn is_disease(&self) -> bool {
        matches!(self.kind, EntityKind::Disease)
    }

    /// Returns true if this entity is a symptom.
    #[must_use]
    pub const fn is_symptom(&self) -> bool {
        matches!(self.kind, EntityKind::Symptom)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_deterministic() {
        let a = EntityId::derive(EntityKind::Disease, "flu");
        let b = EntityId::derive(EntityKind::Disease, "flu");
        assert_eq!(a, b);
    }

    #[test]
    fn derived_ids_separate_kinds() {
        // A disease and a symptom that share a name must not collide.
        let d = EntityId::derive(EntityKind::Disease, "anemia");
        let s = EntityId::derive(EntityKind::Symptom, "anemia");
        assert_ne!(d, s);
    }

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(normalize_name("  Shortness   of Breath "), "shortness of breath");
        assert_eq!(normalize_name("Fever"), "fever");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn display_name_preserves_case() {
        assert_eq!(display_name("  Common   Cold "), "Common Cold");
    }

    #[test]
    fn same_normalized_name_same_entity() {
        let a = Entity::new("Fever", EntityKind::Symptom).unwrap();
        let b = Entity::new("  fever ", EntityKind::Symptom).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name, "Fever");
        assert_eq!(b.name, "fever");
    }

    #[test]
    fn empty_name_rejected() {
        let err = Entity::new("   ", EntityKind::Disease).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyEntityName));
    }

    #[test]
    fn kind_serde_is_string() {
        let v = serde_json::to_value(EntityKind::Disease).unwrap();
        assert_eq!(v, serde_json::Value::String("disease".to_string()));

        let parsed: EntityKind = serde_json::from_str("\"Symptom\"").unwrap();
        assert_eq!(parsed, EntityKind::Symptom);

        let unknown: Result<EntityKind, _> = serde_json::from_str("\"finding\"");
        assert!(unknown.is_err());
    }

    #[test]
    fn entity_serialization_round_trips() {
        let entity = Entity::new("Pneumonia", EntityKind::Disease).unwrap();
        let json = serde_json::to_string(&entity).unwrap();
        let decoded: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(entity.id, decoded.id);
        assert_eq!(entity.name, decoded.name);
    }

    #[test]
    fn entity_equality_is_by_id() {
        let a = Entity::new("Cough", EntityKind::Symptom).unwrap();
        let b = Entity::new("COUGH", EntityKind::Symptom).unwrap();
        assert_eq!(a, b);
    }
}

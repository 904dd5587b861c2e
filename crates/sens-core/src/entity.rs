//! # Entity Identifiers
//!
//! An entity is a data owner: the unit of privacy protection. Entities are
//! addressed by position on the trailing axis of every contribution tensor,
//! so an [`EntityId`] is only meaningful together with the [`EntityCount`]
//! of the computation it belongs to.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError, ShapeError};

/// Index of an entity on the trailing contribution axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(usize);

impl EntityId {
    /// Create an entity identifier from its axis index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of this entity on the entity axis.
    pub fn index(self) -> usize {
        self.0
    }

    /// Check that this entity exists in a computation over `count` entities.
    pub fn check(self, count: EntityCount) -> Result<Self> {
        if self.0 < count.get() {
            Ok(self)
        } else {
            Err(ShapeError::EntityOutOfRange {
                entity: self.0,
                count: count.get(),
            }
            .into())
        }
    }
}

impl From<usize> for EntityId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Number of known entities `E`, fixed for the lifetime of a computation.
///
/// Always at least one: a contribution tensor with an empty entity axis
/// has no meaningful bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityCount(usize);

impl EntityCount {
    /// Validate and wrap an entity count.
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(ShapeError::EmptyEntityAxis.into());
        }
        Ok(Self(count))
    }

    /// The raw count.
    pub fn get(self) -> usize {
        self.0
    }

    /// Iterate over every entity of the computation.
    pub fn entities(self) -> impl Iterator<Item = EntityId> {
        (0..self.0).map(EntityId)
    }
}

impl TryFrom<usize> for EntityCount {
    type Error = SensitivityError;

    fn try_from(count: usize) -> Result<Self> {
        Self::new(count)
    }
}

impl<'de> Deserialize<'de> for EntityCount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = usize::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for EntityCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

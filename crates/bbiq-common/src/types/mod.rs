//! Common types exchanged through the import queue

mod entity;
pub mod sections;

pub use entity::{Alias, EntityData, Identifier, Link, Metadata, QueuedEntity, Relationship};

use crate::error::BbiqError;
use serde::{Deserialize, Serialize};

/// Entity kinds the importer knows how to validate and persist.
///
/// New kinds are added here; the compiler then points at every dispatch site
/// that has to handle them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Author,
    Edition,
    EditionGroup,
    Publisher,
    Series,
    Work,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Author,
        EntityType::Edition,
        EntityType::EditionGroup,
        EntityType::Publisher,
        EntityType::Series,
        EntityType::Work,
    ];

    /// Tag used on the wire and in the import tables
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Author => "Author",
            EntityType::Edition => "Edition",
            EntityType::EditionGroup => "EditionGroup",
            EntityType::Publisher => "Publisher",
            EntityType::Series => "Series",
            EntityType::Work => "Work",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = BbiqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BbiqError::UnsupportedEntityType(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trips_through_str() {
        for kind in EntityType::ALL {
            assert_eq!(kind.as_str().parse::<EntityType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_entity_type_is_case_sensitive() {
        assert!("author".parse::<EntityType>().is_err());
        assert!(matches!(
            "Bogus".parse::<EntityType>(),
            Err(BbiqError::UnsupportedEntityType(tag)) if tag == "Bogus"
        ));
    }
}

//! Entity identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of entity a signal addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Thing,
    Policy,
    Connection,
}

/// Returned when a `namespace:name` id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entity id <{0}> is not of the form <namespace>:<name>")]
pub struct InvalidEntityId(pub String);

/// A `namespace:name` identifier of a thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThingId {
    namespace: String,
    name: String,
}

impl ThingId {
    /// # Errors
    ///
    /// Returns `InvalidEntityId` if `name` is empty.
    pub fn new(namespace: &str, name: &str) -> Result<Self, InvalidEntityId> {
        if name.is_empty() {
            return Err(InvalidEntityId(format!("{namespace}:{name}")));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidEntityId` if there is no `:` separator or the name is empty.
    pub fn parse(value: &str) -> Result<Self, InvalidEntityId> {
        let (namespace, name) = value
            .split_once(':')
            .ok_or_else(|| InvalidEntityId(value.to_string()))?;
        Self::new(namespace, name)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl TryFrom<String> for ThingId {
    type Error = InvalidEntityId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ThingId> for String {
    fn from(id: ThingId) -> Self {
        id.to_string()
    }
}

/// Typed entity id, as carried by acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityId {
    #[must_use]
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

impl From<&ThingId> for EntityId {
    fn from(thing_id: &ThingId) -> Self {
        Self::new(EntityType::Thing, thing_id.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_thing_id() {
        let id = ThingId::parse("org.example:sensor-1").unwrap();
        assert_eq!(id.namespace(), "org.example");
        assert_eq!(id.name(), "sensor-1");
        assert_eq!(id.to_string(), "org.example:sensor-1");
    }

    #[test]
    fn empty_namespace_is_allowed() {
        assert_eq!(ThingId::parse(":x").unwrap().namespace(), "");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ThingId::parse("no-separator").is_err());
        assert!(ThingId::parse("ns:").is_err());
    }

    #[test]
    fn entity_id_from_thing_id() {
        let thing = ThingId::parse("a:b").unwrap();
        let entity = EntityId::from(&thing);
        assert_eq!(entity.entity_type, EntityType::Thing);
        assert_eq!(entity.id, "a:b");
    }
}

//! # Identity and Classification Types
//!
//! The bridge correlates several independent identifier spaces. Each of them
//! gets its own wrapper type so that a network handle can never be passed
//! where an actor id is expected.
//!
//! - [`ActorId`] - locally unique, durable identifier of a simulated actor
//! - [`WireObjectHandle`] - session-scoped handle assigned by the network runtime
//! - [`EntityIdentifier`] - DIS `site:application:entity` triple
//! - [`EntityType`] - DIS seven-field entity classification
//! - [`ActorType`] - category/name of a simulation actor class
//! - [`ObjectTypeBinding`] - class descriptor used to encode and decode an object

use crate::pdu::wire::{WireReader, WireWriter};
use crate::pdu::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of an actor in the local simulation.
///
/// Wraps a UUID. Assigned once by whoever creates the actor and never
/// changed afterwards.
///
/// ```rust
/// use disgate_protocol::ActorId;
///
/// let id = ActorId::new();
/// let parsed: ActorId = id.to_string().parse()?;
/// assert_eq!(id, parsed);
/// # Ok::<(), uuid::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Creates a new random actor id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle naming an object instance inside one network session.
///
/// Handles are handed out by the bridge when an object is published or
/// discovered and lose their meaning once the session is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireObjectHandle(pub u32);

impl fmt::Display for WireObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A DIS entity identifier.
///
/// Unlike [`WireObjectHandle`], an entity identifier stays meaningful across
/// reconnects: a simulator keeps publishing the same triple for the same
/// entity for the whole exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityIdentifier {
    pub site: u16,
    pub application: u16,
    pub entity: u16,
}

impl EntityIdentifier {
    /// Encoded size on the wire, in bytes.
    pub const ENCODED_LEN: usize = 6;

    pub const fn new(site: u16, application: u16, entity: u16) -> Self {
        Self { site, application, entity }
    }

    pub fn encode(&self, writer: &mut WireWriter) {
        writer.put_u16(self.site);
        writer.put_u16(self.application);
        writer.put_u16(self.entity);
    }

    pub fn decode(reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            site: reader.get_u16()?,
            application: reader.get_u16()?,
            entity: reader.get_u16()?,
        })
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.site, self.application, self.entity)
    }
}

/// A DIS entity type (kind, domain, country, category, subcategory,
/// specific, extra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityType {
    pub kind: u8,
    pub domain: u8,
    pub country: u16,
    pub category: u8,
    pub subcategory: u8,
    pub specific: u8,
    pub extra: u8,
}

impl EntityType {
    pub const ENCODED_LEN: usize = 8;

    pub const fn new(
        kind: u8,
        domain: u8,
        country: u16,
        category: u8,
        subcategory: u8,
        specific: u8,
        extra: u8,
    ) -> Self {
        Self { kind, domain, country, category, subcategory, specific, extra }
    }

    pub fn encode(&self, writer: &mut WireWriter) {
        writer.put_u8(self.kind);
        writer.put_u8(self.domain);
        writer.put_u16(self.country);
        writer.put_u8(self.category);
        writer.put_u8(self.subcategory);
        writer.put_u8(self.specific);
        writer.put_u8(self.extra);
    }

    pub fn decode(reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            kind: reader.get_u8()?,
            domain: reader.get_u8()?,
            country: reader.get_u16()?,
            category: reader.get_u8()?,
            subcategory: reader.get_u8()?,
            specific: reader.get_u8()?,
            extra: reader.get_u8()?,
        })
    }

    /// Ranks how well `candidate` (an incoming entity type) matches this
    /// configured pattern.
    ///
    /// Zero fields in the pattern act as wildcards. Returns `None` when a
    /// non-wildcard field differs, otherwise the number of fields that
    /// matched exactly. Higher ranks are more specific matches.
    pub fn rank_match(&self, candidate: &EntityType) -> Option<u32> {
        let pairs = [
            (self.kind as u32, candidate.kind as u32),
            (self.domain as u32, candidate.domain as u32),
            (self.country as u32, candidate.country as u32),
            (self.category as u32, candidate.category as u32),
            (self.subcategory as u32, candidate.subcategory as u32),
            (self.specific as u32, candidate.specific as u32),
            (self.extra as u32, candidate.extra as u32),
        ];

        let mut rank = 0;
        for (pattern, value) in pairs {
            if pattern == 0 {
                continue;
            }
            if pattern != value {
                return None;
            }
            rank += 1;
        }
        Some(rank)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}.{}",
            self.kind, self.domain, self.country, self.category, self.subcategory, self.specific, self.extra
        )
    }
}

/// Error returned when a dotted entity type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity type '{0}': expected seven dot-separated numbers")]
pub struct ParseEntityTypeError(pub String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    /// Parses `kind.domain.country.category.subcategory.specific.extra`.
    /// Trailing fields may be omitted and default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEntityTypeError(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 7 {
            return Err(invalid());
        }

        let mut fields = [0u16; 7];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part.trim().parse::<u16>().map_err(|_| invalid())?;
        }

        let narrow = |value: u16| u8::try_from(value).map_err(|_| invalid());
        Ok(Self {
            kind: narrow(fields[0])?,
            domain: narrow(fields[1])?,
            country: fields[2],
            category: narrow(fields[3])?,
            subcategory: narrow(fields[4])?,
            specific: narrow(fields[5])?,
            extra: narrow(fields[6])?,
        })
    }
}

impl Serialize for EntityType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Category and name of a simulation actor class, e.g. `vehicles.tank`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ActorType {
    pub category: String,
    pub name: String,
}

impl ActorType {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self { category: category.into(), name: name.into() }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.name)
    }
}

/// Class descriptor tying a network object class to a local actor type.
///
/// Attached to a wire handle so that later updates for that object can be
/// decoded without searching the mapping table again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectTypeBinding {
    /// Network object class name, e.g. `BaseEntity.PhysicalEntity.Platform.GroundVehicle`
    pub object_class: String,
    /// Local actor type created for objects of this class
    pub actor_type: ActorType,
    /// DIS entity type published for, or matched against, this class
    #[serde(default)]
    pub entity_type: Option<EntityType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_parses_partial_strings() {
        let full: EntityType = "1.1.225.1.1.3.0".parse().unwrap();
        assert_eq!(full, EntityType::new(1, 1, 225, 1, 1, 3, 0));

        let partial: EntityType = "1.2".parse().unwrap();
        assert_eq!(partial, EntityType::new(1, 2, 0, 0, 0, 0, 0));

        assert!("1.2.3.4.5.6.7.8".parse::<EntityType>().is_err());
        assert!("1.x".parse::<EntityType>().is_err());
        assert!("300.1".parse::<EntityType>().is_err());
    }

    #[test]
    fn entity_type_display_round_trips() {
        let original = EntityType::new(1, 2, 225, 1, 4, 0, 9);
        let text = original.to_string();
        assert_eq!(text, "1.2.225.1.4.0.9");
        assert_eq!(text.parse::<EntityType>().unwrap(), original);
    }

    #[test]
    fn rank_match_prefers_more_specific_patterns() {
        let incoming = EntityType::new(1, 1, 225, 1, 1, 3, 0);

        let generic = EntityType::new(1, 1, 0, 0, 0, 0, 0);
        let specific = EntityType::new(1, 1, 225, 1, 1, 0, 0);
        let wrong_domain = EntityType::new(1, 2, 0, 0, 0, 0, 0);

        assert_eq!(generic.rank_match(&incoming), Some(2));
        assert_eq!(specific.rank_match(&incoming), Some(5));
        assert_eq!(wrong_domain.rank_match(&incoming), None);
    }

    #[test]
    fn entity_identifier_displays_as_triple() {
        assert_eq!(EntityIdentifier::new(1, 2, 3).to_string(), "1:2:3");
    }
}

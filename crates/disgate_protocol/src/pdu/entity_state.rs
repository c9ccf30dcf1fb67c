//! Entity State PDU (type 1).

use super::header::{family, PduHeader, PduType};
use super::wire::{WireReader, WireWriter};
use super::CodecError;
use crate::types::{EntityIdentifier, EntityType};

/// Dead reckoning parameters carried with every entity state update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadReckoning {
    pub algorithm: u8,
    /// Algorithm specific parameters, kept opaque
    pub other_parameters: [u8; 15],
    pub linear_acceleration: [f32; 3],
    pub angular_velocity: [f32; 3],
}

/// Entity marking: character set plus 11 bytes of text, zero padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Marking {
    pub charset: u8,
    pub characters: [u8; 11],
}

impl Marking {
    pub const ASCII: u8 = 1;

    /// Builds an ASCII marking, truncating to 11 bytes.
    pub fn ascii(text: &str) -> Self {
        let mut characters = [0u8; 11];
        for (slot, byte) in characters.iter_mut().zip(text.bytes().filter(u8::is_ascii)) {
            *slot = byte;
        }
        Self { charset: Self::ASCII, characters }
    }

    pub fn text(&self) -> String {
        let end = self.characters.iter().position(|&c| c == 0).unwrap_or(self.characters.len());
        String::from_utf8_lossy(&self.characters[..end]).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityStatePdu {
    pub header: PduHeader,
    pub entity_id: EntityIdentifier,
    pub force_id: u8,
    pub entity_type: EntityType,
    pub alternative_entity_type: EntityType,
    pub linear_velocity: [f32; 3],
    /// Geocentric world coordinates in meters
    pub location: [f64; 3],
    /// Euler angles psi, theta, phi in radians
    pub orientation: [f32; 3],
    pub appearance: u32,
    pub dead_reckoning: DeadReckoning,
    pub marking: Marking,
    pub capabilities: u32,
    /// Articulation and attached part records, 16 bytes each, uninterpreted
    pub articulations: Vec<[u8; 16]>,
}

impl EntityStatePdu {
    pub const FIXED_LEN: usize = 144;
    pub const ARTICULATION_LEN: usize = 16;

    pub fn new(protocol_version: u8, exercise_id: u8, entity_id: EntityIdentifier, entity_type: EntityType) -> Self {
        Self {
            header: PduHeader::new(PduType::ENTITY_STATE, family::ENTITY_INFORMATION, protocol_version, exercise_id),
            entity_id,
            force_id: 0,
            entity_type,
            alternative_entity_type: entity_type,
            linear_velocity: [0.0; 3],
            location: [0.0; 3],
            orientation: [0.0; 3],
            appearance: 0,
            dead_reckoning: DeadReckoning::default(),
            marking: Marking::default(),
            capabilities: 0,
            articulations: Vec::new(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        Self::FIXED_LEN + self.articulations.len() * Self::ARTICULATION_LEN
    }

    pub(crate) fn encode_body(&self, writer: &mut WireWriter) -> Result<(), CodecError> {
        let count = u8::try_from(self.articulations.len())
            .map_err(|_| CodecError::TooManyArticulations { count: self.articulations.len() })?;

        self.entity_id.encode(writer);
        writer.put_u8(self.force_id);
        writer.put_u8(count);
        self.entity_type.encode(writer);
        self.alternative_entity_type.encode(writer);
        for v in self.linear_velocity {
            writer.put_f32(v);
        }
        for v in self.location {
            writer.put_f64(v);
        }
        for v in self.orientation {
            writer.put_f32(v);
        }
        writer.put_u32(self.appearance);

        let dr = &self.dead_reckoning;
        writer.put_u8(dr.algorithm);
        writer.put_bytes(&dr.other_parameters);
        for v in dr.linear_acceleration {
            writer.put_f32(v);
        }
        for v in dr.angular_velocity {
            writer.put_f32(v);
        }

        writer.put_u8(self.marking.charset);
        writer.put_bytes(&self.marking.characters);
        writer.put_u32(self.capabilities);

        for record in &self.articulations {
            writer.put_bytes(record);
        }
        Ok(())
    }

    pub(crate) fn decode_body(header: PduHeader, reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let entity_id = EntityIdentifier::decode(reader)?;
        let force_id = reader.get_u8()?;
        let count = reader.get_u8()? as usize;

        let declared = header.length as usize;
        let expected = Self::FIXED_LEN + count * Self::ARTICULATION_LEN;
        if declared != expected {
            return Err(CodecError::BodyMismatch { pdu_type: header.pdu_type.0, declared, expected });
        }

        let entity_type = EntityType::decode(reader)?;
        let alternative_entity_type = EntityType::decode(reader)?;
        let linear_velocity = [reader.get_f32()?, reader.get_f32()?, reader.get_f32()?];
        let location = [reader.get_f64()?, reader.get_f64()?, reader.get_f64()?];
        let orientation = [reader.get_f32()?, reader.get_f32()?, reader.get_f32()?];
        let appearance = reader.get_u32()?;

        let dead_reckoning = DeadReckoning {
            algorithm: reader.get_u8()?,
            other_parameters: reader.get_array()?,
            linear_acceleration: [reader.get_f32()?, reader.get_f32()?, reader.get_f32()?],
            angular_velocity: [reader.get_f32()?, reader.get_f32()?, reader.get_f32()?],
        };
        let marking = Marking { charset: reader.get_u8()?, characters: reader.get_array()? };
        let capabilities = reader.get_u32()?;

        let mut articulations = Vec::with_capacity(count);
        for _ in 0..count {
            articulations.push(reader.get_array()?);
        }

        Ok(Self {
            header,
            entity_id,
            force_id,
            entity_type,
            alternative_entity_type,
            linear_velocity,
            location,
            orientation,
            appearance,
            dead_reckoning,
            marking,
            capabilities,
            articulations,
        })
    }
}

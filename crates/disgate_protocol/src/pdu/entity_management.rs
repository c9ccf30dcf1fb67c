//! Create Entity (type 11) and Remove Entity (type 12) PDUs.
//!
//! Both share the simulation management layout: originating entity,
//! receiving entity and a request id.

use super::header::{family, PduHeader, PduType};
use super::wire::{WireReader, WireWriter};
use super::CodecError;
use crate::types::EntityIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityManagementPdu {
    pub header: PduHeader,
    pub originating: EntityIdentifier,
    pub receiving: EntityIdentifier,
    pub request_id: u32,
}

impl EntityManagementPdu {
    pub const ENCODED_LEN: usize = 28;

    /// A Remove Entity request announcing that `entity` has left the exercise.
    pub fn remove(protocol_version: u8, exercise_id: u8, entity: EntityIdentifier, request_id: u32) -> Self {
        Self {
            header: PduHeader::new(PduType::REMOVE_ENTITY, family::SIMULATION_MANAGEMENT, protocol_version, exercise_id),
            originating: entity,
            receiving: entity,
            request_id,
        }
    }

    pub fn create(protocol_version: u8, exercise_id: u8, entity: EntityIdentifier, request_id: u32) -> Self {
        Self {
            header: PduHeader::new(PduType::CREATE_ENTITY, family::SIMULATION_MANAGEMENT, protocol_version, exercise_id),
            originating: entity,
            receiving: entity,
            request_id,
        }
    }

    pub(crate) fn encode_body(&self, writer: &mut WireWriter) {
        self.originating.encode(writer);
        self.receiving.encode(writer);
        writer.put_u32(self.request_id);
    }

    pub(crate) fn decode_body(header: PduHeader, reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let declared = header.length as usize;
        if declared != Self::ENCODED_LEN {
            return Err(CodecError::BodyMismatch {
                pdu_type: header.pdu_type.0,
                declared,
                expected: Self::ENCODED_LEN,
            });
        }
        Ok(Self {
            header,
            originating: EntityIdentifier::decode(reader)?,
            receiving: EntityIdentifier::decode(reader)?,
            request_id: reader.get_u32()?,
        })
    }
}

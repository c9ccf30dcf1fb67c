//! # DIS PDU Codec
//!
//! Binary encoding and decoding of the PDUs the bridge exchanges. Three
//! types are understood natively (Entity State, Create Entity and Remove
//! Entity); every other type is carried as a [`RawPdu`] so that plugin
//! adaptors can interpret it.
//!
//! Decoding is strict: the header's length field must fit the input and,
//! for the native types, match the size the body actually decodes to.
//! Encoding always recomputes the length field, so
//! `encode(decode(bytes)) == bytes` holds for every valid PDU.

mod entity_management;
mod entity_state;
mod error;
mod header;
pub mod wire;

pub use entity_management::EntityManagementPdu;
pub use entity_state::{DeadReckoning, EntityStatePdu, Marking};
pub use error::CodecError;
pub use header::{family, relative_timestamp, PduHeader, PduType};
pub use wire::ByteOrder;

use wire::{WireReader, WireWriter};

/// A PDU of a type the core codec does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPdu {
    pub header: PduHeader,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    EntityState(EntityStatePdu),
    CreateEntity(EntityManagementPdu),
    RemoveEntity(EntityManagementPdu),
    Other(RawPdu),
}

impl Pdu {
    pub fn header(&self) -> &PduHeader {
        match self {
            Pdu::EntityState(pdu) => &pdu.header,
            Pdu::CreateEntity(pdu) | Pdu::RemoveEntity(pdu) => &pdu.header,
            Pdu::Other(raw) => &raw.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut PduHeader {
        match self {
            Pdu::EntityState(pdu) => &mut pdu.header,
            Pdu::CreateEntity(pdu) | Pdu::RemoveEntity(pdu) => &mut pdu.header,
            Pdu::Other(raw) => &mut raw.header,
        }
    }

    pub fn pdu_type(&self) -> PduType {
        self.header().pdu_type
    }

    /// Serializes the PDU with a freshly computed length field.
    pub fn encode(&self, order: ByteOrder) -> Result<Vec<u8>, CodecError> {
        let mut writer = WireWriter::with_capacity(order, EntityStatePdu::FIXED_LEN);
        self.header().encode(&mut writer);

        match self {
            Pdu::EntityState(pdu) => pdu.encode_body(&mut writer)?,
            Pdu::CreateEntity(pdu) | Pdu::RemoveEntity(pdu) => pdu.encode_body(&mut writer),
            Pdu::Other(raw) => writer.put_bytes(&raw.body),
        }

        let len = writer.len();
        let length = u16::try_from(len).map_err(|_| CodecError::TooLarge { len })?;
        writer.patch_u16(LENGTH_OFFSET, length);
        Ok(writer.into_inner())
    }

    /// Decodes one PDU from the front of `bytes`.
    ///
    /// Returns the PDU and the number of bytes it occupied, so callers can
    /// walk several PDUs packed into one datagram.
    pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<(Pdu, usize), CodecError> {
        let mut reader = WireReader::new(bytes, order);
        let header = PduHeader::decode(&mut reader)?;

        let declared = header.length as usize;
        if declared < PduHeader::ENCODED_LEN || declared > bytes.len() {
            return Err(CodecError::InvalidLength {
                declared,
                min: PduHeader::ENCODED_LEN,
                available: bytes.len(),
            });
        }

        let mut body = WireReader::new(&bytes[PduHeader::ENCODED_LEN..declared], order);
        let pdu = match header.pdu_type {
            PduType::ENTITY_STATE => Pdu::EntityState(EntityStatePdu::decode_body(header, &mut body)?),
            PduType::CREATE_ENTITY => Pdu::CreateEntity(EntityManagementPdu::decode_body(header, &mut body)?),
            PduType::REMOVE_ENTITY => Pdu::RemoveEntity(EntityManagementPdu::decode_body(header, &mut body)?),
            _ => {
                let rest = body.remaining();
                Pdu::Other(RawPdu { header, body: body.get_bytes(rest)?.to_vec() })
            }
        };

        Ok((pdu, declared))
    }
}

/// Offset of the length field inside the header.
const LENGTH_OFFSET: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityIdentifier, EntityType};

    fn sample_entity_state() -> EntityStatePdu {
        let mut pdu = EntityStatePdu::new(6, 3, EntityIdentifier::new(1, 2, 3), EntityType::new(1, 1, 225, 1, 1, 3, 0));
        pdu.header.timestamp = 0xdead_beee;
        pdu.force_id = 1;
        pdu.location = [4_000_000.0, 350_000.5, 4_900_000.25];
        pdu.linear_velocity = [1.5, -2.0, 0.0];
        pdu.orientation = [0.1, 0.2, 0.3];
        pdu.appearance = 0x0001_0000;
        pdu.dead_reckoning.algorithm = 2;
        pdu.marking = Marking::ascii("TANK01");
        pdu.articulations.push([7u8; 16]);
        pdu
    }

    #[test]
    fn test_entity_state_layout() {
        let pdu = Pdu::EntityState(sample_entity_state());
        let bytes = pdu.encode(ByteOrder::Big).unwrap();

        assert_eq!(bytes.len(), 160);
        assert_eq!(bytes[0], 6);
        assert_eq!(bytes[1], 3);
        assert_eq!(bytes[2], 1);
        assert_eq!(bytes[3], family::ENTITY_INFORMATION);
        assert_eq!(&bytes[8..10], &160u16.to_be_bytes());
        // entity id right after the header
        assert_eq!(&bytes[12..18], &[0, 1, 0, 2, 0, 3]);
        // articulation count
        assert_eq!(bytes[19], 1);
    }

    #[test]
    fn test_decode_reencodes_identically_in_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let original = Pdu::EntityState(sample_entity_state());
            let bytes = original.encode(order).unwrap();
            let (decoded, consumed) = Pdu::decode(&bytes, order).unwrap();

            assert_eq!(consumed, bytes.len());
            assert_eq!(decoded.encode(order).unwrap(), bytes);

            let Pdu::EntityState(state) = decoded else {
                panic!("expected an entity state PDU");
            };
            assert_eq!(state.header.length as usize, bytes.len());
            assert_eq!(state.marking.text(), "TANK01");
        }
    }

    #[test]
    fn test_remove_entity_is_28_bytes() {
        let pdu = Pdu::RemoveEntity(EntityManagementPdu::remove(6, 1, EntityIdentifier::new(5, 6, 7), 42));
        let bytes = pdu.encode(ByteOrder::Big).unwrap();
        assert_eq!(bytes.len(), EntityManagementPdu::ENCODED_LEN);

        let (decoded, _) = Pdu::decode(&bytes, ByteOrder::Big).unwrap();
        assert_eq!(decoded.pdu_type(), PduType::REMOVE_ENTITY);
    }

    #[test]
    fn test_unknown_types_are_preserved_raw() {
        let mut bytes = vec![6, 1, 99, 4, 0, 0, 0, 1, 0, 16, 0, 0];
        bytes.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);

        let (pdu, consumed) = Pdu::decode(&bytes, ByteOrder::Big).unwrap();
        assert_eq!(consumed, 16);
        match &pdu {
            Pdu::Other(raw) => assert_eq!(raw.body, vec![0xaa, 0xbb, 0xcc, 0xdd]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(pdu.encode(ByteOrder::Big).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        let short_header = [6u8, 1, 1];
        assert!(matches!(
            Pdu::decode(&short_header, ByteOrder::Big),
            Err(CodecError::Truncated { .. })
        ));

        // length claims more than the datagram carries
        let overlong = [6u8, 1, 99, 4, 0, 0, 0, 0, 0, 200, 0, 0];
        assert!(matches!(
            Pdu::decode(&overlong, ByteOrder::Big),
            Err(CodecError::InvalidLength { declared: 200, .. })
        ));

        // length smaller than a header
        let underlong = [6u8, 1, 99, 4, 0, 0, 0, 0, 0, 4, 0, 0];
        assert!(matches!(
            Pdu::decode(&underlong, ByteOrder::Big),
            Err(CodecError::InvalidLength { declared: 4, .. })
        ));
    }

    #[test]
    fn test_entity_state_with_wrong_length_is_rejected() {
        let mut bytes = Pdu::EntityState(sample_entity_state()).encode(ByteOrder::Big).unwrap();
        // drop the articulation record and shrink the length field to match
        bytes.truncate(144);
        bytes[8..10].copy_from_slice(&144u16.to_be_bytes());

        assert_eq!(
            Pdu::decode(&bytes, ByteOrder::Big),
            Err(CodecError::BodyMismatch { pdu_type: 1, declared: 144, expected: 160 })
        );
    }

    #[test]
    fn test_body_mismatch_reports_the_implied_length() {
        let err = CodecError::BodyMismatch { pdu_type: 1, declared: 144, expected: 160 };
        assert_eq!(err.to_string(), "PDU type 1 declares 144 bytes but its body implies 160");
    }
}

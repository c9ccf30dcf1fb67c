use super::wire::{WireReader, WireWriter};
use super::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// DIS PDU type number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PduType(pub u8);

impl PduType {
    pub const ENTITY_STATE: PduType = PduType(1);
    pub const FIRE: PduType = PduType(2);
    pub const DETONATION: PduType = PduType(3);
    pub const CREATE_ENTITY: PduType = PduType(11);
    pub const REMOVE_ENTITY: PduType = PduType(12);

    pub fn name(&self) -> &'static str {
        match *self {
            Self::ENTITY_STATE => "EntityState",
            Self::FIRE => "Fire",
            Self::DETONATION => "Detonation",
            Self::CREATE_ENTITY => "CreateEntity",
            Self::REMOVE_ENTITY => "RemoveEntity",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Protocol family numbers used by the PDUs built here.
pub mod family {
    pub const ENTITY_INFORMATION: u8 = 1;
    pub const WARFARE: u8 = 2;
    pub const SIMULATION_MANAGEMENT: u8 = 5;
}

/// The 12-byte header shared by every PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub protocol_version: u8,
    pub exercise_id: u8,
    pub pdu_type: PduType,
    pub protocol_family: u8,
    pub timestamp: u32,
    /// Whole PDU length including this header. Recomputed on encode.
    pub length: u16,
    pub padding: u16,
}

impl PduHeader {
    pub const ENCODED_LEN: usize = 12;

    pub fn new(pdu_type: PduType, protocol_family: u8, protocol_version: u8, exercise_id: u8) -> Self {
        Self {
            protocol_version,
            exercise_id,
            pdu_type,
            protocol_family,
            timestamp: relative_timestamp(SystemTime::now()),
            length: 0,
            padding: 0,
        }
    }

    pub(crate) fn encode(&self, writer: &mut WireWriter) {
        writer.put_u8(self.protocol_version);
        writer.put_u8(self.exercise_id);
        writer.put_u8(self.pdu_type.0);
        writer.put_u8(self.protocol_family);
        writer.put_u32(self.timestamp);
        writer.put_u16(self.length);
        writer.put_u16(self.padding);
    }

    pub(crate) fn decode(reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            protocol_version: reader.get_u8()?,
            exercise_id: reader.get_u8()?,
            pdu_type: PduType(reader.get_u8()?),
            protocol_family: reader.get_u8()?,
            timestamp: reader.get_u32()?,
            length: reader.get_u16()?,
            padding: reader.get_u16()?,
        })
    }
}

/// DIS relative timestamp: units of 3600 s / 2^31 past the hour, low bit clear.
pub fn relative_timestamp(now: SystemTime) -> u32 {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let past_hour = (since_epoch.as_secs() % 3600) as f64 + f64::from(since_epoch.subsec_nanos()) / 1e9;
    let units = (past_hour / 3600.0 * f64::from(1u32 << 31)) as u32;
    units.min((1u32 << 31) - 1) << 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_relative_timestamp_is_marked_relative() {
        let at = UNIX_EPOCH + Duration::from_secs(7 * 3600 + 1800);
        let stamp = relative_timestamp(at);
        assert_eq!(stamp & 1, 0);
        // half past the hour is half the range
        assert_eq!(stamp >> 1, 1u32 << 30);
    }

    #[test]
    fn test_pdu_type_display() {
        assert_eq!(PduType::REMOVE_ENTITY.to_string(), "RemoveEntity(12)");
        assert_eq!(PduType(200).to_string(), "Unknown(200)");
    }
}

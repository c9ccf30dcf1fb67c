use thiserror::Error;

/// Errors raised while encoding or decoding PDUs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("invalid length field {declared}: must be at least {min} and at most {available}")]
    InvalidLength { declared: usize, min: usize, available: usize },

    #[error("PDU type {pdu_type} declares {declared} bytes but its body implies {expected}")]
    BodyMismatch { pdu_type: u8, declared: usize, expected: usize },

    #[error("encoded PDU of {len} bytes exceeds the 16-bit length field")]
    TooLarge { len: usize },

    #[error("{count} articulation records do not fit the 8-bit count field")]
    TooManyArticulations { count: usize },
}

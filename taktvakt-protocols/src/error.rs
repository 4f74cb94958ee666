use thiserror::Error;

/// Errors that can occur while parsing a captured frame.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Truncated {layer} header: need {needed} bytes, have {available}")]
    Truncated {
        layer: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("Not an IPv4 packet (version {0})")]
    InvalidIpVersion(u8),
    #[error("Invalid IPv4 header length {0}")]
    InvalidHeaderLength(u8),
    #[error("IPv4 total length {total} exceeds captured {captured} bytes")]
    TotalLengthMismatch { total: usize, captured: usize },
    #[error("Invalid TCP data offset {0}")]
    InvalidDataOffset(u8),
}

pub(crate) fn ensure(layer: &'static str, data: &[u8], needed: usize) -> Result<(), ParseError> {
    if data.len() < needed {
        Err(ParseError::Truncated {
            layer,
            needed,
            available: data.len(),
        })
    } else {
        Ok(())
    }
}

#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

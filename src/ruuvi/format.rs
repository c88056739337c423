use crate::ruuvi::decode::DecodeError;

/// Data format tag carried in the first payload byte
const RAW_V2_TAG: u8 = 5;

/// Advertisement layouts this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Data format 5 ("RAWv2")
    RawV2,
}

impl FormatVersion {
    pub fn tag(self) -> u8 {
        match self {
            FormatVersion::RawV2 => RAW_V2_TAG,
        }
    }
}

/// Identify the payload layout from its first byte
pub fn detect(payload: &[u8]) -> Result<FormatVersion, DecodeError> {
    match payload.first() {
        Some(&RAW_V2_TAG) => Ok(FormatVersion::RawV2),
        other => Err(DecodeError::UnrecognizedFormat(other.copied())),
    }
}

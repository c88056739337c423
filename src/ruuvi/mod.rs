//! RuuviTag advertisement decoding: format detection, RAWv2 layout and unit conversion
//!
//! see https://github.com/ruuvi/ruuvi-sensor-protocols/blob/master/dataformat_05.md

pub mod convert;
pub mod decode;
pub mod format;

pub use convert::convert;
pub use decode::{decode, DecodeError, RAW_V2_LEN};
pub use format::{detect, FormatVersion};

use crate::models::RawReading;

/// Detect the layout and decode in one step
pub fn decode_payload(payload: &[u8]) -> Result<RawReading, DecodeError> {
    let format = detect(payload)?;
    decode(payload, format)
}

use thiserror::Error;

use crate::models::{HardwareAddress, RawReading};
use crate::ruuvi::format::FormatVersion;

/// Length of a RAWv2 advertisement including the format tag
///
/// - Byte 0: Data format (5)
/// - Bytes 1-2: Temperature (signed 16-bit, 0.005°C resolution)
/// - Bytes 3-4: Humidity (unsigned 16-bit, 0.0025% resolution)
/// - Bytes 5-6: Pressure (unsigned 16-bit, +50000 Pa offset, 1 Pa resolution)
/// - Bytes 7-12: Acceleration X, Y, Z (signed 16-bit each, 0.001 g resolution)
/// - Bytes 13-14: Battery voltage (11 bits) + TX power (5 bits)
/// - Byte 15: Movement counter
/// - Bytes 16-17: Measurement sequence number
/// - Bytes 18-23: MAC address
pub const RAW_V2_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized data format {0:?}")]
    UnrecognizedFormat(Option<u8>),

    #[error("truncated payload: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Decode a payload whose layout was identified by `detect`
///
/// All-or-nothing: a short payload never yields a partial reading. Bytes past the
/// fixed layout are ignored and no range checks are applied to the raw values.
pub fn decode(payload: &[u8], format: FormatVersion) -> Result<RawReading, DecodeError> {
    match format {
        FormatVersion::RawV2 => {
            let window: &[u8; RAW_V2_LEN] = payload
                .get(..RAW_V2_LEN)
                .and_then(|window| window.try_into().ok())
                .ok_or(DecodeError::Truncated {
                    expected: RAW_V2_LEN,
                    actual: payload.len(),
                })?;
            Ok(RawReading::from_raw_v2(window))
        }
    }
}

impl RawReading {
    fn from_raw_v2(w: &[u8; RAW_V2_LEN]) -> Self {
        let be_u16 = |at: usize| u16::from_be_bytes([w[at], w[at + 1]]);
        let be_i16 = |at: usize| i16::from_be_bytes([w[at], w[at + 1]]);

        RawReading {
            temperature: be_i16(1),
            humidity: be_u16(3),
            pressure: be_u16(5),
            acceleration_x: be_i16(7),
            acceleration_y: be_i16(9),
            acceleration_z: be_i16(11),
            power_info: be_u16(13),
            movement_counter: w[15],
            measurement_sequence: be_u16(16),
            address: HardwareAddress([w[18], w[19], w[20], w[21], w[22], w[23]]),
        }
    }

    /// Serialize back into the RAWv2 wire layout, format tag included
    pub fn encode(&self) -> [u8; RAW_V2_LEN] {
        let mut out = [0u8; RAW_V2_LEN];
        out[0] = FormatVersion::RawV2.tag();
        out[1..3].copy_from_slice(&self.temperature.to_be_bytes());
        out[3..5].copy_from_slice(&self.humidity.to_be_bytes());
        out[5..7].copy_from_slice(&self.pressure.to_be_bytes());
        out[7..9].copy_from_slice(&self.acceleration_x.to_be_bytes());
        out[9..11].copy_from_slice(&self.acceleration_y.to_be_bytes());
        out[11..13].copy_from_slice(&self.acceleration_z.to_be_bytes());
        out[13..15].copy_from_slice(&self.power_info.to_be_bytes());
        out[15] = self.movement_counter;
        out[16..18].copy_from_slice(&self.measurement_sequence.to_be_bytes());
        out[18..24].copy_from_slice(self.address.as_bytes());
        out
    }

    /// Acceleration per axis in g (0.001 g resolution)
    pub fn acceleration_g(&self) -> (f64, f64, f64) {
        (
            f64::from(self.acceleration_x) * 0.001,
            f64::from(self.acceleration_y) * 0.001,
            f64::from(self.acceleration_z) * 0.001,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; 24] = [
        0x05, 0x01, 0x9C, 0x00, 0x28, 0xC7, 0x00, 0x14, 0x00, 0x01, 0xFF, 0xCE, 0x00, 0x0F, 0xC5,
        0x9C, 0x02, 0xC7, 0xE6, 0x99, 0x94, 0x26, 0xC5, 0xC3,
    ];

    #[test]
    fn decodes_fields_big_endian() {
        let raw = decode(&SAMPLE, FormatVersion::RawV2).unwrap();
        assert_eq!(raw.temperature, 412);
        assert_eq!(raw.humidity, 0x0028);
        assert_eq!(raw.pressure, 0xC700);
        assert_eq!(raw.acceleration_x, 0x1400);
        assert_eq!(raw.acceleration_y, 0x01FF);
        assert_eq!(raw.acceleration_z, -12800);
        assert_eq!(raw.power_info, 0x0FC5);
        assert_eq!(raw.movement_counter, 0x9C);
        assert_eq!(raw.measurement_sequence, 0x02C7);
        assert_eq!(
            raw.address,
            HardwareAddress([0xE6, 0x99, 0x94, 0x26, 0xC5, 0xC3])
        );
    }

    #[test]
    fn short_payloads_are_truncated() {
        for len in 0..RAW_V2_LEN {
            assert_eq!(
                decode(&SAMPLE[..len], FormatVersion::RawV2),
                Err(DecodeError::Truncated {
                    expected: RAW_V2_LEN,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut long = SAMPLE.to_vec();
        long.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            decode(&long, FormatVersion::RawV2),
            decode(&SAMPLE, FormatVersion::RawV2)
        );
    }

    #[test]
    fn encode_then_decode_is_exact() {
        let raw = RawReading {
            temperature: i16::MIN,
            humidity: u16::MAX,
            pressure: 51028,
            acceleration_x: -1000,
            acceleration_y: 1000,
            acceleration_z: i16::MAX,
            power_info: 0xC59C,
            movement_counter: 255,
            measurement_sequence: 65534,
            address: HardwareAddress([0xD4, 0x7A, 0xAA, 0xC9, 0x5D, 0xD6]),
        };
        let bytes = raw.encode();
        assert_eq!(bytes[0], 5);
        assert_eq!(decode(&bytes, FormatVersion::RawV2), Ok(raw));
    }

    #[test]
    fn sentinel_values_pass_through() {
        let mut payload = SAMPLE;
        payload[1] = 0x80;
        payload[2] = 0x00;
        let raw = decode(&payload, FormatVersion::RawV2).unwrap();
        assert_eq!(raw.temperature, i16::MIN);
    }

    #[test]
    fn repeated_decodes_are_identical() {
        let first = decode(&SAMPLE, FormatVersion::RawV2).unwrap();
        for _ in 0..10 {
            assert_eq!(decode(&SAMPLE, FormatVersion::RawV2).unwrap(), first);
        }
    }

    #[test]
    fn acceleration_in_g() {
        let raw = decode(&SAMPLE, FormatVersion::RawV2).unwrap();
        let (x, y, z) = raw.acceleration_g();
        assert!((x - 5.12).abs() < 1e-9);
        assert!((y - 0.511).abs() < 1e-9);
        assert!((z + 12.8).abs() < 1e-9);
    }
}

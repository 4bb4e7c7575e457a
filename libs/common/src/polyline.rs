//! Encoded polyline codec
//!
//! Paths are stored as a string of printable ASCII bytes. Every coordinate is
//! written as two signed deltas (latitude first) against the previous point,
//! each delta scaled by 1e5, zig-zag mapped to an unsigned value and emitted
//! as little-endian 5-bit groups offset by 63. Bit `0x20` of a group marks
//! that another group follows.

use crate::coordinate::{Coordinate, Path};
use crate::error::{DecodeError, EncodeError};

/// Fixed-point scale of the format: five decimal digits.
pub const PRECISION: f64 = 1e5;

const OFFSET: u8 = 63;
const CONTINUATION: u64 = 0x20;
const GROUP_MASK: u64 = 0x1f;

/// Decode an encoded polyline into an ordered path.
///
/// The empty string decodes to an empty path. Input that ends mid-value or
/// mid-coordinate, or that contains a byte outside `'?'..='~'`, is rejected.
pub fn decode(encoded: &str) -> Result<Path, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lon) = (0_i64, 0_i64);
    let mut path = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(next_value(bytes, &mut index)?)
            .ok_or(DecodeError::Overflow { offset: start })?;

        if index >= bytes.len() {
            return Err(DecodeError::Truncated { offset: index });
        }

        let start = index;
        lon = lon
            .checked_add(next_value(bytes, &mut index)?)
            .ok_or(DecodeError::Overflow { offset: start })?;

        path.push(Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
    }

    Ok(path)
}

/// Read one zig-zag encoded value starting at `index`, advancing past it.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, DecodeError> {
    let start = *index;
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or(DecodeError::Truncated { offset: *index })?;
        if !(OFFSET..=b'~').contains(&byte) {
            return Err(DecodeError::InvalidCharacter {
                offset: *index,
                byte,
            });
        }
        *index += 1;

        let group = u64::from(byte - OFFSET);
        let bits = group & GROUP_MASK;
        if shift >= 64 || (shift > 59 && bits >> (64 - shift) != 0) {
            return Err(DecodeError::Overflow { offset: start });
        }
        result |= bits << shift;
        shift += 5;

        if group & CONTINUATION == 0 {
            break;
        }
    }

    // Top bit is clear after the shift, so the cast is lossless.
    let magnitude = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !magnitude } else { magnitude })
}

/// Encode a path into the polyline format, rounding to five decimals.
///
/// Fails when a component is not finite or when a delta against the previous
/// point does not fit the fixed-point range.
pub fn encode(path: &[Coordinate]) -> Result<String, EncodeError> {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lon) = (0_i64, 0_i64);

    for (index, point) in path.iter().enumerate() {
        let lat = scale(point.lat, index)?;
        let lon = scale(point.lon, index)?;
        push_value(&mut out, delta(lat, prev_lat, index)?);
        push_value(&mut out, delta(lon, prev_lon, index)?);
        prev_lat = lat;
        prev_lon = lon;
    }

    Ok(out)
}

// Keeps the zig-zag shift in `push_value` from losing the top bit.
const MAX_FIXED: i64 = i64::MAX >> 2;

fn scale(value: f64, index: usize) -> Result<i64, EncodeError> {
    let fixed = (value * PRECISION).round();
    if !fixed.is_finite() || fixed.abs() > MAX_FIXED as f64 {
        return Err(EncodeError::OutOfRange { index });
    }
    Ok(fixed as i64)
}

fn delta(current: i64, previous: i64, index: usize) -> Result<i64, EncodeError> {
    current
        .checked_sub(previous)
        .ok_or(EncodeError::OutOfRange { index })
}

fn push_value(out: &mut String, delta: i64) {
    let mut value = if delta < 0 {
        !((delta as u64) << 1)
    } else {
        (delta as u64) << 1
    };

    while value >= CONTINUATION {
        out.push(char::from((CONTINUATION | (value & GROUP_MASK)) as u8 + OFFSET));
        value >>= 5;
    }
    out.push(char::from(value as u8 + OFFSET));
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn assert_close(actual: &[Coordinate], expected: &[(f64, f64)]) {
        assert_eq!(actual.len(), expected.len());
        for (got, &(lat, lon)) in actual.iter().zip(expected) {
            assert!((got.lat - lat).abs() < 1e-5, "lat {} != {}", got.lat, lat);
            assert!((got.lon - lon).abs() < 1e-5, "lon {} != {}", got.lon, lon);
        }
    }

    #[test]
    fn decodes_reference_path() {
        let path = decode(REFERENCE).unwrap();
        assert_close(
            &path,
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn empty_input_is_empty_path() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn single_zero_point() {
        // "??" is two zero deltas.
        assert_eq!(decode("??").unwrap(), vec![Coordinate::new(0.0, 0.0)]);
    }

    #[test]
    fn rejects_odd_number_of_values() {
        assert_eq!(
            decode("_p~iF").unwrap_err(),
            DecodeError::Truncated { offset: 5 }
        );
    }

    #[test]
    fn rejects_value_cut_mid_group() {
        // 'i' still carries the continuation bit.
        assert_eq!(
            decode("_p~i").unwrap_err(),
            DecodeError::Truncated { offset: 4 }
        );
    }

    #[test]
    fn rejects_bytes_outside_alphabet() {
        assert_eq!(
            decode("_p~iF ps|U").unwrap_err(),
            DecodeError::InvalidCharacter {
                offset: 5,
                byte: b' '
            }
        );
        assert!(matches!(
            decode("é?"),
            Err(DecodeError::InvalidCharacter { offset: 0, .. })
        ));
    }

    #[test]
    fn rejects_overlong_value() {
        let overlong = "~".repeat(14) + "?";
        assert!(matches!(
            decode(&overlong),
            Err(DecodeError::Overflow { offset: 0 })
        ));
    }

    #[test]
    fn encode_matches_reference() {
        let path = vec![
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ];
        assert_eq!(encode(&path).unwrap(), REFERENCE);
        assert_close(
            &decode(&encode(&path).unwrap()).unwrap(),
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn encode_rejects_unrepresentable_points() {
        let extreme = [Coordinate::new(1e300, 0.0), Coordinate::new(-1e300, 0.0)];
        assert_eq!(
            encode(&extreme).unwrap_err(),
            EncodeError::OutOfRange { index: 0 }
        );

        let nan = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, f64::NAN)];
        assert_eq!(encode(&nan).unwrap_err(), EncodeError::OutOfRange { index: 1 });

        assert_eq!(encode(&[]).unwrap(), "");
    }
}

//! Raw `.hgt` sample encoding.
//!
//! A tile payload is nothing but big-endian `i16` samples, row-major,
//! northernmost row first and westernmost column first within a row.

use crate::{Elev, TileError, NO_VALUE};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::{io, mem::size_of};

/// Summary statistics of a tile's samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TileStats {
    /// Lowest valid sample, or [`Elev::MAX`] when there is none.
    pub minimum: Elev,
    /// Highest sample, [`NO_VALUE`] included.
    pub maximum: Elev,
    /// Number of [`NO_VALUE`] samples.
    pub invalid_count: usize,
}

impl TileStats {
    pub fn valid_count(&self, len: usize) -> usize {
        len - self.invalid_count
    }
}

/// Computes [`TileStats`] in a single pass.
///
/// `maximum` does not skip [`NO_VALUE`], so a tile of nothing but
/// voids reports `NO_VALUE` as its maximum.
pub fn compute_stats(samples: &[Elev]) -> TileStats {
    let mut stats = TileStats {
        minimum: Elev::MAX,
        maximum: Elev::MIN,
        invalid_count: 0,
    };
    for &sample in samples {
        stats.maximum = stats.maximum.max(sample);
        if sample == NO_VALUE {
            stats.invalid_count += 1;
        } else {
            stats.minimum = stats.minimum.min(sample);
        }
    }
    stats
}

/// Decodes a complete payload.
pub fn decode_samples(bytes: &[u8]) -> Result<Vec<Elev>, TileError> {
    if bytes.len() % size_of::<Elev>() != 0 {
        return Err(TileError::TruncatedData(bytes.len()));
    }
    let mut samples = vec![0; bytes.len() / size_of::<Elev>()];
    BigEndian::read_i16_into(bytes, &mut samples);
    Ok(samples)
}

/// Decodes a payload of known byte length from a stream, such as a
/// zip member.
pub fn read_samples(src: &mut impl io::Read, byte_len: usize) -> Result<Vec<Elev>, TileError> {
    if byte_len % size_of::<Elev>() != 0 {
        return Err(TileError::TruncatedData(byte_len));
    }
    let mut samples = vec![0; byte_len / size_of::<Elev>()];
    src.read_i16_into::<BigEndian>(&mut samples)
        .map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => TileError::TruncatedData(byte_len),
            _ => TileError::Io(err),
        })?;
    Ok(samples)
}

pub fn encode_samples(samples: &[Elev]) -> Vec<u8> {
    let mut bytes = vec![0; samples.len() * size_of::<Elev>()];
    BigEndian::write_i16_into(samples, &mut bytes);
    bytes
}

pub fn write_samples(dst: &mut impl io::Write, samples: &[Elev]) -> io::Result<()> {
    for &sample in samples {
        dst.write_i16::<BigEndian>(sample)?;
    }
    Ok(())
}

/// Returns the square dimension of a payload of `len` samples,
/// `floor(sqrt(len))`.
pub fn dimension_of(len: usize) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let mut dim = (len as f64).sqrt() as usize;
    // Correct for float rounding on large lengths.
    while dim * dim > len {
        dim -= 1;
    }
    while (dim + 1) * (dim + 1) <= len {
        dim += 1;
    }
    dim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_big_endian() {
        let samples = decode_samples(&[0x01, 0x02, 0xff, 0xfe, 0x80, 0x00, 0x7f, 0xff]).unwrap();
        assert_eq!(samples, vec![0x0102, -2, NO_VALUE, Elev::MAX]);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(matches!(
            decode_samples(&[0, 1, 2]),
            Err(TileError::TruncatedData(3))
        ));
        assert!(matches!(
            read_samples(&mut &[0u8, 1, 2][..], 3),
            Err(TileError::TruncatedData(3))
        ));
    }

    #[test]
    fn test_read_short_stream_is_truncated() {
        assert!(matches!(
            read_samples(&mut &[0u8, 1][..], 4),
            Err(TileError::TruncatedData(4))
        ));
    }

    #[test]
    fn test_encode_matches_stream_writer() {
        let samples = [Elev::MIN, -1, 0, 1, 4808, Elev::MAX];
        let mut streamed = Vec::new();
        write_samples(&mut streamed, &samples).unwrap();
        assert_eq!(encode_samples(&samples), streamed);
        assert_eq!(&streamed[..4], &[0x80, 0x00, 0xff, 0xff]);
        assert_eq!(decode_samples(&streamed).unwrap(), samples);
        assert_eq!(
            read_samples(&mut streamed.as_slice(), streamed.len()).unwrap(),
            samples
        );
    }

    #[test]
    fn test_stats_of_voids() {
        let stats = compute_stats(&[NO_VALUE; 9]);
        assert_eq!(stats.invalid_count, 9);
        assert_eq!(stats.maximum, NO_VALUE);
        assert_eq!(stats.minimum, Elev::MAX);
        assert_eq!(stats.valid_count(9), 0);
    }

    #[test]
    fn test_stats_of_valid_samples() {
        let stats = compute_stats(&[12, -400, 8000, 3]);
        assert_eq!(stats.invalid_count, 0);
        assert_eq!(stats.minimum, -400);
        assert_eq!(stats.maximum, 8000);
        assert!(stats.minimum <= stats.maximum);
    }

    #[test]
    fn test_stats_skip_voids_for_minimum_only() {
        let stats = compute_stats(&[NO_VALUE, 5, NO_VALUE, 7]);
        assert_eq!(stats.invalid_count, 2);
        assert_eq!(stats.minimum, 5);
        assert_eq!(stats.maximum, 7);
    }

    #[test]
    fn test_dimension_of() {
        assert_eq!(dimension_of(0), 0);
        assert_eq!(dimension_of(1), 1);
        assert_eq!(dimension_of(8), 2);
        assert_eq!(dimension_of(9), 3);
        assert_eq!(dimension_of(1201 * 1201), 1201);
        assert_eq!(dimension_of(3601 * 3601), 3601);
        assert_eq!(dimension_of(3601 * 3601 - 1), 3600);
    }
}

//! The integer encoding of the binary ATerm format.
//!
//! Values below 2^28 are written in one to four bytes, where the number of
//! leading one bits in the first byte gives the number of bytes that follow.
//! Larger values are written as the marker `0xF0` followed by the value as a
//! big endian 32 bit number.

use bitstream_io::BitRead;
use bitstream_io::BitWrite;
use log::warn;

use sharc_utilities::SharcError;

/// Writes the value in the variable-length integer format of the binary format.
/// Values that do not fit in 32 bits are truncated, which is logged as a warning.
pub fn write_baf_integer<W: BitWrite + ?Sized>(stream: &mut W, value: u64) -> Result<(), SharcError> {
    if value < (1 << 7) {
        stream.write_bytes(&[value as u8])?;
    } else if value < (1 << 14) {
        stream.write_bytes(&[(value >> 8) as u8 | 0x80, value as u8])?;
    } else if value < (1 << 21) {
        stream.write_bytes(&[(value >> 16) as u8 | 0xC0, (value >> 8) as u8, value as u8])?;
    } else if value < (1 << 28) {
        stream.write_bytes(&[
            (value >> 24) as u8 | 0xE0,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ])?;
    } else {
        if value > u64::from(u32::MAX) {
            warn!("losing precision of integer {value} in binary format, only 32 bits are written");
        }

        stream.write_bytes(&[0xF0])?;
        stream.write_bytes(&(value as u32).to_be_bytes())?;
    }

    Ok(())
}

/// Reads an integer written by [write_baf_integer].
pub fn read_baf_integer<R: BitRead + ?Sized>(stream: &mut R) -> Result<u32, SharcError> {
    let first = stream.read::<8, u8>()? as u32;

    let (length, high) = if first & 0x80 == 0 {
        return Ok(first);
    } else if first & 0x40 == 0 {
        (1, first & 0x3F)
    } else if first & 0x20 == 0 {
        (2, first & 0x1F)
    } else if first & 0x10 == 0 {
        (3, first & 0x0F)
    } else {
        (4, 0)
    };

    let mut value = high;
    for _ in 0..length {
        value = (value << 8) | stream.read::<8, u8>()? as u32;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use bitstream_io::BigEndian;
    use bitstream_io::BitReader;
    use bitstream_io::BitWriter;
    use rand::Rng;
    use test_case::test_case;

    use sharc_utilities::random_test;

    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut stream = BitWriter::endian(Vec::new(), BigEndian);
        write_baf_integer(&mut stream, value).unwrap();
        stream.into_writer()
    }

    #[test_case(0, &[0x00] ; "zero")]
    #[test_case(0xBAF, &[0x8B, 0xAF] ; "magic")]
    #[test_case(0x0300, &[0x83, 0x00] ; "version")]
    #[test_case(0x3FFF, &[0xBF, 0xFF] ; "largest two byte")]
    #[test_case(0x4000, &[0xC0, 0x40, 0x00] ; "smallest three byte")]
    #[test_case(0x0FFF_FFFF, &[0xEF, 0xFF, 0xFF, 0xFF] ; "largest four byte")]
    #[test_case(0x1000_0000, &[0xF0, 0x10, 0x00, 0x00, 0x00] ; "five byte")]
    fn test_known_encodings(value: u64, expected: &[u8]) {
        assert_eq!(encode(value), expected);
    }

    #[test]
    fn test_random_integers() {
        random_test(1000, |rng| {
            let value = rng.random::<u32>() >> rng.random_range(0..32u32);
            let bytes = encode(value as u64);

            let mut reader = BitReader::endian(&bytes[..], BigEndian);
            assert_eq!(read_baf_integer(&mut reader).unwrap(), value);
        });
    }

    #[test]
    fn test_truncation() {
        let bytes = encode(0x1_0000_0005);
        let mut reader = BitReader::endian(&bytes[..], BigEndian);
        assert_eq!(read_baf_integer(&mut reader).unwrap(), 5);

        let mut reader = BitReader::endian(&bytes[..3], BigEndian);
        assert!(read_baf_integer(&mut reader).is_err());
    }
}

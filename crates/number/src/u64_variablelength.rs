use std::io::Read;
use std::io::Write;

use sharc_utilities::SharcError;

/// The maximum number of bytes used to encode a value of type T, seven data
/// bits per byte.
pub const fn encoding_size<T>() -> usize {
    (std::mem::size_of::<T>() * 8).div_ceil(7)
}

/// Writes an unsigned integer in the little endian base 128 encoding: seven
/// data bits per byte, least significant group first, with the top bit of a
/// byte set when more bytes follow. Returns the number of bytes written.
pub fn write_u64_variablelength<W: Write>(stream: &mut W, mut value: u64) -> Result<usize, SharcError> {
    let mut buffer = [0u8; encoding_size::<u64>()];
    let mut length = 0;

    while value > 0b0111_1111 {
        buffer[length] = (value as u8 & 0b0111_1111) | 0b1000_0000;
        value >>= 7;
        length += 1;
    }

    buffer[length] = value as u8;
    length += 1;

    stream.write_all(&buffer[..length])?;
    Ok(length)
}

/// Reads an unsigned integer written by [write_u64_variablelength].
pub fn read_u64_variablelength<R: Read>(stream: &mut R) -> Result<u64, SharcError> {
    let mut value: u64 = 0;
    for i in 0..encoding_size::<u64>() {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte)?;

        value |= ((byte[0] & 0b0111_1111) as u64) << (7 * i);

        if byte[0] & 0b1000_0000 == 0 {
            return Ok(value);
        }
    }

    Err("variable-length integer exceeds 64 bits".into())
}

/// Returns the number of bytes [write_u64_variablelength] uses for the value.
pub fn u64_variablelength_size(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (u64::BITS - value.leading_zeros()).div_ceil(7) as usize
    }
}

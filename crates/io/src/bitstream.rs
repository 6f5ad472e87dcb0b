use std::io;
use std::io::Read;
use std::io::Write;

use bitstream_io::BigEndian;
use bitstream_io::BitRead;
use bitstream_io::BitReader;
use bitstream_io::BitWrite;
use bitstream_io::BitWriter;
use log::error;

use sharc_number::read_baf_integer;
use sharc_number::write_baf_integer;
use sharc_utilities::SharcError;

/// Writing side of the bit stream used by the binary ATerm format.
pub trait BitStreamWrite {
    /// Writes the `number_of_bits` least significant bits of `value`, starting
    /// with the least significant bit. Bytes are filled from their most
    /// significant bit downwards.
    ///
    /// # Preconditions
    /// - number_of_bits must be <= 64
    fn write_bits(&mut self, value: u64, number_of_bits: u32) -> Result<(), SharcError>;

    /// Writes the length of the string as an integer followed by its raw bytes.
    fn write_string(&mut self, s: &str) -> Result<(), SharcError>;

    /// Writes an integer using the variable-length format of [write_baf_integer].
    fn write_integer(&mut self, value: u64) -> Result<(), SharcError>;

    /// Pads the last byte with zeroes and flushes it to the underlying writer.
    fn flush(&mut self) -> Result<(), SharcError>;
}

/// Reading side of the bit stream used by the binary ATerm format.
pub trait BitStreamRead {
    /// Reads a field written by [BitStreamWrite::write_bits].
    ///
    /// # Preconditions
    /// - number_of_bits must be <= 64
    fn read_bits(&mut self, number_of_bits: u32) -> Result<u64, SharcError>;

    /// Reads a length-prefixed string.
    fn read_string(&mut self) -> Result<String, SharcError>;

    /// Reads a variable-length integer.
    fn read_integer(&mut self) -> Result<u32, SharcError>;
}

/// Writer for bit-level output, the partially filled byte is kept in the
/// accumulator of the underlying [BitWriter] between calls.
pub struct BitStreamWriter<W: Write> {
    writer: BitWriter<W, BigEndian>,
}

impl<W: Write> BitStreamWriter<W> {
    /// Creates a new BitStreamWriter wrapping the provided writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BitWriter::new(writer),
        }
    }
}

impl<W: Write> Drop for BitStreamWriter<W> {
    fn drop(&mut self) {
        if self.flush().is_err() {
            error!("Failed to flush the bit stream when it was dropped");
        }
    }
}

/// Reader for bit-level input from an underlying reader.
pub struct BitStreamReader<R: Read> {
    reader: BitReader<R, BigEndian>,
}

impl<R: Read> BitStreamReader<R> {
    /// Creates a new BitStreamReader wrapping the provided reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BitReader::new(reader),
        }
    }
}

/// Reverses the order of the lowest `number_of_bits` bits of the value.
fn reverse_field(value: u64, number_of_bits: u32) -> u64 {
    debug_assert!(number_of_bits > 0 && number_of_bits <= 64);
    value.reverse_bits() >> (64 - number_of_bits)
}

impl<W: Write> BitStreamWrite for BitStreamWriter<W> {
    fn write_bits(&mut self, value: u64, number_of_bits: u32) -> Result<(), SharcError> {
        debug_assert!(number_of_bits <= 64);
        if number_of_bits == 0 {
            return Ok(());
        }

        let mask = if number_of_bits == 64 {
            u64::MAX
        } else {
            (1 << number_of_bits) - 1
        };

        self.writer
            .write_var(number_of_bits, reverse_field(value & mask, number_of_bits))?;
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<(), SharcError> {
        self.write_integer(s.len() as u64)?;
        self.writer.write_bytes(s.as_bytes())?;
        Ok(())
    }

    fn write_integer(&mut self, value: u64) -> Result<(), SharcError> {
        write_baf_integer(&mut self.writer, value)
    }

    fn flush(&mut self) -> Result<(), SharcError> {
        self.writer.byte_align()?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<R: Read> BitStreamRead for BitStreamReader<R> {
    fn read_bits(&mut self, number_of_bits: u32) -> Result<u64, SharcError> {
        assert!(number_of_bits <= 64);
        if number_of_bits == 0 {
            return Ok(0);
        }

        let value: u64 = self.reader.read_var(number_of_bits)?;
        Ok(reverse_field(value, number_of_bits))
    }

    fn read_string(&mut self) -> Result<String, SharcError> {
        let length = self.read_integer()? as usize;

        // The length comes from the input, so only reserve a bounded amount up front.
        let mut bytes = Vec::with_capacity(length.min(4096));
        for _ in 0..length {
            bytes.push(self.reader.read::<8, u8>()?);
        }

        Ok(String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?)
    }

    fn read_integer(&mut self) -> Result<u32, SharcError> {
        read_baf_integer(&mut self.reader)
    }
}

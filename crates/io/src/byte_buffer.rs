use std::io;
use std::io::Read;
use std::io::Write;

/// A fixed capacity byte buffer with a position and a limit.
///
/// In write mode the bytes between the position and the limit are free space.
/// After [ByteBuffer::flip] the bytes written so far are between the position
/// and the limit, and the buffer can be consumed through [Read]. The streaming
/// term format produces and consumes its data one buffer at a time through
/// this type.
#[derive(Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
}

impl ByteBuffer {
    /// Creates an empty buffer in write mode.
    pub fn with_capacity(capacity: usize) -> ByteBuffer {
        ByteBuffer {
            data: vec![0; capacity],
            position: 0,
            limit: capacity,
        }
    }

    /// Creates a buffer in read mode containing a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> ByteBuffer {
        ByteBuffer {
            data: bytes.to_vec(),
            position: 0,
            limit: bytes.len(),
        }
    }

    /// The total number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The number of bytes between the position and the limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Switches to write mode with the whole capacity available.
    pub fn reset(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Switches from write mode to read mode, the written bytes become readable.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Writes a single byte.
    ///
    /// # Panics
    ///
    /// When the buffer has no remaining space.
    pub fn put_u8(&mut self, value: u8) {
        assert!(self.has_remaining(), "ByteBuffer overflow");
        self.data[self.position] = value;
        self.position += 1;
    }

    /// Writes all the given bytes.
    ///
    /// # Panics
    ///
    /// When the bytes do not fit in the remaining space.
    pub fn put_slice(&mut self, bytes: &[u8]) {
        assert!(bytes.len() <= self.remaining(), "ByteBuffer overflow");
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
    }

    /// Reads a single byte, or returns None when nothing remains.
    pub fn get_u8(&mut self) -> Option<u8> {
        if self.has_remaining() {
            let value = self.data[self.position];
            self.position += 1;
            Some(value)
        } else {
            None
        }
    }

    /// Returns the bytes between the position and the limit.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Advances the position by `count` bytes, which must not exceed [ByteBuffer::remaining].
    pub fn advance(&mut self, count: usize) {
        assert!(count <= self.remaining(), "ByteBuffer advanced beyond its limit");
        self.position += count;
    }

    /// Replaces the contents by exactly `length` bytes from the reader and
    /// switches to read mode.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, length: usize) -> io::Result<()> {
        if self.data.len() < length {
            self.data.resize(length, 0);
        }

        reader.read_exact(&mut self.data[..length])?;
        self.position = 0;
        self.limit = length;
        Ok(())
    }
}

impl Write for ByteBuffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let count = bytes.len().min(self.remaining());
        self.put_slice(&bytes[..count]);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ByteBuffer {
    fn read(&mut self, bytes: &mut [u8]) -> io::Result<usize> {
        let count = bytes.len().min(self.remaining());
        bytes[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

//! A fixed-capacity circular byte buffer.
//!
//! Read and write positions are kept as absolute, monotonically increasing offsets.
//! The physical slot of an offset is `offset % capacity`, so a full buffer
//! (`filled - pos == capacity`) is never confused with an empty one (`filled == pos`).

pub struct RingBuffer {
    buf: Box<[u8]>,
    capacity: usize,
    /// Absolute offset of the next byte to be written.
    filled: u64,
    /// Absolute offset of the next byte to be read.
    pos: u64,
}

impl RingBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> RingBuffer {
        assert_ne!(capacity, 0);
        RingBuffer {
            buf: vec![0u8; capacity].into_boxed_slice(),
            capacity,
            filled: 0,
            pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of bytes ever written.
    pub fn filled(&self) -> u64 {
        self.filled
    }

    /// Total number of bytes ever read.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Number of buffered, unread bytes.
    pub fn len(&self) -> usize {
        (self.filled - self.pos) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.filled == self.pos
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Number of bytes that can be written without overtaking the reader.
    pub fn free(&self) -> usize {
        if self.is_released() {
            return 0;
        }
        self.capacity - self.len()
    }

    /// Appends as much of `data` as fits and returns the number of bytes written.
    ///
    /// A write that crosses the physical end of the buffer is split in two copies.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.free());
        if n == 0 {
            return 0;
        }
        let start = self.slot(self.filled);
        let first = n.min(self.capacity - start);
        self.buf[start..start + first].copy_from_slice(&data[..first]);
        self.buf[..n - first].copy_from_slice(&data[first..n]);
        self.filled += n as u64;
        n
    }

    /// Moves as many buffered bytes into `dest` as fit and returns the count.
    ///
    /// A read that crosses the physical end of the buffer is split in two copies.
    pub fn read_into(&mut self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.len());
        if n == 0 {
            return 0;
        }
        let start = self.slot(self.pos);
        let first = n.min(self.capacity - start);
        dest[..first].copy_from_slice(&self.buf[start..start + first]);
        dest[first..n].copy_from_slice(&self.buf[..n - first]);
        self.pos += n as u64;
        n
    }

    /// Frees the backing storage and discards buffered bytes. A released buffer accepts
    /// no further writes.
    pub fn release(&mut self) {
        self.buf = Box::default();
        self.pos = self.filled;
    }

    pub fn is_released(&self) -> bool {
        self.buf.is_empty()
    }

    fn slot(&self, offset: u64) -> usize {
        (offset % self.capacity as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full() {
        let mut ring = RingBuffer::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 4);

        assert_eq!(ring.write(b"abcdef"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.write(b"g"), 0);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_wrapping_write_and_read() {
        let mut ring = RingBuffer::new(8);
        assert_eq!(ring.write(b"012345"), 6);

        let mut out = [0u8; 4];
        assert_eq!(ring.read_into(&mut out), 4);
        assert_eq!(&out, b"0123");

        // Write position is at slot 6: this write wraps around the physical end.
        assert_eq!(ring.write(b"abcdef"), 6);
        assert!(ring.is_full());

        // Read position is at slot 4: this read wraps as well.
        let mut out = [0u8; 8];
        assert_eq!(ring.read_into(&mut out), 8);
        assert_eq!(&out, b"45abcdef");
        assert!(ring.is_empty());
        assert_eq!(ring.filled(), 12);
        assert_eq!(ring.pos(), 12);
    }

    #[test]
    fn test_short_read() {
        let mut ring = RingBuffer::new(8);
        ring.write(b"xy");
        let mut out = [0u8; 5];
        assert_eq!(ring.read_into(&mut out), 2);
        assert_eq!(&out[..2], b"xy");
        assert_eq!(ring.read_into(&mut out), 0);
    }

    #[test]
    fn test_many_laps_preserve_order() {
        let mut ring = RingBuffer::new(7);
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let mut out = Vec::new();
        let mut written = 0;
        let mut chunk = [0u8; 3];
        while out.len() < data.len() {
            written += ring.write(&data[written..(written + 5).min(data.len())]);
            assert!(ring.len() <= ring.capacity());
            let n = ring.read_into(&mut chunk);
            out.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_release() {
        let mut ring = RingBuffer::new(4);
        ring.write(b"ab");
        ring.release();
        assert!(ring.is_released());
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.write(b"cd"), 0);
        let mut out = [0u8; 2];
        assert_eq!(ring.read_into(&mut out), 0);
    }
}

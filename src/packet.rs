//! Utilities for raw [`Packet`] reading and writing

pub mod csum;
pub mod net_types;

/// Errors that can occur when reading/writing [`Packet`] contents
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The packet head could not be moved down as there was not enough headroom
    #[error("insufficient headroom: cannot move head {head} down by {diff}")]
    InsufficientHeadroom {
        /// The amount of bytes that the head attempted to move down
        diff: usize,
        /// The head position
        head: usize,
    },
    /// Attempted to move the head past the tail, or the tail past the end of the
    /// packet's storage
    #[error("invalid packet length")]
    InvalidPacketLength {},
    /// Attempted to get or set data at an invalid offset
    #[error("invalid offset {offset}, length is {length}")]
    InvalidOffset {
        /// The invalid offset
        offset: usize,
        /// The length the offset must be below
        length: usize,
    },
    /// Attempt to retrieve data outside the bounds of the currently valid contents
    #[error("insufficient data: {size} bytes at offset {offset}, length is {length}")]
    InsufficientData {
        /// The offset the data would start at
        offset: usize,
        /// The size of the data requested
        size: usize,
        /// The length of the actual valid contents
        length: usize,
    },
}

impl PacketError {
    /// Gets a static string description of the error
    #[inline]
    pub fn discriminant(&self) -> &'static str {
        match self {
            Self::InsufficientHeadroom { .. } => "insufficient headroom",
            Self::InvalidPacketLength {} => "invalid packet length",
            Self::InvalidOffset { .. } => "invalid offset",
            Self::InsufficientData { .. } => "insufficient data",
        }
    }
}

/// A buffer of packet data with a movable window
///
/// ```text
/// ┌─────────────────┌───────────────────────┌─────────────┐
/// │headroom         │packet                 │remainder    │
/// └─────────────────└───────────────────────└─────────────┘
///                   ▲                       ▲
///                   │                       │
///                   head                    tail
/// ```
///
/// Each layer of the stack owns the packet while it works on it. Outbound,
/// every layer prepends its header by moving the head down into the headroom,
/// and inbound every layer strips its header by moving the head up. Stripped
/// bytes stay in the storage, so moving the head back down re-attaches a
/// header exactly as it was received, for example when quoting the original
/// datagram in an ICMP error.
///
/// For an IPv4 UDP frame:
///
/// ```text
/// ┌───────────────┌────────────────────┌────────┌──────────┐
/// │ethernet       │ipv4                │udp     │data...   │
/// └───────────────└────────────────────└────────└──────────┘
/// ▲               ▲                    ▲        ▲          ▲
/// │               │                    │        │          │
///  head            +14                  +34      +42        tail
/// ```
#[derive(Clone)]
pub struct Packet {
    /// The entire packet buffer, including headroom, valid packet contents,
    /// and unused remainder
    data: Vec<u8>,
    /// The offset in data where the packet starts
    head: usize,
    /// The offset in data where the packet ends
    tail: usize,
}

impl Packet {
    /// Allocates an empty packet with `head_room` bytes reserved in front of
    /// the window and `capacity` bytes available behind it
    #[inline]
    pub fn with_capacity(head_room: usize, capacity: usize) -> Self {
        Self {
            data: vec![0; head_room + capacity],
            head: head_room,
            tail: head_room,
        }
    }

    /// Allocates a packet whose window holds a copy of `payload`
    #[inline]
    pub fn from_payload(head_room: usize, payload: &[u8]) -> Self {
        let mut packet = Self::with_capacity(head_room, payload.len());
        packet.data[head_room..].copy_from_slice(payload);
        packet.tail = packet.data.len();
        packet
    }

    /// The number of valid bytes in the packet
    #[inline]
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// True if the packet is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// The total size of the underlying storage
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The number of bytes in front of the window
    #[inline]
    pub fn head_room(&self) -> usize {
        self.head
    }

    /// Resets the tail of this packet, causing it to become empty
    #[inline]
    pub fn clear(&mut self) {
        self.tail = self.head;
    }

    /// Adjust the head of the packet up or down by `diff` bytes
    ///
    /// A negative `diff` grows the window downwards, exposing whatever bytes
    /// were previously stripped, a positive `diff` strips bytes from the front.
    #[inline]
    pub fn adjust_head(&mut self, diff: i32) -> Result<(), PacketError> {
        if diff < 0 {
            let diff = diff.unsigned_abs() as usize;
            if diff > self.head {
                return Err(PacketError::InsufficientHeadroom {
                    diff,
                    head: self.head,
                });
            }

            self.head -= diff;
        } else {
            let diff = diff as usize;
            if self.head + diff > self.tail {
                return Err(PacketError::InvalidPacketLength {});
            }

            self.head += diff;
        }

        Ok(())
    }

    /// Adjust the tail of the packet up or down by `diff` bytes
    ///
    /// Growing the tail does not clear the exposed bytes, use [`Self::pad`] for that
    #[inline]
    pub fn adjust_tail(&mut self, diff: i32) -> Result<(), PacketError> {
        if diff < 0 {
            let diff = diff.unsigned_abs() as usize;
            if diff > self.len() {
                return Err(PacketError::InvalidPacketLength {});
            }

            self.tail -= diff;
        } else {
            let diff = diff as usize;
            if self.tail + diff > self.data.len() {
                return Err(PacketError::InvalidPacketLength {});
            }

            self.tail += diff;
        }

        Ok(())
    }

    /// Grows the window downwards by `len` bytes and returns the new header
    /// region, reallocating the storage if there is not enough headroom
    ///
    /// The returned bytes are whatever the storage held, callers are expected
    /// to overwrite all of them
    pub fn push_header(&mut self, len: usize) -> &mut [u8] {
        if len > self.head {
            let extra = len - self.head;
            self.data.splice(0..0, std::iter::repeat_n(0, extra));
            self.head += extra;
            self.tail += extra;
        }

        self.head -= len;
        &mut self.data[self.head..self.head + len]
    }

    /// Strips `len` bytes from the front of the window
    #[inline]
    pub fn pull_header(&mut self, len: usize) -> Result<(), PacketError> {
        if len > self.len() {
            return Err(PacketError::InsufficientData {
                offset: 0,
                size: len,
                length: self.len(),
            });
        }

        self.head += len;
        Ok(())
    }

    /// Appends `len` zero bytes to the end of the window, growing the storage
    /// if needed
    pub fn pad(&mut self, len: usize) {
        let end = self.tail + len;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[self.tail..end].fill(0);
        self.tail = end;
    }

    /// Removes `len` bytes from the end of the window
    #[inline]
    pub fn trim(&mut self, len: usize) -> Result<(), PacketError> {
        if len > self.len() {
            return Err(PacketError::InvalidPacketLength {});
        }

        self.tail -= len;
        Ok(())
    }

    /// Shrinks the window so that it is at most `len` bytes long
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.tail = self.head + len;
        }
    }

    /// Appends a copy of `bytes` to the end of the window, growing the storage
    /// if needed
    pub fn append(&mut self, bytes: &[u8]) {
        let end = self.tail + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[self.tail..end].copy_from_slice(bytes);
        self.tail = end;
    }

    /// Retrieves a slice of bytes beginning at the specified offset
    ///
    /// # Errors
    ///
    /// - The offset is not within bounds
    /// - The offset + len is not within bounds
    #[inline]
    pub fn slice_at_offset(&self, offset: usize, len: usize) -> Result<&[u8], PacketError> {
        let start = self.check_range(offset, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Retrieves a mutable slice of bytes beginning at the specified offset
    ///
    /// # Errors
    ///
    /// - The offset is not within bounds
    /// - The offset + len is not within bounds
    #[inline]
    pub fn slice_at_offset_mut(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<&mut [u8], PacketError> {
        let start = self.check_range(offset, len)?;
        Ok(&mut self.data[start..start + len])
    }

    /// Retrieves a fixed size array of bytes beginning at the specified offset
    ///
    /// # Errors
    ///
    /// - The offset + `N` is not within bounds
    #[inline]
    pub fn array_at_offset<const N: usize>(&self, offset: usize) -> Result<[u8; N], PacketError> {
        let start = self.check_range(offset, N)?;
        let mut data = [0u8; N];
        data.copy_from_slice(&self.data[start..start + N]);
        Ok(data)
    }

    /// Reads a network order `u16` at the specified offset
    #[inline]
    pub fn u16_at_offset(&self, offset: usize) -> Result<u16, PacketError> {
        self.array_at_offset(offset).map(u16::from_be_bytes)
    }

    /// Writes `value` in network order at the specified offset
    #[inline]
    pub fn set_u16_at_offset(&mut self, offset: usize, value: u16) -> Result<(), PacketError> {
        self.slice_at_offset_mut(offset, 2)?
            .copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    #[inline]
    fn check_range(&self, offset: usize, len: usize) -> Result<usize, PacketError> {
        let length = self.len();
        if offset > length {
            return Err(PacketError::InvalidOffset { offset, length });
        }

        if offset + len > length {
            return Err(PacketError::InsufficientData {
                offset,
                size: len,
                length,
            });
        }

        Ok(self.head + offset)
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::with_capacity(0, 0)
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("capacity", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl std::ops::Deref for Packet {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.data[self.head..self.tail]
    }
}

impl std::ops::DerefMut for Packet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data[self.head..self.tail]
    }
}

impl std::io::Write for Packet {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

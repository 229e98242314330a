use bitflags::bitflags;
use sluice_bufpool::Memory;
use sluice_platform::ClockTime;

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u16 {
        /// First buffer after a start, seek or gap in the data.
        const DISCONT = 0b0000_0001;
        /// Produced by a live source.
        const LIVE = 0b0000_0010;
        const GAP = 0b0000_0100;
        const DELTA_UNIT = 0b0000_1000;
        const HEADER = 0b0001_0000;
        const RESYNC = 0b0010_0000;
    }
}

/// One unit of data pushed downstream.
#[derive(Debug, PartialEq)]
pub struct Buffer {
    memory: Memory,
    pub pts: Option<ClockTime>,
    pub dts: Option<ClockTime>,
    pub duration: Option<ClockTime>,
    /// Media offset of the first byte, e.g. the byte position for byte streams.
    pub offset: Option<u64>,
    pub offset_end: Option<u64>,
    pub flags: BufferFlags,
}

impl Buffer {
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            pts: None,
            dts: None,
            duration: None,
            offset: None,
            offset_end: None,
            flags: BufferFlags::empty(),
        }
    }

    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Memory::from_slice(data))
    }

    /// Zero-filled buffer of `len` bytes.
    #[must_use]
    pub fn with_size(len: usize) -> Self {
        Self::new(Memory::zeroed(len))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.memory
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Shrink the payload to `len` bytes, e.g. after a short read.
    pub fn set_size(&mut self, len: usize) {
        if len <= self.memory.len() {
            self.memory.truncate(len);
        } else {
            self.memory.resize(len);
        }
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn set_flag(&mut self, flag: BufferFlags) {
        self.flags.insert(flag);
    }

    #[must_use]
    pub fn has_flag(&self, flag: BufferFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        Self {
            memory: Memory::from_slice(&self.memory),
            pts: self.pts,
            dts: self.dts,
            duration: self.duration,
            offset: self.offset,
            offset_end: self.offset_end,
            flags: self.flags,
        }
    }
}

/// Buffers pushed downstream as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferList {
    buffers: Vec<Buffer>,
}

impl BufferList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, buffer: Buffer) {
        self.buffers.push(buffer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Sum of all payload sizes.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.buffers.iter().map(Buffer::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Buffer> {
        self.buffers.iter()
    }

    pub fn first_mut(&mut self) -> Option<&mut Buffer> {
        self.buffers.first_mut()
    }
}

impl FromIterator<Buffer> for BufferList {
    fn from_iter<I: IntoIterator<Item = Buffer>>(iter: I) -> Self {
        Self {
            buffers: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BufferList {
    type Item = Buffer;
    type IntoIter = std::vec::IntoIter<Buffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffers.into_iter()
    }
}

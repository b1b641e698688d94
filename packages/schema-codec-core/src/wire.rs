//! Bounds-checked read/write cursors and the per-field frame layout.
//!
//! Every field is written as `[u32 BE length][payload]`. The writer reserves
//! the prefix, lets the field formatter append its payload and backpatches the
//! length; the reader hands each payload to its formatter as a reader bounded
//! to the frame, so the outer cursor always lands on the next frame.

use crate::error::{CodecError, Result};
use crate::schema::Schema;

/// Size of the length prefix in bytes.
pub const FRAME_PREFIX_LEN: usize = 4;

macro_rules! impl_write_be {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.write_bytes(&value.to_be_bytes());
        }
    };
}

macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Growable write cursor over a caller-owned buffer.
///
/// Writing at a position inside the buffer overwrites; writing past the end
/// extends it.
#[derive(Debug)]
pub struct WireWriter<'a> {
    buf: &'a mut Vec<u8>,
    pos: usize,
}

impl<'a> WireWriter<'a> {
    /// Creates a writer appending to the end of `buf`.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        let pos = buf.len();
        Self { buf, pos }
    }

    /// Creates a writer positioned at `pos`.
    ///
    /// # Returns
    /// `Err(CodecError::CursorOutOfBounds)` if `pos` is past the end of `buf`.
    pub fn at(buf: &'a mut Vec<u8>, pos: usize) -> Result<Self> {
        if pos > buf.len() {
            return Err(CodecError::CursorOutOfBounds {
                cursor: pos,
                len: buf.len(),
            });
        }
        Ok(Self { buf, pos })
    }

    /// Current write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        let end = self.pos + data.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
    }

    impl_write_be!(write_u8, u8);
    impl_write_be!(write_i8, i8);
    impl_write_be!(write_u16, u16);
    impl_write_be!(write_i16, i16);
    impl_write_be!(write_u32, u32);
    impl_write_be!(write_i32, i32);
    impl_write_be!(write_u64, u64);
    impl_write_be!(write_i64, i64);

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    fn seek(&mut self, pos: usize) {
        debug_assert!(pos <= self.buf.len());
        self.pos = pos;
    }

    /// Writes one length-prefixed frame.
    ///
    /// Reserves the prefix, runs `body` to write the payload, then seeks back
    /// to store the payload length and forward again past the payload.
    ///
    /// # Returns
    /// The payload length in bytes.
    pub fn write_frame<F>(&mut self, body: F) -> Result<usize>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let prefix_at = self.pos;
        self.write_bytes(&[0u8; FRAME_PREFIX_LEN]);
        let payload_start = self.pos;

        body(self)?;

        let payload_end = self.pos;
        let len = payload_end - payload_start;
        let len_u32 = u32::try_from(len).map_err(|_| CodecError::FrameTooLarge {
            len,
            limit: u32::MAX as usize,
        })?;

        self.seek(prefix_at);
        self.write_u32(len_u32);
        self.seek(payload_end);
        Ok(len)
    }
}

/// Read cursor over a borrowed buffer.
///
/// Offsets reported in errors are absolute, also for frame sub-readers.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// Creates a reader positioned at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        if pos > buf.len() {
            return Err(CodecError::CursorOutOfBounds {
                cursor: pos,
                len: buf.len(),
            });
        }
        Ok(Self { buf, pos, base: 0 })
    }

    /// Read position relative to this reader's buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.base + self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consumes everything left in the reader.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_i8, i8, 1);
    impl_read_be!(read_u16, u16, 2);
    impl_read_be!(read_i16, i16, 2);
    impl_read_be!(read_u32, u32, 4);
    impl_read_be!(read_i32, i32, 4);
    impl_read_be!(read_u64, u64, 8);
    impl_read_be!(read_i64, i64, 8);

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a length prefix and returns a reader bounded to the payload.
    ///
    /// The outer reader is advanced past the whole frame whatever the
    /// sub-reader later consumes.
    pub fn read_frame(&mut self, max_len: u32) -> Result<WireReader<'a>> {
        let len = self.read_u32()?;
        if len > max_len {
            return Err(CodecError::FrameTooLarge {
                len: len as usize,
                limit: max_len as usize,
            });
        }
        let payload_base = self.base + self.pos;
        let payload = self.read_bytes(len as usize)?;
        Ok(WireReader {
            buf: payload,
            pos: 0,
            base: payload_base,
        })
    }
}

/// Location of one frame inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Offset of the length prefix
    pub offset: usize,
    /// Payload length
    pub len: usize,
}

impl FrameInfo {
    /// Offset of the first byte after this frame.
    pub fn end(&self) -> usize {
        self.offset + FRAME_PREFIX_LEN + self.len
    }
}

/// Walks frames from `start` without interpreting their payloads.
///
/// # Arguments
/// * `buf` - Encoded data
/// * `start` - Offset of the first length prefix
/// * `limit` - Stop after this many frames (`None` = until end of buffer)
pub fn inspect_frames(buf: &[u8], start: usize, limit: Option<usize>) -> Result<Vec<FrameInfo>> {
    let mut reader = WireReader::at(buf, start)?;
    let mut frames = Vec::new();
    while !reader.is_eof() && limit.is_none_or(|max| frames.len() < max) {
        let offset = reader.position();
        let payload = reader.read_frame(u32::MAX)?;
        frames.push(FrameInfo {
            offset,
            len: payload.remaining(),
        });
    }
    Ok(frames)
}

/// Counts how many consecutive instances of `schema` fill `buf` exactly.
///
/// # Returns
/// The instance count, or an error if the buffer ends mid-instance.
pub fn check_layout(buf: &[u8], schema: &Schema) -> Result<usize> {
    if schema.is_empty() {
        return if buf.is_empty() {
            Ok(0)
        } else {
            Err(CodecError::InvalidData(format!(
                "{} trailing bytes after empty schema of '{}'",
                buf.len(),
                schema.type_id()
            )))
        };
    }

    let frames = inspect_frames(buf, 0, None)?;
    if frames.len() % schema.len() != 0 {
        return Err(CodecError::InvalidData(format!(
            "{} frames is not a multiple of the {} members of '{}'",
            frames.len(),
            schema.len(),
            schema.type_id()
        )));
    }
    Ok(frames.len() / schema.len())
}

//! Maps a host byte stream to a sequence of fixed-size blocks.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// The default block size used when none is given to [`crate::create_fs`].
pub const DEFAULT_BLOCK_SIZE: i32 = 128;

/// A block device backed by a single host file.
///
/// Every multi-byte integer on disk is a little-endian `i32`; this is the
/// only layer that touches the host stream directly, so it is where the
/// byte-swap for big-endian hosts would live if one were ever needed.
pub struct BlockDevice {
    handle: File,
    block_size: i32,
    num_blocks: i32,
}

impl BlockDevice {
    /// Wraps an already-open file as a block device of the given geometry.
    pub fn new(handle: File, block_size: i32, num_blocks: i32) -> Self {
        Self {
            handle,
            block_size,
            num_blocks,
        }
    }

    /// The block size this device was opened with.
    pub fn block_size(&self) -> i32 {
        self.block_size
    }

    /// The total number of blocks in the image.
    pub fn num_blocks(&self) -> i32 {
        self.num_blocks
    }

    /// Positions the stream at the start of block `block_ind`.
    pub fn seek_to_block(&mut self, block_ind: i32) -> Result<()> {
        self.seek_to(block_ind, 0)
    }

    /// Positions the stream at `byte_in_block` bytes into block `block_ind`.
    pub fn seek_to(&mut self, block_ind: i32, byte_in_block: i32) -> Result<()> {
        let off = block_ind as u64 * self.block_size as u64 + byte_in_block as u64;
        self.handle.seek(SeekFrom::Start(off))?;
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes from the current position.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.handle.read_exact(buf)?;
        Ok(())
    }

    /// Writes `buf` at the current position.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.handle.write_all(buf)?;
        Ok(())
    }

    /// Reads a single byte from the current position.
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Writes a single byte at the current position.
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write_all(&[b])
    }

    /// Reads a little-endian `i32` from the current position.
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Writes a little-endian `i32` at the current position.
    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        self.write_all(&val.to_le_bytes())
    }
}

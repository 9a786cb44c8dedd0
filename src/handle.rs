//! Per-inode cursor and I/O engine shared by files and directories.
//!
//! A [`Handle`] wraps one inode and a logical byte cursor. The "real
//! cursor" `(slot, byte_in_block)` is derived from the logical cursor and
//! is never persisted. Handles borrow the block device by argument on
//! every call rather than owning it, since any number of handles may be
//! live at once over the same host stream.

use crate::bitmap;
use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::inode::{self, Inode, NUM_POINTERS};

/// A reader/writer bound to one inode, file or directory alike.
///
/// [`crate::walker::FSWalker`] and [`crate::dir`] build on top of this for
/// directory-specific semantics (packed `i32` child pointers); a plain
/// file handle just uses the byte-oriented methods directly.
pub struct Handle {
    /// The inode this handle is bound to. Mutated in place by writes,
    /// shrinks, and renames; callers persist it implicitly through this
    /// handle's methods.
    pub inode: Inode,
    cursor: i32,
    slot: i32,
    byte_in_block: i32,
}

impl Handle {
    /// Wraps `inode` with a cursor at the beginning.
    pub fn new(inode: Inode) -> Self {
        Self {
            inode,
            cursor: 0,
            slot: 0,
            byte_in_block: 0,
        }
    }

    /// The payload length in bytes.
    pub fn length(&self) -> i32 {
        self.inode.length
    }

    /// The current logical cursor position.
    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    /// Whether the cursor sits at the end-of-file position.
    pub fn at_end(&self) -> bool {
        self.cursor == self.length()
    }

    /// Derives `(slot, byte_in_block)` for logical cursor `c`.
    ///
    /// A cursor that lands exactly on a block boundary beyond the start is
    /// represented as the *border* of the previous slot (`byte_in_block ==
    /// block_size`) rather than byte 0 of the next slot, since the next
    /// slot's pointer may not exist yet (e.g. right at EOF). Read/write
    /// step past the border explicitly before touching bytes.
    fn set_cursor(&mut self, block_size: i32, c: i32) {
        self.cursor = c;
        if c > 0 && c % block_size == 0 {
            self.slot = c / block_size - 1;
            self.byte_in_block = block_size;
        } else {
            self.slot = c / block_size;
            self.byte_in_block = c % block_size;
        }
    }

    fn seek_to_real_cursor(&self, dev: &mut BlockDevice) -> Result<()> {
        let block_ind = self.inode.blocks[self.slot as usize];
        dev.seek_to(block_ind, self.byte_in_block)
    }

    /// Seeks to an absolute logical position; `n` must be in `[0, length]`.
    pub fn seek_abs(&mut self, dev: &BlockDevice, n: i32) -> Result<()> {
        if n < 0 || n > self.length() {
            return Err(Error::SeekOutOfBounds {
                target: n as i64,
                length: self.length(),
            });
        }
        self.set_cursor(dev.block_size(), n);
        Ok(())
    }

    /// Seeks relative to the current cursor.
    pub fn seek_rel(&mut self, dev: &BlockDevice, amt: i32) -> Result<()> {
        self.seek_abs(dev, self.cursor + amt)
    }

    /// Seeks `amt` bytes back from the end of the file.
    pub fn seek_from_end(&mut self, dev: &BlockDevice, amt: i32) -> Result<()> {
        self.seek_abs(dev, self.length() - amt)
    }

    /// Seeks to the beginning of the file.
    pub fn seek_to_beg(&mut self, dev: &BlockDevice) -> Result<()> {
        self.seek_abs(dev, 0)
    }

    /// Seeks to the end-of-file position.
    pub fn seek_to_end(&mut self, dev: &BlockDevice) -> Result<()> {
        self.seek_abs(dev, self.length())
    }

    /// Reads a single byte, advancing the cursor.
    ///
    /// Fails with [`Error::ReadOutOfBounds`] at EOF.
    pub fn read_one(&mut self, dev: &mut BlockDevice) -> Result<u8> {
        if self.at_end() {
            return Err(Error::ReadOutOfBounds);
        }
        let block_size = dev.block_size();
        if self.byte_in_block == block_size {
            self.slot += 1;
            self.byte_in_block = 0;
            dev.seek_to(self.inode.blocks[self.slot as usize], 0)?;
        }
        let b = dev.read_byte()?;
        self.cursor += 1;
        self.byte_in_block += 1;
        Ok(b)
    }

    /// Reads `amt` bytes, or everything up to EOF when `amt` is `None`.
    ///
    /// Fails with [`Error::ReadOutOfBounds`] if EOF is hit before `amt`
    /// bytes have been read.
    pub fn read(&mut self, dev: &mut BlockDevice, amt: Option<i32>) -> Result<Vec<u8>> {
        self.seek_to_real_cursor(dev)?;
        match amt {
            None => {
                let mut buf = Vec::new();
                while !self.at_end() {
                    buf.push(self.read_one(dev)?);
                }
                Ok(buf)
            }
            Some(n) => {
                let mut buf = Vec::with_capacity(n.max(0) as usize);
                for _ in 0..n {
                    buf.push(self.read_one(dev)?);
                }
                Ok(buf)
            }
        }
    }

    /// Reads a little-endian `i32`, used by directory payloads.
    pub fn read_i32(&mut self, dev: &mut BlockDevice) -> Result<i32> {
        let bytes = self.read(dev, Some(4))?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Writes a little-endian `i32`, used by directory payloads.
    pub fn write_i32(&mut self, dev: &mut BlockDevice, val: i32) -> Result<()> {
        self.write(dev, &val.to_le_bytes())
    }

    /// Ensures the current slot has a backing block, allocating one if
    /// needed. A slot can be unallocated either because we just crossed
    /// into a fresh border while appending, or because a prior `clear()`
    /// reclaimed it and this is the first byte written since.
    fn ensure_slot(&mut self, dev: &mut BlockDevice) -> Result<i32> {
        let slot = self.slot as usize;
        if self.inode.blocks[slot] == 0 {
            let new_block = bitmap::alloc_block(dev)?;
            self.inode.blocks[slot] = new_block;
        }
        Ok(self.inode.blocks[slot])
    }

    /// Writes `data` at the current cursor, appending and growing the
    /// inode's direct-pointer array as needed.
    pub fn write(&mut self, dev: &mut BlockDevice, data: &[u8]) -> Result<()> {
        self.seek_to_real_cursor(dev)?;
        let block_size = dev.block_size();
        let max_file_length = NUM_POINTERS as i32 * block_size;
        let mut inode_dirty = false;
        for &byte in data {
            let appending = self.at_end();
            if appending {
                if self.inode.length + 1 > max_file_length {
                    return Err(Error::FileFull);
                }
                self.inode.length += 1;
                inode_dirty = true;
            }
            if self.byte_in_block == block_size {
                self.slot += 1;
                self.byte_in_block = 0;
                let block_ind = self.ensure_slot(dev)?;
                dev.seek_to(block_ind, 0)?;
            } else {
                let block_ind = self.ensure_slot(dev)?;
                dev.seek_to(block_ind, self.byte_in_block)?;
            }
            dev.write_byte(byte)?;
            self.cursor += 1;
            self.byte_in_block += 1;
        }
        if inode_dirty {
            inode::write_inode(dev, &self.inode)?;
        }
        Ok(())
    }

    /// Shrinks the payload by `amt` bytes, freeing any blocks that fall
    /// out of range and persisting the inode.
    ///
    /// Fails with [`Error::ShrinkOutOfBounds`] if `amt` exceeds the
    /// current length.
    pub fn shrink(&mut self, dev: &mut BlockDevice, amt: i32) -> Result<()> {
        if amt > self.inode.length {
            return Err(Error::ShrinkOutOfBounds {
                length: self.inode.length,
                amt,
            });
        }
        let new_length = self.inode.length - amt;
        self.inode.length = new_length;
        if self.cursor > new_length {
            self.set_cursor(dev.block_size(), new_length);
        }
        let block_size = dev.block_size();
        for slot in 0..NUM_POINTERS {
            let start_off = slot as i32 * block_size;
            if start_off >= new_length && self.inode.blocks[slot] != 0 {
                bitmap::free_block(dev, self.inode.blocks[slot])?;
                self.inode.blocks[slot] = 0;
            }
        }
        inode::write_inode(dev, &self.inode)
    }

    /// Equivalent to `shrink(length())`.
    pub fn clear(&mut self, dev: &mut BlockDevice) -> Result<()> {
        self.shrink(dev, self.inode.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Filesystem;
    use tempfile::NamedTempFile;

    #[test]
    fn write_then_read_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        h.write(&mut fs.dev, b"hello world").unwrap();
        h.seek_to_beg(&fs.dev).unwrap();
        let data = h.read(&mut fs.dev, None).unwrap();
        assert_eq!(data, b"hello world");
        assert_eq!(h.length(), 11);
    }

    #[test]
    fn cross_block_write() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        let data = vec![0xABu8; 300];
        h.write(&mut fs.dev, &data).unwrap();
        assert_eq!(h.length(), 300);
        assert_ne!(h.inode.blocks[0], 0);
        assert_ne!(h.inode.blocks[1], 0);
        assert_ne!(h.inode.blocks[2], 0);
        for slot in h.inode.blocks[3..].iter() {
            assert_eq!(*slot, 0);
        }
        h.seek_to_beg(&fs.dev).unwrap();
        let back = h.read(&mut fs.dev, None).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn clear_then_write_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        h.write(&mut fs.dev, b"first").unwrap();
        h.clear(&mut fs.dev).unwrap();
        assert_eq!(h.length(), 0);
        h.write(&mut fs.dev, b"second").unwrap();
        h.seek_to_beg(&fs.dev).unwrap();
        assert_eq!(h.read(&mut fs.dev, None).unwrap(), b"second");
    }

    #[test]
    fn shrink_out_of_bounds() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        h.write(&mut fs.dev, b"abc").unwrap();
        assert!(matches!(
            h.shrink(&mut fs.dev, 10),
            Err(Error::ShrinkOutOfBounds { .. })
        ));
    }

    #[test]
    fn seek_out_of_bounds() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        h.write(&mut fs.dev, b"abc").unwrap();
        assert!(matches!(
            h.seek_abs(&fs.dev, 10),
            Err(Error::SeekOutOfBounds { .. })
        ));
    }

    #[test]
    fn read_past_eof() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let mut h = fs.walker.create_file(&mut fs.dev, "a").unwrap();
        assert!(matches!(
            h.read_one(&mut fs.dev),
            Err(Error::ReadOutOfBounds)
        ));
    }
}

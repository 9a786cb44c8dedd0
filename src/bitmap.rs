//! The free-block bitmap: block 1, one bit per block, bit 0 = LSB.

use crate::block::BlockDevice;
use crate::error::{Error, Result};

/// The block index at which the free-block bitmap lives.
pub const BITMAP_BLOCK: i32 = 1;

/// Scans the bitmap byte by byte, bit 0 upward within each byte, and
/// returns the first free block index, marking it used.
///
/// The scan is bounded by the device's block count: bits beyond
/// `num_blocks` describe blocks that do not exist in the image and are
/// never handed out, even though the bitmap block physically reserves
/// `block_size * 8` bits for them (spec precondition: `num_blocks <=
/// block_size * 8`). Fails with [`Error::FSFull`] when no clear bit
/// remains among the first `num_blocks` bits.
pub fn alloc_block(dev: &mut BlockDevice) -> Result<i32> {
    let block_size = dev.block_size();
    let num_blocks = dev.num_blocks();
    dev.seek_to_block(BITMAP_BLOCK)?;
    for byte_ind in 0..block_size {
        let mut byte = dev.read_byte()?;
        for bit in 0..8 {
            let block_ind = byte_ind * 8 + bit;
            if block_ind >= num_blocks {
                return Err(Error::FSFull);
            }
            if byte & (1 << bit) == 0 {
                byte |= 1 << bit;
                dev.seek_to(BITMAP_BLOCK, byte_ind)?;
                dev.write_byte(byte)?;
                return Ok(block_ind);
            }
        }
    }
    Err(Error::FSFull)
}

/// Clears bit `block_ind` of the bitmap.
///
/// The caller must ensure no inode still references `block_ind`; freeing a
/// block still in use is a correctness bug at the call site, not here.
pub fn free_block(dev: &mut BlockDevice, block_ind: i32) -> Result<()> {
    let byte_ind = block_ind / 8;
    let bit = block_ind % 8;
    dev.seek_to(BITMAP_BLOCK, byte_ind)?;
    let mut byte = dev.read_byte()?;
    byte &= !(1 << bit);
    dev.seek_to(BITMAP_BLOCK, byte_ind)?;
    dev.write_byte(byte)?;
    Ok(())
}

/// Sets bit `block_ind` of the bitmap without scanning for a free one.
///
/// Used by [`crate::create_fs`] to mark the superblock and bitmap blocks
/// used up front.
pub fn mark_used(dev: &mut BlockDevice, block_ind: i32) -> Result<()> {
    let byte_ind = block_ind / 8;
    let bit = block_ind % 8;
    dev.seek_to(BITMAP_BLOCK, byte_ind)?;
    let mut byte = dev.read_byte()?;
    byte |= 1 << bit;
    dev.seek_to(BITMAP_BLOCK, byte_ind)?;
    dev.write_byte(byte)?;
    Ok(())
}

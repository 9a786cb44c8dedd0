//! Serializes and deserializes a single inode to/from its own block.

use crate::block::BlockDevice;
use crate::error::Result;

/// Number of direct block pointers an inode holds.
pub const NUM_POINTERS: usize = 12;

/// Fixed part of the inode layout: is_dir (1) + length (4) + 12 pointers (48).
pub const INODE_HEADER_SIZE: i32 = 1 + 4 + (NUM_POINTERS as i32) * 4;

/// A file or directory descriptor, occupying one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inode {
    /// The block this inode itself lives in.
    pub block_ind: i32,
    /// The entry's name, as raw bytes.
    pub name: String,
    /// Whether this inode describes a directory.
    pub is_dir: bool,
    /// Payload length in bytes.
    pub length: i32,
    /// Direct block pointers; `0` marks an unused slot.
    pub blocks: [i32; NUM_POINTERS],
}

impl Inode {
    /// Size in bytes of the name region for a given block size.
    pub fn max_name_length(block_size: i32) -> i32 {
        block_size - INODE_HEADER_SIZE
    }
}

/// Reads the inode stored at block `block_ind`.
pub fn read_inode(dev: &mut BlockDevice, block_ind: i32) -> Result<Inode> {
    let block_size = dev.block_size();
    dev.seek_to_block(block_ind)?;
    let is_dir = dev.read_byte()? != 0;
    let length = dev.read_i32()?;
    let mut blocks = [0i32; NUM_POINTERS];
    for b in blocks.iter_mut() {
        *b = dev.read_i32()?;
    }
    let max_name = Inode::max_name_length(block_size);
    let mut name_bytes = Vec::with_capacity(max_name as usize);
    for _ in 0..max_name {
        let b = dev.read_byte()?;
        if b == 0 {
            break;
        }
        name_bytes.push(b);
    }
    let name = String::from_utf8_lossy(&name_bytes).into_owned();
    Ok(Inode {
        block_ind,
        name,
        is_dir,
        length,
        blocks,
    })
}

/// Serializes `inode` to its block, zero-padding the name region.
///
/// The name must fit within `max_name_length(block_size)`.
pub fn write_inode(dev: &mut BlockDevice, inode: &Inode) -> Result<()> {
    let block_size = dev.block_size();
    let max_name = Inode::max_name_length(block_size);
    assert!(
        inode.name.len() as i32 <= max_name,
        "name `{}` is too long for block_size {}",
        inode.name,
        block_size
    );
    dev.seek_to_block(inode.block_ind)?;
    dev.write_byte(inode.is_dir as u8)?;
    dev.write_i32(inode.length)?;
    for b in inode.blocks.iter() {
        dev.write_i32(*b)?;
    }
    let name_bytes = inode.name.as_bytes();
    dev.write_all(name_bytes)?;
    let padding = max_name as usize - name_bytes.len();
    if padding > 0 {
        dev.write_all(&vec![0u8; padding])?;
    }
    Ok(())
}

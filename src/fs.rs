//! Image lifecycle: formatting a fresh image and reopening an existing one.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::bitmap;
use crate::block::BlockDevice;
use crate::error::Result;
use crate::inode::{self, Inode, NUM_POINTERS};
use crate::walker::FSWalker;

/// The block index the root directory's inode always occupies.
pub const ROOT_INODE_BLOCK: i32 = 2;

/// The runtime handle to an open image: the host stream plus session
/// navigation state.
///
/// Both fields are public rather than hidden behind accessors: every layer
/// above the block device (allocator, inode store, handle engine, walker)
/// takes the device by argument rather than through `self`, so a
/// caller driving `walker` and `dev` together needs them as independent
/// borrows, which method accessors returning `&mut self` would not allow.
pub struct Filesystem {
    pub dev: BlockDevice,
    pub walker: FSWalker,
}

impl Filesystem {
    /// Formats a fresh image at `path`, truncating any existing file.
    ///
    /// `num_blocks` defaults to `block_size` when `None`, so the bitmap
    /// always has enough bits to address every block. Panics if
    /// `num_blocks` exceeds `block_size * 8`, the bitmap's addressing
    /// limit — a caller precondition, not a recoverable error.
    pub fn create_fs(
        path: impl AsRef<Path>,
        block_size: i32,
        num_blocks: impl Into<Option<i32>>,
    ) -> Result<Self> {
        let num_blocks = num_blocks.into().unwrap_or(block_size);
        assert!(
            num_blocks <= block_size * 8,
            "num_blocks ({num_blocks}) exceeds bitmap capacity of block_size*8 ({})",
            block_size * 8
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut dev = BlockDevice::new(file, block_size, num_blocks);

        dev.seek_to_block(0)?;
        let zero_block = vec![0u8; block_size as usize];
        for _ in 0..num_blocks {
            dev.write_all(&zero_block)?;
        }

        dev.seek_to_block(0)?;
        dev.write_byte(1)?;
        dev.write_byte(0)?;
        dev.write_i32(block_size)?;
        dev.write_i32(num_blocks)?;

        bitmap::mark_used(&mut dev, 0)?;
        bitmap::mark_used(&mut dev, 1)?;
        let root_inode_block = bitmap::alloc_block(&mut dev)?;
        let root_data_block = bitmap::alloc_block(&mut dev)?;
        debug_assert_eq!(root_inode_block, ROOT_INODE_BLOCK);

        let mut blocks = [0i32; NUM_POINTERS];
        blocks[0] = root_data_block;
        let root_inode = Inode {
            block_ind: root_inode_block,
            name: String::new(),
            is_dir: true,
            length: 0,
            blocks,
        };
        inode::write_inode(&mut dev, &root_inode)?;

        Ok(Self {
            dev,
            walker: FSWalker::new(root_inode),
        })
    }

    /// Reopens an existing image, reading the superblock and the root
    /// inode. Does not read the bitmap eagerly.
    pub fn open_fs(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; 10];
        file.read_exact(&mut header)?;
        let major = header[0];
        let minor = header[1];
        let block_size = i32::from_le_bytes(header[2..6].try_into().unwrap());
        let num_blocks = i32::from_le_bytes(header[6..10].try_into().unwrap());
        assert_eq!(
            (major, minor),
            (1, 0),
            "unsupported superblock version ({major}, {minor})"
        );

        let mut dev = BlockDevice::new(file, block_size, num_blocks);
        let root_inode = inode::read_inode(&mut dev, ROOT_INODE_BLOCK)?;
        Ok(Self {
            dev,
            walker: FSWalker::new(root_inode),
        })
    }

    /// The block size this image was formatted with.
    pub fn block_size(&self) -> i32 {
        self.dev.block_size()
    }

    /// The total number of blocks in the image.
    pub fn num_blocks(&self) -> i32 {
        self.dev.num_blocks()
    }

    /// `12 * block_size`: the largest payload a single inode can hold.
    pub fn max_file_length(&self) -> i32 {
        NUM_POINTERS as i32 * self.block_size()
    }

    /// `block_size * (num_blocks - 2)`, informational: inodes consume
    /// data blocks too, so this overstates usable payload capacity.
    pub fn capacity(&self) -> i32 {
        self.block_size() * (self.num_blocks() - 2)
    }

    /// The largest number of entries a directory payload can hold.
    pub fn max_dir_entries(&self) -> i32 {
        self.max_file_length() / 4
    }

    /// The largest name an inode can store at this block size.
    pub fn max_name_length(&self) -> i32 {
        Inode::max_name_length(self.block_size())
    }
}

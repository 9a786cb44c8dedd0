//! A self-contained, block-structured filesystem image stored in a single
//! host file.
//!
//! The stack, leaves first: [`block`] maps a host stream to fixed-size
//! blocks; [`bitmap`] is the free-block allocator over block 1;
//! [`inode`] serializes the per-entry record; [`handle`] is the
//! per-inode cursor and I/O engine shared by files and directories;
//! [`dir`] builds packed child-pointer payloads and name lookup on top
//! of it; [`walker`] tracks a session's position in the directory tree;
//! [`fs`] formats and reopens images.
//!
//! ```no_run
//! use imgfs::Filesystem;
//!
//! let mut fs = Filesystem::create_fs("disk.img", 128, None)?;
//! let mut h = fs.walker.create_file(&mut fs.dev, "hello.txt")?;
//! h.write(&mut fs.dev, b"hi")?;
//! h.seek_to_beg(&fs.dev)?;
//! assert_eq!(h.read(&mut fs.dev, None)?, b"hi");
//! # Ok::<(), imgfs::Error>(())
//! ```

pub mod bitmap;
pub mod block;
pub mod dir;
pub mod error;
pub mod fs;
pub mod handle;
pub mod inode;
pub mod walker;

pub use block::DEFAULT_BLOCK_SIZE;
pub use dir::{DirHandle, EntryHandle};
pub use error::{Error, Result};
pub use fs::Filesystem;
pub use handle::Handle;
pub use inode::Inode;
pub use walker::FSWalker;

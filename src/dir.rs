//! Directory payload logic: packed child pointers, cached entry lookup,
//! creation, removal, and rename.

use std::collections::HashMap;

use crate::bitmap;
use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::inode::{self, Inode, NUM_POINTERS};

/// Validates a name: non-empty, and free of tab,
/// line feed, carriage return, form feed, vertical tab, and `/`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x0b' | '/'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// A handle to either kind of directory child, as produced by
/// [`DirHandle::get_entries`].
pub enum EntryHandle {
    /// A plain file.
    File(Handle),
    /// A nested directory.
    Dir(DirHandle),
}

impl EntryHandle {
    /// The inode backing this entry, whichever variant it is.
    pub fn inode(&self) -> &Inode {
        match self {
            EntryHandle::File(h) => &h.inode,
            EntryHandle::Dir(d) => &d.handle.inode,
        }
    }
}

/// A [`Handle`] over a directory's packed child-pointer payload.
pub struct DirHandle {
    /// The underlying byte handle; its payload is `4 * num_entries()` bytes.
    pub handle: Handle,
    entries: Option<HashMap<String, EntryHandle>>,
}

impl DirHandle {
    /// Wraps a directory inode with no cached entries yet.
    pub fn new(inode: Inode) -> Self {
        Self {
            handle: Handle::new(inode),
            entries: None,
        }
    }

    /// The number of child pointers in the payload.
    pub fn num_entries(&self) -> i32 {
        self.handle.length() / 4
    }

    /// Whether this directory has no children.
    pub fn is_empty(&self) -> bool {
        self.handle.length() == 0
    }

    /// Invalidates the cached entries map; the next [`Self::get_entries`]
    /// re-reads the payload from disk.
    pub fn invalidate_cache(&mut self) {
        self.entries = None;
    }

    /// Reads the entire payload as a sequence of child-inode block indices.
    pub fn get_pointers(&mut self, dev: &mut BlockDevice) -> Result<Vec<i32>> {
        self.handle.seek_to_beg(dev)?;
        let count = self.num_entries();
        let mut pointers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            pointers.push(self.handle.read_i32(dev)?);
        }
        Ok(pointers)
    }

    /// Returns the child-name-to-handle mapping, materializing it from disk
    /// on first access and reusing the cache thereafter.
    pub fn get_entries(&mut self, dev: &mut BlockDevice) -> Result<&HashMap<String, EntryHandle>> {
        if self.entries.is_none() {
            let pointers = self.get_pointers(dev)?;
            let mut map = HashMap::with_capacity(pointers.len());
            for ptr in pointers {
                let child_inode = inode::read_inode(dev, ptr)?;
                let name = child_inode.name.clone();
                let entry = if child_inode.is_dir {
                    EntryHandle::Dir(DirHandle::new(child_inode))
                } else {
                    EntryHandle::File(Handle::new(child_inode))
                };
                map.insert(name, entry);
            }
            self.entries = Some(map);
        }
        Ok(self.entries.as_ref().unwrap())
    }

    /// Whether a child of this name exists.
    pub fn exists(&mut self, dev: &mut BlockDevice, name: &str) -> Result<bool> {
        Ok(self.get_entries(dev)?.contains_key(name))
    }

    fn create_child_inode(&mut self, dev: &mut BlockDevice, name: &str, is_dir: bool) -> Result<Inode> {
        validate_name(name)?;
        let max_name = Inode::max_name_length(dev.block_size());
        if name.len() as i32 > max_name {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.get_entries(dev)?.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let inode_ind = bitmap::alloc_block(dev)?;
        let first_block = bitmap::alloc_block(dev)?;
        let mut blocks = [0i32; NUM_POINTERS];
        blocks[0] = first_block;
        let child_inode = Inode {
            block_ind: inode_ind,
            name: name.to_string(),
            is_dir,
            length: 0,
            blocks,
        };
        inode::write_inode(dev, &child_inode)?;
        self.handle.seek_to_end(dev)?;
        self.handle.write_i32(dev, inode_ind)?;
        self.invalidate_cache();
        Ok(child_inode)
    }

    /// Creates a child file and returns a handle to it.
    pub fn create_file(&mut self, dev: &mut BlockDevice, name: &str) -> Result<Handle> {
        let inode = self.create_child_inode(dev, name, false)?;
        Ok(Handle::new(inode))
    }

    /// Creates a child directory and returns a handle to it.
    pub fn create_dir(&mut self, dev: &mut BlockDevice, name: &str) -> Result<DirHandle> {
        let inode = self.create_child_inode(dev, name, true)?;
        Ok(DirHandle::new(inode))
    }

    /// Removes a child by name, freeing its blocks and inode.
    ///
    /// Fails with [`Error::DirNotEmpty`] if the child is a non-empty
    /// directory. Uses swap-with-last on the parent's pointer array to
    /// avoid rewriting the whole payload tail.
    pub fn remove(&mut self, dev: &mut BlockDevice, name: &str) -> Result<()> {
        let child_inode = {
            let entries = self.get_entries(dev)?;
            let entry = entries
                .get(name)
                .ok_or_else(|| Error::DoesNotExist(name.to_string()))?;
            if let EntryHandle::Dir(d) = entry {
                if !d.is_empty() {
                    return Err(Error::DirNotEmpty(name.to_string()));
                }
            }
            entry.inode().clone()
        };

        let pointers = self.get_pointers(dev)?;
        let idx = pointers
            .iter()
            .position(|&p| p == child_inode.block_ind)
            .expect("cached entry must have a backing pointer");
        let last_idx = pointers.len() - 1;
        if idx != last_idx {
            let last_ptr = pointers[last_idx];
            self.handle.seek_abs(dev, idx as i32 * 4)?;
            self.handle.write_i32(dev, last_ptr)?;
        }
        self.handle.shrink(dev, 4)?;

        for &b in child_inode.blocks.iter() {
            if b == 0 {
                break;
            }
            bitmap::free_block(dev, b)?;
        }
        bitmap::free_block(dev, child_inode.block_ind)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Renames a child in place. The parent's pointer array is untouched,
    /// since children are identified by inode block index, not name.
    pub fn rename(&mut self, dev: &mut BlockDevice, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        let max_name = Inode::max_name_length(dev.block_size());
        if new.len() as i32 > max_name {
            return Err(Error::InvalidName(new.to_string()));
        }
        let block_ind = {
            let entries = self.get_entries(dev)?;
            if !entries.contains_key(old) {
                return Err(Error::DoesNotExist(old.to_string()));
            }
            if entries.contains_key(new) {
                return Err(Error::AlreadyExists(new.to_string()));
            }
            entries.get(old).unwrap().inode().block_ind
        };
        let mut child_inode = inode::read_inode(dev, block_ind)?;
        child_inode.name = new.to_string();
        inode::write_inode(dev, &child_inode)?;
        self.invalidate_cache();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Filesystem;
    use tempfile::NamedTempFile;

    #[test]
    fn create_and_list() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        root.create_file(&mut fs.dev, "a").unwrap();
        root.create_file(&mut fs.dev, "b").unwrap();
        root.create_dir(&mut fs.dev, "d").unwrap();
        let entries = root.get_entries(&mut fs.dev).unwrap();
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "d"]);
        assert_eq!(root.handle.length(), 12);
    }

    #[test]
    fn duplicate_name_rejected() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        root.create_file(&mut fs.dev, "a").unwrap();
        assert!(matches!(
            root.create_file(&mut fs.dev, "a"),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn invalid_name_rejected() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        assert!(matches!(
            root.create_file(&mut fs.dev, "bad/name"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            root.create_file(&mut fs.dev, ""),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn remove_swap_with_last() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        root.create_file(&mut fs.dev, "a").unwrap();
        root.create_file(&mut fs.dev, "b").unwrap();
        root.create_file(&mut fs.dev, "c").unwrap();
        let c_ptr = *root.get_pointers(&mut fs.dev).unwrap().last().unwrap();
        root.remove(&mut fs.dev, "a").unwrap();
        let pointers = root.get_pointers(&mut fs.dev).unwrap();
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0], c_ptr);
        let mut names: Vec<&String> = root.get_entries(&mut fs.dev).unwrap().keys().collect();
        names.sort();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn remove_nonempty_dir_fails() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        root.create_dir(&mut fs.dev, "d").unwrap();
        let mut child = DirHandle::new(
            root.get_entries(&mut fs.dev)
                .unwrap()
                .get("d")
                .unwrap()
                .inode()
                .clone(),
        );
        child.create_file(&mut fs.dev, "inner").unwrap();
        root.invalidate_cache();
        assert!(matches!(
            root.remove(&mut fs.dev, "d"),
            Err(Error::DirNotEmpty(_))
        ));
        child.remove(&mut fs.dev, "inner").unwrap();
        root.invalidate_cache();
        assert!(root.remove(&mut fs.dev, "d").is_ok());
    }

    #[test]
    fn rename_round_trip() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        let root = fs.walker.cur_dir();
        root.create_file(&mut fs.dev, "a").unwrap();
        root.rename(&mut fs.dev, "a", "b").unwrap();
        root.rename(&mut fs.dev, "b", "a").unwrap();
        let names: Vec<&String> = root.get_entries(&mut fs.dev).unwrap().keys().collect();
        assert_eq!(names, vec!["a"]);
    }
}

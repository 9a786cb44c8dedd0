//! Session-level navigation: a stack of [`DirHandle`]s from root to the
//! current directory.

use std::collections::HashMap;

use crate::block::BlockDevice;
use crate::dir::{DirHandle, EntryHandle};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::inode::Inode;

/// The reserved name meaning "the parent of the current directory".
pub const PARENT_DIR: &str = "..";

/// Tracks the current position in the directory tree as a stack of
/// [`DirHandle`]s, root at the bottom.
///
/// Each `enter_dir` pushes a freshly constructed `DirHandle` rather than
/// reusing any cached one, matching the source's model of one `DirHandle`
/// instance per directory per walker session.
pub struct FSWalker {
    stack: Vec<DirHandle>,
}

impl FSWalker {
    /// Starts a walker positioned at the root directory.
    pub fn new(root_inode: Inode) -> Self {
        Self {
            stack: vec![DirHandle::new(root_inode)],
        }
    }

    /// Whether the walker is at the root (stack has exactly one element).
    pub fn at_root(&self) -> bool {
        self.stack.len() == 1
    }

    /// The slash-joined path from root to the current directory; `/` at
    /// root, since the root's own name is never shown.
    pub fn cur_path(&self) -> String {
        if self.at_root() {
            return "/".to_string();
        }
        let mut path = String::new();
        for dir in self.stack.iter().skip(1) {
            path.push('/');
            path.push_str(&dir.handle.inode.name);
        }
        path
    }

    /// The directory currently being viewed.
    pub fn cur_dir(&mut self) -> &mut DirHandle {
        self.stack.last_mut().unwrap()
    }

    /// Whether a child of this name exists in the current directory.
    pub fn exists(&mut self, dev: &mut BlockDevice, name: &str) -> Result<bool> {
        self.cur_dir().exists(dev, name)
    }

    /// The current directory's children.
    pub fn get_entries(&mut self, dev: &mut BlockDevice) -> Result<&HashMap<String, EntryHandle>> {
        self.cur_dir().get_entries(dev)
    }

    /// Descends into a child directory, or pops back up one level for
    /// [`PARENT_DIR`] (`".."`).
    ///
    /// Fails with [`Error::DoesNotExist`] if no such entry exists, or
    /// [`Error::NotADir`] if it is a file.
    pub fn enter_dir(&mut self, dev: &mut BlockDevice, name: &str) -> Result<()> {
        if name == PARENT_DIR {
            self.cd_up();
            return Ok(());
        }
        let child_inode = {
            let entries = self.cur_dir().get_entries(dev)?;
            let entry = entries
                .get(name)
                .ok_or_else(|| Error::DoesNotExist(name.to_string()))?;
            match entry {
                EntryHandle::Dir(d) => d.handle.inode.clone(),
                EntryHandle::File(_) => return Err(Error::NotADir(name.to_string())),
            }
        };
        self.stack.push(DirHandle::new(child_inode));
        Ok(())
    }

    /// Pops the current directory, returning to its parent.
    ///
    /// Popping the root is a programming error, not a user-facing one:
    /// callers must check `at_root` before calling this.
    pub fn cd_up(&mut self) {
        assert!(!self.at_root(), "cannot cd_up from the root directory");
        self.stack.pop();
    }

    /// Creates a child directory of the current directory.
    pub fn create_dir(&mut self, dev: &mut BlockDevice, name: &str) -> Result<DirHandle> {
        self.cur_dir().create_dir(dev, name)
    }

    /// Creates a child file of the current directory.
    pub fn create_file(&mut self, dev: &mut BlockDevice, name: &str) -> Result<Handle> {
        self.cur_dir().create_file(dev, name)
    }

    /// Removes a child of the current directory.
    pub fn remove(&mut self, dev: &mut BlockDevice, name: &str) -> Result<()> {
        self.cur_dir().remove(dev, name)
    }

    /// Recursively removes a directory and everything beneath it.
    ///
    /// Descends into `name`, removes every child (directories depth-first
    /// via recursion, files directly) from a snapshot of the entry list
    /// taken before any removal, returns to the parent, then removes the
    /// now-empty `name` itself.
    pub fn remove_dir_recursive(&mut self, dev: &mut BlockDevice, name: &str) -> Result<()> {
        self.enter_dir(dev, name)?;
        let children: Vec<(String, bool)> = self
            .cur_dir()
            .get_entries(dev)?
            .iter()
            .map(|(n, e)| (n.clone(), matches!(e, EntryHandle::Dir(_))))
            .collect();
        for (child_name, is_dir) in children {
            if is_dir {
                self.remove_dir_recursive(dev, &child_name)?;
            } else {
                self.cur_dir().remove(dev, &child_name)?;
            }
        }
        self.cd_up();
        self.cur_dir().remove(dev, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Filesystem;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_image_is_at_root_and_empty() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        assert!(fs.walker.at_root());
        assert_eq!(fs.walker.cur_path(), "/");
        assert!(fs.walker.get_entries(&mut fs.dev).unwrap().is_empty());
    }

    #[test]
    fn enter_dir_and_cd_up() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        fs.walker.create_dir(&mut fs.dev, "sub").unwrap();
        fs.walker.enter_dir(&mut fs.dev, "sub").unwrap();
        assert!(!fs.walker.at_root());
        assert_eq!(fs.walker.cur_path(), "/sub");
        fs.walker.enter_dir(&mut fs.dev, "..").unwrap();
        assert!(fs.walker.at_root());
    }

    #[test]
    fn enter_dir_on_file_is_not_a_dir() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        fs.walker.create_file(&mut fs.dev, "a").unwrap();
        assert!(matches!(
            fs.walker.enter_dir(&mut fs.dev, "a"),
            Err(Error::NotADir(_))
        ));
    }

    #[test]
    fn enter_dir_missing_does_not_exist() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 128).unwrap();
        assert!(matches!(
            fs.walker.enter_dir(&mut fs.dev, "nope"),
            Err(Error::DoesNotExist(_))
        ));
    }

    #[test]
    fn remove_dir_recursive_frees_subtree() {
        let tmp = NamedTempFile::new().unwrap();
        let mut fs = Filesystem::create_fs(tmp.path(), 128, 256).unwrap();
        fs.walker.create_dir(&mut fs.dev, "sub").unwrap();
        fs.walker.enter_dir(&mut fs.dev, "sub").unwrap();
        fs.walker.create_file(&mut fs.dev, "x").unwrap();
        fs.walker.create_dir(&mut fs.dev, "nested").unwrap();
        fs.walker.enter_dir(&mut fs.dev, "nested").unwrap();
        fs.walker.create_file(&mut fs.dev, "y").unwrap();
        fs.walker.enter_dir(&mut fs.dev, "..").unwrap();
        fs.walker.enter_dir(&mut fs.dev, "..").unwrap();
        assert!(fs.walker.at_root());

        let before = fs.walker.get_entries(&mut fs.dev).unwrap().len();
        assert_eq!(before, 1);
        fs.walker
            .remove_dir_recursive(&mut fs.dev, "sub")
            .unwrap();
        assert!(fs.walker.at_root());
        assert!(fs.walker.get_entries(&mut fs.dev).unwrap().is_empty());
    }
}

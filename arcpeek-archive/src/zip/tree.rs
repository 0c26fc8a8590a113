//! Virtual directory tree over a ZIP archive.
//!
//! Each entry name is split on `/`. Intermediate segments become directory
//! nodes (created once, then reused) and the last segment becomes a file
//! leaf holding the index of its central directory entry. Names ending in
//! `/` only create directories. Children keep archive order.
//!
//! File contents are decoded on first [`ArchiveTree::read`] and memoized in
//! the leaf. The cache belongs to the tree and goes away with it, or earlier
//! through [`ArchiveTree::evict`] and [`ArchiveTree::clear_cache`].

use super::archive::ZipArchive;
use super::central::CentralDirectoryEntry;
use arcpeek_core::error::{ArcPeekError, Result};
use serde::Serialize;
use std::sync::OnceLock;

/// A file leaf.
#[derive(Debug)]
pub struct FileNode {
    name: String,
    path: String,
    entry_index: usize,
    cache: OnceLock<Vec<u8>>,
}

impl FileNode {
    /// Last path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path from the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Index into [`ZipArchive::entries`].
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Decoded contents, if already read.
    pub fn cached(&self) -> Option<&[u8]> {
        self.cache.get().map(Vec::as_slice)
    }
}

/// A directory and its children.
#[derive(Debug, Default)]
pub struct DirectoryNode {
    name: String,
    path: String,
    children: Vec<TreeNode>,
}

impl DirectoryNode {
    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path from the root; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Children in archive order.
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    fn subdirectory(&self, name: &str) -> Option<&TreeNode> {
        self.children
            .iter()
            .find(|child| matches!(child, TreeNode::Directory(dir) if dir.name == name))
    }

    fn subdirectory_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.children
            .iter_mut()
            .find(|child| matches!(child, TreeNode::Directory(dir) if dir.name == name))
    }

    fn file(&self, name: &str) -> Option<&FileNode> {
        self.children.iter().find_map(|child| match child {
            TreeNode::File(file) if file.name == name => Some(file),
            _ => None,
        })
    }

    fn file_mut(&mut self, name: &str) -> Option<&mut FileNode> {
        self.children.iter_mut().find_map(|child| match child {
            TreeNode::File(file) if file.name == name => Some(file),
            _ => None,
        })
    }

    /// Child directory `name`, created if missing.
    fn ensure_directory(&mut self, name: &str) -> &mut DirectoryNode {
        let index = match self
            .children
            .iter()
            .position(|child| matches!(child, TreeNode::Directory(dir) if dir.name == name))
        {
            Some(index) => index,
            None => {
                self.children.push(TreeNode::Directory(DirectoryNode {
                    name: name.to_string(),
                    path: join(&self.path, name),
                    children: Vec::new(),
                }));
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            TreeNode::Directory(dir) => dir,
            TreeNode::File(_) => unreachable!(),
        }
    }
}

/// A node of the tree.
#[derive(Debug)]
pub enum TreeNode {
    /// Directory.
    Directory(DirectoryNode),
    /// File leaf.
    File(FileNode),
}

impl TreeNode {
    /// Last path segment.
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(dir) => &dir.name,
            Self::File(file) => &file.name,
        }
    }

    /// Full path from the root.
    pub fn path(&self) -> &str {
        match self {
            Self::Directory(dir) => &dir.path,
            Self::File(file) => &file.path,
        }
    }

    /// True for file leaves.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// The directory, if this is one.
    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    /// The file, if this is one.
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    fn as_directory_mut(&mut self) -> Option<&mut DirectoryNode> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    fn listing(&self) -> TreeListing {
        match self {
            Self::Directory(dir) => TreeListing {
                name: dir.name.clone(),
                path: dir.path.clone(),
                is_file: false,
                children: Some(dir.children.iter().map(TreeNode::listing).collect()),
            },
            Self::File(file) => TreeListing {
                name: file.name.clone(),
                path: file.path.clone(),
                is_file: true,
                children: None,
            },
        }
    }

    fn collect_files<'t>(&'t self, out: &mut Vec<&'t FileNode>) {
        match self {
            Self::Directory(dir) => {
                for child in &dir.children {
                    child.collect_files(out);
                }
            }
            Self::File(file) => out.push(file),
        }
    }

    fn clear_cache(&mut self) {
        match self {
            Self::Directory(dir) => dir.children.iter_mut().for_each(TreeNode::clear_cache),
            Self::File(file) => {
                file.cache.take();
            }
        }
    }
}

/// Serializable view of a tree node: `{ name, path, isFile, children }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeListing {
    /// Last path segment.
    pub name: String,
    /// Full path.
    pub path: String,
    /// File leaf or directory.
    pub is_file: bool,
    /// Children of a directory; absent for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeListing>>,
}

/// Directory tree of a ZIP archive with a per-file decode cache.
#[derive(Debug)]
pub struct ArchiveTree<'a> {
    archive: ZipArchive<'a>,
    root: TreeNode,
}

impl<'a> ArchiveTree<'a> {
    /// Build the tree from the archive's central directory.
    pub fn new(archive: ZipArchive<'a>) -> Self {
        let mut root = DirectoryNode::default();

        for (index, entry) in archive.entries().iter().enumerate() {
            let segments: Vec<&str> = segments(&entry.name).collect();
            let (leaf, parents) = match segments.split_last() {
                Some((last, parents)) if !entry.is_dir() => (Some(*last), parents),
                _ => (None, segments.as_slice()),
            };

            let mut dir = &mut root;
            for segment in parents {
                dir = dir.ensure_directory(segment);
            }
            if let Some(name) = leaf {
                dir.children.push(TreeNode::File(FileNode {
                    name: name.to_string(),
                    path: join(&dir.path, name),
                    entry_index: index,
                    cache: OnceLock::new(),
                }));
            }
        }

        Self {
            archive,
            root: TreeNode::Directory(root),
        }
    }

    /// The underlying archive.
    pub fn archive(&self) -> &ZipArchive<'a> {
        &self.archive
    }

    /// The root directory node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Node at `path`. The empty path is the root.
    ///
    /// Empty segments are ignored, so `"dir//b.txt"` and `"/dir/b.txt"`
    /// name the same node.
    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        let segments: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Some(&self.root);
        };
        let parent = self.directory(parents)?;
        parent.children.iter().find(|child| child.name() == *last)
    }

    /// The central directory entry behind a file leaf.
    pub fn entry(&self, file: &FileNode) -> Option<&CentralDirectoryEntry> {
        self.archive.entries().get(file.entry_index)
    }

    /// All file leaves, depth-first in archive order.
    pub fn file_nodes(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        self.root.collect_files(&mut out);
        out
    }

    /// All file paths, depth-first in archive order.
    pub fn files(&self) -> Vec<String> {
        self.file_nodes()
            .into_iter()
            .map(|file| file.path.clone())
            .collect()
    }

    /// Decoded contents of the file at `path`, decoding on first access.
    pub fn read(&self, path: &str) -> Result<&[u8]> {
        let file = self
            .file(path)
            .ok_or_else(|| ArcPeekError::entry_not_found(path))?;
        self.read_node(file)
    }

    /// Decoded contents of a file leaf, decoding on first access.
    pub fn read_node<'t>(&'t self, file: &'t FileNode) -> Result<&'t [u8]> {
        if let Some(data) = file.cache.get() {
            return Ok(data.as_slice());
        }
        let entry = self
            .entry(file)
            .ok_or_else(|| ArcPeekError::entry_not_found(file.path.as_str()))?;
        let data = self.archive.decode_entry(entry)?;
        log::trace!("cached {} bytes for {:?}", data.len(), file.path);
        // A concurrent reader may have filled the cell first; both decoded
        // the same bytes.
        Ok(file.cache.get_or_init(|| data).as_slice())
    }

    /// Decode every file on the rayon thread pool, filling the cache.
    ///
    /// Returns each file path with its result, depth-first in archive order.
    #[cfg(feature = "parallel")]
    pub fn read_all_parallel(&self) -> Vec<(&str, Result<&[u8]>)> {
        use rayon::prelude::*;

        self.file_nodes()
            .into_par_iter()
            .map(|file| (file.path(), self.read_node(file)))
            .collect()
    }

    /// Drop the cached contents of one file. Returns whether anything was
    /// cached.
    pub fn evict(&mut self, path: &str) -> bool {
        let segments: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        for segment in parents {
            let Some(next) = node
                .as_directory_mut()
                .and_then(|dir| dir.subdirectory_mut(segment))
            else {
                return false;
            };
            node = next;
        }

        node.as_directory_mut()
            .and_then(|dir| dir.file_mut(last))
            .and_then(|file| file.cache.take())
            .is_some()
    }

    /// Drop every cached decode.
    pub fn clear_cache(&mut self) {
        self.root.clear_cache();
    }

    /// Number of files currently cached and their total size.
    pub fn cache_usage(&self) -> (usize, usize) {
        self.file_nodes()
            .iter()
            .filter_map(|file| file.cached())
            .fold((0, 0), |(count, bytes), data| (count + 1, bytes + data.len()))
    }

    /// Serializable listing of the whole tree.
    pub fn listing(&self) -> TreeListing {
        self.root.listing()
    }

    /// Give back the archive, dropping the tree and its cache.
    pub fn into_archive(self) -> ZipArchive<'a> {
        self.archive
    }

    fn directory(&self, segments: &[&str]) -> Option<&DirectoryNode> {
        let mut node = &self.root;
        for segment in segments {
            node = node.as_directory()?.subdirectory(segment)?;
        }
        node.as_directory()
    }

    fn file(&self, path: &str) -> Option<&FileNode> {
        let segments: Vec<&str> = segments(path).collect();
        let (last, parents) = segments.split_last()?;
        self.directory(parents)?.file(last)
    }
}

/// Non-empty `/`-separated segments of a path.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

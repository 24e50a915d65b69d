//! RAM filesystem: a tree of named nodes rooted at `/`, with a binary image
//! serializer that persists the tree to the primary ATA disk at a fixed LBA
//! range.
//!
//! Nodes are owned via `Rc<RefCell<Node>>` with `Weak` parent back-references
//! and a per-directory child `Vec` (new children are inserted at index 0, so
//! a directory's listed order is the reverse of insertion order, matching
//! the original tree's singly linked "insert at head" child list). This
//! mirrors the ownership style the teacher's `fs::ramfs` module reaches for
//! (`VfsNodeRef`/`VfsNodeWeakRef` = `Rc`/`Weak`) rather than raw intrusive
//! pointers, since the kernel has no borrow-checker-hostile requirement that
//! would justify unsafe pointer chasing here.

use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::ata::{self, AtaError};

pub const MAX_NAME_LEN: usize = 31;
pub const MAX_PATH_LEN: usize = 255;

const IMAGE_MAGIC: u32 = 0x4D59_4653;
const IMAGE_VERSION: u32 = 1;
const SECTOR_SIZE: usize = 512;
const DISK_LBA_BASE: u32 = 2048;
const DISK_SECTOR_COUNT: u16 = 256;
const IMAGE_BUFFER_SIZE: usize = DISK_SECTOR_COUNT as usize * SECTOR_SIZE;
const HEADER_SIZE: usize = 16;
const ENTRY_HEADER_SIZE: usize = 8; // type(1) + reserved(1) + path_len(2) + data_len(4)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    InvalidArgument,
    OutOfMemory,
    HardwareError,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "path not found",
            FsError::AlreadyExists => "already exists",
            FsError::NotADirectory => "not a directory",
            FsError::IsADirectory => "path is a directory",
            FsError::NotEmpty => "directory not empty",
            FsError::InvalidArgument => "invalid path",
            FsError::OutOfMemory => "out of memory",
            FsError::HardwareError => "disk I/O error",
        };
        f.write_str(msg)
    }
}

impl From<AtaError> for FsError {
    fn from(_: AtaError) -> Self {
        FsError::HardwareError
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// File content: a buffer physically sized to `capacity`, but only the
/// first `size` bytes are logically meaningful (the rest is zero padding
/// left over from the last growth). `capacity` always equals `buf.len()`.
struct FileData {
    buf: Vec<u8>,
    size: usize,
}

impl FileData {
    fn empty() -> Self {
        FileData { buf: Vec::new(), size: 0 }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Grows the backing buffer to the next power of two at or above 64
    /// that is `>= required`, copying existing content forward. A no-op if
    /// the current capacity already covers `required`.
    fn ensure_capacity(&mut self, required: usize) {
        if required <= self.capacity() {
            return;
        }
        let mut cap = if self.capacity() == 0 { 64 } else { self.capacity() };
        while cap < required {
            cap *= 2;
        }
        self.buf.resize(cap, 0);
    }

    fn truncate_to(&mut self, data: &[u8]) {
        self.ensure_capacity(data.len());
        self.buf[..data.len()].copy_from_slice(data);
        for b in &mut self.buf[data.len()..] {
            *b = 0;
        }
        self.size = data.len();
    }

    fn append(&mut self, data: &[u8]) {
        let new_size = self.size + data.len();
        self.ensure_capacity(new_size);
        self.buf[self.size..new_size].copy_from_slice(data);
        self.size = new_size;
    }

    fn contents(&self) -> &[u8] {
        &self.buf[..self.size]
    }
}

struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<Weak<RefCell<Node>>>,
    children: Vec<NodeRef>,
    file: Option<FileData>,
}

type NodeRef = Rc<RefCell<Node>>;

impl Node {
    fn new_root() -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: String::from("/"),
            kind: NodeKind::Directory,
            parent: None,
            children: Vec::new(),
            file: None,
        }))
    }

    fn new_child(name: &str, kind: NodeKind, parent: &NodeRef) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.to_string(),
            kind,
            parent: Some(Rc::downgrade(parent)),
            children: Vec::new(),
            file: if kind == NodeKind::File { Some(FileData::empty()) } else { None },
        }))
    }
}

fn find_child(dir: &NodeRef, name: &str) -> Option<NodeRef> {
    dir.borrow().children.iter().find(|c| c.borrow().name == name).cloned()
}

/// Rejects empty components, `.` and `..` as a terminal (creatable) name.
fn is_reserved_component(name: &str) -> bool {
    name.is_empty() || name == "." || name == ".."
}

struct Filesystem {
    root: NodeRef,
    cwd: NodeRef,
    image: Option<Vec<u8>>,
}

// `Rc`/`RefCell` are not normally `Send`, but the kernel has exactly one
// core and the filesystem is only ever touched from task context (see
// spec's concurrency model) behind `FS`'s `spin::Mutex`, so no node is ever
// actually shared across threads. Same reasoning the allocator's `Heap`
// uses for its raw-pointer free list.
unsafe impl Send for Filesystem {}

impl Filesystem {
    fn new() -> Self {
        let root = Node::new_root();
        let cwd = root.clone();
        let mut fs = Filesystem { root, cwd, image: None };
        fs.seed();
        fs
    }

    /// Cosmetic default content for a freshly booted instance with no valid
    /// disk image to load.
    fn seed(&mut self) {
        let _ = self.mkdir("/etc");
        let _ = self.create_file("/etc/motd");
        let _ = self.write_file(
            "/etc/motd",
            b"Welcome to MyOs!\nUse 'help' to discover shell commands.\n",
        );
        let _ = self.mkdir("/docs");
        let _ = self.create_file("/docs/readme.txt");
        let _ = self.write_file(
            "/docs/readme.txt",
            b"MyOs RAM filesystem demo.\n\
              Try: ls, cd, pwd, cat, touch, write, append, mkdir, rm, savefs, loadfs.\n",
        );
    }

    fn validate_path(path: &str) -> Result<(), FsError> {
        if path.len() > MAX_PATH_LEN {
            return Err(FsError::InvalidArgument);
        }
        for component in path.split('/') {
            if component.len() > MAX_NAME_LEN {
                return Err(FsError::InvalidArgument);
            }
        }
        Ok(())
    }

    fn start_node(&self, path: &str) -> NodeRef {
        if path.starts_with('/') {
            self.root.clone()
        } else {
            self.cwd.clone()
        }
    }

    /// Resolves an existing node, applying `.`/`..`/empty-component rules.
    /// Returns `NotFound` if any intermediate or the terminal component is
    /// missing, `NotADirectory` if an intermediate component is a file.
    fn resolve(&self, path: &str) -> Result<NodeRef, FsError> {
        Self::validate_path(path)?;
        let mut current = self.start_node(path);
        for component in path.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    let parent = current.borrow().parent.clone();
                    if let Some(weak) = parent {
                        if let Some(p) = weak.upgrade() {
                            current = p;
                        }
                    }
                }
                name => {
                    if current.borrow().kind != NodeKind::Directory {
                        return Err(FsError::NotADirectory);
                    }
                    current = find_child(&current, name).ok_or(FsError::NotFound)?;
                }
            }
        }
        Ok(current)
    }

    /// Resolves the parent directory of `path`'s terminal component without
    /// requiring the terminal component itself to exist; returns the parent
    /// node and the leaf name. Used by `mkdir`/`create_file`.
    fn resolve_parent<'a>(&self, path: &'a str) -> Result<(NodeRef, &'a str), FsError> {
        Self::validate_path(path)?;
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let leaf = match components.last() {
            Some(l) if !is_reserved_component(l) => *l,
            _ => return Err(FsError::InvalidArgument),
        };

        let mut current = self.start_node(path);
        for component in &components[..components.len() - 1] {
            match *component {
                "." => continue,
                ".." => {
                    let parent = current.borrow().parent.clone();
                    if let Some(weak) = parent {
                        if let Some(p) = weak.upgrade() {
                            current = p;
                        }
                    }
                }
                name => {
                    if current.borrow().kind != NodeKind::Directory {
                        return Err(FsError::NotADirectory);
                    }
                    current = find_child(&current, name).ok_or(FsError::NotFound)?;
                }
            }
        }
        if current.borrow().kind != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        Ok((current, leaf))
    }

    fn create(&mut self, path: &str, kind: NodeKind) -> Result<(), FsError> {
        if self.resolve(path).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let (parent, leaf) = self.resolve_parent(path)?;
        let node = Node::new_child(leaf, kind, &parent);
        parent.borrow_mut().children.insert(0, node);
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        self.create(path, NodeKind::Directory)
    }

    fn create_file(&mut self, path: &str) -> Result<(), FsError> {
        self.create(path, NodeKind::File)
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let node = self.resolve(path)?;
        let mut node = node.borrow_mut();
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        node.file.as_mut().unwrap().truncate_to(data);
        Ok(())
    }

    fn append_file(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let node = self.resolve(path)?;
        let mut node = node.borrow_mut();
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        node.file.as_mut().unwrap().append(data);
        Ok(())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let node = self.resolve(path)?;
        let node = node.borrow();
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        Ok(node.file.as_ref().unwrap().contents().to_vec())
    }

    fn list_dir(&self, path: Option<&str>) -> Result<Vec<DirEntry>, FsError> {
        let node = match path {
            Some(p) => self.resolve(p)?,
            None => self.cwd.clone(),
        };
        let node = node.borrow();
        if node.kind != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        Ok(node
            .children
            .iter()
            .map(|c| {
                let c = c.borrow();
                DirEntry {
                    name: c.name.clone(),
                    is_directory: c.kind == NodeKind::Directory,
                    size: c.file.as_ref().map(|f| f.size).unwrap_or(0),
                }
            })
            .collect())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), FsError> {
        let node = self.resolve(path)?;
        if node.borrow().kind != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        self.cwd = node;
        Ok(())
    }

    fn pwd(&self) -> String {
        let mut components = Vec::new();
        let mut current = self.cwd.clone();
        loop {
            let parent = current.borrow().parent.clone();
            match parent.and_then(|w| w.upgrade()) {
                Some(p) => {
                    components.push(current.borrow().name.clone());
                    current = p;
                }
                None => break,
            }
        }
        if components.is_empty() {
            return String::from("/");
        }
        components.reverse();
        let mut out = String::new();
        for c in components {
            out.push('/');
            out.push_str(&c);
        }
        out
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path)
            .map(|n| n.borrow().kind == NodeKind::Directory)
            .unwrap_or(false)
    }

    /// Removes the subtree under `node` from its parent's child list. Does
    /// not itself check the `recursive`/non-empty invariant; callers must.
    ///
    /// Recursion is not guaranteed atomic: a deep tree could in principle
    /// exhaust available stack or heap mid-walk, leaving a partially
    /// detached subtree. The spec this mirrors documents the same property
    /// of the original's `fs_free_subtree` and does not require atomicity.
    fn remove(&mut self, path: &str, recursive: bool) -> Result<(), FsError> {
        let node = self.resolve(path)?;
        if node.borrow().parent.is_none() {
            return Err(FsError::InvalidArgument);
        }
        if node.borrow().kind == NodeKind::Directory && !node.borrow().children.is_empty() && !recursive {
            return Err(FsError::NotEmpty);
        }

        let parent = node
            .borrow()
            .parent
            .clone()
            .and_then(|w| w.upgrade())
            .ok_or(FsError::InvalidArgument)?;
        let name = node.borrow().name.clone();
        parent.borrow_mut().children.retain(|c| c.borrow().name != name);
        Ok(())
    }

    fn build_path(node: &NodeRef) -> String {
        let mut components = Vec::new();
        let mut current = node.clone();
        loop {
            let parent = current.borrow().parent.clone();
            match parent.and_then(|w| w.upgrade()) {
                Some(p) => {
                    components.push(current.borrow().name.clone());
                    current = p;
                }
                None => break,
            }
        }
        components.reverse();
        let mut out = String::new();
        for c in components {
            out.push('/');
            out.push_str(&c);
        }
        out
    }

    fn serialize_node(node: &NodeRef, out: &mut Vec<u8>, entry_count: &mut u32) -> Result<(), FsError> {
        let is_root = node.borrow().parent.is_none();
        if !is_root {
            let path = Self::build_path(node);
            if path.is_empty() || path.len() > 0xFFFF {
                return Err(FsError::InvalidArgument);
            }
            let node_ref = node.borrow();
            let data_len = node_ref.file.as_ref().map(|f| f.size as u32).unwrap_or(0);
            out.push(if node_ref.kind == NodeKind::Directory { 0 } else { 1 });
            out.push(0);
            out.extend_from_slice(&(path.len() as u16).to_le_bytes());
            out.extend_from_slice(&data_len.to_le_bytes());
            out.extend_from_slice(path.as_bytes());
            if let Some(file) = &node_ref.file {
                out.extend_from_slice(file.contents());
            }
            *entry_count += 1;
        }

        let children: Vec<NodeRef> = node.borrow().children.clone();
        for child in &children {
            Self::serialize_node(child, out, entry_count)?;
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, FsError> {
        let mut body = Vec::new();
        let mut entry_count = 0u32;
        Self::serialize_node(&self.root, &mut body, &mut entry_count)?;

        let total_size = HEADER_SIZE + body.len();
        if total_size > IMAGE_BUFFER_SIZE {
            return Err(FsError::OutOfMemory);
        }

        let mut image = Vec::with_capacity(total_size);
        image.extend_from_slice(&IMAGE_MAGIC.to_le_bytes());
        image.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        image.extend_from_slice(&(total_size as u32).to_le_bytes());
        image.extend_from_slice(&entry_count.to_le_bytes());
        image.extend_from_slice(&body);

        let padded_len = ((image.len() + SECTOR_SIZE - 1) / SECTOR_SIZE) * SECTOR_SIZE;
        if padded_len > IMAGE_BUFFER_SIZE {
            return Err(FsError::OutOfMemory);
        }
        image.resize(padded_len, 0);
        Ok(image)
    }

    fn deserialize(&mut self, image: &[u8]) -> Result<(), FsError> {
        if image.len() < HEADER_SIZE {
            return Err(FsError::InvalidArgument);
        }
        let magic = u32::from_le_bytes(image[0..4].try_into().unwrap());
        let version = u32::from_le_bytes(image[4..8].try_into().unwrap());
        let total_size = u32::from_le_bytes(image[8..12].try_into().unwrap()) as usize;
        let entry_count = u32::from_le_bytes(image[12..16].try_into().unwrap());

        if magic != IMAGE_MAGIC || version != IMAGE_VERSION {
            return Err(FsError::InvalidArgument);
        }
        if total_size < HEADER_SIZE || total_size > IMAGE_BUFFER_SIZE || total_size > image.len() {
            return Err(FsError::InvalidArgument);
        }

        self.root.borrow_mut().children.clear();
        self.cwd = self.root.clone();

        let mut cursor = HEADER_SIZE;
        for _ in 0..entry_count {
            if cursor + ENTRY_HEADER_SIZE > total_size {
                return Err(FsError::InvalidArgument);
            }
            let kind_byte = image[cursor];
            let path_len = u16::from_le_bytes(image[cursor + 2..cursor + 4].try_into().unwrap()) as usize;
            let data_len = u32::from_le_bytes(image[cursor + 4..cursor + 8].try_into().unwrap()) as usize;
            cursor += ENTRY_HEADER_SIZE;

            if path_len == 0 || cursor + path_len > total_size {
                return Err(FsError::InvalidArgument);
            }
            let path = core::str::from_utf8(&image[cursor..cursor + path_len])
                .map_err(|_| FsError::InvalidArgument)?;
            cursor += path_len;

            if cursor + data_len > total_size {
                return Err(FsError::InvalidArgument);
            }
            let data = &image[cursor..cursor + data_len];
            cursor += data_len;

            if kind_byte == 0 {
                match self.mkdir(path) {
                    Ok(()) | Err(FsError::AlreadyExists) => {}
                    Err(e) => return Err(e),
                }
            } else {
                match self.create_file(path) {
                    Ok(()) | Err(FsError::AlreadyExists) => {}
                    Err(e) => return Err(e),
                }
                self.write_file(path, data)?;
            }
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), FsError> {
        if !ata::is_available() {
            return Err(FsError::InvalidArgument);
        }
        let mut image = self.serialize()?;
        let sectors = (image.len() / SECTOR_SIZE) as u16;
        if sectors == 0 || sectors > DISK_SECTOR_COUNT {
            return Err(FsError::InvalidArgument);
        }
        ata::write_sectors(DISK_LBA_BASE, sectors, &mut image)?;
        self.image = Some(image);
        Ok(())
    }

    fn load(&mut self) -> Result<(), FsError> {
        if !ata::is_available() {
            return Err(FsError::InvalidArgument);
        }
        let mut buffer = self.image.take().unwrap_or_else(|| alloc::vec![0u8; IMAGE_BUFFER_SIZE]);
        if buffer.len() < IMAGE_BUFFER_SIZE {
            buffer.resize(IMAGE_BUFFER_SIZE, 0);
        }
        ata::read_sectors(DISK_LBA_BASE, DISK_SECTOR_COUNT, &mut buffer)?;
        let result = self.deserialize(&buffer);
        self.image = Some(buffer);
        result
    }
}

pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: usize,
}

lazy_static! {
    static ref FS: Mutex<Filesystem> = Mutex::new(Filesystem::new());
}

pub fn init() {
    *FS.lock() = Filesystem::new();
    if ata::is_available() {
        let _ = FS.lock().load();
    }
}

pub fn mkdir(path: &str) -> Result<(), FsError> {
    FS.lock().mkdir(path)
}

pub fn create_file(path: &str) -> Result<(), FsError> {
    FS.lock().create_file(path)
}

pub fn write_file(path: &str, data: &[u8]) -> Result<(), FsError> {
    FS.lock().write_file(path, data)
}

pub fn append_file(path: &str, data: &[u8]) -> Result<(), FsError> {
    FS.lock().append_file(path, data)
}

pub fn read_file(path: &str) -> Result<Vec<u8>, FsError> {
    FS.lock().read_file(path)
}

pub fn list_dir(path: Option<&str>) -> Result<Vec<DirEntry>, FsError> {
    FS.lock().list_dir(path)
}

pub fn change_dir(path: &str) -> Result<(), FsError> {
    FS.lock().change_dir(path)
}

pub fn pwd() -> String {
    FS.lock().pwd()
}

pub fn exists(path: &str) -> bool {
    FS.lock().exists(path)
}

pub fn is_dir(path: &str) -> bool {
    FS.lock().is_dir(path)
}

pub fn remove(path: &str, recursive: bool) -> Result<(), FsError> {
    FS.lock().remove(path, recursive)
}

pub fn save() -> Result<(), FsError> {
    FS.lock().save()
}

pub fn load() -> Result<(), FsError> {
    FS.lock().load()
}

pub fn persistence_available() -> bool {
    ata::is_available()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Filesystem {
        let root = Node::new_root();
        let cwd = root.clone();
        Filesystem { root, cwd, image: None }
    }

    #[test]
    fn mkdir_then_touch_then_write_then_read() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        fs.create_file("/a/b").unwrap();
        fs.write_file("/a/b", b"hello").unwrap();
        assert_eq!(fs.read_file("/a/b").unwrap(), b"hello");
        let entries = fs.list_dir(Some("/a")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "b");
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn mkdir_existing_path_conflicts() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        assert_eq!(fs.mkdir("/a"), Err(FsError::AlreadyExists));
    }

    #[test]
    fn write_to_directory_is_rejected() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        assert_eq!(fs.write_file("/a", b"x"), Err(FsError::IsADirectory));
    }

    #[test]
    fn write_missing_file_is_not_found() {
        let mut fs = fresh();
        assert_eq!(fs.write_file("/nope", b"x"), Err(FsError::NotFound));
    }

    #[test]
    fn append_grows_capacity_across_power_of_two_boundary() {
        let mut fs = fresh();
        fs.create_file("/big").unwrap();
        let chunk = [b'x'; 40];
        for _ in 0..3 {
            fs.append_file("/big", &chunk).unwrap();
        }
        assert_eq!(fs.read_file("/big").unwrap().len(), 120);
    }

    #[test]
    fn cd_and_pwd_round_trip() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        fs.change_dir("/a/b").unwrap();
        assert_eq!(fs.pwd(), "/a/b");
        fs.change_dir("..").unwrap();
        assert_eq!(fs.pwd(), "/a");
    }

    #[test]
    fn dot_dot_at_root_is_noop() {
        let mut fs = fresh();
        fs.change_dir("/").unwrap();
        fs.change_dir("..").unwrap();
        assert_eq!(fs.pwd(), "/");
    }

    #[test]
    fn list_dir_order_is_reverse_of_insertion() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        fs.create_file("/a/one").unwrap();
        fs.create_file("/a/two").unwrap();
        let entries = fs.list_dir(Some("/a")).unwrap();
        assert_eq!(entries[0].name, "two");
        assert_eq!(entries[1].name, "one");
    }

    #[test]
    fn remove_nonempty_directory_without_recursive_fails() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        fs.create_file("/a/b").unwrap();
        assert_eq!(fs.remove("/a", false), Err(FsError::NotEmpty));
        fs.remove("/a", true).unwrap();
        assert!(!fs.exists("/a"));
    }

    #[test]
    fn remove_root_is_invalid() {
        let mut fs = fresh();
        assert_eq!(fs.remove("/", false), Err(FsError::InvalidArgument));
    }

    #[test]
    fn serialize_then_deserialize_round_trips_tree() {
        let mut fs = fresh();
        fs.mkdir("/a").unwrap();
        fs.create_file("/a/b").unwrap();
        fs.write_file("/a/b", b"hello").unwrap();

        let image = fs.serialize().unwrap();
        let mut restored = fresh();
        restored.deserialize(&image).unwrap();

        assert!(restored.is_dir("/a"));
        assert_eq!(restored.read_file("/a/b").unwrap(), b"hello");
    }

    #[test]
    fn deserialize_rejects_bad_magic() {
        let mut fs = fresh();
        let mut bogus = alloc::vec![0u8; HEADER_SIZE];
        bogus[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        assert_eq!(fs.deserialize(&bogus), Err(FsError::InvalidArgument));
    }

    #[test]
    fn component_name_too_long_is_invalid() {
        let mut fs = fresh();
        let long_name: String = core::iter::repeat('x').take(MAX_NAME_LEN + 1).collect();
        let path = alloc::format!("/{}", long_name);
        assert_eq!(fs.mkdir(&path), Err(FsError::InvalidArgument));
    }
}

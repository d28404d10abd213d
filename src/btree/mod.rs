use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::OpenOptions;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::result;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::btree::node::{Node, BLOCK_SIZE};
use crate::btree::node_cache::{NodeCache, CACHE_CAPACITY};

mod check;
mod insert;
mod lookup;
pub mod node;
pub mod node_cache;
mod traverse;

//-------------------------------------------------------------------------

pub type Key = u64;
pub type Value = u64;

/// 0-based ordinal of a 512-byte block in the index file; doubles as the
/// node identifier.  Block 0 is the header, so 0 also serves as the null
/// id in parent and child slots.
pub type BlockId = u64;

pub const MAGIC: [u8; 8] = *b"4348PRJ3";

//-------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum BTreeError {
    #[error("index file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("index file not found: {0}")]
    NotFound(PathBuf),

    #[error("not an index file (bad magic)")]
    BadMagic,

    #[error("block {0}: {1}")]
    Corrupt(BlockId, String),

    #[error("malformed key/value pair: {0}")]
    BadPair(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = result::Result<T, BTreeError>;

//-------------------------------------------------------------------------

/// Block 0.  Rewritten on every clean close.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Header {
    root_id: BlockId,
    next_block_id: BlockId,
}

impl Header {
    fn pack(&self) -> Result<[u8; BLOCK_SIZE]> {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        let mut w = Cursor::new(&mut buf[8..24]);
        w.write_u64::<BigEndian>(self.root_id)?;
        w.write_u64::<BigEndian>(self.next_block_id)?;
        Ok(buf)
    }

    fn unpack(data: &[u8; BLOCK_SIZE]) -> Result<Header> {
        if data[0..8] != MAGIC {
            return Err(BTreeError::BadMagic);
        }
        let mut r = Cursor::new(&data[8..24]);
        let root_id = r.read_u64::<BigEndian>()?;
        let next_block_id = r.read_u64::<BigEndian>()?;
        Ok(Header {
            root_id,
            next_block_id,
        })
    }
}

//-------------------------------------------------------------------------

/// A B-tree index backed by a single file.
///
/// The header fields live in memory between operations and only reach the
/// file again on close; node blocks reach it through the cache.
pub struct BTree {
    cache: NodeCache<std::fs::File>,
    root_id: BlockId,
    next_block_id: BlockId,
}

impl BTree {
    /// Create a fresh, empty index at `path`.  Fails if the path exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(BTreeError::AlreadyExists(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut cache = NodeCache::new(file, CACHE_CAPACITY);
        let header = Header {
            root_id: 0,
            next_block_id: 1,
        };
        cache.write_block(0, &header.pack()?)?;

        info!("created index {}", path.display());
        Ok(Self {
            cache,
            root_id: 0,
            next_block_id: 1,
        })
    }

    /// Open an existing index.  Fails if the file is missing or does not
    /// start with the magic.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BTreeError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut cache = NodeCache::new(file, CACHE_CAPACITY);
        let header = Header::unpack(&cache.read_block(0)?)?;

        debug!(
            "opened index {} (root {}, next block {})",
            path.display(),
            header.root_id,
            header.next_block_id
        );
        Ok(Self {
            cache,
            root_id: header.root_id,
            next_block_id: header.next_block_id,
        })
    }

    pub fn root_id(&self) -> BlockId {
        self.root_id
    }

    pub fn next_block_id(&self) -> BlockId {
        self.next_block_id
    }

    /// Ids are handed out monotonically and never reused; the file grows
    /// by one block per allocation at the next eviction or flush.
    fn allocate_node(&mut self, parent_id: BlockId) -> Result<Node> {
        let block_id = self.next_block_id;
        self.next_block_id += 1;

        trace!("allocated node {}", block_id);
        let node = Node {
            block_id,
            parent_id,
            keys: vec![],
            values: vec![],
            children: vec![0],
        };
        self.cache.mark_dirty(node.clone())?;
        Ok(node)
    }

    #[cfg(test)]
    pub(crate) fn read_node(&mut self, loc: BlockId) -> Result<Node> {
        self.cache.get(loc)
    }

    /// Insert a sequence of pairs.  A malformed pair aborts the load;
    /// pairs applied up to that point stay applied.
    pub fn load<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<(Key, Value)>>,
    {
        for pair in pairs {
            let (key, value) = pair?;
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Flush all dirty nodes and rewrite the header.  The file handle is
    /// released on return.
    pub fn close(mut self) -> Result<()> {
        self.cache.flush_all()?;
        let header = Header {
            root_id: self.root_id,
            next_block_id: self.next_block_id,
        };
        self.cache.write_block(0, &header.pack()?)?;
        Ok(())
    }
}

//-------------------------------------------------------------------------

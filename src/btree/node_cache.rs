use linked_hash_map::LinkedHashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::trace;

use crate::btree::node::{Node, BLOCK_SIZE};
use crate::btree::{BTreeError, BlockId, Result};

//-------------------------------------------------------------------------

/// Enough for the working set of one descend-and-split: a root, an
/// internal node and a child.
pub const CACHE_CAPACITY: usize = 3;

struct CacheEntry {
    node: Node,
    dirty: bool,
}

/// A bounded write-back cache of decoded nodes, in strict LRU order.
///
/// All node block I/O goes through here; the engine touches the file
/// directly only for the header block, via read_block/write_block.
pub struct NodeCache<F> {
    file: F,
    capacity: usize,

    // Iteration order is LRU order, least recent first.
    entries: LinkedHashMap<BlockId, CacheEntry>,
}

impl<F: Read + Write + Seek> NodeCache<F> {
    pub fn new(file: F, capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            file,
            capacity,
            entries: LinkedHashMap::new(),
        }
    }

    pub fn residency(&self) -> usize {
        self.entries.len()
    }

    pub fn read_block(&mut self, loc: BlockId) -> Result<[u8; BLOCK_SIZE]> {
        self.file.seek(SeekFrom::Start(loc * BLOCK_SIZE as u64))?;
        let mut data = [0u8; BLOCK_SIZE];
        self.file.read_exact(&mut data)?;
        Ok(data)
    }

    pub fn write_block(&mut self, loc: BlockId, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start(loc * BLOCK_SIZE as u64))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn evict_lru_(&mut self) -> Result<()> {
        if let Some((loc, entry)) = self.entries.pop_front() {
            if entry.dirty {
                trace!("evicting dirty node {}", loc);
                let data = entry.node.encode()?;
                self.write_block(loc, &data)?;
            }
        }
        Ok(())
    }

    /// Read-through lookup.  The returned node is a copy; mutations only
    /// reach the cache (and eventually the file) via mark_dirty.
    pub fn get(&mut self, loc: BlockId) -> Result<Node> {
        if let Some(entry) = self.entries.get_refresh(&loc) {
            return Ok(entry.node.clone());
        }

        if self.entries.len() >= self.capacity {
            self.evict_lru_()?;
        }

        let data = self.read_block(loc)?;
        let node = Node::decode(loc, &data)?;
        if node.block_id != loc {
            return Err(BTreeError::Corrupt(
                loc,
                format!("node claims block id {}", node.block_id),
            ));
        }

        self.entries.insert(
            loc,
            CacheEntry {
                node: node.clone(),
                dirty: false,
            },
        );
        Ok(node)
    }

    /// Install `node` as the current image of its block and flag it for
    /// write-back.  Freshly allocated nodes enter the cache this way.
    pub fn mark_dirty(&mut self, node: Node) -> Result<()> {
        let loc = node.block_id;

        if let Some(entry) = self.entries.get_refresh(&loc) {
            entry.node = node;
            entry.dirty = true;
            return Ok(());
        }

        if self.entries.len() >= self.capacity {
            self.evict_lru_()?;
        }
        self.entries.insert(loc, CacheEntry { node, dirty: true });
        Ok(())
    }

    /// Write back every dirty resident node and empty the cache.
    pub fn flush_all(&mut self) -> Result<()> {
        let entries = std::mem::take(&mut self.entries);
        for (loc, entry) in entries {
            if entry.dirty {
                trace!("flushing node {}", loc);
                let data = entry.node.encode()?;
                self.write_block(loc, &data)?;
            }
        }
        self.file.flush()?;
        Ok(())
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------

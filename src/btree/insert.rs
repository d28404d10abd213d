use tracing::trace;

use crate::btree::node::{MAX_KEYS, MIN_DEGREE};
use crate::btree::{BTree, BlockId, Key, Result, Value};

//-------------------------------------------------------------------------

// The cache holds three nodes, so any get may evict whatever we are not
// holding.  The discipline throughout this file: fetch a copy, mutate it,
// hand it back with mark_dirty before the next get, and re-fetch rather
// than trust a copy across a call that touches the cache.

impl BTree {
    pub fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        if self.root_id == 0 {
            // first ever insert: a one key leaf becomes the root
            let mut root = self.allocate_node(0)?;
            root.keys = vec![key];
            root.values = vec![value];
            root.children = vec![0, 0];
            self.root_id = root.block_id;
            trace!("bootstrapped root at {}", self.root_id);
            self.cache.mark_dirty(root)?;
            return Ok(());
        }

        let mut root = self.cache.get(self.root_id)?;
        if root.count() == MAX_KEYS {
            // grow upward: the old root becomes child 0 of a fresh root
            let mut new_root = self.allocate_node(0)?;
            new_root.children = vec![root.block_id];

            root.parent_id = new_root.block_id;
            let old_root_id = root.block_id;
            self.cache.mark_dirty(root)?;

            self.root_id = new_root.block_id;
            trace!("root split, new root at {}", self.root_id);
            self.cache.mark_dirty(new_root)?;

            self.split_child_(self.root_id, 0, old_root_id)?;
            self.insert_nonfull_(self.root_id, key, value)
        } else {
            drop(root);
            self.insert_nonfull_(self.root_id, key, value)
        }
    }

    /// Split the full `child_id` (19 keys) at `parent.children[index]`:
    /// the median moves up into the parent, the upper nine entries move
    /// into a new sibling at `index + 1`.
    fn split_child_(&mut self, parent_id: BlockId, index: usize, child_id: BlockId) -> Result<()> {
        let t = MIN_DEGREE;

        let mut child = self.cache.get(child_id)?;
        debug_assert_eq!(child.count(), MAX_KEYS);

        let mut sibling = self.allocate_node(parent_id)?;
        let sibling_id = sibling.block_id;
        trace!("splitting node {} into {}", child_id, sibling_id);

        let median_key = child.keys[t - 1];
        let median_value = child.values[t - 1];

        sibling.keys = child.keys.split_off(t);
        sibling.values = child.values.split_off(t);
        child.keys.truncate(t - 1);
        child.values.truncate(t - 1);

        let was_leaf = child.is_leaf();
        let mut moved_children = vec![];
        if was_leaf {
            sibling.children = vec![0; sibling.keys.len() + 1];
        } else {
            sibling.children = child.children.split_off(t);
            moved_children = sibling.children.clone();
        }

        // Both halves go back to the cache before any grandchild is
        // fetched; those fetches may evict either one.
        self.cache.mark_dirty(child)?;
        self.cache.mark_dirty(sibling)?;

        // moved grandchildren now hang off the sibling
        for gc in moved_children {
            if gc != 0 {
                let mut grandchild = self.cache.get(gc)?;
                grandchild.parent_id = sibling_id;
                self.cache.mark_dirty(grandchild)?;
            }
        }

        let mut parent = self.cache.get(parent_id)?;
        parent.keys.insert(index, median_key);
        parent.values.insert(index, median_value);
        parent.children.insert(index + 1, sibling_id);
        self.cache.mark_dirty(parent)?;

        Ok(())
    }

    /// Insert below a node known not to be full.  Children are split on
    /// the way down, so no ancestor can overflow.
    fn insert_nonfull_(&mut self, node_id: BlockId, key: Key, value: Value) -> Result<()> {
        let mut node = self.cache.get(node_id)?;
        let mut idx = node.keys.partition_point(|&k| k < key);

        if idx < node.count() && node.keys[idx] == key {
            // duplicate: update in place
            node.values[idx] = value;
            self.cache.mark_dirty(node)?;
            return Ok(());
        }

        if node.is_leaf() {
            node.keys.insert(idx, key);
            node.values.insert(idx, value);
            self.cache.mark_dirty(node)?;
            return Ok(());
        }

        let child_id = node.children[idx];
        let child = self.cache.get(child_id)?;
        if child.count() == MAX_KEYS {
            self.split_child_(node_id, idx, child_id)?;

            // the median now sits at idx; our copy of the node is stale
            node = self.cache.get(node_id)?;
            if key == node.keys[idx] {
                node.values[idx] = value;
                self.cache.mark_dirty(node)?;
                return Ok(());
            }
            if key > node.keys[idx] {
                idx += 1;
            }
            let next = node.children[idx];
            return self.insert_nonfull_(next, key, value);
        }

        self.insert_nonfull_(child_id, key, value)
    }
}

//-------------------------------------------------------------------------

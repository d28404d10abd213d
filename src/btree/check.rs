use std::collections::BTreeSet;

use crate::btree::node::{MAX_KEYS, MIN_DEGREE};
use crate::btree::{BTree, BTreeError, BlockId, Key, Result};

//-------------------------------------------------------------------------

fn fail<T>(loc: BlockId, msg: &str) -> Result<T> {
    Err(BTreeError::Corrupt(loc, msg.to_string()))
}

impl BTree {
    /// Walk the whole tree verifying its structure; returns the number of
    /// entries.
    pub fn check(&mut self) -> Result<u64> {
        if self.root_id == 0 {
            return Ok(0);
        }
        let mut seen = BTreeSet::new();
        self.check_(self.root_id, 0, true, None, None, &mut seen)
    }

    fn check_(
        &mut self,
        loc: BlockId,
        parent_id: BlockId,
        is_root: bool,
        key_min: Option<Key>,
        key_max: Option<Key>,
        seen: &mut BTreeSet<BlockId>,
    ) -> Result<u64> {
        if !seen.insert(loc) {
            return fail(loc, "block reachable twice");
        }
        if loc >= self.next_block_id {
            return fail(loc, "block beyond next_block_id");
        }

        let node = self.cache.get(loc)?;

        let min_keys = if is_root { 1 } else { MIN_DEGREE - 1 };
        if node.count() < min_keys || node.count() > MAX_KEYS {
            return fail(loc, "key count out of bounds");
        }

        if node.parent_id != parent_id {
            return fail(loc, "parent back-pointer does not match");
        }

        // keys strictly increasing, strictly inside the subtree bounds
        let mut last = None;
        for &k in &node.keys {
            if let Some(last) = last {
                if k <= last {
                    return fail(loc, "keys out of order");
                }
            }
            last = Some(k);
        }
        if let (Some(min), Some(&first)) = (key_min, node.keys.first()) {
            if first <= min {
                return fail(loc, "key below subtree bound");
            }
        }
        if let (Some(max), Some(&last)) = (key_max, node.keys.last()) {
            if last >= max {
                return fail(loc, "key above subtree bound");
            }
        }

        let mut total = node.count() as u64;
        if !node.is_leaf() {
            for i in 0..=node.count() {
                let child = node.children[i];
                if child == 0 {
                    return fail(loc, "zero child slot in internal node");
                }
                let lo = if i == 0 { key_min } else { Some(node.keys[i - 1]) };
                let hi = if i == node.count() {
                    key_max
                } else {
                    Some(node.keys[i])
                };
                total += self.check_(child, loc, false, lo, hi, seen)?;
            }
        }

        Ok(total)
    }
}

//-------------------------------------------------------------------------

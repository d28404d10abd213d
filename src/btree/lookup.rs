use crate::btree::{BTree, Key, Result, Value};

//-------------------------------------------------------------------------

impl BTree {
    /// Point lookup.  Returns None on an empty tree or an absent key.
    pub fn lookup(&mut self, key: Key) -> Result<Option<Value>> {
        if self.root_id == 0 {
            return Ok(None);
        }

        let mut loc = self.root_id;
        loop {
            let node = self.cache.get(loc)?;
            let idx = node.keys.partition_point(|&k| k < key);

            if idx < node.count() && node.keys[idx] == key {
                return Ok(Some(node.values[idx]));
            }

            if node.is_leaf() {
                return Ok(None);
            }

            // A zero slot here means the key falls off a padded edge; a
            // well formed tree never descends through one.
            let child = node.children[idx];
            if child == 0 {
                return Ok(None);
            }
            loc = child;
        }
    }
}

//-------------------------------------------------------------------------

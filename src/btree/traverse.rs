use crate::btree::{BTree, BlockId, Key, Result, Value};

//-------------------------------------------------------------------------

impl BTree {
    /// In-order walk, delivering each pair to the sink in strictly
    /// increasing key order.
    pub fn traverse<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: FnMut(Key, Value),
    {
        if self.root_id == 0 {
            return Ok(());
        }
        self.traverse_(self.root_id, sink)
    }

    // Recursion works on a copy of the node, so the cache is free to
    // evict it while the subtrees are walked.
    fn traverse_<S>(&mut self, loc: BlockId, sink: &mut S) -> Result<()>
    where
        S: FnMut(Key, Value),
    {
        let node = self.cache.get(loc)?;
        let leaf = node.is_leaf();

        for i in 0..node.count() {
            if !leaf && node.children[i] != 0 {
                self.traverse_(node.children[i], sink)?;
            }
            sink(node.keys[i], node.values[i]);
        }

        if !leaf && node.children[node.count()] != 0 {
            self.traverse_(node.children[node.count()], sink)?;
        }

        Ok(())
    }
}

//-------------------------------------------------------------------------

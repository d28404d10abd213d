use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::btree::{BTreeError, BlockId, Key, Result, Value};

//-------------------------------------------------------------------------

pub const BLOCK_SIZE: usize = 512;

/// Minimum degree of the tree.
pub const MIN_DEGREE: usize = 10;
pub const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;
pub const MAX_CHILDREN: usize = 2 * MIN_DEGREE;

//-------------------------------------------------------------------------

/// A decoded node.  Carries exactly `count` keys and values, and
/// `count + 1` children; a leaf holds `count + 1` zero child ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub block_id: BlockId,
    pub parent_id: BlockId,
    pub keys: Vec<Key>,
    pub values: Vec<Value>,
    pub children: Vec<BlockId>,
}

impl Node {
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    // Block id 0 is the header, so a node with any real child has a
    // non-zero slot.
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == 0)
    }

    /// Serialize into a block image.  Unused slots are zero.
    pub fn encode(&self) -> Result<[u8; BLOCK_SIZE]> {
        assert_eq!(self.keys.len(), self.values.len());
        assert!(self.keys.len() <= MAX_KEYS);
        assert!(self.children.len() <= MAX_CHILDREN);

        let mut buf = [0u8; BLOCK_SIZE];
        let mut w = Cursor::new(&mut buf[..]);

        w.write_u64::<BigEndian>(self.block_id)?;
        w.write_u64::<BigEndian>(self.parent_id)?;
        w.write_u64::<BigEndian>(self.count() as u64)?;

        for i in 0..MAX_KEYS {
            w.write_u64::<BigEndian>(self.keys.get(i).copied().unwrap_or(0))?;
        }
        for i in 0..MAX_KEYS {
            w.write_u64::<BigEndian>(self.values.get(i).copied().unwrap_or(0))?;
        }
        for i in 0..MAX_CHILDREN {
            w.write_u64::<BigEndian>(self.children.get(i).copied().unwrap_or(0))?;
        }

        Ok(buf)
    }

    /// Deserialize from a block image.  `loc` is the block the image was
    /// read from and is only used in diagnostics; whether the stored own
    /// id matches is the caller's concern.
    pub fn decode(loc: BlockId, data: &[u8]) -> Result<Node> {
        if data.len() != BLOCK_SIZE {
            return Err(BTreeError::Corrupt(
                loc,
                format!("bad block length {}", data.len()),
            ));
        }

        let mut r = Cursor::new(data);
        let block_id = r.read_u64::<BigEndian>()?;
        let parent_id = r.read_u64::<BigEndian>()?;
        let count = r.read_u64::<BigEndian>()? as usize;

        if count > MAX_KEYS {
            return Err(BTreeError::Corrupt(loc, format!("bad key count {}", count)));
        }

        let mut keys = Vec::with_capacity(MAX_KEYS);
        for _ in 0..MAX_KEYS {
            keys.push(r.read_u64::<BigEndian>()?);
        }
        let mut values = Vec::with_capacity(MAX_KEYS);
        for _ in 0..MAX_KEYS {
            values.push(r.read_u64::<BigEndian>()?);
        }
        let mut children = Vec::with_capacity(MAX_CHILDREN);
        for _ in 0..MAX_CHILDREN {
            children.push(r.read_u64::<BigEndian>()?);
        }

        keys.truncate(count);
        values.truncate(count);
        children.truncate(count + 1);

        Ok(Node {
            block_id,
            parent_id,
            keys,
            values,
            children,
        })
    }
}

//-------------------------------------------------------------------------

#[cfg(test)]
mod node_tests {
    use super::*;
    use anyhow::{ensure, Result};

    fn mk_leaf(block_id: BlockId, keys: &[Key]) -> Node {
        Node {
            block_id,
            parent_id: 0,
            keys: keys.to_vec(),
            values: keys.iter().map(|k| k * 10).collect(),
            children: vec![0; keys.len() + 1],
        }
    }

    #[test]
    fn roundtrip_leaf() -> Result<()> {
        let node = mk_leaf(7, &[1, 5, 9]);
        let data = node.encode()?;
        let node2 = Node::decode(7, &data)?;
        ensure!(node2 == node);
        ensure!(node2.is_leaf());
        Ok(())
    }

    #[test]
    fn roundtrip_internal() -> Result<()> {
        let node = Node {
            block_id: 3,
            parent_id: 1,
            keys: vec![100, 200],
            values: vec![1000, 2000],
            children: vec![4, 5, 6],
        };
        let data = node.encode()?;
        let node2 = Node::decode(3, &data)?;
        ensure!(node2 == node);
        ensure!(!node2.is_leaf());
        Ok(())
    }

    #[test]
    fn encode_of_decode_preserves_padding() -> Result<()> {
        let data = mk_leaf(2, &[42]).encode()?;
        let data2 = Node::decode(2, &data)?.encode()?;
        ensure!(data2 == data);
        Ok(())
    }

    #[test]
    fn full_node_roundtrips() -> Result<()> {
        let keys: Vec<Key> = (1..=MAX_KEYS as u64).collect();
        let node = Node {
            block_id: 9,
            parent_id: 2,
            keys: keys.clone(),
            values: keys.iter().map(|k| k + 1).collect(),
            children: (100..100 + MAX_CHILDREN as u64).collect(),
        };
        let node2 = Node::decode(9, &node.encode()?)?;
        ensure!(node2 == node);
        Ok(())
    }

    #[test]
    fn extreme_values_roundtrip() -> Result<()> {
        let node = Node {
            block_id: 1,
            parent_id: 0,
            keys: vec![0, u64::MAX],
            values: vec![u64::MAX, 0],
            children: vec![0, 0, 0],
        };
        ensure!(Node::decode(1, &node.encode()?)? == node);
        Ok(())
    }

    #[test]
    fn decode_rejects_short_block() {
        assert!(Node::decode(1, &[0u8; 100]).is_err());
    }

    #[test]
    fn decode_rejects_bad_count() -> Result<()> {
        let mut data = mk_leaf(1, &[1]).encode()?;
        // stamp an impossible key count
        data[16..24].copy_from_slice(&(MAX_KEYS as u64 + 1).to_be_bytes());
        ensure!(Node::decode(1, &data).is_err());
        Ok(())
    }

    #[test]
    #[should_panic]
    fn encode_rejects_oversized_node() {
        let node = mk_leaf(1, &(0..MAX_KEYS as u64 + 1).collect::<Vec<_>>());
        let _ = node.encode();
    }

    #[test]
    fn leaf_detection_ignores_key_count() {
        // an internal node with a single child is not a leaf
        let node = Node {
            block_id: 8,
            parent_id: 0,
            keys: vec![],
            values: vec![],
            children: vec![9],
        };
        assert!(!node.is_leaf());
    }
}

//-------------------------------------------------------------------------

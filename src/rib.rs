//! Component B: the RIB trie.
//!
//! An uncompressed binary trie holding the authoritative prefix -> nexthop
//! index bindings. Every bit of a prefix gets its own level, unlike the
//! FIB's multi-bit stride; this is deliberate: the RIB is optimized for
//! simple, obviously-correct mutation, not for lookup speed.

use log::{debug, trace, warn};

use crate::af::Address;
use crate::errors::FibError;
use crate::af::Family;
use crate::MAX_ECMP;

/// A node in the RIB trie.
pub struct RibNode {
    key: Address,
    keylen: u8,
    valid: bool,
    route_idx: [Option<u32>; MAX_ECMP],
    num_routes: u8,
    left: Option<Box<RibNode>>,
    right: Option<Box<RibNode>>,
}

impl RibNode {
    fn fresh() -> Box<RibNode> {
        Box::new(RibNode {
            key: Address::ZERO,
            keylen: 0,
            valid: false,
            route_idx: [None; MAX_ECMP],
            num_routes: 0,
            left: None,
            right: None,
        })
    }

    pub fn key(&self) -> Address {
        self.key
    }

    pub fn keylen(&self) -> u8 {
        self.keylen
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn route_idx(&self) -> &[Option<u32>; MAX_ECMP] {
        &self.route_idx
    }

    pub fn num_routes(&self) -> u8 {
        self.num_routes
    }
}

/// The RIB trie itself, plus the family/table_id it is scoped to.
pub struct RibTree {
    pub family: Family,
    pub table_id: u32,
    root: Option<Box<RibNode>>,
}

impl RibTree {
    pub fn new(family: Family) -> Self {
        RibTree {
            family,
            table_id: 0,
            root: None,
        }
    }

    /// Add `idx` as a route for (key, keylen). Creates missing nodes along
    /// the path. Dedups a repeated idx at the same prefix; fails with
    /// `EcmpFull` if the slot array is already full of distinct indices.
    pub fn add(
        &mut self,
        key: Address,
        keylen: u8,
        idx: u32,
    ) -> Result<(), FibError> {
        debug!("rib add: keylen {keylen} idx {idx}");
        let root = self.root.take();
        self.root = Some(add(root, key.masked(keylen), keylen, idx, 0)?);
        Ok(())
    }

    /// Remove `idx` from the route set at (key, keylen). Fails with
    /// `NotFound` if the prefix, or that specific idx at the prefix, isn't
    /// present. Prunes nodes that become invalid and childless on the way
    /// back up.
    pub fn delete(
        &mut self,
        key: Address,
        keylen: u8,
        idx: u32,
    ) -> Result<(), FibError> {
        debug!("rib delete: keylen {keylen} idx {idx}");
        let root = self.root.take();
        self.root = delete(root, key.masked(keylen), keylen, 0, idx)?;
        Ok(())
    }

    /// Longest-prefix-match walk; returns the most specific valid node
    /// covering `key`.
    pub fn lookup(&self, key: Address) -> Option<&RibNode> {
        let result = lookup(&self.root, None, key, 0);
        trace!("rib lookup: matched keylen {:?}", result.map(RibNode::keylen));
        result
    }

    /// Pre-order, left-then-right traversal. Only nodes that are `valid`
    /// and have `num_routes > 0` are passed to `callback`. The first `Err`
    /// returned by `callback` aborts the traversal and is propagated.
    pub fn traverse<E>(
        &self,
        callback: &mut dyn FnMut(&RibNode) -> Result<(), E>,
    ) -> Result<(), E> {
        traverse(&self.root, callback)
    }
}

fn add(
    node: Option<Box<RibNode>>,
    key: Address,
    keylen: u8,
    idx: u32,
    depth: u8,
) -> Result<Box<RibNode>, FibError> {
    let mut n = node.unwrap_or_else(RibNode::fresh);

    if depth == keylen {
        if n.valid {
            if n.route_idx.iter().any(|slot| *slot == Some(idx)) {
                trace!("rib add: idx {idx} already present at depth {depth}, deduped");
                return Ok(n);
            }
            match n.route_idx.iter().position(Option::is_none) {
                Some(free) => {
                    trace!("rib add: appending idx {idx} at depth {depth}");
                    n.route_idx[free] = Some(idx);
                    n.num_routes += 1;
                    Ok(n)
                }
                None => {
                    warn!("rib add: ECMP slots full at depth {depth}, idx {idx} rejected");
                    Err(FibError::EcmpFull)
                }
            }
        } else {
            trace!("rib add: installing new node at depth {depth}, idx {idx}");
            n.key = key;
            n.keylen = keylen;
            n.valid = true;
            n.route_idx[0] = Some(idx);
            n.num_routes = 1;
            Ok(n)
        }
    } else if key.bit(depth) {
        n.right = Some(add(n.right.take(), key, keylen, idx, depth + 1)?);
        Ok(n)
    } else {
        n.left = Some(add(n.left.take(), key, keylen, idx, depth + 1)?);
        Ok(n)
    }
}

fn shrink(node: Option<Box<RibNode>>) -> Option<Box<RibNode>> {
    let mut n = node?;
    n.left = shrink(n.left.take());
    n.right = shrink(n.right.take());
    if n.left.is_none() && n.right.is_none() && !n.valid {
        None
    } else {
        Some(n)
    }
}

fn delete(
    node: Option<Box<RibNode>>,
    key: Address,
    keylen: u8,
    depth: u8,
    idx: u32,
) -> Result<Option<Box<RibNode>>, FibError> {
    let mut n = node.ok_or(FibError::NotFound)?;

    if depth == keylen {
        if !n.valid {
            warn!("rib delete: no node at depth {depth} for idx {idx}");
            return Err(FibError::NotFound);
        }
        let pos = n.route_idx.iter().position(|slot| *slot == Some(idx));
        let pos = pos.ok_or_else(|| {
            warn!("rib delete: idx {idx} not present at depth {depth}");
            FibError::NotFound
        })?;
        for j in pos..(MAX_ECMP - 1) {
            n.route_idx[j] = n.route_idx[j + 1];
        }
        n.route_idx[MAX_ECMP - 1] = None;
        n.num_routes -= 1;
        if n.num_routes == 0 {
            trace!("rib delete: node at depth {depth} now empty, invalidating");
            n.key = Address::ZERO;
            n.keylen = 0;
            n.valid = false;
            Ok(shrink(Some(n)))
        } else {
            Ok(Some(n))
        }
    } else {
        if key.bit(depth) {
            n.right = delete(n.right.take(), key, keylen, depth + 1, idx)?;
        } else {
            n.left = delete(n.left.take(), key, keylen, depth + 1, idx)?;
        }
        Ok(Some(n))
    }
}

fn lookup<'a>(
    node: &'a Option<Box<RibNode>>,
    cand: Option<&'a RibNode>,
    key: Address,
    depth: u8,
) -> Option<&'a RibNode> {
    match node {
        None => cand,
        Some(n) => {
            let cand = if n.valid {
                trace!("rib lookup: valid node at depth {depth}, keylen {}", n.keylen);
                Some(n.as_ref())
            } else {
                cand
            };
            let next = if key.bit(depth) { &n.right } else { &n.left };
            lookup(next, cand, key, depth + 1)
        }
    }
}

fn traverse<E>(
    node: &Option<Box<RibNode>>,
    callback: &mut dyn FnMut(&RibNode) -> Result<(), E>,
) -> Result<(), E> {
    if let Some(n) = node {
        if n.valid && n.num_routes > 0 {
            callback(n)?;
        }
        traverse(&n.left, &mut *callback)?;
        traverse(&n.right, &mut *callback)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pfx(s: &str, len: u8) -> Address {
        Address::from_ipaddr(s.parse().unwrap()).masked(len)
    }

    #[test]
    fn add_then_lookup_exact() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.0.0.0", 8), 8, 7).unwrap();
        let n = rib.lookup(pfx("10.1.2.3", 32)).unwrap();
        assert_eq!(n.keylen(), 8);
        assert_eq!(n.route_idx()[0], Some(7));
    }

    #[test]
    fn longer_prefix_wins_on_lookup() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        rib.add(pfx("10.1.0.0", 16), 16, 2).unwrap();
        assert_eq!(rib.lookup(pfx("10.1.2.3", 32)).unwrap().keylen(), 16);
        assert_eq!(rib.lookup(pfx("10.2.0.1", 32)).unwrap().keylen(), 8);
    }

    #[test]
    fn duplicate_idx_is_deduped() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        let n = rib.lookup(pfx("10.0.0.1", 32)).unwrap();
        assert_eq!(n.num_routes(), 1);
    }

    #[test]
    fn delete_unknown_prefix_fails() {
        let mut rib = RibTree::new(Family::Inet);
        assert_eq!(
            rib.delete(pfx("10.0.0.0", 8), 8, 1),
            Err(FibError::NotFound)
        );
    }

    #[test]
    fn delete_shrinks_childless_invalid_nodes() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        rib.delete(pfx("10.0.0.0", 8), 8, 1).unwrap();
        assert!(rib.lookup(pfx("10.0.0.1", 32)).is_none());
    }

    #[test]
    fn traverse_visits_only_valid_nodes_preorder() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("0.0.0.0", 0), 0, 1).unwrap();
        rib.add(pfx("10.0.0.0", 8), 8, 2).unwrap();
        rib.add(pfx("10.1.0.0", 16), 16, 3).unwrap();

        let mut seen = Vec::new();
        rib.traverse::<()>(&mut |n| {
            seen.push(n.keylen());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![0, 8, 16]);
    }

    #[test]
    fn traverse_can_abort() {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("0.0.0.0", 0), 0, 1).unwrap();
        rib.add(pfx("10.0.0.0", 8), 8, 2).unwrap();

        let mut seen = Vec::new();
        let result = rib.traverse(&mut |n| {
            seen.push(n.keylen());
            Err::<(), _>("stop")
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, vec![0]);
    }
}

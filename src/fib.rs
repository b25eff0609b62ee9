//! Component C: the FIB trie — the hard subsystem.
//!
//! A multi-bit, prefix-expanded trie with a fixed branching factor of
//! `2^stride` per internal node. Expansion trades memory for a constant
//! amount of work per stride: the lookup path never compares prefix
//! lengths, it just walks `stride`-bit steps until it falls off the tree,
//! remembering the last leaf it passed.
//!
//! Correctness hinges on the invariant enforced by `add`: a leaf is only
//! ever overwritten by a *longer* prefix. Everything else (expansion into
//! siblings, demotion of a leaf to an internal node, propagation through an
//! already-internal node) is bookkeeping in service of that one rule.

use log::{debug, log_enabled, trace};

use crate::af::{Address, Family};
use crate::errors::FibError;
use crate::MAX_ECMP;

/// A node in the FIB trie.
pub struct FibNode {
    leaf: bool,
    key: Address,
    keylen: u8,
    route_idx: [Option<u32>; MAX_ECMP],
    num_routes: u8,
    children: Vec<Option<Box<FibNode>>>,
}

impl FibNode {
    fn fresh(branch_sz: usize) -> Box<FibNode> {
        Box::new(FibNode {
            leaf: false,
            key: Address::ZERO,
            keylen: 0,
            route_idx: [None; MAX_ECMP],
            num_routes: 0,
            children: (0..branch_sz).map(|_| None).collect(),
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn key(&self) -> Address {
        self.key
    }

    pub fn keylen(&self) -> u8 {
        self.keylen
    }

    pub fn route_idx(&self) -> &[Option<u32>; MAX_ECMP] {
        &self.route_idx
    }

    pub fn num_routes(&self) -> u8 {
        self.num_routes
    }
}

/// The FIB trie, configured with a stride (bits consumed per level).
pub struct Fib {
    pub family: Option<Family>,
    pub table_id: u32,
    stride: u8,
    branch_sz: usize,
    root: Option<Box<FibNode>>,
}

impl Fib {
    /// `stride` must be in `1..=8` (the children array has `2^stride`
    /// slots; the test matrix exercises 1, 2, 4 and 8).
    pub fn new(stride: u8) -> Self {
        assert!(
            (1..=8).contains(&stride),
            "stride must be between 1 and 8 bits, got {stride}"
        );
        Fib {
            family: None,
            table_id: 0,
            stride,
            branch_sz: 1usize << stride,
            root: None,
        }
    }

    pub fn stride(&self) -> u8 {
        self.stride
    }

    /// Install `route_idx` as the route for (key, keylen). Never panics and,
    /// in this allocator model, never fails — `Result` is kept for parity
    /// with the RIB's and the rebuild protocol's signatures.
    pub fn add(
        &mut self,
        key: Address,
        keylen: u8,
        route_idx: [Option<u32>; MAX_ECMP],
    ) -> Result<(), FibError> {
        debug!("fib add: keylen {keylen} stride {}", self.stride);
        let root = self.root.take();
        self.root = Some(add(
            root,
            key.masked(keylen),
            keylen,
            route_idx,
            0,
            self.stride,
            self.branch_sz,
        ));
        Ok(())
    }

    /// Descend from the root, remembering the most recent leaf seen, and
    /// return it at the first missing child (or `None` if no leaf was ever
    /// seen).
    pub fn lookup(&self, key: Address) -> Option<&FibNode> {
        if log_enabled!(log::Level::Trace) {
            trace!("fib lookup: key {key:?}");
        }
        let result = lookup(&self.root, None, key, 0, self.stride);
        trace!("fib lookup: matched keylen {:?}", result.map(FibNode::keylen));
        debug_assert!(result.is_none_or(FibNode::is_leaf), "lookup only ever returns leaves");
        result
    }
}

fn count_occupied(route_idx: &[Option<u32>; MAX_ECMP]) -> u8 {
    route_idx.iter().filter(|slot| slot.is_some()).count() as u8
}

#[allow(clippy::too_many_arguments)]
fn add(
    node: Option<Box<FibNode>>,
    key: Address,
    keylen: u8,
    route_idx: [Option<u32>; MAX_ECMP],
    depth: u8,
    stride: u8,
    branch_sz: usize,
) -> Box<FibNode> {
    let existed = node.is_some();
    let mut n = node.unwrap_or_else(|| FibNode::fresh(branch_sz));

    // Case A: the prefix reaches or has already passed this depth.
    if keylen <= depth {
        if !n.leaf && existed {
            trace!("fib add: case A, propagate into {branch_sz} children at depth {depth}");
            // Re-entrant only along the expansion fringe of a shorter
            // prefix overriding what's already here (see Case B); children
            // holding a longer prefix are protected by the leaf-overwrite
            // rule below, wherever this recursion eventually reaches them.
            for i in 0..branch_sz {
                let child = n.children[i].take();
                n.children[i] = Some(add(
                    child,
                    key,
                    keylen,
                    route_idx,
                    depth + stride,
                    stride,
                    branch_sz,
                ));
            }
            return n;
        }
        if n.leaf {
            if keylen > n.keylen {
                trace!(
                    "fib add: case A, leaf overwrite ({} -> {keylen})",
                    n.keylen
                );
                n.key = key;
                n.keylen = keylen;
                n.route_idx = route_idx;
                n.num_routes = count_occupied(&route_idx);
            } else {
                trace!(
                    "fib add: case A, existing leaf keylen {} >= {keylen}, kept",
                    n.keylen
                );
            }
            return n;
        }
        trace!("fib add: case A, install fresh leaf at depth {depth}");
        n.leaf = true;
        n.key = key;
        n.keylen = keylen;
        n.route_idx = route_idx;
        n.num_routes = count_occupied(&route_idx);
        return n;
    }

    // Case B: the prefix ends mid-stride.
    if keylen < depth + stride {
        let bits_in_depth = keylen - depth;
        let base = key.bits_at(depth, bits_in_depth);
        let first = (base << (stride - bits_in_depth)) as usize;
        let count = 1usize << (stride - bits_in_depth);
        trace!(
            "fib add: case B, mid-stride at depth {depth}, covering children [{first}, {})",
            first + count
        );

        let was_leaf = n.leaf;
        let old_key = n.key;
        let old_keylen = n.keylen;
        let old_route_idx = n.route_idx;

        for i in 0..branch_sz {
            if i >= first && i < first + count {
                let child = n.children[i].take();
                n.children[i] = Some(add(
                    child,
                    key,
                    keylen,
                    route_idx,
                    depth + stride,
                    stride,
                    branch_sz,
                ));
            } else if was_leaf {
                let child = n.children[i].take();
                n.children[i] = Some(add(
                    child,
                    old_key,
                    old_keylen,
                    old_route_idx,
                    depth + stride,
                    stride,
                    branch_sz,
                ));
            }
        }
        n.leaf = false;
        n.keylen = 0;
        n.route_idx = [None; MAX_ECMP];
        n.num_routes = 0;
        return n;
    }

    // Case C: the prefix extends past this depth and the node is currently
    // a leaf: expand the old prefix into every child, then descend the one
    // child the new prefix selects.
    if n.leaf {
        trace!("fib add: case C, expand leaf at depth {depth} into {branch_sz} children");
        let old_key = n.key;
        let old_keylen = n.keylen;
        let old_route_idx = n.route_idx;
        for i in 0..branch_sz {
            let child = n.children[i].take();
            n.children[i] = Some(add(
                child,
                old_key,
                old_keylen,
                old_route_idx,
                depth + stride,
                stride,
                branch_sz,
            ));
        }
        let index = key.bits_at(depth, stride) as usize;
        let child = n.children[index].take();
        n.children[index] = Some(add(
            child,
            key,
            keylen,
            route_idx,
            depth + stride,
            stride,
            branch_sz,
        ));
        n.leaf = false;
        n.keylen = 0;
        n.route_idx = [None; MAX_ECMP];
        n.num_routes = 0;
        return n;
    }

    // Case D: internal node, prefix extends past this depth; recurse once
    // more.
    trace!("fib add: case D, descend at depth {depth}");
    let index = key.bits_at(depth, stride) as usize;
    let child = n.children[index].take();
    n.children[index] = Some(add(
        child,
        key,
        keylen,
        route_idx,
        depth + stride,
        stride,
        branch_sz,
    ));
    n
}

fn lookup<'a>(
    node: &'a Option<Box<FibNode>>,
    cand: Option<&'a FibNode>,
    key: Address,
    depth: u8,
    stride: u8,
) -> Option<&'a FibNode> {
    match node {
        None => {
            trace!("fib lookup: fell off the trie at depth {depth}");
            cand
        }
        Some(n) => {
            let cand = if n.leaf {
                trace!("fib lookup: leaf seen at depth {depth}, keylen {}", n.keylen);
                Some(n.as_ref())
            } else {
                cand
            };
            let index = key.bits_at(depth, stride) as usize;
            lookup(&n.children[index], cand, key, depth + stride, stride)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from_ipaddr(s.parse().unwrap())
    }

    fn idx(i: u32) -> [Option<u32>; MAX_ECMP] {
        let mut r = [None; MAX_ECMP];
        r[0] = Some(i);
        r
    }

    #[test]
    fn default_route_matches_everything() {
        let mut fib = Fib::new(2);
        fib.add(addr("0.0.0.0"), 0, idx(1)).unwrap();
        let n = fib.lookup(addr("1.2.3.4")).unwrap();
        assert_eq!(n.keylen(), 0);
        assert_eq!(n.route_idx()[0], Some(1));
    }

    #[test]
    fn longer_prefix_wins_regardless_of_insertion_order() {
        for reversed in [false, true] {
            let mut fib = Fib::new(2);
            if reversed {
                fib.add(addr("10.1.0.0"), 16, idx(2)).unwrap();
                fib.add(addr("10.0.0.0"), 8, idx(1)).unwrap();
            } else {
                fib.add(addr("10.0.0.0"), 8, idx(1)).unwrap();
                fib.add(addr("10.1.0.0"), 16, idx(2)).unwrap();
            }
            assert_eq!(fib.lookup(addr("10.1.2.3")).unwrap().keylen(), 16);
            assert_eq!(fib.lookup(addr("10.2.0.1")).unwrap().keylen(), 8);
        }
    }

    #[test]
    fn no_route_returns_none() {
        let mut fib = Fib::new(2);
        fib.add(addr("192.0.2.0"), 24, idx(1)).unwrap();
        assert!(fib.lookup(addr("192.0.3.1")).is_none());
    }

    #[test]
    fn mid_stride_prefix_expands_to_covered_children() {
        // 96.0.0.0/3 with stride 2: bit 3 is mid-stride within the second
        // 2-bit level (depth 2..4).
        let mut fib = Fib::new(2);
        fib.add(addr("96.0.0.0"), 3, idx(9)).unwrap();
        let n = fib.lookup(addr("127.255.255.255")).unwrap();
        assert_eq!(n.keylen(), 3);
        assert_eq!(n.route_idx()[0], Some(9));
    }

    #[test]
    fn double_insert_is_a_no_op() {
        let mut fib = Fib::new(2);
        fib.add(addr("10.0.0.0"), 8, idx(1)).unwrap();
        fib.add(addr("10.0.0.0"), 8, idx(1)).unwrap();
        let n = fib.lookup(addr("10.0.0.1")).unwrap();
        assert_eq!(n.keylen(), 8);
        assert_eq!(n.route_idx()[0], Some(1));
    }

    #[test]
    fn host_route_is_exact() {
        let mut fib = Fib::new(4);
        fib.add(addr("203.0.113.7"), 32, idx(5)).unwrap();
        assert_eq!(fib.lookup(addr("203.0.113.7")).unwrap().keylen(), 32);
        assert!(fib.lookup(addr("203.0.113.6")).is_none());
    }
}

//! Component A: the nexthop interning table.
//!
//! A fixed-capacity, open-addressed hash table that interns
//! (family, nexthop-address, output-interface) tuples into compact `u32`
//! indices. The RIB and FIB store these indices instead of repeating the
//! full tuple at every node.

use log::trace;

use crate::af::{Address, Family};
use crate::errors::FibError;

/// 2^20 slots.
pub const TABLE_SIZE: usize = 1 << 20;

#[derive(Clone, Copy)]
struct Slot {
    /// `0` is the sentinel for "empty"; `Family::Inet`/`Family::Inet6` never
    /// take that value.
    family: i32,
    nexthop: Address,
    oif: u32,
}

impl Slot {
    const EMPTY: Slot = Slot {
        family: 0,
        nexthop: Address::ZERO,
        oif: 0,
    };
}

/// The fixed-capacity nexthop interning table.
pub struct NexthopTable {
    slots: Vec<Slot>,
}

impl Default for NexthopTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NexthopTable {
    pub fn new() -> Self {
        NexthopTable {
            slots: vec![Slot::EMPTY; TABLE_SIZE],
        }
    }

    /// Jenkins one-at-a-time hash over (nexthop ∥ big-endian oif), masked
    /// to 20 bits.
    fn hash(nexthop: Address, oif: u32) -> u32 {
        let mut data = [0u8; 20];
        data[..16].copy_from_slice(&nexthop.0);
        data[16..].copy_from_slice(&oif.to_be_bytes());
        jenkins_one_at_a_time(&data) & (TABLE_SIZE as u32 - 1)
    }

    /// Intern a tuple, returning its index. Probes from `hash(nexthop,
    /// oif)`; an existing slot with all three fields equal is returned
    /// (dedup/idempotent), otherwise the tuple is written into the first
    /// empty slot found. Fails with `TableFull` once every slot has been
    /// visited.
    pub fn add_entry(
        &mut self,
        family: Family,
        nexthop: Address,
        oif: u32,
    ) -> Result<u32, FibError> {
        let hash = Self::hash(nexthop, oif);
        let mut offset = hash;
        loop {
            let slot = self.slots[offset as usize];
            if slot.family == 0 {
                self.slots[offset as usize] = Slot {
                    family: family as i32,
                    nexthop,
                    oif,
                };
                trace!("nexthop table: inserted at slot {offset}");
                return Ok(offset);
            }
            if slot.family == family as i32
                && slot.oif == oif
                && slot.nexthop == nexthop
            {
                return Ok(offset);
            }
            offset = (offset + 1) % TABLE_SIZE as u32;
            if offset == hash {
                return Err(FibError::TableFull);
            }
        }
    }

    /// Same probe walk as `add_entry`, without inserting.
    pub fn lookup_entry(
        &self,
        family: Family,
        nexthop: Address,
        oif: u32,
    ) -> Option<u32> {
        let hash = Self::hash(nexthop, oif);
        let mut offset = hash;
        loop {
            let slot = self.slots[offset as usize];
            if slot.family == 0 {
                return None;
            }
            if slot.family == family as i32
                && slot.oif == oif
                && slot.nexthop == nexthop
            {
                return Some(offset);
            }
            offset = (offset + 1) % TABLE_SIZE as u32;
            if offset == hash {
                return None;
            }
        }
    }

    /// Resolve an interned index back to its tuple.
    pub fn get(&self, idx: u32) -> Option<(Family, Address, u32)> {
        let slot = *self.slots.get(idx as usize)?;
        if slot.family == 0 {
            return None;
        }
        let family = if slot.family == Family::Inet as i32 {
            Family::Inet
        } else {
            Family::Inet6
        };
        Some((family, slot.nexthop, slot.oif))
    }
}

fn jenkins_one_at_a_time(data: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &b in data {
        hash = hash.wrapping_add(b as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

//! Components F & (the file-reading half of) G: route/lookup file parsing
//! and the drivers that apply parsed lines to the nexthop table, RIB and
//! oracle.
//!
//! Deliberately thin: this module owns only the textual format
//! (`"<cidr> <nexthop>"` / `"<ip>"`); the core trie semantics live in
//! `rib`, `fib` and `nexthop`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use inetnum::addr::Prefix;
use log::warn;

use crate::af::{Address, Family};
use crate::errors::FibError;
use crate::nexthop::NexthopTable;
use crate::oracle::Oracle;
use crate::rib::RibTree;

/// A parsed `"<cidr> <nexthop>"` line.
pub struct RouteLine {
    pub prefix: Address,
    pub keylen: u8,
    pub nexthop: Address,
}

fn family_matches(addr: &IpAddr, family: Family) -> bool {
    Family::from_ipaddr(addr) == family
}

/// Parse a single non-empty, already-trimmed route line.
pub fn parse_route_line(
    line: &str,
    family: Family,
) -> Result<RouteLine, FibError> {
    let err = || FibError::ParseError(line.to_string());

    let mut fields = line.split_whitespace();
    let cidr = fields.next().ok_or_else(err)?;
    let nexthop = fields.next().ok_or_else(err)?;
    if fields.next().is_some() {
        return Err(err());
    }

    let (addr_str, len_str) = cidr.split_once('/').ok_or_else(err)?;
    let addr = IpAddr::from_str(addr_str).map_err(|_| err())?;
    let len: u8 = len_str.parse().map_err(|_| err())?;
    if !family_matches(&addr, family) || len > family.bits() {
        return Err(err());
    }
    let prefix = Prefix::new(addr, len).map_err(|_| err())?;

    let nexthop_addr = IpAddr::from_str(nexthop).map_err(|_| err())?;
    if !family_matches(&nexthop_addr, family) {
        return Err(err());
    }

    Ok(RouteLine {
        prefix: Address::from_ipaddr(prefix.addr()).masked(prefix.len()),
        keylen: prefix.len(),
        nexthop: Address::from_ipaddr(nexthop_addr),
    })
}

/// Parse a single non-empty, already-trimmed lookup line.
pub fn parse_lookup_line(
    line: &str,
    family: Family,
) -> Result<Address, FibError> {
    let err = || FibError::ParseError(line.to_string());
    let addr = IpAddr::from_str(line).map_err(|_| err())?;
    if !family_matches(&addr, family) {
        return Err(err());
    }
    Ok(Address::from_ipaddr(addr))
}

/// Load a route file: for every well-formed line, intern the nexthop,
/// add the route to `rib`, and (when given) record it in `oracle` too.
/// Malformed lines are logged and skipped; returns the count of routes
/// actually added.
pub fn load_routes(
    path: &Path,
    family: Family,
    table: &mut NexthopTable,
    rib: &mut RibTree,
    oracle: Option<&mut Oracle>,
) -> Result<usize, FibError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut oracle = oracle;
    let mut added = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_route_line(trimmed, family) {
            Ok(route) => {
                let idx = table.add_entry(family, route.nexthop, 0)?;
                rib.add(route.prefix, route.keylen, idx)?;
                if let Some(oracle) = oracle.as_deref_mut() {
                    oracle.insert(route.prefix, route.keylen, idx);
                }
                added += 1;
            }
            Err(e) => {
                warn!(
                    "skipping malformed route line {}: {:?} ({e})",
                    lineno + 1,
                    trimmed
                );
            }
        }
    }
    Ok(added)
}

/// Load a lookup file: one address per well-formed line. Malformed lines
/// are logged and skipped.
pub fn load_lookups(
    path: &Path,
    family: Family,
) -> Result<Vec<Address>, FibError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut addrs = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_lookup_line(trimmed, family) {
            Ok(addr) => addrs.push(addr),
            Err(e) => {
                warn!(
                    "skipping malformed lookup line {}: {:?} ({e})",
                    lineno + 1,
                    trimmed
                );
            }
        }
    }
    Ok(addrs)
}

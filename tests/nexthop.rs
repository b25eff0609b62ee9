//! Nexthop table round-trip and idempotence properties.

use fib_store::af::{Address, Family};
use fib_store::nexthop::NexthopTable;

fn nh(s: &str) -> Address {
    Address::from_ipaddr(s.parse().unwrap())
}

#[test]
fn add_then_lookup_round_trips() {
    let mut table = NexthopTable::new();
    let idx = table.add_entry(Family::Inet, nh("198.51.100.1"), 3).unwrap();
    assert_eq!(
        table.lookup_entry(Family::Inet, nh("198.51.100.1"), 3),
        Some(idx)
    );
    assert_eq!(table.get(idx), Some((Family::Inet, nh("198.51.100.1"), 3)));
}

#[test]
fn add_entry_is_idempotent_across_many_calls() {
    let mut table = NexthopTable::new();
    let first = table.add_entry(Family::Inet, nh("203.0.113.9"), 0).unwrap();
    for _ in 0..10 {
        let idx = table.add_entry(Family::Inet, nh("203.0.113.9"), 0).unwrap();
        assert_eq!(idx, first);
    }
}

#[test]
fn families_do_not_collide() {
    let mut table = NexthopTable::new();
    let v4 = table.add_entry(Family::Inet, nh("10.0.0.1"), 0).unwrap();
    assert_eq!(table.get(v4), Some((Family::Inet, nh("10.0.0.1"), 0)));
    assert_eq!(table.lookup_entry(Family::Inet6, nh("10.0.0.1"), 0), None);
}

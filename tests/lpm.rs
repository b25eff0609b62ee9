//! End-to-end longest-prefix-match scenarios, run across every supported
//! stride.

use fib_store::af::{Address, Family};
use fib_store::fib::Fib;
use fib_store::rebuild::rebuild;
use fib_store::rib::RibTree;

fn addr(s: &str) -> Address {
    Address::from_ipaddr(s.parse().unwrap())
}

fn pfx(s: &str, len: u8) -> Address {
    addr(s).masked(len)
}

const STRIDES: [u8; 4] = [1, 2, 4, 8];

#[test]
fn default_route_matches_everything() {
    for stride in STRIDES {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("0.0.0.0", 0), 0, 1).unwrap();
        let mut fib = Fib::new(stride);
        rebuild(&rib, &mut fib).unwrap();
        let n = fib.lookup(addr("1.2.3.4")).unwrap();
        assert_eq!(n.keylen(), 0, "stride {stride}");
    }
}

#[test]
fn more_specific_wins_forward_order() {
    for stride in STRIDES {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        rib.add(pfx("10.1.0.0", 16), 16, 2).unwrap();
        let mut fib = Fib::new(stride);
        rebuild(&rib, &mut fib).unwrap();
        assert_eq!(
            fib.lookup(addr("10.1.2.3")).unwrap().keylen(),
            16,
            "stride {stride}"
        );
        assert_eq!(
            fib.lookup(addr("10.2.0.1")).unwrap().keylen(),
            8,
            "stride {stride}"
        );
    }
}

#[test]
fn more_specific_wins_reverse_order() {
    for stride in STRIDES {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("10.1.0.0", 16), 16, 2).unwrap();
        rib.add(pfx("10.0.0.0", 8), 8, 1).unwrap();
        let mut fib = Fib::new(stride);
        rebuild(&rib, &mut fib).unwrap();
        assert_eq!(
            fib.lookup(addr("10.1.2.3")).unwrap().keylen(),
            16,
            "stride {stride}"
        );
        assert_eq!(
            fib.lookup(addr("10.2.0.1")).unwrap().keylen(),
            8,
            "stride {stride}"
        );
    }
}

#[test]
fn no_match_returns_none() {
    for stride in STRIDES {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("192.0.2.0", 24), 24, 1).unwrap();
        let mut fib = Fib::new(stride);
        rebuild(&rib, &mut fib).unwrap();
        assert!(fib.lookup(addr("192.0.3.1")).is_none(), "stride {stride}");
    }
}

#[test]
fn mid_stride_prefix_expands_correctly() {
    for stride in STRIDES {
        let mut rib = RibTree::new(Family::Inet);
        rib.add(pfx("96.0.0.0", 3), 3, 1).unwrap();
        let mut fib = Fib::new(stride);
        rebuild(&rib, &mut fib).unwrap();
        let n = fib.lookup(addr("127.255.255.255")).unwrap();
        assert_eq!(n.keylen(), 3, "stride {stride}");
    }
}

//! A longest-prefix-match forwarding information base built by rebuilding
//! a routing information base.
//!
//! `af` and `errors` are the shared vocabulary; `nexthop`, `rib` and `fib`
//! are the three stores (Components A-C); `rebuild` turns a `rib::RibTree`
//! into a `fib::Fib` (Component D); `oracle` is a test-only ground truth
//! (Component E); `parse` reads the route/lookup file formats the `fib`
//! binary consumes.

pub mod af;
pub mod errors;
pub mod fib;
pub mod nexthop;
pub mod oracle;
pub mod parse;
pub mod rebuild;
pub mod rib;

pub use af::{Address, Family};
pub use errors::FibError;
pub use fib::Fib;
pub use nexthop::NexthopTable;
pub use rib::RibTree;

/// Equal-cost multipath fan-out per prefix.
///
/// The source this crate is grounded on fixes this at compile time; kept
/// as a single named constant here rather than a generic parameter since
/// nothing in this crate's scope varies it at runtime.
pub const MAX_ECMP: usize = 1;

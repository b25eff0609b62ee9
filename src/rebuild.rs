//! Component D: the RIB -> FIB rebuild protocol.

use log::debug;

use crate::errors::FibError;
use crate::fib::Fib;
use crate::rib::RibTree;

/// Copy `family`/`table_id` from `rib` to `fib`, then traverse the RIB in
/// its natural pre-order and replay every valid route into the FIB.
///
/// Pre-order is convenient, not required: `Fib::add`'s leaf-overwrite rule
/// makes the result independent of insertion order (see
/// `tests/oracle_sweep.rs`). Aborts on the first failing add, leaving `fib`
/// in a partial state the caller must discard by rebuilding into a fresh
/// `Fib`.
pub fn rebuild(rib: &RibTree, fib: &mut Fib) -> Result<(), FibError> {
    fib.family = Some(rib.family);
    fib.table_id = rib.table_id;

    let mut count = 0u64;
    rib.traverse(&mut |node| {
        fib.add(node.key(), node.keylen(), *node.route_idx())?;
        count += 1;
        Ok(())
    })?;
    debug!("rebuilt FIB from {count} RIB routes");
    Ok(())
}

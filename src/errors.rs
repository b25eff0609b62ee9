use std::fmt;

/// Errors produced by the nexthop table, the RIB and the FIB.
///
/// The source this crate is grounded on also has an "out of memory during
/// node allocation" kind; Rust's global allocator aborts the process on
/// allocation failure instead of returning an error, so node construction is
/// infallible here and that kind has no counterpart.
#[derive(Debug, PartialEq, Eq)]
pub enum FibError {
    /// A RIB node's ECMP slot array is already full.
    EcmpFull,
    /// A delete targeted a prefix that is not present in the RIB.
    NotFound,
    /// The nexthop hash table has been fully probed without a free or
    /// matching slot.
    TableFull,
    /// A route- or lookup-file line could not be parsed.
    ParseError(String),
    /// A file could not be opened or read.
    Io(String),
}

impl std::error::Error for FibError {}

impl fmt::Display for FibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FibError::EcmpFull => {
                write!(f, "Error: ECMP slot array is full.")
            }
            FibError::NotFound => {
                write!(f, "Error: prefix not found in the RIB.")
            }
            FibError::TableFull => {
                write!(f, "Error: nexthop table is full.")
            }
            FibError::ParseError(line) => {
                write!(f, "Error: could not parse line: {line:?}")
            }
            FibError::Io(msg) => {
                write!(f, "Error: I/O failure: {msg}")
            }
        }
    }
}

impl From<std::io::Error> for FibError {
    fn from(e: std::io::Error) -> Self {
        FibError::Io(e.to_string())
    }
}

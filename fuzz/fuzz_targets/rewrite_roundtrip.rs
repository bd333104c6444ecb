//! Row rewrite fuzzer.
//!
//! Builds an arbitrary typed table with a valid mapping, rewrites its dump,
//! and checks every row against the new column list.

use honggfuzz::fuzz;
use sqldump_fixup::testing::{FuzzTable, test_rewrite_roundtrip};

fn main() {
    loop {
        fuzz!(|table: FuzzTable| {
            test_rewrite_roundtrip(&table);
        });
    }
}

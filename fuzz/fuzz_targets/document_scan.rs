//! Statement locator fuzzer.
//!
//! Feeds arbitrary text to the locator and the rewriter; neither may panic.

use honggfuzz::fuzz;
use sqldump_fixup::testing::{FuzzTable, test_document_scan};

fn main() {
    loop {
        fuzz!(|input: (FuzzTable, String)| {
            let (table, document) = input;
            test_document_scan(&table, &document);
        });
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use munidx::query::{classify, QueryKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        match classify(s) {
            QueryKind::Partition(code) => assert_eq!(code.chars().count(), 2),
            QueryKind::Code(code) => assert!(code.bytes().all(|b| b.is_ascii_digit())),
            QueryKind::Name(_) => {}
        }
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or fail cleanly, never panic
    if let Ok((header, records)) = munidx::index::reader::decode(data) {
        assert_eq!(header.record_count as usize, records.len());
    }
});

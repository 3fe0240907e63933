#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = rectclip::arbitrary::arbtests::chain_ops(&mut Unstructured::new(data));
});

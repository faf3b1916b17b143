#![no_main]

use libfuzzer_sys::fuzz_target;
use thorchain_ingest::services::decoder::{parse_amount, parse_coins};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let _ = parse_amount(&input);
    let _ = parse_coins(&input);
});

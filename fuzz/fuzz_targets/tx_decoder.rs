#![no_main]

use libfuzzer_sys::fuzz_target;
use thorchain_ingest::{
    models::{AttributeEncoding, RawTx},
    services::decoder::BlockDecoder,
};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let tx = RawTx {
        hash: "FUZZ".to_string(),
        body,
        ..Default::default()
    };
    let _ = BlockDecoder::new("thor", AttributeEncoding::Auto).decode_tx(&tx);
});

#![no_main]

use keymirror_core::{Codec, JsonCodec, SentinelCodec};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    // Decoding must never panic, whatever the raw text looks like.
    let _: Result<Value, _> = JsonCodec.decode(raw);

    let codec = SentinelCodec::<JsonCodec>::default();
    if let Ok(decoded) = Codec::<Option<Value>>::decode(&codec, raw) {
        // Whatever decoded must re-encode cleanly.
        let _ = codec.encode(&decoded);
    }
});

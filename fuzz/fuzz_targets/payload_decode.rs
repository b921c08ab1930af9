#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lineage_core::Payload;

#[derive(Arbitrary, Debug)]
struct Input {
    kind: u8,
    contents: Vec<u8>,
}

fuzz_target!(|input: Input| {
    if let Ok(payload) = Payload::decode(input.kind, &input.contents) {
        // a decoded payload re-encodes and decodes to itself
        let blob = payload.encode().expect("decoded payload encodes");
        let again = Payload::decode(payload.payload_type().to_byte(), &blob)
            .expect("re-encoded payload decodes");
        assert_eq!(again, payload);
        let _ = payload.births();
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use lineage_core::Envelope;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes off the wire must never panic the decoder
    if let Ok(envelope) = Envelope::from_json(data) {
        let _ = envelope.id();
        let _ = envelope.signing_bytes();
        let _ = envelope.payload();
    }
});

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lineage_core::{Envelope, IdentityId, VertexId};
use lineage_crypto::{Ed25519Recovery, Identity};
use lineage_runtime::IngestionPipeline;

#[derive(Arbitrary, Debug)]
struct Input {
    author: [u8; 20],
    contents: Vec<u8>,
    nonce: u64,
    refs: Vec<Vec<u8>>,
    kind: u8,
    sig: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let root = Identity::from_bytes(&[7u8; 32]);
    let Ok(pipeline) = IngestionPipeline::new(
        lineage_runtime::BootstrapConfig::default().limits,
        &[root.id()],
        Ed25519Recovery,
    ) else {
        return;
    };

    let envelope = Envelope {
        contents: input.contents,
        nonce: input.nonce,
        refs: input.refs.into_iter().map(VertexId::from).collect(),
        kind: input.kind,
        sig: input.sig,
    };

    // Forged envelopes are rejected, never committed, never panic
    let result = pipeline.receive(IdentityId::new(input.author), &envelope);
    assert!(result.is_err());
    assert_eq!(pipeline.stats().accepted, 0);
});

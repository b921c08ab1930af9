//! End-to-end tests
//!
//! Bootstrap a population, then replay what it published into a fresh
//! node and exercise the rules a remote author runs into.

use lineage_core::{Envelope, IdentityId, LineageError, Payload, Profile, ReferenceFault, VertexId};
use lineage_crypto::{Ed25519Recovery, Identity, Signer};
use lineage_runtime::{
    Bootstrap, BootstrapConfig, BootstrapOutput, IngestError, IngestionPipeline, RuntimeConfig,
};

// ============================================================================
// HELPERS
// ============================================================================

fn bootstrap() -> BootstrapOutput {
    Bootstrap::new(BootstrapConfig::default())
        .unwrap()
        .run()
        .unwrap()
}

fn fresh_node(output: &BootstrapOutput) -> IngestionPipeline {
    IngestionPipeline::new(
        BootstrapConfig::default().limits,
        &output.generations[0],
        Ed25519Recovery,
    )
    .unwrap()
}

fn sign(
    key: &Identity,
    payload: &Payload,
    node: &IngestionPipeline,
    refs: Vec<VertexId>,
) -> Envelope {
    let nonce = node.expected_nonce(&refs).unwrap();
    let envelope = Envelope::new(payload, nonce, refs).unwrap();
    let sig = key.sign(&envelope.signing_bytes().unwrap()).unwrap();
    envelope.with_signature(sig)
}

fn publish(
    node: &IngestionPipeline,
    key: &Identity,
    payload: &Payload,
) -> Result<Envelope, IngestError> {
    let head = node.head(&key.id()).expect("author has a head");
    let envelope = sign(key, payload, node, vec![head]);
    node.receive(key.id(), &envelope)?;
    Ok(envelope)
}

fn newest_identity(output: &BootstrapOutput) -> IdentityId {
    *output.generations.last().unwrap().last().unwrap()
}

// ============================================================================
// REPLAY
// ============================================================================

#[test]
fn test_replay_into_fresh_node() {
    let output = bootstrap();
    let node = fresh_node(&output);

    for authored in &output.envelopes {
        // envelopes cross the wire as JSON
        let wire = authored.envelope.to_json().unwrap();
        let envelope = Envelope::from_json(&wire).unwrap();
        node.receive(authored.author, &envelope).unwrap();
    }

    assert_eq!(node.stats(), output.stats());
    for (g, ids) in output.generations.iter().enumerate() {
        for id in ids {
            assert_eq!(node.individual(id).unwrap().generation, g);
        }
    }
}

#[test]
fn test_replay_twice_conflicts() {
    let output = bootstrap();
    let node = fresh_node(&output);
    for authored in &output.envelopes {
        node.receive(authored.author, &authored.envelope).unwrap();
    }

    let genesis = &output.envelopes[0];
    let err = node.receive(genesis.author, &genesis.envelope).unwrap_err();
    assert!(err.error().is_conflict());
}

#[test]
fn test_out_of_order_envelope_rejected() {
    let output = bootstrap();
    let node = fresh_node(&output);

    let second = &output.envelopes[1];
    let err = node.receive(second.author, &second.envelope).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Rejected(LineageError::Reference(ReferenceFault::MissingParent(_)))
    ));
    assert_eq!(node.stats().rejected, 1);
    assert_eq!(node.stats().accepted, 0);
}

// ============================================================================
// AUTHOR RULES
// ============================================================================

#[test]
fn test_equivocation_rejected() {
    let output = bootstrap();
    let id = newest_identity(&output);
    let key = &output.keys[&id];
    let node = &output.pipeline;

    let head = node.head(&id).unwrap();
    let first = sign(key, &Payload::info("one"), node, vec![head.clone()]);
    let fork = sign(key, &Payload::info("two"), node, vec![head]);

    node.receive(id, &first).unwrap();
    let err = node.receive(id, &fork).unwrap_err();
    assert!(matches!(
        err.error(),
        LineageError::Reference(ReferenceFault::Equivocation { .. })
    ));
}

#[test]
fn test_profile_then_end() {
    let output = bootstrap();
    let id = newest_identity(&output);
    let key = &output.keys[&id];
    let node = &output.pipeline;

    let profile = Profile {
        name: "newest".into(),
        bio: "last of the bootstrap".into(),
        ..Profile::default()
    };
    publish(node, key, &Payload::Profile(profile.clone())).unwrap();
    assert_eq!(node.profile(&id), Some(profile));

    publish(node, key, &Payload::End).unwrap();
    let err = publish(node, key, &Payload::info("after the end")).unwrap_err();
    assert!(matches!(
        err.error(),
        LineageError::Reference(ReferenceFault::AuthorEnded(_))
    ));
    assert_eq!(node.stats().ended, 1);
}

#[test]
fn test_self_chain_projection() {
    let output = bootstrap();
    let root = output.generations[0][0];
    let chain = output.pipeline.with_chain(|chain| chain.self_chain(&root).unwrap());

    // the root authored genesis and every generation-1 birth
    assert_eq!(chain.len(), 1 + output.generations[1].len());
    for pair in chain.windows(2) {
        assert_eq!(pair[1].refs[0], pair[0].id);
        assert!(pair[1].nonce > pair[0].nonce);
    }
}

#[test]
fn test_config_drives_bootstrap() {
    let config = RuntimeConfig::from_json(
        r#"{
            "bootstrap": {
                "limits": [
                    {"min_cosigners": 0, "max_children_per_cosigner": 3},
                    {"min_cosigners": 2, "max_children_per_cosigner": 2}
                ],
                "population": [10],
                "seed": 7
            }
        }"#,
    )
    .unwrap();

    let output = Bootstrap::new(config.bootstrap).unwrap().run().unwrap();
    assert_eq!(output.generations[0].len(), 10);
    assert_eq!(output.generations[1].len(), 15);
    output.pipeline.with_society(|society| {
        assert_eq!(society.max_generation(), 1);
        for id in &output.generations[0] {
            assert_eq!(society.children_of(id).len(), 3);
        }
    });
}

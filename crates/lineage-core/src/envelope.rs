//! Wire envelope
//!
//! The boundary artifact exchanged between nodes. Serialized as JSON with
//! keys `contents`, `nonce`, `refs`, `type` and `sig`; key order is not
//! significant on input. The signature covers the JSON encoding of the
//! first four fields in that order.

use serde::{Deserialize, Serialize};

use crate::{LineageError, LineageResult, Payload, VertexId};

/// Signed event as it travels between nodes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Payload content blob
    pub contents: Vec<u8>,
    /// Causal nonce claimed by the author
    pub nonce: u64,
    /// References; `refs[0]` is the primary (self-chain) reference
    pub refs: Vec<VertexId>,
    /// Payload discriminant
    #[serde(rename = "type")]
    pub kind: u8,
    /// Author signature over [`Envelope::signing_bytes`]
    #[serde(default)]
    pub sig: Vec<u8>,
}

#[derive(Serialize)]
struct UnsignedEnvelope<'a> {
    contents: &'a [u8],
    nonce: u64,
    refs: &'a [VertexId],
    #[serde(rename = "type")]
    kind: u8,
}

impl Envelope {
    /// Build an unsigned envelope around a payload
    pub fn new(payload: &Payload, nonce: u64, refs: Vec<VertexId>) -> LineageResult<Self> {
        Ok(Envelope {
            contents: payload.encode()?,
            nonce,
            refs,
            kind: payload.payload_type().to_byte(),
            sig: Vec::new(),
        })
    }

    /// Canonical bytes covered by the author signature
    pub fn signing_bytes(&self) -> LineageResult<Vec<u8>> {
        let unsigned = UnsignedEnvelope {
            contents: &self.contents,
            nonce: self.nonce,
            refs: &self.refs,
            kind: self.kind,
        };
        Ok(serde_json::to_vec(&unsigned)?)
    }

    /// Attach the author signature
    pub fn with_signature(mut self, sig: Vec<u8>) -> Self {
        self.sig = sig;
        self
    }

    pub fn is_signed(&self) -> bool {
        !self.sig.is_empty()
    }

    /// Event id: the signature bytes
    pub fn id(&self) -> LineageResult<VertexId> {
        if self.sig.is_empty() {
            return Err(LineageError::Signature("envelope is not signed".into()));
        }
        Ok(VertexId::from(self.sig.as_slice()))
    }

    /// Decode the payload once
    pub fn payload(&self) -> LineageResult<Payload> {
        Payload::decode(self.kind, &self.contents)
    }

    pub fn to_json(&self) -> LineageResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> LineageResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

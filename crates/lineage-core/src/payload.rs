//! Payload definitions
//!
//! Every event carries exactly one payload. The payload kind travels on
//! the wire as a one-byte discriminant next to a JSON content blob, and is
//! decoded once at ingestion into the [`Payload`] sum type.

use serde::{Deserialize, Serialize};

use crate::{IdentityId, LineageError, LineageResult, VertexId};

/// Domain tag prepended to the bytes cosigners sign for a birth
const BIRTH_DOMAIN: &[u8] = b"lineage.birth.v1";

/// Payload type classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    /// Plain information: posts, replies, chat
    Info = 0,
    /// Creation of a new identity, cosigned by its parents
    Birth = 1,
    /// Update of the author's public profile
    Profile = 2,
    /// Termination of the author's chain
    End = 3,
    /// Root event establishing every generation-0 identity
    Genesis = 4,
}

impl PayloadType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(PayloadType::Info),
            1 => Some(PayloadType::Birth),
            2 => Some(PayloadType::Profile),
            3 => Some(PayloadType::End),
            4 => Some(PayloadType::Genesis),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Does this payload create identities?
    pub fn is_structural(self) -> bool {
        matches!(self, PayloadType::Birth | PayloadType::Genesis)
    }
}

/// Birth of a new identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Birth {
    /// Identity being created
    pub identity: IdentityId,
    /// One signature per cosigning parent over [`Birth::signing_bytes`]
    #[serde(default)]
    pub signatures: Vec<Vec<u8>>,
}

impl Birth {
    pub fn new(identity: IdentityId) -> Self {
        Birth {
            identity,
            signatures: Vec::new(),
        }
    }

    /// Bytes each cosigner signs to endorse `identity`
    pub fn signing_bytes(identity: &IdentityId) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BIRTH_DOMAIN.len() + identity.as_bytes().len());
        buf.extend_from_slice(BIRTH_DOMAIN);
        buf.extend_from_slice(identity.as_bytes());
        buf
    }

    pub fn add_signature(&mut self, signature: Vec<u8>) {
        self.signatures.push(signature);
    }
}

/// Public profile of an identity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub bio: String,
    pub url: String,
    pub location: String,
    pub extra: String,
}

#[derive(Serialize, Deserialize)]
struct InfoContent {
    text: String,
    #[serde(default)]
    quote: Option<VertexId>,
}

#[derive(Serialize, Deserialize)]
struct GenesisContent {
    roots: Vec<IdentityId>,
}

/// Decoded event payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Info {
        text: String,
        quote: Option<VertexId>,
    },
    Birth(Birth),
    Profile(Profile),
    End,
    Genesis {
        roots: Vec<IdentityId>,
    },
}

impl Payload {
    pub fn info(text: impl Into<String>) -> Self {
        Payload::Info {
            text: text.into(),
            quote: None,
        }
    }

    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Info { .. } => PayloadType::Info,
            Payload::Birth(_) => PayloadType::Birth,
            Payload::Profile(_) => PayloadType::Profile,
            Payload::End => PayloadType::End,
            Payload::Genesis { .. } => PayloadType::Genesis,
        }
    }

    /// Identities this payload brings into existence
    pub fn births(&self) -> &[IdentityId] {
        match self {
            Payload::Birth(birth) => std::slice::from_ref(&birth.identity),
            Payload::Genesis { roots } => roots,
            _ => &[],
        }
    }

    /// Encode the content blob for the wire
    pub fn encode(&self) -> LineageResult<Vec<u8>> {
        let bytes = match self {
            Payload::Info { text, quote } => serde_json::to_vec(&InfoContent {
                text: text.clone(),
                quote: quote.clone(),
            })?,
            Payload::Birth(birth) => serde_json::to_vec(birth)?,
            Payload::Profile(profile) => serde_json::to_vec(profile)?,
            Payload::End => Vec::new(),
            Payload::Genesis { roots } => serde_json::to_vec(&GenesisContent {
                roots: roots.clone(),
            })?,
        };
        Ok(bytes)
    }

    /// Decode a content blob given its wire discriminant
    pub fn decode(kind: u8, contents: &[u8]) -> LineageResult<Self> {
        let kind = PayloadType::from_byte(kind)
            .ok_or_else(|| LineageError::Malformed(format!("unknown payload type {}", kind)))?;

        let payload = match kind {
            PayloadType::Info => {
                let c: InfoContent = serde_json::from_slice(contents)?;
                Payload::Info {
                    text: c.text,
                    quote: c.quote,
                }
            }
            PayloadType::Birth => Payload::Birth(serde_json::from_slice(contents)?),
            PayloadType::Profile => Payload::Profile(serde_json::from_slice(contents)?),
            PayloadType::End => Payload::End,
            PayloadType::Genesis => {
                let c: GenesisContent = serde_json::from_slice(contents)?;
                if c.roots.is_empty() {
                    return Err(LineageError::Malformed("genesis without roots".into()));
                }
                Payload::Genesis { roots: c.roots }
            }
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_type_roundtrip() {
        for kind in [
            PayloadType::Info,
            PayloadType::Birth,
            PayloadType::Profile,
            PayloadType::End,
            PayloadType::Genesis,
        ] {
            assert_eq!(PayloadType::from_byte(kind.to_byte()), Some(kind));
        }
        assert_eq!(PayloadType::from_byte(9), None);
    }

    #[test]
    fn test_birth_payload_decodes() {
        let mut birth = Birth::new(IdentityId::new([3u8; 20]));
        birth.add_signature(vec![1, 2, 3]);
        let payload = Payload::Birth(birth);

        let blob = payload.encode().unwrap();
        let decoded = Payload::decode(PayloadType::Birth.to_byte(), &blob).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.births(), &[IdentityId::new([3u8; 20])]);
    }

    #[test]
    fn test_end_ignores_contents() {
        let decoded = Payload::decode(PayloadType::End.to_byte(), b"anything").unwrap();
        assert_eq!(decoded, Payload::End);
        assert!(decoded.births().is_empty());
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = Payload::decode(42, b"{}").unwrap_err();
        assert!(matches!(err, LineageError::Malformed(_)));
    }

    #[test]
    fn test_empty_genesis_rejected() {
        let err = Payload::decode(PayloadType::Genesis.to_byte(), br#"{"roots":[]}"#).unwrap_err();
        assert!(matches!(err, LineageError::Malformed(_)));
    }

    #[test]
    fn test_profile_fields_default() {
        let decoded =
            Payload::decode(PayloadType::Profile.to_byte(), br#"{"name":"ada"}"#).unwrap();
        match decoded {
            Payload::Profile(p) => {
                assert_eq!(p.name, "ada");
                assert!(p.bio.is_empty());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}

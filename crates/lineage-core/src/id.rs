//! Identity types for the lineage graphs
//!
//! Vertex identifiers are opaque byte strings (in practice a signature),
//! identity identifiers are fixed 20-byte addresses.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Event vertex identity - opaque, globally unique bytes
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(Bytes);

impl VertexId {
    #[inline]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        VertexId(bytes.into())
    }

    #[inline]
    pub fn from_static(bytes: &'static [u8]) -> Self {
        VertexId(Bytes::from_static(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short form used in log lines: first and last two bytes
    pub fn short(&self) -> String {
        let b = self.as_bytes();
        if b.len() <= 4 {
            return self.to_string();
        }
        format!(
            "{:02x}{:02x}..{:02x}{:02x}",
            b[0],
            b[1],
            b[b.len() - 2],
            b[b.len() - 1]
        )
    }
}

impl From<Vec<u8>> for VertexId {
    fn from(bytes: Vec<u8>) -> Self {
        VertexId(Bytes::from(bytes))
    }
}

impl From<&[u8]> for VertexId {
    fn from(bytes: &[u8]) -> Self {
        VertexId(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vertex({})", self.short())
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.as_bytes() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Length of an identity address in bytes
pub const IDENTITY_LEN: usize = 20;

/// Participant identity - address derived from a public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub [u8; IDENTITY_LEN]);

impl IdentityId {
    pub const ZERO: IdentityId = IdentityId([0u8; IDENTITY_LEN]);

    #[inline]
    pub fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        IdentityId(bytes)
    }

    /// Build from a slice, `None` unless it is exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; IDENTITY_LEN] = bytes.try_into().ok()?;
        Some(IdentityId(arr))
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; IDENTITY_LEN] {
        self.0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short form used in log lines and dumps
    pub fn short(&self) -> String {
        format!(
            "0x{:02x}{:02x}..{:02x}{:02x}",
            self.0[0],
            self.0[1],
            self.0[IDENTITY_LEN - 2],
            self.0[IDENTITY_LEN - 1]
        )
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.short())
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vertex_id_display_is_hex() {
        let id = VertexId::from(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(id.to_string(), "deadbeef");
        assert_eq!(id.len(), 4);
    }

    #[test]
    fn test_vertex_id_short_form() {
        let id = VertexId::from(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(id.short(), "0102..0506");
    }

    #[test]
    fn test_identity_from_slice() {
        let bytes = [7u8; IDENTITY_LEN];
        let id = IdentityId::from_slice(&bytes).unwrap();
        assert_eq!(id.to_bytes(), bytes);

        assert!(IdentityId::from_slice(&bytes[..19]).is_none());
    }

    #[test]
    fn test_identity_display() {
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes[0] = 0xaf;
        bytes[19] = 0x0a;
        let shown = IdentityId::new(bytes).to_string();
        assert!(shown.starts_with("0xaf"));
        assert!(shown.ends_with("0a"));
        assert_eq!(shown.len(), 2 + IDENTITY_LEN * 2);
    }

    proptest! {
        #[test]
        fn prop_vertex_id_serde_transparent(
            bytes in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let id = VertexId::from(bytes.clone());
            let json = serde_json::to_string(&id).unwrap();
            prop_assert_eq!(&json, &serde_json::to_string(&bytes).unwrap());
            let back: VertexId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, id);
        }
    }
}

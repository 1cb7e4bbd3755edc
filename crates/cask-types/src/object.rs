use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for a piece of stored content.
///
/// An `ObjectId` is the BLAKE3 hash of the content it names. It is the
/// canonical name of the bytes themselves, independent of any logical name
/// (URL) an index maps to it. Equality and hashing are byte-exact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Compute an `ObjectId` by hashing raw content.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed 32-byte hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The null identifier (all zeros). Represents "no content".
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if this is the null identifier.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex form (first 8 characters), for log lines and diagnostics.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; 32] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hashing_is_deterministic() {
        let data = b"packed container bytes";
        assert_eq!(ObjectId::from_bytes(data), ObjectId::from_bytes(data));
    }

    #[test]
    fn different_content_different_ids() {
        assert_ne!(ObjectId::from_bytes(b"a"), ObjectId::from_bytes(b"b"));
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
        assert!(!ObjectId::from_bytes(b"x").is_null());
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_bytes(b"roundtrip");
        assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert!(matches!(
            ObjectId::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn display_is_full_hex() {
        let id = ObjectId::from_bytes(b"display");
        let shown = format!("{id}");
        assert_eq!(shown.len(), 64);
        assert_eq!(shown, id.to_hex());
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(ObjectId::from_bytes(b"short").short_hex().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::from_bytes(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_follows_bytes() {
        assert!(ObjectId::from_hash([0; 32]) < ObjectId::from_hash([1; 32]));
    }

    proptest! {
        #[test]
        fn hex_roundtrip_any_hash(hash in prop::array::uniform32(any::<u8>())) {
            let id = ObjectId::from_hash(hash);
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        }

        #[test]
        fn equal_ids_hash_equal(data in prop::collection::vec(any::<u8>(), 0..256)) {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};
            let a = ObjectId::from_bytes(&data);
            let b = ObjectId::from_bytes(&data);
            let mut ha = DefaultHasher::new();
            let mut hb = DefaultHasher::new();
            a.hash(&mut ha);
            b.hash(&mut hb);
            prop_assert_eq!(ha.finish(), hb.finish());
        }
    }
}

//! Deterministic SHA-256 fingerprints for motifs and catalogs.
//!
//! Composite motifs are interned by the fingerprint of their axis and ordered
//! component identities, so two derivations of the same arrangement resolve to
//! one identity regardless of discovery order. Catalog digests let callers
//! compare two analyses of the same document cheaply.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::Catalog;
use crate::numeric::Axis;
use crate::registry::Registry;
use crate::tree::GroupId;

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Creates a zero hash (all zeros).
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA-256 of the given data with domain separation.
    ///
    /// Hashes `b"IFL:<domain>:v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"IFL:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 4 bytes are enough to tell digests apart in logs.
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Fingerprint of a leaf motif, keyed by its label.
pub fn leaf_fingerprint(name: &str) -> HashValue {
    HashValue::hash_with_domain(b"LEAF_MOTIF", name.as_bytes())
}

/// Fingerprint of a composite: axis tag, component count, component identities.
pub fn pattern_fingerprint(axis: Axis, children: &[GroupId]) -> HashValue {
    let mut data = Vec::with_capacity(9 + 4 * children.len());
    data.push(axis.tag());
    data.extend_from_slice(&(children.len() as u64).to_le_bytes());
    for id in children {
        data.extend_from_slice(&id.as_u32().to_le_bytes());
    }
    HashValue::hash_with_domain(b"COMPOSITE_MOTIF", &data)
}

/// Digest of a catalog's contents.
///
/// Motifs are keyed by name rather than identity number, and placements are
/// hashed in sorted coordinate order, so the digest only depends on what was
/// found.
pub fn catalog_digest(catalog: &Catalog, registry: &Registry) -> HashValue {
    let mut motifs: Vec<(String, u32, Vec<[u32; 2]>)> = catalog
        .iter()
        .map(|(id, pairs)| {
            let (name, terminals) = registry
                .value(id)
                .map(|v| (v.name.clone(), v.terminals))
                .unwrap_or_else(|| (format!("?{id}"), 0));
            let mut at: Vec<[u32; 2]> = pairs
                .iter()
                .map(|p| [p.location.x.value().to_bits(), p.location.y.value().to_bits()])
                .collect();
            at.sort_unstable();
            (name, terminals, at)
        })
        .collect();
    motifs.sort();

    let mut data = Vec::new();
    data.extend_from_slice(&(motifs.len() as u64).to_le_bytes());
    for (name, terminals, at) in &motifs {
        data.extend_from_slice(&(name.len() as u64).to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&terminals.to_le_bytes());
        data.extend_from_slice(&(at.len() as u64).to_le_bytes());
        for [x, y] in at {
            data.extend_from_slice(&x.to_le_bytes());
            data.extend_from_slice(&y.to_le_bytes());
        }
    }
    HashValue::hash_with_domain(b"CATALOG_DIGEST", &data)
}

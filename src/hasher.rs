//! Canonical content fingerprints for declared entities.
//!
//! Every entity exposes a kind tag and an ordered list of named fields through
//! [`Fingerprint`].  [`digest`] serializes that list into an unambiguous,
//! length-prefixed byte stream and hashes it with SHA-256, so identical
//! declared content always yields the same digest no matter how it was loaded.
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest as _, Sha256};

/// A single declared value participating in a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<'a> {
    /// A string value.
    Str(&'a str),
    /// A boolean flag.
    Bool(bool),
    /// An ordered list of values.  Order is significant.
    List(Vec<Field<'a>>),
}

impl Field<'_> {
    const fn tag(&self) -> u8 {
        match self {
            Self::Str(_) => b's',
            Self::Bool(_) => b'b',
            Self::List(_) => b'l',
        }
    }
}

/// An entity that can be fingerprinted from its declared fields.
///
/// Implementations must only return declared content; derived per-run state
/// (such as the `queued` flag) must never appear in [`fields`](Self::fields).
pub trait Fingerprint {
    /// Tag distinguishing entity kinds whose fields could otherwise collide.
    const KIND: &'static str;

    /// Declared fields in a fixed order.
    fn fields(&self) -> Vec<(&'static str, Field<'_>)>;
}

/// Compute the canonical digest of `entity`.
///
/// The result is 43 characters of unpadded URL-safe base64.
#[must_use]
pub fn digest<T: Fingerprint + ?Sized>(entity: &T) -> String {
    let mut hasher = Sha256::new();
    write_bytes(&mut hasher, T::KIND.as_bytes());
    for (name, value) in entity.fields() {
        write_bytes(&mut hasher, name.as_bytes());
        write_field(&mut hasher, &value);
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn write_field(hasher: &mut Sha256, field: &Field<'_>) {
    hasher.update([field.tag()]);
    match field {
        Field::Str(s) => write_bytes(hasher, s.as_bytes()),
        Field::Bool(b) => hasher.update([u8::from(*b)]),
        Field::List(items) => {
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                write_field(hasher, item);
            }
        }
    }
}

/// Fingerprint of a whole machine: its `(task name, task hash)` pairs.
///
/// Pairs are sorted by name before hashing, so the aggregate of a declaration
/// and of a snapshot built from it are equal regardless of iteration order.
#[derive(Debug)]
pub struct MachineDigest<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> MachineDigest<'a> {
    /// Collect `(name, hash)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_unstable();
        Self { entries }
    }
}

impl Fingerprint for MachineDigest<'_> {
    const KIND: &'static str = "machine";

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        let tasks = self
            .entries
            .iter()
            .map(|(name, hash)| Field::List(vec![Field::Str(name), Field::Str(hash)]))
            .collect();
        vec![("tasks", Field::List(tasks))]
    }
}

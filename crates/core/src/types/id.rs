//! Identifier newtypes.
//!
//! - [`ProductId`] is the stable catalog key (`nuts-6oz`), shared by the
//!   catalog, cart items and order lines.
//! - [`OrderRef`] is the short reference quoted back to a customer after
//!   they place an order (`NB-7KQ2XM`).

use core::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// A catalog product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProductId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// A human-shareable order reference.
///
/// Format: `NB-` followed by six characters from an alphabet without the
/// look-alikes `0`/`O` and `1`/`I`, so it survives being read over the phone.
/// References are not checked for collisions and are not a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRef(String);

impl OrderRef {
    /// Prefix on every reference.
    pub const PREFIX: &'static str = "NB-";

    /// Number of random characters after the prefix.
    pub const RANDOM_LEN: usize = 6;

    /// Characters a reference is drawn from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Generate a reference using the thread-local RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a reference from the given RNG.
    ///
    /// Each character is drawn uniformly from [`Self::ALPHABET`].
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut reference = String::with_capacity(Self::PREFIX.len() + Self::RANDOM_LEN);
        reference.push_str(Self::PREFIX);
        for _ in 0..Self::RANDOM_LEN {
            if let Some(&byte) = Self::ALPHABET.choose(rng) {
                reference.push(char::from(byte));
            }
        }
        Self(reference)
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! # Biometric Reference Set
//!
//! The simulated biometric check is a membership test: a submitted sample
//! token is accepted when it appears in a fixed set of known-good samples.
//! The set is loaded once at process start and injected into the
//! verification service; it is never mutated afterwards.

use std::collections::HashSet;

use thiserror::Error;

/// Errors constructing a reference set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSetError {
    /// No samples were provided.
    #[error("biometric reference set must contain at least one sample")]
    Empty,

    /// A sample entry was blank.
    #[error("biometric reference sample at index {0} is blank")]
    BlankSample(usize),
}

/// Immutable set of accepted biometric sample tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricReferenceSet {
    samples: HashSet<String>,
}

impl BiometricReferenceSet {
    /// Build a set from sample tokens. Entries are trimmed; duplicates
    /// collapse.
    ///
    /// # Errors
    ///
    /// [`ReferenceSetError::Empty`] for an empty input,
    /// [`ReferenceSetError::BlankSample`] for a whitespace-only entry.
    pub fn from_samples<I, S>(samples: I) -> Result<Self, ReferenceSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for (index, sample) in samples.into_iter().enumerate() {
            let trimmed = sample.as_ref().trim();
            if trimmed.is_empty() {
                return Err(ReferenceSetError::BlankSample(index));
            }
            set.insert(trimmed.to_string());
        }
        if set.is_empty() {
            return Err(ReferenceSetError::Empty);
        }
        Ok(Self { samples: set })
    }

    /// The demonstration dataset: `iris_sample_01` through `iris_sample_10`.
    pub fn builtin() -> Self {
        Self {
            samples: (1..=10).map(|n| format!("iris_sample_{n:02}")).collect(),
        }
    }

    /// Whether `token` is a known-good sample.
    pub fn contains(&self, token: &str) -> bool {
        self.samples.contains(token)
    }

    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

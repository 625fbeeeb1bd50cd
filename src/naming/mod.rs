//! Person names and the mailbox candidates derived from them.

pub mod candidate;
pub mod normalize;

use serde::{Deserialize, Serialize};

pub use candidate::{Candidate, CandidatePlan, Variant, MAX_SUFFIX, MIN_SUFFIX};
pub use normalize::{
    fold_accents, is_particle, normalize_given_name, normalize_surname, SURNAME_PARTICLES,
};

/// A person's name as typed by staff. Both halves may be multi-word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonName {
    pub given_name: String,
    pub surname: String,
}

impl PersonName {
    pub fn new(given_name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            surname: surname.into(),
        }
    }

    pub fn normalize(&self) -> NormalizedName {
        NormalizedName {
            given: normalize_given_name(&self.given_name),
            surname: normalize_surname(&self.surname),
        }
    }

    /// Returns the normalized name, or an error message if nothing usable
    /// survives normalization.
    pub fn validate(&self) -> Result<NormalizedName, String> {
        let normalized = self.normalize();
        if normalized.is_empty() {
            return Err(format!(
                "name '{} {}' has no usable characters",
                self.given_name.trim(),
                self.surname.trim()
            ));
        }
        Ok(normalized)
    }
}

/// Normalized words of a [`PersonName`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedName {
    pub given: Vec<String>,
    pub surname: Vec<String>,
}

impl NormalizedName {
    pub fn is_empty(&self) -> bool {
        self.given.is_empty() && self.surname.is_empty()
    }
}

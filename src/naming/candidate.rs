use std::fmt;

use serde::Serialize;

use crate::naming::NormalizedName;

/// Smallest numeric suffix appended to the two-initial candidate.
pub const MIN_SUFFIX: u32 = 2;
/// Largest numeric suffix appended to the two-initial candidate.
pub const MAX_SUFFIX: u32 = 99;

/// Which rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Variant {
    /// First `k` letters of the given name plus the surname.
    Initials(usize),
    /// Two-initial candidate followed by a decimal suffix.
    Suffixed(u32),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Initials(k) => write!(f, "initials-{}", k),
            Variant::Suffixed(n) => write!(f, "suffix-{}", n),
        }
    }
}

/// A derived local-part and the variant it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub variant: Variant,
    pub local_part: String,
}

impl Candidate {
    /// Full address for this candidate.
    pub fn address(&self, domain: &str) -> String {
        format!("{}@{}", self.local_part, domain)
    }
}

impl NormalizedName {
    /// Local-part built from the first `initials` letters of the first given
    /// name word followed by every surname word. Empty if nothing survives.
    pub fn local_part(&self, initials: usize) -> String {
        let prefix: String = self
            .given
            .first()
            .map(|word| word.chars().take(initials).collect())
            .unwrap_or_default();
        let mut local = prefix;
        for word in &self.surname {
            local.push_str(word);
        }
        local
    }
}

/// Ordered candidates for one name.
///
/// The order is the escalation order: one initial, two initials, then the
/// two-initial form with suffixes `MIN_SUFFIX..=MAX_SUFFIX`. A two-initial
/// candidate identical to the one-initial candidate is not repeated.
#[derive(Debug, Clone)]
pub struct CandidatePlan {
    first: String,
    second: String,
}

impl CandidatePlan {
    pub fn new(name: &NormalizedName) -> Self {
        Self {
            first: name.local_part(1),
            second: name.local_part(2),
        }
    }

    /// The one-initial local-part (may be empty).
    pub fn first(&self) -> &str {
        &self.first
    }

    /// The two-initial local-part (may be empty).
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Returns true if no candidate at all can be built.
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }

    /// Returns true if the two-initial candidate adds nothing new.
    pub fn second_repeats_first(&self) -> bool {
        self.second == self.first
    }

    /// Two-initial candidate with a numeric suffix.
    pub fn suffixed(&self, suffix: u32) -> String {
        format!("{}{}", self.second, suffix)
    }

    /// Every candidate that would be checked, in order.
    pub fn iter(&self) -> impl Iterator<Item = Candidate> + '_ {
        let first = (!self.first.is_empty()).then(|| Candidate {
            variant: Variant::Initials(1),
            local_part: self.first.clone(),
        });
        let has_second = !self.second.is_empty();
        let second = (has_second && !self.second_repeats_first()).then(|| Candidate {
            variant: Variant::Initials(2),
            local_part: self.second.clone(),
        });
        let suffixes = (MIN_SUFFIX..=MAX_SUFFIX)
            .filter(move |_| has_second)
            .map(move |n| Candidate {
                variant: Variant::Suffixed(n),
                local_part: self.suffixed(n),
            });

        first.into_iter().chain(second).chain(suffixes)
    }
}

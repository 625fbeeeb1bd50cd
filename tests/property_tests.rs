use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Mutex;

use proptest::prelude::*;
use staffmail::contracts::{ExistenceOracle, GenerationError};
use staffmail::naming::{normalize_given_name, normalize_surname, CandidatePlan, SURNAME_PARTICLES};
use staffmail::{generate_unique_local_part, PersonName};

// Oracle harness: a fixed set of taken addresses plus a call log.

struct RecordingOracle {
    taken: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingOracle {
    fn new(taken: HashSet<String>) -> Self {
        Self {
            taken,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExistenceOracle for RecordingOracle {
    type Error = Infallible;

    async fn exists(&self, address: &str) -> Result<bool, Infallible> {
        self.calls.lock().unwrap().push(address.to_string());
        Ok(self.taken.contains(address))
    }
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

// =============================================================================
// Properties
// =============================================================================

/// Property: the same name against the same oracle state gives the same result
/// through the same sequence of checks.
pub fn prop_generation_is_deterministic(name: &PersonName, taken: &HashSet<String>) {
    let first = RecordingOracle::new(taken.clone());
    let second = RecordingOracle::new(taken.clone());

    let a = run(generate_unique_local_part(name, "example.org", &first));
    let b = run(generate_unique_local_part(name, "example.org", &second));

    match (a, b) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(GenerationError::Exhausted { .. }), Err(GenerationError::Exhausted { .. })) => {}
        (Err(GenerationError::InvalidInput(_)), Err(GenerationError::InvalidInput(_))) => {}
        (a, b) => panic!("runs diverged: {:?} vs {:?}", a, b),
    }
    assert_eq!(first.calls(), second.calls());
}

/// Property: the accepted address was checked last, tested free, and every
/// earlier check hit a taken address in plan order.
pub fn prop_accepts_first_free_candidate(name: &PersonName, taken: &HashSet<String>) {
    let oracle = RecordingOracle::new(taken.clone());
    let Ok(result) = run(generate_unique_local_part(name, "example.org", &oracle)) else {
        return;
    };

    let calls = oracle.calls();
    assert_eq!(calls.len(), result.checks);
    assert_eq!(calls.last(), Some(&result.address()));
    assert!(!taken.contains(&result.address()));
    for earlier in &calls[..calls.len() - 1] {
        assert!(taken.contains(earlier), "{} was free but skipped", earlier);
    }

    let plan = CandidatePlan::new(&name.normalize());
    let planned: Vec<String> = plan
        .iter()
        .take(calls.len())
        .map(|c| c.address("example.org"))
        .collect();
    assert_eq!(calls, planned);
}

/// Property: every candidate is lowercase ASCII alphanumeric.
pub fn prop_candidates_are_ascii_alphanumeric(name: &PersonName) {
    let plan = CandidatePlan::new(&name.normalize());
    for candidate in plan.iter() {
        assert!(!candidate.local_part.is_empty());
        assert!(
            candidate
                .local_part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
            "bad candidate {:?}",
            candidate.local_part
        );
    }
}

// =============================================================================
// Proptest strategies
// =============================================================================

prop_compose! {
    fn arb_word()(word in "[A-Za-zÁÉÍÓÚáéíóúÑñÜü'\\-]{1,12}") -> String {
        word
    }
}

fn arb_particle() -> impl Strategy<Value = String> {
    prop::sample::select(SURNAME_PARTICLES.to_vec()).prop_map(String::from)
}

prop_compose! {
    fn arb_name()(
        given in prop::collection::vec(arb_word(), 0..3),
        surname in prop::collection::vec(prop_oneof![arb_word(), arb_particle()], 0..4),
    ) -> PersonName {
        PersonName::new(given.join(" "), surname.join(" "))
    }
}

prop_compose! {
    fn normalized_word()(word in "[a-z0-9]{1,10}") -> String {
        word
    }
}

fn arb_taken(name: PersonName) -> impl Strategy<Value = (PersonName, HashSet<String>)> {
    let plan: Vec<String> = CandidatePlan::new(&name.normalize())
        .iter()
        .map(|c| c.address("example.org"))
        .collect();
    let len = plan.len();
    (0..=len).prop_map(move |n| (name.clone(), plan.iter().take(n).cloned().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_generation_is_deterministic((name, taken) in arb_name().prop_flat_map(arb_taken)) {
            prop_generation_is_deterministic(&name, &taken);
        }

        #[test]
        fn test_accepts_first_free_candidate((name, taken) in arb_name().prop_flat_map(arb_taken)) {
            prop_accepts_first_free_candidate(&name, &taken);
        }

        #[test]
        fn test_candidates_are_ascii_alphanumeric(name in arb_name()) {
            prop_candidates_are_ascii_alphanumeric(&name);
        }

        #[test]
        fn test_normalization_is_idempotent(
            words in prop::collection::vec(normalized_word(), 1..4)
        ) {
            let words: Vec<String> = words
                .into_iter()
                .filter(|w| !SURNAME_PARTICLES.contains(&w.as_str()))
                .collect();
            let input = words.join(" ");
            prop_assert_eq!(normalize_surname(&input), words.clone());
            prop_assert_eq!(normalize_given_name(&input), words);
        }
    }

    #[test]
    fn particle_stripping() {
        assert_eq!(normalize_surname("de la Torre"), vec!["torre"]);
    }

    #[test]
    fn accent_folding_initial() {
        let name = PersonName::new("José", "").normalize();
        assert_eq!(name.local_part(1), "j");
    }
}

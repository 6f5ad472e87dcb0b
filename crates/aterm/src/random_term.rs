#![forbid(unsafe_code)]

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::ATerm;
use crate::storage::TermStore;

/// Create a random term consisting of the given symbols and constants.
/// Performs `iterations` number of constructions bottom up, where every
/// construction picks its arguments among the previously constructed terms,
/// so the result typically contains many shared subterms.
///
/// Next to applications, the constructions include integers and lists of
/// previously constructed terms.
pub fn random_term<'s>(
    store: &'s TermStore,
    rng: &mut impl Rng,
    symbols: &[(String, usize)],
    constants: &[String],
    iterations: usize,
) -> ATerm<'s> {
    assert!(!constants.is_empty(), "We need constants to be able to create a term");

    let mut subterms: Vec<ATerm<'s>> = constants
        .iter()
        .map(|name| store.make_constant(&store.symbol(name, 0, false)))
        .collect();

    for _ in 0..iterations {
        let term = match rng.random_range(0..10) {
            0 => store.make_int(rng.random_range(-1000..1000)),
            1 => {
                let length = rng.random_range(0..4);
                let elements: Vec<&ATerm<'s>> = (0..length).filter_map(|_| subterms.choose(rng)).collect();
                store.make_list(elements)
            }
            _ => match symbols.choose(rng) {
                Some((name, arity)) => {
                    let arguments: Vec<&ATerm<'s>> = (0..*arity).filter_map(|_| subterms.choose(rng)).collect();
                    store.make_application(&store.symbol(name, *arity, false), &arguments)
                }
                None => continue,
            },
        };

        // Make this term available as another subterm that can be used.
        subterms.push(term);
    }

    subterms.pop().expect("At least one constant was given")
}

#[cfg(test)]
mod tests {
    use sharc_utilities::random_test;

    use crate::Term;

    use super::*;

    #[test]
    fn test_random_term() {
        random_test(20, |rng| {
            let store = TermStore::new();
            let symbols = vec![("f".to_string(), 2), ("g".to_string(), 1)];
            let constants = vec!["a".to_string(), "b".to_string()];

            let term = random_term(&store, rng, &symbols, &constants, 50);
            assert!(store.is_live_term(term.index()));
            assert!(term.iter().all(|subterm| store.is_live_term(subterm.index())));
        });
    }
}

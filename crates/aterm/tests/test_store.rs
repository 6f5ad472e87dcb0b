use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use sharc_aterm::ATerm;
use sharc_aterm::Term;
use sharc_aterm::TermStore;
use sharc_aterm::random_term;
use sharc_utilities::random_test;
use sharc_utilities::test_logger;

fn hash_of(term: &ATerm<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    term.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_interning() {
    test_logger();
    let store = TermStore::new();

    let first = store.from_string("f(g(a),[1,2],\"h i\"(b))").unwrap();
    let second = store.from_string("f(g(a), [1, 2], \"h i\"(b))").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.index(), second.index());
    assert_eq!(hash_of(&first), hash_of(&second), "Equal terms hash equally");

    let different = store.from_string("f(g(a),[2,1],\"h i\"(b))").unwrap();
    assert_ne!(first, different);
    assert_eq!(first.arg(0), different.arg(0), "Common subterms are shared");
}

#[test]
fn test_symbols_are_shared() {
    let store = TermStore::new();

    let f = store.symbol("f", 2, false);
    let g = store.symbol("f", 2, false);
    assert_eq!(f, g);
    assert_ne!(f, store.symbol("f", 1, false), "The arity is part of a symbol");
    assert_ne!(f, store.symbol("f", 2, true), "Quotation is part of a symbol");

    let term = store.from_string("f(a,b)").unwrap();
    assert_eq!(term.get_head_symbol(), f.copy());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_reclaim_deep_list() {
    let store = TermStore::new();
    let initial = store.metrics();

    {
        let list = store.make_list((0..1_000_000).map(|value| store.make_int(value)));
        assert_eq!(list.iter().filter(|term| term.is_int()).count(), 1_000_000);
        assert!(store.metrics().terms > 2_000_000);
    }

    let after = store.metrics();
    assert_eq!(after.terms, initial.terms, "Every node of the list is reclaimed");
    assert_eq!(after.slots_in_use, initial.slots_in_use);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_reclaim_random_terms() {
    random_test(20, |rng| {
        let store = TermStore::new();
        let initial = store.metrics();

        let symbols = vec![("f".to_string(), 2), ("g".to_string(), 1), ("h".to_string(), 4)];
        let constants = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        {
            let terms: Vec<ATerm<'_>> = (0..10)
                .map(|_| random_term(&store, rng, &symbols, &constants, 200))
                .collect();
            assert!(terms.iter().all(|term| store.is_live_term(term.index())));
        }

        let after = store.metrics();
        assert_eq!(after.terms, initial.terms);
        assert_eq!(after.slots_in_use, initial.slots_in_use, "Every slot is free again");
        assert_eq!(after.symbols, initial.symbols, "Unused symbols are removed");
    });
}

#[test]
fn test_protection_keeps_terms_alive() {
    let store = TermStore::new();

    let index = {
        let term = store.from_string("f(a,[1,2])").unwrap();
        store.protect(&term)
    };

    let term = store.protected(index);
    assert_eq!(term.to_string(), "f(a,[1,2])");
    assert_eq!(store.metrics().roots, 1);

    let address = term.index();
    drop(term);
    store.unprotect(index);
    assert!(!store.is_live_term(address), "The term is reclaimed once it is no longer a root");
}

#[test]
fn test_independent_stores() {
    let first = TermStore::new();
    let second = TermStore::new();

    let a = first.from_string("f(a)").unwrap();
    let b = second.from_string("f(a)").unwrap();
    assert_eq!(a.to_string(), b.to_string());
    assert_ne!(a.index(), b.index(), "Every store has its own nodes");
    assert_eq!(first.metrics().terms, second.metrics().terms);
}

//! Grammar registry under concurrent first use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use trellis_rs::lang::{Grammar, GrammarRegistry};
use trellis_rs::{ErrorKind, Language};

const RACERS: usize = 16;

/// Registry whose compiler counts calls per language and sleeps to widen
/// the race window.
fn counting_registry() -> (Arc<GrammarRegistry>, Arc<Mutex<HashMap<Language, usize>>>) {
    let counts = Arc::new(Mutex::new(HashMap::new()));
    let seen = Arc::clone(&counts);
    let registry = GrammarRegistry::with_compiler(Arc::new(move |language| {
        *seen.lock().unwrap().entry(language).or_insert(0) += 1;
        thread::sleep(Duration::from_millis(20));
        Grammar::compile(language)
    }));
    (Arc::new(registry), counts)
}

#[test]
fn racing_first_requests_compile_once_per_language() {
    let (registry, counts) = counting_registry();

    for language in Language::ALL {
        let barrier = Arc::new(Barrier::new(RACERS));
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_grammar(language).unwrap()
                })
            })
            .collect();

        let grammars: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(grammars.iter().all(|g| Arc::ptr_eq(g, &grammars[0])), "{language}");
        assert_eq!(grammars[0].language(), language);
        assert_eq!(counts.lock().unwrap()[&language], 1, "{language}");
    }

    assert_eq!(registry.compilation_count(), Language::ALL.len());
    assert_eq!(registry.cached_count().unwrap(), Language::ALL.len());
}

#[test]
fn cached_reads_do_not_recompile() {
    let (registry, _) = counting_registry();
    registry.get_grammar(Language::Rust).unwrap();

    let reads = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let reads = Arc::clone(&reads);
            thread::spawn(move || {
                for _ in 0..100 {
                    registry.get_grammar(Language::Rust).unwrap();
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(reads.load(Ordering::Relaxed), RACERS * 100);
    assert_eq!(registry.compilation_count(), 1);
}

#[test]
fn unsupported_identifier_leaves_cache_count_unchanged() {
    let registry = GrammarRegistry::new();
    registry.get_grammar_by_name("python").unwrap();
    registry.get_grammar_by_name("golang").unwrap();
    let before = registry.cached_count().unwrap();

    let err = registry.get_grammar_by_name("cobol").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);
    assert!(!err.is_fatal());
    assert_eq!(registry.cached_count().unwrap(), before);
    assert_eq!(registry.compilation_count(), 2);
}

//! CPU search workers.
//!
//! Each worker walks its own arithmetic progression through the scalar
//! space: a random 32-byte starting point from the OS entropy source, then
//! +1 per attempt. Workers never look at each other's position; distinct
//! random starting cosets make duplicate work across workers negligible.

use std::sync::atomic::Ordering;

use crossbeam_channel::Sender;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::derive::{derive_pubkey, encode_address, increment_seed};
use crate::matcher::Matcher;
use crate::{FoundKey, SearchShared};

/// Entry point for a spawned worker thread.
pub(crate) fn worker_loop(matcher: &Matcher, shared: &SearchShared, sink: &Sender<FoundKey>) {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    search_from(seed, matcher, shared, sink);
}

/// Walk the scalar space starting at `seed` until the stop flag is raised
/// or the sink is closed. Exposed separately so tests can inject a fixed
/// starting point and get a deterministic first match.
pub fn search_from(
    mut seed: [u8; 32],
    matcher: &Matcher,
    shared: &SearchShared,
    sink: &Sender<FoundKey>,
) {
    while !shared.stop.load(Ordering::Relaxed) {
        let pubkey = derive_pubkey(&seed);
        if matcher.matches(&pubkey) {
            let address = encode_address(&pubkey);
            // range boundaries admit a handful of strings that do not
            // textually start with the prefix; skip those
            if matcher.confirm(&address) && sink.send(FoundKey { seed, address }).is_err() {
                return;
            }
        }
        if shared.count_attempts {
            shared.attempts.fetch_add(1, Ordering::Relaxed);
        }
        increment_seed(&mut seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn first_match_from(start: [u8; 32], prefix: &str) -> FoundKey {
        let matcher = Arc::new(Matcher::compile(prefix).unwrap());
        let shared = Arc::new(SearchShared::new(true));
        let (sender, receiver) = crossbeam_channel::unbounded();

        let handle = {
            let matcher = Arc::clone(&matcher);
            let shared = Arc::clone(&shared);
            thread::spawn(move || search_from(start, &matcher, &shared, &sender))
        };

        let found = receiver.recv().expect("worker died before any match");
        shared.stop.store(true, Ordering::Relaxed);
        drop(receiver);
        handle.join().unwrap();
        found
    }

    #[test]
    fn finds_and_confirms_a_single_char_prefix() {
        let mut start = [0u8; 32];
        OsRng.fill_bytes(&mut start);
        let found = first_match_from(start, "C");

        assert!(found.address.starts_with('C'));
        // the emitted record must re-verify from scratch
        let pubkey = derive_pubkey(&found.seed);
        assert_eq!(encode_address(&pubkey), found.address);
    }

    #[test]
    fn fixed_starting_seed_gives_a_deterministic_first_match() {
        let start = [42u8; 32];
        let first = first_match_from(start, "D");
        let second = first_match_from(start, "D");
        assert_eq!(first.seed, second.seed);
        assert_eq!(first.address, second.address);
    }

    fn attempts_after_brief_run(count_attempts: bool) -> u64 {
        let matcher = Arc::new(Matcher::compile(&"z".repeat(8)).unwrap());
        let shared = Arc::new(SearchShared::new(count_attempts));
        let (sender, receiver) = crossbeam_channel::unbounded();

        let handle = {
            let matcher = Arc::clone(&matcher);
            let shared = Arc::clone(&shared);
            thread::spawn(move || search_from([0u8; 32], &matcher, &shared, &sender))
        };
        thread::sleep(std::time::Duration::from_millis(50));
        shared.stop.store(true, Ordering::Relaxed);
        drop(receiver);
        handle.join().unwrap();
        shared.attempts.load(Ordering::Relaxed)
    }

    #[test]
    fn counts_attempts_only_while_reporting_is_enabled() {
        assert!(attempts_after_brief_run(true) > 0);
        assert_eq!(attempts_after_brief_run(false), 0);
    }
}

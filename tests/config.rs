//! Loading retry schedules and client policies from configuration.
#![cfg(feature = "serde")]

use eddy::client::ClientPolicies;
use eddy::{Backoff, JitterStrategy, RetryDecision, RetryStrategy};
use std::time::Duration;

#[test]
fn backoff_from_json_drives_a_policy() {
    let json = r#"{
        "strategy": { "exponential": { "base": { "secs": 0, "nanos": 100000000 } } },
        "max_retries": 3
    }"#;
    let backoff: Backoff = serde_json::from_str(json).unwrap();

    assert_eq!(
        backoff.strategy(),
        &RetryStrategy::Exponential {
            base: Duration::from_millis(100)
        }
    );
    assert_eq!(backoff.jitter(), &JitterStrategy::None);

    let mut session = backoff.into_policy::<String>().start();
    let failure = "busy".to_string();
    assert_eq!(session.next_decision(&failure), RetryDecision::Retry(Duration::from_millis(100)));
    assert_eq!(session.next_decision(&failure), RetryDecision::Retry(Duration::from_millis(200)));
    assert_eq!(session.next_decision(&failure), RetryDecision::Retry(Duration::from_millis(400)));
    assert_eq!(session.next_decision(&failure), RetryDecision::GiveUp);
}

#[test]
fn backoff_survives_a_json_round_trip() {
    let backoff = Backoff::fibonacci(Duration::from_millis(10))
        .with_max_retries(5)
        .with_max_delay(Duration::from_secs(1))
        .with_full_jitter();

    let json = serde_json::to_string(&backoff).unwrap();
    let loaded: Backoff = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, backoff);
}

#[test]
fn constant_backoff_without_limits_never_gives_up() {
    let json = r#"{ "strategy": { "constant": { "secs": 0, "nanos": 5000000 } } }"#;
    let backoff: Backoff = serde_json::from_str(json).unwrap();
    assert_eq!(backoff.max_retries(), None);

    let mut session = backoff.into_policy::<()>().start();
    for _ in 0..50 {
        assert_eq!(session.next_decision(&()), RetryDecision::Retry(Duration::from_millis(5)));
    }
}

#[test]
fn client_policies_from_partial_json() {
    let json = r#"{
        "write": { "send_key": true, "base": { "max_retries": 0 } },
        "batch": { "max_concurrent_nodes": 4 }
    }"#;
    let policies: ClientPolicies = serde_json::from_str(json).unwrap();

    let write = policies.write_or(None);
    assert!(write.send_key);
    assert_eq!(write.base.max_retries, 0);
    assert_eq!(write.base.total_timeout, Duration::from_secs(1));
    assert_eq!(policies.batch_or(None).max_concurrent_nodes, 4);
    assert_eq!(policies.read, ClientPolicies::default().read);
}

//! Retrying client walkthrough.
//!
//! Wraps an in-memory client whose connection pool runs dry a few times and
//! shows the retry decorator absorbing those failures, while other failures
//! reach the caller. Logging runs at debug level so each retry decision is
//! printed.
//!
//! Run with `cargo run --example retrying_client`.

use std::time::Duration;

use eddy::client::{
    retry_on_no_more_connections, Bin, ClientError, DataClient, Key, ReactiveClient, RetryClient,
};
use eddy::testing::ScriptedClient;
use eddy::{retry_with_delay, Backoff};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Retrying Client Examples");
    println!("========================\n");

    example_exhausted_pool().await;
    example_non_retryable_failure().await;
    example_backoff_schedule().await;
    example_stream_restart().await;
}

// ==================== Exhausted Pool ====================

async fn example_exhausted_pool() {
    println!("Example 1: Exhausted connection pool");
    println!("------------------------------------");

    let key = Key::new("demo", "users", 1);
    let scripted = ScriptedClient::new()
        .with_record(key.clone(), [Bin::new("name", "ada")])
        .fail_next(vec![
            ClientError::no_more_connections(),
            ClientError::no_more_connections(),
        ]);
    let client = RetryClient::wrap(ReactiveClient::new(scripted), retry_on_no_more_connections());

    match client.get(None, &key).await {
        Ok(Some(found)) => println!("  found {} after {} calls", found.key, client.inner().inner().calls()),
        Ok(None) => println!("  {} not found", key),
        Err(error) => println!("  failed: {}", error),
    }
    println!();
}

// ==================== Non-retryable Failure ====================

async fn example_non_retryable_failure() {
    println!("Example 2: Failures the policy rejects");
    println!("--------------------------------------");

    let scripted = ScriptedClient::new().fail_next(vec![
        ClientError::no_more_connections(),
        ClientError::timeout(true),
    ]);
    let client = RetryClient::wrap(ReactiveClient::new(scripted), retry_on_no_more_connections());

    let key = Key::new("demo", "users", 2);
    match client.put(None, &key, &[Bin::new("visits", 1)]).await {
        Ok(_) => println!("  stored {}", key),
        Err(error) => println!(
            "  gave up with \"{}\" after {} calls",
            error,
            client.inner().inner().calls()
        ),
    }
    println!();
}

// ==================== Backoff Schedule ====================

async fn example_backoff_schedule() {
    println!("Example 3: Exponential backoff with a retry limit");
    println!("-------------------------------------------------");

    let policy = Backoff::exponential(Duration::from_millis(20))
        .with_max_retries(3)
        .into_policy();
    let scripted = ScriptedClient::new().fail_next(vec![
        ClientError::no_more_connections(),
        ClientError::timeout(false),
        ClientError::timeout(false),
    ]);
    let client = RetryClient::wrap(ReactiveClient::new(scripted), policy);

    let started = tokio::time::Instant::now();
    let key = Key::new("demo", "users", 3);
    let outcome = client.exists(None, &key).await;
    println!(
        "  outcome {:?} after {} calls in {:?}",
        outcome,
        client.inner().inner().calls(),
        started.elapsed()
    );
    println!();
}

// ==================== Stream Restart ====================

async fn example_stream_restart() {
    println!("Example 4: Streams restart from the beginning");
    println!("---------------------------------------------");

    let scripted = ScriptedClient::new()
        .with_record(Key::new("demo", "orders", 1), [Bin::new("total", 10)])
        .with_record(Key::new("demo", "orders", 2), [Bin::new("total", 25)])
        .fail_next(vec![ClientError::no_more_connections()]);
    let policy = retry_with_delay(|error: &ClientError, attempt| {
        (error.kind == eddy::client::ErrorKind::NoMoreConnections && attempt <= 3)
            .then(|| Duration::from_millis(5))
    });
    let client = RetryClient::wrap(ReactiveClient::new(scripted), policy);

    match client.scan_all(None, "demo", "orders", &["total"]).collect_all().await {
        Ok(records) => {
            for found in records {
                let total = found.record.as_ref().and_then(|r| r.get("total").cloned());
                println!("  {} total={:?}", found.key, total);
            }
        }
        Err(error) => println!("  scan failed: {}", error),
    }
}

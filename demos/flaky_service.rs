//! Circuit breaker demo against a flaky service.
//!
//! This example shows how to:
//! - Configure failure/success thresholds and the retry timeout
//! - Call a flaky operation through an async circuit breaker
//! - Poll the breaker's metrics between calls
//!
//! Run with: cargo run --example flaky_service

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tripwire::prelude::*;

/// Fails two calls out of every three.
async fn external_service(attempts: &AtomicU32) -> Result<&'static str, &'static str> {
    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt % 3 != 0 {
        return Err("Service failed");
    }
    Ok("Service success")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Circuit Breaker Demo ===\n");

    let config = CircuitBreakerConfig::new(3, Duration::from_secs(5), 2);
    println!("Configuration:");
    println!("  Failure threshold: {}", config.failure_threshold);
    println!("  Success threshold: {}", config.success_threshold);
    println!("  Retry timeout: {:?}", config.retry_timeout);
    println!();

    let breaker = AsyncCircuitBreaker::new(config)?.with_name("external-service");
    let attempts = AtomicU32::new(0);

    for i in 1..=10 {
        let attempts = &attempts;
        match breaker.execute(|| external_service(attempts)).await {
            Outcome::Success(reply) => println!("Request #{i}: {reply}"),
            Outcome::Degraded(fallback) => println!("Request #{i}: {fallback}"),
        }

        let metrics = breaker.metrics().await;
        println!(
            "  Failure count: {}, Success count: {}, Circuit state: {}",
            metrics.failure_count, metrics.success_count, metrics.state
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    println!("\nFinal stats: {:?}", breaker.stats().await);
    Ok(())
}

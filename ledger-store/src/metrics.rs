//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the store:
//!
//! - `nexus_accounts_created_total` - Accounts created
//! - `nexus_conversions_total` - Conversions recorded
//! - `nexus_withdrawal_requests_total` - Withdrawal requests created
//! - `nexus_withdrawals_finalized_total` - Withdrawals finalized
//! - `nexus_chat_session_writes_total` - Chat session writes
//! - `nexus_write_conflicts_total` - Compare-and-swap failures
//! - `nexus_mutation_duration_seconds` - Mutation latency histogram

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accounts created
    pub accounts_created: IntCounter,

    /// Conversions recorded
    pub conversions: IntCounter,

    /// Withdrawal requests created
    pub withdrawal_requests: IntCounter,

    /// Withdrawals finalized (approved)
    pub withdrawals_finalized: IntCounter,

    /// Chat session writes
    pub chat_writes: IntCounter,

    /// Compare-and-swap failures
    pub write_conflicts: IntCounter,

    /// Mutation latency histogram
    pub mutation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accounts_created = IntCounter::with_opts(Opts::new(
            "nexus_accounts_created_total",
            "Accounts created",
        ))?;
        registry.register(Box::new(accounts_created.clone()))?;

        let conversions = IntCounter::with_opts(Opts::new(
            "nexus_conversions_total",
            "Conversions recorded",
        ))?;
        registry.register(Box::new(conversions.clone()))?;

        let withdrawal_requests = IntCounter::with_opts(Opts::new(
            "nexus_withdrawal_requests_total",
            "Withdrawal requests created",
        ))?;
        registry.register(Box::new(withdrawal_requests.clone()))?;

        let withdrawals_finalized = IntCounter::with_opts(Opts::new(
            "nexus_withdrawals_finalized_total",
            "Withdrawals finalized",
        ))?;
        registry.register(Box::new(withdrawals_finalized.clone()))?;

        let chat_writes = IntCounter::with_opts(Opts::new(
            "nexus_chat_session_writes_total",
            "Chat session writes",
        ))?;
        registry.register(Box::new(chat_writes.clone()))?;

        let write_conflicts = IntCounter::with_opts(Opts::new(
            "nexus_write_conflicts_total",
            "Compare-and-swap failures",
        ))?;
        registry.register(Box::new(write_conflicts.clone()))?;

        let mutation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "nexus_mutation_duration_seconds",
                "Mutation latency histogram",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(mutation_duration.clone()))?;

        Ok(Self {
            accounts_created,
            conversions,
            withdrawal_requests,
            withdrawals_finalized,
            chat_writes,
            write_conflicts,
            mutation_duration,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.accounts_created.get(), 0);
        assert_eq!(metrics.conversions.get(), 0);
    }

    #[test]
    fn test_counters_increment() {
        let metrics = Metrics::new().unwrap();
        metrics.accounts_created.inc();
        metrics.accounts_created.inc();
        assert_eq!(metrics.accounts_created.get(), 2);

        metrics.write_conflicts.inc();
        assert_eq!(metrics.write_conflicts.get(), 1);
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry; creating two must not clash
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.conversions.inc();
        assert_eq!(a.conversions.get(), 1);
        assert_eq!(b.conversions.get(), 0);
    }
}

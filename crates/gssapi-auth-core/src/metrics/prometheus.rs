//! Prometheus metrics for the GSSAPI auth backend.
//!
//! Provides counters, histograms, and gauges for monitoring login and
//! renewal traffic.

use prometheus::{
    Counter, CounterVec, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};

/// Auth backend metrics collection.
///
/// Contains all metrics exposed by the backend for monitoring.
pub struct AuthMetrics {
    /// The Prometheus registry.
    pub registry: Registry,

    /// Total login attempts.
    pub login_attempts: Counter,

    /// Login failures by error kind.
    pub login_failures: CounterVec,

    /// Total successful renewals.
    pub renewals: Counter,

    /// Renewal failures by error kind.
    pub renewal_failures: CounterVec,

    /// Security-context negotiation latency.
    pub negotiation_duration_seconds: Histogram,

    /// Logins currently negotiating.
    pub logins_in_flight: IntGauge,
}

impl AuthMetrics {
    /// Create a new metrics collection.
    ///
    /// # Panics
    ///
    /// Panics if metric registration fails (should not happen with unique names).
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let login_attempts = Counter::new(
            "gssapi_auth_login_attempts_total",
            "Total number of login attempts",
        )
        .expect("metric creation should succeed");

        let login_failures = CounterVec::new(
            Opts::new(
                "gssapi_auth_login_failures_total",
                "Total number of failed logins by error kind",
            ),
            &["error_kind"],
        )
        .expect("metric creation should succeed");

        let renewals = Counter::new(
            "gssapi_auth_renewals_total",
            "Total number of successful lease renewals",
        )
        .expect("metric creation should succeed");

        let renewal_failures = CounterVec::new(
            Opts::new(
                "gssapi_auth_renewal_failures_total",
                "Total number of refused renewals by error kind",
            ),
            &["error_kind"],
        )
        .expect("metric creation should succeed");

        let negotiation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gssapi_auth_negotiation_duration_seconds",
                "Login negotiation latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .expect("metric creation should succeed");

        let logins_in_flight = IntGauge::new(
            "gssapi_auth_logins_in_flight",
            "Current number of logins negotiating a security context",
        )
        .expect("metric creation should succeed");

        // Register all metrics
        registry
            .register(Box::new(login_attempts.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(login_failures.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(renewals.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(renewal_failures.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(negotiation_duration_seconds.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(logins_in_flight.clone()))
            .expect("metric registration should succeed");

        Self {
            registry,
            login_attempts,
            login_failures,
            renewals,
            renewal_failures,
            negotiation_duration_seconds,
            logins_in_flight,
        }
    }

    /// Record a login attempt entering negotiation.
    pub fn login_started(&self) {
        self.login_attempts.inc();
        self.logins_in_flight.inc();
    }

    /// Record the end of a login attempt.
    ///
    /// `error_kind` is `None` on success.
    pub fn login_finished(&self, duration_seconds: f64, error_kind: Option<&str>) {
        self.logins_in_flight.dec();
        self.negotiation_duration_seconds.observe(duration_seconds);
        if let Some(kind) = error_kind {
            self.login_failures.with_label_values(&[kind]).inc();
        }
    }

    /// Record a renewal outcome.
    pub fn record_renewal(&self, error_kind: Option<&str>) {
        match error_kind {
            None => self.renewals.inc(),
            Some(kind) => self.renewal_failures.with_label_values(&[kind]).inc(),
        }
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        encoder.encode_utf8(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for AuthMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMetrics")
            .field("login_attempts", &self.login_attempts.get())
            .field("logins_in_flight", &self.logins_in_flight.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = AuthMetrics::new();
        assert!(metrics.encode().is_ok());
    }

    #[test]
    fn test_login_lifecycle() {
        let metrics = AuthMetrics::new();
        metrics.login_started();
        metrics.login_started();
        assert_eq!(metrics.logins_in_flight.get(), 2);

        metrics.login_finished(0.01, None);
        metrics.login_finished(0.02, Some("unknown_principal"));

        assert_eq!(metrics.logins_in_flight.get(), 0);
        assert_eq!(metrics.login_attempts.get(), 2.0);
        assert_eq!(
            metrics
                .login_failures
                .with_label_values(&["unknown_principal"])
                .get(),
            1.0
        );
        assert_eq!(metrics.negotiation_duration_seconds.get_sample_count(), 2);

        let output = metrics.encode().unwrap();
        assert!(output.contains("gssapi_auth_login_attempts_total"));
        assert!(output.contains("gssapi_auth_login_failures_total"));
    }

    #[test]
    fn test_record_renewal() {
        let metrics = AuthMetrics::new();
        metrics.record_renewal(None);
        metrics.record_renewal(Some("lease_expired"));

        assert_eq!(metrics.renewals.get(), 1.0);
        let output = metrics.encode().unwrap();
        assert!(output.contains("gssapi_auth_renewals_total"));
        assert!(output.contains("gssapi_auth_renewal_failures_total"));
    }
}

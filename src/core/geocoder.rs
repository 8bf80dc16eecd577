//! Per-record geocoding with bounded retry, and the sequential batch driver.
//!
//! Each record gets at most `max_retries` requests. Rate limits back off
//! linearly (`retry_delay * (attempt + 1)`), transport errors wait a flat
//! `retry_delay`, and other HTTP errors retry straight away. No wait follows
//! the final attempt. An empty match list ends the record immediately.

use crate::domain::model::{LatLng, LocationRecord};
use crate::domain::ports::{AddressLookup, LookupReply};
use crate::domain::report::{GeocodeReport, GeocodeStatus};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait after a rate-limited attempt (zero-based).
    pub fn rate_limit_backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * (attempt + 1)
    }

    /// Wait after a transport failure.
    pub fn transport_backoff(&self) -> Duration {
        self.retry_delay
    }
}

pub struct Geocoder<L: AddressLookup> {
    lookup: L,
    policy: RetryPolicy,
    request_delay: Duration,
    regeocode: bool,
}

impl<L: AddressLookup> Geocoder<L> {
    pub fn new(lookup: L, policy: RetryPolicy) -> Self {
        Self {
            lookup,
            policy,
            request_delay: DEFAULT_REQUEST_DELAY,
            regeocode: false,
        }
    }

    /// Pause between consecutive records of a batch.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Query records that already carry coordinates instead of skipping them.
    pub fn with_regeocode(mut self, regeocode: bool) -> Self {
        self.regeocode = regeocode;
        self
    }

    /// Resolves one record's address. Coordinates are only written on success,
    /// so a failed re-query keeps whatever the record already had.
    pub async fn geocode(&self, record: &mut LocationRecord) -> GeocodeReport {
        let mut report = GeocodeReport {
            machine_id: record.machine_id.clone(),
            status: GeocodeStatus::AlreadyGeocoded,
            requests: 0,
            backoffs: Vec::new(),
        };

        if record.coordinates.is_some() && !self.regeocode {
            tracing::debug!("Already geocoded: {} ({})", record.name, record.machine_id);
            return report;
        }

        if record.address.trim().is_empty() {
            tracing::warn!("No address for: {} ({})", record.name, record.machine_id);
            report.status = GeocodeStatus::EmptyAddress;
            return report;
        }

        let max_retries = self.policy.max_retries;
        let mut last_error = String::from("no attempts made");

        for attempt in 0..max_retries {
            let is_last = attempt + 1 >= max_retries;
            report.requests += 1;

            match self.lookup.lookup(&record.address).await {
                Ok(LookupReply::Matches(matches)) => {
                    return match matches.first() {
                        Some(best) => {
                            let coordinates = LatLng {
                                lat: best.lat,
                                lng: best.lng,
                            };
                            record.coordinates = Some(coordinates);
                            tracing::info!(
                                "✓ Geocoded: {} - {} ({})",
                                record.name,
                                record.address,
                                coordinates
                            );
                            report.status = GeocodeStatus::Success;
                            report
                        }
                        None => {
                            tracing::warn!("⚠ No results found for: {}", record.address);
                            report.status = GeocodeStatus::NotFound;
                            report
                        }
                    };
                }
                Ok(LookupReply::Malformed(reason)) => {
                    tracing::warn!("Unreadable match for {}: {}", record.address, reason);
                    report.status = GeocodeStatus::Malformed { reason };
                    return report;
                }
                Ok(LookupReply::Rejected(reason)) => {
                    tracing::error!("Lookup rejected for {}: {}", record.address, reason);
                    report.status = GeocodeStatus::Rejected { reason };
                    return report;
                }
                Ok(LookupReply::RateLimited) => {
                    last_error = "rate limited".to_string();
                    if !is_last {
                        let wait = self.policy.rate_limit_backoff(attempt);
                        tracing::warn!("Rate limited, waiting {:?}...", wait);
                        sleep(wait).await;
                        report.backoffs.push(wait);
                    }
                }
                Ok(LookupReply::Status(code)) => {
                    last_error = format!("HTTP {}", code);
                    tracing::warn!("HTTP Error {} for: {}", code, record.address);
                }
                Err(e) => {
                    tracing::warn!(
                        "Network error (attempt {}/{}): {}",
                        attempt + 1,
                        max_retries,
                        e
                    );
                    last_error = e.to_string();
                    if !is_last {
                        let wait = self.policy.transport_backoff();
                        sleep(wait).await;
                        report.backoffs.push(wait);
                    }
                }
            }
        }

        tracing::error!("✗ Failed to geocode: {}", record.address);
        report.status = GeocodeStatus::Exhausted { last_error };
        report
    }

    /// Geocodes every record in order, pausing between records that hit the service.
    pub async fn geocode_all(
        &self,
        mut records: Vec<LocationRecord>,
    ) -> (Vec<LocationRecord>, Vec<GeocodeReport>) {
        let total = records.len();
        let mut reports = Vec::with_capacity(total);

        for (index, record) in records.iter_mut().enumerate() {
            tracing::info!("Processing {}/{}...", index + 1, total);
            let report = self.geocode(record).await;
            let queried = report.requests > 0;
            reports.push(report);

            if queried && index + 1 < total && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }
        }

        (records, reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::LookupMatch;
    use crate::utils::error::{EtlError, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;
    use tokio::time::Instant;

    enum Scripted {
        Reply(LookupReply),
        NetworkError,
    }

    /// Plays back a fixed sequence of replies and counts requests.
    struct ScriptedLookup {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AddressLookup for ScriptedLookup {
        async fn lookup(&self, address: &str) -> Result<LookupReply> {
            self.calls.lock().unwrap().push(address.to_string());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(reply)) => Ok(reply),
                Some(Scripted::NetworkError) | None => Err(EtlError::IoError(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            }
        }
    }

    fn found(lat: f64, lng: f64) -> Scripted {
        Scripted::Reply(LookupReply::Matches(vec![LookupMatch { lat, lng }]))
    }

    fn record() -> LocationRecord {
        LocationRecord::new("Walmart", "Q1001", "123 Main St, Springfield, IL")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let lookup = ScriptedLookup::new(vec![found(39.78, -89.65)]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(report.status, GeocodeStatus::Success);
        assert_eq!(report.requests, 1);
        assert_eq!(rec.coordinates, Some(LatLng { lat: 39.78, lng: -89.65 }));
        assert_eq!(lookup.calls(), vec!["123 Main St, Springfield, IL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_matches_fails_without_retry() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::Matches(vec![])),
            found(1.0, 1.0),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(report.status, GeocodeStatus::NotFound);
        assert_eq!(report.requests, 1);
        assert!(report.backoffs.is_empty());
        assert_eq!(rec.coordinates, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limits_back_off_linearly() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::RateLimited),
            Scripted::Reply(LookupReply::RateLimited),
            found(39.78, -89.65),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();
        let started = Instant::now();

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(report.status, GeocodeStatus::Success);
        assert_eq!(report.requests, 3);
        assert_eq!(
            report.backoffs,
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6) && waited < Duration::from_secs(7));
        assert!(rec.is_geocoded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_exhaust_retries() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::NetworkError,
            Scripted::NetworkError,
            Scripted::NetworkError,
            found(1.0, 1.0),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();

        let report = geocoder.geocode(&mut rec).await;

        assert!(matches!(report.status, GeocodeStatus::Exhausted { .. }));
        assert_eq!(report.requests, 3);
        assert_eq!(
            report.backoffs,
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
        assert_eq!(rec.coordinates, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_errors_retry_without_delay() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::Status(500)),
            Scripted::Reply(LookupReply::Status(502)),
            found(10.0, 20.0),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();
        let started = Instant::now();

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(report.status, GeocodeStatus::Success);
        assert_eq!(report.requests, 3);
        assert!(report.backoffs.is_empty());
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_on_every_attempt() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::RateLimited),
            Scripted::Reply(LookupReply::RateLimited),
            Scripted::Reply(LookupReply::RateLimited),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());
        let mut rec = record();

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(
            report.status,
            GeocodeStatus::Exhausted {
                last_error: "rate limited".to_string()
            }
        );
        assert_eq!(report.requests, 3);
        assert_eq!(report.backoffs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_replies_stop_immediately() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::Rejected("bad key".to_string())),
            Scripted::Reply(LookupReply::Malformed("lat=north".to_string())),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());

        let mut first = record();
        let mut second = record();
        let rejected = geocoder.geocode(&mut first).await;
        let malformed = geocoder.geocode(&mut second).await;

        assert!(matches!(rejected.status, GeocodeStatus::Rejected { .. }));
        assert!(matches!(malformed.status, GeocodeStatus::Malformed { .. }));
        assert_eq!(rejected.requests + malformed.requests, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_empty_address_and_geocoded_records() {
        let lookup = ScriptedLookup::new(vec![]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default());

        let mut blank = LocationRecord::new("Walmart", "Q1", "  ");
        let mut done = record();
        done.coordinates = Some(LatLng { lat: 1.0, lng: 2.0 });

        assert_eq!(geocoder.geocode(&mut blank).await.status, GeocodeStatus::EmptyAddress);
        assert_eq!(geocoder.geocode(&mut done).await.status, GeocodeStatus::AlreadyGeocoded);
        assert_eq!(done.coordinates, Some(LatLng { lat: 1.0, lng: 2.0 }));
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_regeocode_queries_again() {
        let lookup = ScriptedLookup::new(vec![found(5.0, 6.0)]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default()).with_regeocode(true);
        let mut rec = record();
        rec.coordinates = Some(LatLng { lat: 1.0, lng: 2.0 });

        let report = geocoder.geocode(&mut rec).await;

        assert_eq!(report.status, GeocodeStatus::Success);
        assert_eq!(rec.coordinates, Some(LatLng { lat: 5.0, lng: 6.0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_regeocode_keeps_previous_coordinates() {
        let lookup = ScriptedLookup::new(vec![
            Scripted::Reply(LookupReply::Matches(vec![])),
            Scripted::NetworkError,
            Scripted::NetworkError,
            Scripted::NetworkError,
            Scripted::Reply(LookupReply::Rejected("bad key".to_string())),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default()).with_regeocode(true);
        let previous = Some(LatLng { lat: 1.0, lng: 2.0 });

        let mut not_found = record();
        not_found.coordinates = previous;
        let mut exhausted = record();
        exhausted.coordinates = previous;
        let mut rejected = record();
        rejected.coordinates = previous;

        assert_eq!(geocoder.geocode(&mut not_found).await.status, GeocodeStatus::NotFound);
        assert!(matches!(
            geocoder.geocode(&mut exhausted).await.status,
            GeocodeStatus::Exhausted { .. }
        ));
        assert!(matches!(
            geocoder.geocode(&mut rejected).await.status,
            GeocodeStatus::Rejected { .. }
        ));
        assert_eq!(not_found.coordinates, previous);
        assert_eq!(exhausted.coordinates, previous);
        assert_eq!(rejected.coordinates, previous);
        assert_eq!(lookup.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_preserves_order_and_delays_between_records() {
        let lookup = ScriptedLookup::new(vec![
            found(1.0, 1.0),
            Scripted::Reply(LookupReply::Matches(vec![])),
            found(3.0, 3.0),
        ]);
        let geocoder = Geocoder::new(&lookup, RetryPolicy::default())
            .with_request_delay(Duration::from_secs(1));
        let input = vec![
            LocationRecord::new("A", "Q1", "1 A St, X"),
            LocationRecord::new("B", "Q2", "2 B St, X"),
            LocationRecord::new("C", "Q3", "3 C St, X"),
        ];
        let started = Instant::now();

        let (records, reports) = geocoder.geocode_all(input).await;

        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.machine_id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].status, GeocodeStatus::NotFound);
        assert_eq!(records[1].coordinates, None);
        assert_eq!(records[2].coordinates, Some(LatLng { lat: 3.0, lng: 3.0 }));
        // Two gaps between three records, none after the last.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));
    }

    #[test]
    fn test_default_policy_backoffs() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_backoff(0), Duration::from_secs(2));
        assert_eq!(policy.rate_limit_backoff(1), Duration::from_secs(4));
        assert_eq!(policy.transport_backoff(), Duration::from_secs(2));
    }
}

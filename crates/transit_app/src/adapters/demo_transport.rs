// Rust guideline compliant 2026-10-16

//! Demo adapter for the `Transport` port.
//!
//! Answers the regional and REST endpoints with canned JSON after a simulated
//! latency, and fails a configurable share of calls with a transport error.
//! Supports seeded randomness for reproducible runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{ApiRequest, ApiResponse, HttpMethod, NetworkError, Transport};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;

/// The only stop the demo REST API knows about.
pub const DEMO_STOP_ID: &str = "1_75403";

// ---------------------------------------------------------------------------
// DemoTransportError
// ---------------------------------------------------------------------------

/// Errors raised while configuring the demo transport.
#[derive(Debug, thiserror::Error)]
pub enum DemoTransportError {
    /// The supplied configuration is invalid.
    #[error("invalid demo transport configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// DemoTransportConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`DemoTransport`].
///
/// Construct via [`DemoTransportConfig::builder`].
#[derive(Debug, Clone)]
pub struct DemoTransportConfig {
    /// Simulated round-trip time of every call.
    pub latency: Duration,
    /// Share of calls that fail with a transport error (range: `[0, 1]`).
    pub failure_rate: f64,
    /// Optional RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`DemoTransportConfig`].
#[derive(Debug)]
pub struct DemoTransportConfigBuilder {
    latency: Duration,
    failure_rate: f64,
    seed: Option<u64>,
}

impl DemoTransportConfig {
    /// Create a builder.
    ///
    /// Default values: `latency = 250 ms`, `failure_rate = 0.0`, `seed = None`.
    #[must_use]
    pub fn builder() -> DemoTransportConfigBuilder {
        DemoTransportConfigBuilder {
            latency: Duration::from_millis(250),
            failure_rate: 0.0,
            seed: None,
        }
    }
}

impl DemoTransportConfigBuilder {
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate;
        self
    }

    /// Fix the RNG seed for deterministic failures (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DemoTransportError::InvalidConfig`] when `failure_rate` is
    /// outside `[0, 1]` (NaN included).
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<DemoTransportConfig, DemoTransportError> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(DemoTransportError::InvalidConfig {
                reason: format!("failure_rate must be in [0, 1], got {}", self.failure_rate),
            });
        }
        Ok(DemoTransportConfig {
            latency: self.latency,
            failure_rate: self.failure_rate,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// DemoTransport
// ---------------------------------------------------------------------------

/// `Transport` adapter backed by canned responses.
#[derive(Debug)]
pub struct DemoTransport {
    config: DemoTransportConfig,
    rng: Mutex<StdRng>,
    next_alarm: AtomicU64,
}

impl DemoTransport {
    #[must_use]
    pub fn new(config: DemoTransportConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng: Mutex::new(rng), next_alarm: AtomicU64::new(1) }
    }

    fn respond(&self, request: &ApiRequest) -> ApiResponse {
        let path = request.path.as_str();
        match request.method {
            HttpMethod::Get if path.ends_with("/weather.json") => json_response(&weather()),
            HttpMethod::Get if path.ends_with("/vehicles") => {
                json_response(&vehicles(request.query_value("query").unwrap_or_default()))
            }
            HttpMethod::Get if path.starts_with("/api/where/arrivals-and-departures-for-stop/") => {
                let stop_id = path
                    .trim_start_matches("/api/where/arrivals-and-departures-for-stop/")
                    .trim_end_matches(".json");
                json_response(&arrivals(stop_id))
            }
            HttpMethod::Post if path.ends_with("/alarms") => {
                let id = self.next_alarm.fetch_add(1, Ordering::Relaxed);
                json_response(&json!({ "url": format!("https://alerts.demo{path}/{id}") }))
            }
            HttpMethod::Delete => ApiResponse { status: 204, body: vec![] },
            _ => ApiResponse { status: 404, body: b"not found".to_vec() },
        }
    }
}

impl Transport for DemoTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NetworkError> {
        tokio::time::sleep(self.config.latency).await;

        let dropped = self.rng.lock().random_bool(self.config.failure_rate);
        if dropped {
            tracing::debug!(call = %request, "demo_transport.connection.reset");
            return Err(NetworkError::Transport { reason: "connection reset by peer".to_owned() });
        }

        let response = self.respond(&request);
        tracing::debug!(call = %request, status = response.status, "demo_transport.responded");
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Canned payloads
// ---------------------------------------------------------------------------

fn json_response(value: &serde_json::Value) -> ApiResponse {
    ApiResponse::ok(value.to_string())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

fn weather() -> serde_json::Value {
    json!({
        "region_identifier": 1,
        "region_name": "Puget Sound",
        "units": "us",
        "today_summary": "Light rain until evening.",
        "current_forecast": { "icon": "rain", "summary": "Drizzle", "temperature": 54.2 }
    })
}

fn vehicles(query: &str) -> serde_json::Value {
    let fleet = [("Metro Transit", "1_4361"), ("Sound Transit", "40_436"), ("Metro Transit", "1_7012")];
    let matching: Vec<serde_json::Value> = fleet
        .iter()
        .filter(|(_, vehicle_id)| vehicle_id.contains(query))
        .map(|(agency_name, vehicle_id)| json!({ "agency_name": agency_name, "vehicle_id": vehicle_id }))
        .collect();
    serde_json::Value::Array(matching)
}

fn arrivals(stop_id: &str) -> serde_json::Value {
    if stop_id != DEMO_STOP_ID {
        return json!({ "code": 404, "text": format!("stop {stop_id} not found"), "data": null });
    }
    let now = now_millis();
    json!({
        "code": 200,
        "text": "OK",
        "data": {
            "entry": {
                "stopId": DEMO_STOP_ID,
                "arrivalsAndDepartures": [
                    {
                        "routeShortName": "49",
                        "tripId": "1_604",
                        "tripHeadsign": "University District",
                        "vehicleId": "1_4361",
                        "scheduledArrivalTime": now + 240_000,
                        "predictedArrivalTime": now + 300_000,
                        "stopSequence": 7
                    },
                    {
                        "routeShortName": "10",
                        "tripId": "1_881",
                        "tripHeadsign": "Capitol Hill",
                        "scheduledArrivalTime": now + 720_000,
                        "stopSequence": 12
                    }
                ]
            },
            "references": {
                "stops": [{ "id": DEMO_STOP_ID, "name": "Pine St & 9th Ave", "code": "75403" }]
            }
        }
    })
}

// Rust guideline compliant 2026-10-16

//! Shared domain types for the transit operation pipeline.
//!
//! Defines the operation vocabulary (`OperationId`, `OperationState`), the
//! failure taxonomy (`NetworkError`, `FailureCause`), the request/response
//! pair exchanged with the hexagonal `Transport` port, and the transit payloads
//! that flow through the pipeline as opaque results.
//! All pipeline crates depend on this crate; no other workspace crate is imported here.

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Operation vocabulary
// ---------------------------------------------------------------------------

/// Opaque identity of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(uuid::Uuid);

impl OperationId {
    /// Allocate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable; collisions are irrelevant for logs.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Lifecycle state of an operation.
///
/// Transitions are monotonic: `Pending -> Executing -> Completed | Cancelled`.
/// Operations driven from outside (model operations) may go straight from
/// `Pending` to a terminal state. Nothing leaves `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Created, not yet started.
    Pending,
    /// Work is in flight.
    Executing,
    /// Finished with a success or failure outcome.
    Completed,
    /// Cancelled before it could complete.
    Cancelled,
}

impl OperationState {
    /// `true` for `Completed` and `Cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Coarse cause tag attached to every [`NetworkError`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Transport-level failure: unreachable host, timeout, TLS.
    Network,
    /// The server answered with a non-success status.
    Server,
    /// The payload did not have the expected shape.
    Decode,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Failure descriptor of a remote call.
///
/// Cancellation is deliberately absent: it is a terminal state of its own,
/// never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The request never produced a response.
    #[error("transport failure: {reason}")]
    Transport {
        /// Human-readable description.
        reason: String,
    },
    /// The server responded with a non-success status.
    #[error("server responded with status {status}: {reason}")]
    Server {
        /// HTTP status (or API envelope code).
        status: u16,
        /// Human-readable description.
        reason: String,
    },
    /// The response body could not be decoded.
    #[error("malformed payload: {reason}")]
    Decode {
        /// Human-readable description.
        reason: String,
    },
}

impl NetworkError {
    /// Cause tag of this failure.
    #[must_use]
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Transport { .. } => FailureCause::Network,
            Self::Server { .. } => FailureCause::Server,
            Self::Decode { .. } => FailureCause::Decode,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport port
// ---------------------------------------------------------------------------

/// HTTP verb of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Transport-agnostic description of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path relative to the service base URL, or an absolute URL.
    pub path: String,
    /// Query parameters, in insertion order.
    pub query: Vec<(String, String)>,
    /// Form-encoded body parameters, in insertion order.
    pub form: Vec<(String, String)>,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: vec![], form: vec![] }
    }

    /// A `GET` request for `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// A `POST` request for `path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// A `DELETE` request for `path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a form body parameter.
    #[must_use]
    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.form.push((key.into(), value.to_string()));
        self
    }

    /// Look up the first query parameter named `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Raw response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Undecoded response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// A `200 OK` response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, body: body.into() }
    }

    /// `true` for any 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the body of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Server`] for any non-2xx status.
    pub fn into_body(self) -> Result<Vec<u8>, NetworkError> {
        if self.is_success() {
            return Ok(self.body);
        }
        Err(NetworkError::Server {
            status: self.status,
            reason: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}

/// Hexagonal port: sends one request to the remote service.
///
/// Implementations live in the application binary (or in tests). The API
/// client depends exclusively on this trait -- never on a concrete adapter.
/// The returned future must be `Send`: it runs on the shared worker pool.
pub trait Transport: Send + Sync + 'static {
    /// Perform `request` and return the raw response.
    ///
    /// Dropping the returned future abandons the call.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Transport`] when no response could be obtained.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, NetworkError>> + Send;
}

// ---------------------------------------------------------------------------
// Transit payloads
// ---------------------------------------------------------------------------

/// Current conditions inside a [`WeatherForecast`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentForecast {
    pub icon: String,
    pub summary: String,
    /// Degrees, in the units of the enclosing forecast.
    pub temperature: f64,
}

/// Weather snapshot for a region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherForecast {
    pub region_identifier: u32,
    pub region_name: String,
    pub units: String,
    pub today_summary: String,
    pub current_forecast: CurrentForecast,
}

/// Parameters of an arrival alarm registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    /// Fire the alarm this many seconds before the vehicle arrives.
    pub seconds_before: u64,
    pub stop_id: String,
    pub trip_id: String,
    /// Service date, milliseconds since the epoch.
    pub service_date: i64,
    pub vehicle_id: String,
    pub stop_sequence: u32,
    /// Push-notification identifier of this device.
    pub user_push_id: String,
}

/// A registered alarm. `url` identifies it for later deletion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Alarm {
    pub url: String,
}

/// A vehicle matched by a vehicle search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgencyVehicle {
    pub agency_name: String,
    pub vehicle_id: String,
}

/// A transit stop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// One predicted or scheduled arrival at a stop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalDeparture {
    pub route_short_name: String,
    pub trip_id: String,
    pub trip_headsign: String,
    /// Empty when no vehicle is assigned yet.
    #[serde(default)]
    pub vehicle_id: String,
    /// Milliseconds since the epoch.
    pub scheduled_arrival_time: i64,
    /// Milliseconds since the epoch; `0` when no real-time prediction exists.
    #[serde(default)]
    pub predicted_arrival_time: i64,
    pub stop_sequence: u32,
}

impl ArrivalDeparture {
    /// `true` when a real-time prediction is available.
    #[must_use]
    pub fn is_predicted(&self) -> bool {
        self.predicted_arrival_time > 0
    }
}

/// A stop together with its upcoming arrivals and departures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopArrivals {
    pub stop: Stop,
    pub arrivals_and_departures: Vec<ArrivalDeparture>,
}

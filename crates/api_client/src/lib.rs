// Rust guideline compliant 2026-10-16

//! API-client collaborator -- turns domain parameters into network operations
//! bound to a remote call over the `Transport` port.
//!
//! Entry points: [`ObacoService`] (regional services: weather, alarms,
//! vehicles) and [`RestApiService`] (stop arrivals). Both share an
//! [`ApiClient`]; configuration via [`ClientConfig::builder`].
//!
//! Operations are returned unstarted; scheduling them is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use domain::{AlarmRequest, ApiRequest, NetworkError, Transport};
use operation::{MainQueue, NetworkOperation};

/// Network operation carrying an undecoded response body.
pub type RawOperation = NetworkOperation<Vec<u8>>;

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Errors raised while configuring an API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The supplied configuration is invalid.
    #[error("invalid client configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// ClientConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for an [`ApiClient`].
///
/// Construct via [`ClientConfig::builder`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on a single remote call, response included.
    pub timeout: Duration,
}

/// Builder for [`ClientConfig`].
///
/// Obtain via [`ClientConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ClientConfigBuilder {
    timeout: Duration,
}

impl ClientConfig {
    /// Create a builder.
    ///
    /// Default values: `timeout = 30 s`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder { timeout: Duration::from_secs(30) }
    }
}

impl ClientConfigBuilder {
    /// Override the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when `timeout` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig { reason: "timeout must be > 0".to_owned() });
        }
        Ok(ClientConfig { timeout: self.timeout })
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Builds [`RawOperation`]s over an injected [`Transport`].
///
/// Timeout policy lives here: a call that outlives `config.timeout` fails with
/// [`NetworkError::Transport`]. Nothing is retried.
#[derive(Debug)]
pub struct ApiClient<T: Transport> {
    transport: Arc<T>,
    config: ClientConfig,
    main: MainQueue,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            main: self.main.clone(),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client whose operations run continuations on `main`.
    #[must_use]
    pub fn new(transport: Arc<T>, config: ClientConfig, main: MainQueue) -> Self {
        Self { transport, config, main }
    }

    /// Bind a new pending operation to `request`.
    ///
    /// The call itself only starts when the operation is executed; a non-2xx
    /// response becomes [`NetworkError::Server`].
    #[must_use]
    pub fn operation(&self, request: ApiRequest) -> Arc<RawOperation> {
        let transport = Arc::clone(&self.transport);
        let timeout = self.config.timeout;
        let description = request.to_string();
        tracing::debug!(call = %description, "api_client.operation.built");

        NetworkOperation::new(self.main.clone(), description, async move {
            let response = tokio::time::timeout(timeout, transport.send(request))
                .await
                .map_err(|elapsed| NetworkError::Transport {
                    reason: format!("{elapsed} after {timeout:?}"),
                })??;
            response.into_body()
        })
    }
}

// ---------------------------------------------------------------------------
// ObacoService
// ---------------------------------------------------------------------------

/// Regional services: weather, arrival alarms, vehicle search.
#[derive(Debug)]
pub struct ObacoService<T: Transport> {
    client: ApiClient<T>,
    region_id: String,
}

impl<T: Transport> ObacoService<T> {
    /// Create a service scoped to `region_id` for alarm and vehicle calls.
    #[must_use]
    pub fn new(client: ApiClient<T>, region_id: impl Into<String>) -> Self {
        Self { client, region_id: region_id.into() }
    }

    #[must_use]
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    /// Weather forecast for `region_id`.
    #[must_use]
    pub fn get_weather(&self, region_id: &str) -> Arc<RawOperation> {
        self.client.operation(ApiRequest::get(format!("/api/v1/regions/{region_id}/weather.json")))
    }

    /// Register an arrival alarm.
    #[must_use]
    pub fn post_alarm(&self, alarm: &AlarmRequest) -> Arc<RawOperation> {
        let request = ApiRequest::post(format!("/api/v1/regions/{}/alarms", self.region_id))
            .form("seconds_before", alarm.seconds_before)
            .form("stop_id", &alarm.stop_id)
            .form("trip_id", &alarm.trip_id)
            .form("service_date", alarm.service_date)
            .form("vehicle_id", &alarm.vehicle_id)
            .form("stop_sequence", alarm.stop_sequence)
            .form("user_push_id", &alarm.user_push_id);
        self.client.operation(request)
    }

    /// Delete the alarm living at `url` (as returned by the alarm registration).
    #[must_use]
    pub fn delete_alarm(&self, url: &str) -> Arc<RawOperation> {
        self.client.operation(ApiRequest::delete(url))
    }

    /// Vehicles of the region whose identifier matches `query`.
    #[must_use]
    pub fn get_vehicles(&self, query: &str) -> Arc<RawOperation> {
        let request = ApiRequest::get(format!("/api/v1/regions/{}/vehicles", self.region_id))
            .query("query", query);
        self.client.operation(request)
    }
}

// ---------------------------------------------------------------------------
// RestApiService
// ---------------------------------------------------------------------------

/// Transit REST API: stop-level real-time data.
#[derive(Debug)]
pub struct RestApiService<T: Transport> {
    client: ApiClient<T>,
}

impl<T: Transport> RestApiService<T> {
    #[must_use]
    pub fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    /// Arrivals and departures at `stop_id` within the given window around now.
    #[must_use]
    pub fn get_arrivals_and_departures_for_stop(
        &self,
        stop_id: &str,
        minutes_before: u32,
        minutes_after: u32,
    ) -> Arc<RawOperation> {
        let request =
            ApiRequest::get(format!("/api/where/arrivals-and-departures-for-stop/{stop_id}.json"))
                .query("minutesBefore", minutes_before)
                .query("minutesAfter", minutes_after);
        self.client.operation(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{ApiClient, ClientConfig, ClientError, ObacoService, RestApiService};
    use domain::{AlarmRequest, ApiRequest, ApiResponse, HttpMethod, NetworkError, Transport};
    use operation::{MainQueue, Outcome};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    // ------------------------------------------------------------------
    // Mock transport
    // ------------------------------------------------------------------

    /// Records every request and answers with a fixed response after `delay`.
    struct RecordingTransport {
        requests: Mutex<Vec<ApiRequest>>,
        response: Result<ApiResponse, NetworkError>,
        delay: Duration,
    }

    impl RecordingTransport {
        fn new(response: Result<ApiResponse, NetworkError>) -> Arc<Self> {
            Arc::new(Self { requests: Mutex::new(vec![]), response, delay: Duration::ZERO })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(vec![]),
                response: Ok(ApiResponse::ok("late")),
                delay,
            })
        }

        fn last_request(&self) -> ApiRequest {
            self.requests.lock().last().cloned().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NetworkError> {
            self.requests.lock().push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }
    }

    fn make_client(transport: &Arc<RecordingTransport>, timeout: Duration) -> ApiClient<RecordingTransport> {
        let config = ClientConfig::builder().timeout(timeout).build().unwrap();
        ApiClient::new(Arc::clone(transport), config, MainQueue::new().unwrap())
    }

    fn make_alarm() -> AlarmRequest {
        AlarmRequest {
            seconds_before: 300,
            stop_id: "1_75403".to_owned(),
            trip_id: "1_604".to_owned(),
            service_date: 1_700_000_000_000,
            vehicle_id: "1_4361".to_owned(),
            stop_sequence: 7,
            user_push_id: "push-abc".to_owned(),
        }
    }

    // ------------------------------------------------------------------
    // ClientConfig validation
    // ------------------------------------------------------------------

    #[test]
    fn config_rejects_zero_timeout() {
        let result = ClientConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(ClientError::InvalidConfig { .. })));
    }

    #[test]
    fn builder_defaults_timeout() {
        let config = ClientConfig::builder().build().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    // ------------------------------------------------------------------
    // Operation outcomes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn operation_is_returned_unstarted() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("{}")));
        let client = make_client(&transport, Duration::from_secs(1));

        let operation = client.operation(ApiRequest::get("/x"));

        assert!(!operation.is_finished());
        assert!(transport.requests.lock().is_empty(), "no call before execution");
        assert_eq!(operation.description(), "GET /x");
    }

    #[tokio::test]
    async fn success_yields_body() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("body")));
        let client = make_client(&transport, Duration::from_secs(1));

        let operation = client.operation(ApiRequest::get("/x"));
        operation.start().await;

        assert_eq!(operation.finished().await, Outcome::Success(b"body".to_vec()));
    }

    #[tokio::test]
    async fn non_success_status_is_server_failure() {
        let transport =
            RecordingTransport::new(Ok(ApiResponse { status: 503, body: b"down".to_vec() }));
        let client = make_client(&transport, Duration::from_secs(1));

        let operation = client.operation(ApiRequest::get("/x"));
        operation.start().await;

        assert_eq!(
            operation.finished().await,
            Outcome::Failure(NetworkError::Server { status: 503, reason: "down".to_owned() })
        );
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let error = NetworkError::Transport { reason: "no route".to_owned() };
        let transport = RecordingTransport::new(Err(error.clone()));
        let client = make_client(&transport, Duration::from_secs(1));

        let operation = client.operation(ApiRequest::get("/x"));
        operation.start().await;

        assert_eq!(operation.finished().await, Outcome::Failure(error));
    }

    #[tokio::test]
    async fn slow_call_times_out_as_transport_failure() {
        let transport = RecordingTransport::slow(Duration::from_secs(5));
        let client = make_client(&transport, Duration::from_millis(10));

        let operation = client.operation(ApiRequest::get("/x"));
        operation.start().await;

        let outcome = operation.finished().await;
        assert!(
            matches!(outcome, Outcome::Failure(NetworkError::Transport { .. })),
            "timeout must surface as a transport failure: {outcome:?}"
        );
    }

    // ------------------------------------------------------------------
    // Request shapes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn weather_request_targets_region() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("{}")));
        let service = ObacoService::new(make_client(&transport, Duration::from_secs(1)), "1");

        service.get_weather("12").start().await;

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.path, "/api/v1/regions/12/weather.json");
    }

    #[tokio::test]
    async fn alarm_post_carries_all_form_fields() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("{}")));
        let service = ObacoService::new(make_client(&transport, Duration::from_secs(1)), "1");

        service.post_alarm(&make_alarm()).start().await;

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/api/v1/regions/1/alarms");
        let keys: Vec<&str> = request.form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "seconds_before",
                "stop_id",
                "trip_id",
                "service_date",
                "vehicle_id",
                "stop_sequence",
                "user_push_id"
            ]
        );
        assert_eq!(request.form[0].1, "300");
    }

    #[tokio::test]
    async fn alarm_delete_uses_alarm_url() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("")));
        let service = ObacoService::new(make_client(&transport, Duration::from_secs(1)), "1");

        service.delete_alarm("https://alerts.example/alarms/42").start().await;

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(request.path, "https://alerts.example/alarms/42");
    }

    #[tokio::test]
    async fn vehicle_search_passes_query() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("[]")));
        let service = ObacoService::new(make_client(&transport, Duration::from_secs(1)), "3");

        service.get_vehicles("436").start().await;

        let request = transport.last_request();
        assert_eq!(request.path, "/api/v1/regions/3/vehicles");
        assert_eq!(request.query_value("query"), Some("436"));
    }

    #[tokio::test]
    async fn arrivals_request_carries_window() {
        let transport = RecordingTransport::new(Ok(ApiResponse::ok("{}")));
        let service = RestApiService::new(make_client(&transport, Duration::from_secs(1)));

        service.get_arrivals_and_departures_for_stop("1_75403", 5, 35).start().await;

        let request = transport.last_request();
        assert_eq!(request.path, "/api/where/arrivals-and-departures-for-stop/1_75403.json");
        assert_eq!(request.query_value("minutesBefore"), Some("5"));
        assert_eq!(request.query_value("minutesAfter"), Some("35"));
    }
}

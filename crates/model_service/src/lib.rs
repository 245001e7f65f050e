// Rust guideline compliant 2026-10-16

//! Model services -- the application-facing request surface.
//!
//! Each request method builds a network operation through the API client,
//! pairs it with a model operation, installs the transfer linkage, enqueues
//! the network operation and returns the model operation immediately.
//!
//! Entry points: [`ObacoModelService`], [`RestApiModelService`], both built on
//! a [`ModelService`] that owns nothing but the shared [`OperationQueue`].

use std::sync::Arc;

use api_client::{ObacoService, RawOperation, RestApiService};
use domain::{
    AgencyVehicle, Alarm, AlarmRequest, ArrivalDeparture, NetworkError, Stop, StopArrivals,
    Transport, WeatherForecast,
};
use operation::{ModelOperation, NetworkOperation, OperationQueue, Payload, transfer};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub type WeatherModelOperation = ModelOperation<WeatherForecast>;
pub type AlarmModelOperation = ModelOperation<Alarm>;
pub type AgencyVehicleModelOperation = ModelOperation<Vec<AgencyVehicle>>;
pub type StopArrivalsModelOperation = ModelOperation<StopArrivals>;

// ---------------------------------------------------------------------------
// ModelService
// ---------------------------------------------------------------------------

/// Pairs network operations with model operations and schedules them.
#[derive(Debug, Clone)]
pub struct ModelService {
    data_queue: OperationQueue,
}

impl ModelService {
    #[must_use]
    pub fn new(data_queue: OperationQueue) -> Self {
        Self { data_queue }
    }

    #[must_use]
    pub fn data_queue(&self) -> &OperationQueue {
        &self.data_queue
    }

    /// Link `network` to a fresh model operation, enqueue `network`, and hand
    /// back the model operation.
    ///
    /// The returned handle is the only strong reference to the model
    /// operation; `derive` runs on the main queue once `network` succeeds.
    pub fn transfer_data<R, T, F>(&self, network: Arc<NetworkOperation<R>>, derive: F) -> Arc<ModelOperation<T>>
    where
        R: Payload,
        T: Payload,
        F: FnOnce(&R) -> Result<T, NetworkError> + Send + 'static,
    {
        let model = ModelOperation::new(self.data_queue.main_queue().clone());
        transfer(&network, &model, derive);
        tracing::debug!(
            model_id = %model.id(),
            network_id = %network.id(),
            call = %network.description(),
            "model_service.request.enqueued"
        );
        self.data_queue.add_operation(network);
        model
    }

    /// Enqueue a network operation that has no model counterpart.
    pub fn enqueue<R: Payload>(&self, network: Arc<NetworkOperation<R>>) -> Arc<NetworkOperation<R>> {
        tracing::debug!(network_id = %network.id(), call = %network.description(), "model_service.enqueued");
        self.data_queue.add_operation(Arc::clone(&network));
        network
    }
}

/// Decode a JSON body, mapping any parse error to [`NetworkError::Decode`].
///
/// # Errors
///
/// Returns [`NetworkError::Decode`] when `raw` is not a valid `D`.
pub fn decode_json<D: DeserializeOwned>(raw: &[u8]) -> Result<D, NetworkError> {
    serde_json::from_slice(raw).map_err(|e| NetworkError::Decode { reason: e.to_string() })
}

// ---------------------------------------------------------------------------
// ObacoModelService
// ---------------------------------------------------------------------------

/// Weather, alarm and vehicle requests for one region.
#[derive(Debug)]
pub struct ObacoModelService<T: Transport> {
    service: ModelService,
    api: ObacoService<T>,
}

impl<T: Transport> ObacoModelService<T> {
    #[must_use]
    pub fn new(service: ModelService, api: ObacoService<T>) -> Self {
        Self { service, api }
    }

    /// Weather forecast for `region_id`.
    #[must_use]
    pub fn get_weather(&self, region_id: &str) -> Arc<WeatherModelOperation> {
        let network = self.api.get_weather(region_id);
        self.service.transfer_data(network, |raw: &Vec<u8>| decode_json(raw))
    }

    /// Register an arrival alarm. The resulting [`Alarm`] carries the URL used
    /// to delete it.
    #[must_use]
    pub fn post_alarm(&self, request: &AlarmRequest) -> Arc<AlarmModelOperation> {
        let network = self.api.post_alarm(request);
        self.service.transfer_data(network, |raw: &Vec<u8>| decode_json(raw))
    }

    /// Delete `alarm`. There is nothing to derive, so the network operation
    /// itself is returned, already enqueued.
    #[must_use]
    pub fn delete_alarm(&self, alarm: &Alarm) -> Arc<RawOperation> {
        self.service.enqueue(self.api.delete_alarm(&alarm.url))
    }

    /// Vehicles whose identifier matches `query`.
    #[must_use]
    pub fn get_vehicles(&self, query: &str) -> Arc<AgencyVehicleModelOperation> {
        let network = self.api.get_vehicles(query);
        self.service.transfer_data(network, |raw: &Vec<u8>| decode_json(raw))
    }
}

// ---------------------------------------------------------------------------
// RestApiModelService
// ---------------------------------------------------------------------------

/// Stop-level requests against the transit REST API.
#[derive(Debug)]
pub struct RestApiModelService<T: Transport> {
    service: ModelService,
    api: RestApiService<T>,
}

impl<T: Transport> RestApiModelService<T> {
    #[must_use]
    pub fn new(service: ModelService, api: RestApiService<T>) -> Self {
        Self { service, api }
    }

    /// The stop `stop_id` and its arrivals between `minutes_before` and
    /// `minutes_after` around now.
    #[must_use]
    pub fn get_arrivals_and_departures_for_stop(
        &self,
        stop_id: &str,
        minutes_before: u32,
        minutes_after: u32,
    ) -> Arc<StopArrivalsModelOperation> {
        let network = self.api.get_arrivals_and_departures_for_stop(stop_id, minutes_before, minutes_after);
        self.service.transfer_data(network, |raw: &Vec<u8>| decode_stop_arrivals(raw))
    }
}

// ---------------------------------------------------------------------------
// REST envelope
// ---------------------------------------------------------------------------

/// `{ "code": 200, "text": "OK", "data": { "entry": .., "references": .. } }`
#[derive(Deserialize)]
struct Envelope<E> {
    code: u16,
    #[serde(default)]
    text: String,
    data: Option<EnvelopeData<E>>,
}

#[derive(Deserialize)]
struct EnvelopeData<E> {
    entry: E,
    #[serde(default)]
    references: References,
}

#[derive(Deserialize, Default)]
struct References {
    #[serde(default)]
    stops: Vec<Stop>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalsEntry {
    stop_id: String,
    #[serde(default)]
    arrivals_and_departures: Vec<ArrivalDeparture>,
}

/// The envelope reports its own status; a non-200 `code` is a server failure
/// even when the HTTP status was 2xx.
fn decode_stop_arrivals(raw: &[u8]) -> Result<StopArrivals, NetworkError> {
    let envelope: Envelope<ArrivalsEntry> = decode_json(raw)?;
    if envelope.code != 200 {
        return Err(NetworkError::Server { status: envelope.code, reason: envelope.text });
    }
    let data = envelope
        .data
        .ok_or_else(|| NetworkError::Decode { reason: "envelope has no data".to_owned() })?;

    let stop_id = data.entry.stop_id;
    let stop = data
        .references
        .stops
        .into_iter()
        .find(|stop| stop.id == stop_id)
        .ok_or_else(|| NetworkError::Decode {
            reason: format!("stop {stop_id} missing from references"),
        })?;

    Ok(StopArrivals { stop, arrivals_and_departures: data.entry.arrivals_and_departures })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

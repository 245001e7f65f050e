// Rust guideline compliant 2026-10-16

//! Transit demo entry point.
//!
//! Wires the model services to a simulated transport, issues every request
//! type once, cancels one request on purpose, and logs each outcome from its
//! continuation on the main queue.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run
//!
//! # Also show queue and transport traffic
//! RUST_LOG=debug cargo run
//! ```

mod adapters;

use std::sync::Arc;
use std::time::Duration;

use adapters::demo_transport::{DEMO_STOP_ID, DemoTransport, DemoTransportConfig};
use anyhow::Context as _;
use api_client::{ApiClient, ClientConfig, ObacoService, RestApiService};
use domain::{AlarmRequest, StopArrivals};
use model_service::{ModelService, ObacoModelService, RestApiModelService};
use operation::{MainQueue, OperationQueue, Outcome, Payload, QueueConfig};

const REGION_ID: &str = "1";

type DemoObaco = ObacoModelService<DemoTransport>;
type DemoRestApi = RestApiModelService<DemoTransport>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport_config = DemoTransportConfig::builder()
        .latency(Duration::from_millis(300))
        // One call in ten drops, so the failure path shows up in most runs.
        .failure_rate(0.1)
        .build()
        .context("failed to build demo transport config")?;
    let transport = Arc::new(DemoTransport::new(transport_config));

    let main_queue = MainQueue::new().context("failed to start main queue")?;
    let queue_config = QueueConfig::builder(4)
        .build()
        .context("failed to build queue config")?;
    let data_queue = OperationQueue::new(queue_config, main_queue.clone())
        .context("failed to create operation queue")?;

    let client_config = ClientConfig::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build client config")?;
    let client = ApiClient::new(transport, client_config, main_queue.clone());

    let service = ModelService::new(data_queue.clone());
    let obaco = ObacoModelService::new(service.clone(), ObacoService::new(client.clone(), REGION_ID));
    let rest = RestApiModelService::new(service, RestApiService::new(client));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("main.shutdown: ctrl_c received, cancelling outstanding operations");
            data_queue.cancel_all_operations();
        }
        () = run_session(&obaco, &rest) => {
            tracing::info!("main.session.finished");
        }
    }

    // Let pending continuations log before the process exits.
    main_queue.flush().await;
    Ok(())
}

/// Issue every request type and wait for all of them.
async fn run_session(obaco: &DemoObaco, rest: &DemoRestApi) {
    let weather = obaco.get_weather(REGION_ID);
    weather.on_completion(|outcome| {
        report("weather", outcome, |forecast| {
            format!("{}: {}", forecast.region_name, forecast.current_forecast.summary)
        });
    });

    let vehicles = obaco.get_vehicles("436");
    vehicles.on_completion(|outcome| {
        report("vehicles", outcome, |found| format!("{} matching vehicle(s)", found.len()));
    });

    let arrivals = rest.get_arrivals_and_departures_for_stop(DEMO_STOP_ID, 5, 35);
    arrivals.on_completion(|outcome| {
        report("arrivals", outcome, |found| {
            format!("{} arrival(s) at {}", found.arrivals_and_departures.len(), found.stop.name)
        });
    });

    let abandoned = rest.get_arrivals_and_departures_for_stop("1_10020", 5, 35);
    abandoned.on_completion(|outcome| report("arrivals.abandoned", outcome, |_| String::new()));
    abandoned.cancel();

    let (_, _, stop) = tokio::join!(weather.finished(), vehicles.finished(), arrivals.finished());

    if let Some(alarm_request) = stop.success().and_then(alarm_for_first_vehicle) {
        let alarm = obaco.post_alarm(&alarm_request).finished().await;
        report("alarm", &alarm, |alarm| alarm.url.clone());

        if let Some(alarm) = alarm.success() {
            let deletion = obaco.delete_alarm(alarm).finished().await;
            report("alarm.deleted", &deletion, |_| alarm.url.clone());
        }
    }
}

/// Alarm five minutes ahead of the first arrival that has a vehicle assigned.
fn alarm_for_first_vehicle(stop: &StopArrivals) -> Option<AlarmRequest> {
    let arrival = stop.arrivals_and_departures.iter().find(|a| !a.vehicle_id.is_empty())?;
    Some(AlarmRequest {
        seconds_before: 300,
        stop_id: stop.stop.id.clone(),
        trip_id: arrival.trip_id.clone(),
        service_date: arrival.scheduled_arrival_time,
        vehicle_id: arrival.vehicle_id.clone(),
        stop_sequence: arrival.stop_sequence,
        user_push_id: "transit-demo".to_owned(),
    })
}

fn report<T: Payload>(request: &str, outcome: &Outcome<T>, describe: impl FnOnce(&T) -> String) {
    match outcome {
        Outcome::Success(payload) => {
            tracing::info!(request, result = %describe(payload), "main.request.succeeded");
        }
        Outcome::Failure(error) => {
            tracing::warn!(request, cause = %error.cause(), error = %error, "main.request.failed");
        }
        Outcome::Cancelled => tracing::info!(request, "main.request.cancelled"),
    }
}

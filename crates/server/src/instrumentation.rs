//! HTTP request instrumentation
//!
//! Records one server span and the request metrics for every request, on every instrumentation path.

use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{HeaderMap, HeaderValue, Request, Response, header::USER_AGENT},
};
use telemetry::{CLIENT_CLOSED_REQUEST, Recorders, RequestRecord};
use tower::Layer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer for HTTP request telemetry
#[derive(Clone)]
pub struct HttpTelemetryLayer {
    recorders: Recorders,
}

impl HttpTelemetryLayer {
    pub fn new(recorders: Recorders) -> Self {
        Self { recorders }
    }
}

impl<Service> Layer<Service> for HttpTelemetryLayer {
    type Service = HttpTelemetryService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        HttpTelemetryService {
            next,
            recorders: self.recorders.clone(),
        }
    }
}

#[derive(Clone)]
pub struct HttpTelemetryService<Service> {
    next: Service,
    recorders: Recorders,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for HttpTelemetryService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>>,
    Service::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str().to_owned())
            .unwrap_or_else(|| req.uri().path().to_owned());

        let request_id = request_id(req.headers());
        let mut record = RequestRecord::new(req.method().as_str(), route, request_id.clone());

        record.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        record.client_address = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip().to_string());

        let in_flight = InFlight::start(self.recorders.clone(), record);
        let future = self.next.call(req);

        Box::pin(async move {
            match future.await {
                Ok(mut response) => {
                    in_flight.finish(response.status().as_u16());

                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }

                    Ok(response)
                }
                Err(error) => {
                    in_flight.finish(500);
                    Err(error)
                }
            }
        })
    }
}

/// The caller's `x-request-id`, or a new UUID when absent or unreadable.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// A request between its start and its response. Dropped unfinished, it is recorded
/// as closed by the client so the active requests count stays balanced.
struct InFlight {
    recorders: Recorders,
    record: RequestRecord,
    start: Instant,
    finished: bool,
}

impl InFlight {
    fn start(recorders: Recorders, record: RequestRecord) -> Self {
        recorders.request_started(&record);

        Self {
            recorders,
            record,
            start: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, status_code: u16) {
        self.complete(status_code);
    }

    fn complete(&mut self, status_code: u16) {
        self.finished = true;
        self.record.status_code = status_code;
        self.record.duration = self.start.elapsed();

        log::debug!(
            method = self.record.method.as_str(),
            route = self.record.route.as_str(),
            status_code = status_code,
            duration_seconds = self.record.duration.as_secs_f64(),
            request_id = self.record.request_id.as_str();
            "Request completed"
        );

        self.recorders.record_request(&self.record);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.complete(CLIENT_CLOSED_REQUEST);
        }
    }
}

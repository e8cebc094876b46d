//! What one GenAI operation or HTTP request produced, and the plan of signals it turns into.
//!
//! Planning is pure: [`Emission::plan`] and [`RequestRecord::plan`] decide the span and every
//! metric update for a record under a given naming convention. Recorders only carry the plan out.

use std::{
    borrow::Cow,
    time::{Duration, SystemTime},
};

use opentelemetry::{Array, KeyValue, StringValue, Value, trace::SpanKind};

use crate::{
    convention::{Attribute, Measurement, NamingConvention, OperationKind, TokenType},
    cost::Cost,
    metrics::MetricValue,
};

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";
const UNKNOWN_USER: &str = "unknown";
const UNKNOWN_ERROR: &str = "UnknownError";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub address: String,
    pub port: u16,
}

/// A failed operation. The kind is the exception class reported as `error_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    kind: String,
    message: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();

        let kind = if kind.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            kind
        };

        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error(ErrorInfo),
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success => STATUS_SUCCESS,
            Outcome::Error(_) => STATUS_ERROR,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Outcome::Success => None,
            Outcome::Error(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn total(self) -> u64 {
        self.input.saturating_add(self.output)
    }
}

/// Everything known about one operation once it finished.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub system: Cow<'static, str>,
    pub request_model: String,
    pub response_model: Option<String>,
    pub response_id: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub usage: TokenUsage,
    pub finish_reasons: Vec<String>,
    pub started_at: SystemTime,
    pub duration: Duration,
    pub outcome: Outcome,
    pub cost: Cost,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub server: Option<ServerEndpoint>,
}

impl OperationRecord {
    pub fn new(kind: OperationKind, system: impl Into<Cow<'static, str>>, request_model: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            request_model: request_model.into(),
            response_model: None,
            response_id: None,
            temperature: None,
            max_tokens: None,
            usage: TokenUsage::default(),
            finish_reasons: Vec::new(),
            started_at: SystemTime::now(),
            duration: Duration::ZERO,
            outcome: Outcome::Success,
            cost: Cost::UnknownModel,
            user_id: None,
            session_id: None,
            server: None,
        }
    }

    pub fn ended_at(&self) -> SystemTime {
        self.started_at + self.duration
    }
}

/// Insertion-ordered attributes shared by the span and every metric update of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attributes: Vec<KeyValue>,
}

impl AttributeSet {
    pub fn for_operation(record: &OperationRecord, convention: &NamingConvention) -> Self {
        let mut set = Self::default();

        set.push(convention.attribute(Attribute::System), record.system.to_string());
        set.push(
            convention.attribute(Attribute::OperationName),
            record.kind.operation_name(),
        );
        set.push(
            convention.attribute(Attribute::RequestModel),
            record.request_model.clone(),
        );

        if let Some(model) = &record.response_model {
            set.push(convention.attribute(Attribute::ResponseModel), model.clone());
        }

        if let Some(server) = &record.server {
            set.push(convention.attribute(Attribute::ServerAddress), server.address.clone());
            set.push(convention.attribute(Attribute::ServerPort), i64::from(server.port));
        }

        set.push(
            convention.attribute(Attribute::UserId),
            record.user_id.clone().unwrap_or_else(|| UNKNOWN_USER.to_string()),
        );
        set.push(convention.attribute(Attribute::Status), record.outcome.status());

        if let Some(error) = record.outcome.error() {
            set.push(convention.attribute(Attribute::ErrorType), error.kind().to_string());
        }

        set
    }

    fn push(&mut self, key: &'static str, value: impl Into<Value>) {
        self.attributes.push(KeyValue::new(key, value));
    }

    fn with(&self, key: &'static str, value: impl Into<Value>) -> Vec<KeyValue> {
        let mut attributes = self.attributes.clone();
        attributes.push(KeyValue::new(key, value));
        attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    pub fn as_slice(&self) -> &[KeyValue] {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanEmission {
    pub name: Cow<'static, str>,
    pub kind: SpanKind,
    pub attributes: Vec<KeyValue>,
    /// Status message of a failed span.
    pub error: Option<String>,
    /// Recorded as an `exception` event at the end of the span.
    pub exception: Option<ErrorInfo>,
    pub start: SystemTime,
    pub end: SystemTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricUpdate {
    pub measurement: Measurement,
    pub value: MetricValue,
    pub attributes: Vec<KeyValue>,
}

impl MetricUpdate {
    fn new(measurement: Measurement, value: MetricValue, attributes: Vec<KeyValue>) -> Self {
        Self {
            measurement,
            value,
            attributes,
        }
    }
}

/// The full set of signals for one operation: one span, one or more metric updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub span: SpanEmission,
    pub metrics: Vec<MetricUpdate>,
}

impl Emission {
    pub fn plan(record: &OperationRecord, convention: &NamingConvention) -> Self {
        let attributes = AttributeSet::for_operation(record, convention);

        Self {
            span: plan_span(record, convention, &attributes),
            metrics: plan_metrics(record, convention, &attributes),
        }
    }
}

fn plan_span(record: &OperationRecord, convention: &NamingConvention, set: &AttributeSet) -> SpanEmission {
    let mut attributes = set.as_slice().to_vec();
    let mut push = |attribute: Attribute, value: Value| {
        attributes.push(KeyValue::new(convention.attribute(attribute), value));
    };

    if let Some(temperature) = record.temperature {
        push(Attribute::RequestTemperature, Value::F64(temperature));
    }

    if let Some(max_tokens) = record.max_tokens {
        push(Attribute::RequestMaxTokens, Value::I64(i64::from(max_tokens)));
    }

    if record.outcome.is_success() {
        let usage = record.usage;

        push(Attribute::InputTokens, Value::I64(saturating_i64(usage.input)));

        if record.kind == OperationKind::Chat {
            push(Attribute::OutputTokens, Value::I64(saturating_i64(usage.output)));
        }

        push(Attribute::TotalTokens, Value::I64(saturating_i64(usage.total())));

        if !record.finish_reasons.is_empty() {
            let reasons: Vec<StringValue> = record
                .finish_reasons
                .iter()
                .map(|reason| StringValue::from(reason.clone()))
                .collect();

            push(Attribute::FinishReasons, Value::Array(Array::String(reasons)));
        }

        if let Some(id) = &record.response_id {
            push(Attribute::ResponseId, Value::from(id.clone()));
        }

        if let Some(usd) = record.cost.usd() {
            push(Attribute::TokenCost, Value::F64(usd));
        }
    }

    if let Some(session_id) = &record.session_id {
        push(Attribute::SessionId, Value::from(session_id.clone()));
    }

    SpanEmission {
        name: Cow::Borrowed(convention.span_name(record.kind)),
        kind: SpanKind::Client,
        attributes,
        error: record.outcome.error().map(|error| error.message().to_string()),
        exception: record.outcome.error().cloned(),
        start: record.started_at,
        end: record.ended_at(),
    }
}

fn plan_metrics(record: &OperationRecord, convention: &NamingConvention, set: &AttributeSet) -> Vec<MetricUpdate> {
    let shared = || set.as_slice().to_vec();
    let mut updates = vec![MetricUpdate::new(
        Measurement::OperationDuration,
        MetricValue::F64(record.duration.as_secs_f64()),
        shared(),
    )];

    if !record.outcome.is_success() {
        updates.push(MetricUpdate::new(Measurement::OperationCount, MetricValue::U64(1), shared()));
        return updates;
    }

    let usage = record.usage;
    let token_type = convention.attribute(Attribute::TokenType);

    updates.push(MetricUpdate::new(
        Measurement::TokenUsage,
        MetricValue::U64(usage.input),
        set.with(token_type, convention.token_type(TokenType::Input)),
    ));

    if record.kind == OperationKind::Chat {
        updates.push(MetricUpdate::new(
            Measurement::TokenUsage,
            MetricValue::U64(usage.output),
            set.with(token_type, convention.token_type(TokenType::Output)),
        ));
    }

    updates.push(MetricUpdate::new(
        Measurement::InputTokens,
        MetricValue::U64(usage.input),
        shared(),
    ));

    if record.kind == OperationKind::Chat {
        updates.push(MetricUpdate::new(
            Measurement::OutputTokens,
            MetricValue::U64(usage.output),
            shared(),
        ));
    }

    updates.push(MetricUpdate::new(Measurement::OperationCount, MetricValue::U64(1), shared()));
    updates.push(MetricUpdate::new(Measurement::TotalRequests, MetricValue::U64(1), shared()));

    if let Some(usd) = record.cost.usd() {
        updates.push(MetricUpdate::new(Measurement::OperationCost, MetricValue::F64(usd), shared()));
        updates.push(MetricUpdate::new(
            Measurement::CostDistribution,
            MetricValue::F64(usd),
            shared(),
        ));
    }

    if record.kind == OperationKind::Chat && usage.output > 0 {
        let per_token = record.duration.as_secs_f64() / usage.output as f64;

        updates.push(MetricUpdate::new(
            Measurement::TimePerOutputToken,
            MetricValue::F64(per_token),
            shared(),
        ));
    }

    updates
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Result of evaluating one chat completion.
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub system: Cow<'static, str>,
    pub request_model: String,
    pub name: String,
    pub criteria: Vec<String>,
    pub score: f64,
    pub passed: bool,
    pub duration: Duration,
    pub user_id: Option<String>,
}

impl EvaluationRecord {
    pub fn plan(&self, convention: &NamingConvention) -> Vec<MetricUpdate> {
        let mut set = AttributeSet::default();

        set.push(convention.attribute(Attribute::System), self.system.to_string());
        set.push(
            convention.attribute(Attribute::OperationName),
            OperationKind::Chat.operation_name(),
        );
        set.push(convention.attribute(Attribute::RequestModel), self.request_model.clone());
        set.push(convention.attribute(Attribute::EvalName), self.name.clone());
        set.push(convention.attribute(Attribute::EvalCriteria), self.criteria.join(","));
        set.push(
            convention.attribute(Attribute::UserId),
            self.user_id.clone().unwrap_or_else(|| UNKNOWN_USER.to_string()),
        );

        let verdict = if self.passed {
            Measurement::EvalPassed
        } else {
            Measurement::EvalFailed
        };

        vec![
            MetricUpdate::new(
                Measurement::EvalScore,
                MetricValue::F64(self.score),
                set.as_slice().to_vec(),
            ),
            MetricUpdate::new(
                Measurement::EvalDuration,
                MetricValue::F64(self.duration.as_secs_f64()),
                set.as_slice().to_vec(),
            ),
            MetricUpdate::new(verdict, MetricValue::U64(1), set.as_slice().to_vec()),
        ]
    }
}

/// Status recorded when the client went away before a response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// One HTTP request served by the proxy.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    /// Matched route template, or the raw path when no route matched.
    pub route: String,
    pub request_id: String,
    pub user_agent: Option<String>,
    pub client_address: Option<String>,
    pub status_code: u16,
    pub started_at: SystemTime,
    pub duration: Duration,
}

impl RequestRecord {
    pub fn new(method: impl Into<String>, route: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            request_id: request_id.into(),
            user_agent: None,
            client_address: None,
            status_code: 0,
            started_at: SystemTime::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn ended_at(&self) -> SystemTime {
        self.started_at + self.duration
    }

    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    fn route_attributes(&self, convention: &NamingConvention) -> AttributeSet {
        let mut set = AttributeSet::default();

        set.push(convention.attribute(Attribute::HttpMethod), self.method.clone());
        set.push(convention.attribute(Attribute::HttpRoute), self.route.clone());

        set
    }

    /// The active requests increment, recorded before the request is handled.
    pub fn plan_start(&self, convention: &NamingConvention) -> MetricUpdate {
        MetricUpdate::new(
            Measurement::HttpActiveRequests,
            MetricValue::I64(1),
            self.route_attributes(convention).as_slice().to_vec(),
        )
    }

    /// Span and metrics of a finished request, including the matching active requests decrement.
    pub fn plan(&self, convention: &NamingConvention) -> Emission {
        let route = self.route_attributes(convention);
        let mut set = route.clone();

        set.push(
            convention.attribute(Attribute::HttpStatusCode),
            i64::from(self.status_code),
        );

        let mut span_attributes = set.as_slice().to_vec();
        span_attributes.push(KeyValue::new(
            convention.attribute(Attribute::RequestId),
            self.request_id.clone(),
        ));

        if let Some(user_agent) = &self.user_agent {
            span_attributes.push(KeyValue::new(
                convention.attribute(Attribute::UserAgent),
                user_agent.clone(),
            ));
        }

        if let Some(address) = &self.client_address {
            span_attributes.push(KeyValue::new(
                convention.attribute(Attribute::ClientAddress),
                address.clone(),
            ));
        }

        let span = SpanEmission {
            name: Cow::Owned(format!("{} {}", self.method, self.route)),
            kind: SpanKind::Server,
            attributes: span_attributes,
            error: self.is_error().then(|| format!("HTTP {}", self.status_code)),
            exception: None,
            start: self.started_at,
            end: self.ended_at(),
        };

        let metrics = vec![
            MetricUpdate::new(
                Measurement::HttpRequestDuration,
                MetricValue::F64(self.duration.as_secs_f64()),
                set.as_slice().to_vec(),
            ),
            MetricUpdate::new(
                Measurement::HttpRequestCount,
                MetricValue::U64(1),
                set.as_slice().to_vec(),
            ),
            MetricUpdate::new(
                Measurement::HttpActiveRequests,
                MetricValue::I64(-1),
                route.as_slice().to_vec(),
            ),
        ];

        Emission { span, metrics }
    }
}

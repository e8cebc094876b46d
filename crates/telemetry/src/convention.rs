//! Logical telemetry names and the tables mapping them onto wire names.
//!
//! Call sites only ever speak in [`Attribute`], [`Measurement`] and [`OperationKind`].
//! Which keys, metric names and span names reach the backend is decided by the
//! [`NamingConvention`] of the recording path, so a naming migration is an edit
//! to one of the tables below.

use crate::{attributes::*, metrics::names::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Chat,
    Embeddings,
}

impl OperationKind {
    /// Value of the operation name attribute.
    pub fn operation_name(self) -> &'static str {
        match self {
            OperationKind::Chat => "chat",
            OperationKind::Embeddings => "embeddings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    System,
    OperationName,
    RequestModel,
    RequestTemperature,
    RequestMaxTokens,
    ResponseModel,
    ResponseId,
    FinishReasons,
    InputTokens,
    OutputTokens,
    TotalTokens,
    TokenCost,
    TokenType,
    ServerAddress,
    ServerPort,
    UserId,
    SessionId,
    Status,
    ErrorType,
    EvalName,
    EvalCriteria,
    HttpMethod,
    HttpRoute,
    HttpStatusCode,
    UserAgent,
    ClientAddress,
    RequestId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    OperationDuration,
    TokenUsage,
    OperationCount,
    OperationCost,
    TotalRequests,
    InputTokens,
    OutputTokens,
    CostDistribution,
    TimePerOutputToken,
    TimeToFirstToken,
    EvalScore,
    EvalPassed,
    EvalFailed,
    EvalDuration,
    HttpRequestDuration,
    HttpRequestCount,
    HttpActiveRequests,
}

impl Measurement {
    pub const ALL: [Measurement; 17] = [
        Measurement::OperationDuration,
        Measurement::TokenUsage,
        Measurement::OperationCount,
        Measurement::OperationCost,
        Measurement::TotalRequests,
        Measurement::InputTokens,
        Measurement::OutputTokens,
        Measurement::CostDistribution,
        Measurement::TimePerOutputToken,
        Measurement::TimeToFirstToken,
        Measurement::EvalScore,
        Measurement::EvalPassed,
        Measurement::EvalFailed,
        Measurement::EvalDuration,
        Measurement::HttpRequestDuration,
        Measurement::HttpRequestCount,
        Measurement::HttpActiveRequests,
    ];
}

/// Discriminator of the token usage histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Input,
    Output,
}

/// One complete mapping from logical names to wire names.
#[derive(Debug)]
pub struct NamingConvention {
    name: &'static str,
    attribute: fn(Attribute) -> &'static str,
    metric: fn(Measurement) -> &'static str,
    span: fn(OperationKind) -> &'static str,
    token_type: fn(TokenType) -> &'static str,
}

impl NamingConvention {
    /// OpenTelemetry GenAI semantic conventions.
    pub const GEN_AI: NamingConvention = NamingConvention {
        name: "gen_ai",
        attribute: gen_ai_attribute,
        metric: gen_ai_metric,
        span: gen_ai_span,
        token_type: gen_ai_token_type,
    };

    /// The `llm.*` names used before the GenAI conventions existed.
    pub const LEGACY: NamingConvention = NamingConvention {
        name: "legacy",
        attribute: legacy_attribute,
        metric: legacy_metric,
        span: legacy_span,
        token_type: legacy_token_type,
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn attribute(&self, attribute: Attribute) -> &'static str {
        (self.attribute)(attribute)
    }

    pub fn metric(&self, measurement: Measurement) -> &'static str {
        (self.metric)(measurement)
    }

    pub fn span_name(&self, kind: OperationKind) -> &'static str {
        (self.span)(kind)
    }

    pub fn token_type(&self, token_type: TokenType) -> &'static str {
        (self.token_type)(token_type)
    }
}

fn gen_ai_attribute(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::System => GEN_AI_SYSTEM,
        Attribute::OperationName => GEN_AI_OPERATION_NAME,
        Attribute::RequestModel => GEN_AI_REQUEST_MODEL,
        Attribute::RequestTemperature => GEN_AI_REQUEST_TEMPERATURE,
        Attribute::RequestMaxTokens => GEN_AI_REQUEST_MAX_TOKENS,
        Attribute::ResponseModel => GEN_AI_RESPONSE_MODEL,
        Attribute::ResponseId => GEN_AI_RESPONSE_ID,
        Attribute::FinishReasons => GEN_AI_RESPONSE_FINISH_REASONS,
        Attribute::InputTokens => GEN_AI_USAGE_INPUT_TOKENS,
        Attribute::OutputTokens => GEN_AI_USAGE_OUTPUT_TOKENS,
        Attribute::TotalTokens => GEN_AI_USAGE_TOTAL_TOKENS,
        Attribute::TokenCost => GEN_AI_TOKEN_COST,
        Attribute::TokenType => GEN_AI_TOKEN_TYPE,
        Attribute::ServerAddress => SERVER_ADDRESS,
        Attribute::ServerPort => SERVER_PORT,
        Attribute::UserId => USER_ID,
        Attribute::SessionId => SESSION_ID,
        Attribute::Status => STATUS,
        Attribute::ErrorType => ERROR_TYPE,
        Attribute::EvalName => EVAL_NAME,
        Attribute::EvalCriteria => EVAL_CRITERIA,
        Attribute::HttpMethod => HTTP_REQUEST_METHOD,
        Attribute::HttpRoute => HTTP_ROUTE,
        Attribute::HttpStatusCode => HTTP_RESPONSE_STATUS_CODE,
        Attribute::UserAgent => USER_AGENT_ORIGINAL,
        Attribute::ClientAddress => CLIENT_ADDRESS,
        Attribute::RequestId => REQUEST_ID,
    }
}

fn gen_ai_metric(measurement: Measurement) -> &'static str {
    match measurement {
        Measurement::OperationDuration => GEN_AI_CLIENT_OPERATION_DURATION,
        Measurement::TokenUsage => GEN_AI_CLIENT_TOKEN_USAGE,
        Measurement::OperationCount => GEN_AI_CLIENT_OPERATION_COUNT,
        Measurement::OperationCost => GEN_AI_CLIENT_OPERATION_COST,
        Measurement::TotalRequests => GEN_AI_TOTAL_REQUESTS,
        Measurement::InputTokens => GEN_AI_USAGE_INPUT_TOKENS_TOTAL,
        Measurement::OutputTokens => GEN_AI_USAGE_OUTPUT_TOKENS_TOTAL,
        Measurement::CostDistribution => GEN_AI_USAGE_COST,
        Measurement::TimePerOutputToken => GEN_AI_SERVER_TIME_PER_OUTPUT_TOKEN,
        Measurement::TimeToFirstToken => GEN_AI_SERVER_TIME_TO_FIRST_TOKEN,
        Measurement::EvalScore => GEN_AI_EVAL_SCORE,
        Measurement::EvalPassed => GEN_AI_EVAL_PASSED,
        Measurement::EvalFailed => GEN_AI_EVAL_FAILED,
        Measurement::EvalDuration => GEN_AI_EVAL_DURATION,
        Measurement::HttpRequestDuration => HTTP_SERVER_REQUEST_DURATION,
        Measurement::HttpRequestCount => HTTP_SERVER_REQUEST_COUNT,
        Measurement::HttpActiveRequests => HTTP_SERVER_ACTIVE_REQUESTS,
    }
}

fn gen_ai_span(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Chat => "gen_ai.chat.completions",
        OperationKind::Embeddings => "gen_ai.embeddings",
    }
}

fn gen_ai_token_type(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Input => "input",
        TokenType::Output => "output",
    }
}

fn legacy_attribute(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::System => "llm.vendor",
        Attribute::OperationName => "llm.request.type",
        Attribute::RequestModel => "llm.request.model",
        Attribute::RequestTemperature => "llm.request.temperature",
        Attribute::RequestMaxTokens => "llm.request.max_tokens",
        Attribute::ResponseModel => "llm.response.model",
        Attribute::ResponseId => "llm.response.id",
        Attribute::FinishReasons => "llm.response.finish_reason",
        Attribute::InputTokens => "llm.usage.prompt_tokens",
        Attribute::OutputTokens => "llm.usage.completion_tokens",
        Attribute::TotalTokens => "llm.usage.total_tokens",
        Attribute::TokenCost => "llm.usage.cost",
        Attribute::TokenType => "llm.token.type",
        Attribute::ServerAddress => SERVER_ADDRESS,
        Attribute::ServerPort => SERVER_PORT,
        Attribute::UserId => USER_ID,
        Attribute::SessionId => SESSION_ID,
        Attribute::Status => STATUS,
        Attribute::ErrorType => ERROR_TYPE,
        Attribute::EvalName => EVAL_NAME,
        Attribute::EvalCriteria => EVAL_CRITERIA,
        Attribute::HttpMethod => "http.method",
        Attribute::HttpRoute => HTTP_ROUTE,
        Attribute::HttpStatusCode => "http.status_code",
        Attribute::UserAgent => "http.user_agent",
        Attribute::ClientAddress => "request.client_ip",
        Attribute::RequestId => REQUEST_ID,
    }
}

fn legacy_metric(measurement: Measurement) -> &'static str {
    match measurement {
        Measurement::OperationDuration => "llm.client.operation.duration",
        Measurement::TokenUsage => "llm.client.token.usage",
        Measurement::OperationCount => "llm.client.operation.count",
        Measurement::OperationCost => "llm.client.operation.cost",
        Measurement::TotalRequests => "llm.total_requests",
        Measurement::InputTokens => "llm.usage.prompt_tokens",
        Measurement::OutputTokens => "llm.usage.completion_tokens",
        Measurement::CostDistribution => "llm.usage.cost",
        Measurement::TimePerOutputToken => "llm.server.time_per_output_token",
        Measurement::TimeToFirstToken => "llm.server.time_to_first_token",
        Measurement::EvalScore => "llm.eval.score",
        Measurement::EvalPassed => "llm.eval.passed",
        Measurement::EvalFailed => "llm.eval.failed",
        Measurement::EvalDuration => "llm.eval.duration",
        Measurement::HttpRequestDuration => "http.request.duration",
        Measurement::HttpRequestCount => "http.requests",
        Measurement::HttpActiveRequests => "http.requests.active",
    }
}

fn legacy_span(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Chat => "openai.chat",
        OperationKind::Embeddings => "openai.embeddings",
    }
}

fn legacy_token_type(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Input => "prompt",
        TokenType::Output => "completion",
    }
}

//! GenAI telemetry attributes following OpenTelemetry semantic conventions.
//! Each constant maps to an attribute key emitted under the standardized naming.
//! https://opentelemetry.io/docs/specs/semconv/registry/attributes/gen-ai/

/// Name of the GenAI operation being performed.
/// Known values: `chat`, `embeddings`, `text_completion`.
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The GenAI product as identified by the client instrumentation, e.g. `openai`.
pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

/// Maximum number of tokens the model should generate for the request.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// Name of the model that the request targets.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// Temperature sampling setting applied to the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// Array of reasons describing why the model stopped generating tokens; aligns with the returned choices.
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Unique identifier assigned to the completion by the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

/// Name of the model that produced the response; may differ from the requested model.
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// Type of token being counted.
/// Known values: `input`, `output`.
pub const GEN_AI_TOKEN_TYPE: &str = "gen_ai.token.type";

/// Number of tokens used in the GenAI input (prompt).
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// Number of tokens produced in the GenAI response (completion).
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// Sum of input and output tokens.
pub const GEN_AI_USAGE_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";

/// Estimated cost of the operation in USD.
pub const GEN_AI_TOKEN_COST: &str = "gen_ai.token.cost";

pub const SERVER_ADDRESS: &str = opentelemetry_semantic_conventions::attribute::SERVER_ADDRESS;
pub const SERVER_PORT: &str = opentelemetry_semantic_conventions::attribute::SERVER_PORT;

pub const USER_ID: &str = "user_id";
pub const SESSION_ID: &str = "session_id";

/// `success` or `error`.
pub const STATUS: &str = "status";

/// Exception class of a failed operation. Present only when `status` is `error`.
pub const ERROR_TYPE: &str = "error_type";

pub const EVAL_NAME: &str = "eval.name";
pub const EVAL_CRITERIA: &str = "eval.criteria";

/// Resource attribute naming the instrumentation library.
pub const TELEMETRY_SDK_NAME: &str = opentelemetry_semantic_conventions::resource::TELEMETRY_SDK_NAME;

pub const DEPLOYMENT_ENVIRONMENT_NAME: &str = "deployment.environment.name";

/// Exception attributes of the `exception` span event recorded for failed operations.
pub const EXCEPTION_TYPE: &str = opentelemetry_semantic_conventions::attribute::EXCEPTION_TYPE;
pub const EXCEPTION_MESSAGE: &str = opentelemetry_semantic_conventions::attribute::EXCEPTION_MESSAGE;

pub const HTTP_REQUEST_METHOD: &str = opentelemetry_semantic_conventions::attribute::HTTP_REQUEST_METHOD;

/// Matched route template, e.g. `/v1/chat/completions`.
pub const HTTP_ROUTE: &str = opentelemetry_semantic_conventions::attribute::HTTP_ROUTE;
pub const HTTP_RESPONSE_STATUS_CODE: &str = opentelemetry_semantic_conventions::attribute::HTTP_RESPONSE_STATUS_CODE;
pub const USER_AGENT_ORIGINAL: &str = opentelemetry_semantic_conventions::attribute::USER_AGENT_ORIGINAL;
pub const CLIENT_ADDRESS: &str = opentelemetry_semantic_conventions::attribute::CLIENT_ADDRESS;

/// Taken from the `x-request-id` header, generated when absent.
pub const REQUEST_ID: &str = "request.id";

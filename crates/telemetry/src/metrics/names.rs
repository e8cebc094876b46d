//! Metric names of the OpenTelemetry GenAI semantic conventions, plus the usage
//! and evaluation metrics emitted alongside them.

pub const GEN_AI_CLIENT_OPERATION_DURATION: &str = "gen_ai.client.operation.duration";
pub const GEN_AI_CLIENT_TOKEN_USAGE: &str = "gen_ai.client.token.usage";
pub const GEN_AI_CLIENT_OPERATION_COUNT: &str = "gen_ai.client.operation.count";
pub const GEN_AI_CLIENT_OPERATION_COST: &str = "gen_ai.client.operation.cost";
pub const GEN_AI_TOTAL_REQUESTS: &str = "gen_ai.total_requests";
pub const GEN_AI_USAGE_INPUT_TOKENS_TOTAL: &str = "gen_ai.usage.input_tokens";
pub const GEN_AI_USAGE_OUTPUT_TOKENS_TOTAL: &str = "gen_ai.usage.output_tokens";
pub const GEN_AI_USAGE_COST: &str = "gen_ai.usage.cost";
pub const GEN_AI_SERVER_TIME_PER_OUTPUT_TOKEN: &str = "gen_ai.server.time_per_output_token";
pub const GEN_AI_SERVER_TIME_TO_FIRST_TOKEN: &str = "gen_ai.server.time_to_first_token";

pub const GEN_AI_EVAL_SCORE: &str = "gen_ai.eval.score";
pub const GEN_AI_EVAL_PASSED: &str = "gen_ai.eval.passed";
pub const GEN_AI_EVAL_FAILED: &str = "gen_ai.eval.failed";
pub const GEN_AI_EVAL_DURATION: &str = "gen_ai.eval.duration";

pub const HTTP_SERVER_REQUEST_DURATION: &str = opentelemetry_semantic_conventions::metric::HTTP_SERVER_REQUEST_DURATION;
pub const HTTP_SERVER_REQUEST_COUNT: &str = "http.server.request.count";
pub const HTTP_SERVER_ACTIVE_REQUESTS: &str = "http.server.active_requests";

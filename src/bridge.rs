//! Purpose: Transport-agnostic command dispatch for the Path of Building sidecar.
//! Exports: `Dispatcher`, `BridgeRequest`, `BridgeResponse`, `Reply`, `ReadyBanner`.
//! Role: Routes `encode`/`decode`/`stats`/`ping` and owns the wire envelopes.
//! Invariants: Every input line produces exactly one response; nothing is cached across calls.
//! Invariants: Handler failures (including panics) become `{"success": false, "error"}`.
//! Invariants: Result-to-envelope conversion happens only in `BridgeResponse::from_result`.
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::build::Build;
use crate::core::codec::{self, DecodedBuild};
use crate::core::error::{Error, ErrorKind};
use crate::stats::{BuildStats, StatsProvider};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BridgeRequest {
    #[serde(default)]
    pub command: String,
    #[serde(default = "empty_object")]
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Encoded(String),
    Decoded(DecodedBuild),
    Stats(BuildStats),
    Pong { pob_available: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedPayload {
    pub raw_xml: String,
    pub parsed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Code { code: String },
    Data { data: DecodedPayload },
    Stats { stats: BuildStats },
    Availability { pob_available: bool },
    Error { error: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl BridgeResponse {
    pub fn from_result(result: Result<Reply, Error>) -> Self {
        match result {
            Ok(reply) => Self {
                success: true,
                body: match reply {
                    Reply::Encoded(code) => ResponseBody::Code { code },
                    Reply::Decoded(decoded) => ResponseBody::Data {
                        data: DecodedPayload {
                            raw_xml: decoded.raw_xml().to_string(),
                            parsed: decoded.is_parsed(),
                        },
                    },
                    Reply::Stats(stats) => ResponseBody::Stats { stats },
                    Reply::Pong { pob_available } => ResponseBody::Availability { pob_available },
                },
            },
            Err(err) => Self::failure(err.to_string()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            body: ResponseBody::Error {
                error: error.into(),
            },
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Error { error } => Some(error.as_str()),
            _ => None,
        }
    }
}

/// First line written before any request is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReadyBanner {
    pub ready: bool,
    pub pob_available: bool,
}

pub struct Dispatcher<S> {
    stats: S,
    pob_available: bool,
}

impl<S: StatsProvider> Dispatcher<S> {
    /// Checks stats availability once; the answer is fixed for the dispatcher's lifetime.
    pub fn new(stats: S) -> Self {
        let pob_available = stats.is_available();
        Self {
            stats,
            pob_available,
        }
    }

    pub fn pob_available(&self) -> bool {
        self.pob_available
    }

    pub fn ready_banner(&self) -> ReadyBanner {
        ReadyBanner {
            ready: true,
            pob_available: self.pob_available,
        }
    }

    pub fn dispatch_line(&self, line: &str) -> BridgeResponse {
        let value = match serde_json::from_str::<Value>(line) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "rejecting malformed request line");
                return BridgeResponse::failure(format!("Invalid JSON: {err}"));
            }
        };
        match serde_json::from_value::<BridgeRequest>(value) {
            Ok(request) => self.dispatch(request),
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request with invalid shape");
                BridgeResponse::failure(format!("Invalid request: {err}"))
            }
        }
    }

    pub fn dispatch(&self, request: BridgeRequest) -> BridgeResponse {
        let BridgeRequest { command, data } = request;
        tracing::debug!(command = %command, "dispatching request");

        let result = catch_unwind(AssertUnwindSafe(|| self.route(&command, data)))
            .unwrap_or_else(|_| {
                Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("internal error while handling {command}")))
            });
        if let Err(err) = &result {
            tracing::warn!(command = %command, error = %err, "command failed");
        }
        BridgeResponse::from_result(result)
    }

    fn route(&self, command: &str, data: Value) -> Result<Reply, Error> {
        match command {
            "encode" => {
                let build = Build::from_value(data)?;
                codec::encode(&build).map(Reply::Encoded)
            }
            "decode" => {
                let code = data.get("code").and_then(Value::as_str).ok_or_else(|| {
                    Error::new(ErrorKind::Usage).with_message("decode requires a string `code` field")
                })?;
                codec::decode(code).map(Reply::Decoded)
            }
            "stats" => {
                let build = Build::from_value(data)?;
                self.stats.calculate(&build).map(Reply::Stats)
            }
            "ping" => Ok(Reply::Pong {
                pob_available: self.pob_available,
            }),
            _ => Err(Error::new(ErrorKind::Usage).with_message(format!("Unknown command: {command}"))),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xml::build_xml;
    use crate::stats::PlaceholderStats;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Default)]
    struct StubStats {
        available: bool,
        calls: Cell<usize>,
        availability_checks: Cell<usize>,
        panic_on_calculate: bool,
    }

    impl StatsProvider for StubStats {
        fn is_available(&self) -> bool {
            self.availability_checks.set(self.availability_checks.get() + 1);
            self.available
        }

        fn calculate(&self, build: &Build) -> Result<BuildStats, Error> {
            self.calls.set(self.calls.get() + 1);
            if self.panic_on_calculate {
                panic!("backend exploded");
            }
            Ok(BuildStats {
                life: f64::from(build.character.level) * 100.0,
                ..BuildStats::default()
            })
        }
    }

    fn to_json(response: &BridgeResponse) -> Value {
        serde_json::to_value(response).expect("response json")
    }

    fn placeholder() -> Dispatcher<PlaceholderStats> {
        Dispatcher::new(PlaceholderStats)
    }

    #[test]
    fn encode_then_decode_returns_serializer_output() {
        let dispatcher = placeholder();
        let data = json!({
            "character": {"level": 90, "class": "Ranger", "ascendancy": "Deadeye"},
            "items": [{"frameType": 3, "name": "Headhunter", "typeLine": "Leather Belt"}],
            "skills": [{"name": "Tornado Shot", "level": 21, "quality": 20}],
            "passives": [1, 2, 3]
        });
        let expected_xml = build_xml(&Build::from_value(data.clone()).expect("build"));

        let encoded = to_json(&dispatcher.dispatch(BridgeRequest {
            command: "encode".to_string(),
            data,
        }));
        assert_eq!(encoded["success"], json!(true));
        let code = encoded["code"].as_str().expect("code").to_string();

        let decoded = to_json(&dispatcher.dispatch(BridgeRequest {
            command: "decode".to_string(),
            data: json!({ "code": code }),
        }));
        assert_eq!(
            decoded,
            json!({"success": true, "data": {"raw_xml": expected_xml, "parsed": false}})
        );
    }

    #[test]
    fn decode_failure_reports_underlying_error() {
        let response = placeholder().dispatch_line(r#"{"command":"decode","data":{"code":"aGVsbG8gd29ybGQ="}}"#);
        assert!(!response.success);
        assert!(!response.error().expect("error").is_empty());
    }

    #[test]
    fn decode_without_string_code_names_the_field() {
        let dispatcher = placeholder();
        for line in [
            r#"{"command":"decode","data":{}}"#,
            r#"{"command":"decode"}"#,
            r#"{"command":"decode","data":{"code":5}}"#,
            r#"{"command":"decode","data":{"code":null}}"#,
        ] {
            let response = dispatcher.dispatch_line(line);
            assert_eq!(
                to_json(&response),
                json!({"success": false, "error": "decode requires a string `code` field"}),
                "{line}"
            );
        }
    }

    #[test]
    fn decode_of_empty_code_is_a_decode_failure() {
        let response = placeholder().dispatch_line(r#"{"command":"decode","data":{"code":""}}"#);
        assert!(!response.success);
        assert_ne!(response.error(), Some("decode requires a string `code` field"));
    }

    #[test]
    fn unknown_command_is_a_plain_failure() {
        let response = placeholder().dispatch_line(r#"{"command":"frobnicate","data":{}}"#);
        assert_eq!(
            to_json(&response),
            json!({"success": false, "error": "Unknown command: frobnicate"})
        );
    }

    #[test]
    fn missing_command_and_data_default() {
        let response = placeholder().dispatch_line("{}");
        assert_eq!(response.error(), Some("Unknown command: "));
    }

    #[test]
    fn malformed_json_is_reported_with_parser_message() {
        let response = placeholder().dispatch_line("{not json");
        assert!(!response.success);
        assert!(response.error().expect("error").starts_with("Invalid JSON: "));
    }

    #[test]
    fn non_object_request_is_rejected() {
        let response = placeholder().dispatch_line("[1, 2, 3]");
        assert!(response.error().expect("error").starts_with("Invalid request: "));
    }

    #[test]
    fn ping_reflects_startup_availability_only() {
        let stats = StubStats {
            available: true,
            ..StubStats::default()
        };
        let dispatcher = Dispatcher::new(stats);
        for _ in 0..3 {
            let response = dispatcher.dispatch_line(r#"{"command":"ping"}"#);
            assert_eq!(to_json(&response), json!({"success": true, "pob_available": true}));
        }
        assert_eq!(dispatcher.stats.availability_checks.get(), 1);

        let offline = placeholder().dispatch_line(r#"{"command":"ping","data":{}}"#);
        assert_eq!(to_json(&offline), json!({"success": true, "pob_available": false}));
    }

    #[test]
    fn stats_with_placeholder_returns_zeroed_shape() {
        let response = placeholder().dispatch_line(r#"{"command":"stats","data":{}}"#);
        let value = to_json(&response);
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["stats"], serde_json::to_value(BuildStats::default()).expect("json"));
    }

    #[test]
    fn stats_delegates_to_provider() {
        let dispatcher = Dispatcher::new(StubStats::default());
        let response = dispatcher.dispatch_line(
            r#"{"command":"stats","data":{"character":{"level":42}}}"#,
        );
        assert_eq!(to_json(&response)["stats"]["life"], json!(4200.0));
        assert_eq!(dispatcher.stats.calls.get(), 1);
    }

    #[test]
    fn handler_panic_becomes_failure_response() {
        let dispatcher = Dispatcher::new(StubStats {
            panic_on_calculate: true,
            ..StubStats::default()
        });
        let response = dispatcher.dispatch_line(r#"{"command":"stats","data":{}}"#);
        assert_eq!(response.error(), Some("internal error while handling stats"));

        let next = dispatcher.dispatch_line(r#"{"command":"ping"}"#);
        assert!(next.success);
    }

    #[test]
    fn invalid_build_payload_fails_encode() {
        let response = placeholder().dispatch_line(r#"{"command":"encode","data":{"items":7}}"#);
        assert!(response.error().expect("error").starts_with("invalid build payload: "));
    }

    #[test]
    fn success_envelope_serializes_success_first() {
        let response = BridgeResponse::from_result(Ok(Reply::Encoded("eNq".to_string())));
        assert_eq!(
            serde_json::to_string(&response).expect("json"),
            r#"{"success":true,"code":"eNq"}"#
        );
    }
}

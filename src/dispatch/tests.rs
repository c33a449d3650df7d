use super::*;
use crate::middleware::{
    from_fn, CommandError, ExecutionContext, FieldSpec, FieldType, LoggingMiddleware, ParamSchema,
    Params, Pipeline, RetryMiddleware, ValidationMiddleware, RETRY_ATTEMPTS_KEY,
};
use crate::observability::InvocationLog;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A typed command with its own validation rule.
struct Deploy {
    service: String,
    replicas: i64,
}

impl Command for Deploy {
    fn key(&self) -> &str {
        "deploy"
    }

    fn validate(&self) -> Result<bool, CommandError> {
        if self.service.is_empty() {
            return Err(CommandError::invalid("service name is empty"));
        }
        Ok(self.replicas > 0)
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("service".to_string(), json!(self.service));
        params.insert("replicas".to_string(), json!(self.replicas));
        params
    }
}

fn deploy(service: &str, replicas: i64) -> Deploy {
    Deploy {
        service: service.to_string(),
        replicas,
    }
}

fn echo_dispatcher() -> CommandDispatcher {
    let mut dispatcher = CommandDispatcher::new();
    dispatcher
        .register("deploy", |command: &dyn Command, ctx: &mut ExecutionContext| {
            Ok(json!({ "key": command.key(), "params": ctx.params.clone() }))
        })
        .unwrap();
    dispatcher
}

#[test]
fn test_dispatch_routes_to_handler() {
    let result = echo_dispatcher().dispatch(&deploy("api", 2)).unwrap();
    assert_eq!(
        result,
        json!({ "key": "deploy", "params": { "service": "api", "replicas": 2 } })
    );
}

#[test]
fn test_duplicate_registration_fails() {
    let mut dispatcher = echo_dispatcher();
    let err = dispatcher
        .register("deploy", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| Ok(json!(null)))
        .unwrap_err();
    assert_eq!(err, CommandError::duplicate("deploy"));
    assert_eq!(dispatcher.len(), 1);
}

#[test]
fn test_command_validation_error_is_propagated_verbatim() {
    let err = echo_dispatcher().dispatch(&deploy("", 2)).unwrap_err();
    assert_eq!(err, CommandError::invalid("service name is empty"));
}

#[test]
fn test_command_validation_false_is_validation_failure() {
    let err = echo_dispatcher().dispatch(&deploy("api", 0)).unwrap_err();
    assert!(matches!(err, CommandError::ValidationFailed { .. }));
}

#[test]
fn test_validation_runs_before_lookup() {
    let dispatcher = CommandDispatcher::new();
    let err = dispatcher.dispatch(&deploy("", 1)).unwrap_err();
    assert!(matches!(err, CommandError::ValidationFailed { .. }));
}

#[test]
fn test_unknown_key_is_handler_not_found() {
    let err = echo_dispatcher()
        .dispatch(&RawCommand::new("rollback", Params::new()))
        .unwrap_err();
    assert_eq!(err, CommandError::not_found("rollback"));
}

#[test]
fn test_dispatch_value() {
    let dispatcher = echo_dispatcher();
    let ok = dispatcher
        .dispatch_value(&json!({ "command": "deploy", "params": { "service": "web" } }))
        .unwrap();
    assert_eq!(ok["params"]["service"], json!("web"));

    let err = dispatcher.dispatch_value(&json!(["deploy"])).unwrap_err();
    assert!(matches!(err, CommandError::NotACommand { .. }));
}

#[test]
fn test_handler_panic_becomes_failure() {
    let mut dispatcher = CommandDispatcher::new();
    dispatcher
        .register("explode", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            panic!("wires crossed")
        })
        .unwrap();
    dispatcher
        .register("explode_fmt", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            panic!("code {}", 42)
        })
        .unwrap();

    let err = dispatcher
        .dispatch(&RawCommand::new("explode", Params::new()))
        .unwrap_err();
    assert_eq!(
        err,
        CommandError::Panicked {
            message: "wires crossed".to_string()
        }
    );

    let err = dispatcher
        .dispatch(&RawCommand::new("explode_fmt", Params::new()))
        .unwrap_err();
    assert_eq!(err.to_string(), "handler panicked: code 42");
}

#[test]
fn test_handler_failure_is_returned() {
    let mut dispatcher = CommandDispatcher::new();
    dispatcher
        .register("fail", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            Err(CommandError::execution("remote refused"))
        })
        .unwrap();
    let err = dispatcher
        .dispatch(&RawCommand::new("fail", Params::new()))
        .unwrap_err();
    assert_eq!(err, CommandError::execution("remote refused"));
}

#[test]
fn test_middleware_wraps_handler() {
    let schema = ParamSchema::new()
        .field(FieldSpec::new("service", FieldType::String).required())
        .field(FieldSpec::new("replicas", FieldType::Integer).default_value(1));
    let pipeline = Pipeline::new()
        .with(LoggingMiddleware::new())
        .with(ValidationMiddleware::new(schema));

    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("deploy", |_cmd: &dyn Command, ctx: &mut ExecutionContext| {
            Ok(ctx.params["replicas"].clone())
        })
        .unwrap();

    let result = dispatcher.dispatch_value(&json!({
        "command": "deploy",
        "params": { "service": "web", "replicas": "5" }
    }));
    assert_eq!(result, Ok(json!(5)));

    let result = dispatcher.dispatch_value(&json!({ "command": "deploy" }));
    assert!(matches!(result, Err(CommandError::ValidationFailed { .. })));
}

#[test]
fn test_dispatch_in_exposes_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let pipeline = Pipeline::new()
        .with(LoggingMiddleware::new())
        .with(RetryMiddleware::new(3, Duration::from_millis(1)));

    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("sync", move |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                Err(CommandError::execution("busy"))
            } else {
                Ok(json!("synced"))
            }
        })
        .unwrap();

    let command = RawCommand::new("sync", Params::new());
    let mut ctx = ExecutionContext::new(command.key(), command.params.clone());
    let result = dispatcher.dispatch_in(&command, &mut ctx);

    assert_eq!(result, Ok(json!("synced")));
    assert_eq!(ctx.scratch(RETRY_ATTEMPTS_KEY), Some(&json!(2)));
    assert!(ctx.elapsed.is_some());
}

#[test]
fn test_handler_panic_is_seen_by_middleware() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(InvocationLog::new(Some(&dir.path().join("invocations.md"))).unwrap());
    let pipeline = Pipeline::new()
        .with(LoggingMiddleware::with_log(log.clone()))
        .with(RetryMiddleware::new(3, Duration::from_millis(1)));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("flaky", move |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transient");
            }
            Ok(json!("recovered"))
        })
        .unwrap();

    let command = RawCommand::new("flaky", Params::new());
    let mut ctx = ExecutionContext::new(command.key(), command.params());
    let result = dispatcher.dispatch_in(&command, &mut ctx);

    assert_eq!(result, Ok(json!("recovered")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.scratch(RETRY_ATTEMPTS_KEY), Some(&json!(2)));
    assert!(ctx.elapsed.is_some());

    let written = std::fs::read_to_string(log.log_file()).unwrap();
    assert!(written.contains("Invocation Finished"));
}

#[test]
fn test_exhausted_panics_return_last_panic() {
    let pipeline = Pipeline::new()
        .with(LoggingMiddleware::new())
        .with(RetryMiddleware::new(2, Duration::from_millis(1)));
    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("broken", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            panic!("still broken")
        })
        .unwrap();

    let command = RawCommand::new("broken", Params::new());
    let mut ctx = ExecutionContext::new(command.key(), command.params());
    let err = dispatcher.dispatch_in(&command, &mut ctx).unwrap_err();

    assert_eq!(
        err,
        CommandError::Panicked {
            message: "still broken".to_string()
        }
    );
    assert_eq!(ctx.scratch(RETRY_ATTEMPTS_KEY), Some(&json!(2)));
    assert!(ctx.elapsed.is_some());
}

#[test]
fn test_panic_inside_middleware_is_caught() {
    let pipeline = Pipeline::new().with_arc(from_fn("broken", |_ctx, _next| {
        panic!("middleware bug")
    }));
    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("x", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| Ok(json!(null)))
        .unwrap();

    let err = dispatcher
        .dispatch(&RawCommand::new("x", Params::new()))
        .unwrap_err();
    assert!(matches!(err, CommandError::Panicked { .. }));
}

#[test]
fn test_register_typed() {
    #[derive(Deserialize)]
    struct Greet {
        name: String,
        #[serde(default)]
        shout: bool,
    }

    let mut dispatcher = CommandDispatcher::new();
    dispatcher
        .register_typed("greet", |args: Greet, _ctx: &mut ExecutionContext| {
            let greeting = format!("hello {}", args.name);
            Ok(json!(if args.shout {
                greeting.to_uppercase()
            } else {
                greeting
            }))
        })
        .unwrap();

    let ok = dispatcher.dispatch_value(&json!({
        "command": "greet",
        "params": { "name": "ada", "shout": true }
    }));
    assert_eq!(ok, Ok(json!("HELLO ADA")));

    let err = dispatcher
        .dispatch_value(&json!({ "command": "greet" }))
        .unwrap_err();
    assert!(err.to_string().contains("invalid parameters"));
}

#[test]
fn test_registered_keys_sorted() {
    let mut dispatcher = CommandDispatcher::new();
    for key in ["status", "deploy", "logs"] {
        dispatcher
            .register(key, |_cmd: &dyn Command, _ctx: &mut ExecutionContext| Ok(json!(null)))
            .unwrap();
    }
    assert_eq!(dispatcher.registered_keys(), vec!["deploy", "logs", "status"]);
    assert!(dispatcher.contains("logs"));
    assert!(!dispatcher.contains("rollback"));
}

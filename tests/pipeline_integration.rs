//! End-to-end tests for the configuration and dispatch pipeline
//!
//! These tests drive the public API the way a command-line front-end would:
//! resolve settings once, build a middleware pipeline, register handlers and
//! dispatch one command.

use clikit::config::{
    ArgsProvider, ConfigError, ConfigProvider, ConfigResolver, ConstantsProvider, EnvProvider,
    FileProvider, OutputFormat, Settings,
};
use clikit::dispatch::{Command, CommandDispatcher, RawCommand};
use clikit::middleware::{
    CommandError, ExecutionContext, FieldSpec, FieldType, LoggingMiddleware, ParamSchema, Params,
    Pipeline, RetryMiddleware, ValidationMiddleware, RETRY_ATTEMPTS_KEY,
};
use clikit::observability::InvocationLog;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Arguments beat environment, environment beats defaults
#[test]
fn test_args_env_constants_precedence() {
    let resolver = ConfigResolver::builder()
        .provider(ArgsProvider::new(vec![("port", json!(8080))]))
        .provider(EnvProvider::from_vars(
            "APP_",
            vec![("APP_PORT", "9090"), ("APP_HOST", "env-host")],
        ))
        .provider(ConstantsProvider::new(vec![
            ("host", json!("localhost")),
            ("timeout", json!(30)),
        ]))
        .build();

    let resolved = resolver.resolve(["port", "host", "timeout"]).unwrap();
    assert_eq!(resolved.get("port"), Some(&json!(8080)));
    assert_eq!(resolved.get("host"), Some(&json!("env-host")));
    assert_eq!(resolved.get("timeout"), Some(&json!(30)));

    let explained = resolver.explain("host").unwrap();
    assert_eq!(explained.source_label, "env:APP_");
}

/// Every missing required key is reported at once
#[test]
fn test_missing_required_keys_are_aggregated() {
    let resolver = ConfigResolver::builder()
        .provider(ConstantsProvider::new(vec![("region", json!("eu"))]))
        .build();

    let err = resolver
        .resolve_required(["region"], ["token", "account"])
        .unwrap_err();
    assert_eq!(err.missing_keys(), ["account", "token"]);
    assert!(matches!(err, ConfigError::KeyMissing { .. }));
}

/// A config file sits between environment and defaults
#[test]
fn test_file_provider_in_resolver() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "format: json\ntimeout: 10\nretry:\n  max_retries: 5\n  base_delay_ms: 20\n",
    )
    .unwrap();

    let file = FileProvider::load(&path).unwrap();
    assert_eq!(file.get("retry.max_retries"), Some(json!(5)));

    let resolver = ConfigResolver::builder()
        .provider(EnvProvider::from_vars("APP_", vec![("APP_TIMEOUT", "12")]))
        .provider(file)
        .provider(Settings::defaults_provider())
        .build();

    let settings = Settings::load(&resolver).unwrap();
    assert_eq!(settings.format, OutputFormat::Json);
    assert_eq!(settings.timeout(), Duration::from_secs(12));
    assert_eq!(settings.retry.max_retries, 5);
    assert_eq!(settings.retry.base_delay(), Duration::from_millis(20));
    assert_eq!(settings.log_level, "info");
}

/// An unreadable document fails when the provider is built
#[test]
fn test_broken_file_is_source_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = FileProvider::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::SourceUnavailable { .. }));

    let err = FileProvider::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::SourceUnavailable { .. }));
}

/// Resolved retry settings drive the retry middleware of a dispatcher
#[test]
fn test_settings_drive_dispatch_pipeline() {
    let resolver = ConfigResolver::builder()
        .provider(ArgsProvider::new(vec![(
            "retry",
            json!({ "max_retries": 3, "base_delay_ms": 1 }),
        )]))
        .provider(Settings::defaults_provider())
        .build();
    let settings = Settings::load(&resolver).unwrap();

    let dir = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::new(Some(dir.path().join("invocations.md").as_path())).unwrap());

    let schema = ParamSchema::new()
        .field(FieldSpec::new("target", FieldType::String).required())
        .field(FieldSpec::new("force", FieldType::Boolean).default_value(false));
    let pipeline = Pipeline::new()
        .with(LoggingMiddleware::with_log(log.clone()))
        .with(ValidationMiddleware::new(schema))
        .with(RetryMiddleware::from_settings(&settings.retry));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut dispatcher = CommandDispatcher::with_middleware(pipeline);
    dispatcher
        .register("publish", move |_cmd: &dyn Command, ctx: &mut ExecutionContext| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(CommandError::execution("registry unavailable"));
            }
            Ok(json!({ "published": ctx.params["target"], "force": ctx.params["force"] }))
        })
        .unwrap();

    let mut params = Params::new();
    params.insert("target".to_string(), json!("v1.2.0"));
    let command = RawCommand::new("publish", params);
    let mut ctx = ExecutionContext::new(command.key(), command.params());

    let result = dispatcher.dispatch_in(&command, &mut ctx).unwrap();
    assert_eq!(result, json!({ "published": "v1.2.0", "force": false }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.scratch(RETRY_ATTEMPTS_KEY), Some(&json!(3)));

    let written = std::fs::read_to_string(log.log_file()).unwrap();
    assert!(written.contains("**Command:** `publish`"));
    assert!(written.contains("**Status:** success"));
}

/// Routing and validation failures surface as their own error kinds
#[test]
fn test_dispatch_error_kinds() {
    let mut dispatcher = CommandDispatcher::with_middleware(
        Pipeline::new().with(RetryMiddleware::new(3, Duration::from_millis(1))),
    );
    dispatcher
        .register("status", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            Ok(json!("ok"))
        })
        .unwrap();

    assert_eq!(
        dispatcher.dispatch_value(&json!({ "command": "status" })),
        Ok(json!("ok"))
    );
    assert_eq!(
        dispatcher.dispatch_value(&json!({ "command": "stats" })),
        Err(CommandError::not_found("stats"))
    );
    assert!(matches!(
        dispatcher.dispatch_value(&json!("status")),
        Err(CommandError::NotACommand { .. })
    ));
    assert!(matches!(
        dispatcher.dispatch_value(&json!({ "command": "" })),
        Err(CommandError::ValidationFailed { .. })
    ));
    assert_eq!(
        dispatcher.register("status", |_cmd: &dyn Command, _ctx: &mut ExecutionContext| {
            Ok(json!(null))
        }),
        Err(CommandError::duplicate("status"))
    );
}

//! Unit tests for request routing in the dispatcher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{json, Map, Value};

use stdio_toolhost::dispatcher::Dispatcher;
use stdio_toolhost::protocol::codec::decode;
use stdio_toolhost::protocol::Response;
use stdio_toolhost::registry::{handler_fn, ParamType, ParameterSchema, ToolDescriptor};
use stdio_toolhost::{AppError, ToolHandler, ToolRegistry};

/// Records every argument map it receives and echoes it back.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl ToolHandler for Recorder {
    fn invoke(&self, arguments: Map<String, Value>) -> BoxFuture<'_, stdio_toolhost::Result<Value>> {
        self.calls.lock().expect("lock").push(arguments.clone());
        Box::pin(async move { Ok(json!({ "echo": arguments })) })
    }
}

/// Never completes within any reasonable deadline.
struct Sleeper;

impl ToolHandler for Sleeper {
    fn invoke(&self, _arguments: Map<String, Value>) -> BoxFuture<'_, stdio_toolhost::Result<Value>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        })
    }
}

fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor::new(name, "test tool", ParameterSchema::new())
}

fn registry_with_recorder() -> (ToolRegistry, Recorder) {
    let recorder = Recorder::default();
    let mut registry = ToolRegistry::new();
    registry
        .register(descriptor("record"), recorder.clone())
        .expect("register");
    (registry, recorder)
}

async fn dispatch_line(registry: &ToolRegistry, line: &str) -> stdio_toolhost::Result<Option<Response>> {
    Dispatcher::new(registry).dispatch(decode(line).expect("valid line")).await
}

fn result_of(response: Option<Response>) -> (Value, Value) {
    let response = response.expect("a response must be emitted");
    let result = response.result().cloned().expect("success response");
    (response.id, result)
}

#[tokio::test]
async fn initialize_acknowledges_with_request_id() {
    let (registry, _) = registry_with_recorder();

    for id in [json!(7), json!("req-7"), json!(0)] {
        let line = json!({ "jsonrpc": "2.0", "id": id, "method": "initialize" }).to_string();
        let (echoed, result) = result_of(dispatch_line(&registry, &line).await.expect("dispatch"));
        assert_eq!(echoed, id);
        assert_eq!(result, json!("initialized"));
    }
}

#[tokio::test]
async fn tools_list_and_prompts_list_return_descriptors() {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDescriptor::new(
                "first",
                "First tool",
                ParameterSchema::new().required("q", ParamType::String, ""),
            ),
            handler_fn(|_| Ok(Value::Null)),
        )
        .expect("register");
    registry
        .register(descriptor("second"), handler_fn(|_| Ok(Value::Null)))
        .expect("register");

    for method in ["tools/list", "prompts/list"] {
        let line = json!({ "id": 2, "method": method }).to_string();
        let (id, result) = result_of(dispatch_line(&registry, &line).await.expect("dispatch"));

        assert_eq!(id, json!(2));
        let names: Vec<&str> = result["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .map(|tool| tool["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, ["first", "second"], "{method} must list in registration order");
        assert_eq!(result["tools"][0]["description"], "First tool");
        assert_eq!(result["tools"][0]["parameters"]["required"], json!(["q"]));
    }
}

#[tokio::test]
async fn tools_call_passes_arguments_exactly_and_returns_output() {
    let (registry, recorder) = registry_with_recorder();
    let arguments = json!({ "a": 1, "nested": { "b": [true, null] } });
    let line = json!({
        "id": "call-1",
        "method": "tools/call",
        "params": { "name": "record", "arguments": arguments }
    })
    .to_string();

    let (id, result) = result_of(dispatch_line(&registry, &line).await.expect("dispatch"));

    assert_eq!(id, json!("call-1"));
    assert_eq!(result, json!({ "echo": arguments }));
    let calls = recorder.calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(Value::Object(calls[0].clone()), arguments);
}

#[tokio::test]
async fn tools_call_without_arguments_passes_empty_map() {
    let (registry, recorder) = registry_with_recorder();
    let line = r#"{"id":3,"method":"tools/call","params":{"name":"record"}}"#;

    dispatch_line(&registry, line).await.expect("dispatch");

    assert!(recorder.calls.lock().expect("lock")[0].is_empty());
}

#[tokio::test]
async fn unknown_tool_is_a_soft_error_with_id() {
    let (registry, recorder) = registry_with_recorder();
    let line = r#"{"id":4,"method":"tools/call","params":{"name":"X","arguments":{}}}"#;

    let (id, result) = result_of(dispatch_line(&registry, line).await.expect("dispatch"));

    assert_eq!(id, json!(4));
    assert_eq!(result, json!({ "error": "Unknown tool: X" }));
    assert!(recorder.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn missing_tool_name_is_reported_as_null() {
    let (registry, _) = registry_with_recorder();

    let (_, result) = result_of(
        dispatch_line(&registry, r#"{"id":5,"method":"tools/call"}"#)
            .await
            .expect("dispatch"),
    );

    assert_eq!(result, json!({ "error": "Unknown tool: null" }));
}

#[tokio::test]
async fn unsupported_or_missing_method_gets_no_response() {
    let (registry, _) = registry_with_recorder();

    for line in [
        r#"{"id":6,"method":"resources/list"}"#,
        r#"{"id":6,"method":"notifications/initialized"}"#,
        r#"{"id":6}"#,
        r#"{"id":6,"method":12}"#,
    ] {
        let response = dispatch_line(&registry, line).await.expect("dispatch");
        assert!(response.is_none(), "{line} must be silently ignored");
    }
}

#[tokio::test]
async fn non_object_arguments_fail_dispatch() {
    let (registry, recorder) = registry_with_recorder();
    let line = r#"{"id":7,"method":"tools/call","params":{"name":"record","arguments":[1]}}"#;

    let result = dispatch_line(&registry, line).await;

    assert!(matches!(result, Err(AppError::InvalidParams(_))));
    assert!(recorder.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn non_object_params_fail_dispatch() {
    let (registry, _) = registry_with_recorder();

    let result = dispatch_line(&registry, r#"{"id":8,"method":"tools/call","params":"record"}"#).await;

    assert!(matches!(result, Err(AppError::InvalidParams(_))));
}

#[tokio::test]
async fn handler_error_propagates_to_caller() {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            descriptor("broken"),
            handler_fn(|_| Err(AppError::Tool("disk on fire".into()))),
        )
        .expect("register");

    let result = dispatch_line(
        &registry,
        r#"{"id":9,"method":"tools/call","params":{"name":"broken"}}"#,
    )
    .await;

    match result {
        Err(AppError::Tool(msg)) => assert_eq!(msg, "disk on fire"),
        other => panic!("expected Err(AppError::Tool), got: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_handler_times_out() {
    let mut registry = ToolRegistry::new();
    registry.register(descriptor("slow"), Sleeper).expect("register");
    let dispatcher = Dispatcher::new(&registry).with_handler_timeout(Some(Duration::from_secs(2)));

    let request = decode(r#"{"id":10,"method":"tools/call","params":{"name":"slow"}}"#)
        .expect("valid line");
    let result = dispatcher.dispatch(request).await;

    match result {
        Err(AppError::Timeout(msg)) => assert!(msg.contains("slow"), "got: {msg}"),
        other => panic!("expected Err(AppError::Timeout), got: {other:?}"),
    }
}

#[tokio::test]
async fn null_params_fail_dispatch() {
    let (registry, recorder) = registry_with_recorder();

    let result = dispatch_line(&registry, r#"{"id":4,"method":"tools/call","params":null}"#).await;

    match result {
        Err(AppError::InvalidParams(msg)) => assert!(msg.contains("null"), "got: {msg}"),
        other => panic!("expected Err(AppError::InvalidParams), got: {other:?}"),
    }
    assert!(recorder.calls.lock().expect("lock").is_empty());
}

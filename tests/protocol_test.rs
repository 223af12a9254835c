//! End-to-end protocol tests: the engine driven over in-memory streams with
//! the full tool catalog registered against a fake database.

mod common;

use common::{FakeDatabase, FixedResolver};
use lazydb_mcp::mcp::{ProtocolEngine, ToolRegistry};
use lazydb_mcp::tools;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Run one stdio session and collect the responses, one JSON object per line.
async fn run_session(db: Arc<FakeDatabase>, input: &str) -> Vec<Value> {
    let registry = Arc::new(ToolRegistry::new());
    let resolver = FixedResolver::new(db);
    tools::register_all(&registry, &resolver);

    let mut engine = ProtocolEngine::new(registry);
    let reader = BufReader::new(input.as_bytes());
    let mut out = Cursor::new(Vec::new());
    engine
        .run(CancellationToken::new(), reader, &mut out)
        .await
        .expect("engine run failed");

    let written = String::from_utf8(out.into_inner()).expect("non-utf8 output");
    written
        .lines()
        .map(|line| serde_json::from_str(line).expect("non-JSON response line"))
        .collect()
}

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;

fn session(lines: &[&str]) -> String {
    let mut input = String::new();
    for line in lines {
        input.push_str(line);
        input.push('\n');
    }
    input
}

#[tokio::test]
async fn test_s1_handshake() {
    let responses = run_session(Arc::new(FakeDatabase::new("test")), &session(&[INITIALIZE])).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0],
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "lazydb-mcp", "version": "1.0.0"},
                "capabilities": {"tools": {"list": true, "call": true}}
            }
        })
    );
}

#[tokio::test]
async fn test_repeated_initialize_is_stable() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[0]["result"], responses[1]["result"]);
    assert_eq!(responses[1]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[1]["result"]["capabilities"]["tools"]["list"], true);
    assert_eq!(responses[1]["result"]["capabilities"]["tools"]["call"], true);
}

#[tokio::test]
async fn test_s2_catalog_has_all_21_tools() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        ]),
    )
    .await;

    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 21);

    let names: Vec<&str> = tools
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    for expected in [
        "list_all_tables",
        "get_table_schema",
        "search_tables",
        "get_sample_data",
        "get_table_count",
        "get_table_ddl",
        "get_view_definition",
        "get_function_definition",
        "get_table_indexes",
        "get_table_size",
        "explain_query",
        "get_foreign_keys",
        "get_table_constraints",
        "get_table_dependencies",
        "get_table_triggers",
        "get_trigger_definition",
        "get_column_stats",
        "get_table_stats",
        "list_sequences",
        "list_materialized_views",
        "get_table_references",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }

    // Every descriptor advertises an object input schema
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[tokio::test]
async fn test_s3_list_before_initialize() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[r#"{"jsonrpc":"2.0","id":7,"method":"tools/list","params":{}}"#]),
    )
    .await;
    assert_eq!(
        responses[0],
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": {"code": -32600, "message": "Server not initialized"}
        })
    );
}

#[tokio::test]
async fn test_call_before_initialize_is_rejected() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"list_all_tables"}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[0]["error"]["code"], -32600);
}

#[tokio::test]
async fn test_s4_unknown_method() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[r#"{"jsonrpc":"2.0","id":8,"method":"completion/complete","params":{}}"#]),
    )
    .await;
    assert_eq!(responses[0]["error"]["code"], -32601);
    assert!(responses[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Method not found"));
}

#[tokio::test]
async fn test_s5_safety_refusal_without_database_contact() {
    let db = Arc::new(FakeDatabase::new("test"));
    let responses = run_session(
        db.clone(),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"explain_query","arguments":{"query":"DROP TABLE users"}}}"#,
        ]),
    )
    .await;

    assert_eq!(responses[1]["error"]["code"], -32603);
    assert!(responses[1]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("only SELECT queries are allowed"));
    assert_eq!(db.query_count(), 0, "the database must not be contacted");
}

#[tokio::test]
async fn test_resources_and_prompts_lists_are_empty() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list","params":{}}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/list","params":{}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[0]["result"], json!({"resources": []}));
    assert_eq!(responses[1]["result"], json!({"prompts": []}));
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/list","params":{}}"#,
        ]),
    )
    .await;
    // Exactly one response per request that carried an id
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["id"], 2);
}

#[tokio::test]
async fn test_garbage_lines_are_skipped() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            "this is not json",
            "{\"unterminated\": ",
            "[1, 2, 3]",
            INITIALIZE,
        ]),
    )
    .await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 1);
    assert!(responses[0]["result"].is_object());
}

#[tokio::test]
async fn test_ids_are_echoed_verbatim() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            r#"{"jsonrpc":"2.0","id":"abc-123","method":"resources/list"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"prompts/list"}"#,
        ]),
    )
    .await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], "abc-123");
    assert!(responses[1]["id"].is_null());
    assert!(responses[1].as_object().unwrap().contains_key("id"));
}

#[tokio::test]
async fn test_responses_preserve_request_order() {
    let db = Arc::new(
        FakeDatabase::new("test").with_schema("public", &["users"]),
    );
    let responses = run_session(
        db,
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":10,"method":"tools/call","params":{"name":"list_all_tables","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":11,"method":"tools/call","params":{"name":"get_table_count","arguments":{"table_name":"users"}}}"#,
        ]),
    )
    .await;
    let ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 10, 11]);
}

#[tokio::test]
async fn test_missing_tool_name_is_invalid_params() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":42}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[1]["error"]["code"], -32602);
    assert_eq!(responses[2]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_unknown_tool_is_internal_error() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"no_such_tool","arguments":{}}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[1]["error"]["code"], -32603);
    assert!(responses[1]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Tool not found"));
}

#[tokio::test]
async fn test_missing_required_argument_is_invalid_params() {
    let responses = run_session(
        Arc::new(FakeDatabase::new("test")),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_table_schema","arguments":{}}}"#,
        ]),
    )
    .await;
    assert_eq!(responses[1]["error"]["code"], -32602);
    assert_eq!(
        responses[1]["error"]["message"],
        "table_name parameter is required"
    );
}

/// Every advertised tool must be callable with just its advertised required
/// arguments without tripping method/params errors.
#[tokio::test]
async fn test_every_advertised_tool_is_callable() {
    let db = Arc::new(
        FakeDatabase::new("test")
            .with_schema("public", &["t"])
            .with_columns(
                "public",
                "t",
                vec![lazydb_mcp::db::ColumnInfo {
                    name: "id".into(),
                    data_type: "integer".into(),
                    nullable: false,
                    default: None,
                }],
            ),
    );

    let list = run_session(
        db.clone(),
        &session(&[
            INITIALIZE,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        ]),
    )
    .await;

    let mut lines = vec![INITIALIZE.to_string()];
    let tools = list[1]["result"]["tools"].as_array().unwrap().clone();
    for (i, tool) in tools.iter().enumerate() {
        let name = tool["name"].as_str().unwrap();
        let mut arguments = serde_json::Map::new();
        if let Some(required) = tool["inputSchema"]["required"].as_array() {
            for prop in required {
                let prop = prop.as_str().unwrap();
                let value = match prop {
                    "query" => "SELECT 1",
                    "pattern" => "%t%",
                    "function_name" => "f",
                    "trigger_name" => "trg",
                    _ => "public.t",
                };
                arguments.insert(prop.to_string(), json!(value));
            }
        }
        lines.push(
            json!({
                "jsonrpc": "2.0",
                "id": 100 + i as i64,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            })
            .to_string(),
        );
    }

    let lines_ref: Vec<&str> = lines.iter().map(String::as_str).collect();
    let responses = run_session(db, &session(&lines_ref)).await;
    for response in responses.iter().skip(1) {
        if let Some(error) = response.get("error") {
            let code = error["code"].as_i64().unwrap();
            assert!(
                code != -32601 && code != -32602,
                "tool call rejected with {code}: {error}"
            );
        }
    }
}

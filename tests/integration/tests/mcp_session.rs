//! End-to-end MCP sessions against an offline server.

use pinemem_integration_tests::{exchange, offline_server, response_for, temp_config, tool_text};
use pinemem_memory::{Category, LocalIndex};
use serde_json::{json, Value};

fn call(id: i64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
    })
}

#[tokio::test]
async fn test_store_list_recall_session() {
    let (_dir, config) = temp_config();
    let server = offline_server(&config);

    let responses = exchange(
        server.clone(),
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            call(
                2,
                "remember_this",
                json!({"memory": "Quarterly report is due to the client on Friday"}),
            ),
        ],
    )
    .await;
    assert_eq!(responses.len(), 2);
    assert_eq!(
        response_for(&responses, 1)["result"]["serverInfo"]["name"],
        config.server.name.as_str()
    );
    let stored = tool_text(response_for(&responses, 2));
    assert!(stored.contains("Memory stored successfully"));
    assert!(stored.contains("🏷️ Category: work"));

    let responses = exchange(
        server.clone(),
        &[call(
            3,
            "remember_this",
            json!({"memory": "Try a new sourdough recipe", "context": "weekend idea"}),
        )],
    )
    .await;
    assert!(tool_text(response_for(&responses, 3)).contains("Memory stored successfully"));

    let responses = exchange(
        server.clone(),
        &[
            call(4, "show_my_memories", json!({})),
            call(5, "show_my_memories", json!({"category": "work", "limit": 5})),
            call(
                6,
                "recall_memory",
                json!({"query": "Quarterly report is due to the client on Friday", "top_k": 1}),
            ),
        ],
    )
    .await;
    assert_eq!(responses.len(), 3);

    let all = tool_text(response_for(&responses, 4));
    assert!(all.starts_with("📚 Showing 2 memories out of 2 total:"));
    assert!(all.contains("Total memories: 2"));

    let work = tool_text(response_for(&responses, 5));
    assert!(work.starts_with("📚 Showing 1 memories (category: work) out of 2 total:"));
    assert!(work.contains("Quarterly report"));
    assert!(!work.contains("sourdough"));

    let recalled = tool_text(response_for(&responses, 6));
    assert!(recalled.starts_with("🔍 Found 1 relevant memories"));
    assert!(recalled.contains("Quarterly report"));
}

#[tokio::test]
async fn test_local_index_is_written_to_disk() {
    let (_dir, config) = temp_config();
    let server = offline_server(&config);

    exchange(
        server,
        &[
            call(1, "remember_this", json!({"memory": "Fix the login bug in the api"})),
            call(2, "remember_this", json!({"memory": "Call mom on her birthday"})),
        ],
    )
    .await;

    let index = LocalIndex::new(config.index_path().unwrap());
    let ids = index.list_ids().await;
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| id.starts_with("mem_")));

    let stats = index.stats().await;
    assert_eq!(stats.total_memories, 2);
    assert_eq!(stats.categories.get(&Category::Technical), Some(&1));
    assert_eq!(stats.categories.get(&Category::Personal), Some(&1));

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(config.index_path().unwrap()).unwrap())
            .unwrap();
    assert_eq!(raw["total_memories"], 2);
    assert_eq!(raw["vector_ids"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_tool_errors_stay_in_band() {
    let (_dir, config) = temp_config();
    let server = offline_server(&config);

    let responses = exchange(
        server,
        &[
            call(1, "remember_this", json!({})),
            call(2, "show_my_memories", json!({"category": "chores"})),
            call(3, "recall_memory", json!({"query": "anything", "top_k": 0})),
            call(4, "delete_everything", json!({})),
        ],
    )
    .await;
    assert_eq!(responses.len(), 4);
    for id in 1..=4 {
        let response = response_for(&responses, id);
        assert!(response.get("error").is_none(), "id {} became a protocol error", id);
        assert_eq!(response["result"]["isError"], true, "id {}", id);
    }
    assert_eq!(
        tool_text(response_for(&responses, 4)),
        "Unknown tool: delete_everything"
    );
}

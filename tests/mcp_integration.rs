//! MCP server integration tests.
//!
//! These tests spawn `aseprite-mcp serve` as a subprocess and communicate
//! via JSON-RPC 2.0 over stdin/stdout, verifying the protocol handshake,
//! tool listing, and error handling. None of them require an Aseprite
//! binary: they only exercise paths that fail validation before a spawn.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

/// A lightweight MCP client that talks to an `aseprite-mcp serve` subprocess.
struct McpClient {
    child: std::process::Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    next_id: u64,
}

impl McpClient {
    fn spawn() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_aseprite-mcp"))
            .arg("serve")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn aseprite-mcp serve");

        let stdin = child.stdin.take().expect("no stdin");
        let stdout = child.stdout.take().expect("no stdout");
        let reader = BufReader::new(stdout);

        McpClient { child, stdin, reader, next_id: 1 }
    }

    /// Send a JSON-RPC request and return the parsed response.
    fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let id = self.next_id;
        self.next_id += 1;

        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let line = serde_json::to_string(&msg).unwrap();
        writeln!(self.stdin, "{}", line).expect("write to stdin failed");
        self.stdin.flush().expect("flush stdin failed");

        let mut buf = String::new();
        self.reader.read_line(&mut buf).expect("read from stdout failed");
        serde_json::from_str(&buf)
            .unwrap_or_else(|e| panic!("failed to parse response JSON: {}\nraw: {}", e, buf))
    }

    /// Send the initialize handshake and return the result.
    fn initialize(&mut self) -> serde_json::Value {
        let resp = self.request(
            "initialize",
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "test-client",
                    "version": "0.1.0"
                }
            }),
        );

        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        });
        let line = serde_json::to_string(&notif).unwrap();
        writeln!(self.stdin, "{}", line).expect("write notification failed");
        self.stdin.flush().expect("flush notification failed");

        // Small delay to let server process the notification
        std::thread::sleep(Duration::from_millis(50));

        resp
    }

    fn list_tools(&mut self) -> serde_json::Value {
        self.request("tools/list", serde_json::json!({}))
    }

    fn call_tool(&mut self, name: &str, args: serde_json::Value) -> serde_json::Value {
        self.request(
            "tools/call",
            serde_json::json!({
                "name": name,
                "arguments": args,
            }),
        )
    }

    /// Shut down by closing stdin, which causes the server to exit.
    fn shutdown(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}

// ── Handshake ─────────────────────────────────────────────────────────

#[test]
fn test_mcp_initialize_handshake() {
    let mut client = McpClient::spawn();
    let resp = client.initialize();

    let result = resp.get("result").expect("initialize should return result");

    assert_eq!(
        result["protocolVersion"].as_str().unwrap(),
        "2024-11-05",
        "protocol version mismatch"
    );

    let info = &result["serverInfo"];
    assert_eq!(info["name"].as_str().unwrap(), "aseprite-mcp");
    assert!(info["version"].as_str().is_some(), "version should be present");

    let caps = &result["capabilities"];
    assert!(caps.get("tools").is_some(), "tools capability should be present");

    client.shutdown();
}

// ── Tool Listing ──────────────────────────────────────────────────────

#[test]
fn test_mcp_tools_list() {
    let mut client = McpClient::spawn();
    client.initialize();

    let resp = client.list_tools();
    let result = resp.get("result").expect("tools/list should return result");
    let tools = result["tools"].as_array().expect("tools should be an array");

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    let expected = [
        "create_canvas",
        "add_layer",
        "add_frame",
        "get_canvas_info",
        "draw_pixels",
        "draw_line",
        "draw_rectangle",
        "draw_circle",
        "fill_area",
        "export_sprite",
        "export_animation",
        "export_spritesheet",
        "route_file",
        "validate_output_directory",
        "list_output_files",
        "cleanup_output_directory",
        "create_organized_structure",
    ];
    assert_eq!(tools.len(), expected.len(), "unexpected tool count: {names:?}");
    for name in &expected {
        assert!(names.contains(name), "missing tool: {}", name);
    }

    for tool in tools {
        let name = tool["name"].as_str().unwrap();
        assert!(
            tool.get("description").and_then(|d| d.as_str()).is_some(),
            "tool {} missing description",
            name
        );
        let schema =
            tool.get("inputSchema").unwrap_or_else(|| panic!("tool {} missing inputSchema", name));
        assert_eq!(
            schema["type"].as_str().unwrap(),
            "object",
            "tool {} inputSchema should be object type",
            name
        );
    }

    client.shutdown();
}

// ── Tool Calls ────────────────────────────────────────────────────────

#[test]
fn test_mcp_invalid_canvas_dimensions_are_rejected() {
    let mut client = McpClient::spawn();
    client.initialize();

    let resp = client.call_tool(
        "create_canvas",
        serde_json::json!({ "width": 0, "height": 64 }),
    );
    let result = resp.get("result").expect("tool call should return result");
    assert_eq!(result["isError"].as_bool(), Some(true));

    let content = result["content"].as_array().expect("content should be array");
    let text = content[0]["text"].as_str().unwrap();
    assert!(text.contains("width and height"), "unexpected error text: {text}");

    client.shutdown();
}

#[test]
fn test_mcp_route_file_missing_source_is_an_error_payload() {
    let mut client = McpClient::spawn();
    client.initialize();

    let dir = tempfile::tempdir().unwrap();
    let resp = client.call_tool(
        "route_file",
        serde_json::json!({
            "source_file": dir.path().join("ghost.png").display().to_string(),
            "destination_directory": dir.path().display().to_string(),
        }),
    );
    let result = resp.get("result").expect("tool call should return result");
    assert_eq!(result["isError"].as_bool(), Some(true));

    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("source file not found"), "unexpected error text: {text}");

    client.shutdown();
}

#[test]
fn test_mcp_validate_output_directory_round_trip() {
    let mut client = McpClient::spawn();
    client.initialize();

    let dir = tempfile::tempdir().unwrap();
    let resp = client.call_tool(
        "validate_output_directory",
        serde_json::json!({
            "directory_path": dir.path().display().to_string(),
        }),
    );
    let result = resp.get("result").expect("tool call should return result");
    assert_ne!(result["isError"].as_bool(), Some(true));

    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Directory Validation Report"), "unexpected text: {text}");
    assert!(text.contains("Writable: true"), "unexpected text: {text}");

    client.shutdown();
}

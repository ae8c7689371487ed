//! Integration tests for the agent adapters against real files.

mod support;

use std::collections::BTreeMap;
use std::fs;

use serde_json::json;
use tempfile::TempDir;

use conduit_core::client::{
    AddOptions, AddOutcome, AgentAdapter, ClaudeCodeClient, ClaudeDesktopClient, CodexClient,
    OpenCodeClient,
};
use conduit_core::error::ConduitError;
use conduit_core::mcp::{NormalizedServer, Transport};
use conduit_core::types::Scope;

use support::{client_context, read_json};

fn echo() -> NormalizedServer {
    NormalizedServer::stdio("io.github.acme/echo", "node", vec!["echo.js".into()])
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn adapters(home: &std::path::Path) -> Vec<Box<dyn AgentAdapter>> {
    let ctx = client_context(home);
    vec![
        Box::new(ClaudeCodeClient::new(ctx.clone())),
        Box::new(ClaudeDesktopClient::new(ctx.clone())),
        Box::new(CodexClient::new(ctx.clone())),
        Box::new(OpenCodeClient::new(ctx)),
    ]
}

#[test]
fn stdio_server_round_trips_through_every_adapter() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let server = echo().with_env(env(&[("API_KEY", "${API_KEY}"), ("DEBUG", "1")]));

    for adapter in adapters(temp.path()) {
        let outcome = adapter
            .add_server(Scope::User, &work, &server, &AddOptions::default())
            .unwrap();
        assert_eq!(
            outcome,
            AddOutcome::Installed {
                name: "echo".to_string(),
                replaced: false
            },
            "{}",
            adapter.id()
        );

        let installed = adapter.list_installed(Scope::User, &work).unwrap();
        assert_eq!(installed.len(), 1, "{}", adapter.id());
        assert_eq!(installed[0].name, "echo");
        assert_eq!(installed[0].server.transport, server.transport, "{}", adapter.id());
    }
}

#[test]
fn http_server_round_trips_where_supported() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let server = NormalizedServer::http("acme/remote", "https://mcp.example.com/v1")
        .with_headers(env(&[("Authorization", "Bearer abc")]));

    let claude = ClaudeCodeClient::new(client_context(temp.path()));
    claude
        .add_server(Scope::Project, &work, &server, &AddOptions::default())
        .unwrap();
    let back = &claude.list_installed(Scope::Project, &work).unwrap()[0];
    assert_eq!(back.server.transport, server.transport);

    let opencode = OpenCodeClient::new(client_context(temp.path()));
    opencode
        .add_server(Scope::Project, &work, &server, &AddOptions::default())
        .unwrap();
    let back = &opencode.list_installed(Scope::Project, &work).unwrap()[0];
    assert_eq!(back.server.transport, server.transport);

    let codex = CodexClient::new(client_context(temp.path()));
    codex
        .add_server(Scope::Project, &work, &server, &AddOptions::default())
        .unwrap();
    let back = &codex.list_installed(Scope::Project, &work).unwrap()[0];
    assert_eq!(back.server.transport.url(), Some("https://mcp.example.com/v1"));
    let raw = fs::read_to_string(work.join(".codex/config.toml")).unwrap();
    assert!(raw.contains("token_env"));
    assert!(!raw.contains("abc"), "tokens must not be written: {raw}");
}

#[test]
fn desktop_skips_remote_servers_without_writing() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let desktop = ClaudeDesktopClient::new(client_context(temp.path()));

    let outcome = desktop
        .add_server(
            Scope::User,
            &work,
            &NormalizedServer::sse("acme/events", "https://x.test/sse"),
            &AddOptions::default(),
        )
        .unwrap();

    assert!(matches!(outcome, AddOutcome::Skipped { .. }));
    assert!(!desktop.config_path(Scope::User, &work).unwrap().exists());
}

#[test]
fn desktop_rejects_project_scope_everywhere() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let desktop = ClaudeDesktopClient::new(client_context(temp.path()));
    let unsupported = |e: ConduitError| matches!(e, ConduitError::UnsupportedScope { .. });

    assert!(unsupported(desktop.config_path(Scope::Project, &work).unwrap_err()));
    assert!(unsupported(desktop.read_config(Scope::Project, &work).unwrap_err()));
    assert!(unsupported(
        desktop
            .write_config(Scope::Project, &work, &serde_json::Map::new())
            .unwrap_err()
    ));
    assert!(unsupported(desktop.list_installed(Scope::Project, &work).unwrap_err()));
    assert!(unsupported(
        desktop
            .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
            .unwrap_err()
    ));
    assert!(unsupported(desktop.remove_server(Scope::Project, &work, "echo").unwrap_err()));
    assert!(!work.exists());
}

#[test]
fn claude_code_project_install_writes_exact_document() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let claude = ClaudeCodeClient::new(client_context(temp.path()));

    claude
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();

    let written = read_json(&work.join(".mcp.json"));
    assert_eq!(
        serde_json::to_string(&written).unwrap(),
        r#"{"mcpServers":{"echo":{"type":"stdio","command":"node","args":["echo.js"]}}}"#
    );
}

#[test]
fn codex_install_keeps_unrelated_tables() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let config = work.join(".codex/config.toml");
    fs::create_dir_all(config.parent().unwrap()).unwrap();
    fs::write(&config, "[settings]\nmodel = \"gpt-4\"\n").unwrap();

    CodexClient::new(client_context(temp.path()))
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();

    let raw = fs::read_to_string(&config).unwrap();
    assert!(raw.contains("[settings]"));
    assert!(raw.contains("model = \"gpt-4\""));
    assert!(raw.contains("[mcp_servers.echo]"));

    let parsed: toml::Table = raw.parse().unwrap();
    assert_eq!(parsed["settings"]["model"].as_str(), Some("gpt-4"));
    assert_eq!(parsed["mcp_servers"]["echo"]["command"].as_str(), Some("node"));
}

#[test]
fn removing_last_server_leaves_empty_map_and_other_keys() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    fs::write(
        work.join(".mcp.json"),
        r#"{"otherSetting": "value", "mcpServers": {"echo": {"type": "stdio", "command": "node", "args": []}}}"#,
    )
    .unwrap();

    let claude = ClaudeCodeClient::new(client_context(temp.path()));
    assert!(claude.remove_server(Scope::Project, &work, "echo").unwrap());

    assert_eq!(
        read_json(&work.join(".mcp.json")),
        json!({"otherSetting": "value", "mcpServers": {}})
    );
}

#[test]
fn removal_is_idempotent_and_does_not_touch_file() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let claude = ClaudeCodeClient::new(client_context(temp.path()));

    assert!(!claude.remove_server(Scope::Project, &work, "echo").unwrap());
    assert!(!work.join(".mcp.json").exists());

    claude
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    assert!(claude.remove_server(Scope::Project, &work, "echo").unwrap());
    let after_first = fs::read_to_string(work.join(".mcp.json")).unwrap();
    assert!(!claude.remove_server(Scope::Project, &work, "echo").unwrap());
    assert_eq!(fs::read_to_string(work.join(".mcp.json")).unwrap(), after_first);
}

#[test]
fn adding_keeps_foreign_servers_and_settings() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    fs::write(
        work.join(".mcp.json"),
        r#"{"theme": "dark", "mcpServers": {"manual": {"command": "python", "args": ["srv.py"], "x-extra": true}}}"#,
    )
    .unwrap();

    ClaudeCodeClient::new(client_context(temp.path()))
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();

    let written = read_json(&work.join(".mcp.json"));
    assert_eq!(written["theme"], "dark");
    assert_eq!(written["mcpServers"]["manual"]["x-extra"], true);
    assert_eq!(written["mcpServers"]["echo"]["command"], "node");
}

#[test]
fn same_name_overwrites_existing_entry() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let claude = ClaudeCodeClient::new(client_context(temp.path()));

    claude
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    let other = NormalizedServer::stdio("other/echo", "deno", vec!["run".into()]);
    let outcome = claude
        .add_server(Scope::Project, &work, &other, &AddOptions::default())
        .unwrap();

    assert_eq!(
        outcome,
        AddOutcome::Installed {
            name: "echo".to_string(),
            replaced: true
        }
    );
    let installed = claude.list_installed(Scope::Project, &work).unwrap();
    assert_eq!(installed.len(), 1);
    assert!(matches!(&installed[0].server.transport, Transport::Stdio { command, .. } if command == "deno"));
}

#[test]
fn opencode_jsonc_keeps_comments_outside_server_map() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let path = work.join("opencode.jsonc");
    fs::write(
        &path,
        "{\n  // pinned model\n  \"model\": \"anthropic/claude\",\n  \"mcp\": {\n    \"servers\": {}\n  },\n}\n",
    )
    .unwrap();

    let opencode = OpenCodeClient::new(client_context(temp.path()));
    opencode
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("// pinned model"), "{raw}");
    assert!(raw.contains("\"model\": \"anthropic/claude\""));
    let installed = opencode.list_installed(Scope::Project, &work).unwrap();
    assert_eq!(installed[0].name, "echo");
    assert!(!work.join("opencode.json").exists());
}

#[test]
fn corrupt_config_is_replaced_on_add_but_rejected_on_remove() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    fs::write(work.join(".mcp.json"), "{ not json").unwrap();
    let claude = ClaudeCodeClient::new(client_context(temp.path()));

    assert!(matches!(
        claude.remove_server(Scope::Project, &work, "echo"),
        Err(ConduitError::InvalidConfig { .. })
    ));

    claude
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    let written = read_json(&work.join(".mcp.json"));
    assert_eq!(written["mcpServers"]["echo"]["command"], "node");
}

#[test]
fn unreadable_entries_list_as_placeholders() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    fs::write(
        work.join(".mcp.json"),
        r#"{"mcpServers": {"broken": {"type": "carrier-pigeon"}, "echo": {"command": "node"}}}"#,
    )
    .unwrap();

    let installed = ClaudeCodeClient::new(client_context(temp.path()))
        .list_installed(Scope::Project, &work)
        .unwrap();
    assert_eq!(installed.len(), 2);
    assert!(installed[0].server.is_placeholder());
    assert!(!installed[1].server.is_placeholder());
}

#[test]
fn name_override_is_used_as_key() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let codex = CodexClient::new(client_context(temp.path()));

    codex
        .add_server(
            Scope::Project,
            &work,
            &echo(),
            &AddOptions {
                name: Some("echo-dev".to_string()),
            },
        )
        .unwrap();
    let installed = codex.list_installed(Scope::Project, &work).unwrap();
    assert_eq!(installed[0].name, "echo-dev");
}

#[test]
fn opencode_jsonc_keeps_comments_inside_server_map() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let path = work.join("opencode.jsonc");
    fs::write(
        &path,
        "{\n  \"mcp\": {\n    \"servers\": {\n      // production database, do not remove\n      \"db\": {\"type\": \"local\", \"command\": [\"pg-mcp\"]}\n    }\n  }\n}\n",
    )
    .unwrap();
    let opencode = OpenCodeClient::new(client_context(temp.path()));

    opencode
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("// production database, do not remove"), "{raw}");
    assert!(raw.contains("\"db\": {\"type\": \"local\", \"command\": [\"pg-mcp\"]}"));

    assert!(opencode.remove_server(Scope::Project, &work, "echo").unwrap());
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("// production database, do not remove"), "{raw}");
    let names: Vec<_> = opencode
        .list_installed(Scope::Project, &work)
        .unwrap()
        .into_iter()
        .map(|installed| installed.name)
        .collect();
    assert_eq!(names, vec!["db"]);
}

#[test]
fn codex_removal_keeps_other_tables_and_comments() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    let config = work.join(".codex/config.toml");
    fs::create_dir_all(config.parent().unwrap()).unwrap();
    fs::write(&config, "# top\n[settings]\nmodel = \"gpt-4\"\n").unwrap();
    let codex = CodexClient::new(client_context(temp.path()));

    codex
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    assert!(codex.remove_server(Scope::Project, &work, "echo").unwrap());

    let raw = fs::read_to_string(&config).unwrap();
    assert!(raw.contains("# top"), "{raw}");
    let parsed: toml::Table = raw.parse().unwrap();
    assert_eq!(parsed["settings"]["model"].as_str(), Some("gpt-4"));
    assert!(
        parsed
            .get("mcp_servers")
            .and_then(|servers| servers.get("echo"))
            .is_none()
    );

    assert!(!codex.remove_server(Scope::Project, &work, "echo").unwrap());
    assert_eq!(fs::read_to_string(&config).unwrap(), raw);
}

#[test]
fn opencode_removal_keeps_other_keys_and_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let path = work.join("opencode.jsonc");
    fs::write(&path, "{\n  // keep\n  \"theme\": \"dark\"\n}\n").unwrap();
    let opencode = OpenCodeClient::new(client_context(temp.path()));

    opencode
        .add_server(Scope::Project, &work, &echo(), &AddOptions::default())
        .unwrap();
    assert!(opencode.remove_server(Scope::Project, &work, "echo").unwrap());

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("// keep"), "{raw}");
    assert!(raw.contains("\"theme\": \"dark\""));
    assert!(opencode.list_installed(Scope::Project, &work).unwrap().is_empty());

    assert!(!opencode.remove_server(Scope::Project, &work, "echo").unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), raw);
}

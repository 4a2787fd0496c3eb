#![allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PETSTORE: &str = r#"
openapi: 3.0.0
info:
  title: Petstore
servers:
  - url: https://petstore.example.com/v1
paths:
  /pets:
    get:
      operationId: listPets
      summary: List pets
    post:
      operationId: createPet
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name:
                  type: string
"#;

/// Command isolated from the caller's config file and API keys.
fn docmcp(dir: &Path) -> Command {
    let config = dir.join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("docmcp").unwrap();
    cmd.arg("--config")
        .arg(config)
        .env_remove("DOCMCP_CONFIG")
        .env_remove("DOCMCP_OPENAI_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("DOCMCP_FIRECRAWL_API_KEY")
        .env_remove("FIRECRAWL_API_KEY");
    cmd
}

fn write_spec(dir: &Path) -> PathBuf {
    let spec = dir.join("petstore.yaml");
    std::fs::write(&spec, PETSTORE).unwrap();
    spec
}

#[test]
fn parse_file_emits_crawl_result() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(dir.path());

    let output = docmcp(dir.path()).arg("parse").arg(&spec).output().unwrap();
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["endpoints"].as_array().unwrap().len(), 2);
    assert_eq!(result["baseUrl"], "https://petstore.example.com/v1");
    assert_eq!(result["authType"], "bearer");
    assert_eq!(result["timedOut"], false);
}

#[test]
fn parse_mcp_manifest_to_file() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(dir.path());
    let out = dir.path().join("petstore.mcp.json");

    docmcp(dir.path())
        .arg("parse")
        .arg(&spec)
        .arg("--mcp")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Wrote 2 endpoints"));

    let manifest: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let tools = manifest["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["description"], "List pets");
    assert_eq!(tools[1]["input_schema"]["properties"]["name"]["type"], "string");
    assert_eq!(manifest["base_url"], "https://petstore.example.com/v1");
}

#[test]
fn parse_stdin_without_endpoints_exits_2() {
    let dir = TempDir::new().unwrap();
    docmcp(dir.path())
        .args(["parse", "-"])
        .write_stdin("Our company makes great software.")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No API endpoints found"))
        .stderr(predicate::str::contains("Suggestions:"));
}

#[test]
fn parse_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    docmcp(dir.path())
        .args(["parse", "/definitely/not/here.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "max_parallel = 0\n").unwrap();
    docmcp(dir.path())
        .args(["parse", "-"])
        .write_stdin("GET /users")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max_parallel"));
}

#[tokio::test(flavor = "multi_thread")]
async fn crawl_local_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><table><tr><td>GET</td><td>/users/{id}</td></tr></table></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/docs", server.uri());
    let output = docmcp(dir.path())
        .args(["crawl", &url, "--allow-private-network", "--mcp"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let manifest: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["tools"][0]["method"], "GET");
    assert_eq!(manifest["tools"][0]["path"], "/users/{id}");
    assert_eq!(manifest["tools"][0]["input_schema"]["required"][0], "id");
}

#[test]
fn crawl_refuses_private_targets_by_default() {
    let dir = TempDir::new().unwrap();
    docmcp(dir.path())
        .args(["crawl", "http://127.0.0.1:9/docs"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("[Safety] Rejected unsafe seed URL"));
}

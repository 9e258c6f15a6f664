//! Integration tests for `garn install`.
//!
//! These tests use a mock npm registry to avoid network calls.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::process::{Command, Output};
use std::sync::Arc;
use std::thread;
use tar::Builder;
use tempfile::TempDir;

/// name -> version -> archive
type Packages = Arc<BTreeMap<String, BTreeMap<String, Vec<u8>>>>;

fn garn() -> Command {
    Command::new(env!("CARGO_BIN_EXE_garn"))
}

/// Create a package archive from a manifest and `(path, contents, mode)` files.
fn create_test_tarball(manifest: &serde_json::Value, files: &[(&str, &str, u32)]) -> Vec<u8> {
    let pkg_json = serde_json::to_string(manifest).unwrap();

    let mut tar_bytes = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_bytes);

        let mut header = tar::Header::new_gnu();
        header.set_path("package/package.json").unwrap();
        header.set_size(pkg_json.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, pkg_json.as_bytes()).unwrap();

        for (path, contents, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(format!("package/{path}")).unwrap();
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append(&header, contents.as_bytes()).unwrap();
        }

        builder.finish().unwrap();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

/// The packages every test registry serves.
fn sample_packages() -> Packages {
    let mut packages: BTreeMap<String, BTreeMap<String, Vec<u8>>> = BTreeMap::new();
    for version in ["1.0.0", "1.1.0", "1.1.3", "2.0.0"] {
        packages.entry("left-pad".to_string()).or_default().insert(
            version.to_string(),
            create_test_tarball(
                &serde_json::json!({"name": "left-pad", "version": version}),
                &[("index.js", "module.exports = pad;", 0o644)],
            ),
        );
    }
    packages.entry("foo-pkg".to_string()).or_default().insert(
        "1.0.0".to_string(),
        create_test_tarball(
            &serde_json::json!({
                "name": "foo-pkg",
                "version": "1.0.0",
                "bin": {"foo": "bin/foo.js"},
                "dependencies": {"left-pad": "^2.0.0"},
                "scripts": {"postinstall": "echo built"}
            }),
            &[("bin/foo.js", "#!/usr/bin/env node\n", 0o644)],
        ),
    );
    Arc::new(packages)
}

async fn handle_packument(Path(name): Path<String>, State(packages): State<Packages>) -> Response {
    let Some(versions) = packages.get(&name) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let latest = versions.keys().last().cloned().unwrap_or_default();
    let versions: serde_json::Map<String, serde_json::Value> = versions
        .keys()
        .map(|v| (v.clone(), serde_json::json!({"name": name, "version": v})))
        .collect();
    let packument = serde_json::json!({
        "name": name,
        "dist-tags": {"latest": latest},
        "versions": versions,
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&packument).unwrap(),
    )
        .into_response()
}

async fn handle_tarball(
    Path((name, tarball)): Path<(String, String)>,
    State(packages): State<Packages>,
) -> Response {
    // Tarball format: name-version.tgz
    let version = tarball
        .strip_prefix(&format!("{name}-"))
        .and_then(|s| s.strip_suffix(".tgz"))
        .unwrap_or("");

    match packages.get(&name).and_then(|v| v.get(version)) {
        Some(archive) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/gzip")],
            Body::from(archive.clone()),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Start the mock registry on an ephemeral port and return its base URL.
fn start_mock_registry() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let base_url = format!("http://{}/", listener.local_addr().unwrap());

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = Router::new()
                .route("/:name", get(handle_packument))
                .route("/:name/-/:tarball", get(handle_tarball))
                .with_state(sample_packages());
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    base_url
}

fn create_test_project(deps: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let deps: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|(n, r)| ((*n).to_string(), serde_json::json!(r)))
        .collect();
    let package_json = serde_json::json!({
        "name": "test-project",
        "version": "1.0.0",
        "dependencies": deps,
    });
    fs::write(
        dir.path().join("package.json"),
        serde_json::to_string_pretty(&package_json).unwrap(),
    )
    .unwrap();
    dir
}

fn run_install(dir: &TempDir, registry: &str, json: bool) -> Output {
    let mut cmd = garn();
    cmd.arg("install")
        .arg("--cwd")
        .arg(dir.path())
        .arg("--registry")
        .arg(registry)
        .env_remove("RUST_LOG");
    if json {
        cmd.arg("--json");
    }
    cmd.output().expect("Failed to run garn install")
}

fn installed_version(dir: &std::path::Path) -> String {
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("package.json")).unwrap()).unwrap();
    manifest["version"].as_str().unwrap().to_string()
}

#[cfg(unix)]
#[test]
fn test_install_resolves_and_nests() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("left-pad", "^1.0.0"), ("foo-pkg", "1.0.0")]);

    let output = run_install(&project, &registry, true);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");

    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["ok"], true);
    let children = result["tree"]["children"].as_array().unwrap();
    assert_eq!(children[0]["name"], "foo-pkg");
    assert_eq!(children[0]["children"][0]["reference"], "2.0.0");
    assert_eq!(children[1]["name"], "left-pad");
    assert_eq!(children[1]["reference"], "1.1.3");

    let nm = project.path().join("node_modules");
    assert_eq!(installed_version(&nm.join("left-pad")), "1.1.3");
    assert_eq!(
        installed_version(&nm.join("foo-pkg/node_modules/left-pad")),
        "2.0.0"
    );
    assert!(nm.join("left-pad/index.js").exists());

    assert_eq!(
        fs::read_link(nm.join(".bin/foo")).unwrap(),
        std::path::PathBuf::from("../foo-pkg/bin/foo.js")
    );
}

#[cfg(unix)]
#[test]
fn test_install_prints_progress() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("foo-pkg", "^1.0.0")]);

    let output = run_install(&project, &registry, false);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");

    assert!(stdout.contains("Resolving packages..."));
    assert!(stdout.contains("Linking dependencies..."));
    assert!(stdout.contains("Running postinstall script for foo-pkg@1.0.0: echo built"));
    assert!(stdout.contains("Output: built"));
}

#[test]
fn test_install_unknown_package_fails() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("does-not-exist", "^1.0.0")]);

    let output = run_install(&project, &registry, true);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["ok"], false);
    assert_eq!(result["error"]["code"], "PKG_REGISTRY_ERROR");
    assert!(!project.path().join("node_modules").exists());
}

#[test]
fn test_install_unsatisfiable_range_fails() {
    let registry = start_mock_registry();
    let project = create_test_project(&[("left-pad", "^3.0.0")]);

    let output = run_install(&project, &registry, true);
    assert!(!output.status.success());

    let result: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(result["error"]["code"], "PKG_NO_SATISFYING_VERSION");
}

#[test]
fn test_install_without_manifest_fails() {
    let registry = start_mock_registry();
    let dir = tempfile::tempdir().unwrap();

    let output = run_install(&dir, &registry, true);
    assert!(!output.status.success());

    let result: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(result["error"]["code"], "PKG_MANIFEST_NOT_FOUND");
}

#[test]
fn test_version_command() {
    let output = garn().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("garn "));
}

use archmap_manifest::{HttpMethod, Manifest};
use archmap_scanner::{ScanConfig, ScanError, ScanSession, CONFIG_FILE_NAME, DEFAULT_CACHE_FILE};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const USERS_APP: &str = r#"from fastapi import FastAPI
import requests

app = FastAPI()

@app.get("/users/{id}")
def get_user(id: int):
    return requests.get("http://billing/invoices")
"#;

const WEB_SERVER: &str = r#"const express = require('express');
const app = express();

app.post('/login', login);
axios.get('http://users/users/1');
"#;

fn setup_repo() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    fs::create_dir_all(root.join("services/users")).unwrap();
    fs::create_dir_all(root.join("services/web")).unwrap();
    fs::write(root.join("services/users/app.py"), USERS_APP).unwrap();
    fs::write(root.join("services/web/server.js"), WEB_SERVER).unwrap();
    fs::write(root.join("README.md"), "# shop\n").unwrap();
    temp
}

fn scan(root: &Path) -> archmap_scanner::ScanReport {
    let config = ScanConfig {
        repo_name: Some("shop".to_string()),
        ..ScanConfig::default()
    };
    ScanSession::new(root, config).unwrap().run().unwrap()
}

fn written_manifest(root: &Path) -> Manifest {
    Manifest::load_json(&root.join("archmap-manifest.json"))
        .unwrap()
        .expect("manifest written")
}

fn endpoint_paths(manifest: &Manifest) -> Vec<String> {
    let mut paths: Vec<String> = manifest.endpoints().iter().map(|e| e.path.clone()).collect();
    paths.sort();
    paths
}

#[test]
fn first_scan_analyzes_and_second_scan_skips_everything() {
    let temp = setup_repo();
    let root = temp.path();

    let first = scan(root);
    assert_eq!(first.files_analyzed, 2);
    assert_eq!(first.files_unchanged, 0);
    assert_eq!(first.files_unsupported, 1);
    assert_eq!(first.services, 2);
    assert_eq!(first.endpoints, 2);
    assert_eq!(first.edges, 2);
    assert!(root.join(DEFAULT_CACHE_FILE).is_file());

    let manifest = written_manifest(root);
    assert_eq!(manifest.repo, "shop");
    assert_eq!(manifest.languages(), ["python", "javascript"]);
    assert_eq!(manifest.scan_metadata.files_analyzed, 2);
    assert_eq!(manifest.scan_metadata.files_skipped, 1);
    let get_user = manifest
        .endpoints()
        .iter()
        .find(|e| e.path == "/users/{id}")
        .expect("fastapi route");
    assert_eq!(get_user.method, HttpMethod::Get);
    assert_eq!(get_user.service, "users");
    assert_eq!(get_user.line, Some(6));

    let second = scan(root);
    assert_eq!(second.files_analyzed, 0);
    assert_eq!(second.files_unchanged, 2);
    assert_eq!(second.files_removed, 0);
    assert_eq!(second.cache.hits, 2);
    assert_eq!(second.endpoints, 2);
    assert_eq!(second.edges, 2);
    assert_eq!(endpoint_paths(&written_manifest(root)), endpoint_paths(&manifest));
}

#[test]
fn modified_file_is_reparsed_and_its_old_entities_replaced() {
    let temp = setup_repo();
    let root = temp.path();
    scan(root);

    let app = root.join("services/users/app.py");
    fs::write(
        &app,
        format!("{USERS_APP}\n@app.delete(\"/users/{{id}}\")\ndef delete_user(id: int):\n    pass\n"),
    )
    .unwrap();

    let report = scan(root);
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(report.files_unchanged, 1);

    let manifest = written_manifest(root);
    assert_eq!(endpoint_paths(&manifest), vec!["/login", "/users/{id}", "/users/{id}"]);
    let users_file = app.to_string_lossy().into_owned();
    let from_users = manifest
        .endpoints()
        .iter()
        .filter(|e| e.is_from_file(&users_file))
        .count();
    assert_eq!(from_users, 2, "old entities must not be duplicated");
}

#[test]
fn deleted_file_entities_disappear() {
    let temp = setup_repo();
    let root = temp.path();
    scan(root);

    let server = root.join("services/web/server.js");
    fs::remove_file(&server).unwrap();

    let report = scan(root);
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_unchanged, 1);

    let manifest = written_manifest(root);
    let server = server.to_string_lossy().into_owned();
    assert!(!manifest.contains_file(&server));
    assert_eq!(endpoint_paths(&manifest), vec!["/users/{id}"]);
    let web = manifest.find_service("web").expect("services are kept");
    assert_eq!(web.file_count(), 0);
}

#[test]
fn full_scan_ignores_previous_state() {
    let temp = setup_repo();
    let root = temp.path();
    scan(root);

    let config = ScanConfig {
        incremental: false,
        ..ScanConfig::default()
    };
    let report = ScanSession::new(root, config).unwrap().run().unwrap();
    assert_eq!(report.files_analyzed, 2);
    assert_eq!(report.files_unchanged, 0);
    assert_eq!(report.endpoints, 2);
}

#[test]
fn corrupt_cache_and_manifest_start_fresh() {
    let temp = setup_repo();
    let root = temp.path();
    scan(root);

    fs::write(root.join(DEFAULT_CACHE_FILE), b"garbage").unwrap();
    fs::write(root.join("archmap-manifest.json"), "[1, 2").unwrap();

    let report = scan(root);
    assert_eq!(report.files_analyzed, 2);
    assert_eq!(report.endpoints, 2);
    assert_eq!(written_manifest(root).endpoints().len(), 2);
}

#[test]
fn cache_disabled_still_writes_manifest() {
    let temp = setup_repo();
    let root = temp.path();
    let config = ScanConfig {
        cache_file: None,
        ..ScanConfig::default()
    };

    let report = ScanSession::new(root, config.clone()).unwrap().run().unwrap();
    assert_eq!(report.files_analyzed, 2);
    assert!(!root.join(DEFAULT_CACHE_FILE).exists());

    // without a persisted cache every run re-extracts
    let again = ScanSession::new(root, config).unwrap().run().unwrap();
    assert_eq!(again.files_analyzed, 2);
    assert_eq!(again.endpoints, 2);
}

#[test]
fn config_file_narrows_the_scan() {
    let temp = setup_repo();
    let root = temp.path();
    fs::write(
        root.join(CONFIG_FILE_NAME),
        "repo_name = \"shop-py\"\noutput = \"out/map.json\"\n\n[walker]\nextensions = [\"py\"]\n",
    )
    .unwrap();

    let config = ScanConfig::discover(root).unwrap();
    let report = ScanSession::new(root, config).unwrap().run().unwrap();
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(report.output, root.join("out/map.json"));

    let manifest = Manifest::load_json(&root.join("out/map.json")).unwrap().unwrap();
    assert_eq!(manifest.repo, "shop-py");
    assert_eq!(manifest.languages(), ["python"]);
}

#[test]
fn scanner_state_is_never_counted_as_source() {
    let temp = setup_repo();
    let root = temp.path();
    // a [walker] table replaces the default ignore list
    fs::write(
        root.join(CONFIG_FILE_NAME),
        "[walker]\nmax_depth = 8\nextra_ignores = []\n",
    )
    .unwrap();

    let first = ScanSession::new(root, ScanConfig::discover(root).unwrap())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(first.files_unsupported, 2, "README.md and archmap.toml");

    let second = ScanSession::new(root, ScanConfig::discover(root).unwrap())
        .unwrap()
        .run()
        .unwrap();
    assert!(root.join(DEFAULT_CACHE_FILE).is_file());
    assert_eq!(second.files_unsupported, 2);
    assert_eq!(second.files_unchanged, 2);
    assert_eq!(second.files_skipped(), 4);
    assert_eq!(written_manifest(root).scan_metadata.files_skipped, 4);
}

#[test]
fn missing_root_fails_the_scan() {
    let temp = TempDir::new().unwrap();
    let mut session = ScanSession::new(temp.path().join("nope"), ScanConfig::default()).unwrap();
    assert!(matches!(session.run(), Err(ScanError::Walk(_))));
}

#[test]
fn invalid_config_is_rejected_before_scanning() {
    let mut config = ScanConfig::default();
    config.extractor.max_parsers_per_grammar = 0;
    assert!(ScanSession::new(".", config).is_err());
}

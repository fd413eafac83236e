//! 端到端测试：启动、同步、退出还原，以及试运行输出

use std::path::Path;
use std::time::Duration;

use guber::hosts::backup::backup_path_for;
use guber::{Config, Guber, GuberError, HostsFile};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGINAL: &str = "# managed by ops\n127.0.0.1 localhost\n";

fn config(server: &MockServer, hosts: &Path) -> Config {
    let yaml = format!(
        r#"
watch:
  poll_interval: 1
hosts:
  path: {hosts}
service:
  - names: [order, user]
    env: dev
    nacos:
      addr: {addr}
      username: nacos
      password: nacos
"#,
        hosts = hosts.display(),
        addr = server.uri(),
    );
    Config::from_yaml_str(&yaml).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/nacos/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "tok",
            "tokenTtl": 18000,
            "globalAdmin": false
        })))
        .mount(server)
        .await;
}

async fn mount_service(server: &MockServer, service: &str, ips: &[&str]) {
    let hosts: Vec<_> = ips
        .iter()
        .map(|ip| json!({"ip": ip, "port": 8080, "healthy": true, "metadata": {}}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/nacos/v1/ns/instance/list"))
        .and(query_param("serviceName", service))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": service,
            "hosts": hosts
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_start_sync_and_restore() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_service(&server, "order", &["10.0.0.1", "10.0.0.2"]).await;
    mount_service(&server, "user", &["10.0.0.3"]).await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("hosts");
    std::fs::write(&hosts_path, ORIGINAL).unwrap();

    let guber = Guber::start(&config(&server, &hosts_path)).await.unwrap();
    assert!(backup_path_for(&hosts_path).exists());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let hosts = HostsFile::load(&hosts_path).await.unwrap();
    assert_eq!(hosts.hosts_for("order.dev"), vec!["10.0.0.1", "10.0.0.2"]);
    assert_eq!(hosts.hosts_for("user.dev"), vec!["10.0.0.3"]);

    guber.close_with_err(None);
    tokio::time::timeout(Duration::from_secs(5), guber.wait_closed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(std::fs::read_to_string(&hosts_path).unwrap(), ORIGINAL);
    assert!(!backup_path_for(&hosts_path).exists());
}

#[tokio::test]
async fn test_close_error_is_reported() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("hosts");
    std::fs::write(&hosts_path, ORIGINAL).unwrap();

    let guber = Guber::start(&config(&server, &hosts_path)).await.unwrap();
    guber.close_with_err(Some(anyhow::anyhow!("fatal")));

    let err = tokio::time::timeout(Duration::from_secs(5), guber.wait_closed())
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.to_string(), "fatal");
    assert_eq!(std::fs::read_to_string(&hosts_path).unwrap(), ORIGINAL);
}

#[tokio::test]
async fn test_start_fails_on_login_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nacos/v1/auth/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("hosts");
    std::fs::write(&hosts_path, ORIGINAL).unwrap();

    let err = Guber::start(&config(&server, &hosts_path))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GuberError::Auth { .. }));
    assert!(!backup_path_for(&hosts_path).exists());
}

#[tokio::test]
async fn test_start_fails_on_missing_hosts() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("missing");

    let err = Guber::start(&config(&server, &hosts_path))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GuberError::HostsLoad { .. }));
}

#[tokio::test]
async fn test_status_report() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_service(&server, "order", &["10.0.0.1", "10.0.0.2"]).await;
    Mock::given(method("GET"))
        .and(path("/nacos/v1/ns/instance/list"))
        .and(query_param("serviceName", "user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("hosts");
    std::fs::write(&hosts_path, ORIGINAL).unwrap();

    let report = Guber::status(&config(&server, &hosts_path)).await;
    assert_eq!(
        report,
        format!(
            "nacos: {}\n  order: [10.0.0.1, 10.0.0.2]\n  user: error\n",
            server.uri()
        )
    );
    // 试运行不修改 hosts
    assert_eq!(std::fs::read_to_string(&hosts_path).unwrap(), ORIGINAL);
}

#[tokio::test]
async fn test_status_report_login_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nacos/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nacos/v1/ns/instance/list"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let report = Guber::status(&config(&server, &dir.path().join("hosts"))).await;
    assert!(report.starts_with(&format!("nacos: {},error\n", server.uri())));
    assert!(report.contains("  order: error\n"));
}

//! 配置加载测试

use std::io::Write;
use std::path::Path;

use guber::config::LogFormat;
use guber::{Config, GuberError, KeepFilter};

const YAML: &str = r#"
log:
  level: debug
  format: json
watch:
  poll_interval: 5
hosts:
  path: /tmp/guber-hosts
service:
  - names: [order, user]
    env: dev
    nacos:
      addr: http://127.0.0.1:8848
      username: nacos
      password: nacos
    keep:
      - key: zone
        value: a
      - key: canary
  - names: [order]
    env: test
    nacos:
      addr: http://10.0.0.2:8848
"#;

const TOML: &str = r#"
[watch]
token_refresh_interval = 600

[[service]]
names = ["pay"]
env = "prod"

[service.nacos]
addr = "https://nacos.example.com"
username = "admin"
password = "secret"
api_prefix = ""

[[service.keep]]
key = "group"
value = "blue"
"#;

#[test]
fn test_yaml_config() {
    let config = Config::from_yaml_str(YAML).unwrap();

    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.format, LogFormat::Json);
    assert_eq!(config.watch.poll_interval, 5);
    assert_eq!(config.watch.token_refresh_interval, 1000);
    assert_eq!(config.watch.request_timeout, 10);
    assert_eq!(
        config.hosts.resolved_path(),
        Path::new("/tmp/guber-hosts").to_path_buf()
    );

    assert_eq!(config.apps.len(), 2);
    let dev = &config.apps[0];
    assert_eq!(dev.names, vec!["order", "user"]);
    assert_eq!(dev.env, "dev");
    assert_eq!(dev.nacos.addr, "http://127.0.0.1:8848");
    assert_eq!(dev.nacos.api_prefix, "/nacos/v1");
    assert_eq!(
        dev.keep,
        vec![
            KeepFilter {
                key: "zone".to_string(),
                value: "a".to_string()
            },
            KeepFilter {
                key: "canary".to_string(),
                value: String::new()
            },
        ]
    );

    let test = &config.apps[1];
    assert!(test.keep.is_empty());
    assert!(test.nacos.username.is_empty());
}

#[test]
fn test_toml_config() {
    let config = Config::from_toml_str(TOML).unwrap();

    assert_eq!(config.log.level, "info");
    assert_eq!(config.log.format, LogFormat::Text);
    assert_eq!(config.watch.poll_interval, 10);
    assert_eq!(config.watch.token_refresh_interval, 600);
    assert_eq!(config.apps[0].nacos.api_prefix, "");
    assert_eq!(config.apps[0].keep[0].value, "blue");
}

#[test]
fn test_load_from_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let yaml_path = dir.path().join("guber.yml");
    std::fs::File::create(&yaml_path)
        .unwrap()
        .write_all(YAML.as_bytes())
        .unwrap();
    let (config, used) = Config::load(Some(&yaml_path)).unwrap();
    assert_eq!(used, yaml_path);
    assert_eq!(config.apps.len(), 2);

    let toml_path = dir.path().join("guber.toml");
    std::fs::write(&toml_path, TOML).unwrap();
    let config = Config::load_from_file(&toml_path).unwrap();
    assert_eq!(config.apps[0].env, "prod");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(matches!(err, GuberError::Config(_)));
}

#[test]
fn test_unknown_field_rejected() {
    let yaml = r#"
service:
  - names: [order]
    env: dev
    nacos:
      addr: http://127.0.0.1:8848
      namespace: public
"#;
    let err = Config::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, GuberError::Config(_)));
}

#[test]
fn test_validation_errors() {
    let cases = [
        // 没有环境
        "service: []\n",
        // 地址没有协议
        "service:\n  - names: [a]\n    env: dev\n    nacos:\n      addr: 127.0.0.1:8848\n",
        // 空环境名
        "service:\n  - names: [a]\n    env: ''\n    nacos:\n      addr: http://h:1\n",
        // 没有服务
        "service:\n  - names: []\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 重复跟踪
        "service:\n  - names: [a, a]\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // keep 的 key 为空
        "service:\n  - names: [a]\n    env: dev\n    nacos:\n      addr: http://h:1\n    keep:\n      - key: ''\n",
        // 间隔为 0
        "watch:\n  poll_interval: 0\nservice:\n  - names: [a]\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 间隔超过上限
        "watch:\n  token_refresh_interval: 99999999999\nservice:\n  - names: [a]\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 服务名含空格，写入 hosts 后会变成两个主机名
        "service:\n  - names: ['order svc']\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 服务名前后空白
        "service:\n  - names: [' order']\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 服务名含注释符
        "service:\n  - names: ['order#x']\n    env: dev\n    nacos:\n      addr: http://h:1\n",
        // 环境名含空白
        "service:\n  - names: [order]\n    env: \"dev\\tprod\"\n    nacos:\n      addr: http://h:1\n",
    ];

    for yaml in cases {
        let result = Config::from_yaml_str(yaml);
        assert!(
            matches!(result, Err(GuberError::Config(_))),
            "expected config error for:\n{}",
            yaml
        );
    }
}

#[test]
fn test_same_service_in_different_envs_is_allowed() {
    let yaml = r#"
service:
  - names: [order]
    env: dev
    nacos:
      addr: http://h:1
  - names: [order]
    env: test
    nacos:
      addr: http://h:1
"#;
    assert!(Config::from_yaml_str(yaml).is_ok());
}

#[test]
fn test_watch_durations() {
    let config = Config::from_toml_str(TOML).unwrap();
    assert_eq!(
        config.watch.poll_interval(),
        std::time::Duration::from_secs(10)
    );
    assert_eq!(
        config.watch.token_refresh_interval(),
        std::time::Duration::from_secs(600)
    );
}

#[test]
fn test_hostname_safe_names_accepted() {
    let yaml = r#"
watch:
  poll_interval: 2592000
service:
  - names: [order-api, user_svc, pay.v2]
    env: dev-01
    nacos:
      addr: http://h:1
"#;
    let config = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(config.apps[0].names.len(), 3);
    assert_eq!(config.watch.poll_interval, guber::config::MAX_INTERVAL_SECS);
}

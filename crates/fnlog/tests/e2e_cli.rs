use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use fnlog_core::producer::{CallArgs, FunctionLog, ProducerConfig, timed_with_args};
use opentelemetry_proto::tonic::collector::logs::v1::logs_service_client::LogsServiceClient;
use prost::Message;
use serial_test::serial;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_fnlog")
}

struct Server {
    child: Child,
    grpc_port: u16,
    http_port: u16,
    query_port: u16,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_server(capacity: usize) -> Server {
    let grpc_port = free_port();
    let http_port = free_port();
    let query_port = free_port();

    let child = Command::new(bin())
        .arg("run")
        .arg("--otlp-grpc-addr")
        .arg(format!("127.0.0.1:{grpc_port}"))
        .arg("--otlp-http-addr")
        .arg(format!("127.0.0.1:{http_port}"))
        .arg("--query-http-addr")
        .arg(format!("127.0.0.1:{query_port}"))
        .arg("--capacity")
        .arg(capacity.to_string())
        .env("FNLOG_CONFIG", "/nonexistent/fnlog.toml")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    Server {
        child,
        grpc_port,
        http_port,
        query_port,
    }
}

async fn wait_ready(server: &mut Server) {
    let client = reqwest::Client::new();
    for _ in 0..100 {
        assert!(
            server.child.try_wait().unwrap().is_none(),
            "fnlog exited early"
        );
        if client
            .get(format!("http://127.0.0.1:{}/api/stats", server.query_port))
            .send()
            .await
            .is_ok()
            && client
                .post(format!("http://127.0.0.1:{}/v1/logs", server.http_port))
                .header("content-type", "application/x-protobuf")
                .body(Vec::<u8>::new())
                .send()
                .await
                .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("fnlog endpoints not ready");
}

fn cli(server: &Server, args: &[&str]) -> std::process::Output {
    Command::new(bin())
        .args(args)
        .arg("--addr")
        .arg(format!("127.0.0.1:{}", server.query_port))
        .output()
        .unwrap()
}

fn cli_json(server: &Server, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = cli(server, &full);
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[tokio::test]
#[serial]
async fn e2e_protobuf_ingest_and_cli_queries() {
    let mut server = spawn_server(1000);
    wait_ready(&mut server).await;
    // The readiness probe posts an empty (valid) protobuf request.
    let baseline = cli_json(&server, &["stats"])["total_logs"].as_u64().unwrap();
    assert_eq!(baseline, 0);

    let cfg = ProducerConfig {
        include_args: true,
        include_result: true,
        ..ProducerConfig::default()
    };
    let call = CallArgs::positional(&[40, 2]);
    let run = timed_with_args::<_, String, _>(&cfg, "compute_total", "orders", call, || Ok(42));
    let req = testkit::logs_request(vec![
        testkit::log_record(&run.body, vec![testkit::log_data_attr(&run.log)]),
        testkit::log_record("x|WARN|doThing|12.5ms|hello", vec![]),
    ]);

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/v1/logs", server.http_port))
        .header("content-type", "application/x-protobuf")
        .body(req.encode_to_vec())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["logs_added"], 2);
    assert_eq!(body["total_logs_in_storage"], 2);

    let logs = cli_json(&server, &["logs", "--function", "doThing"]);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["level"], "WARN");
    assert_eq!(logs[0]["duration_ms"], 12.5);
    assert_eq!(logs[0]["message"], "hello");

    let id = logs[0]["id"].as_str().unwrap();
    let entry = cli_json(&server, &["get", id]);
    assert_eq!(entry["function_name"], "doThing");
    assert_eq!(entry["module"], testkit::SERVICE_NAME);

    let computed = cli_json(&server, &["logs", "--function", "compute_total"]);
    assert_eq!(computed[0]["args"], "[40, 2]");
    assert_eq!(computed[0]["result"], "42");

    let output = cli(&server, &["logs", "--function", "compute_total"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("compute_total"));
    assert!(stdout.contains("-- 1 logs --"));

    let stats = cli_json(&server, &["stats"]);
    assert_eq!(stats["total_logs"], 2);
    assert_eq!(stats["unique_functions"], 2);

    // Without --addr the client resolves the query address from the environment.
    let output = Command::new(bin())
        .args(["--json", "stats"])
        .env("FNLOG_QUERY_HTTP_ADDR", format!("127.0.0.1:{}", server.query_port))
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_logs"], 2);
}

#[tokio::test]
#[serial]
async fn e2e_gzip_json_ingest_and_preview() {
    let mut server = spawn_server(1000);
    wait_ready(&mut server).await;

    let log = FunctionLog::success("render", "views", "INFO", 7.25).with_result("<html>");
    let json = testkit::json_logs_request(&[("rendered", Some(&log))]);
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/v1/logs", server.http_port))
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body(testkit::gzip(json.to_string().as_bytes()))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let previews = cli_json(&server, &["logs", "--preview"]);
    let first = &previews.as_array().unwrap()[0];
    assert_eq!(first["function_name"], "render");
    assert_eq!(first["duration_ms"], 7.25);
    assert!(first.get("id").is_none());
}

#[tokio::test]
#[serial]
async fn e2e_malformed_body_is_rejected() {
    let mut server = spawn_server(1000);
    wait_ready(&mut server).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/v1/logs", server.http_port))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");

    let output = cli(&server, &["get", "not-an-id"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("404"));
}

#[tokio::test]
#[serial]
async fn e2e_grpc_ingest() {
    let mut server = spawn_server(1000);
    wait_ready(&mut server).await;

    let endpoint = format!("http://127.0.0.1:{}", server.grpc_port);
    let mut client = None;
    for _ in 0..50 {
        if let Ok(c) = LogsServiceClient::connect(endpoint.clone()).await {
            client = Some(c);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let mut client = client.expect("gRPC endpoint not ready");
    let log = FunctionLog::failure(
        "divide",
        "math",
        0.5,
        "division by zero".into(),
        "ZeroDivisionError".into(),
    );
    client
        .export(tonic::Request::new(testkit::logs_request(vec![
            testkit::log_record("failed", vec![testkit::log_data_attr(&log)]),
        ])))
        .await
        .unwrap();

    let logs = cli_json(&server, &["logs", "--function", "divide"]);
    assert_eq!(logs[0]["status"], "error");
    assert_eq!(logs[0]["error_type"], "ZeroDivisionError");
}

#[tokio::test]
#[serial]
async fn e2e_capacity_bounds_concurrent_ingest() {
    const CAPACITY: usize = 100;
    const BATCHES: usize = 20;
    const PER_BATCH: usize = 25;

    let mut server = spawn_server(CAPACITY);
    wait_ready(&mut server).await;

    let client = reqwest::Client::new();
    let mut tasks = tokio::task::JoinSet::new();
    for batch in 0..BATCHES {
        let client = client.clone();
        let url = format!("http://127.0.0.1:{}/v1/logs", server.http_port);
        tasks.spawn(async move {
            let records = (0..PER_BATCH)
                .map(|i| {
                    let body = format!("t|INFO|fn{}|1ms|batch={batch} idx={i}", i % 4);
                    testkit::log_record(&body, vec![])
                })
                .collect();
            let resp = client
                .post(url)
                .header("content-type", "application/x-protobuf")
                .body(testkit::logs_request(records).encode_to_vec())
                .send()
                .await
                .unwrap();
            assert!(resp.status().is_success());
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    let stats = cli_json(&server, &["stats"]);
    assert_eq!(stats["total_logs"], CAPACITY);
    assert_eq!(stats["unique_functions"], 4);

    let logs = cli_json(&server, &["logs", "--limit", "1000"]);
    assert_eq!(logs.as_array().unwrap().len(), CAPACITY);
}

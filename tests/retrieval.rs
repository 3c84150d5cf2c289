mod common;

use std::time::{Duration, Instant};

use rsitelens::{
    AnalysisConfig, BackoffPolicy, RelayEndpoint, RelayFormat, RetrievalErrorKind,
    RetrievalStrategy, Retriever, RetrieverConfig,
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{init_logger, LANDING_PAGE};

/// 直连必然失败的目标（端口 1 拒绝连接）
const UNREACHABLE: &str = "http://127.0.0.1:1/";

fn raw_relay(server: &MockServer, name: &str) -> RelayEndpoint {
    RelayEndpoint::new(name, format!("{}/{}", server.uri(), name), "url", RelayFormat::Raw)
}

fn relay_config(
    relays: Vec<RelayEndpoint>,
    max_attempts: usize,
    backoff: BackoffPolicy,
) -> RetrieverConfig {
    AnalysisConfig::builder()
        .relays(relays)
        .max_attempts(max_attempts)
        .backoff(backoff)
        .attempt_timeout(Duration::from_secs(2))
        .build()
        .retriever
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_oversized_body_is_capped_while_reading() {
    init_logger();
    let server = MockServer::start().await;
    let served = 1024 * 1024;
    mount(
        &server,
        "/big",
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_bytes(vec![b'a'; served]),
        1,
    )
    .await;

    let config = AnalysisConfig::builder()
        .relays(Vec::new())
        .max_body_bytes(1024)
        .build()
        .retriever;
    let retriever = Retriever::new(config).unwrap();
    let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
    let result = retriever.retrieve(&url).await.unwrap();

    assert!(result.body.len() <= 1024, "body kept {} bytes", result.body.len());
    assert_eq!(result.body.len(), 1024);
    // 传输体积仍按 content-length 计
    assert_eq!(result.transfer_bytes, served as u64);
}

#[tokio::test]
async fn test_attempts_are_capped_regardless_of_relay_count() {
    init_logger();
    let server = MockServer::start().await;
    let names = ["r0", "r1", "r2", "r3", "r4"];
    for (index, name) in names.iter().enumerate() {
        let expected = if index < 2 { 1 } else { 0 };
        mount(&server, &format!("/{}", name), ResponseTemplate::new(502), expected).await;
    }

    let relays = names.iter().map(|name| raw_relay(&server, name)).collect();
    let step = Duration::from_millis(60);
    let retriever = Retriever::new(relay_config(relays, 3, BackoffPolicy::Linear(step))).unwrap();

    let started = Instant::now();
    let err = retriever
        .retrieve(&Url::parse(UNREACHABLE).unwrap())
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.attempts.len(), 3);
    assert_eq!(err.relays_tried, 2);
    assert_eq!(err.kind, RetrievalErrorKind::Unreachable);
    let order: Vec<&str> = err.attempts.iter().map(|a| a.strategy.as_str()).collect();
    assert_eq!(order, vec!["direct", "r0", "r1"]);
    assert_eq!(err.attempts[1].kind, RetrievalErrorKind::HttpError(502));
    // 第一个中继不等待，第二个中继前等待一个步长
    assert!(elapsed >= step, "took {:?}", elapsed);
}

#[tokio::test]
async fn test_first_succeeding_relay_in_order_is_used() {
    init_logger();
    let server = MockServer::start().await;
    mount(&server, "/r0", ResponseTemplate::new(502), 1).await;
    mount(&server, "/r1", ResponseTemplate::new(200).set_body_string("  \n"), 1).await;
    mount(&server, "/r2", ResponseTemplate::new(200).set_body_string(LANDING_PAGE), 1).await;
    mount(&server, "/r3", ResponseTemplate::new(200).set_body_string(LANDING_PAGE), 0).await;

    let relays = ["r0", "r1", "r2", "r3"]
        .iter()
        .map(|name| raw_relay(&server, name))
        .collect();
    let retriever = Retriever::new(relay_config(
        relays,
        4,
        BackoffPolicy::Linear(Duration::from_millis(10)),
    ))
    .unwrap();

    let result = retriever
        .retrieve(&Url::parse(UNREACHABLE).unwrap())
        .await
        .unwrap();

    assert_eq!(
        result.strategy_used,
        RetrievalStrategy::Relay {
            name: "r2".to_string()
        }
    );
    assert_eq!(result.final_url, UNREACHABLE);
    assert_eq!(result.body, LANDING_PAGE.as_bytes());
}

#[tokio::test]
async fn test_malformed_json_envelope_moves_to_next_relay() {
    init_logger();
    let server = MockServer::start().await;
    mount(
        &server,
        "/get",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/json")
            .set_body_string(r#"{"status":{"http_code":200}}"#),
        1,
    )
    .await;
    mount(&server, "/raw", ResponseTemplate::new(200).set_body_string(LANDING_PAGE), 1).await;

    let relays = vec![
        RelayEndpoint::new(
            "envelope",
            format!("{}/get", server.uri()),
            "url",
            RelayFormat::JsonContents,
        ),
        raw_relay(&server, "raw"),
    ];
    let retriever = Retriever::new(relay_config(relays, 3, BackoffPolicy::None)).unwrap();

    let result = retriever
        .retrieve(&Url::parse(UNREACHABLE).unwrap())
        .await
        .unwrap();

    assert_eq!(
        result.strategy_used,
        RetrievalStrategy::Relay {
            name: "raw".to_string()
        }
    );
}

#[tokio::test]
async fn test_well_formed_json_envelope_is_unwrapped() {
    init_logger();
    let server = MockServer::start().await;
    let envelope = serde_json::json!({ "contents": LANDING_PAGE }).to_string();
    mount(&server, "/get", ResponseTemplate::new(200).set_body_string(envelope), 1).await;

    let relays = vec![RelayEndpoint::new(
        "envelope",
        format!("{}/get", server.uri()),
        "url",
        RelayFormat::JsonContents,
    )];
    let retriever = Retriever::new(relay_config(relays, 2, BackoffPolicy::None)).unwrap();

    let result = retriever
        .retrieve(&Url::parse(UNREACHABLE).unwrap())
        .await
        .unwrap();

    assert_eq!(result.body, LANDING_PAGE.as_bytes());
    assert_eq!(result.strategy_used.label(), "envelope");
}

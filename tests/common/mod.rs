#![allow(dead_code)]

use std::time::Duration;

use rsitelens::{AnalysisConfig, AnalysisConfigBuilder, BackoffPolicy, RelayEndpoint, RelayFormat};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LANDING_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Acme Widgets - Handmade widgets</title>
  <meta name="description" content="Acme builds handmade widgets for teams that care about quality and detail.">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="canonical" href="https://acme.test/">
  <meta property="og:title" content="Acme Widgets">
  <meta property="og:description" content="Handmade widgets">
  <meta property="og:image" content="https://acme.test/og.png">
  <style>
    :root { --brand: #FF5500; }
    body { font-family: "Inter", sans-serif; color: #333; background: #FFFFFF; margin: 0 16px; }
    .btn { background: #ff5500; padding: 8px 16px; }
    .card { border: 1px solid rgb(255, 255, 255); padding: 16px; }
    @media (min-width: 768px) { .card { padding: 24px; } }
  </style>
  <script src="https://code.jquery.com/jquery-3.6.0.min.js"></script>
</head>
<body>
  <header><nav aria-label="Main"><a href="/">Home</a><a href="/shop">Shop</a></nav></header>
  <main>
    <h1>Widgets</h1>
    <div class="product-card"><h2>Classic</h2><button class="btn">Buy now</button></div>
    <div class="product-card"><h2>Deluxe</h2><button class="btn">Buy now</button></div>
    <img src="/hero.png" alt="Hero">
  </main>
  <footer class="site-footer">Acme</footer>
</body>
</html>"##;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 指向 mock 中继的配置构建器
pub fn config_with_relay(relay_server: &MockServer) -> AnalysisConfigBuilder {
    AnalysisConfig::builder()
        .relays(vec![RelayEndpoint::new(
            "test-relay",
            format!("{}/raw", relay_server.uri()),
            "url",
            RelayFormat::Raw,
        )])
        .backoff(BackoffPolicy::None)
        .attempt_timeout(Duration::from_secs(2))
}

/// 不带中继的配置构建器
pub fn direct_only() -> AnalysisConfigBuilder {
    AnalysisConfig::builder()
        .relays(Vec::new())
        .backoff(BackoffPolicy::None)
        .attempt_timeout(Duration::from_secs(2))
}

pub async fn serve_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("server", "nginx/1.25.3")
                .set_body_string(html),
        )
        .mount(server)
        .await;
}

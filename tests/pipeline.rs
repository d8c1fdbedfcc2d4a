//! Pipeline stages observed from the outside.

use bounce_proxy::ProxyConfig;
use reqwest::{header, StatusCode};

mod common;

const ORIGIN: &str = "https://app.example.com";

#[tokio::test]
async fn quota_exceeded_returns_429_before_core() {
    let (backend, mut seen) =
        common::start_recording_backend(common::http_response("200 OK", &[], "ok")).await;

    let mut config = ProxyConfig::default();
    config.rate_limit.max_requests = 3;
    let (proxy, _shutdown) = common::start_proxy(config).await;
    let client = common::client();
    let url = common::proxy_url(proxy, &format!("http://{}/", backend));

    for expected_remaining in ["2", "1", "0"] {
        let res = client.get(&url).header(header::ORIGIN, ORIGIN).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["ratelimit-remaining"], expected_remaining);
    }

    let res = client.get(&url).header(header::ORIGIN, ORIGIN).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["ratelimit-policy"], "3;w=60");
    assert_eq!(res.headers()["ratelimit-remaining"], "0");
    assert!(res.headers().contains_key(header::RETRY_AFTER));
    assert!(res.headers().contains_key("x-response-time"));
    assert_eq!(
        res.text().await.unwrap(),
        "Too many requests, please try again later."
    );

    for _ in 0..3 {
        assert!(seen.recv().await.is_some());
    }
    assert!(seen.try_recv().is_err());
}

#[tokio::test]
async fn forwarded_for_header_keys_the_limit() {
    let (backend, _seen) =
        common::start_recording_backend(common::http_response("200 OK", &[], "ok")).await;

    let mut config = ProxyConfig::default();
    config.rate_limit.max_requests = 1;
    let (proxy, _shutdown) = common::start_proxy(config).await;
    let client = common::client();
    let url = common::proxy_url(proxy, &format!("http://{}/", backend));

    for client_ip in ["198.51.100.1", "198.51.100.2"] {
        let res = client
            .get(&url)
            .header(header::ORIGIN, ORIGIN)
            .header("x-forwarded-for", client_ip)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "first request from {}", client_ip);
    }

    let res = client
        .get(&url)
        .header(header::ORIGIN, ORIGIN)
        .header("x-forwarded-for", "198.51.100.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn disabled_rate_limit_sets_no_headers() {
    let mut config = ProxyConfig::default();
    config.rate_limit.enabled = false;
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/https%3A%2F%2Fapi.example.com%2F", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(!res.headers().contains_key("ratelimit-limit"));
}

#[tokio::test]
async fn preflight_is_answered_without_upstream() {
    let (backend, mut seen) =
        common::start_recording_backend(common::http_response("200 OK", &[], "ok")).await;
    let (proxy, _shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .request(
            reqwest::Method::OPTIONS,
            common::proxy_url(proxy, &format!("http://{}/items", backend)),
        )
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom");
    let methods = res.headers()[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap().to_string();
    assert!(methods.contains("PUT") && methods.contains("DELETE"));

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(seen.try_recv().is_err());
}

#[tokio::test]
async fn target_cors_headers_are_relayed_verbatim() {
    let (backend, _seen) = common::start_recording_backend(common::http_response(
        "200 OK",
        &[
            ("Access-Control-Allow-Origin", ORIGIN),
            ("Access-Control-Allow-Credentials", "true"),
        ],
        "private",
    ))
    .await;
    let (proxy, _shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}/me", backend)))
        .header(header::ORIGIN, ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let origins: Vec<_> = res
        .headers()
        .get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(origins, vec![ORIGIN.to_string()]);
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn large_bodies_are_compressed_when_negotiated() {
    let body = "bounce ".repeat(1024);
    let (backend, _seen) = common::start_recording_backend(common::http_response(
        "200 OK",
        &[("Content-Type", "text/plain")],
        &body,
    ))
    .await;
    let (proxy, _shutdown) = common::start_proxy(ProxyConfig::default()).await;
    let client = common::client();
    let url = common::proxy_url(proxy, &format!("http://{}/big", backend));

    let res = client
        .get(&url)
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCEPT_ENCODING, "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_ENCODING], "gzip");
    assert!(res.bytes().await.unwrap().len() < body.len());

    let res = client.get(&url).header(header::ORIGIN, ORIGIN).send().await.unwrap();
    assert!(!res.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(res.text().await.unwrap(), body);
}

#[tokio::test]
async fn small_bodies_pass_uncompressed() {
    let (backend, _seen) = common::start_recording_backend(common::http_response(
        "200 OK",
        &[("Content-Type", "application/json")],
        r#"{"ok":true}"#,
    ))
    .await;
    let (proxy, _shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}/v1/ping", backend)))
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCEPT_ENCODING, "gzip")
        .send()
        .await
        .unwrap();
    assert!(!res.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(res.text().await.unwrap(), r#"{"ok":true}"#);
}

#[tokio::test]
async fn upstream_security_headers_win_and_powered_by_is_hidden() {
    let (backend, _seen) = common::start_recording_backend(common::http_response(
        "200 OK",
        &[("X-Frame-Options", "DENY"), ("X-Powered-By", "Express")],
        "page",
    ))
    .await;
    let (proxy, _shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}/", backend)))
        .header(header::ORIGIN, ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["referrer-policy"], "no-referrer");
    assert!(!res.headers().contains_key("x-powered-by"));
    assert!(!res.headers().contains_key("content-security-policy"));
}

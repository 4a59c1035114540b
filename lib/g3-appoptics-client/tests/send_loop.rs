/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use g3_appoptics_client::{
    AppopticsClientConfig, AppopticsProvider, Counter, DeliveryError, FlushError, Gauge,
    Histogram, HttpTransport, MetricIdentifier,
};

/// Base url of `server` carrying the test credentials and a path the
/// client is expected to replace.
fn base_url(server: &MockServer) -> Url {
    let mut url = Url::parse(&server.uri()).unwrap();
    url.set_username("token").unwrap();
    url.set_password(Some("secret")).unwrap();
    url.set_path("/ignored/base");
    url
}

fn measurements_post() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/v1/measurements"))
        .and(header("authorization", "Basic dG9rZW46c2VjcmV0"))
        .and(header("content-type", "application/json"))
}

fn provider(config: AppopticsClientConfig) -> AppopticsProvider {
    AppopticsProvider::new(config.with_label_values([("region", "us"), ("system", "test")]))
        .unwrap()
}

async fn bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| serde_json::from_slice(&req.body).unwrap())
        .collect()
}

#[tokio::test]
async fn send_one_tick() {
    let server = MockServer::start().await;
    measurements_post()
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let p = provider(AppopticsClientConfig::default());
    let labels = ["region", "system"];
    p.new_counter(&MetricIdentifier::new("test.counter").with_labels(labels))
        .add(100.0);
    p.new_gauge(&MetricIdentifier::new("test.gauge").with_labels(labels))
        .set(1000.0);
    let h = p.new_histogram(&MetricIdentifier::new("test.histogram").with_labels(labels));
    for v in [10.0, 50.0, 1000.0] {
        h.observe(v);
    }

    let (sender, receiver) = mpsc::channel(1);
    sender.send(()).await.unwrap();
    drop(sender);
    p.send_loop(receiver, CancellationToken::new(), &base_url(&server))
        .await
        .unwrap();

    let bodies = bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let measurements = bodies[0]["measurements"].as_array().unwrap();
    assert_eq!(measurements.len(), 6);
    let mut names: Vec<&str> = measurements
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        [
            "test.counter",
            "test.gauge",
            "test.histogram.perc50",
            "test.histogram.perc90",
            "test.histogram.perc95",
            "test.histogram.perc99",
        ]
    );
    for m in measurements {
        assert_eq!(m["period"], 60);
        assert_eq!(m["attributes"]["aggregate"], true);
        assert_eq!(m["tags"]["region"], "us");
        assert_eq!(m["tags"]["system"], "test");
        assert_eq!(m["time"].as_i64().unwrap() % 60, 0);
    }
    let value_of = |name: &str| {
        measurements
            .iter()
            .find(|m| m["name"] == name)
            .and_then(|m| m["value"].as_f64())
            .unwrap()
    };
    assert_eq!(value_of("test.counter"), 100.0);
    assert_eq!(value_of("test.gauge"), 1000.0);
    assert_eq!(value_of("test.histogram.perc99"), 1000.0);
}

#[tokio::test]
async fn retry_after_server_error() {
    let server = MockServer::start().await;
    measurements_post()
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    measurements_post()
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let p = provider(AppopticsClientConfig::default().with_retry(1, Duration::from_millis(10)));
    p.new_counter(&MetricIdentifier::new("c")).add(1.0);

    let errors = Arc::new(AtomicUsize::new(0));
    let counted = errors.clone();
    let transport = HttpTransport::new(&base_url(&server), Duration::from_secs(5)).unwrap();
    let send_loop = p
        .new_send_loop(Arc::new(transport))
        .with_error_sink(Arc::new(move |_: &FlushError| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

    let (sender, receiver) = mpsc::channel(1);
    sender.send(()).await.unwrap();
    drop(sender);
    send_loop.run(receiver, CancellationToken::new()).await;

    let bodies = bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn report_server_error() {
    let server = MockServer::start().await;
    measurements_post()
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let p = provider(AppopticsClientConfig::default());
    p.new_counter(&MetricIdentifier::new("c")).add(1.0);

    let transport = HttpTransport::new(&base_url(&server), Duration::from_secs(5)).unwrap();
    let r = p.flush(Arc::new(transport), &CancellationToken::new()).await;
    assert!(matches!(
        r,
        Err(FlushError::Delivery(DeliveryError::UnexpectedStatusCode(503)))
    ));
}

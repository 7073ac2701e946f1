//! End-to-end detection runs against mock query and webhook servers
//!
//! The workspace query API and the webhook are both served by wiremock; the
//! credential source is a fake so no identity endpoint is contacted.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentinel_bruteforce::{
    AccessToken, CredentialError, CredentialProvider, DetectorError, HttpClient, HttpClientConfig,
    LogAnalyticsClient, NotificationStatus, NotifyOutcome, Pipeline, QueryWindow, ReportWriter,
    RunMetrics, SuspiciousSet, WebhookNotifier, codes, exit_code,
};

const WORKSPACE_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

struct StaticToken;

#[async_trait]
impl CredentialProvider for StaticToken {
    fn name(&self) -> &'static str {
        "static token"
    }

    async fn acquire_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new("test-token", Utc::now() + Duration::hours(1)))
    }
}

fn http() -> HttpClient {
    HttpClient::new(HttpClientConfig::default(), None).expect("Failed to create HTTP client")
}

fn query_body(rows: Value) -> Value {
    json!({
        "tables": [{
            "name": "PrimaryResult",
            "columns": [
                { "name": "RemoteIP", "type": "string" },
                { "name": "DeviceName", "type": "string" },
                { "name": "BruteForceAttempts", "type": "long" }
            ],
            "rows": rows
        }]
    })
}

async fn mount_query(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/workspaces/{WORKSPACE_ID}/query")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

fn pipeline(
    query_server: &MockServer,
    webhook_url: Option<String>,
    report_path: &std::path::Path,
) -> Pipeline {
    pipeline_with_notifier(
        query_server,
        WebhookNotifier::new(http(), webhook_url),
        report_path,
    )
}

fn pipeline_with_notifier(
    query_server: &MockServer,
    notifier: WebhookNotifier,
    report_path: &std::path::Path,
) -> Pipeline {
    let query = LogAnalyticsClient::new(
        http(),
        Arc::new(StaticToken),
        query_server.uri(),
        WORKSPACE_ID,
    );
    Pipeline::new(
        Box::new(query),
        notifier,
        ReportWriter::new(report_path),
        50,
        24,
    )
}

#[tokio::test]
async fn test_flagged_ips_are_reported_notified_and_blocked() {
    let query_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("suspicious_failed_logins.csv");

    // The query already applies the threshold; the filter must not drop rows it keeps
    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_json(query_body(json!([
            ["203.0.113.45", "VM-001", 72],
            ["203.0.113.77", "VM-002", 65]
        ]))),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXXX"))
        .and(body_string_contains("72 failed logins from IP 203.0.113.45 on VM-001"))
        .and(body_string_contains("65 failed logins from IP 203.0.113.77 on VM-002"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&webhook_server)
        .await;

    let metrics = RunMetrics::new().unwrap();
    let webhook_url = format!("{}/services/T000/B000/XXXX", webhook_server.uri());
    let summary = pipeline(&query_server, Some(webhook_url), &report_path)
        .with_metrics(metrics.clone())
        .run(Utc::now())
        .await
        .expect("run should succeed");

    assert_eq!(summary.suspicious.len(), 2);
    assert_eq!(summary.notification, NotificationStatus::Sent);
    let blocked: Vec<&str> = summary.actions.iter().map(|a| a.ip.as_str()).collect();
    assert_eq!(blocked, vec!["203.0.113.45", "203.0.113.77"]);

    assert_eq!(
        fs::read_to_string(&report_path).unwrap(),
        "RemoteIP,DeviceName,BruteForceAttempts\n\
         203.0.113.45,VM-001,72\n\
         203.0.113.77,VM-002,65\n"
    );

    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("bruteforce_notifications_total{outcome=\"sent\"} 1"));
    assert!(rendered.contains("bruteforce_suspicious_ips 2"));
}

#[tokio::test]
async fn test_query_sends_window_and_threshold() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/v1/workspaces/{WORKSPACE_ID}/query")))
        .and(body_string_contains("2025-03-13T12:00:00Z/2025-03-14T12:00:00Z"))
        .and(body_string_contains("BruteForceAttempts >= 50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tables": [] })))
        .expect(1)
        .mount(&query_server)
        .await;

    let summary = pipeline(&query_server, None, &dir.path().join("out.csv"))
        .run(now)
        .await
        .unwrap();
    assert!(summary.suspicious.is_empty());
}

#[tokio::test]
async fn test_empty_result_writes_header_and_skips_webhook() {
    let query_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("out.csv");

    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_json(query_body(json!([]))),
    )
    .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let summary = pipeline(&query_server, Some(webhook_server.uri()), &report_path)
        .run(Utc::now())
        .await
        .unwrap();

    assert!(summary.suspicious.is_empty());
    assert!(summary.actions.is_empty());
    assert_eq!(summary.notification, NotificationStatus::Skipped);
    assert_eq!(
        fs::read_to_string(&report_path).unwrap(),
        "RemoteIP,DeviceName,BruteForceAttempts\n"
    );
}

#[tokio::test]
async fn test_webhook_failure_does_not_stop_the_run() {
    let query_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("out.csv");

    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_json(query_body(json!([
            ["198.51.100.23", "VM-004", 120]
        ]))),
    )
    .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&webhook_server)
        .await;

    let summary = pipeline(&query_server, Some(webhook_server.uri()), &report_path)
        .run(Utc::now())
        .await
        .expect("notification failure must not fail the run");

    match &summary.notification {
        NotificationStatus::Failed(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("internal error"));
        }
        other => panic!("expected failed notification, got {other:?}"),
    }
    assert_eq!(summary.actions.len(), 1);
    assert!(
        fs::read_to_string(&report_path)
            .unwrap()
            .contains("198.51.100.23,VM-004,120")
    );
}

#[tokio::test]
async fn test_quiet_window_posts_no_activity_message_when_enabled() {
    let webhook_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("No suspicious activity"))
        .and(body_string_contains("past 24h"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&webhook_server)
        .await;

    let notifier = WebhookNotifier::new(http(), Some(format!("{}/hook", webhook_server.uri())))
        .with_notify_on_empty(true);
    let window = QueryWindow::trailing(24, Utc::now());

    let outcome = notifier
        .notify(&SuspiciousSet::default(), &window)
        .await
        .unwrap();
    assert_eq!(outcome, NotifyOutcome::Sent);
}

#[tokio::test]
async fn test_empty_run_with_notify_on_empty_reports_sent() {
    let query_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_json(query_body(json!([]))),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_string_contains("No suspicious activity"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook_server)
        .await;

    let notifier =
        WebhookNotifier::new(http(), Some(webhook_server.uri())).with_notify_on_empty(true);
    let summary = pipeline_with_notifier(&query_server, notifier, &dir.path().join("out.csv"))
        .run(Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.notification, NotificationStatus::Sent);
    assert!(summary.actions.is_empty());
}

#[tokio::test]
async fn test_unreachable_webhook_is_notification_error() {
    // Nothing listens on port 1
    let notifier = WebhookNotifier::new(http(), Some("http://127.0.0.1:1/hook".to_string()))
        .with_notify_on_empty(true);
    let window = QueryWindow::trailing(24, Utc::now());

    let err = notifier
        .notify(&SuspiciousSet::default(), &window)
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::Notification(_)));
    assert!(!err.is_fatal());
    assert_eq!(exit_code(&err), codes::SUCCESS);
}

#[tokio::test]
async fn test_unreachable_webhook_does_not_stop_the_run() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("out.csv");

    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_json(query_body(json!([
            ["198.51.100.23", "VM-004", 120]
        ]))),
    )
    .await;

    let summary = pipeline(
        &query_server,
        Some("http://127.0.0.1:1/hook".to_string()),
        &report_path,
    )
    .run(Utc::now())
    .await
    .expect("an unreachable webhook must not fail the run");

    assert!(matches!(summary.notification, NotificationStatus::Failed(_)));
    let blocked: Vec<&str> = summary.actions.iter().map(|a| a.ip.as_str()).collect();
    assert_eq!(blocked, vec!["198.51.100.23"]);
    assert!(report_path.exists());
}

#[tokio::test]
async fn test_unauthorized_query_is_authentication_error() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("out.csv");

    mount_query(
        &query_server,
        ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "InvalidTokenError", "message": "The provided authentication is not valid" }
        })),
    )
    .await;

    let err = pipeline(&query_server, None, &report_path)
        .run(Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, DetectorError::Authentication(_)));
    assert!(err.to_string().contains("InvalidTokenError"));
    assert_eq!(exit_code(&err), codes::AUTH_FAILED);
    assert!(!report_path.exists(), "no report after a failed query");
}

#[tokio::test]
async fn test_server_error_is_query_error() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("out.csv");

    mount_query(&query_server, ResponseTemplate::new(500)).await;

    let err = pipeline(&query_server, None, &report_path)
        .run(Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, DetectorError::Query(_)));
    assert_eq!(exit_code(&err), codes::QUERY_FAILED);
    assert!(!report_path.exists());
}

#[tokio::test]
async fn test_partial_result_rows_are_used() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut body = query_body(json!([["192.0.2.10", null, 88]]));
    body["error"] = json!({
        "code": "PartialError",
        "message": "There were some errors when processing your query."
    });
    mount_query(&query_server, ResponseTemplate::new(200).set_body_json(body)).await;

    let summary = pipeline(&query_server, None, &dir.path().join("out.csv"))
        .run(Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.suspicious.len(), 1);
    assert_eq!(summary.suspicious.records()[0].device_name, "unknown");
}

#[tokio::test]
async fn test_malformed_body_is_query_error() {
    let query_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_query(
        &query_server,
        ResponseTemplate::new(200).set_body_string("<html>gateway</html>"),
    )
    .await;

    let err = pipeline(&query_server, None, &dir.path().join("out.csv"))
        .run(Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::Query(_)));
}

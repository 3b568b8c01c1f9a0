//! 报表服务 API 集成测试
//! 角色门禁、导出行数上限与上游不可用时的错误表现

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use defect_tracking::models::role::UserRole;

mod common;
use common::{bearer, create_reports_state, create_test_config};

fn test_app() -> axum::Router {
    let config = create_test_config();
    let state = create_reports_state(&config);
    defect_tracking::routes::reports_router(state)
}

/// 上游桩：固定条数的缺陷页 + 空项目清单
async fn spawn_reports_upstream(defect_count: usize) -> SocketAddr {
    let rows: Vec<serde_json::Value> = (0..defect_count)
        .map(|_| {
            serde_json::json!({
                "id": Uuid::new_v4(),
                "project_id": Uuid::new_v4(),
                "title": "Stub defect",
                "status": "NEW",
                "priority": "LOW",
            })
        })
        .collect();

    async fn defects(State(rows): State<Arc<Vec<serde_json::Value>>>) -> Json<serde_json::Value> {
        Json(serde_json::json!({ "success": true, "data": *rows }))
    }
    async fn projects() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "success": true, "data": [] }))
    }

    let app = Router::new()
        .route("/api/v1/defects", get(defects))
        .route("/api/v1/projects", get(projects))
        .with_state(Arc::new(rows));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// 导出上限为 limit、上游有 defect_count 条缺陷的报表服务
async fn export_app(defect_count: usize, limit: usize) -> axum::Router {
    let stub = spawn_reports_upstream(defect_count).await;

    let mut config = create_test_config();
    config.upstream.defects_url = format!("http://{}", stub);
    config.upstream.projects_url = format!("http://{}", stub);
    config.report.max_export_rows = limit;

    defect_tracking::routes::reports_router(create_reports_state(&config))
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_summary_requires_auth() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_engineer_cannot_read_reports() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/summary")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Engineer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "FORBIDDEN");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Access denied. Required roles:"));
    assert!(message.contains("SUPERVISOR"));
    assert!(message.contains("CUSTOMER"));
}

#[tokio::test]
async fn test_summary_reports_upstream_unavailable() {
    // 测试配置把缺陷服务指向未监听的端口
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/summary")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Manager))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Defects service"));
}

#[tokio::test]
async fn test_export_allowed_for_customer_but_upstream_down() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/export?format=csv")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Customer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // 角色放行，失败发生在上游抓取
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_export_one_row_over_limit_rejected() {
    let app = export_app(4, 3).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/export?format=csv")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Manager))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "EXPORT_LIMIT_EXCEEDED");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("Found 4 defects"));
    assert!(message.contains("maximum allowed is 3"));
}

#[tokio::test]
async fn test_export_exactly_at_limit_succeeds() {
    let app = export_app(3, 3).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/export?format=csv")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Manager))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/csv")
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=defects_report_"));
    assert!(disposition.ends_with(".csv"));

    // 表头一行 + 三行数据
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.trim_end().lines().count(), 4);
    assert!(text.starts_with("id,project_id,project_name,title"));
}

#[tokio::test]
async fn test_summary_over_stub_counts_rows() {
    let app = export_app(2, 100).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/summary")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Supervisor))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["total_defects"], 2);
    assert_eq!(json["data"]["open_defects_count"], 2);
    assert_eq!(json["data"]["closed_defects_count"], 0);
    assert_eq!(json["data"]["status_distribution"][0]["status"], "NEW");
    assert_eq!(json["data"]["status_distribution"][0]["count"], 2);
}

#[tokio::test]
async fn test_export_rejects_unknown_format() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/export?format=pdf")
                .header("authorization", bearer(Uuid::new_v4(), UserRole::Manager))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

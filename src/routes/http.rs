//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info, instrument, warn};

use crate::domain::{Brand, Question};
use crate::logic::{parse_context, record_participation};
use crate::protocol::*;
use crate::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorOut>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorOut>) {
    (status, Json(ErrorOut { error: message.into() }))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_brands(State(state): State<Arc<AppState>>) -> Json<Vec<Brand>> {
    Json(state.brands.values().cloned().collect())
}

#[instrument(level = "info", skip(state), fields(country = %q.country_id, brand = %q.brand_id))]
pub async fn http_get_questions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<QuestionsQuery>,
) -> ApiResult<Json<Vec<Question>>> {
    let context = parse_context(&q.country_id, &q.brand_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    match state.questions.fetch_questions(&context).await {
        Ok(questions) => {
            info!(target: "wheel_quiz_backend", count = questions.len(), "HTTP questions served");
            Ok(Json(questions))
        }
        Err(e) => {
            error!(target: "wheel_quiz_backend", error = %e, "HTTP question fetch failed");
            Err(api_error(StatusCode::BAD_GATEWAY, "error fetching questions"))
        }
    }
}

#[instrument(level = "info", skip(state, body), fields(participant = body.participant, score = body.score))]
pub async fn http_post_participation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParticipationIn>,
) -> ApiResult<(StatusCode, Json<ParticipationOut>)> {
    match record_participation(&state, &body).await {
        Ok(p) => Ok((StatusCode::CREATED, Json(ParticipationOut { id: p.id }))),
        Err(e) => {
            warn!(target: "wheel_quiz_backend", error = %e, "HTTP participation rejected");
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

#[instrument(level = "info", skip(state), fields(kind = ?q.kind))]
pub async fn http_get_reports(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ReportQuery>,
) -> Json<ReportOut> {
    match q.kind {
        ReportKind::Stats => Json(ReportOut::Stats(state.participations.stats().await)),
        ReportKind::Rows => Json(ReportOut::Rows(state.participations.entries().await)),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::routes::build_router;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        build_router(Arc::new(AppState::from_parts(AppConfig::default(), None)))
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn questions_for_context() {
        let resp = app()
            .oneshot(Request::get("/api/v1/questions?countryId=1&brandId=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn malformed_context_is_bad_request() {
        let resp = app()
            .oneshot(Request::get("/api/v1/questions?countryId=x&brandId=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn participation_then_report() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/participations")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"countryId":1,"brandId":2,"participant":1,"score":3,"won":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(Request::get("/api/v1/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats = json_body(resp).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["winners"], 1);
        assert_eq!(stats["byBrand"][0]["id"], 2);
    }

    #[tokio::test]
    async fn inconsistent_participation_is_rejected() {
        let resp = app()
            .oneshot(
                Request::post("/api/v1/participations")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"countryId":1,"brandId":1,"participant":1,"score":0,"won":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

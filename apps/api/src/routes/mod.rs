pub mod health;
pub mod identity;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::matching::handlers as matching;
use crate::state::AppState;

/// Upper bound for resume uploads.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume and matching
        .route(
            "/api/v1/resume",
            put(matching::handle_upload_resume).delete(matching::handle_clear_resume),
        )
        .route("/api/v1/jobs", get(matching::handle_list_jobs))
        .route(
            "/api/v1/matches",
            post(matching::handle_start_matches).get(matching::handle_get_matches),
        )
        .route(
            "/api/v1/matches/:job_id/keywords",
            patch(matching::handle_toggle_keywords),
        )
        // Applications
        .route(
            "/api/v1/applications/status",
            get(applications::handle_application_status),
        )
        .route(
            "/api/v1/applications/:job_id",
            post(applications::handle_apply),
        )
        .route(
            "/api/v1/resumes/:file_name",
            get(applications::handle_download_resume),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::applications::submitter::{
        ApplicationPayload, ApplicationReceipt, ApplicationSubmitter, ResumeArchive, StoredResume,
    };
    use crate::errors::AppError;
    use crate::jobs::StaticJobSource;
    use crate::matching::batch::{BatchMatcher, ScoringStrategy};
    use crate::matching::scoring::TfIdfScorer;
    use crate::models::job::JobRecord;
    use crate::session::SessionRegistry;

    const BOUNDARY: &str = "jobmatch-test-boundary";
    const RESUME: &str = "Experienced Python developer with cloud and Kubernetes skills";

    #[derive(Default)]
    struct RecordingSubmitter {
        payloads: Mutex<Vec<ApplicationPayload>>,
    }

    #[async_trait]
    impl ApplicationSubmitter for RecordingSubmitter {
        async fn submit(&self, payload: ApplicationPayload) -> Result<ApplicationReceipt, AppError> {
            self.payloads.lock().unwrap().push(payload);
            Ok(ApplicationReceipt {
                application_id: Uuid::new_v4(),
                message: "Application submitted successfully!".to_string(),
            })
        }
    }

    struct StaticArchive(Vec<(String, StoredResume)>);

    #[async_trait]
    impl ResumeArchive for StaticArchive {
        async fn fetch(&self, object_name: &str) -> Result<Option<StoredResume>, AppError> {
            Ok(self
                .0
                .iter()
                .find(|(name, _)| name == object_name)
                .map(|(_, stored)| stored.clone()))
        }
    }

    fn archive() -> Arc<StaticArchive> {
        Arc::new(StaticArchive(vec![(
            "j2_cand-1_20260101000000_cv.pdf".to_string(),
            StoredResume {
                file_name: "cv.pdf".to_string(),
                data: bytes::Bytes::from_static(b"%PDF-1.4 resume"),
                candidate_user_id: "cand-1".to_string(),
                company_user_id: "company-1".to_string(),
            },
        )]))
    }

    fn job(id: &str, description: &str, owner: Option<&str>) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            title: format!("Role {id}"),
            company: "Acme".to_string(),
            description: description.to_string(),
            source: Some("internal".to_string()),
            owner_id: owner.map(str::to_string),
            ..Default::default()
        }
    }

    fn app_with(jobs: Vec<JobRecord>, submitter: Arc<RecordingSubmitter>) -> Router {
        build_router(AppState {
            sessions: Arc::new(SessionRegistry::new(submitter)),
            matcher: BatchMatcher::new(Arc::new(TfIdfScorer), None, ScoringStrategy::Sequential),
            job_source: Arc::new(StaticJobSource(jobs)),
            resumes: archive(),
        })
    }

    fn default_jobs() -> Vec<JobRecord> {
        vec![
            job("j1", "Certified accountant for ledger audits", Some("company-1")),
            job(
                "j2",
                "Python developer for cloud kubernetes platform",
                Some("company-1"),
            ),
            job("j3", "Python cloud engineer", None),
        ]
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "cand-1")
            .header("x-user-email", "cand@example.com")
            .header("x-user-role", "candidate")
    }

    fn resume_upload(filename: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        request("PUT", "/api/v1/resume")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(Vec::new(), Arc::default());
        let (status, body) = send(
            &app,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobmatch-api");
    }

    #[tokio::test]
    async fn test_match_and_apply_flow() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let app = app_with(default_jobs(), submitter.clone());

        let (status, body) = send(&app, resume_upload("cv.txt", RESUME)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["filename"], "cv.txt");

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let matches = body["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[2]["job_id"], "j1");
        assert_eq!(matches[2]["score"], 0.0);
        assert!(matches.iter().all(|m| m["keywords_visible"] == false));

        let (status, body) = send(
            &app,
            request("PATCH", "/api/v1/matches/j2/keywords")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keywords_visible"], true);

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/applications/j2")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Application submitted successfully!");
        assert_eq!(submitter.payloads.lock().unwrap()[0].job_id, "j2");

        let (status, body) = send(
            &app,
            request("GET", "/api/v1/applications/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["job_id"], "j2");
        assert_eq!(body[0]["phase"], "succeeded");
        assert_eq!(body[0]["severity"], "success");
    }

    #[tokio::test]
    async fn test_external_job_list_overrides_job_store() {
        let app = app_with(default_jobs(), Arc::default());
        send(&app, resume_upload("cv.txt", RESUME)).await;

        let body = json!({
            "jobs": [{
                "Job_ID": "ext-1",
                "Job_Title": "Cloud Engineer",
                "Company_Name": "Elsewhere",
                "Job_Description": "Kubernetes and cloud operations",
                "Source": "linkedin"
            }]
        });
        let (status, body) = send(
            &app,
            request("POST", "/api/v1/matches")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let matches = body["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["job_id"], "ext-1");
        assert_eq!(matches[0]["source"], "linkedin");
    }

    #[tokio::test]
    async fn test_matching_without_resume_is_rejected() {
        let app = app_with(default_jobs(), Arc::default());
        let (status, body) = send(
            &app,
            request("POST", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_INPUT");
    }

    #[tokio::test]
    async fn test_empty_job_source_is_rejected() {
        let app = app_with(Vec::new(), Arc::default());
        send(&app, resume_upload("cv.txt", RESUME)).await;
        let (status, body) = send(
            &app,
            request("POST", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_INPUT");
    }

    #[tokio::test]
    async fn test_unsupported_resume_format_is_rejected() {
        let app = app_with(default_jobs(), Arc::default());
        let (status, body) = send(&app, resume_upload("cv.odt", RESUME)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_INPUT");
    }

    #[tokio::test]
    async fn test_anonymous_apply_is_forbidden() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let app = app_with(default_jobs(), submitter.clone());
        let (status, body) = send(
            &app,
            Request::post("/api/v1/applications/j2")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");
        assert!(submitter.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_candidate_apply_is_forbidden_before_job_lookup() {
        let app = app_with(default_jobs(), Arc::default());
        for job_id in ["j2", "does-not-exist"] {
            let (status, body) = send(
                &app,
                Request::post(format!("/api/v1/applications/{job_id}"))
                    .header("x-user-id", "company-1")
                    .header("x-user-role", "company")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{job_id}");
            assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_apply_to_ownerless_internal_job_is_unprocessable() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let app = app_with(default_jobs(), submitter.clone());
        send(&app, resume_upload("cv.txt", RESUME)).await;

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/applications/j3")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DATA_INTEGRITY_ERROR");
        assert!(submitter.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let app = app_with(default_jobs(), Arc::default());
        let (status, _) = send(
            &app,
            request("POST", "/api/v1/applications/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            request("PATCH", "/api/v1/matches/nope/keywords")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clear_resume_empties_matches() {
        let app = app_with(default_jobs(), Arc::default());
        send(&app, resume_upload("cv.txt", RESUME)).await;
        send(
            &app,
            request("POST", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;

        let (status, _) = send(
            &app,
            request("DELETE", "/api/v1/resume").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(
            &app,
            request("GET", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(body["matches"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_job_list_is_bad_request() {
        let app = app_with(default_jobs(), Arc::default());
        send(&app, resume_upload("cv.txt", RESUME)).await;

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/matches")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"jobs": [{"Job_ID": "ext-1""#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_INPUT");

        // nothing was matched against the job store instead
        let (_, body) = send(
            &app,
            request("GET", "/api/v1/matches").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(body["matches"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_session_routes_are_forbidden() {
        let app = app_with(default_jobs(), Arc::default());
        for (method, uri) in [
            ("GET", "/api/v1/matches"),
            ("POST", "/api/v1/matches"),
            ("DELETE", "/api/v1/resume"),
            ("GET", "/api/v1/applications/status"),
            ("PATCH", "/api/v1/matches/j2/keywords"),
        ] {
            let (status, body) = send(
                &app,
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_resume_download_is_limited_to_application_parties() {
        let app = app_with(default_jobs(), Arc::default());
        let uri = "/api/v1/resumes/j2_cand-1_20260101000000_cv.pdf";

        let response = app
            .clone()
            .oneshot(request("GET", uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4 resume");

        let response = app
            .clone()
            .oneshot(
                Request::get(uri)
                    .header("x-user-id", "company-1")
                    .header("x-user-role", "company")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = send(
            &app,
            Request::get(uri)
                .header("x-user-id", "cand-2")
                .header("x-user-role", "candidate")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");

        let (status, _) = send(
            &app,
            request("GET", "/api/v1/resumes/missing.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Request::get(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

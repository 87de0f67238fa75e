// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_signature, require_signed_request},
    models::{
        Bid, BidTerms, NewBid, NewProject, Project, ProjectStatus, ProjectUpdate, Rate, RateRequest,
        RegisterRequest, User, UserRates, WalletAddress,
    },
    state::AppState,
};

pub mod private;
pub mod public;
pub mod registration;

pub fn router(state: AppState) -> Router {
    let authenticator = Arc::clone(&state.authenticator);

    let public_routes = Router::new()
        .route("/config", get(public::config))
        .route("/user_list", get(public::user_list))
        .route("/user/{id}", get(public::user))
        .route("/user/{id}/history", get(public::user_history))
        .route("/user/{id}/rates", get(public::user_rates))
        .route("/project_list", get(public::project_list))
        .route("/project/{id}", get(public::project))
        .route("/project/{id}/bids", get(public::project_bids))
        .route("/bid/{id}", get(public::bid));

    let registration_routes = Router::new()
        .route("/api/register", post(registration::register))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&authenticator),
            require_signature,
        ));

    let private_routes = Router::new()
        .route("/create_project", post(private::create_project))
        .route("/project/{id}/update", post(private::update_project))
        .route("/project/{id}/delete", post(private::delete_project))
        .route("/project/{id}/bid", post(private::create_bid))
        .route("/project/{id}/ready", post(private::set_project_ready))
        .route("/project/{id}/accept", post(private::accept_project))
        .route("/project/{id}/cancel", post(private::cancel_project))
        .route("/project/{id}/rate", post(private::rate_project))
        .route("/bid/{id}/accept", post(private::accept_bid))
        .route("/bid/{id}/update", post(private::update_bid))
        .route("/bid/{id}/delete", post(private::delete_bid))
        .route("/user/{id}/request_mentorship", post(private::request_mentorship))
        .route("/user/{id}/accept_mentorship", post(private::accept_mentorship))
        .route("/user/{id}/cancel_mentorship", post(private::cancel_mentorship))
        .route_layer(middleware::from_fn_with_state(
            authenticator,
            require_signed_request,
        ));

    let api_routes = Router::new()
        .nest("/api/public", public_routes)
        .nest("/api/private", private_routes)
        .merge(registration_routes)
        .with_state(state);

    // Decompression sits outside the auth layers so signatures cover the
    // decoded body.
    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(RequestDecompressionLayer::new()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        public::config,
        public::user_list,
        public::user,
        public::user_history,
        public::user_rates,
        public::project_list,
        public::project,
        public::project_bids,
        public::bid,
        registration::register,
        private::create_project,
        private::update_project,
        private::delete_project,
        private::create_bid,
        private::set_project_ready,
        private::accept_project,
        private::cancel_project,
        private::rate_project,
        private::accept_bid,
        private::update_bid,
        private::delete_bid,
        private::request_mentorship,
        private::accept_mentorship,
        private::cancel_mentorship
    ),
    components(
        schemas(
            User,
            Project,
            ProjectStatus,
            Bid,
            Rate,
            UserRates,
            WalletAddress,
            NewProject,
            ProjectUpdate,
            NewBid,
            BidTerms,
            RateRequest,
            RegisterRequest,
            public::ServiceConfig,
            private::Created
        )
    ),
    tags(
        (name = "Public", description = "Unauthenticated marketplace reads"),
        (name = "Users", description = "Wallet registration"),
        (name = "Projects", description = "Project posting and lifecycle"),
        (name = "Bids", description = "Bidding on open projects"),
        (name = "Rates", description = "Feedback on finished projects"),
        (name = "Mentorship", description = "Reserved, not implemented")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::authenticator::tests::TestWallet;
    use crate::auth::{ADDRESS_HEADER, NONCE_HEADER, SIGNATURE_HEADER};

    fn signed(wallet: &TestWallet, path: &str, nonce: u64, body: &str) -> Request<Body> {
        signed_for(wallet, path, path, nonce, body)
    }

    /// Request to `uri` carrying a signature over `signed_path`.
    fn signed_for(
        wallet: &TestWallet,
        uri: &str,
        signed_path: &str,
        nonce: u64,
        body: &str,
    ) -> Request<Body> {
        let credentials = wallet.credentials(signed_path, nonce, body.as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(ADDRESS_HEADER, credentials.address.unwrap())
            .header(NONCE_HEADER, credentials.nonce.unwrap())
            .header(SIGNATURE_HEADER, credentials.signature.unwrap())
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, wallet: &TestWallet, nickname: &str, nonce: u64) {
        let body = json!({ "nickname": nickname }).to_string();
        let response = app
            .clone()
            .oneshot(signed(wallet, "/api/register", nonce, &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn signed_project_flow() {
        let app = router(AppState::default());
        let owner = TestWallet::new();
        let worker = TestWallet::new();

        register(&app, &owner, "owner", 1).await;
        register(&app, &worker, "worker", 10).await;

        let project = json!({
            "title": "Audit",
            "description": "Review a contract",
            "deadline": 86400,
            "price": 1000
        })
        .to_string();
        let response = app
            .clone()
            .oneshot(signed(&owner, "/api/private/create_project", 2, &project))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["id"], 1);

        let bid = json!({ "price": 900, "deadline": 43200, "message": "Ready now" }).to_string();
        let response = app
            .clone()
            .oneshot(signed(&worker, "/api/private/project/1/bid", 11, &bid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(signed(&owner, "/api/private/bid/1/accept", 3, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started = json_body(response).await;
        assert_eq!(started["status"], "in_work");
        assert_eq!(started["contractor"], worker.address.as_str());
        assert_eq!(started["price"], 900);

        let response = app.clone().oneshot(get_request("/api/public/project/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "in_work");

        let response = app.oneshot(get_request("/api/public/project/1/bids")).await.unwrap();
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn replayed_request_is_rejected() {
        let app = router(AppState::default());
        let owner = TestWallet::new();
        register(&app, &owner, "owner", 5).await;

        let body = json!({ "title": "Logo", "deadline": 60, "price": 5 }).to_string();
        let first = app
            .clone()
            .oneshot(signed(&owner, "/api/private/create_project", 6, &body))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let replay = app
            .clone()
            .oneshot(signed(&owner, "/api/private/create_project", 6, &body))
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(replay).await["error_code"], "replayed_nonce");

        // Registration nonce is the floor as well.
        let stale = app
            .oneshot(signed(&owner, "/api/private/create_project", 5, &body))
            .await
            .unwrap();
        assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn private_routes_require_valid_signature() {
        let app = router(AppState::default());
        let owner = TestWallet::new();
        register(&app, &owner, "owner", 1).await;

        let unsigned = Request::builder()
            .method("POST")
            .uri("/api/private/create_project")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.clone().oneshot(unsigned).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_credential");

        // Signature made for another path does not transfer.
        let moved = signed_for(
            &owner,
            "/api/private/project/1/delete",
            "/api/private/project/2/delete",
            2,
            "",
        );
        let response = app.clone().oneshot(moved).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "invalid_signature");

        let stranger = TestWallet::new();
        let response = app
            .oneshot(signed(&stranger, "/api/private/create_project", 1, "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "unknown_identity");
    }

    #[tokio::test]
    async fn missing_headers_win_over_oversized_body() {
        let app = router(AppState::default());
        let oversized = vec![b'x'; 2 * crate::auth::middleware::MAX_SIGNED_BODY];

        let request = Request::builder()
            .method("POST")
            .uri("/api/private/create_project")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(oversized))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_credential");
    }

    #[tokio::test]
    async fn mentorship_routes_answer_not_implemented() {
        let app = router(AppState::default());
        let wallet = TestWallet::new();
        register(&app, &wallet, "mentee", 1).await;

        let response = app
            .oneshot(signed(&wallet, "/api/private/user/0xabc/request_mentorship", 2, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn public_reads_and_docs() {
        let state = AppState::new(
            Arc::new(crate::storage::MemoryStorage::new()),
            WalletAddress::from("0xservice"),
        );
        let app = router(state);

        let response = app.clone().oneshot(get_request("/api/public/config")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service_address"], "0xservice");

        let response = app.clone().oneshot(get_request("/api/public/user_list")).await.unwrap();
        assert_eq!(json_body(response).await, json!([]));

        let response = app.clone().oneshot(get_request("/api/public/bid/9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let docs = Request::builder()
            .uri("/api-doc/openapi.json")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(docs).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }
}

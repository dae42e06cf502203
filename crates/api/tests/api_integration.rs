//! API integration tests.
//!
//! Drive the router end to end with one mock database per repository.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use agora_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use agora_common::config::{Config, DatabaseConfig, FeedConfig, ServerConfig, ThreadingConfig};
use agora_core::{CommentService, PostService, UserService, VotingService};
use agora_db::{
    entities::{comment, post, user},
    repositories::{CommentRepository, PostRepository, UserRepository, VoteRepository},
    test_utils::{comment_fixture, post_fixture, user_fixture},
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use sea_orm::{DatabaseBackend, MockDatabase, Value};
use serde_json::Value as Json;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_retries: 0,
            retry_delay_secs: 0,
        },
        threading: ThreadingConfig::default(),
        feed: FeedConfig::default(),
    }
}

fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

/// One mock database per repository.
struct Mocks {
    user: MockDatabase,
    post: MockDatabase,
    comment: MockDatabase,
    vote: MockDatabase,
}

impl Default for Mocks {
    fn default() -> Self {
        Self {
            user: mock(),
            post: mock(),
            comment: mock(),
            vote: mock(),
        }
    }
}

/// Create test app state with mock databases.
fn create_test_state(mocks: Mocks) -> AppState {
    let config = create_test_config();

    let user_repo = UserRepository::new(Arc::new(mocks.user.into_connection()));
    let post_repo = PostRepository::new(Arc::new(mocks.post.into_connection()));
    let comment_repo = CommentRepository::new(Arc::new(mocks.comment.into_connection()));
    let vote_repo = VoteRepository::new(Arc::new(mocks.vote.into_connection()));

    let user_service = UserService::new(user_repo);
    let voting_service = VotingService::new(vote_repo, post_repo.clone(), comment_repo.clone());
    let post_service = PostService::new(
        post_repo.clone(),
        comment_repo.clone(),
        user_service.clone(),
        voting_service.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo,
        post_repo,
        user_service.clone(),
        voting_service.clone(),
        &config,
    );

    AppState {
        user_service,
        post_service,
        comment_service,
        voting_service,
        feed: config.feed,
    }
}

/// Create the test router, with token authentication in front.
fn create_test_router(mocks: Mocks) -> Router {
    let state = create_test_state(mocks);
    api_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Json) {
    let response: Response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

fn authed(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", "Bearer token-user1")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(Mocks::default());

    let response = app.oneshot(get("/nonexistent/endpoint")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_test_router(Mocks::default());

    let (status, body) = send(app, get("/i")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_with_token() {
    let mocks = Mocks {
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, authed("GET", "/i", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_comment_tree_degrades_to_empty() {
    // Nothing queued, so the comment query fails.
    let app = create_test_router(Mocks::default());

    let (status, body) = send(app, get("/posts/p1/comments/tree")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "data": [] }));
}

#[tokio::test]
async fn test_comment_tree_nests_replies() {
    let mocks = Mocks {
        comment: mock().append_query_results([[
            comment_fixture("c1", "p1", Some("a"), 5),
            comment_fixture("b", "p1", None, 3),
            comment_fixture("a", "p1", None, 0),
        ]]),
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, get("/posts/p1/comments/tree")).await;

    assert_eq!(status, StatusCode::OK);
    let roots = body["data"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], "b");
    assert_eq!(roots[1]["id"], "a");
    assert_eq!(roots[1]["replies"][0]["id"], "c1");
    assert_eq!(roots[1]["replies"][0]["depth"], 1);
    assert_eq!(roots[1]["replies"][0]["parentId"], "a");
    assert_eq!(roots[1]["replies"][0]["author"]["username"], "alice");
    assert_eq!(roots[1]["replies"][0]["userVote"], 0);
}

#[tokio::test]
async fn test_vote_without_auth_returns_401() {
    let app = create_test_router(Mocks::default());

    let request = Request::builder()
        .uri("/comments/c1/vote")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"voteType":1}"#))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_rejects_out_of_range_value() {
    let mocks = Mocks {
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, authed("POST", "/comments/c1/vote", r#"{"voteType":2}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_reply_depth_exceeded_returns_422() {
    let chain: Vec<comment::Model> = (0..6)
        .map(|i: i64| {
            let parent = (i > 0).then(|| format!("r{}", i - 1));
            comment_fixture(&format!("r{i}"), "p1", parent.as_deref(), i)
        })
        .collect();

    let mocks = Mocks {
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        comment: mock()
            .append_query_results([[chain[5].clone()]])
            .append_query_results([chain]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(
        app,
        authed("POST", "/comments/r5/replies", r#"{"content":"one too many"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "DEPTH_EXCEEDED");
}

#[tokio::test]
async fn test_reply_to_missing_parent_returns_404() {
    let mocks = Mocks {
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        comment: mock().append_query_results([Vec::<comment::Model>::new()]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(
        app,
        authed("POST", "/comments/gone/replies", r#"{"content":"hello?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PARENT_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_someone_elses_comment_is_forbidden() {
    let mut theirs = comment_fixture("c1", "p1", None, 0);
    theirs.author_id = "user2".to_string();

    let mocks = Mocks {
        user: mock()
            .append_query_results([[user_fixture("user1", "alice")]])
            .append_query_results([[user_fixture("user2", "bob")]]),
        comment: mock().append_query_results([[theirs]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, authed("DELETE", "/comments/c1", "")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_post_feed_paging() {
    let mocks = Mocks {
        post: mock()
            .append_query_results([[post_fixture("p2", "user1", 10), post_fixture("p1", "user1", 0)]])
            .append_query_results([[count_row(25)]]),
        user: mock().append_query_results([[user_fixture("user1", "alice")]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, get("/posts?page=2&limit=10")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalPosts"], 25);
    assert_eq!(body["data"]["totalPages"], 3);
    assert_eq!(body["data"]["currentPage"], 2);
    assert_eq!(body["data"]["posts"][0]["id"], "p2");
}

#[tokio::test]
async fn test_post_feed_caps_huge_page() {
    let mocks = Mocks {
        post: mock()
            .append_query_results([Vec::<post::Model>::new()])
            .append_query_results([[count_row(3)]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, get("/posts?page=18446744073709551615")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentPage"], 1_000_000);
    assert_eq!(body["data"]["totalPosts"], 3);
    assert!(body["data"]["posts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_posts() {
    let mocks = Mocks {
        user: mock()
            .append_query_results([[user_fixture("user2", "bob")]])
            .append_query_results([[user_fixture("user2", "bob")]]),
        post: mock().append_query_results([[
            post_fixture("p3", "user2", 20),
            post_fixture("p1", "user2", 0),
        ]]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, get("/users/user2/posts")).await;

    assert_eq!(status, StatusCode::OK);
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["id"], "p3");
    assert_eq!(posts[1]["authorId"], "user2");
    assert_eq!(posts[1]["author"]["username"], "bob");
}

#[tokio::test]
async fn test_posts_of_unknown_user_returns_404() {
    let mocks = Mocks {
        user: mock().append_query_results([Vec::<user::Model>::new()]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let (status, body) = send(app, get("/users/ghost/posts")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_signin_unknown_user_is_unauthorized() {
    let mocks = Mocks {
        user: mock().append_query_results([Vec::<user::Model>::new()]),
        ..Mocks::default()
    };
    let app = create_test_router(mocks);

    let request = Request::builder()
        .uri("/signin")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"username":"nobody","password":"wrongpassword"}"#))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
    std::collections::BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::App;

use super::{
    article::{
        create::create_article,
        delete::delete_article,
        get::{get_article, get_articles},
        patch::patch_article,
        publish::{publish_article, unpublish_article},
    },
    category::{get_articles_in_categories, get_categories, get_category_articles},
    comment::{
        create::create_comment,
        delete::delete_comment,
        get::{get_article_comments, get_comment, get_replies},
        like::toggle_like,
        patch::patch_comment,
    },
};

pub fn articles() -> Router<App> {
    // `{article}` is the slug for reads and the numeric id for mutations
    Router::<App>::new()
        .route("/", get(get_articles).post(create_article))
        .route(
            "/{article}",
            get(get_article).put(patch_article).delete(delete_article),
        )
        .route("/{article}/publish", patch(publish_article))
        .route("/{article}/unpublish", patch(unpublish_article))
}

pub fn categories() -> Router<App> {
    Router::<App>::new()
        .route("/", get(get_categories))
        .route("/articles", post(get_articles_in_categories))
        .route("/{category}/articles", get(get_category_articles))
}

pub fn comments() -> Router<App> {
    Router::<App>::new()
        .route("/", post(create_comment))
        .route("/article/{article_id}", get(get_article_comments))
        .route(
            "/{comment_id}",
            get(get_comment).put(patch_comment).delete(delete_comment),
        )
        .route("/{comment_id}/replies", get(get_replies))
        .route("/{comment_id}/like", post(toggle_like))
}

#[cfg(test)]
mod test {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{config::ServerConfig, identity::models::identity::Role, test_utils::TestApp};

    async fn hello_world(app: &TestApp, token: &str) -> i64 {
        let (status, article) = app
            .request(
                Method::POST,
                "/api/articles",
                Some(token),
                Some(json!({
                    "title": "Hello World",
                    "summary": "A greeting",
                    "body": "Hello there",
                    "category": "Technology",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(article["slug"], "hello-world");

        article["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_article_update_is_owner_or_admin() {
        let app = TestApp::new();
        let (_, a) = app.identity("Ada", Role::Author).await;
        let (_, b) = app.identity("Bob", Role::Author).await;
        let (_, c) = app.identity("Cleo", Role::Admin).await;
        let id = hello_world(&app, &a).await;
        let uri = format!("/api/articles/{id}");

        let (status, body) = app
            .request(Method::PUT, &uri, Some(&b), Some(json!({ "summary": "hijacked" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = app
            .request(Method::PUT, &uri, Some(&c), Some(json!({ "summary": "edited" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "edited");
        assert_eq!(body["author"]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_publish_flow_and_public_reads() {
        let app = TestApp::new();
        let (_, a) = app.identity("Ada", Role::Author).await;
        let id = hello_world(&app, &a).await;

        let (_, listed) = app.request(Method::GET, "/api/articles", None, None).await;
        assert_eq!(listed, json!([]));

        let (status, published) = app
            .request(Method::PATCH, &format!("/api/articles/{id}/publish"), Some(&a), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(published["published"], true);
        assert!(published["publishedAt"].is_string());

        let (_, listed) = app.request(Method::GET, "/api/articles", None, None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, by_slug) = app
            .request(Method::GET, "/api/articles/hello-world", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_slug["id"], id);

        let (status, by_category) = app
            .request(Method::GET, "/api/categories/technology/articles", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_category.as_array().unwrap().len(), 1);

        let (status, _) = app
            .request(
                Method::POST,
                "/api/categories/articles",
                None,
                Some(json!({ "categories": ["food", "real-estate"] })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, unpublished) = app
            .request(Method::PATCH, &format!("/api/articles/{id}/unpublish"), Some(&a), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unpublished["publishedAt"], json!(null));

        let (status, _) = app
            .request(Method::GET, "/api/categories/technology/articles", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mutations_require_authentication() {
        let app = TestApp::new();

        let (status, body) = app
            .request(
                Method::POST,
                "/api/comments",
                None,
                Some(json!({ "content": "hi", "articleId": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = app
            .request(Method::POST, "/api/comments/1/like", Some("nwsr_bogus"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_like_toggle_scenario() {
        let app = TestApp::new();
        let (ada, a) = app.identity("Ada", Role::Author).await;
        let x = hello_world(&app, &a).await;

        let (status, comment) = app
            .request(
                Method::POST,
                "/api/comments",
                Some(&a),
                Some(json!({ "content": "Great read!", "articleId": x })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["likes"], json!([]));
        assert_eq!(comment["author"]["name"], "Ada");
        let like = format!("/api/comments/{}/like", comment["id"]);

        let (status, liked) = app.request(Method::POST, &like, Some(&a), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(liked["likes"], json!([ada.id]));

        let (_, unliked) = app.request(Method::POST, &like, Some(&a), None).await;
        assert_eq!(unliked["likes"], json!([]));

        let (status, _) = app
            .request(Method::POST, "/api/comments/9999/like", Some(&a), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_only_the_author_deletes_a_comment() {
        let app = TestApp::new();
        let (_, a) = app.identity("Ada", Role::Author).await;
        let (_, b) = app.identity("Bob", Role::Author).await;
        let x = hello_world(&app, &a).await;

        let (_, comment) = app
            .request(
                Method::POST,
                "/api/comments",
                Some(&a),
                Some(json!({ "content": "mine", "articleId": x })),
            )
            .await;
        let uri = format!("/api/comments/{}", comment["id"]);

        let (status, _) = app.request(Method::DELETE, &uri, Some(&b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, still_there) = app.request(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(still_there["content"], "mine");

        let (status, _) = app
            .request(Method::PUT, &uri, Some(&b), Some(json!({ "content": "theirs" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.request(Method::DELETE, &uri, Some(&a), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Comment deleted successfully");

        let (status, _) = app.request(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_comment_is_a_validation_error() {
        let app = TestApp::new();
        let (_, a) = app.identity("Ada", Role::Author).await;

        let (status, body) = app
            .request(
                Method::POST,
                "/api/comments",
                Some(&a),
                Some(json!({ "content": "   \n ", "articleId": 12345 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERR");
    }

    #[tokio::test]
    async fn test_listings_are_scoped() {
        let app = TestApp::new();
        let (_, a) = app.identity("Ada", Role::Author).await;
        let x = hello_world(&app, &a).await;

        let post = |content: &'static str, parent: Option<i64>| {
            let app = &app;
            let a = a.clone();
            async move {
                let (_, c) = app
                    .request(
                        Method::POST,
                        "/api/comments",
                        Some(&a),
                        Some(json!({
                            "content": content,
                            "articleId": x,
                            "parentCommentId": parent,
                        })),
                    )
                    .await;
                c["id"].as_i64().unwrap()
            }
        };

        let top = post("top", None).await;
        let other = post("other", None).await;
        let reply = post("reply", Some(top)).await;

        let (_, listed) = app
            .request(Method::GET, &format!("/api/comments/article/{x}"), None, None)
            .await;
        let ids: Vec<i64> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![other, top]);
        assert!(listed.as_array().unwrap().iter().all(|c| c["parentComment"].is_null()));

        let (_, replies) = app
            .request(Method::GET, &format!("/api/comments/{top}/replies"), None, None)
            .await;
        assert_eq!(replies.as_array().unwrap().len(), 1);
        assert_eq!(replies[0]["id"], reply);
        assert_eq!(replies[0]["parentComment"], top);

        let (status, none) = app
            .request(Method::GET, "/api/comments/424242/replies", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(none, json!([]));
    }

    #[tokio::test]
    async fn test_comment_article_policy() {
        let strict = TestApp::new();
        let (_, a) = strict.identity("Ada", Role::Author).await;
        let (status, _) = strict
            .request(
                Method::POST,
                "/api/comments",
                Some(&a),
                Some(json!({ "content": "hi", "articleId": 777 })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let permissive = TestApp::with_config(ServerConfig {
            comments_require_article: false,
            ..Default::default()
        });
        let (_, a) = permissive.identity("Ada", Role::Author).await;
        let (status, comment) = permissive
            .request(
                Method::POST,
                "/api/comments",
                Some(&a),
                Some(json!({ "content": "hi", "articleId": 777 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["article"], 777);
    }

    #[tokio::test]
    async fn test_categories_are_listed() {
        let app = TestApp::new();

        let (status, categories) = app.request(Method::GET, "/api/categories", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let categories = categories.as_array().unwrap();
        assert_eq!(categories.len(), 26);
        assert!(categories.contains(&json!({
            "id": "real-estate",
            "name": "Real Estate",
            "emoji": "🏠",
        })));
    }
}

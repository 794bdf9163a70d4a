use axum::{
    extract::Path,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::legal::{find, PolicyDocument, DOCUMENTS};

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub slug: &'static str,
    pub title: &'static str,
    pub markdown: &'static str,
}

fn lookup(slug: &str) -> Result<&'static PolicyDocument, AppError> {
    find(slug).ok_or_else(|| AppError::NotFound(format!("No policy named '{slug}'")))
}

/// GET /api/v1/legal
pub async fn handle_list_policies() -> Json<Vec<PolicyDocument>> {
    Json(DOCUMENTS.to_vec())
}

/// GET /api/v1/legal/:slug
pub async fn handle_get_policy(Path(slug): Path<String>) -> Result<Json<PolicyResponse>, AppError> {
    let doc = lookup(&slug)?;
    Ok(Json(PolicyResponse {
        slug: doc.slug,
        title: doc.title,
        markdown: doc.markdown,
    }))
}

/// GET /legal/:slug
pub async fn handle_get_policy_markdown(Path(slug): Path<String>) -> Result<Response, AppError> {
    let doc = lookup(&slug)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        doc.markdown,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::routes::build_router;
    use crate::state::test_state;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(uri: &str) -> axum::response::Response {
        build_router(test_state())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_policies() {
        let response = get("/api/v1/legal").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        let slugs: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["accessibility", "cookies", "privacy", "terms"]);
        assert!(body[0].get("markdown").is_none());
    }

    #[tokio::test]
    async fn test_get_policy_json() {
        let body = json(get("/api/v1/legal/terms").await).await;
        assert_eq!(body["title"], "Terms of Use");
        assert!(body["markdown"].as_str().unwrap().starts_with("# Terms of Use"));
    }

    #[tokio::test]
    async fn test_unknown_policy_is_404() {
        assert_eq!(get("/api/v1/legal/refunds").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get("/legal/refunds").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_raw_markdown() {
        let response = get("/legal/privacy").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/markdown"));
    }
}

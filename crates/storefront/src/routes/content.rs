//! Events and blog routes.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::services::content::{DEFAULT_POST_LIMIT, Event, Post};
use crate::state::AppState;

/// Content is cached server-side for the same period.
const CONTENT_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub limit: Option<usize>,
}

/// GET /api/events
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let events: Vec<Event> = state.content().events().await;
    ([(CACHE_CONTROL, CONTENT_CACHE_CONTROL)], Json(events))
}

/// GET /api/posts?limit=
///
/// # Errors
///
/// Returns 400 if `limit` is not a non-negative integer.
pub async fn posts(
    State(state): State<AppState>,
    query: std::result::Result<Query<PostsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let posts: Vec<Post> = state
        .content()
        .posts(query.limit.unwrap_or(DEFAULT_POST_LIMIT))
        .await;
    Ok(([(CACHE_CONTROL, CONTENT_CACHE_CONTROL)], Json(posts)))
}

/// GET /api/posts/{slug}
///
/// # Errors
///
/// Returns 404 if no post has this slug.
pub async fn post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = state
        .content()
        .post_by_slug(&slug)
        .await
        .ok_or_else(|| AppError::NotFound(format!("post {slug}")))?;
    Ok(([(CACHE_CONTROL, CONTENT_CACHE_CONTROL)], Json(post)))
}

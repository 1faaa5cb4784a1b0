use std::collections::HashMap;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Value, json};
use uuid::Uuid;

use flock_db::Database;
use flock_db::models::PostRow;
use flock_types::api::{
    Claims, CreatePostRequest, PostAuthor, PostQuery, PostResponse, UpdatePostRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, FieldError};
use crate::{parse_timestamp, parse_uuid};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "content",
            "Content is required",
        )]));
    }

    let post_id = Uuid::new_v4();
    let created_at = chrono::Utc::now().to_rfc3339();
    state
        .db
        .create_post(
            &post_id.to_string(),
            &claims.sub.to_string(),
            &req.content,
            &created_at,
        )
        .map_err(ApiError::Internal)?;

    let post = load_post(&state.db, &post_id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post vanished after insert")))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created successfully", "post": post })),
    ))
}

/// GET /api/post — the caller's own posts, with an optional content
/// substring filter.
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let rows = state
        .db
        .posts_by_author(&claims.sub.to_string(), query.search.as_deref())
        .map_err(ApiError::Internal)?;
    Ok(Json(assemble(&state.db, rows)?))
}

/// GET /api/post/timeline — every post, newest first.
pub async fn timeline(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let rows = state
        .db
        .timeline(query.search.as_deref())
        .map_err(ApiError::Internal)?;
    Ok(Json(assemble(&state.db, rows)?))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "content",
            "Content is required",
        )]));
    }

    let updated = state
        .db
        .update_post(&id.to_string(), &req.content)
        .map_err(ApiError::Internal)?;
    if !updated {
        return Err(ApiError::NotFound("Post not found"));
    }

    let post = load_post(&state.db, &id.to_string())?
        .ok_or(ApiError::NotFound("Post not found"))?;

    Ok(Json(json!({ "message": "Post updated successfully", "post": post })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let removed = state
        .db
        .delete_post(&id.to_string())
        .map_err(ApiError::Internal)?;
    if !removed {
        return Err(ApiError::NotFound("Post not found"));
    }
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

// -- Helpers --

fn load_post(db: &Database, id: &str) -> Result<Option<PostResponse>, ApiError> {
    let Some(row) = db.get_post(id).map_err(ApiError::Internal)? else {
        return Ok(None);
    };
    let mut posts = assemble(db, vec![row])?;
    Ok(posts.pop())
}

/// Attach like / comment reference lists to post rows in one batch each.
fn assemble(db: &Database, rows: Vec<PostRow>) -> Result<Vec<PostResponse>, ApiError> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut likes: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in db.likes_for_posts(&post_ids).map_err(ApiError::Internal)? {
        likes
            .entry(like.post_id)
            .or_default()
            .push(parse_uuid(&like.user_id));
    }

    let mut comments: HashMap<String, Vec<Uuid>> = HashMap::new();
    for comment in db
        .comments_for_posts(&post_ids)
        .map_err(ApiError::Internal)?
    {
        comments
            .entry(comment.post_id)
            .or_default()
            .push(parse_uuid(&comment.comment_id));
    }

    Ok(rows
        .into_iter()
        .map(|row| PostResponse {
            id: parse_uuid(&row.id),
            content: row.content,
            author: PostAuthor {
                id: parse_uuid(&row.author_id),
                username: row.author_username,
                name: row.author_name,
                avatar: row.author_avatar,
            },
            likes: likes.remove(&row.id).unwrap_or_default(),
            comments: comments.remove(&row.id).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at),
        })
        .collect())
}

use axum::extract::{Extension, Multipart, Path, State};
use axum::Json;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use flock_db::Database;
use flock_db::models::UserSummaryRow;
use flock_types::api::{Claims, ProfileResponse, UserSummary};

use crate::auth::AppState;
use crate::error::{ApiError, FieldError};
use crate::{parse_timestamp, parse_uuid, validate};

// -- Profile --

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = profile_response(&state.db, &claims.sub.to_string())?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(profile))
}

pub async fn user_details(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = profile_response(&state.db, &id.to_string())?
        .ok_or(ApiError::NotFound("User with given id not found"))?;
    Ok(Json(profile))
}

/// PATCH /api/user — multipart form: profile text fields plus an optional
/// `avatar` file part. A new avatar replaces the previous file on disk.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut username = None;
    let mut phone = None;
    let mut name = None;
    let mut bio: Option<String> = None;
    let mut website: Option<String> = None;
    let mut location: Option<String> = None;
    let mut avatar_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_form("Invalid form data"))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        if field_name == "avatar" {
            let bytes = field.bytes().await.map_err(|_| bad_form("Invalid avatar upload"))?;
            avatar_bytes = Some(bytes.to_vec());
            continue;
        }

        let value = field.text().await.map_err(|_| bad_form("Invalid form data"))?;
        match field_name.as_str() {
            "username" => username = Some(value),
            "phone" => phone = Some(value),
            "name" => name = Some(value),
            "bio" => bio = Some(value),
            "website" => website = Some(value),
            "location" => location = Some(value),
            _ => {}
        }
    }

    let mut errors = Vec::new();
    if username.as_deref().is_none_or(|u| u.trim().is_empty()) {
        errors.push(FieldError::new("username", "Username is required"));
    }
    if !phone.as_deref().is_some_and(validate::looks_like_phone) {
        errors.push(FieldError::new("phone", "Please include a valid phone number"));
    }
    if name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if bio.as_deref().is_some_and(|b| b.len() > 160) {
        errors.push(FieldError::new("bio", "Bio cannot be more than 160 characters"));
    }
    if website.as_deref().is_some_and(|w| !validate::looks_like_url(w)) {
        errors.push(FieldError::new("website", "Please include a valid website"));
    }
    if location.as_deref().is_some_and(|l| l.len() > 30) {
        errors.push(FieldError::new(
            "location",
            "Location cannot be more than 30 characters",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound("User not found"))?;

    let avatar = match avatar_bytes {
        Some(bytes) => {
            let stored = store_avatar(&state, &bytes).await?;
            // Replace: remove the previous avatar file, best effort.
            if let Some(old) = &user.avatar {
                remove_avatar_file(&state, old).await;
            }
            Some(stored)
        }
        None => user.avatar.clone(),
    };

    state
        .db
        .update_profile(
            &user.id,
            username.as_deref().unwrap_or_default(),
            phone.as_deref().unwrap_or_default(),
            name.as_deref().unwrap_or_default(),
            avatar.as_deref(),
            bio.as_deref(),
            website.as_deref(),
            location.as_deref(),
        )
        .map_err(ApiError::Internal)?;

    Ok(Json(json!({ "message": "User updated successfully" })))
}

fn bad_form(message: &'static str) -> ApiError {
    ApiError::Validation(vec![FieldError {
        field: None,
        message,
    }])
}

async fn store_avatar(state: &AppState, bytes: &[u8]) -> Result<String, ApiError> {
    let file_id = Uuid::new_v4().to_string();
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("creating upload dir: {}", e)))?;
    tokio::fs::write(state.upload_dir.join(&file_id), bytes)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("writing avatar: {}", e)))?;
    Ok(format!("uploads/{file_id}"))
}

async fn remove_avatar_file(state: &AppState, stored: &str) {
    let Some(file_name) = stored.rsplit('/').next() else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(state.upload_dir.join(file_name)).await {
        warn!("Failed to remove old avatar {}: {}", stored, e);
    }
}

// -- Relationship actions --

pub async fn follow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.db.follow(&claims.sub.to_string(), &id.to_string())?;
    Ok(Json(json!({ "message": "User followed successfully" })))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.db.unfollow(&claims.sub.to_string(), &id.to_string())?;
    Ok(Json(json!({ "message": "User unfollowed successfully" })))
}

pub async fn send_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .send_friend_request(&claims.sub.to_string(), &id.to_string())?;
    Ok(Json(json!({ "message": "Friend request sent successfully" })))
}

pub async fn accept_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .accept_friend_request(&claims.sub.to_string(), &id.to_string())?;
    Ok(Json(json!({ "message": "Friend request accepted successfully" })))
}

pub async fn decline_friend_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .decline_friend_request(&claims.sub.to_string(), &id.to_string())?;
    Ok(Json(json!({ "message": "Friend request declined successfully" })))
}

// -- Relationship listings --

pub async fn my_followers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let rows = state
        .db
        .followers_of(&claims.sub.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

pub async fn my_following(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let rows = state
        .db
        .following_of(&claims.sub.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

pub async fn my_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let rows = state
        .db
        .friends_of(&claims.sub.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

pub async fn my_friend_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let rows = state
        .db
        .friend_requests_of(&claims.sub.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

pub async fn followers_of(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    ensure_user(&state.db, &id.to_string())?;
    let rows = state
        .db
        .followers_of(&id.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

pub async fn following_of(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    ensure_user(&state.db, &id.to_string())?;
    let rows = state
        .db
        .following_of(&id.to_string())
        .map_err(ApiError::Internal)?;
    Ok(Json(to_summaries(rows)))
}

// -- Helpers --

fn ensure_user(db: &Database, id: &str) -> Result<(), ApiError> {
    if db.get_user_by_id(id).map_err(ApiError::Internal)?.is_none() {
        return Err(ApiError::NotFound("User with given id not found"));
    }
    Ok(())
}

fn to_summaries(rows: Vec<UserSummaryRow>) -> Vec<UserSummary> {
    rows.into_iter()
        .map(|row| UserSummary {
            id: parse_uuid(&row.id),
            username: row.username,
            name: row.name,
            avatar: row.avatar,
            bio: row.bio,
        })
        .collect()
}

fn profile_response(db: &Database, id: &str) -> Result<Option<ProfileResponse>, ApiError> {
    let Some(user) = db.get_user_by_id(id).map_err(ApiError::Internal)? else {
        return Ok(None);
    };

    let followers = db.follower_ids(id).map_err(ApiError::Internal)?;
    let following = db.following_ids(id).map_err(ApiError::Internal)?;
    let friends = db.friend_ids(id).map_err(ApiError::Internal)?;
    let friend_requests = db.friend_request_ids(id).map_err(ApiError::Internal)?;

    Ok(Some(ProfileResponse {
        id: parse_uuid(&user.id),
        username: user.username,
        email: user.email,
        phone: user.phone,
        name: user.name,
        avatar: user.avatar,
        bio: user.bio,
        website: user.website,
        location: user.location,
        followers: followers.iter().map(|s| parse_uuid(s)).collect(),
        following: following.iter().map(|s| parse_uuid(s)).collect(),
        friends: friends.iter().map(|s| parse_uuid(s)).collect(),
        friend_requests: friend_requests.iter().map(|s| parse_uuid(s)).collect(),
        created_at: parse_timestamp(&user.created_at),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{register_user, test_state};

    #[tokio::test]
    async fn follow_is_idempotent_guarded() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;

        follow_user(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Path(bob),
        )
        .await
        .unwrap();

        let err = follow_user(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Path(bob),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict("You already follow this user")));

        // Both sides of the relation are visible.
        let bob_profile = profile_response(&state.db, &bob.to_string()).unwrap().unwrap();
        assert_eq!(bob_profile.followers, vec![alice]);
        let alice_profile = profile_response(&state.db, &alice.to_string())
            .unwrap()
            .unwrap();
        assert_eq!(alice_profile.following, vec![bob]);
    }

    #[tokio::test]
    async fn follow_unknown_user_is_404() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;

        let err = follow_user(
            State(state),
            Extension(Claims { sub: alice }),
            Path(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn accept_without_request_fails() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;

        let err = accept_friend_request(
            State(state),
            Extension(Claims { sub: bob }),
            Path(alice),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Conflict("You don't have a friend request from this user")
        ));
    }

    #[tokio::test]
    async fn friend_request_flow_through_handlers() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;

        send_friend_request(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Path(bob),
        )
        .await
        .unwrap();

        let requests = my_friend_requests(State(state.clone()), Extension(Claims { sub: bob }))
            .await
            .unwrap();
        assert_eq!(requests.0.len(), 1);
        assert_eq!(requests.0[0].username, "alice");

        accept_friend_request(
            State(state.clone()),
            Extension(Claims { sub: bob }),
            Path(alice),
        )
        .await
        .unwrap();

        let friends = my_friends(State(state), Extension(Claims { sub: alice }))
            .await
            .unwrap();
        assert_eq!(friends.0.len(), 1);
        assert_eq!(friends.0[0].username, "bob");
    }

    #[tokio::test]
    async fn details_of_unknown_user_is_404() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;

        let err = user_details(
            State(state),
            Extension(Claims { sub: alice }),
            Path(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("User with given id not found")));
    }
}

use axum::extract::State;
use axum::Json;

use flock_types::api::UserRecord;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{parse_timestamp, parse_uuid};

/// GET /api/admin/users — lists every user. This route carries no access
/// control, matching the behavior of the system it replaces.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    let users = state
        .db
        .list_users()
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|row| UserRecord {
            id: parse_uuid(&row.id),
            username: row.username,
            email: row.email,
            phone: row.phone,
            name: row.name,
            avatar: row.avatar,
            bio: row.bio,
            website: row.website,
            location: row.location,
            created_at: parse_timestamp(&row.created_at),
        })
        .collect();

    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{register_user, test_state};

    #[tokio::test]
    async fn lists_all_users_without_password_hashes() {
        let state = test_state();
        register_user(&state, "alice", "alice@x.com").await;
        register_user(&state, "bob", "bob@x.com").await;

        let users = list_users(State(state)).await.unwrap();
        assert_eq!(users.0.len(), 2);

        let body = serde_json::to_string(&users.0).unwrap();
        assert!(!body.contains("password"));
    }
}

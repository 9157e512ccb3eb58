use axum::{extract::State, Json};
use garde::Validate;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::user::{CreateUserRequest, UserResponse},
};

// 利用者の自己登録。認証なしで呼び出せる
pub async fn register_user(
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    req.validate(&())?;

    let user_id = registry.user_repository().create(req.into()).await?;
    let user = registry
        .user_repository()
        .find_current_user(user_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("user not found".into()))?;

    Ok(Json(user.into()))
}

pub async fn get_current_user(user: AuthorizedUser) -> Json<UserResponse> {
    Json(UserResponse::from(user.user))
}

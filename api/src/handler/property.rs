use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{id::PropertyId, property::event::ApproveProperty};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::property::{
        PropertiesResponse, PropertyResponse, RegisterPropertyRequest,
        RegisterPropertyRequestWithOwner,
    },
};

// 物件を登録する。掲載者がオーナーになる
pub async fn register_property(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<RegisterPropertyRequest>,
) -> AppResult<StatusCode> {
    req.validate(&())?;

    registry
        .property_repository()
        .create(RegisterPropertyRequestWithOwner::new(user.id(), req).into())
        .await
        .map(|_| StatusCode::CREATED)
}

// 承認済みの物件だけを一覧で返す
pub async fn show_property_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PropertiesResponse>> {
    registry
        .property_repository()
        .find_approved_all()
        .await
        .map(PropertiesResponse::from)
        .map(Json)
}

pub async fn show_property(
    _user: AuthorizedUser,
    Path(property_id): Path<PropertyId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PropertyResponse>> {
    registry
        .property_repository()
        .find_by_id(property_id)
        .await
        .and_then(|property| match property {
            Some(property) => Ok(Json(property.into())),
            None => Err(AppError::EntityNotFound(format!(
                "物件（{property_id}）が見つかりませんでした。"
            ))),
        })
}

// 管理者のみ実行できる
pub async fn approve_property(
    user: AuthorizedUser,
    Path(property_id): Path<PropertyId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    registry
        .property_repository()
        .approve(ApproveProperty::new(property_id))
        .await
        .map(|_| StatusCode::OK)
}

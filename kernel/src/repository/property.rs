use crate::model::{
    id::PropertyId,
    property::{
        event::{ApproveProperty, CreateProperty},
        Property,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    // 物件を登録する(承認されるまで予約対象にならない)
    async fn create(&self, event: CreateProperty) -> AppResult<PropertyId>;
    // 公開中(承認済み)の物件一覧を取得する
    async fn find_approved_all(&self) -> AppResult<Vec<Property>>;
    async fn find_by_id(&self, property_id: PropertyId) -> AppResult<Option<Property>>;
    // 管理者が物件を承認する
    async fn approve(&self, event: ApproveProperty) -> AppResult<()>;
}

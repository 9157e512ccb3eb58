use kernel::model::{id::UserId, role::Role, user::User};
use shared::error::AppError;
use std::str::FromStr;

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: String,
}

// ログイン検証で使う adapter 内部の型
#[derive(sqlx::FromRow)]
pub struct UserCredentialRow {
    pub user_id: UserId,
    pub password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        let UserRow {
            user_id,
            user_name,
            email,
            role,
        } = value;
        Ok(User {
            user_id,
            user_name,
            email,
            role: Role::from_str(&role)
                .map_err(|_| AppError::ConversionEntityError(format!("unknown role: {role}")))?,
        })
    }
}

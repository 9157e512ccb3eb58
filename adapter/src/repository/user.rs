use crate::database::{model::user::UserRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::UserId,
    role::Role,
    user::{event::CreateUser, User},
};
use kernel::repository::user::UserRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, event: CreateUser) -> AppResult<UserId> {
        let user_id = UserId::new();
        let hashed_password = bcrypt::hash(&event.password, bcrypt::DEFAULT_COST)?;

        let res = sqlx::query(
            r#"
            INSERT INTO users (user_id, user_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(event.user_name)
        .bind(event.email)
        .bind(hashed_password)
        .bind(Role::User.to_string())
        .execute(self.db.inner_ref())
        .await;

        match res {
            Ok(r) if r.rows_affected() < 1 => Err(AppError::NoRowsAffectedError(
                "No user record has been created".into(),
            )),
            Ok(_) => Ok(user_id),
            // email の一意制約違反は入力エラーとして返す
            Err(e) if is_unique_violation(&e) => Err(AppError::UnprocessableEntity(
                "このメールアドレスはすでに登録されています。".into(),
            )),
            Err(e) => Err(AppError::SpecificOperationError(e)),
        }
    }

    async fn find_current_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, user_name, email, role
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(User::try_from).transpose()
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

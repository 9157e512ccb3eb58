use crate::database::{model::user::UserCredentialRow, ConnectionPool};
use crate::redis::{
    model::{RedisKey, RedisValue},
    RedisClient,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    auth::{event::CreateToken, AccessToken},
    id::UserId,
};
use kernel::repository::auth::AuthRepository;
use shared::error::{AppError, AppResult};
use std::{str::FromStr, sync::Arc};

#[derive(new)]
pub struct AuthRepositoryImpl {
    db: ConnectionPool,
    kv: Arc<RedisClient>,
    ttl: u64,
}

#[async_trait]
impl AuthRepository for AuthRepositoryImpl {
    async fn fetch_user_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<UserId>> {
        let key: AuthorizationKey = access_token.into();
        let value = self.kv.get(&key).await?;
        Ok(value.map(AuthorizedUserId::into_inner))
    }

    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId> {
        let row = sqlx::query_as::<_, UserCredentialRow>(
            r#"
            SELECT user_id, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Err(AppError::UnauthenticatedError);
        };

        let valid = bcrypt::verify(password, &row.password_hash)?;
        if !valid {
            return Err(AppError::UnauthenticatedError);
        }

        Ok(row.user_id)
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        let access_token = AccessToken(uuid::Uuid::new_v4().simple().to_string());
        let key: AuthorizationKey = (&access_token).into();
        self.kv
            .set_ex(&key, &AuthorizedUserId(event.user_id), self.ttl)
            .await?;
        Ok(access_token)
    }

    async fn delete_token(&self, access_token: AccessToken) -> AppResult<()> {
        let key: AuthorizationKey = (&access_token).into();
        self.kv.delete(&key).await
    }
}

pub struct AuthorizationKey(String);

impl From<&AccessToken> for AuthorizationKey {
    fn from(token: &AccessToken) -> Self {
        Self(token.0.to_string())
    }
}

impl RedisKey for AuthorizationKey {
    type Value = AuthorizedUserId;

    fn inner(&self) -> String {
        format!("auth:{}", self.0)
    }
}

pub struct AuthorizedUserId(UserId);

impl AuthorizedUserId {
    pub fn into_inner(self) -> UserId {
        self.0
    }
}

impl RedisValue for AuthorizedUserId {
    fn inner(&self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<String> for AuthorizedUserId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(UserId::from_str(&value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user::UserRepositoryImpl;
    use kernel::model::user::event::CreateUser;
    use kernel::repository::user::UserRepository;
    use shared::config::RedisConfig;

    fn redis_client() -> Arc<RedisClient> {
        // Client::open は接続文字列を解釈するだけで、実際の接続は行わない
        Arc::new(
            RedisClient::new(&RedisConfig {
                host: "localhost".into(),
                port: 6379,
            })
            .unwrap(),
        )
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires a running Postgres"]
    async fn verifies_credentials_against_the_stored_hash(pool: sqlx::PgPool) {
        let users = UserRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = users
            .create(CreateUser::new(
                "Valeria".into(),
                "valeria@example.com".into(),
                "clavesegura1".into(),
            ))
            .await
            .unwrap();

        let auth = AuthRepositoryImpl::new(ConnectionPool::new(pool), redis_client(), 60);

        let verified = auth
            .verify_user("valeria@example.com", "clavesegura1")
            .await
            .unwrap();
        assert_eq!(verified, user_id);

        let wrong_password = auth.verify_user("valeria@example.com", "otraclave").await;
        assert!(matches!(
            wrong_password,
            Err(AppError::UnauthenticatedError)
        ));

        let unknown_email = auth.verify_user("nadie@example.com", "clavesegura1").await;
        assert!(matches!(unknown_email, Err(AppError::UnauthenticatedError)));
    }
}

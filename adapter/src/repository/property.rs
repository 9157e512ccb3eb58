use crate::database::{model::property::PropertyRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::PropertyId,
    property::{
        event::{ApproveProperty, CreateProperty},
        Property,
    },
};
use kernel::repository::property::PropertyRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct PropertyRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl PropertyRepository for PropertyRepositoryImpl {
    // 物件を登録する。承認されるまで approved = FALSE のまま
    async fn create(&self, event: CreateProperty) -> AppResult<PropertyId> {
        let property_id = PropertyId::new();
        let res = sqlx::query(
            r#"
            INSERT INTO properties
            (property_id, owned_by, title, description,
            district, address, monthly_rate, rooms, furnished, approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
            "#,
        )
        .bind(property_id)
        .bind(event.owned_by)
        .bind(event.title)
        .bind(event.description)
        .bind(event.district)
        .bind(event.address)
        .bind(event.monthly_rate)
        .bind(event.rooms)
        .bind(event.furnished)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No property record has been created".into(),
            ));
        }

        Ok(property_id)
    }

    // 公開中(承認済み)の物件一覧を取得する
    async fn find_approved_all(&self) -> AppResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, PropertyRow>(
            r#"
            SELECT
                p.property_id,
                p.title,
                p.description,
                p.district,
                p.address,
                p.monthly_rate,
                p.rooms,
                p.furnished,
                p.approved,
                p.owned_by,
                u.user_name AS owner_name
            FROM properties AS p
            INNER JOIN users AS u ON p.owned_by = u.user_id
            WHERE p.approved = TRUE
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Property::from).collect())
    }

    async fn find_by_id(&self, property_id: PropertyId) -> AppResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(
            r#"
            SELECT
                p.property_id,
                p.title,
                p.description,
                p.district,
                p.address,
                p.monthly_rate,
                p.rooms,
                p.furnished,
                p.approved,
                p.owned_by,
                u.user_name AS owner_name
            FROM properties AS p
            INNER JOIN users AS u ON p.owned_by = u.user_id
            WHERE p.property_id = $1
            "#,
        )
        .bind(property_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Property::from))
    }

    // 管理者が物件を承認し、予約可能な状態にする
    async fn approve(&self, event: ApproveProperty) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE properties
            SET approved = TRUE
            WHERE property_id = $1
            "#,
        )
        .bind(event.property_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound("specified property not found".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::id::UserId;
    use rust_decimal_macros::dec;

    fn owner() -> UserId {
        "22222222-2222-2222-2222-222222222222".parse().unwrap()
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn registered_properties_stay_hidden_until_approved(pool: sqlx::PgPool) {
        let repo = PropertyRepositoryImpl::new(ConnectionPool::new(pool));

        let event = CreateProperty {
            title: "Cuarto en Surco".into(),
            description: "Cuarto con escritorio y buena luz.".into(),
            district: "Surco".into(),
            address: "Jr. Monte Umbroso 420".into(),
            monthly_rate: dec!(750.00),
            rooms: 1,
            furnished: true,
            owned_by: owner(),
        };
        let property_id = repo.create(event).await.unwrap();

        // 承認前は一覧に出ない
        let listed = repo.find_approved_all().await.unwrap();
        assert!(listed.iter().all(|p| p.property_id != property_id));

        repo.approve(ApproveProperty::new(property_id)).await.unwrap();

        let listed = repo.find_approved_all().await.unwrap();
        let found = listed
            .iter()
            .find(|p| p.property_id == property_id)
            .unwrap();
        assert_eq!(found.title, "Cuarto en Surco");
        assert_eq!(found.monthly_rate, dec!(750.00));
        assert_eq!(found.owner.owner_id, owner());
        assert!(found.approved);
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn approving_an_unknown_property_fails(pool: sqlx::PgPool) {
        let repo = PropertyRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo.approve(ApproveProperty::new(PropertyId::new())).await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));
    }
}

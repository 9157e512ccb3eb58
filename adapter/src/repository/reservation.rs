use crate::database::{
    model::{
        property::PropertyBookingRow,
        reservation::{ReservationRow, ReservationStateRow},
    },
    ConnectionPool,
};
use async_trait::async_trait;
use chrono::Local;
use derive_new::new;
use kernel::model::id::{PropertyId, ReservationId, UserId};
use kernel::model::reservation::{
    event::{CancelReservation, ConfirmReservation, CreateReservation},
    DateRange, Reservation, ReservationStatus,
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};
use std::time::Duration;

// 直列化異常 (SQLSTATE 40001) で失敗した予約作成をリトライする回数と待ち時間
const MAX_BOOKING_ATTEMPTS: u32 = 3;
const CONFLICT_BACKOFF: Duration = Duration::from_millis(25);

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    // 予約操作を行う
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId> {
        // 過去日付の予約はトランザクションを開く前に拒否する
        let today = Local::now().date_naive();
        if event.period.start_date() < today {
            return Err(AppError::UnprocessableEntity(format!(
                "開始日（{}）が過去のため予約できません。",
                event.period.start_date()
            )));
        }

        let mut attempt = 1;
        loop {
            match self.try_create(&event).await {
                Err(e) if is_serialization_conflict(&e) => {
                    if attempt >= MAX_BOOKING_ATTEMPTS {
                        tracing::warn!(
                            property_id = %event.property_id,
                            attempts = attempt,
                            "booking kept conflicting, giving up"
                        );
                        return Err(AppError::ConflictRetryExceeded);
                    }
                    tracing::debug!(attempt, "serialization conflict, retrying booking");
                    tokio::time::sleep(CONFLICT_BACKOFF * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    // 予約をキャンセルする
    async fn cancel(&self, event: CancelReservation) -> AppResult<()> {
        let Some(state) = self.find_state(event.reservation_id).await? else {
            return Err(AppError::EntityNotFound(format!(
                "予約（ID={}）が見つかりませんでした。",
                event.reservation_id
            )));
        };

        // キャンセルできるのは借り手本人か物件のオーナーのみ
        let is_renter = state.renter_id == event.requested_user;
        let is_owner = state.owner_id == Some(event.requested_user);
        if !is_renter && !is_owner {
            return Err(AppError::ForbiddenOperation);
        }

        // すでにキャンセル済みなら何もしない
        if state.status()?.is_cancelled() {
            return Ok(());
        }

        let res = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1
            WHERE reservation_id = $2
            "#,
        )
        .bind(ReservationStatus::Cancelled.to_string())
        .bind(event.reservation_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been cancelled".into(),
            ));
        }

        Ok(())
    }

    // オーナーが予約を確定する
    async fn confirm(&self, event: ConfirmReservation) -> AppResult<()> {
        let Some(state) = self.find_state(event.reservation_id).await? else {
            return Err(AppError::EntityNotFound(format!(
                "予約（ID={}）が見つかりませんでした。",
                event.reservation_id
            )));
        };

        // 確定できるのは物件のオーナーのみ
        let Some(owner_id) = state.owner_id else {
            return Err(AppError::EntityNotFound(format!(
                "予約（ID={}）の物件が見つかりませんでした。",
                event.reservation_id
            )));
        };
        if owner_id != event.requested_user {
            return Err(AppError::ForbiddenOperation);
        }

        let status = state.status()?;
        // すでに確定済みなら何もしない
        if status == ReservationStatus::Confirmed {
            return Ok(());
        }
        if !status.confirmable() {
            return Err(AppError::UnprocessableEntity(format!(
                "キャンセル済みの予約（ID={}）は確定できません。",
                event.reservation_id
            )));
        }

        // 状態が pending のままのレコードだけを更新する
        let res = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1
            WHERE reservation_id = $2 AND status = $3
            "#,
        )
        .bind(ReservationStatus::Confirmed.to_string())
        .bind(event.reservation_id)
        .bind(ReservationStatus::Pending.to_string())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（ID={}）は pending ではなくなっています。",
                event.reservation_id
            )));
        }

        Ok(())
    }

    // 指定期間に予約可能かどうかを返す
    async fn check_availability(
        &self,
        property_id: PropertyId,
        period: &DateRange,
    ) -> AppResult<bool> {
        let overlapped = overlap_exists(self.db.inner_ref(), property_id, period)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(!overlapped)
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Reservation> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT
            r.reservation_id,
            r.property_id,
            p.title AS property_title,
            r.renter_id,
            u.user_name AS renter_name,
            u.email,
            r.start_date,
            r.end_date,
            r.total_price,
            r.status,
            r.created_at
            FROM reservations AS r
            LEFT JOIN properties AS p ON r.property_id = p.property_id
            INNER JOIN users AS u ON r.renter_id = u.user_id
            WHERE r.reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::EntityNotFound(format!(
                "予約（ID={reservation_id}）が見つかりませんでした。"
            ))),
        }
    }

    // 借り手に紐づく予約一覧を取得する
    async fn find_by_renter(&self, renter_id: UserId) -> AppResult<Vec<Reservation>> {
        // find_by_id の SQL に借り手 ID で絞り込む WHERE 句を入れたもの
        // 出力するレコードは、予約日の新しい順に並べる
        sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT
            r.reservation_id,
            r.property_id,
            p.title AS property_title,
            r.renter_id,
            u.user_name AS renter_name,
            u.email,
            r.start_date,
            r.end_date,
            r.total_price,
            r.status,
            r.created_at
            FROM reservations AS r
            LEFT JOIN properties AS p ON r.property_id = p.property_id
            INNER JOIN users AS u ON r.renter_id = u.user_id
            WHERE r.renter_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(renter_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?
        .into_iter()
        .map(Reservation::try_from)
        .collect()
    }

    // オーナーの物件に入った予約一覧を取得する
    async fn find_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT
            r.reservation_id,
            r.property_id,
            p.title AS property_title,
            r.renter_id,
            u.user_name AS renter_name,
            u.email,
            r.start_date,
            r.end_date,
            r.total_price,
            r.status,
            r.created_at
            FROM reservations AS r
            INNER JOIN properties AS p ON r.property_id = p.property_id
            INNER JOIN users AS u ON r.renter_id = u.user_id
            WHERE p.owned_by = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?
        .into_iter()
        .map(Reservation::try_from)
        .collect()
    }

    // 滞在済み(確定済みで終了日が過去)の予約があるかを返す
    async fn has_completed_stay(
        &self,
        renter_id: UserId,
        property_id: PropertyId,
    ) -> AppResult<bool> {
        let today = Local::now().date_naive();
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM reservations
                WHERE renter_id = $1
                  AND property_id = $2
                  AND status = $3
                  AND end_date < $4
            )
            "#,
        )
        .bind(renter_id)
        .bind(property_id)
        .bind(ReservationStatus::Confirmed.to_string())
        .bind(today)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)
    }
}

impl ReservationRepositoryImpl {
    // create でのトランザクションを利用するにあたり
    // トランザクション分離レベルを SERIALIZABLE にするために
    // 内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    // 予約作成の 1 回分の試行。直列化異常のときは create 側でリトライする
    async fn try_create(&self, event: &CreateReservation) -> AppResult<ReservationId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        self.set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定の物件 ID をもつ物件が存在するか
        // - 存在した場合、その期間は予約済みではないか
        //
        // 上記の両方が Yes だった場合、このブロック以降の処理に進む
        let monthly_rate = {
            //
            // ① 物件の存在確認 ＋ approved チェック
            //
            let property_row = sqlx::query_as::<_, PropertyBookingRow>(
                r#"
                SELECT property_id, monthly_rate, approved
                FROM properties
                WHERE property_id = $1
                "#,
            )
            .bind(event.property_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let property = match property_row {
                None => {
                    return Err(AppError::EntityNotFound(format!(
                        "物件（{}）が見つかりませんでした。",
                        event.property_id
                    )))
                }
                Some(p) => p,
            };

            if !property.approved {
                return Err(AppError::UnprocessableEntity(format!(
                    "物件（{}）は現在公開されていません（approved = false）",
                    event.property_id
                )));
            }

            //
            // ② 希望期間が既存予約と重なっていないか確認
            //    重複条件：
            //        existing.start < new.end AND new.start < existing.end
            //
            if overlap_exists(&mut *tx, event.property_id, &event.period)
                .await
                .map_err(AppError::SpecificOperationError)?
            {
                return Err(AppError::UnavailableDates(format!(
                    "物件（{}）は指定期間（{} 〜 {}）にすでに予約が存在します。",
                    event.property_id,
                    event.period.start_date(),
                    event.period.end_date()
                )));
            }

            property.monthly_rate
        };

        // 合計金額は予約作成時に計算して保存する
        let total_price = event.period.total_price(monthly_rate);

        // 予約処理を行う、すなわち reservations テーブルにレコードを追加する
        let reservation_id = ReservationId::new();
        let res = sqlx::query(
            r#"
            INSERT INTO reservations
            (reservation_id, property_id, renter_id,
            start_date, end_date, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation_id)
        .bind(event.property_id)
        .bind(event.renter_id)
        .bind(event.period.start_date())
        .bind(event.period.end_date())
        .bind(total_price)
        .bind(ReservationStatus::Pending.to_string())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(reservation_id)
    }

    // cancel, confirm の事前チェックで権限と状態を引く内部メソッド
    async fn find_state(
        &self,
        reservation_id: ReservationId,
    ) -> AppResult<Option<ReservationStateRow>> {
        sqlx::query_as::<_, ReservationStateRow>(
            r#"
            SELECT
            r.reservation_id,
            r.renter_id,
            r.status,
            p.owned_by AS owner_id
            FROM reservations AS r
            LEFT JOIN properties AS p ON r.property_id = p.property_id
            WHERE r.reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)
    }
}

// 期間の重複判定は必ずこのクエリを通す。キャンセル済みは枠を塞がない
async fn overlap_exists<'e, E>(
    executor: E,
    property_id: PropertyId,
    period: &DateRange,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM reservations
            WHERE property_id = $1
              AND status <> $4
              AND start_date < $3
              AND $2 < end_date
        )
        "#,
    )
    .bind(property_id)
    .bind(period.start_date())
    .bind(period.end_date())
    .bind(ReservationStatus::Cancelled.to_string())
    .fetch_one(executor)
    .await
}

fn is_serialization_conflict(err: &AppError) -> bool {
    match err {
        AppError::SpecificOperationError(e) | AppError::TransactionError(e) => e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "40001"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn renter() -> UserId {
        "33333333-3333-3333-3333-333333333333".parse().unwrap()
    }

    fn other_renter() -> UserId {
        "44444444-4444-4444-4444-444444444444".parse().unwrap()
    }

    fn owner() -> UserId {
        "22222222-2222-2222-2222-222222222222".parse().unwrap()
    }

    fn approved_property() -> PropertyId {
        "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa".parse().unwrap()
    }

    fn unapproved_property() -> PropertyId {
        "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb".parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(start.0, start.1, start.2), date(end.0, end.1, end.2)).unwrap()
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn creates_a_priced_pending_reservation(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        let event = CreateReservation::new(
            approved_property(),
            renter(),
            period((2030, 6, 1), (2030, 6, 11)),
        );
        let reservation_id = repo.create(event).await.unwrap();

        let reservation = repo.find_by_id(reservation_id).await.unwrap();
        // 月額 900 の 10 泊分
        assert_eq!(reservation.total_price, dec!(300.00));
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.renter.renter_id, renter());
        assert_eq!(reservation.property_title, "Cuarto amoblado en Miraflores");

        // 後から月額が変わっても、保存済みの合計金額は変わらない
        sqlx::query("UPDATE properties SET monthly_rate = 2000.00 WHERE property_id = $1")
            .bind(approved_property())
            .execute(repo.db.inner_ref())
            .await
            .unwrap();
        let reservation = repo.find_by_id(reservation_id).await.unwrap();
        assert_eq!(reservation.total_price, dec!(300.00));
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn rejects_overlap_but_allows_back_to_back(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        repo.create(CreateReservation::new(
            approved_property(),
            renter(),
            period((2030, 6, 1), (2030, 6, 10)),
        ))
        .await
        .unwrap();

        // 期間の内側に食い込む予約は拒否される
        let overlapping = repo
            .create(CreateReservation::new(
                approved_property(),
                other_renter(),
                period((2030, 6, 5), (2030, 6, 8)),
            ))
            .await;
        assert!(matches!(overlapping, Err(AppError::UnavailableDates(_))));

        // チェックアウト日から始まる予約は作成でき、5 泊分の料金になる
        let back_to_back = repo
            .create(CreateReservation::new(
                approved_property(),
                other_renter(),
                period((2030, 6, 10), (2030, 6, 15)),
            ))
            .await
            .unwrap();
        let reservation = repo.find_by_id(back_to_back).await.unwrap();
        assert_eq!(reservation.total_price, dec!(150.00));
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn cancelled_reservations_release_their_dates(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        let first = repo
            .create(CreateReservation::new(
                approved_property(),
                renter(),
                period((2030, 7, 1), (2030, 7, 10)),
            ))
            .await
            .unwrap();

        assert!(!repo
            .check_availability(approved_property(), &period((2030, 7, 1), (2030, 7, 10)))
            .await
            .unwrap());

        repo.cancel(CancelReservation::new(first, renter()))
            .await
            .unwrap();

        assert!(repo
            .check_availability(approved_property(), &period((2030, 7, 1), (2030, 7, 10)))
            .await
            .unwrap());

        // 解放された期間に別の借り手が予約できる
        repo.create(CreateReservation::new(
            approved_property(),
            other_renter(),
            period((2030, 7, 1), (2030, 7, 10)),
        ))
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn rejects_unknown_unapproved_and_past_bookings(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        let unknown = repo
            .create(CreateReservation::new(
                PropertyId::new(),
                renter(),
                period((2030, 6, 1), (2030, 6, 11)),
            ))
            .await;
        assert!(matches!(unknown, Err(AppError::EntityNotFound(_))));

        let unapproved = repo
            .create(CreateReservation::new(
                unapproved_property(),
                renter(),
                period((2030, 6, 1), (2030, 6, 11)),
            ))
            .await;
        assert!(matches!(unapproved, Err(AppError::UnprocessableEntity(_))));

        let past = repo
            .create(CreateReservation::new(
                approved_property(),
                renter(),
                period((2020, 6, 1), (2020, 6, 11)),
            ))
            .await;
        assert!(matches!(past, Err(AppError::UnprocessableEntity(_))));
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn walks_the_reservation_lifecycle(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        let reservation_id = repo
            .create(CreateReservation::new(
                approved_property(),
                renter(),
                period((2030, 8, 1), (2030, 8, 11)),
            ))
            .await
            .unwrap();

        // オーナーが確定する。二重確定は何もしない
        repo.confirm(ConfirmReservation::new(reservation_id, owner()))
            .await
            .unwrap();
        repo.confirm(ConfirmReservation::new(reservation_id, owner()))
            .await
            .unwrap();
        let reservation = repo.find_by_id(reservation_id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);

        // 確定済みでもキャンセルはできる。二重キャンセルは何もしない
        repo.cancel(CancelReservation::new(reservation_id, renter()))
            .await
            .unwrap();
        repo.cancel(CancelReservation::new(reservation_id, renter()))
            .await
            .unwrap();
        let reservation = repo.find_by_id(reservation_id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Cancelled);

        // キャンセル済みは確定できない
        let confirm_cancelled = repo
            .confirm(ConfirmReservation::new(reservation_id, owner()))
            .await;
        assert!(matches!(
            confirm_cancelled,
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn only_involved_users_may_change_a_reservation(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        let reservation_id = repo
            .create(CreateReservation::new(
                approved_property(),
                renter(),
                period((2030, 9, 1), (2030, 9, 11)),
            ))
            .await
            .unwrap();

        // 無関係の借り手はキャンセルできない
        let by_stranger = repo
            .cancel(CancelReservation::new(reservation_id, other_renter()))
            .await;
        assert!(matches!(by_stranger, Err(AppError::ForbiddenOperation)));

        // 借り手本人でも確定はできない(オーナーのみ)
        let by_renter = repo
            .confirm(ConfirmReservation::new(reservation_id, renter()))
            .await;
        assert!(matches!(by_renter, Err(AppError::ForbiddenOperation)));

        // オーナーによるキャンセルは許可される
        repo.cancel(CancelReservation::new(reservation_id, owner()))
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn concurrent_bookings_end_with_a_single_winner(pool: sqlx::PgPool) {
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));
                repo.create(CreateReservation::new(
                    approved_property(),
                    renter(),
                    period((2030, 10, 1), (2030, 10, 11)),
                ))
                .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::UnavailableDates(_)) | Err(AppError::ConflictRetryExceeded) => {}
                Err(e) => panic!("unexpected booking failure: {e:?}"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[sqlx::test(migrations = "../migrations", fixtures("common"))]
    #[ignore = "requires a running Postgres"]
    async fn completed_stays_come_from_confirmed_past_reservations(pool: sqlx::PgPool) {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool));

        // fixture には renter の確定済み・滞在済みの予約が入っている
        assert!(repo
            .has_completed_stay(renter(), approved_property())
            .await
            .unwrap());
        assert!(!repo
            .has_completed_stay(other_renter(), approved_property())
            .await
            .unwrap());
    }
}

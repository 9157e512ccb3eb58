use chrono::NaiveDate;
use kernel::model::{
    id::{PropertyId, ReservationId, UserId},
    reservation::{DateRange, Reservation, ReservationRenter, ReservationStatus},
};
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};
use sqlx::types::chrono::{DateTime, Utc};
use std::str::FromStr;

// 物件が削除されても予約履歴は残すため、タイトルが引けないときに表示する代替文字列
pub const UNAVAILABLE_PROPERTY_TITLE: &str = "Property not available";

// 予約の一覧・詳細を取得する際に使う型
// 物件が削除されている場合は property_title が None になる
#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub property_id: PropertyId,
    pub property_title: Option<String>,
    pub renter_id: UserId,
    pub renter_name: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            property_id,
            property_title,
            renter_id,
            renter_name,
            email,
            start_date,
            end_date,
            total_price,
            status,
            created_at,
        } = value;
        Ok(Reservation {
            reservation_id,
            property_id,
            property_title: property_title.unwrap_or_else(|| UNAVAILABLE_PROPERTY_TITLE.into()),
            renter: ReservationRenter {
                renter_id,
                renter_name,
                email,
            },
            period: DateRange::new(start_date, end_date)?,
            total_price,
            status: parse_status(&status)?,
            reserved_at: created_at,
        })
    }
}

// キャンセル・確定前に権限と現在の状態を確認するための型
// 物件が削除されている場合は owner_id が None になる
#[derive(sqlx::FromRow)]
pub struct ReservationStateRow {
    pub reservation_id: ReservationId,
    pub renter_id: UserId,
    pub status: String,
    pub owner_id: Option<UserId>,
}

impl ReservationStateRow {
    pub fn status(&self) -> AppResult<ReservationStatus> {
        parse_status(&self.status)
    }
}

pub(crate) fn parse_status(value: &str) -> AppResult<ReservationStatus> {
    ReservationStatus::from_str(value).map_err(|_| {
        AppError::ConversionEntityError(format!("unknown reservation status: {value}"))
    })
}

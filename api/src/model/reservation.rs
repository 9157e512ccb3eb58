use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use kernel::model::{
    id::{PropertyId, ReservationId, UserId},
    reservation::{Reservation, ReservationRenter, ReservationStatus},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(skip)]
    pub start_date: NaiveDate,
    #[garde(skip)]
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedReservationResponse {
    pub reservation_id: ReservationId,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatusName {
    Pending,
    Confirmed,
    Cancelled,
}

impl From<ReservationStatus> for ReservationStatusName {
    fn from(value: ReservationStatus) -> Self {
        match value {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Confirmed => Self::Confirmed,
            ReservationStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub property_id: PropertyId,
    pub property_title: String,
    pub renter: ReservationRenterResponse,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: i64,
    pub total_price: Decimal,
    pub status: ReservationStatusName,
    pub reserved_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
            reservation_id,
            property_id,
            property_title,
            renter,
            period,
            total_price,
            status,
            reserved_at,
        } = value;
        Self {
            reservation_id,
            property_id,
            property_title,
            renter: renter.into(),
            start_date: period.start_date(),
            end_date: period.end_date(),
            nights: period.nights(),
            total_price,
            status: status.into(),
            reserved_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRenterResponse {
    pub renter_id: UserId,
    pub renter_name: String,
    pub email: String,
}

impl From<ReservationRenter> for ReservationRenterResponse {
    fn from(value: ReservationRenter) -> Self {
        let ReservationRenter {
            renter_id,
            renter_name,
            email,
        } = value;
        Self {
            renter_id,
            renter_name,
            email,
        }
    }
}

// 空き照会のクエリパラメータ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub property_id: PropertyId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub available: bool,
}

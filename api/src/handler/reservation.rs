use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    id::{PropertyId, ReservationId},
    reservation::{
        event::{CancelReservation, ConfirmReservation, CreateReservation},
        DateRange,
    },
};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    extractor::AuthorizedUser,
    model::reservation::{
        AvailabilityQuery, AvailabilityResponse, CreateReservationRequest,
        CreatedReservationResponse, ReservationResponse, ReservationsResponse,
    },
};

// 指定した物件を期間を決めて予約する
pub async fn reserve_property(
    user: AuthorizedUser,
    Path(property_id): Path<PropertyId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<CreatedReservationResponse>)> {
    req.validate(&())?;

    // 期間の前後関係はここで検証される
    let period = DateRange::new(req.start_date, req.end_date)?;

    let reservation_id = registry
        .reservation_repository()
        .create(CreateReservation::new(property_id, user.id(), period))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedReservationResponse { reservation_id }),
    ))
}

// 指定期間に空きがあるかを返す。予約は作らない
pub async fn check_availability(
    _user: AuthorizedUser,
    Path(property_id): Path<PropertyId>,
    Query(query): Query<AvailabilityQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AvailabilityResponse>> {
    let period = DateRange::new(query.from, query.to)?;

    let available = registry
        .reservation_repository()
        .check_availability(property_id, &period)
        .await?;

    Ok(Json(AvailabilityResponse {
        property_id,
        from: period.start_date(),
        to: period.end_date(),
        available,
    }))
}

pub async fn show_reservation(
    _user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationResponse>> {
    registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await
        .map(ReservationResponse::from)
        .map(Json)
}

// 自分が借り手となっている予約の一覧
pub async fn show_my_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    registry
        .reservation_repository()
        .find_by_renter(user.id())
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

// 自分がオーナーの物件に入っている予約の一覧
pub async fn show_owned_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    registry
        .reservation_repository()
        .find_by_owner(user.id())
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

// 借り手本人または物件オーナーだけがキャンセルできる
pub async fn cancel_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .reservation_repository()
        .cancel(CancelReservation::new(reservation_id, user.id()))
        .await
        .map(|_| StatusCode::OK)
}

// 物件オーナーだけが承諾できる
pub async fn confirm_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .reservation_repository()
        .confirm(ConfirmReservation::new(reservation_id, user.id()))
        .await
        .map(|_| StatusCode::OK)
}

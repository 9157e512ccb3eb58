use crate::model::{
    id::{PropertyId, ReservationId, UserId},
    reservation::{
        event::{CancelReservation, ConfirmReservation, CreateReservation},
        DateRange, Reservation,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 予約を作成し、重複予約は拒否する
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId>;
    // 予約をキャンセルする(既にキャンセル済みなら何もしない)
    async fn cancel(&self, event: CancelReservation) -> AppResult<()>;
    // オーナーが予約を確定する
    async fn confirm(&self, event: ConfirmReservation) -> AppResult<()>;
    // 指定期間に予約可能かどうかを返す
    async fn check_availability(
        &self,
        property_id: PropertyId,
        period: &DateRange,
    ) -> AppResult<bool>;
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Reservation>;
    // 借り手に紐づく予約一覧を取得する
    async fn find_by_renter(&self, renter_id: UserId) -> AppResult<Vec<Reservation>>;
    // オーナーの物件に入った予約一覧を取得する
    async fn find_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Reservation>>;
    // 滞在済み(確定済みで終了日が過去)の予約があるかを返す
    async fn has_completed_stay(
        &self,
        renter_id: UserId,
        property_id: PropertyId,
    ) -> AppResult<bool>;
}

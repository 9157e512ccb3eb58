use crate::model::id::{PropertyId, ReservationId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};
use strum::{Display, EnumString};

pub mod event;

// 月額料金を日割りにするときの基準日数
pub const BILLING_DAYS_PER_MONTH: i64 = 30;

// 予約期間。開始日は宿泊初日、終了日はチェックアウト日（次の予約に開放される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<Self> {
        if start_date >= end_date {
            return Err(AppError::UnprocessableEntity(format!(
                "end date {end_date} must be after start date {start_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    // 期間が重なるかどうか。境界日の共有は重複にしない
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }

    // 合計金額 = (月額 / 30) × 泊数。セントへの丸めは最後に一度だけ行う
    pub fn total_price(&self, monthly_rate: Decimal) -> Decimal {
        (monthly_rate / Decimal::from(BILLING_DAYS_PER_MONTH) * Decimal::from(self.nights()))
            .round_dp(2)
    }
}

// 予約の状態。滞在完了は保存せず「確定済みかつ終了日が過去」で導出する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn confirmable(self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub property_id: PropertyId,
    pub property_title: String,
    pub renter: ReservationRenter,
    pub period: DateRange,
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ReservationRenter {
    pub renter_id: UserId,
    pub renter_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(start.0, start.1, start.2), date(end.0, end.1, end.2)).unwrap()
    }

    #[test]
    fn rejects_inverted_and_empty_periods() {
        assert!(DateRange::new(date(2024, 6, 10), date(2024, 6, 1)).is_err());
        assert!(DateRange::new(date(2024, 6, 10), date(2024, 6, 10)).is_err());
    }

    #[test]
    fn detects_overlapping_periods() {
        let booked = range((2024, 6, 1), (2024, 6, 10));
        // 同一期間
        assert!(booked.overlaps(&range((2024, 6, 1), (2024, 6, 10))));
        // 内包される
        assert!(booked.overlaps(&range((2024, 6, 5), (2024, 6, 8))));
        // 内包する
        assert!(booked.overlaps(&range((2024, 5, 20), (2024, 6, 20))));
        // 開始側が重なる
        assert!(booked.overlaps(&range((2024, 5, 25), (2024, 6, 2))));
        // 終了側が重なる
        assert!(booked.overlaps(&range((2024, 6, 9), (2024, 6, 15))));
    }

    #[test]
    fn back_to_back_periods_do_not_overlap() {
        let booked = range((2024, 6, 1), (2024, 6, 10));
        assert!(!booked.overlaps(&range((2024, 6, 10), (2024, 6, 15))));
        assert!(!booked.overlaps(&range((2024, 5, 20), (2024, 6, 1))));
        assert!(!booked.overlaps(&range((2024, 6, 20), (2024, 6, 25))));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = range((2024, 6, 1), (2024, 6, 10));
        let b = range((2024, 6, 9), (2024, 6, 15));
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
        let c = range((2024, 6, 10), (2024, 6, 15));
        assert_eq!(a.overlaps(&c), c.overlaps(&a));
    }

    #[test]
    fn prices_ten_nights_at_nine_hundred_a_month() {
        let period = range((2024, 6, 1), (2024, 6, 11));
        assert_eq!(period.nights(), 10);
        assert_eq!(period.total_price(dec!(900)), dec!(300.00));
    }

    #[test]
    fn rounds_the_total_once_at_the_end() {
        // 1000 / 30 = 33.333... の7泊分は 233.33 になる
        let period = range((2024, 6, 1), (2024, 6, 8));
        assert_eq!(period.total_price(dec!(1000)), dec!(233.33));
    }

    #[test]
    fn one_night_at_thirty_a_month_costs_one() {
        let period = range((2024, 6, 1), (2024, 6, 2));
        assert_eq!(period.total_price(dec!(30)), dec!(1.00));
    }

    #[test]
    fn parses_and_formats_status_names() {
        assert_eq!(
            "pending".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Pending
        );
        assert_eq!(ReservationStatus::Confirmed.to_string(), "confirmed");
        assert!("completed".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn only_pending_reservations_are_confirmable() {
        assert!(ReservationStatus::Pending.confirmable());
        assert!(!ReservationStatus::Confirmed.confirmable());
        assert!(!ReservationStatus::Cancelled.confirmable());
    }
}

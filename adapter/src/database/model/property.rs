use kernel::model::{
    id::{PropertyId, UserId},
    property::{Property, PropertyOwner},
};
use rust_decimal::Decimal;

#[derive(sqlx::FromRow)]
pub struct PropertyRow {
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub district: String,
    pub address: String,
    pub monthly_rate: Decimal,
    pub rooms: i32,
    pub furnished: bool,
    pub approved: bool,
    pub owned_by: UserId,
    pub owner_name: String,
}

impl From<PropertyRow> for Property {
    fn from(value: PropertyRow) -> Self {
        let PropertyRow {
            property_id,
            title,
            description,
            district,
            address,
            monthly_rate,
            rooms,
            furnished,
            approved,
            owned_by,
            owner_name,
        } = value;
        Property {
            property_id,
            title,
            description,
            district,
            address,
            monthly_rate,
            rooms,
            furnished,
            approved,
            owner: PropertyOwner {
                owner_id: owned_by,
                owner_name,
            },
        }
    }
}

// 予約作成時に料金と公開状態だけを引くための adapter 内部の型
#[derive(sqlx::FromRow)]
pub struct PropertyBookingRow {
    pub property_id: PropertyId,
    pub monthly_rate: Decimal,
    pub approved: bool,
}

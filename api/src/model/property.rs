use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::{PropertyId, UserId},
    property::{event::CreateProperty, Property, PropertyOwner},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPropertyRequest {
    #[garde(length(min = 1))]
    title: String,
    #[garde(length(min = 1))]
    description: String,
    #[garde(length(min = 1))]
    district: String,
    #[garde(length(min = 1))]
    address: String,
    // 月額賃料は正の値のみ受け付ける
    #[garde(custom(positive_rate))]
    monthly_rate: Decimal,
    #[garde(range(min = 1))]
    rooms: i32,
    #[garde(skip)]
    furnished: bool,
}

fn positive_rate(value: &Decimal, _ctx: &()) -> garde::Result {
    if *value <= Decimal::ZERO {
        return Err(garde::Error::new("monthly rate must be positive"));
    }
    Ok(())
}

#[derive(new)]
pub struct RegisterPropertyRequestWithOwner(UserId, RegisterPropertyRequest);

impl From<RegisterPropertyRequestWithOwner> for CreateProperty {
    fn from(value: RegisterPropertyRequestWithOwner) -> Self {
        let RegisterPropertyRequestWithOwner(
            owned_by,
            RegisterPropertyRequest {
                title,
                description,
                district,
                address,
                monthly_rate,
                rooms,
                furnished,
            },
        ) = value;
        CreateProperty {
            title,
            description,
            district,
            address,
            monthly_rate,
            rooms,
            furnished,
            owned_by,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesResponse {
    pub items: Vec<PropertyResponse>,
}

impl From<Vec<Property>> for PropertiesResponse {
    fn from(value: Vec<Property>) -> Self {
        Self {
            items: value.into_iter().map(PropertyResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyResponse {
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub district: String,
    pub address: String,
    pub monthly_rate: Decimal,
    pub rooms: i32,
    pub furnished: bool,
    pub approved: bool,
    pub owner: PropertyOwnerResponse,
}

impl From<Property> for PropertyResponse {
    fn from(value: Property) -> Self {
        let Property {
            property_id,
            title,
            description,
            district,
            address,
            monthly_rate,
            rooms,
            furnished,
            approved,
            owner,
        } = value;
        Self {
            property_id,
            title,
            description,
            district,
            address,
            monthly_rate,
            rooms,
            furnished,
            approved,
            owner: owner.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOwnerResponse {
    pub owner_id: UserId,
    pub owner_name: String,
}

impl From<PropertyOwner> for PropertyOwnerResponse {
    fn from(value: PropertyOwner) -> Self {
        let PropertyOwner {
            owner_id,
            owner_name,
        } = value;
        Self {
            owner_id,
            owner_name,
        }
    }
}

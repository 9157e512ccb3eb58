pub mod auth;
pub mod id;
pub mod property;
pub mod reservation;
pub mod role;
pub mod user;

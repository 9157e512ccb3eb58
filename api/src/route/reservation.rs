use axum::{
    routing::{get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::reservation::{
    cancel_reservation, check_availability, confirm_reservation, reserve_property,
    show_my_reservations, show_owned_reservations, show_reservation,
};

pub fn build_reservation_routers() -> Router<AppRegistry> {
    // 予約の作成と空き照会は物件配下のパスで公開する
    let property_routers = Router::new()
        .route("/:property_id/reservations", post(reserve_property))
        .route("/:property_id/availability", get(check_availability));

    let reservation_routers = Router::new()
        .route("/me", get(show_my_reservations))
        .route("/owned", get(show_owned_reservations))
        .route("/:reservation_id", get(show_reservation))
        .route("/:reservation_id/cancel", put(cancel_reservation))
        .route("/:reservation_id/confirm", put(confirm_reservation));

    Router::new()
        .nest("/properties", property_routers)
        .nest("/reservations", reservation_routers)
}

use axum::{
    routing::{get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::property::{
    approve_property, register_property, show_property, show_property_list,
};

pub fn build_property_routers() -> Router<AppRegistry> {
    let property_routers = Router::new()
        .route("/", post(register_property))
        .route("/", get(show_property_list))
        .route("/:property_id", get(show_property))
        .route("/:property_id/approve", put(approve_property));

    Router::new().nest("/properties", property_routers)
}

use actix_web::web;

use crate::handlers::role;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/get-user-role")
            .route(web::post().to(role::get_user_role))
            .default_service(web::to(role::method_not_allowed))
    );
}

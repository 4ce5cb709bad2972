use actix_web::web;

use crate::handlers::auth;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::password_reset)
            .service(auth::logout)
    );
}

use actix_web::web;

use crate::handlers::home::home;

mod auth;
mod admin;
mod dashboard;
mod wizard;
mod role;
mod json_error;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);

    cfg.configure(role::config_routes);

    cfg.service(
        web::scope("/api/v1")
            .configure(auth::config_routes)
            .configure(admin::config_routes)
            .configure(dashboard::config_routes)
            .configure(wizard::config_routes)
    );

    cfg.configure(json_error::config_routes);
}

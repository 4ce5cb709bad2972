use actix_web::web;

use crate::handlers::dashboard;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .service(
                web::resource("")
                    .route(web::get().to(dashboard::get_dashboard))
            )
            .service(
                web::resource("/filters")
                    .route(web::put().to(dashboard::update_filters))
                    .route(web::delete().to(dashboard::clear_filters))
            )
            .service(
                web::resource("/sort/{key}")
                    .route(web::post().to(dashboard::request_sort))
            )
            .service(
                web::resource("/selection")
                    .route(web::post().to(dashboard::toggle_select_all))
            )
            .service(
                web::resource("/selection/{plant_id}")
                    .route(web::post().to(dashboard::toggle_row))
            )
            .service(
                web::resource("/delete-selected")
                    .route(web::post().to(dashboard::delete_selected))
            )
            .service(
                web::resource("/export")
                    .route(web::get().to(dashboard::export))
            )
    );
}

use actix_web::web;

use crate::handlers::wizard;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wizard")
            .service(web::resource("").route(web::get().to(wizard::get_wizard)))
            .service(web::resource("/new").route(web::post().to(wizard::open_new)))
            .service(web::resource("/edit/{plant_id}").route(web::post().to(wizard::open_edit)))
            .service(web::resource("/draft").route(web::patch().to(wizard::update_draft)))
            .service(web::resource("/photo").route(web::post().to(wizard::upload_photo)))
            .service(web::resource("/scan").route(web::post().to(wizard::scan)))
            .service(web::resource("/location").route(web::post().to(wizard::capture_location)))
            .service(web::resource("/next").route(web::post().to(wizard::next_step)))
            .service(web::resource("/previous").route(web::post().to(wizard::previous_step)))
            .service(web::resource("/submit").route(web::post().to(wizard::submit)))
            .service(web::resource("/exit").route(web::post().to(wizard::exit)))
    );
}

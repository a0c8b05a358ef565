use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::ServerConfig;
use crate::grading::Grader;
use crate::routes::{
    describe_handler, json_error_handler, list_handler, post_grade_handler, post_output_handler,
};

/// Registers every grading route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(post_grade_handler)
        .service(post_output_handler)
        .service(list_handler)
        .service(describe_handler);
}

pub fn build_server(server_config: ServerConfig, grader: web::Data<Grader>) -> std::io::Result<Server> {
    let address = server_config.address();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(grader.clone())
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(address.clone())?
    .run();

    log::info!("Listening on {}:{}", address.0, address.1);
    Ok(server)
}

mod grade;
mod list;
mod output;

pub use grade::post_grade_handler;
pub use list::{describe_handler, list_handler};
pub use output::{ExpectedOutputResponse, post_output_handler};

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;

use crate::grading::{GradeError, ValidationError};

#[derive(Serialize)]
struct ErrorResponse {
    reason: &'static str,
    code: u32,
}

#[derive(Serialize)]
struct ErrorResponseWithMessage {
    reason: &'static str,
    code: u32,
    message: String,
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::info!("Error decoding input: {err}");
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        reason: "ERR_INVALID_ARGUMENT",
        code: 1,
    });
    InternalError::from_response(err, response).into()
}

fn validation_error_response(err: ValidationError) -> HttpResponse {
    log::info!("Error validating input: {err}");
    HttpResponse::BadRequest().json(ErrorResponseWithMessage {
        reason: "ERR_INVALID_ARGUMENT",
        code: 1,
        message: format!("Error validating input: {err}"),
    })
}

fn grade_error_response(err: GradeError) -> HttpResponse {
    log::error!("{err}");
    HttpResponse::InternalServerError().json(ErrorResponseWithMessage {
        reason: "ERR_INTERNAL",
        code: 6,
        message: err.to_string(),
    })
}

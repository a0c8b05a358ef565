use actix_web::{HttpResponse, Responder, post, web};

use super::{grade_error_response, validation_error_response};
use crate::grading::{CandidatePolicy, Grader, GradingRequest};
use crate::sandbox::ExecutionMode;

#[post("/grade/{mode}")]
pub async fn post_grade_handler(
    mode: web::Path<ExecutionMode>,
    grader: web::Data<Grader>,
    body: web::Json<GradingRequest>,
) -> impl Responder {
    let mut request = body.into_inner();
    request.mode = mode.into_inner();

    let request = match request.validate(CandidatePolicy::Required) {
        Ok(request) => request,
        Err(e) => return validation_error_response(e),
    };

    log::debug!(
        "Grading {} request with {} tests",
        request.mode.tag(),
        request.cases.len()
    );

    match grader.grade(&request).await {
        Ok(verdict) => HttpResponse::Ok().json(verdict),
        Err(e) => grade_error_response(e),
    }
}

use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};

use super::{grade_error_response, validation_error_response};
use crate::grading::{CandidatePolicy, Grader, GradingRequest};
use crate::sandbox::ExecutionMode;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ExpectedOutputResponse {
    /// One entry per visible test
    pub output: Vec<String>,
}

/// Runs only the reference solution and returns what it printed
#[post("/output/{mode}")]
pub async fn post_output_handler(
    mode: web::Path<ExecutionMode>,
    grader: web::Data<Grader>,
    body: web::Json<GradingRequest>,
) -> impl Responder {
    let mut request = body.into_inner();
    request.mode = mode.into_inner();

    let request = match request.validate(CandidatePolicy::Deferred) {
        Ok(request) => request,
        Err(e) => return validation_error_response(e),
    };

    match grader.expected_outputs(&request).await {
        Ok(output) => HttpResponse::Ok().json(ExpectedOutputResponse { output }),
        Err(e) => grade_error_response(e),
    }
}

use actix_web::{HttpResponse, Responder, get, web};

use crate::problem_types;
use crate::sandbox::ExecutionMode;

#[get("/list")]
pub async fn list_handler() -> impl Responder {
    HttpResponse::Ok().json(problem_types::all())
}

#[get("/list/{mode}")]
pub async fn describe_handler(mode: web::Path<ExecutionMode>) -> impl Responder {
    HttpResponse::Ok().json(problem_types::describe(mode.into_inner()))
}

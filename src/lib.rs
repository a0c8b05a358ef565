pub mod config;
pub mod grading;
pub mod problem_types;
pub mod routes;
pub mod sandbox;
pub mod web_server;

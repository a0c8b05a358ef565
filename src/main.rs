use actix_web::web;
use clap::Parser;

use grader::config::CliArgs;
use grader::grading::Grader;
use grader::sandbox::create_sandbox_runner;
use grader::web_server::build_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let config = cli.to_config()?;
    let ceiling = config.sandbox.ceiling()?;
    log::info!(
        "Per-run ceilings: {}s wall clock, {}MB memory",
        ceiling.max_seconds,
        ceiling.max_mb
    );

    let runner = create_sandbox_runner(&config.sandbox)?;
    let grader = web::Data::new(Grader::new(runner));

    // ======= PREPARATION END, EXECUTION START =======

    let server = build_server(config.server, grader)?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
    }

    // In-flight gradings finish before the server stops
    server_handle.stop(true).await;

    log::info!("Shutdown complete");
    Ok(())
}

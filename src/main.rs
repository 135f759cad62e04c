use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod images;
mod logger;
mod model;
mod server;
mod service;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path_from_args(std::env::args().skip(1));
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Create Tokio runtime, thread count from the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr, cfg.performance.backlog)?;
    let state = Arc::new(config::AppState::new(&cfg));

    logger::log_server_start(&addr, &cfg);

    server::start_server_loop(listener, state, server::signal::shutdown_signal()).await;
    Ok(())
}

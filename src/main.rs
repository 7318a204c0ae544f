// src/main.rs

mod app_state;
mod auth;
mod config;
mod db;
mod message_hub;
mod models;
mod registry;
mod scheduler;
#[cfg(test)]
mod test_util;
mod ws_session;

use std::sync::Arc;

use actix::Actor;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::error;
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::ws_session::ws_index;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    // Start the hub actor that owns the session registry
    let hub = message_hub::MessageHub::new(mongodb.clone()).start();

    // One reconciliation task per process; cancelled and joined on the way out
    let shutdown = CancellationToken::new();
    let reconciler = actix_web::rt::spawn(scheduler::run(mongodb.clone(), shutdown.clone()));

    println!("Server running at http://{}", config.bind_addr);

    let state = AppState {
        hub,
        config: config.clone(),
    };

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            // WEBSOCKET route for real-time
            .service(web::resource("/ws").route(web::get().to(ws_index)))
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    shutdown.cancel();
    if let Err(e) = reconciler.await {
        error!("Reconciliation job did not stop cleanly: {}", e);
    }

    Ok(())
}

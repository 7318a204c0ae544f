// File: test_util.rs

use std::sync::{Arc, Mutex};

use actix::prelude::*;
use mongodb::options::ClientOptions;
use mongodb::Client;

use crate::db::MongoDB;
use crate::message_hub::SessionEvent;

/// Collects every event pushed to it, standing in for a live websocket
/// session.
pub struct Recorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl Actor for Recorder {
    type Context = Context<Self>;
}

impl Handler<SessionEvent> for Recorder {
    type Result = ();

    fn handle(&mut self, event: SessionEvent, _: &mut Context<Self>) {
        self.events.lock().unwrap().push(event);
    }
}

/// Drains the recorder mailbox: once this is answered, every earlier
/// `do_send` has been handled.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Flush;

impl Handler<Flush> for Recorder {
    type Result = ();

    fn handle(&mut self, _: Flush, _: &mut Context<Self>) {}
}

pub fn recorder() -> (Addr<Recorder>, Arc<Mutex<Vec<SessionEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let addr = Recorder {
        events: events.clone(),
    }
    .start();
    (addr, events)
}

/// A database handle whose server does not exist: construction does no I/O,
/// and every operation fails after a short server-selection timeout.
pub async fn offline_db() -> Arc<MongoDB> {
    let options = ClientOptions::parse("mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=300")
        .await
        .unwrap();
    let client = Client::with_options(options).unwrap();
    Arc::new(MongoDB {
        db: client.database("staffhub_test"),
    })
}

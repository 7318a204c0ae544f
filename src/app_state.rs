use crate::config::Config;
use crate::message_hub::MessageHub;
use actix::Addr;

#[derive(Clone)]
pub struct AppState {
    pub hub: Addr<MessageHub>,
    pub config: Config,
}

// File: ws_session.rs

use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, error, warn};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth;
use crate::message_hub::{
    Connect, Disconnect, HubError, MessageHub, SendGroupMessage, SendPrivateMessage, SessionEvent,
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames a client may submit over the socket, tagged with a `type` field
/// so new kinds can be added without sniffing payload shapes.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    PrivateMessage { receiver_id: String, content: String },
    GroupMessage { group_id: String, content: String },
}

/// One actor per websocket connection. Registers itself with the hub under
/// the identity resolved at handshake time and forwards client frames as
/// hub operations.
pub struct WsSession {
    /// Resolved logical identity. `None` means the handshake carried no
    /// valid token; the socket stays open but is never registered and all
    /// of its sends are rejected.
    user_id: Option<String>,
    hb: Instant,
    hub: Addr<MessageHub>,
}

impl WsSession {
    pub fn new(user_id: Option<String>, hub: Addr<MessageHub>) -> Self {
        WsSession {
            user_id,
            hb: Instant::now(),
            hub,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("Websocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn push_event(&self, ctx: &mut ws::WebsocketContext<Self>, event: &SessionEvent) {
        match serde_json::to_string(event) {
            Ok(json) => ctx.text(json),
            Err(e) => error!("Failed to encode push event: {}", e),
        }
    }

    /// Restarts the liveness clock. While a send is parked on the hub the
    /// session emits no pings and reads no pongs, so elapsed wait time must
    /// not count toward the client timeout.
    fn reset_heartbeat(&mut self) {
        self.hb = Instant::now();
    }

    /// Hands one send to the hub and parks the session until it answers.
    /// Holding further frames while a send is in flight keeps each
    /// connection's messages in submission order.
    fn submit<F>(&mut self, ctx: &mut ws::WebsocketContext<Self>, request: F)
    where
        F: std::future::Future<Output = Result<Result<(), HubError>, MailboxError>> + 'static,
    {
        let fut = request.into_actor(self).map(|res, act, ctx| {
            act.reset_heartbeat();
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Send failed: {}", e);
                    act.push_event(
                        ctx,
                        &SessionEvent::SendRejected {
                            reason: "message could not be saved; try again".to_string(),
                        },
                    );
                }
                Err(e) => {
                    error!("Message hub unreachable: {}", e);
                    ctx.stop();
                }
            }
        });
        ctx.wait(fut);
    }

    fn handle_frame(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Unparseable client frame: {}", e);
                return;
            }
        };

        let sender_id = match &self.user_id {
            Some(id) => id.clone(),
            None => {
                warn!("Dropping send from unidentified session");
                self.push_event(
                    ctx,
                    &SessionEvent::SendRejected {
                        reason: "connection is not authenticated".to_string(),
                    },
                );
                return;
            }
        };

        match frame {
            ClientFrame::PrivateMessage {
                receiver_id,
                content,
            } => {
                let request = self.hub.send(SendPrivateMessage {
                    sender_id,
                    receiver_id,
                    content,
                });
                self.submit(ctx, request);
            }
            ClientFrame::GroupMessage { group_id, content } => {
                let request = self.hub.send(SendGroupMessage {
                    sender_id,
                    group_id,
                    content,
                    exclude: Some(ctx.address().recipient()),
                });
                self.submit(ctx, request);
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        match &self.user_id {
            Some(user_id) => self.hub.do_send(Connect {
                user_id: user_id.clone(),
                addr: ctx.address().recipient(),
            }),
            None => warn!("Websocket session opened without identity; it will receive no pushes"),
        }
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        if let Some(user_id) = &self.user_id {
            self.hub.do_send(Disconnect {
                user_id: user_id.clone(),
                addr: ctx.address().recipient(),
            });
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => self.handle_frame(&text, ctx),
            Ok(ws::Message::Close(reason)) => {
                debug!("Client closed websocket: {:?}", reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("Websocket protocol error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<SessionEvent> for WsSession {
    type Result = ();

    fn handle(&mut self, event: SessionEvent, ctx: &mut Self::Context) {
        self.push_event(ctx, &event);
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let identity = auth::resolve_identity(&req, &data.config.jwt_secret);
    if identity.is_none() {
        warn!("Websocket handshake without resolvable identity; connection stays unregistered");
    }
    ws::start(WsSession::new(identity, data.hub.clone()), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::offline_db;

    #[actix_rt::test]
    async fn hub_reply_resets_the_heartbeat_clock() {
        let hub = MessageHub::new(offline_db().await).start();
        let mut session = WsSession::new(Some("u-1".to_string()), hub);

        // A send that outlived the client timeout while the session was
        // parked on the hub.
        session.hb = Instant::now() - (CLIENT_TIMEOUT + Duration::from_millis(100));
        assert!(Instant::now().duration_since(session.hb) > CLIENT_TIMEOUT);

        session.reset_heartbeat();
        assert!(Instant::now().duration_since(session.hb) <= CLIENT_TIMEOUT);
    }

    #[test]
    fn parses_private_message_frame() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"private_message","receiver_id":"u-2","content":"hi"}"#,
        )
        .unwrap();
        match frame {
            ClientFrame::PrivateMessage {
                receiver_id,
                content,
            } => {
                assert_eq!(receiver_id, "u-2");
                assert_eq!(content, "hi");
            }
            other => panic!("wrong frame: {:?}", other),
        }
    }

    #[test]
    fn parses_group_message_frame() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"group_message","group_id":"g-1","content":"hi"}"#)
                .unwrap();
        match frame {
            ClientFrame::GroupMessage { group_id, content } => {
                assert_eq!(group_id, "g-1");
                assert_eq!(content, "hi");
            }
            other => panic!("wrong frame: {:?}", other),
        }
    }

    #[test]
    fn frames_without_a_type_tag_are_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"receiver_id":"u-2","content":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_frame_types_are_rejected() {
        let result =
            serde_json::from_str::<ClientFrame>(r#"{"type":"broadcast","content":"to all"}"#);
        assert!(result.is_err());
    }
}

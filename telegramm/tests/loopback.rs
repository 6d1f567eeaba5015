//! A request/response round trip over a real TCP socket.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use telegramm::{
    client::Client,
    define_api,
    server::{Handler, Response, Server, ServerRequest},
};
use tokio::net::TcpListener;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Pong;

define_api! {
    mod message;
    pub enum TestMessage {
        Echo(String) => String,
        Fail(String) => (),
        Ping => Pong,
    }
}

#[derive(Clone)]
struct TestHandler;

#[async_trait]
impl Handler<TestMessage> for TestHandler {
    async fn handle(&self, _addr: &SocketAddr, req: TestMessage) -> Result<Response, BoxError> {
        match req {
            TestMessage::Echo(params) => message::Echo::response(params.0),
            TestMessage::Fail(params) => Err(params.0.into()),
            TestMessage::Ping(_) => message::Ping::response(Pong),
        }
    }
}

#[tokio::test]
async fn echo_round_trip() {
    let _ = pretty_env_logger::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string().parse().unwrap();
    tokio::spawn(Server::new(TestHandler).serve(listener));

    let mut client = Client::new(addr);

    let response = client
        .send_request(message::Echo("balise".to_string()))
        .await
        .unwrap();
    assert_eq!(response, "balise");

    // Requests reuse the pooled connection.
    client.send_request(message::Ping).await.unwrap();

    // Handler errors surface as server errors, not broken connections.
    let err = client
        .send_request(message::Fail("kaputt".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, telegramm::Error::Server(message) if message == "kaputt"));

    // The connection still works afterwards.
    let response = client
        .send_request(message::Echo("weiter".to_string()))
        .await
        .unwrap();
    assert_eq!(response, "weiter");
}

use std::io::Write;
use std::net::TcpStream;

use jotwire_decode::{FromJson, ToJson};
use jotwire_frame::{FrameConfig, FrameReader, FrameWriter};
use jotwire_transport::{Connection, Endpoint};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Blocking client side of a jotwire connection.
pub struct Client {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
    peer: Endpoint,
}

/// Connect to a server at `endpoint`.
pub fn connect(endpoint: Endpoint) -> Result<Client> {
    connect_with_config(endpoint, FrameConfig::default())
}

/// Connect with explicit payload limit and timeouts.
pub fn connect_with_config(endpoint: Endpoint, config: FrameConfig) -> Result<Client> {
    let stream = Connection::connect(endpoint)?.into_stream();
    let reader_stream = stream.try_clone()?;

    let reader = FrameReader::with_config_tcp(reader_stream, config.clone())?;
    let writer = FrameWriter::with_config_tcp(stream, config)?;
    debug!(%endpoint, "client ready");

    Ok(Client {
        reader,
        writer,
        peer: endpoint,
    })
}

impl Client {
    pub fn send(&mut self, message: &Value) -> Result<()> {
        self.writer.send(message)?;
        Ok(())
    }

    pub fn send_message<M: ToJson + ?Sized>(&mut self, message: &M) -> Result<()> {
        self.send(&message.to_json())
    }

    /// Write bytes to the socket without framing them.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let mut stream = self.writer.get_ref();
        stream.write_all(bytes)?;
        Ok(())
    }

    /// Block until the next frame arrives.
    pub fn recv(&mut self) -> Result<Value> {
        Ok(self.reader.read_frame()?)
    }

    pub fn recv_message<M: FromJson>(&mut self) -> Result<M> {
        let value = self.recv()?;
        Ok(M::from_json(&value)?)
    }

    /// Send `message` and wait for the next frame.
    pub fn request(&mut self, message: &Value) -> Result<Value> {
        self.send(message)?;
        self.recv()
    }

    pub fn peer(&self) -> Endpoint {
        self.peer
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("peer", &self.peer).finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use jotwire_decode::{Message, ReturnMessage, StackDirection, ViewEmbedding};
    use serde_json::json;

    use super::*;
    use crate::handler::TypedHandler;
    use crate::server::{JsonServer, ServerConfig};

    #[test]
    fn typed_round_trip() {
        let handler = TypedHandler::<Message, _>::new(|message: Message| match message {
            Message::GetValue { id, property } => Some(ReturnMessage::Value {
                id,
                property,
                value: json!("Test 2"),
            }),
            _ => None,
        });
        let server =
            JsonServer::start(ServerConfig::localhost(0), handler).expect("server should start");
        let mut client = connect(server.local_endpoint()).expect("client should connect");

        client
            .send_message(&Message::GetValue {
                id: "two".into(),
                property: "text".into(),
            })
            .expect("get should be sent");
        let reply: ReturnMessage = client.recv_message().expect("reply should decode");
        assert_eq!(
            reply,
            ReturnMessage::Value {
                id: "two".into(),
                property: "text".into(),
                value: json!("Test 2"),
            }
        );
    }

    #[test]
    fn invalid_message_is_answered_and_connection_kept() {
        let handler = TypedHandler::<Message, _>::new(|_: Message| None::<ReturnMessage>);
        let server =
            JsonServer::start(ServerConfig::localhost(0), handler).expect("server should start");
        let mut client = connect(server.local_endpoint()).expect("client should connect");

        let reply = client
            .request(&json!({"type": "window", "title": "t"}))
            .expect("error reply should arrive");
        assert_eq!(reply["type"], "error");
        assert!(reply["message"]
            .as_str()
            .expect("message should be a string")
            .starts_with("3 errors: "));

        let window = Message::Window {
            title: "t".into(),
            width: 1,
            height: 1,
            root: ViewEmbedding::Stack {
                id: None,
                items: Vec::new(),
                direction: StackDirection::Vertical,
            },
        };
        let reply = client
            .request(&json!({"type": "resize"}))
            .expect("connection should still be open");
        assert_eq!(reply["message"], "message not understood: resize");
        client
            .send_message(&window)
            .expect("valid window should be accepted");
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let port = {
            let server = JsonServer::start(ServerConfig::localhost(0), |_: Value| {
                Option::<Value>::None
            })
            .expect("server should start");
            server.local_endpoint().port()
        };
        assert!(connect(Endpoint::localhost(port)).is_err());
    }
}

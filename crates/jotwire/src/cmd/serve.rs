use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use jotwire_decode::{Message, ReturnMessage, ToJson, ViewEmbedding};
use jotwire_server::{
    ConnectionRegistry, EmptyReadPolicy, JsonServer, ServerConfig, SessionConfig, TypedHandler,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cmd::send::parse_duration;
use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, OutputFormat};

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ServerConfig {
        session: SessionConfig {
            read_chunk_size: args.read_chunk_size.max(1),
            write_timeout: Some(parse_duration(&args.write_timeout)?),
            empty_read: if args.retry_empty_reads {
                EmptyReadPolicy::Retry
            } else {
                EmptyReadPolicy::Close
            },
            ..SessionConfig::default()
        },
        ..ServerConfig::localhost(args.port)
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let app = Arc::new(HeadlessApp::new(Arc::clone(&registry)));
    let handler = TypedHandler::<Message, _>::new(move |message: Message| app.handle(message));

    let mut server = JsonServer::start_with_registry(config, registry, handler)
        .map_err(|err| server_error("server start failed", err))?;
    print_listening(server.local_endpoint(), format);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;
    while running.load(Ordering::SeqCst) {
        thread::sleep(SHUTDOWN_POLL);
    }

    info!("shutting down");
    server.shutdown();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Stand-in for a windowing front end.
///
/// Remembers the properties of every identified view of the windows it was asked
/// to open, answers `get` from that model, and applies `set`.
struct HeadlessApp {
    properties: Mutex<HashMap<String, HashMap<String, Value>>>,
    registry: Arc<ConnectionRegistry>,
}

impl HeadlessApp {
    fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            registry,
        }
    }

    fn handle(&self, message: Message) -> Option<ReturnMessage> {
        match message {
            Message::Window {
                title,
                width,
                height,
                root,
            } => {
                let views = self.open_window(&root);
                info!(%title, width, height, views, "window opened");
                if let Err(err) = self.registry.broadcast(&ReturnMessage::Hello.to_json()) {
                    warn!(error = %err, "hello broadcast failed");
                }
                None
            }
            Message::GetValue { id, property } => Some(self.get(id, property)),
            Message::SetValue {
                id,
                property,
                value,
            } => self.set(id, property, value),
        }
    }

    fn open_window(&self, root: &ViewEmbedding) -> usize {
        let mut properties = self.lock();
        let mut opened = 0;
        root.walk(&mut |view: &ViewEmbedding| {
            let Some(id) = view.id() else {
                return;
            };
            let entry = properties.entry(id.to_string()).or_default();
            entry.clear();
            match view {
                ViewEmbedding::Button { title, .. } | ViewEmbedding::Label { title, .. } => {
                    entry.insert("title".to_string(), Value::from(title.as_str()));
                }
                ViewEmbedding::TextView { text, editable, .. } => {
                    entry.insert("text".to_string(), Value::from(text.as_str()));
                    entry.insert("editable".to_string(), Value::from(*editable));
                }
                ViewEmbedding::Stack { direction, .. } => {
                    entry.insert("direction".to_string(), Value::from(direction.as_str()));
                }
            }
            opened += 1;
        });
        opened
    }

    fn get(&self, id: String, property: String) -> ReturnMessage {
        let value = self
            .lock()
            .get(&id)
            .and_then(|view| view.get(&property))
            .cloned();
        match value {
            Some(value) => ReturnMessage::Value {
                id,
                property,
                value,
            },
            None => ReturnMessage::Error {
                message: format!("no property {property} on view {id}"),
            },
        }
    }

    fn set(&self, id: String, property: String, value: Value) -> Option<ReturnMessage> {
        let mut properties = self.lock();
        let Some(view) = properties.get_mut(&id) else {
            return Some(ReturnMessage::Error {
                message: format!("no view {id}"),
            });
        };
        debug!(%id, %property, "property set");
        view.insert(property, value);
        None
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, Value>>> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

//! Polling RPC server on top of the datagram client.
//!
//! A run of controller byte variables starting at a base index acts as a
//! mailbox: one variable per registered service. A job on the controller
//! requests a service by writing [`status::REQUESTED`] into its variable;
//! the server polls the run, executes the service (pre-command fan-out
//! followed by the user handler) and writes back [`status::IDLE`] or
//! [`status::ERROR`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hses_proto::udp::{ReadVars, WriteVar};
use thiserror::Error;

use crate::error::Error;
use crate::udp::{Client, CommandSet};

/// Service status codes held in the mailbox variables.
pub mod status {
    /// The service is idle.
    pub const IDLE: u8 = 0;
    /// The controller requests execution.
    pub const REQUESTED: u8 = 1;
    /// The last execution failed.
    pub const ERROR: u8 = 2;
}

/// Timeout for the status-variable reads and writes of the poll loop.
const STATUS_TIMEOUT: Duration = Duration::from_millis(100);

/// An error annotated with the poll-loop step or service it came from.
#[derive(Debug, Error)]
#[error("{context}")]
pub struct RpcError {
    /// What the server was doing.
    pub context: String,
    /// The underlying client error.
    #[source]
    pub source: Error,
}

/// Callback receiving poll-loop and service errors.
pub type ErrorSink = Arc<dyn Fn(RpcError) + Send + Sync>;

type ServiceFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;
type ServiceFn = Box<dyn Fn() -> ServiceFuture + Send + Sync>;

struct RpcService {
    name: String,
    busy: AtomicBool,
    execute: ServiceFn,
}

struct Inner {
    client: Arc<Client>,
    base_index: u8,
    delay: Duration,
    services: Mutex<Vec<Arc<RpcService>>>,
    running: AtomicBool,
    on_error: Option<ErrorSink>,
}

impl Inner {
    fn services(&self) -> MutexGuard<'_, Vec<Arc<RpcService>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, context: &str, source: Error) {
        tracing::warn!(context, error = %source, "rpc server error");
        if let Some(sink) = &self.on_error {
            sink(RpcError { context: context.to_owned(), source });
        }
    }
}

/// The polling RPC server.
pub struct RpcServer {
    inner: Arc<Inner>,
}

impl RpcServer {
    /// Create a server polling byte variables starting at `base_index`.
    ///
    /// `delay` is inserted between polls; zero re-polls immediately.
    pub fn new(
        client: Arc<Client>,
        base_index: u8,
        delay: Duration,
        on_error: Option<ErrorSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                base_index,
                delay,
                services: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                on_error,
            }),
        }
    }

    /// Register a service under the next free mailbox variable.
    ///
    /// On request, `pre_commands` are dispatched as one fan-out with
    /// `timeout`; on success `handler` runs with the collected responses.
    /// The handler's result decides the written-back status.
    pub fn add_service<S, F, Fut>(
        &self,
        name: &str,
        pre_commands: S,
        timeout: Duration,
        handler: F,
    ) where
        S: CommandSet + Clone + Sync + 'static,
        F: Fn(S::Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let client = self.inner.client.clone();
        let handler = Arc::new(handler);
        let execute: ServiceFn = Box::new(move || {
            let client = client.clone();
            let commands = pre_commands.clone();
            let handler = handler.clone();
            Box::pin(async move {
                let responses = client.send_commands(commands, timeout).await?;
                handler(responses).await
            })
        });

        self.inner.services().push(Arc::new(RpcService {
            name: name.to_owned(),
            busy: AtomicBool::new(false),
            execute,
        }));
    }

    /// Start polling. Returns false if the server was already running.
    pub fn start(&self) -> bool {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        tokio::spawn(poll_loop(self.inner.clone()));
        true
    }

    /// Stop polling after the current iteration. Returns false if the
    /// server was already stopped.
    pub fn stop(&self) -> bool {
        self.inner.running.swap(false, Ordering::AcqRel)
    }
}

async fn poll_loop(inner: Arc<Inner>) {
    while inner.running.load(Ordering::Acquire) {
        let services: Vec<Arc<RpcService>> = inner.services().clone();

        if !services.is_empty() {
            // The controller requires byte-variable reads of an even count.
            let read_count = ((services.len() + 1) / 2 * 2) as u8;
            let read = ReadVars::<u8>::new(inner.base_index, read_count);

            match inner.client.send_command(read, STATUS_TIMEOUT).await {
                Ok(statuses) => {
                    for (index, service) in services.iter().enumerate() {
                        if statuses.get(index) == Some(&status::REQUESTED) {
                            dispatch(&inner, index as u8, service.clone());
                        }
                    }
                }
                Err(error) => inner.report("reading service status variables", error),
            }
        }

        if inner.delay > Duration::ZERO {
            tokio::time::sleep(inner.delay).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
    tracing::debug!("rpc server stopped");
}

/// Execute one requested service unless it is already busy.
fn dispatch(inner: &Arc<Inner>, index: u8, service: Arc<RpcService>) {
    if service.busy.swap(true, Ordering::AcqRel) {
        return;
    }

    let inner = inner.clone();
    tokio::spawn(async move {
        tracing::debug!(service = %service.name, "executing service");
        let outcome = match (service.execute)().await {
            Ok(()) => status::IDLE,
            Err(error) => {
                inner.report(&format!("executing service {}", service.name), error);
                status::ERROR
            }
        };

        let variable = inner.base_index.wrapping_add(index);
        let write = WriteVar::<u8>::new(variable, outcome);
        if let Err(error) = inner.client.send_command(write, STATUS_TIMEOUT).await {
            // The controller-side status variable keeps its previous
            // value; a supervisor may re-request the service.
            inner.report(&format!("writing status for service {}", service.name), error);
        }
        service.busy.store(false, Ordering::Release);
    });
}

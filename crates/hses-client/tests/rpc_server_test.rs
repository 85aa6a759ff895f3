//! RPC-server loop against a scripted controller.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use hses_client::rpc::{RpcError, RpcServer, status};
use hses_client::udp::Client;
use hses_proto::udp::ReadVar;
use support::MockController;
use tokio::sync::Notify;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Controller-side state: the mailbox variables plus one data variable.
struct Controller {
    mock: MockController,
    base: u8,
    statuses: Mutex<Vec<u8>>,
    status_written: Notify,
}

impl Controller {
    async fn new(base: u8, statuses: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            mock: MockController::bind().await,
            base,
            statuses: Mutex::new(statuses),
            status_written: Notify::new(),
        })
    }

    fn statuses(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer poll reads, pre-command reads and status writes forever.
    async fn serve(self: Arc<Self>) {
        loop {
            let (request, peer) = self.mock.recv().await;
            let reply = match (request.command, request.service) {
                // Mailbox poll: count-prefixed run of byte variables.
                (0x302, 0x33) => {
                    assert_eq!(request.instance, u16::from(self.base));
                    let mut count_bytes = [0u8; 4];
                    count_bytes.copy_from_slice(&request.payload);
                    let count = u32::from_le_bytes(count_bytes) as usize;
                    assert_eq!(count % 2, 0, "byte-variable reads must be an even count");

                    let statuses = self.statuses().clone();
                    let mut payload = (count as u32).to_le_bytes().to_vec();
                    for index in 0..count {
                        payload.push(statuses.get(index).copied().unwrap_or(0));
                    }
                    support::response(request.request_id, 0, 0, &payload)
                }
                // Pre-command: a D variable holding 42.
                (0x7c, 0x01) => {
                    assert_eq!(request.instance, 5);
                    support::response(request.request_id, 0, 0, &42i32.to_le_bytes())
                }
                // Status write-back.
                (0x7a, 0x02) => {
                    let index = (request.instance - u16::from(self.base)) as usize;
                    self.statuses()[index] = request.payload[0];
                    self.status_written.notify_one();
                    support::response(request.request_id, 0, 0, &[])
                }
                other => panic!("unexpected request {other:?}"),
            };
            self.mock.send(peer, &reply).await;
        }
    }
}

#[tokio::test]
async fn requested_service_runs_once_and_writes_back_idle() {
    let controller = Controller::new(40, vec![status::REQUESTED, status::IDLE]).await;
    let client =
        Arc::new(Client::connect("127.0.0.1", controller.mock.port(), TIMEOUT).await.unwrap());
    tokio::spawn(controller.clone().serve());

    let invocations = Arc::new(AtomicUsize::new(0));
    let server = RpcServer::new(client, 40, Duration::from_millis(5), None);
    {
        let invocations = invocations.clone();
        server.add_service("check", (ReadVar::<i32>::new(5),), TIMEOUT, move |(value,)| {
            let invocations = invocations.clone();
            async move {
                assert_eq!(value, 42);
                // Stay busy over several polls: the busy gate must suppress
                // re-dispatch while the mailbox still reads `requested`.
                tokio::time::sleep(Duration::from_millis(40)).await;
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
    }
    // A second service that is never requested.
    server.add_service("noop", (ReadVar::<i32>::new(5),), TIMEOUT, |_| async { Ok(()) });

    assert!(server.start());
    assert!(!server.start(), "second start is a no-op");

    tokio::time::timeout(TIMEOUT, controller.status_written.notified()).await.unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(controller.statuses()[0], status::IDLE);
    assert_eq!(controller.statuses()[1], status::IDLE);

    assert!(server.stop());
    assert!(!server.stop(), "second stop is a no-op");
}

#[tokio::test]
async fn failing_service_writes_back_error_and_reports_it() {
    let controller = Controller::new(10, vec![status::REQUESTED, status::IDLE]).await;
    let client =
        Arc::new(Client::connect("127.0.0.1", controller.mock.port(), TIMEOUT).await.unwrap());
    tokio::spawn(controller.clone().serve());

    let reported: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let reported = reported.clone();
        Arc::new(move |error: RpcError| {
            reported.lock().unwrap_or_else(PoisonError::into_inner).push(error.context)
        })
    };

    let server = RpcServer::new(client, 10, Duration::from_millis(5), Some(sink));
    server.add_service("faulty", (ReadVar::<i32>::new(5),), TIMEOUT, |_| async {
        Err(hses_client::Error::InvalidArgument("service says no".into()))
    });

    assert!(server.start());
    tokio::time::timeout(TIMEOUT, controller.status_written.notified()).await.unwrap();

    assert_eq!(controller.statuses()[0], status::ERROR);
    let reported = reported.lock().unwrap_or_else(PoisonError::into_inner);
    assert!(
        reported.iter().any(|context| context.contains("faulty")),
        "errors are annotated with the service name, got {reported:?}"
    );

    server.stop();
}

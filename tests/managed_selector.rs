//! End-to-end scenarios against the public `managed` API, using real
//! loopback TCP sockets, a real `ThreadPoolExecutor` and `TimerScheduler`.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eatwhatyoukill::managed::{
    Config, ManagedSelector, Ready, Runnable, Selectable, SelectorManager, ThreadPoolExecutor,
    TimerScheduler,
};
use eatwhatyoukill::net::{TcpListener, TcpStream};
use eatwhatyoukill::{Interest, Registry, Token};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn local_addr() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// An endpoint that echoes whatever it reads back onto a shared buffer the
/// test can inspect, and signals every read over `read_tx`.
struct EchoEndpoint {
    stream: TcpStream,
    buf: Arc<Mutex<Vec<u8>>>,
    read_tx: SyncSender<()>,
}

impl Selectable for EchoEndpoint {
    fn on_selected(&self, ready: Ready) -> std::io::Result<Option<Box<dyn Runnable>>> {
        if ready.readable {
            let mut chunk = [0u8; 1024];
            loop {
                match (&self.stream).read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => self.buf.lock().unwrap().extend_from_slice(&chunk[..n]),
                    Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(_) => break,
                }
            }
            let _ = self.read_tx.try_send(());
        }
        Ok(None)
    }

    fn update_interest(&self) -> std::io::Result<()> {
        Ok(())
    }

    fn close(&self) {}
}

/// A `SelectorManager` that wraps every accepted or connected channel as an
/// [`EchoEndpoint`] and reports the connection lifecycle over channels so
/// tests can assert on it without polling.
struct TestManager {
    opened_tx: SyncSender<()>,
    closed_tx: SyncSender<()>,
    failed_tx: SyncSender<std::io::Error>,
    read_tx: SyncSender<()>,
    buffers: Mutex<Vec<Arc<Mutex<Vec<u8>>>>>,
}

impl TestManager {
    fn new() -> (Arc<TestManager>, Receiver<()>, Receiver<()>, Receiver<std::io::Error>, Receiver<()>) {
        let (opened_tx, opened_rx) = sync_channel(16);
        let (closed_tx, closed_rx) = sync_channel(16);
        let (failed_tx, failed_rx) = sync_channel(16);
        let (read_tx, read_rx) = sync_channel(16);
        let manager = Arc::new(TestManager {
            opened_tx,
            closed_tx,
            failed_tx,
            read_tx,
            buffers: Mutex::new(Vec::new()),
        });
        (manager, opened_rx, closed_rx, failed_rx, read_rx)
    }
}

impl SelectorManager for TestManager {
    type Attachment = ();

    fn new_end_point(
        &self,
        mut stream: TcpStream,
        registry: &Registry,
        token: Token,
    ) -> Result<Arc<dyn Selectable>, (TcpStream, std::io::Error)> {
        if let Err(err) = registry.register(&mut stream, token, Interest::READABLE) {
            return Err((stream, err));
        }
        let buf = Arc::new(Mutex::new(Vec::new()));
        self.buffers.lock().unwrap().push(Arc::clone(&buf));
        let endpoint: Arc<dyn Selectable> = Arc::new(EchoEndpoint {
            stream,
            buf,
            read_tx: self.read_tx.clone(),
        });
        Ok(endpoint)
    }

    fn connection_failed(&self, _stream: TcpStream, cause: std::io::Error, _attachment: ()) {
        let _ = self.failed_tx.try_send(cause);
    }

    fn connection_opened(&self, _endpoint: &Arc<dyn Selectable>) {
        let _ = self.opened_tx.try_send(());
    }

    fn connection_closed(&self, _endpoint: &Arc<dyn Selectable>) {
        let _ = self.closed_tx.try_send(());
    }
}

fn new_selector(
    manager: Arc<TestManager>,
) -> Arc<ManagedSelector<TestManager>> {
    ManagedSelector::new(
        manager,
        Arc::new(ThreadPoolExecutor::new(4, 64)),
        Arc::new(TimerScheduler::new()),
        Config::default(),
    )
    .expect("failed to build selector")
}

/// E1: register a listener, connect a client, write "PING", assert the
/// accepted endpoint observes the bytes.
#[test]
fn accept_and_echo() {
    init_log();
    let (manager, opened_rx, _closed_rx, _failed_rx, read_rx) = TestManager::new();
    let selector = new_selector(Arc::clone(&manager));

    let listener = TcpListener::bind(local_addr()).unwrap();
    let addr = listener.local_addr().unwrap();
    selector.accept_on(listener).unwrap();

    let mut client = std::net::TcpStream::connect(addr).unwrap();

    opened_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("connection_opened was not called for the accepted endpoint");

    client.write_all(b"PING").unwrap();

    read_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("accepted endpoint never observed read-ready");

    let buffers = manager.buffers.lock().unwrap();
    assert_eq!(buffers.len(), 1);
    assert_eq!(&*buffers[0].lock().unwrap(), b"PING");

    selector.stop();
}

/// E2: submit a Connect to a reachable peer with a generous timeout; assert
/// `connection_opened` fires exactly once within the timeout.
#[test]
fn connect_success() {
    init_log();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept in the background so the connect actually completes.
    let accept_thread = std::thread::spawn(move || listener.accept().unwrap());

    let (manager, opened_rx, _closed_rx, failed_rx, _read_rx) = TestManager::new();
    let selector = new_selector(manager);

    let stream = TcpStream::connect(addr).unwrap();
    selector.connect(stream, ()).unwrap();

    opened_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("connection_opened was not called within 1s");
    assert!(failed_rx.try_recv().is_err(), "connect should not have failed");

    accept_thread.join().unwrap();
    selector.stop();
}

/// E3: submit a Connect to a black-hole address with a short timeout;
/// assert `connection_failed` fires with a timed-out cause inside 300ms.
#[test]
fn connect_timeout() {
    init_log();
    let (manager, _opened_rx, _closed_rx, failed_rx, _read_rx) = TestManager::new();
    let mut config = Config::default();
    config.connect_timeout = Duration::from_millis(200);
    let selector = ManagedSelector::new(
        manager,
        Arc::new(ThreadPoolExecutor::new(4, 64)),
        Arc::new(TimerScheduler::new()),
        config,
    )
    .unwrap();

    // TEST-NET-1 (RFC 5737): reserved for documentation, routed nowhere.
    let black_hole: SocketAddr = "192.0.2.1:9".parse().unwrap();
    let stream = TcpStream::connect(black_hole).unwrap();
    selector.connect(stream, ()).unwrap();

    let cause = failed_rx
        .recv_timeout(Duration::from_millis(300))
        .expect("connection_failed was not called within 300ms");
    assert_eq!(cause.kind(), std::io::ErrorKind::TimedOut);

    selector.stop();
}

/// E5: with several active endpoints, `stop` closes every one of them and
/// returns within the configured `stop_timeout`.
#[test]
fn graceful_stop_closes_every_endpoint() {
    init_log();
    let (manager, opened_rx, closed_rx, _failed_rx, _read_rx) = TestManager::new();
    let selector = new_selector(manager);

    let listener = TcpListener::bind(local_addr()).unwrap();
    let addr = listener.local_addr().unwrap();
    selector.accept_on(listener).unwrap();

    const N: usize = 10;
    let mut clients = Vec::with_capacity(N);
    for _ in 0..N {
        clients.push(std::net::TcpStream::connect(addr).unwrap());
    }
    for _ in 0..N {
        opened_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("connection_opened was not called for every client");
    }

    let start = std::time::Instant::now();
    selector.stop();
    assert!(start.elapsed() < Duration::from_secs(5));

    for _ in 0..N {
        closed_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("connection_closed was not called for every endpoint");
    }

    drop(clients);
}

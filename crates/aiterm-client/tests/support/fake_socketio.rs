//! In-process Socket.IO server speaking just enough Engine.IO v4 for tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

fn open_frame(ping_interval_ms: u64, ping_timeout_ms: u64) -> String {
    format!(
        r#"0{{"sid":"fake-engine","upgrades":[],"pingInterval":{ping_interval_ms},"pingTimeout":{ping_timeout_ms},"maxPayload":1000000}}"#
    )
}

pub struct FakeSocketServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    drop_tx: broadcast::Sender<()>,
}

impl FakeSocketServer {
    pub async fn start() -> Self {
        Self::start_with_heartbeat(25_000, 20_000).await
    }

    /// The server advertises these timings but only pings once, right after
    /// the namespace connect, then goes quiet.
    pub async fn start_with_heartbeat(ping_interval_ms: u64, ping_timeout_ms: u64) -> Self {
        let open = Arc::new(open_frame(ping_interval_ms, ping_timeout_ms));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let (drop_tx, _) = broadcast::channel(4);

        let conns = connections.clone();
        let recv = received.clone();
        let drops = drop_tx.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                conns.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_client(
                    stream,
                    open.clone(),
                    recv.clone(),
                    drops.subscribe(),
                ));
            }
        });

        Self {
            addr,
            connections,
            received,
            drop_tx,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "ws://{}/socket.io/?EIO=4&transport=websocket",
            self.addr
        )
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Close every open client socket from the server side.
    pub fn drop_clients(&self) {
        let _ = self.drop_tx.send(());
    }
}

async fn serve_client(
    stream: TcpStream,
    open: Arc<String>,
    received: Arc<Mutex<Vec<String>>>,
    mut drop_rx: broadcast::Receiver<()>,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    if ws.send(Message::Text(open.as_str().to_owned())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = ws.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                    _ => break,
                };
                if text == "40" {
                    let _ = ws.send(Message::Text(r#"40{"sid":"fake-socket"}"#.into())).await;
                    let _ = ws
                        .send(Message::Text(
                            r#"42["connected",{"status":"connected","current_directory":"/srv/app"}]"#
                                .into(),
                        ))
                        .await;
                    // Exercise the heartbeat path once.
                    let _ = ws.send(Message::Text("2".into())).await;
                } else if text.starts_with("42") {
                    received.lock().push(text.clone());
                    let reply = r#"42["command_result",{"status":"processing","command":"list files"}]"#;
                    let _ = ws.send(Message::Text(reply.into())).await;
                } else if text == "3" {
                    received.lock().push(text.clone());
                }
            }
            _ = drop_rx.recv() => {
                let _ = ws.close(None).await;
                break;
            }
        }
    }
}

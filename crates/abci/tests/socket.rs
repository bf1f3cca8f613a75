use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use baronbft_abci::{Application, Client, ClientOptions, Server, ServerOptions};
use baronbft_proto::abci::{
    response, RequestDeliverTx, RequestEcho, RequestInfo, ResponseDeliverTx, ResponseInfo,
};

/// A counting application: every delivered tx bumps a counter that `info`
/// reports back.
#[derive(Default)]
struct CounterApp {
    delivered: u64,
}

impl Application for CounterApp {
    fn info(&mut self, _request: RequestInfo) -> ResponseInfo {
        ResponseInfo {
            data: format!("delivered={}", self.delivered),
            ..ResponseInfo::default()
        }
    }

    fn deliver_tx(&mut self, _request: RequestDeliverTx) -> ResponseDeliverTx {
        self.delivered += 1;
        ResponseDeliverTx {
            code: 0,
            data: self.delivered.to_be_bytes().to_vec(),
            ..ResponseDeliverTx::default()
        }
    }
}

async fn start_server() -> std::net::SocketAddr {
    let server = Server::bind("tcp://127.0.0.1:0", CounterApp::default(), ServerOptions::default())
        .await
        .unwrap();

    let addr = server.local_addr().unwrap();
    tokio::spawn(server.listen());
    addr
}

async fn connect(addr: std::net::SocketAddr) -> Client {
    Client::connect(&format!("tcp://{addr}"), true, ClientOptions::default())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn echo_round_trip() {
    let addr = start_server().await;
    let client = connect(addr).await;

    let response = client
        .echo(RequestEcho {
            message: "baron-chain".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.message, "baron-chain");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn flush_barrier_drains_20000_requests() {
    let addr = start_server().await;
    let client = connect(addr).await;

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();

    client.set_response_callback(Box::new(move |_request, result| {
        if let Ok(response) = result {
            if let Some(response::Value::DeliverTx(tx)) = &response.value {
                assert_eq!(tx.code, 0);
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
    }));

    for _ in 0..20_000 {
        client
            .deliver_tx_async(RequestDeliverTx {
                tx: b"test".to_vec(),
            })
            .await
            .unwrap();
    }

    client.flush().await.unwrap();

    // Every DeliverTx response arrived (and fired its callback) before the
    // flush response did.
    assert_eq!(delivered.load(Ordering::SeqCst), 20_000);

    let info = client.info(RequestInfo::default()).await.unwrap();
    assert_eq!(info.data, "delivered=20000");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn responses_arrive_in_request_order() {
    let addr = start_server().await;
    let client = connect(addr).await;

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = order.clone();

    client.set_response_callback(Box::new(move |_request, result| {
        if let Ok(response) = result {
            sink.lock().unwrap().push(response.kind().to_string());
        }
    }));

    for i in 0..50u32 {
        client
            .deliver_tx_async(RequestDeliverTx {
                tx: i.to_be_bytes().to_vec(),
            })
            .await
            .unwrap();
        client
            .echo_async(RequestEcho {
                message: i.to_string(),
            })
            .await
            .unwrap();
    }

    client.flush().await.unwrap();

    let order = order.lock().unwrap();

    // Strict alternation, exactly as submitted. The handshake echo resolved
    // before the callback was installed; the only other entry is the
    // closing flush, filtered out here.
    let body: Vec<_> = order
        .iter()
        .filter(|k| k.as_str() != "flush")
        .cloned()
        .collect();

    let expected: Vec<String> = (0..50)
        .flat_map(|_| ["deliver_tx".to_string(), "echo".to_string()])
        .collect();

    assert_eq!(body, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handle_callback_fires_once_regardless_of_registration_order() {
    let addr = start_server().await;
    let client = connect(addr).await;

    // Register before the response.
    let early = Arc::new(AtomicUsize::new(0));
    let counter = early.clone();
    let handle = client
        .deliver_tx_async(RequestDeliverTx { tx: b"a".to_vec() })
        .await
        .unwrap();
    handle.set_callback(move |result| {
        assert!(result.is_ok());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.flush().await.unwrap();
    assert_eq!(early.load(Ordering::SeqCst), 1);

    // Register after the response.
    let handle = client
        .deliver_tx_async(RequestDeliverTx { tx: b"b".to_vec() })
        .await
        .unwrap();
    client.flush().await.unwrap();
    handle.wait().await.unwrap();

    let late = Arc::new(AtomicUsize::new(0));
    let counter = late.clone();
    handle.set_callback(move |result| {
        assert!(result.is_ok());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn local_transport_matches_socket_semantics() {
    let client = Client::local(CounterApp::default());

    let response = client
        .echo(RequestEcho {
            message: "baron-chain".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.message, "baron-chain");

    for _ in 0..3 {
        let response = client
            .deliver_tx(RequestDeliverTx {
                tx: b"test".to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(response.code, 0);
    }

    client.flush().await.unwrap();

    let info = client.info(RequestInfo::default()).await.unwrap();
    assert_eq!(info.data, "delivered=3");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn must_connect_fails_fast_when_nothing_listens() {
    // Grab a free port, then close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = Client::connect(
        &format!("tcp://{addr}"),
        true,
        ClientOptions {
            dial_timeout: std::time::Duration::from_millis(300),
            ..ClientOptions::default()
        },
    )
    .await;

    assert!(result.is_err());
}

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use baronbft_codec as codec;
use baronbft_proto::abci::{response, Request, Response};

use crate::transport::{self, BoxedReader, BoxedWriter, Target};
use crate::{dispatch, Application, Error};

/// Construction-time knobs of the server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub max_msg_size: usize,
    /// How long to wait for open connections when shutting down.
    pub grace: Duration,
    pub response_buffer: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_msg_size: baronbft_codec::MAX_MESSAGE_SIZE,
            grace: Duration::from_secs(5),
            response_buffer: 256,
        }
    }
}

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener),
}

impl Listener {
    async fn accept(&self) -> std::io::Result<(BoxedReader, BoxedWriter, String)> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true)?;
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write), peer.to_string()))
            }

            #[cfg(unix)]
            Listener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write), "unix".to_string()))
            }
        }
    }
}

/// The ABCI server: binds an address, accepts connections, and serves each
/// one concurrently against a single application behind one mutex, so the
/// application observes a totally ordered stream of calls.
pub struct Server<A> {
    app: Arc<Mutex<A>>,
    listener: Listener,
    options: ServerOptions,
}

impl<A: Application> Server<A> {
    /// Bind `addr` (`tcp://host:port` or `unix:///path.sock`).
    pub async fn bind(addr: &str, app: A, options: ServerOptions) -> Result<Self, Error> {
        let listener = match transport::parse_addr(addr)? {
            Target::Tcp(addr) => Listener::Tcp(TcpListener::bind(&addr).await?),

            #[cfg(unix)]
            Target::Unix(path) => {
                // A stale socket file from a previous run would fail the bind.
                let _ = std::fs::remove_file(&path);
                Listener::Unix(tokio::net::UnixListener::bind(&path)?)
            }
        };

        info!(%addr, "ABCI server listening");

        Ok(Self {
            app: Arc::new(Mutex::new(app)),
            listener,
            options,
        })
    }

    /// The bound TCP address, useful when binding port 0.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        match &self.listener {
            Listener::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Listener::Unix(_) => None,
        }
    }

    /// Accept and serve connections until the listener fails.
    pub async fn listen(self) -> Result<(), Error> {
        loop {
            let (reader, writer, peer) = self.listener.accept().await?;

            debug!(%peer, "Accepted ABCI connection");

            let app = self.app.clone();
            let options = self.options.clone();
            tokio::spawn(async move {
                serve_connection(app, reader, writer, options).await;
                debug!(%peer, "ABCI connection closed");
            });
        }
    }

    /// Accept and serve until `shutdown` resolves, then give open
    /// connections the configured grace period to finish.
    pub async fn listen_with_shutdown(self, shutdown: impl Future<Output = ()>) -> Result<(), Error> {
        let mut connections = JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = self.listener.accept() => {
                    let (reader, writer, peer) = accepted?;

                    debug!(%peer, "Accepted ABCI connection");

                    let app = self.app.clone();
                    let options = self.options.clone();
                    connections.spawn(async move {
                        serve_connection(app, reader, writer, options).await;
                    });
                }
            }
        }

        info!("ABCI server shutting down");

        let drain = async {
            while connections.join_next().await.is_some() {}
        };

        if tokio::time::timeout(self.options.grace, drain).await.is_err() {
            warn!(grace = ?self.options.grace, "Grace period elapsed, aborting open connections");
            connections.abort_all();
        }

        Ok(())
    }
}

/// Serve one connection: decode requests, dispatch them under the
/// application lock, and push responses to the writer task in order.
async fn serve_connection<A: Application>(
    app: Arc<Mutex<A>>,
    mut reader: BoxedReader,
    writer: BoxedWriter,
    options: ServerOptions,
) {
    let (resp_tx, resp_rx) = mpsc::channel::<Response>(options.response_buffer);

    let writer_task = tokio::spawn(write_responses(writer, resp_rx));

    loop {
        let request: Request = match codec::read_msg(&mut reader, options.max_msg_size).await {
            Ok(request) => request,
            Err(codec::Error::EndOfStream) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read ABCI request");
                let _ = resp_tx.send(Response::exception(e.to_string())).await;
                break;
            }
        };

        let response = {
            let mut app = app.lock().expect("application lock poisoned");
            dispatch(&mut *app, request)
        };

        if resp_tx.send(response).await.is_err() {
            break;
        }
    }

    drop(resp_tx);
    let _ = writer_task.await;
}

/// Frame responses back onto the stream, flushing explicitly after a Flush
/// response and whenever the queue runs dry.
async fn write_responses(writer: BoxedWriter, mut resp_rx: mpsc::Receiver<Response>) {
    let mut writer = BufWriter::new(writer);

    while let Some(response) = resp_rx.recv().await {
        let mut next = Some(response);

        while let Some(response) = next {
            let is_flush = matches!(response.value, Some(response::Value::Flush(_)));

            if let Err(e) = codec::write_msg(&mut writer, &response).await {
                error!(error = %e, "Failed to write ABCI response");
                return;
            }

            if is_flush {
                if let Err(e) = writer.flush().await {
                    error!(error = %e, "Failed to flush ABCI responses");
                    return;
                }
            }

            next = resp_rx.try_recv().ok();
        }

        if let Err(e) = writer.flush().await {
            error!(error = %e, "Failed to flush ABCI responses");
            return;
        }
    }

    let _ = writer.flush().await;
}

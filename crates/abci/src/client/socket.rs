use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use baronbft_codec as codec;
use baronbft_proto::abci::{request, response, Request, Response};

use crate::client::{ClientOptions, GlobalCallback};
use crate::transport::{self, BoxedReader, BoxedWriter};
use crate::{Error, ReqRes, SharedError};

/// The stream-transport client: one connection, two independent directions.
///
/// Requests are framed onto the stream in submission order; responses are
/// matched FIFO against the in-flight queue. A connection-level error is
/// latched once, resolves every in-flight handle, and is returned by all
/// subsequent operations.
pub struct SocketClient {
    req_tx: mpsc::Sender<Arc<ReqRes>>,
    inner: Arc<Inner>,
}

struct Inner {
    error: Mutex<Option<SharedError>>,
    pending: Mutex<VecDeque<Arc<ReqRes>>>,
    global_cb: Mutex<Option<GlobalCallback>>,
    stop_tx: watch::Sender<bool>,
}

impl SocketClient {
    /// Connect to `addr` and perform the echo handshake.
    ///
    /// With `must_connect`, the first dial failure is returned; otherwise
    /// dialing retries at the options' retry interval until it succeeds.
    pub async fn connect(
        addr: &str,
        must_connect: bool,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let target = transport::parse_addr(addr)?;

        let (reader, writer) = loop {
            match transport::dial(&target, options.dial_timeout).await {
                Ok(halves) => break halves,
                Err(e) if must_connect => return Err(e),
                Err(e) => {
                    warn!(%addr, error = %e, "Failed to connect to ABCI server, retrying");
                    tokio::time::sleep(options.retry_interval).await;
                }
            }
        };

        let client = Self::from_stream(reader, writer, &options);

        // Echo handshake: prove the far side speaks ABCI before reporting
        // the client up.
        tokio::time::timeout(options.echo_timeout, client.handshake())
            .await
            .map_err(|_| Error::EchoTimeout)??;

        debug!(%addr, "Connected to ABCI server");

        Ok(client)
    }

    /// Build a client over an already-established stream.
    pub fn from_stream(reader: BoxedReader, writer: BoxedWriter, options: &ClientOptions) -> Self {
        let (req_tx, req_rx) = mpsc::channel(options.queue_size);
        let (stop_tx, stop_rx) = watch::channel(false);

        let inner = Arc::new(Inner {
            error: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            global_cb: Mutex::new(None),
            stop_tx,
        });

        tokio::spawn(send_loop(
            req_rx,
            BufWriter::new(writer),
            inner.clone(),
            stop_rx.clone(),
        ));
        tokio::spawn(recv_loop(reader, options.max_msg_size, inner.clone(), stop_rx));

        Self { req_tx, inner }
    }

    async fn handshake(&self) -> Result<(), Error> {
        let handle = self.queue_request(Request::echo("hello")).await?;
        self.flush().await?;
        handle.wait().await.map_err(Error::Stopped)?;
        Ok(())
    }

    /// The stored connection error, if the client has failed.
    pub fn error(&self) -> Option<SharedError> {
        self.inner.error()
    }

    /// Install the global response callback, invoked once per resolved
    /// request (successfully or with the connection error).
    pub fn set_response_callback(&self, cb: GlobalCallback) {
        *self.inner.global_cb.lock().expect("callback lock poisoned") = Some(cb);
    }

    /// Enqueue a request and return its handle.
    pub async fn queue_request(&self, request: Request) -> Result<Arc<ReqRes>, Error> {
        if let Some(err) = self.inner.error() {
            return Err(Error::Stopped(err));
        }

        let reqres = Arc::new(ReqRes::new(request));

        self.req_tx
            .send(reqres.clone())
            .await
            .map_err(|_| match self.inner.error() {
                Some(err) => Error::Stopped(err),
                None => Error::ChannelClosed,
            })?;

        Ok(reqres)
    }

    /// Queue a Flush and wait for its response, draining everything queued
    /// before it.
    pub async fn flush(&self) -> Result<(), Error> {
        let handle = self.queue_request(Request::flush()).await?;
        let response = handle.wait().await.map_err(Error::Stopped)?;

        match response.value {
            Some(response::Value::Flush(_)) => Ok(()),
            _ => Err(Error::UnexpectedResponse {
                expected: "flush",
                got: response.kind(),
            }),
        }
    }

    /// The synchronous call style: enqueue, flush, and wait for the
    /// response.
    pub async fn call(&self, request: Request) -> Result<Response, Error> {
        let handle = self.queue_request(request).await?;
        self.queue_request(Request::flush()).await?;
        handle.wait().await.map_err(Error::Stopped)
    }
}

impl Inner {
    fn error(&self) -> Option<SharedError> {
        self.error.lock().expect("error lock poisoned").clone()
    }

    /// Latch the first connection error, signal the workers to stop, and
    /// resolve every in-flight handle with it.
    fn stop_for_error(&self, error: Error) {
        let shared = {
            let mut slot = self.error.lock().expect("error lock poisoned");
            match &*slot {
                Some(existing) => existing.clone(),
                None => {
                    warn!(error = %error, "ABCI client stopped");
                    let shared = SharedError::new(error);
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        let _ = self.stop_tx.send(true);

        let drained: Vec<_> = {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.drain(..).collect()
        };

        for reqres in drained {
            self.fail_handle(&reqres, shared.clone());
        }
    }

    fn fail_handle(&self, reqres: &Arc<ReqRes>, shared: SharedError) {
        let result = Err(shared);
        self.notify_global(reqres.request(), &result);
        reqres.set_done(result);
        reqres.invoke_callback();
    }

    fn resolve_handle(&self, reqres: &Arc<ReqRes>, response: Response) {
        let result = Ok(response);
        self.notify_global(reqres.request(), &result);
        reqres.set_done(result);
        reqres.invoke_callback();
    }

    fn notify_global(&self, request: &Request, result: &Result<Response, SharedError>) {
        let mut cb = self.global_cb.lock().expect("callback lock poisoned");
        if let Some(cb) = cb.as_mut() {
            cb(request, result);
        }
    }

    /// Match one received response against the oldest in-flight request.
    fn did_recv(&self, response: Response) -> Result<(), Error> {
        if let Some(response::Value::Exception(e)) = &response.value {
            return Err(Error::Exception(e.error.clone()));
        }

        let reqres = {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.pop_front()
        };

        let Some(reqres) = reqres else {
            return Err(Error::UnexpectedResponse {
                expected: "nothing in flight",
                got: response.kind(),
            });
        };

        if !matches_request(reqres.request(), &response) {
            return Err(Error::UnexpectedResponse {
                expected: reqres.request().kind(),
                got: response.kind(),
            });
        }

        self.resolve_handle(&reqres, response);

        Ok(())
    }
}

/// Whether `response` answers `request` (same variant).
fn matches_request(request: &Request, response: &Response) -> bool {
    use request::Value as Req;
    use response::Value as Resp;

    matches!(
        (&request.value, &response.value),
        (Some(Req::Echo(_)), Some(Resp::Echo(_)))
            | (Some(Req::Flush(_)), Some(Resp::Flush(_)))
            | (Some(Req::Info(_)), Some(Resp::Info(_)))
            | (Some(Req::InitChain(_)), Some(Resp::InitChain(_)))
            | (Some(Req::Query(_)), Some(Resp::Query(_)))
            | (Some(Req::BeginBlock(_)), Some(Resp::BeginBlock(_)))
            | (Some(Req::CheckTx(_)), Some(Resp::CheckTx(_)))
            | (Some(Req::DeliverTx(_)), Some(Resp::DeliverTx(_)))
            | (Some(Req::EndBlock(_)), Some(Resp::EndBlock(_)))
            | (Some(Req::Commit(_)), Some(Resp::Commit(_)))
            | (Some(Req::ListSnapshots(_)), Some(Resp::ListSnapshots(_)))
            | (Some(Req::OfferSnapshot(_)), Some(Resp::OfferSnapshot(_)))
            | (Some(Req::LoadSnapshotChunk(_)), Some(Resp::LoadSnapshotChunk(_)))
            | (Some(Req::ApplySnapshotChunk(_)), Some(Resp::ApplySnapshotChunk(_)))
            | (Some(Req::PrepareProposal(_)), Some(Resp::PrepareProposal(_)))
            | (Some(Req::ProcessProposal(_)), Some(Resp::ProcessProposal(_)))
    )
}

fn is_flush(request: &Request) -> bool {
    matches!(request.value, Some(request::Value::Flush(_)))
}

/// Frame queued requests onto the stream in order.
///
/// The buffer is flushed after a Flush request and whenever the queue runs
/// momentarily dry, so queued work always reaches the server.
async fn send_loop(
    mut req_rx: mpsc::Receiver<Arc<ReqRes>>,
    mut writer: BufWriter<BoxedWriter>,
    inner: Arc<Inner>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            maybe = req_rx.recv() => {
                let Some(reqres) = maybe else { break };

                if let Err(e) = write_batch(&mut writer, reqres, &inner, &mut req_rx).await {
                    inner.stop_for_error(e);
                    break;
                }
            }
        }
    }

    // Fail whatever is still queued and will never be written.
    let mut leftovers = Vec::new();
    while let Ok(reqres) = req_rx.try_recv() {
        leftovers.push(reqres);
    }

    if !leftovers.is_empty() {
        inner.stop_for_error(Error::ChannelClosed);
        if let Some(err) = inner.error() {
            for reqres in leftovers {
                inner.fail_handle(&reqres, err.clone());
            }
        }
    }
}

async fn write_batch(
    writer: &mut BufWriter<BoxedWriter>,
    first: Arc<ReqRes>,
    inner: &Arc<Inner>,
    req_rx: &mut mpsc::Receiver<Arc<ReqRes>>,
) -> Result<(), Error> {
    let mut next = Some(first);

    while let Some(reqres) = next {
        // In-flight before the bytes hit the wire, so a fast response can
        // always find its request.
        inner
            .pending
            .lock()
            .expect("pending lock poisoned")
            .push_back(reqres.clone());

        codec::write_msg(writer, reqres.request()).await?;

        if is_flush(reqres.request()) {
            writer.flush().await?;
        }

        next = req_rx.try_recv().ok();
    }

    writer.flush().await?;

    Ok(())
}

/// Decode responses and resolve handles in FIFO order.
async fn recv_loop(
    mut reader: BoxedReader,
    max_msg_size: usize,
    inner: Arc<Inner>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            result = codec::read_msg::<Response, _>(&mut reader, max_msg_size) => {
                match result {
                    Ok(response) => {
                        if let Err(e) = inner.did_recv(response) {
                            inner.stop_for_error(e);
                            break;
                        }
                    }
                    Err(e) => {
                        inner.stop_for_error(e.into());
                        break;
                    }
                }
            }
        }
    }
}

mod local;
mod socket;

use std::sync::Arc;
use std::time::Duration;

use baronbft_proto::abci::{request, response, Request, Response};
use baronbft_proto::abci::*;

use crate::{Application, Error, ReqRes, SharedError};

pub use local::LocalClient;
pub use socket::SocketClient;

/// Global response callback: invoked exactly once per resolved request.
pub type GlobalCallback = Box<dyn FnMut(&Request, &Result<Response, SharedError>) + Send>;

/// Construction-time knobs of the socket client.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub dial_timeout: Duration,
    pub retry_interval: Duration,
    pub echo_timeout: Duration,
    pub max_msg_size: usize,
    pub queue_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(3),
            retry_interval: Duration::from_secs(3),
            echo_timeout: Duration::from_secs(1),
            max_msg_size: baronbft_codec::MAX_MESSAGE_SIZE,
            queue_size: 256,
        }
    }
}

/// An ABCI client over the transport selected at construction.
pub enum Client {
    Socket(SocketClient),
    Local(LocalClient),
}

impl Client {
    /// Connect over the stream socket transport.
    pub async fn connect(
        addr: &str,
        must_connect: bool,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        Ok(Self::Socket(
            SocketClient::connect(addr, must_connect, options).await?,
        ))
    }

    /// Wrap the application in the in-process transport.
    pub fn local(app: impl Application) -> Self {
        Self::Local(LocalClient::new(app))
    }

    pub fn set_response_callback(&self, cb: GlobalCallback) {
        match self {
            Self::Socket(c) => c.set_response_callback(cb),
            Self::Local(c) => c.set_response_callback(cb),
        }
    }

    /// Enqueue a request; the returned handle resolves when its response
    /// arrives.
    pub async fn queue_request(&self, request: Request) -> Result<Arc<ReqRes>, Error> {
        match self {
            Self::Socket(c) => c.queue_request(request).await,
            Self::Local(c) => c.queue_request(request).await,
        }
    }

    /// Drain all pending requests.
    pub async fn flush(&self) -> Result<(), Error> {
        match self {
            Self::Socket(c) => c.flush().await,
            Self::Local(c) => c.flush().await,
        }
    }

    /// Queue a Flush without waiting for it.
    pub async fn flush_async(&self) -> Result<Arc<ReqRes>, Error> {
        self.queue_request(Request::flush()).await
    }

    async fn call(&self, request: Request) -> Result<Response, Error> {
        match self {
            Self::Socket(c) => c.call(request).await,
            Self::Local(c) => c.call(request).await,
        }
    }
}

/// Generate the per-variant sync and async call pairs.
macro_rules! request_calls {
    ($($sync:ident / $async_fn:ident : $variant:ident ($req:ty) -> $resp:ty;)*) => {
        impl Client {
            $(
                pub async fn $sync(&self, request: $req) -> Result<$resp, Error> {
                    let response = self
                        .call(Request::from(request::Value::$variant(request)))
                        .await?;

                    match response.value {
                        Some(response::Value::$variant(r)) => Ok(r),
                        other => Err(Error::UnexpectedResponse {
                            expected: stringify!($sync),
                            got: Response { value: other }.kind(),
                        }),
                    }
                }

                pub async fn $async_fn(&self, request: $req) -> Result<Arc<ReqRes>, Error> {
                    self.queue_request(Request::from(request::Value::$variant(request)))
                        .await
                }
            )*
        }
    };
}

request_calls! {
    echo / echo_async : Echo(RequestEcho) -> ResponseEcho;
    info / info_async : Info(RequestInfo) -> ResponseInfo;
    init_chain / init_chain_async : InitChain(RequestInitChain) -> ResponseInitChain;
    query / query_async : Query(RequestQuery) -> ResponseQuery;
    begin_block / begin_block_async : BeginBlock(RequestBeginBlock) -> ResponseBeginBlock;
    check_tx / check_tx_async : CheckTx(RequestCheckTx) -> ResponseCheckTx;
    deliver_tx / deliver_tx_async : DeliverTx(RequestDeliverTx) -> ResponseDeliverTx;
    end_block / end_block_async : EndBlock(RequestEndBlock) -> ResponseEndBlock;
    commit / commit_async : Commit(RequestCommit) -> ResponseCommit;
    list_snapshots / list_snapshots_async : ListSnapshots(RequestListSnapshots) -> ResponseListSnapshots;
    offer_snapshot / offer_snapshot_async : OfferSnapshot(RequestOfferSnapshot) -> ResponseOfferSnapshot;
    load_snapshot_chunk / load_snapshot_chunk_async : LoadSnapshotChunk(RequestLoadSnapshotChunk) -> ResponseLoadSnapshotChunk;
    apply_snapshot_chunk / apply_snapshot_chunk_async : ApplySnapshotChunk(RequestApplySnapshotChunk) -> ResponseApplySnapshotChunk;
    prepare_proposal / prepare_proposal_async : PrepareProposal(RequestPrepareProposal) -> ResponsePrepareProposal;
    process_proposal / process_proposal_async : ProcessProposal(RequestProcessProposal) -> ResponseProcessProposal;
}

//! ABCI request/response records.
//!
//! One tagged sum per direction. `Exception` exists only in the
//! server-to-client direction.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(
        oneof = "request::Value",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16"
    )]
    pub value: Option<request::Value>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Echo(super::RequestEcho),
        #[prost(message, tag = "2")]
        Flush(super::RequestFlush),
        #[prost(message, tag = "3")]
        Info(super::RequestInfo),
        #[prost(message, tag = "4")]
        InitChain(super::RequestInitChain),
        #[prost(message, tag = "5")]
        Query(super::RequestQuery),
        #[prost(message, tag = "6")]
        BeginBlock(super::RequestBeginBlock),
        #[prost(message, tag = "7")]
        CheckTx(super::RequestCheckTx),
        #[prost(message, tag = "8")]
        DeliverTx(super::RequestDeliverTx),
        #[prost(message, tag = "9")]
        EndBlock(super::RequestEndBlock),
        #[prost(message, tag = "10")]
        Commit(super::RequestCommit),
        #[prost(message, tag = "11")]
        ListSnapshots(super::RequestListSnapshots),
        #[prost(message, tag = "12")]
        OfferSnapshot(super::RequestOfferSnapshot),
        #[prost(message, tag = "13")]
        LoadSnapshotChunk(super::RequestLoadSnapshotChunk),
        #[prost(message, tag = "14")]
        ApplySnapshotChunk(super::RequestApplySnapshotChunk),
        #[prost(message, tag = "15")]
        PrepareProposal(super::RequestPrepareProposal),
        #[prost(message, tag = "16")]
        ProcessProposal(super::RequestProcessProposal),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(
        oneof = "response::Value",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17"
    )]
    pub value: Option<response::Value>,
}

pub mod response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Exception(super::ResponseException),
        #[prost(message, tag = "2")]
        Echo(super::ResponseEcho),
        #[prost(message, tag = "3")]
        Flush(super::ResponseFlush),
        #[prost(message, tag = "4")]
        Info(super::ResponseInfo),
        #[prost(message, tag = "5")]
        InitChain(super::ResponseInitChain),
        #[prost(message, tag = "6")]
        Query(super::ResponseQuery),
        #[prost(message, tag = "7")]
        BeginBlock(super::ResponseBeginBlock),
        #[prost(message, tag = "8")]
        CheckTx(super::ResponseCheckTx),
        #[prost(message, tag = "9")]
        DeliverTx(super::ResponseDeliverTx),
        #[prost(message, tag = "10")]
        EndBlock(super::ResponseEndBlock),
        #[prost(message, tag = "11")]
        Commit(super::ResponseCommit),
        #[prost(message, tag = "12")]
        ListSnapshots(super::ResponseListSnapshots),
        #[prost(message, tag = "13")]
        OfferSnapshot(super::ResponseOfferSnapshot),
        #[prost(message, tag = "14")]
        LoadSnapshotChunk(super::ResponseLoadSnapshotChunk),
        #[prost(message, tag = "15")]
        ApplySnapshotChunk(super::ResponseApplySnapshotChunk),
        #[prost(message, tag = "16")]
        PrepareProposal(super::ResponsePrepareProposal),
        #[prost(message, tag = "17")]
        ProcessProposal(super::ResponseProcessProposal),
    }
}

//----------------------------------------
// Request payloads

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestEcho {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RequestFlush {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestInfo {
    #[prost(string, tag = "1")]
    pub version: String,
    #[prost(uint64, tag = "2")]
    pub block_version: u64,
    #[prost(uint64, tag = "3")]
    pub p2p_version: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestInitChain {
    #[prost(message, optional, tag = "1")]
    pub time: Option<::prost_types::Timestamp>,
    #[prost(string, tag = "2")]
    pub chain_id: String,
    #[prost(message, repeated, tag = "3")]
    pub validators: Vec<ValidatorUpdate>,
    #[prost(bytes = "vec", tag = "4")]
    pub app_state_bytes: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub initial_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestQuery {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(uint64, tag = "3")]
    pub height: u64,
    #[prost(bool, tag = "4")]
    pub prove: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestBeginBlock {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub header: Option<super::Header>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CheckTxType {
    New = 0,
    Recheck = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCheckTx {
    #[prost(bytes = "vec", tag = "1")]
    pub tx: Vec<u8>,
    #[prost(enumeration = "CheckTxType", tag = "2")]
    pub kind: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestDeliverTx {
    #[prost(bytes = "vec", tag = "1")]
    pub tx: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RequestEndBlock {
    #[prost(uint64, tag = "1")]
    pub height: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RequestCommit {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RequestListSnapshots {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestOfferSnapshot {
    #[prost(message, optional, tag = "1")]
    pub snapshot: Option<Snapshot>,
    #[prost(bytes = "vec", tag = "2")]
    pub app_hash: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RequestLoadSnapshotChunk {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(uint32, tag = "2")]
    pub format: u32,
    #[prost(uint32, tag = "3")]
    pub chunk: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestApplySnapshotChunk {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub chunk: Vec<u8>,
    #[prost(string, tag = "3")]
    pub sender: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestPrepareProposal {
    #[prost(uint64, tag = "1")]
    pub max_tx_bytes: u64,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub txs: Vec<Vec<u8>>,
    #[prost(uint64, tag = "3")]
    pub height: u64,
    #[prost(message, optional, tag = "4")]
    pub time: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "5")]
    pub proposer_address: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestProcessProposal {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txs: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub height: u64,
    #[prost(message, optional, tag = "4")]
    pub time: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "5")]
    pub proposer_address: Vec<u8>,
}

//----------------------------------------
// Response payloads

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseException {
    #[prost(string, tag = "1")]
    pub error: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseEcho {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ResponseFlush {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseInfo {
    #[prost(string, tag = "1")]
    pub data: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(uint64, tag = "3")]
    pub app_version: u64,
    #[prost(uint64, tag = "4")]
    pub last_block_height: u64,
    #[prost(bytes = "vec", tag = "5")]
    pub last_block_app_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseInitChain {
    #[prost(message, repeated, tag = "1")]
    pub validators: Vec<ValidatorUpdate>,
    #[prost(bytes = "vec", tag = "2")]
    pub app_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseQuery {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub log: String,
    #[prost(bytes = "vec", tag = "3")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub value: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub height: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ResponseBeginBlock {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseCheckTx {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
    #[prost(string, tag = "3")]
    pub log: String,
    #[prost(int64, tag = "4")]
    pub gas_wanted: i64,
    #[prost(int64, tag = "5")]
    pub gas_used: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseDeliverTx {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
    #[prost(string, tag = "3")]
    pub log: String,
    #[prost(int64, tag = "4")]
    pub gas_wanted: i64,
    #[prost(int64, tag = "5")]
    pub gas_used: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseEndBlock {
    #[prost(message, repeated, tag = "1")]
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseCommit {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub retain_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseListSnapshots {
    #[prost(message, repeated, tag = "1")]
    pub snapshots: Vec<Snapshot>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OfferSnapshotResult {
    Unknown = 0,
    Accept = 1,
    Abort = 2,
    Reject = 3,
    RejectFormat = 4,
    RejectSender = 5,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ResponseOfferSnapshot {
    #[prost(enumeration = "OfferSnapshotResult", tag = "1")]
    pub result: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseLoadSnapshotChunk {
    #[prost(bytes = "vec", tag = "1")]
    pub chunk: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ApplySnapshotChunkResult {
    Unknown = 0,
    Accept = 1,
    Abort = 2,
    Retry = 3,
    RetrySnapshot = 4,
    RejectSnapshot = 5,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseApplySnapshotChunk {
    #[prost(enumeration = "ApplySnapshotChunkResult", tag = "1")]
    pub result: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub refetch_chunks: Vec<u32>,
    #[prost(string, repeated, tag = "3")]
    pub reject_senders: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponsePrepareProposal {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txs: Vec<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProposalStatus {
    Unknown = 0,
    Accept = 1,
    Reject = 2,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ResponseProcessProposal {
    #[prost(enumeration = "ProposalStatus", tag = "1")]
    pub status: i32,
}

//----------------------------------------
// Shared payload types

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidatorUpdate {
    #[prost(bytes = "vec", tag = "1")]
    pub pub_key: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub power: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Snapshot {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(uint32, tag = "2")]
    pub format: u32,
    #[prost(uint32, tag = "3")]
    pub chunks: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub metadata: Vec<u8>,
}

//----------------------------------------
// Constructors

impl Request {
    pub fn echo(message: impl Into<String>) -> Self {
        Self::from(request::Value::Echo(RequestEcho {
            message: message.into(),
        }))
    }

    pub fn flush() -> Self {
        Self::from(request::Value::Flush(RequestFlush {}))
    }

    /// Name of the variant, for logs and mismatch errors.
    pub fn kind(&self) -> &'static str {
        use request::Value;

        match &self.value {
            None => "empty",
            Some(Value::Echo(_)) => "echo",
            Some(Value::Flush(_)) => "flush",
            Some(Value::Info(_)) => "info",
            Some(Value::InitChain(_)) => "init_chain",
            Some(Value::Query(_)) => "query",
            Some(Value::BeginBlock(_)) => "begin_block",
            Some(Value::CheckTx(_)) => "check_tx",
            Some(Value::DeliverTx(_)) => "deliver_tx",
            Some(Value::EndBlock(_)) => "end_block",
            Some(Value::Commit(_)) => "commit",
            Some(Value::ListSnapshots(_)) => "list_snapshots",
            Some(Value::OfferSnapshot(_)) => "offer_snapshot",
            Some(Value::LoadSnapshotChunk(_)) => "load_snapshot_chunk",
            Some(Value::ApplySnapshotChunk(_)) => "apply_snapshot_chunk",
            Some(Value::PrepareProposal(_)) => "prepare_proposal",
            Some(Value::ProcessProposal(_)) => "process_proposal",
        }
    }
}

impl From<request::Value> for Request {
    fn from(value: request::Value) -> Self {
        Self { value: Some(value) }
    }
}

impl Response {
    pub fn exception(error: impl Into<String>) -> Self {
        Self::from(response::Value::Exception(ResponseException {
            error: error.into(),
        }))
    }

    /// Name of the variant, for logs and mismatch errors.
    pub fn kind(&self) -> &'static str {
        use response::Value;

        match &self.value {
            None => "empty",
            Some(Value::Exception(_)) => "exception",
            Some(Value::Echo(_)) => "echo",
            Some(Value::Flush(_)) => "flush",
            Some(Value::Info(_)) => "info",
            Some(Value::InitChain(_)) => "init_chain",
            Some(Value::Query(_)) => "query",
            Some(Value::BeginBlock(_)) => "begin_block",
            Some(Value::CheckTx(_)) => "check_tx",
            Some(Value::DeliverTx(_)) => "deliver_tx",
            Some(Value::EndBlock(_)) => "end_block",
            Some(Value::Commit(_)) => "commit",
            Some(Value::ListSnapshots(_)) => "list_snapshots",
            Some(Value::OfferSnapshot(_)) => "offer_snapshot",
            Some(Value::LoadSnapshotChunk(_)) => "load_snapshot_chunk",
            Some(Value::ApplySnapshotChunk(_)) => "apply_snapshot_chunk",
            Some(Value::PrepareProposal(_)) => "prepare_proposal",
            Some(Value::ProcessProposal(_)) => "process_proposal",
        }
    }
}

impl From<response::Value> for Response {
    fn from(value: response::Value) -> Self {
        Self { value: Some(value) }
    }
}

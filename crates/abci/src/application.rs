use baronbft_proto::abci::*;

/// The deterministic application driven over ABCI.
///
/// Every method has a default body returning the empty response, so an
/// application only implements the calls it cares about. The transport
/// guarantees the application is never called concurrently: each server
/// connection and each local client serializes calls through one mutex.
pub trait Application: Send + 'static {
    fn echo(&mut self, request: RequestEcho) -> ResponseEcho {
        ResponseEcho {
            message: request.message,
        }
    }

    fn info(&mut self, _request: RequestInfo) -> ResponseInfo {
        ResponseInfo::default()
    }

    fn init_chain(&mut self, _request: RequestInitChain) -> ResponseInitChain {
        ResponseInitChain::default()
    }

    fn query(&mut self, _request: RequestQuery) -> ResponseQuery {
        ResponseQuery::default()
    }

    fn check_tx(&mut self, _request: RequestCheckTx) -> ResponseCheckTx {
        ResponseCheckTx::default()
    }

    fn begin_block(&mut self, _request: RequestBeginBlock) -> ResponseBeginBlock {
        ResponseBeginBlock::default()
    }

    fn deliver_tx(&mut self, _request: RequestDeliverTx) -> ResponseDeliverTx {
        ResponseDeliverTx::default()
    }

    fn end_block(&mut self, _request: RequestEndBlock) -> ResponseEndBlock {
        ResponseEndBlock::default()
    }

    fn commit(&mut self, _request: RequestCommit) -> ResponseCommit {
        ResponseCommit::default()
    }

    fn list_snapshots(&mut self, _request: RequestListSnapshots) -> ResponseListSnapshots {
        ResponseListSnapshots::default()
    }

    fn offer_snapshot(&mut self, _request: RequestOfferSnapshot) -> ResponseOfferSnapshot {
        ResponseOfferSnapshot::default()
    }

    fn load_snapshot_chunk(
        &mut self,
        _request: RequestLoadSnapshotChunk,
    ) -> ResponseLoadSnapshotChunk {
        ResponseLoadSnapshotChunk::default()
    }

    fn apply_snapshot_chunk(
        &mut self,
        _request: RequestApplySnapshotChunk,
    ) -> ResponseApplySnapshotChunk {
        ResponseApplySnapshotChunk::default()
    }

    fn prepare_proposal(&mut self, request: RequestPrepareProposal) -> ResponsePrepareProposal {
        ResponsePrepareProposal { txs: request.txs }
    }

    fn process_proposal(&mut self, _request: RequestProcessProposal) -> ResponseProcessProposal {
        ResponseProcessProposal {
            status: ProposalStatus::Accept as i32,
        }
    }
}

/// Route one request to the matching application method.
pub fn dispatch(app: &mut dyn Application, request: Request) -> Response {
    use request::Value as Req;
    use response::Value as Resp;

    let Some(value) = request.value else {
        return Response::exception("malformed request: empty value");
    };

    let value = match value {
        Req::Echo(r) => Resp::Echo(app.echo(r)),
        Req::Flush(_) => Resp::Flush(ResponseFlush {}),
        Req::Info(r) => Resp::Info(app.info(r)),
        Req::InitChain(r) => Resp::InitChain(app.init_chain(r)),
        Req::Query(r) => Resp::Query(app.query(r)),
        Req::BeginBlock(r) => Resp::BeginBlock(app.begin_block(r)),
        Req::CheckTx(r) => Resp::CheckTx(app.check_tx(r)),
        Req::DeliverTx(r) => Resp::DeliverTx(app.deliver_tx(r)),
        Req::EndBlock(r) => Resp::EndBlock(app.end_block(r)),
        Req::Commit(r) => Resp::Commit(app.commit(r)),
        Req::ListSnapshots(r) => Resp::ListSnapshots(app.list_snapshots(r)),
        Req::OfferSnapshot(r) => Resp::OfferSnapshot(app.offer_snapshot(r)),
        Req::LoadSnapshotChunk(r) => Resp::LoadSnapshotChunk(app.load_snapshot_chunk(r)),
        Req::ApplySnapshotChunk(r) => Resp::ApplySnapshotChunk(app.apply_snapshot_chunk(r)),
        Req::PrepareProposal(r) => Resp::PrepareProposal(app.prepare_proposal(r)),
        Req::ProcessProposal(r) => Resp::ProcessProposal(app.process_proposal(r)),
    };

    Response { value: Some(value) }
}

use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use baronbft_proto::abci::{Request, Response};

use crate::SharedError;

type HandleCallback = Box<dyn FnOnce(&Result<Response, SharedError>) + Send>;

#[derive(Default)]
struct ReqResState {
    response: Option<Result<Response, SharedError>>,
    callback: Option<HandleCallback>,
    callback_invoked: bool,
}

/// Handle to one in-flight request.
///
/// The callback protocol: the per-handle callback fires exactly once per
/// response, whether it was registered before or after the response
/// arrived. Registering after the fact runs the callback immediately,
/// synchronously, under the handle's lock, so the late- and
/// early-registration paths are indistinguishable to the caller.
pub struct ReqRes {
    request: Request,
    state: Mutex<ReqResState>,
    done: Notify,
}

impl ReqRes {
    pub(crate) fn new(request: Request) -> Self {
        Self {
            request,
            state: Mutex::new(ReqResState::default()),
            done: Notify::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The response, if it has arrived.
    pub fn response(&self) -> Option<Result<Response, SharedError>> {
        self.lock().response.clone()
    }

    /// Register the per-handle callback.
    ///
    /// If the response already arrived and the callback slot was already
    /// consumed, `cb` runs right here, under the lock.
    pub fn set_callback(&self, cb: impl FnOnce(&Result<Response, SharedError>) + Send + 'static) {
        let mut state = self.lock();

        if state.callback_invoked {
            if let Some(result) = &state.response {
                cb(result);
            }
            return;
        }

        state.callback = Some(Box::new(cb));
    }

    /// Resolve the handle. The first result wins; later calls are no-ops.
    pub(crate) fn set_done(&self, result: Result<Response, SharedError>) {
        {
            let mut state = self.lock();
            if state.response.is_some() {
                return;
            }
            state.response = Some(result);
        }

        self.done.notify_waiters();
    }

    /// Fire the stored callback once and latch the invoked flag, after
    /// which `set_callback` runs callbacks immediately.
    pub(crate) fn invoke_callback(&self) {
        let mut state = self.lock();

        if state.callback_invoked {
            return;
        }

        if let Some(cb) = state.callback.take() {
            if let Some(result) = state.response.clone() {
                cb(&result);
            }
        }

        state.callback_invoked = true;
    }

    /// Wait until the response (or the connection error) arrives.
    pub async fn wait(&self) -> Result<Response, SharedError> {
        loop {
            let notified = self.done.notified();

            if let Some(result) = self.response() {
                return result;
            }

            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReqResState> {
        self.state.lock().expect("request handle lock poisoned")
    }
}

use std::sync::{Arc, Mutex};

use baronbft_proto::abci::{request, response, Request, Response};

use crate::client::GlobalCallback;
use crate::{dispatch, Application, Error, ReqRes};

/// The in-process transport: requests short-circuit the stream and invoke
/// the application directly, under the same exclusive-lock discipline as
/// the server.
///
/// Responses resolve at enqueue time, so request/response correspondence is
/// per call and Flush is a no-op barrier.
pub struct LocalClient {
    app: Arc<Mutex<dyn Application>>,
    global_cb: Mutex<Option<GlobalCallback>>,
}

impl LocalClient {
    pub fn new(app: impl Application) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
            global_cb: Mutex::new(None),
        }
    }

    /// Share an application already owned elsewhere (e.g. by a server
    /// serving the same state on another connection).
    pub fn from_shared(app: Arc<Mutex<dyn Application>>) -> Self {
        Self {
            app,
            global_cb: Mutex::new(None),
        }
    }

    pub fn set_response_callback(&self, cb: GlobalCallback) {
        *self.global_cb.lock().expect("callback lock poisoned") = Some(cb);
    }

    pub async fn queue_request(&self, request: Request) -> Result<Arc<ReqRes>, Error> {
        let response = {
            let mut app = self.app.lock().expect("application lock poisoned");
            dispatch(&mut *app, request.clone())
        };

        let reqres = Arc::new(ReqRes::new(request));

        let result = Ok(response);
        {
            let mut cb = self.global_cb.lock().expect("callback lock poisoned");
            if let Some(cb) = cb.as_mut() {
                cb(reqres.request(), &result);
            }
        }

        reqres.set_done(result);
        reqres.invoke_callback();

        Ok(reqres)
    }

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

    pub async fn call(&self, request: Request) -> Result<Response, Error> {
        let is_flush = matches!(request.value, Some(request::Value::Flush(_)));

        let handle = self.queue_request(request).await?;
        if !is_flush {
            // Kept for symmetry with the stream transport; resolves
            // immediately here.
            self.flush().await?;
        }

        handle.wait().await.map_err(Error::Stopped)
    }
}

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response, StatusCode};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    codec::{Codec, SecureCookie},
    manager::CookieManager,
    session::Session,
};

/// Decodes the cookie into a [`Session`] before the inner service runs and writes it back after.
///
/// A cookie that fails to decode answers `500 Internal Server Error` without calling the inner
/// service, unless [`with_clear_on_decode_error`](Self::with_clear_on_decode_error) is set.
#[derive(Debug, Clone)]
pub struct SecureCookieLayer<C: Codec = SecureCookie> {
    manager: Arc<CookieManager<C>>,
    always_save: bool,
    clear_on_decode_error: bool,
}

impl<C: Codec> SecureCookieLayer<C> {
    #[must_use]
    pub fn new(manager: CookieManager<C>) -> Self {
        Self::from_shared(Arc::new(manager))
    }

    /// Builds the layer around a manager that is also used elsewhere.
    #[must_use]
    pub fn from_shared(manager: Arc<CookieManager<C>>) -> Self {
        Self {
            manager,
            always_save: false,
            clear_on_decode_error: false,
        }
    }

    /// Re-issues the cookie on every response with a non-empty session, refreshing its timestamp.
    #[must_use]
    pub fn with_always_save(mut self, always_save: bool) -> Self {
        self.always_save = always_save;
        self
    }

    /// Treats an undecodable cookie as absent and tells the client to drop it.
    #[must_use]
    pub fn with_clear_on_decode_error(mut self, clear_on_decode_error: bool) -> Self {
        self.clear_on_decode_error = clear_on_decode_error;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SecureCookieService<S, C: Codec = SecureCookie> {
    inner: S,
    manager: Arc<CookieManager<C>>,
    always_save: bool,
    clear_on_decode_error: bool,
}

impl<S, C: Codec> Layer<S> for SecureCookieLayer<C> {
    type Service = SecureCookieService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        SecureCookieService {
            inner,
            manager: self.manager.clone(),
            always_save: self.always_save,
            clear_on_decode_error: self.clear_on_decode_error,
        }
    }
}

impl<ReqBody, ResBody, S, C> Service<Request<ReqBody>> for SecureCookieService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
    C: Codec,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let manager = self.manager.clone();
        let always_save = self.always_save;
        let clear_on_decode_error = self.clear_on_decode_error;

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (payload, had_cookie) = match manager.load(req.headers()) {
                Ok(Some(payload)) => (payload, true),
                Ok(None) => (Default::default(), false),
                Err(err) => {
                    tracing::warn!(cookie = manager.name(), err = %err, "secure cookie decode failed");
                    if !clear_on_decode_error {
                        return Ok(internal_error());
                    }
                    (Default::default(), true)
                }
            };

            let session = Session::new(payload);
            req.extensions_mut().insert(session.clone());

            let mut res = inner.call(req).await?;

            if session.is_deleted() || session.is_empty() {
                if (had_cookie || session.is_deleted())
                    && let Err(err) = manager.remove(res.headers_mut())
                {
                    tracing::error!(cookie = manager.name(), err = %err, "secure cookie removal failed");
                    return Ok(internal_error());
                }
                return Ok(res);
            }

            if (session.is_modified() || always_save)
                && !res.status().is_server_error()
                && let Err(err) = manager.store(res.headers_mut(), &session.payload())
            {
                tracing::error!(cookie = manager.name(), err = %err, "secure cookie save failed");
                return Ok(internal_error());
            }

            Ok(res)
        })
    }
}

fn internal_error<B: Default>() -> Response<B> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

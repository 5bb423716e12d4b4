use std::fmt::Debug;

use http::{Request, Response};

use crate::{Payload, error::Result};

/// Set/get/delete of one named cookie against a request/response pair.
///
/// Callers written against this trait do not care which [`Codec`](crate::Codec) backs it.
pub trait CookieController: Debug + Send + Sync + 'static {
    /// Writes `payload` into a `Set-Cookie` header on `res`.
    fn set<B>(&self, res: &mut Response<B>, payload: &Payload) -> Result<()>;

    /// Reads the payload from `req`.
    ///
    /// A missing cookie yields an empty payload. An undecodable cookie turns `res` into a
    /// `500 Internal Server Error` and yields `None`.
    fn get<Q, B>(&self, res: &mut Response<B>, req: &Request<Q>) -> Option<Payload>;

    /// Tells the client to discard the cookie.
    fn del<B>(&self, res: &mut Response<B>) -> Result<()>;
}

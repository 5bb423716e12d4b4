use http::{
    HeaderMap, HeaderValue, Request, Response, StatusCode,
    header::{COOKIE, SET_COOKIE},
};
use tower_cookies::Cookie;

use crate::{
    Payload,
    codec::{Codec, SecureCookie},
    config::CookieConfig,
    controller::CookieController,
    error::{Error, Result},
    key::KeyMaterial,
};

/// Binds a [`Codec`] to one cookie name and a [`CookieConfig`].
///
/// Keys and config are fixed at construction, so a manager can be shared across threads behind an
/// `Arc` without locking.
#[derive(Debug, Clone)]
pub struct CookieManager<C: Codec = SecureCookie> {
    name: String,
    codec: C,
    config: CookieConfig,
}

impl CookieManager<SecureCookie> {
    /// Creates a manager with freshly generated keys.
    ///
    /// Fails if the operating system's random source is unavailable; treat that as fatal.
    pub fn new<N: Into<String>>(name: N, config: CookieConfig) -> Result<Self> {
        Self::with_keys(name, config, KeyMaterial::generate()?)
    }

    /// Creates a manager that uses the given keys.
    pub fn with_keys<N: Into<String>>(
        name: N,
        config: CookieConfig,
        keys: KeyMaterial,
    ) -> Result<Self> {
        let mut codec = SecureCookie::new(keys).with_max_length(config.max_length);
        if config.max_age > 0 {
            codec = codec.with_max_age_limit(config.max_age);
        }

        Self::with_codec(name, config, codec)
    }
}

impl<C: Codec> CookieManager<C> {
    /// Creates a manager around any [`Codec`].
    pub fn with_codec<N: Into<String>>(name: N, config: CookieConfig, codec: C) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }

        Ok(Self {
            name,
            codec,
            config,
        })
    }

    /// The cookie name this manager reads and writes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes applied to every emitted `Set-Cookie`.
    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Decodes this manager's cookie from request headers.
    ///
    /// `Ok(None)` means the client sent no such cookie.
    pub fn load(&self, headers: &HeaderMap) -> Result<Option<Payload>> {
        let token = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| std::str::from_utf8(value.as_bytes()).ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(std::result::Result::ok)
            .find(|cookie| cookie.name() == self.name)
            .map(|cookie| cookie.value().to_owned());

        match token {
            Some(token) => self.codec.decode(&self.name, &token).map(Some),
            None => Ok(None),
        }
    }

    /// Appends a `Set-Cookie` carrying `payload`.
    pub fn store(&self, headers: &mut HeaderMap, payload: &Payload) -> Result<()> {
        let token = self
            .codec
            .encode(&self.name, payload, self.config.max_age)?;
        append_cookie(headers, &self.config.build_cookie(&self.name, token))
    }

    /// Appends a `Set-Cookie` that makes the client drop the cookie.
    ///
    /// The value is itself an already-expired token, so a client that ignores `Max-Age` still
    /// cannot replay it.
    pub fn remove(&self, headers: &mut HeaderMap) -> Result<()> {
        let token = self.codec.encode(&self.name, &Payload::new(), -1)?;
        append_cookie(headers, &self.config.build_removal(&self.name, token))
    }
}

impl<C: Codec> CookieController for CookieManager<C> {
    fn set<B>(&self, res: &mut Response<B>, payload: &Payload) -> Result<()> {
        self.store(res.headers_mut(), payload)
    }

    fn get<Q, B>(&self, res: &mut Response<B>, req: &Request<Q>) -> Option<Payload> {
        match self.load(req.headers()) {
            Ok(payload) => Some(payload.unwrap_or_default()),
            Err(err) => {
                tracing::warn!(cookie = %self.name, err = %err, "secure cookie decode failed");
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                None
            }
        }
    }

    fn del<B>(&self, res: &mut Response<B>) -> Result<()> {
        self.remove(res.headers_mut())
    }
}

fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<()> {
    let value =
        HeaderValue::from_str(&cookie.to_string()).map_err(|err| Error::Header(err.to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

// RFC 6265 cookie-name token, minus `|` which the token format uses as a separator.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`~".contains(&b))
}

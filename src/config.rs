use std::borrow::Cow;

use time::{Duration, OffsetDateTime};
use tower_cookies::{Cookie, cookie::CookieBuilder};

use crate::{SameSite, codec::DEFAULT_MAX_LENGTH};

/// Default cookie lifetime: one week.
pub const DEFAULT_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Attributes of the cookies written by a [`CookieManager`](crate::CookieManager).
///
/// # Security
/// `http_only` and `secure` default to `false` so the cookie works over plain HTTP during local
/// development. Turn both on for anything reachable from the internet.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub(crate) http_only: bool,
    pub(crate) secure: bool,
    pub(crate) max_age: i64,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) max_length: usize,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            http_only: false,
            secure: false,
            max_age: DEFAULT_MAX_AGE,
            same_site: None,
            path: "/".into(),
            domain: None,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl CookieConfig {
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Cookie lifetime in seconds.
    ///
    /// Positive values emit `Max-Age`/`Expires` and bound the token's age on the server. Zero makes
    /// a browser-session cookie. Negative values write cookies the client discards immediately.
    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// Largest encoded cookie value, in bytes.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub(crate) fn build_cookie(&self, name: &str, value: String) -> Cookie<'static> {
        if self.max_age < 0 {
            return self.build_removal(name, value);
        }

        let mut cookie_builder = self.base_cookie(name, value);

        if self.max_age > 0 {
            let max_age = Duration::seconds(self.max_age);
            cookie_builder = cookie_builder.max_age(max_age);
            // Past the representable calendar, Max-Age alone carries the lifetime.
            if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
                cookie_builder = cookie_builder.expires(expires);
            }
        }

        cookie_builder.build()
    }

    pub(crate) fn build_removal(&self, name: &str, value: String) -> Cookie<'static> {
        self.base_cookie(name, value)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::now_utc() - Duration::days(365))
            .build()
    }

    fn base_cookie(&self, name: &str, value: String) -> CookieBuilder<'static> {
        let mut cookie_builder = Cookie::build((name.to_owned(), value))
            .http_only(self.http_only)
            .secure(self.secure)
            .path(self.path.clone());

        if let Some(same_site) = self.same_site {
            cookie_builder = cookie_builder.same_site(same_site);
        }
        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder
    }
}

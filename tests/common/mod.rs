#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookies are parsed with `tower_cookies::Cookie`, the same type the manager uses to build its
// `Set-Cookie` headers.
use std::collections::BTreeMap;

use axum::body::Body;
use http::{HeaderMap, Request, header};
use http_body_util::BodyExt as _;
use secure_cookie_session::{CookieConfig, CookieManager, KeyMaterial, Payload};
use time::OffsetDateTime;
use tower_cookies::Cookie;

pub const NAME: &str = "session";

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn keys(seed: u8) -> KeyMaterial {
    KeyMaterial::new(vec![seed; 64], vec![seed.wrapping_add(1); 32]).expect("valid keys")
}

pub fn make_manager(config: CookieConfig) -> CookieManager {
    CookieManager::with_keys(NAME, config, keys(7)).expect("manager builds")
}

pub fn payload(pairs: &[(&str, &str)]) -> Payload {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            Cookie::parse(value.to_owned()).expect("set-cookie parses successfully")
        })
        .collect()
}

pub fn get_session_cookie(headers: &HeaderMap) -> Cookie<'static> {
    set_cookies(headers)
        .into_iter()
        .next()
        .expect("response includes set-cookie header")
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // `name=value` only, as a browser sends it back.
    cookie.stripped().to_string()
}

pub fn request_with_cookie(cookie: &Cookie<'_>) -> Request<Body> {
    Request::builder()
        .header(header::COOKIE, cookie_header_value(cookie))
        .body(Body::empty())
        .expect("request builds successfully")
}

pub fn tamper_cookie_value(cookie: &mut Cookie<'_>) {
    let mut value = cookie.value().to_string();
    let last = value
        .pop()
        .expect("cookie value has at least one character");
    let replacement = if last == 'A' { 'B' } else { 'A' };
    value.push(replacement);
    cookie.set_value(value);
}

/// Minimal browser cookie store: applies `Set-Cookie` headers and produces `Cookie` headers.
#[derive(Debug, Default)]
pub struct Client {
    jar: BTreeMap<String, String>,
}

impl Client {
    pub fn receive(&mut self, headers: &HeaderMap) {
        for cookie in set_cookies(headers) {
            let expired_by_age = cookie.max_age().is_some_and(|age| age.is_zero() || age.is_negative());
            let expired_by_date = cookie
                .expires_datetime()
                .is_some_and(|at| at <= OffsetDateTime::now_utc());

            if expired_by_age || expired_by_date {
                self.jar.remove(cookie.name());
            } else {
                self.jar
                    .insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.jar.contains_key(name)
    }

    pub fn request(&self) -> Request<Body> {
        self.request_to("/")
    }

    pub fn request_to(&self, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if !self.jar.is_empty() {
            let header = self
                .jar
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, header);
        }
        builder.body(Body::empty()).expect("request builds successfully")
    }
}

use std::net::SocketAddr;

use axum::{Extension, Router, routing::get};
use secure_cookie_session::{CookieConfig, CookieManager, SameSite, SecureCookieLayer, Session};

async fn index(Extension(session): Extension<Session>) -> String {
    let n: usize = session
        .get("n")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    session.insert("n", (n + 1).to_string());
    format!("n={n}")
}

async fn logout(Extension(session): Extension<Session>) -> &'static str {
    session.delete();
    "bye"
}

#[tokio::main]
async fn main() {
    let config = CookieConfig::default()
        // Default: false
        .with_http_only(true)
        // Default: false (keep false for local HTTP development)
        .with_secure(false)
        // Default: none
        .with_same_site(SameSite::Lax)
        // Default: 604800 (one week)
        .with_max_age(3600)
        // Default: "/"
        .with_path("/")
        // Default: none
        .without_domain()
        // Default: 4096
        .with_max_length(4096);
    let manager = CookieManager::new("session", config).expect("random keys are available");
    let layer = SecureCookieLayer::new(manager)
        // Default: false
        .with_always_save(true)
        // Default: false
        .with_clear_on_decode_error(false);

    let app = Router::new()
        .route("/", get(index))
        .route("/logout", get(logout))
        .layer(layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}

//! Development server with live reload
//!
//! Pages are rendered on every request, so edits to posts show up on the
//! next load without a rebuild.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, Request, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::templates;
use crate::Site;

type Page = (StatusCode, String);

/// Server state
struct ServerState {
    site: RwLock<Site>,
    reload_tx: broadcast::Sender<()>,
}

impl ServerState {
    fn site(&self) -> Site {
        match self.site.read() {
            Ok(site) => site.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_site(&self, site: Site) {
        match self.site.write() {
            Ok(mut guard) => *guard = site,
            Err(poisoned) => *poisoned.into_inner() = site,
        }
    }
}

/// Start the development server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let mut site = site.clone();
    site.live_reload = watch;

    let state = Arc::new(ServerState {
        site: RwLock::new(site.clone()),
        reload_tx,
    });
    let app = router(&site, state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(&site, &state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Path prefix every page lives under, `""` when the site is at `/`
fn root_prefix(site: &Site) -> String {
    match site.config.root.trim_matches('/') {
        "" => String::new(),
        root => format!("/{}", root),
    }
}

/// Routes for the home page, the blog index, posts and embedded assets,
/// mounted under the configured root
fn router(site: &Site, state: Arc<ServerState>) -> Router {
    let root = root_prefix(site);
    let blog = format!("{}/{}", root, site.config.blog_dir.trim_matches('/'));

    let mut app = Router::new()
        .route(&format!("{}/", root), get(home_handler))
        .route(&blog, get(index_handler))
        .route(&format!("{}/", blog), get(index_handler))
        .route(&format!("{}/:slug", blog), get(post_handler))
        .route(&format!("{}/:slug/", blog), get(post_handler))
        .route(&format!("{}/assets/*path", root), get(asset_handler));

    if !root.is_empty() {
        app = app.route(&root, get(home_handler));
    }

    if site.live_reload {
        app = app.route("/__livereload", get(livereload_handler));
    }

    app.fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render off the async runtime and turn the result into a response
async fn render_page<F>(state: Arc<ServerState>, render: F) -> Response
where
    F: FnOnce(&Site) -> Result<Page> + Send + 'static,
{
    let site = state.site();
    match tokio::task::spawn_blocking(move || render(&site)).await {
        Ok(Ok((status, html))) => (status, Html(html)).into_response(),
        Ok(Err(e)) => {
            tracing::error!("Render failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Render failed: {:#}", e),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn home_handler(State(state): State<Arc<ServerState>>) -> Response {
    render_page(state, |site| Ok((StatusCode::OK, site.render_home()?))).await
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    render_page(state, |site| Ok((StatusCode::OK, site.render_index()?))).await
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    render_page(state, move |site| match site.render_post(&slug)? {
        Some(html) => Ok((StatusCode::OK, html)),
        None => {
            tracing::debug!("No post with slug {:?}", slug);
            Ok((StatusCode::NOT_FOUND, site.render_not_found(Some(&slug))?))
        }
    })
    .await
}

async fn asset_handler(Path(path): Path<String>) -> Response {
    match templates::asset(&path) {
        Some((body, mime)) => ([(header::CONTENT_TYPE, mime)], body).into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Serve files from the static directory, falling back to the not-found page
async fn static_handler(
    State(state): State<Arc<ServerState>>,
    mut request: Request<Body>,
) -> Response {
    let site = state.site();
    let root = root_prefix(&site);

    // Static files are published under the root, like every page
    let rest = match request.uri().path().strip_prefix(root.as_str()) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => return not_found(state).await,
    };
    match rest.parse::<Uri>() {
        Ok(uri) => *request.uri_mut() = uri,
        Err(_) => return not_found(state).await,
    }

    let mut service = ServeDir::new(site.static_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => not_found(state).await,
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

async fn not_found(state: Arc<ServerState>) -> Response {
    render_page(state, |site| {
        Ok((StatusCode::NOT_FOUND, site.render_not_found(None)?))
    })
    .await
}

/// Watch content, static files and config; reload connected browsers on change
fn watch_and_reload(site: &Site, state: &ServerState) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)?;

    for dir in [&site.content_dir, &site.static_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    let config_path = site.base_dir.join("_config.yml");
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                if relevant.iter().any(|e| e.path.ends_with("_config.yml")) {
                    match Site::new(&site.base_dir) {
                        Ok(mut fresh) => {
                            fresh.live_reload = true;
                            state.replace_site(fresh);
                            tracing::info!("Configuration reloaded");
                        }
                        Err(e) => {
                            tracing::error!("Keeping previous configuration: {:#}", e);
                            continue;
                        }
                    }
                }

                // Receivers may all be gone; nothing to notify then
                let _ = state.reload_tx.send(());
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use axum::body::to_bytes;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(posts: &[(&str, &str)]) -> (TempDir, Router) {
        app_with(posts, SiteConfig::default())
    }

    fn app_with(posts: &[(&str, &str)], config: SiteConfig) -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content/blog");
        fs::create_dir_all(&content).unwrap();
        for (name, body) in posts {
            fs::write(content.join(name), body).unwrap();
        }
        let site = Site::with_config(dir.path().to_path_buf(), config).unwrap();
        let (reload_tx, _) = broadcast::channel(1);
        let state = Arc::new(ServerState {
            site: RwLock::new(site.clone()),
            reload_tx,
        });
        (dir, router(&site, state))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_post_route() {
        let (_dir, app) = app(&[("hello.mdx", "---\ntitle: Hello\n---\nbody text\n")]);
        let (status, body) = get(app, "/blog/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("body text"));
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        let (_dir, app) = app(&[]);
        let (status, body) = get(app, "/blog/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("missing"));
    }

    #[tokio::test]
    async fn test_edits_visible_without_restart() {
        let (dir, app) = app(&[]);
        let (_, before) = get(app.clone(), "/blog").await;
        assert!(before.contains("No posts yet."));

        fs::write(
            dir.path().join("content/blog/new.mdx"),
            "---\ntitle: Fresh\n---\n",
        )
        .unwrap();
        let (_, after) = get(app, "/blog").await;
        assert!(after.contains("Fresh"));
    }

    #[tokio::test]
    async fn test_assets_served() {
        let (_dir, app) = app(&[]);
        let (status, body) = get(app.clone(), "/assets/site.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("rolodex"));
        let (status, _) = get(app, "/assets/nope.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let (dir, app) = app(&[]);
        fs::create_dir_all(dir.path().join("static")).unwrap();
        fs::write(dir.path().join("static/robots.txt"), "User-agent: *").unwrap();
        let (status, body) = get(app.clone(), "/robots.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "User-agent: *");

        let (status, body) = get(app, "/elsewhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("This page does not exist."));
    }

    #[tokio::test]
    async fn test_routes_follow_root() {
        let config = SiteConfig {
            root: "/notes/".to_string(),
            ..Default::default()
        };
        let (dir, app) = app_with(&[("hello.mdx", "---\ntitle: Hello\n---\nbody\n")], config);
        fs::create_dir_all(dir.path().join("static")).unwrap();
        fs::write(dir.path().join("static/robots.txt"), "User-agent: *").unwrap();

        let (status, home) = get(app.clone(), "/notes/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(home.contains(r#"href="/notes/blog""#));

        for uri in ["/notes", "/notes/blog", "/notes/blog/hello", "/notes/assets/site.css", "/notes/robots.txt"] {
            let (status, _) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
        }

        for uri in ["/blog/hello", "/robots.txt"] {
            let (status, _) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        }
    }
}

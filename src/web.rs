//! HTTP presentation layer.
//!
//! Every request runs the autoplay check for the visitor's session before it
//! renders, and the page re-requests itself when the next carousel is due, so
//! autoplay is driven by page loads rather than a server-side timer.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::TypedHeader;
use axum_extra::extract::cookie::{Cookie as SetCookie, CookieJar, SameSite};
use headers::Cookie;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::caption_store::{CaptionStore, ExportBlob};
use crate::config::Configuration;
use crate::contact::{mailto_uri, ContactForm};
use crate::scan::EXTENSION_PRIORITY;
use crate::session::{SaveOutcome, Session};

const SESSION_COOKIE: &str = "showcase_sid";

#[derive(Clone)]
struct AppState {
    config: Arc<Configuration>,
    store: Arc<dyn CaptionStore>,
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
}

struct SessionEntry {
    session: Session,
    last_seen: Instant,
}

type HtmlError = (StatusCode, Html<String>);

pub fn router(config: Arc<Configuration>, store: Arc<dyn CaptionStore>) -> Router {
    let state = AppState {
        config,
        store,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };
    Router::new()
        .route("/", get(index))
        .route("/carousel/{name}/next", post(next_slide))
        .route("/carousel/{name}/prev", post(prev_slide))
        .route("/carousel/{name}/image/{index}", get(serve_image))
        .route("/captions", post(edit_caption))
        .route("/captions/save", post(save_captions))
        .route("/captions.json", get(export_captions))
        .route("/contact", post(contact))
        .with_state(state)
}

pub async fn serve(
    config: Arc<Configuration>,
    store: Arc<dyn CaptionStore>,
    bind_addr: SocketAddr,
    cancel: CancellationToken,
) -> Result<()> {
    let app = router(config, store);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind showcase listener on {bind_addr}"))?;
    tracing::info!(%bind_addr, "showcase web server listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .context("showcase web server exited")?;
    Ok(())
}

/// Locked session table plus the id of the caller's session.
struct SessionHandle<'a> {
    guard: MutexGuard<'a, HashMap<String, SessionEntry>>,
    id: String,
    created: bool,
}

impl SessionHandle<'_> {
    fn session(&mut self) -> Result<&mut Session, HtmlError> {
        self.guard
            .get_mut(&self.id)
            .map(|e| &mut e.session)
            .ok_or_else(|| html_error(StatusCode::INTERNAL_SERVER_ERROR, "Session expired."))
    }

    /// Attach the session cookie when this request created the session.
    fn finish(&self, resp: impl IntoResponse) -> Response {
        if !self.created {
            return resp.into_response();
        }
        let cookie = SetCookie::build((SESSION_COOKIE, self.id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (CookieJar::new().add(cookie), resp).into_response()
    }
}

/// Look up the caller's session, creating one when the cookie is missing,
/// unknown or idle past `session-idle`. The table never holds more than
/// `max-sessions` entries.
fn open_session<'a>(
    state: &'a AppState,
    sid: Option<&str>,
    now: Instant,
) -> Result<SessionHandle<'a>, HtmlError> {
    let mut guard = state.sessions.lock().map_err(|_| {
        tracing::error!("session table lock poisoned");
        html_error(StatusCode::INTERNAL_SERVER_ERROR, "Session storage is unavailable.")
    })?;

    let idle = state.config.session_idle;
    guard.retain(|_, e| now.saturating_duration_since(e.last_seen) < idle);

    if let Some(id) = sid
        && let Some(entry) = guard.get_mut(id)
    {
        entry.last_seen = now;
        return Ok(SessionHandle {
            guard,
            id: id.to_string(),
            created: false,
        });
    }

    while guard.len() >= state.config.max_sessions {
        let Some(oldest) = guard
            .iter()
            .min_by_key(|(_, e)| e.last_seen)
            .map(|(id, _)| id.clone())
        else {
            break;
        };
        guard.remove(&oldest);
        tracing::debug!(session = %oldest, "session table full; dropped least recently seen");
    }

    let id = new_session_id();
    let session = Session::start(&state.config, state.store.clone(), now);
    tracing::debug!(session = %id, "new visitor session");
    guard.insert(
        id.clone(),
        SessionEntry {
            session,
            last_seen: now,
        },
    );
    Ok(SessionHandle {
        guard,
        id,
        created: true,
    })
}

fn session_id(cookies: &Option<TypedHeader<Cookie>>) -> Option<&str> {
    cookies
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(SESSION_COOKIE))
}

fn new_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

async fn index(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, HtmlError> {
    let now = Instant::now();
    let mut handle = open_session(&state, session_id(&cookies), now)?;
    let session = handle.session()?;
    if session.apply_query(&query, now) {
        return Ok(handle.finish(Redirect::to("/")));
    }
    session.render_pass(now);
    let page = render_page(&state.config, session, now, None);
    Ok(handle.finish(Html(page)))
}

async fn next_slide(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Path(name): Path<String>,
) -> Result<Response, HtmlError> {
    navigate(&state, session_id(&cookies), &name, |c, now| c.next(now))
}

async fn prev_slide(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Path(name): Path<String>,
) -> Result<Response, HtmlError> {
    navigate(&state, session_id(&cookies), &name, |c, now| c.prev(now))
}

fn navigate(
    state: &AppState,
    sid: Option<&str>,
    name: &str,
    op: impl FnOnce(&mut crate::carousel::CarouselController, Instant),
) -> Result<Response, HtmlError> {
    let now = Instant::now();
    let mut handle = open_session(state, sid, now)?;
    let controller = handle
        .session()?
        .carousel_mut(name)
        .map_err(|err| html_error(StatusCode::NOT_FOUND, &err.to_string()))?;
    op(controller, now);
    Ok(handle.finish(Redirect::to("/")))
}

async fn serve_image(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Path((name, index)): Path<(String, String)>,
) -> Result<Response, HtmlError> {
    let Ok(index) = index.trim().parse::<i64>() else {
        return Err(html_error(StatusCode::BAD_REQUEST, "Image index must be an integer."));
    };
    let (path, cookie_resp) = {
        let mut handle = open_session(&state, session_id(&cookies), Instant::now())?;
        let controller = handle
            .session()?
            .carousel(&name)
            .map_err(|err| html_error(StatusCode::NOT_FOUND, &err.to_string()))?;
        let path = controller
            .get_wrapped(index)
            .map(|a| a.path.clone())
            .ok_or_else(|| html_error(StatusCode::NOT_FOUND, "This carousel has no images yet."))?;
        (path, handle.finish(()))
    };
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        tracing::warn!(path = %path.display(), %err, "failed to read carousel image");
        html_error(StatusCode::NOT_FOUND, "Image is no longer available.")
    })?;
    let mut resp = (
        [(header::CONTENT_TYPE, content_type_for(&path))],
        bytes,
    )
        .into_response();
    if let Some(cookie) = cookie_resp.headers().get(header::SET_COOKIE) {
        resp.headers_mut().insert(header::SET_COOKIE, cookie.clone());
    }
    Ok(resp)
}

#[derive(Deserialize)]
struct CaptionForm {
    stem: String,
    caption: String,
}

async fn edit_caption(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Form(form): Form<CaptionForm>,
) -> Result<Response, HtmlError> {
    let mut handle = open_session(&state, session_id(&cookies), Instant::now())?;
    handle.session()?.edit_caption(&form.stem, &form.caption);
    Ok(handle.finish(Redirect::to("/")))
}

async fn save_captions(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
) -> Result<Response, HtmlError> {
    let mut handle = open_session(&state, session_id(&cookies), Instant::now())?;
    let outcome = handle
        .session()?
        .save_captions()
        .map_err(internal_error("failed to save captions"))?;
    match outcome {
        SaveOutcome::Saved => Ok(handle.finish(Redirect::to("/"))),
        SaveOutcome::Fallback(blob) => Ok(handle.finish(download(blob))),
    }
}

async fn export_captions(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
) -> Result<Response, HtmlError> {
    let mut handle = open_session(&state, session_id(&cookies), Instant::now())?;
    let blob = handle
        .session()?
        .export_captions()
        .map_err(internal_error("failed to export captions"))?;
    Ok(handle.finish(download(blob)))
}

async fn contact(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    Form(form): Form<ContactForm>,
) -> Result<Response, HtmlError> {
    let now = Instant::now();
    let mut handle = open_session(&state, session_id(&cookies), now)?;
    let uri = mailto_uri(&state.config.contact.recipient, &state.config.contact.subject, &form);
    let session = handle.session()?;
    session.render_pass(now);
    let page = render_page(&state.config, session, now, Some(&uri));
    Ok(handle.finish(Html(page)))
}

fn download(blob: ExportBlob) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", blob.file_name);
    (
        [
            (header::CONTENT_TYPE, blob.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob.bytes,
    )
        .into_response()
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

fn html_error(status: StatusCode, msg: &str) -> HtmlError {
    (
        status,
        Html(layout(
            "Error",
            &format!("<h2>Something went wrong</h2><p>{}</p><p><a href=\"/\">Back</a></p>", escape_html(msg)),
            None,
        )),
    )
}

fn internal_error(msg: &'static str) -> impl Fn(crate::error::Error) -> HtmlError {
    move |err| {
        tracing::error!(error = ?err, "{msg}");
        html_error(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

fn render_page(
    cfg: &Configuration,
    session: &mut Session,
    now: Instant,
    mailto: Option<&str>,
) -> String {
    let mut body = String::new();
    writeln!(&mut body, "<h1>{}</h1>", escape_html(&cfg.site_title)).ok();

    if let Some(notice) = session.take_notice() {
        let link = if notice.offers_download() {
            " <a href=\"/captions.json\">Download captions.json</a>"
        } else {
            ""
        };
        writeln!(
            &mut body,
            "<p class=\"notice\">{}{link}</p>",
            escape_html(notice.message())
        )
        .ok();
    }

    for named in session.carousels() {
        let c = &named.controller;
        let name = escape_html(&named.name);
        writeln!(&mut body, "<section class=\"carousel\" id=\"{name}\">").ok();
        let (Some(index), Some(asset)) = (c.current_index(), c.current()) else {
            let prefix = cfg
                .carousel(&named.name)
                .map(|c| c.prefix.as_str())
                .unwrap_or_default();
            writeln!(
                &mut body,
                "<p class=\"placeholder\">Upload images named <code>{}1.{}</code>, <code>{}2.{}</code>, ... to fill this carousel.</p></section>",
                escape_html(prefix),
                EXTENSION_PRIORITY[0],
                escape_html(prefix),
                EXTENSION_PRIORITY[0]
            )
            .ok();
            continue;
        };
        let caption = escape_html(&session.caption_for(asset));
        writeln!(
            &mut body,
            "<figure><img src=\"/carousel/{name}/image/{index}\" alt=\"{caption}\"><figcaption>{caption} <span class=\"count\">{} / {}</span></figcaption></figure>",
            index + 1,
            c.len()
        )
        .ok();
        writeln!(
            &mut body,
            "<div class=\"nav\"><form method=\"post\" action=\"/carousel/{name}/prev\"><button type=\"submit\">&#8249; Previous</button></form><form method=\"post\" action=\"/carousel/{name}/next\"><button type=\"submit\">Next &#8250;</button></form></div>"
        )
        .ok();
        body.push_str("<div class=\"thumbs\">");
        for (i, item) in c.items().iter().enumerate() {
            let class = if i == index { " class=\"active\"" } else { "" };
            writeln!(
                &mut body,
                "<a{class} href=\"/?{}={i}\"><img src=\"/carousel/{name}/image/{i}\" alt=\"{}\"></a>",
                escape_html(&named.param),
                escape_html(&session.caption_for(item))
            )
            .ok();
        }
        body.push_str("</div>");
        writeln!(
            &mut body,
            "<form class=\"caption-edit\" method=\"post\" action=\"/captions\"><input type=\"hidden\" name=\"stem\" value=\"{}\"><input name=\"caption\" value=\"{caption}\"><button type=\"submit\">Edit caption</button></form></section>",
            escape_html(&asset.stem)
        )
        .ok();
    }

    body.push_str("<section class=\"captions\"><form method=\"post\" action=\"/captions/save\"><button type=\"submit\">Save captions</button></form> <a href=\"/captions.json\">Download captions.json</a></section>");
    body.push_str(&render_contact(mailto));

    // The contact result answers a POST and must not reload.
    let refresh = match mailto {
        Some(_) => None,
        None => session.until_due(now).map(refresh_secs),
    };
    layout(&cfg.site_title, &body, refresh)
}

/// Whole seconds until `due`, rounded up so the reload never lands early.
fn refresh_secs(due: Duration) -> u64 {
    (due.as_secs() + u64::from(due.subsec_nanos() > 0)).max(1)
}

fn render_contact(mailto: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"contact\" id=\"contact\"><h2>Contact Sales</h2>");
    if let Some(uri) = mailto {
        writeln!(
            &mut out,
            "<p class=\"notice\">Click the link below to open your email client:</p><p><a href=\"{}\">Compose email</a></p>",
            escape_html(uri)
        )
        .ok();
    }
    out.push_str("<form method=\"post\" action=\"/contact\"><label>Name<input name=\"name\"></label><label>Work email<input name=\"email\" type=\"email\"></label><label>Organization<input name=\"organization\"></label><label>Phone/WhatsApp (optional)<input name=\"phone\"></label><label>What challenge are you trying to solve?<textarea name=\"message\"></textarea></label><button type=\"submit\">Send email</button></form></section>");
    out
}

fn layout(title: &str, body: &str, refresh_secs: Option<u64>) -> String {
    let refresh = refresh_secs
        .map(|s| format!("<meta http-equiv=\"refresh\" content=\"{s};url=/\">"))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">{refresh}<title>{}</title><style>{}</style></head><body><main>{}</main></body></html>",
        escape_html(title),
        styles(),
        body
    )
}

fn styles() -> &'static str {
    "body { font-family: sans-serif; margin: 0; padding: 0; background: #0b1221; color: #e6eefc; }\nmain { max-width: 1080px; margin: 0 auto; padding: 24px; box-sizing: border-box; }\nh1, h2 { margin-top: 0; }\nsection { padding: 24px 0; border-top: 1px solid rgba(255,255,255,.08); }\nfigure { margin: 0; }\nfigure img { width: 100%; max-height: 70vh; object-fit: cover; border-radius: 12px; }\nfigcaption { margin-top: 8px; color: #b9c6e6; }\n.count { float: right; opacity: .7; }\n.nav form { display: inline-block; margin: 8px 4px 0 0; }\nbutton { padding: 8px 14px; border-radius: 10px; border: 1px solid rgba(255,255,255,.18); background: rgba(255,255,255,.06); color: #e6eefc; cursor: pointer; }\nbutton:hover { background: rgba(255,255,255,.12); }\n.thumbs { display: flex; gap: 8px; margin-top: 12px; overflow-x: auto; }\n.thumbs img { height: 56px; border-radius: 6px; opacity: .6; }\n.thumbs .active img { opacity: 1; outline: 2px solid #34d399; }\n.caption-edit input { width: 60%; padding: 6px; }\n.placeholder { padding: 48px; text-align: center; border: 1px dashed rgba(255,255,255,.2); border-radius: 12px; }\n.notice { background: rgba(52,211,153,.12); padding: 12px; border-radius: 8px; }\na { color: #34d399; }\n.contact label { display: block; margin-top: 10px; }\n.contact input, .contact textarea { display: block; width: 100%; box-sizing: border-box; padding: 8px; margin-top: 4px; }"
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rounds_up_to_whole_seconds() {
        assert_eq!(refresh_secs(Duration::from_millis(1500)), 2);
        assert_eq!(refresh_secs(Duration::from_secs(3)), 3);
        assert_eq!(refresh_secs(Duration::from_millis(1)), 1);
        assert_eq!(refresh_secs(Duration::ZERO), 1);
    }
}

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    client::BackendClient,
    config::Settings,
    export::{self, CSV_FILENAME, JSON_FILENAME},
    html::{render_page, Chrome},
    models::SimulationForm,
    session::{session_id_from_cookie, Action, NavError, RunOutcome, Screen, SessionStore, SESSION_COOKIE},
    view::build_page,
};

#[derive(Clone)]
pub struct DashboardState {
    pub settings: Settings,
    pub client: BackendClient,
    pub sessions: SessionStore,
}

impl DashboardState {
    pub fn new(settings: Settings, client: BackendClient) -> Self {
        Self {
            settings,
            client,
            sessions: SessionStore::default(),
        }
    }

    fn session(&self, headers: &HeaderMap) -> (Uuid, bool) {
        let existing = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(session_id_from_cookie);
        self.sessions.resolve(existing)
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/action/{action}", post(navigate))
        .route("/simulate/run", post(run_simulation))
        .route(&format!("/export/{CSV_FILENAME}"), get(export_csv))
        .route(&format!("/export/{JSON_FILENAME}"), get(export_json))
        .route("/api/health", get(api_health))
        .route("/api/session", get(api_session))
        .with_state(state)
}

pub async fn serve_dashboard(settings: Settings, client: BackendClient) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.dashboard_host, settings.dashboard_port)
        .parse()
        .with_context(|| {
            format!(
                "dashboard addr {}:{}",
                settings.dashboard_host, settings.dashboard_port
            )
        })?;

    let app = router(DashboardState::new(settings, client));

    log::info!("dashboard.start url=http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("dashboard.stop");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("dashboard.signal_error {}", e);
    }
}

fn with_session_cookie(resp: impl IntoResponse, id: Uuid, created: bool) -> Response {
    let mut resp = resp.into_response();
    if created {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(v) = HeaderValue::from_str(&cookie) {
            resp.headers_mut().append(header::SET_COOKIE, v);
        }
    }
    resp
}

async fn index(State(st): State<DashboardState>, headers: HeaderMap) -> Response {
    let (id, created) = st.session(&headers);
    let session = st.sessions.snapshot(id);

    // The trends screen fetches on every render.
    let charts = if session.screen == Screen::Trends {
        Some(st.client.charts().await)
    } else {
        None
    };

    let page = build_page(&session, charts.as_ref());
    let mode = st.settings.backend_mode.to_string();
    let chrome = Chrome {
        title: &st.settings.dashboard_title,
        backend_mode: &mode,
        backend_url: st.client.base_url(),
    };
    with_session_cookie(Html(render_page(&page, &chrome)), id, created)
}

async fn navigate(
    State(st): State<DashboardState>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (id, created) = st.session(&headers);
    let result = action
        .parse::<Action>()
        .and_then(|a| st.sessions.update(id, |s| s.navigate(a)));

    let resp = match result {
        Ok(screen) => {
            log::info!("dashboard.nav session={} screen={}", id, screen);
            Redirect::to("/").into_response()
        }
        Err(e @ NavError::UnknownAction(_)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e @ NavError::NotAllowed { .. }) => {
            log::warn!("dashboard.nav_rejected session={} {}", id, e);
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
    };
    with_session_cookie(resp, id, created)
}

async fn run_simulation(
    State(st): State<DashboardState>,
    headers: HeaderMap,
    Form(form): Form<SimulationForm>,
) -> Response {
    let (id, created) = st.session(&headers);
    let screen = st.sessions.snapshot(id).screen;
    if screen != Screen::Simulate {
        let msg = format!("run is only available on the simulate screen (current: {screen})");
        return with_session_cookie((StatusCode::CONFLICT, msg), id, created);
    }

    let parsed = form.to_params();
    st.sessions.update(id, |s| s.form = form);
    let params = match parsed {
        Ok(p) => p,
        Err(e) => {
            log::info!("dashboard.run_invalid session={} {}", id, e);
            st.sessions.update(id, |s| s.record_run(RunOutcome::Invalid(e)));
            return with_session_cookie(Redirect::to("/"), id, created);
        }
    };

    // No lock is held across the backend call.
    let outcome = match st.client.simulate(&params).await {
        Ok(fetched) => RunOutcome::Success(fetched),
        Err(e) => RunOutcome::Failed(e),
    };
    log::info!(
        "dashboard.run session={} ok={}",
        id,
        matches!(outcome, RunOutcome::Success(_))
    );
    st.sessions.update(id, |s| s.record_run(outcome));
    with_session_cookie(Redirect::to("/"), id, created)
}

fn download(content_type: &str, filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_csv(State(st): State<DashboardState>, headers: HeaderMap) -> Response {
    let (id, created) = st.session(&headers);
    let resp = match st.sessions.snapshot(id).last_result {
        None => (StatusCode::NOT_FOUND, "no simulation result yet").into_response(),
        Some(r) => match export::to_csv(&r) {
            Ok(body) => download("text/csv; charset=utf-8", CSV_FILENAME, body),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
    };
    with_session_cookie(resp, id, created)
}

async fn export_json(State(st): State<DashboardState>, headers: HeaderMap) -> Response {
    let (id, created) = st.session(&headers);
    let resp = match st.sessions.snapshot(id).last_result {
        None => (StatusCode::NOT_FOUND, "no simulation result yet").into_response(),
        Some(r) => match export::to_json(&r) {
            Ok(body) => download("application/json", JSON_FILENAME, body),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
    };
    with_session_cookie(resp, id, created)
}

async fn api_health(State(st): State<DashboardState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "backend_mode": st.settings.backend_mode,
        "backend_base_url": st.client.base_url(),
        "sessions": st.sessions.len(),
    }))
}

async fn api_session(State(st): State<DashboardState>, headers: HeaderMap) -> Response {
    let (id, created) = st.session(&headers);
    let s = st.sessions.snapshot(id);
    let body = Json(serde_json::json!({
        "session": id.to_string(),
        "screen": s.screen,
        "actions": s.screen.actions().iter().map(|a| a.slug()).collect::<Vec<_>>(),
        "last_result": s.last_result,
    }));
    with_session_cookie(body, id, created)
}

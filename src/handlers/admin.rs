use crate::{
    auth::{self, AuthUser, SESSION_COOKIE},
    config::MAX_SESSION_HOURS,
    db,
    models::{is_valid_slug, normalize_phone, SlugDetail, SlugWithStats},
    AppState,
};
use askama::Template;
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::Deserialize;
use std::sync::Arc;

const DASHBOARD: &str = "/admin/dashboard";

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    slugs: Vec<SlugWithStats>,
    base_url: String,
    default_delay_ms: i64,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

#[derive(Template)]
#[template(path = "slug.html")]
struct SlugTemplate {
    detail: SlugDetail,
    public_url: String,
    image_url: String,
    /// Human-readable description of where the rotation stands.
    cursor_label: String,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

// ── Form types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginForm {
    password: String,
}

#[derive(Deserialize)]
pub struct CreateSlugForm {
    slug: Option<String>,
    title: String,
    message: Option<String>,
    image_url: Option<String>,
    delay_ms: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateSlugForm {
    title: String,
    message: Option<String>,
    image_url: Option<String>,
    delay_ms: Option<String>,
}

#[derive(Deserialize)]
pub struct AddTargetForm {
    phone: String,
    position: Option<String>,
}

#[derive(Deserialize)]
pub struct PositionForm {
    position: String,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /
/// Visitors without a slug are sent to the configured ROOT_REDIRECT_URL.
pub async fn index(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&state.config.root_redirect_url)
}

/// GET /admin
pub async fn admin_index() -> Redirect {
    Redirect::to(DASHBOARD)
}

// ── Login / Logout ─────────────────────────────────────────────────────────

/// GET /admin/login
pub async fn login_page(jar: CookieJar, State(state): State<Arc<AppState>>) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.is_valid(cookie.value()).await {
            return Redirect::to(DASHBOARD).into_response();
        }
    }
    LoginTemplate { error: None }.into_response()
}

/// POST /admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !auth::verify_password(&form.password, &state.admin_password_hash) {
        tracing::warn!("Rejected admin login attempt");
        // Slow down brute-force attempts.
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        return (
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                error: Some("Incorrect password.".into()),
            },
        )
            .into_response();
    }

    let token = state.sessions.create().await;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(
            state.config.session_duration_hours.min(MAX_SESSION_HOURS) as i64,
        ))
        .build();

    (jar.add(cookie), Redirect::to(DASHBOARD)).into_response()
}

/// GET /admin/logout
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await;
    }

    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();

    (jar.add(removal), Redirect::to("/admin/login")).into_response()
}

// ── Dashboard ──────────────────────────────────────────────────────────────

/// GET /admin/dashboard
pub async fn dashboard(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    let (jar, flash_success, flash_error) = take_flash(jar);

    let slugs = match db::get_all_slugs_with_stats(&state.db).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to load slugs: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load slugs").into_response();
        }
    };

    let tmpl = DashboardTemplate {
        slugs,
        base_url: state.config.base_url.clone(),
        default_delay_ms: state.config.default_delay_ms,
        flash_success,
        flash_error,
    };

    (jar, tmpl).into_response()
}

// ── Slugs ──────────────────────────────────────────────────────────────────

/// POST /admin/slugs
pub async fn create_slug(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CreateSlugForm>,
) -> Response {
    let title = form.title.trim();
    if title.is_empty() {
        return set_flash_and_redirect(jar, None, Some("Title must not be empty."), DASHBOARD);
    }

    let delay_ms = match parse_delay(form.delay_ms.as_deref(), state.config.default_delay_ms) {
        Some(ms) => ms,
        None => {
            return set_flash_and_redirect(
                jar,
                None,
                Some("Delay must be a non-negative number of milliseconds."),
                DASHBOARD,
            );
        }
    };

    let code = match non_blank(form.slug.as_deref()) {
        Some(code) => {
            if !is_valid_slug(code) {
                return set_flash_and_redirect(
                    jar,
                    None,
                    Some("Slug may only contain letters, numbers, and hyphens, and must not be a reserved path."),
                    DASHBOARD,
                );
            }
            code.to_owned()
        }
        None => generate_unique_code(&state.db).await,
    };

    let message = form.message.as_deref().map(str::trim).unwrap_or_default();
    let image_url = non_blank(form.image_url.as_deref());

    let new = db::NewSlug {
        slug: &code,
        title,
        message,
        image_url,
        delay_ms,
        is_active: true,
    };

    match db::create_slug(&state.db, &new).await {
        Ok(slug) => {
            tracing::info!("Slug '{}' created", slug.slug);
            set_flash_and_redirect(
                jar,
                Some(&format!(
                    "Slug created: {}/{}. Add numbers to start the rotation.",
                    state.config.base_url, slug.slug
                )),
                None,
                &slug_path(slug.id),
            )
        }
        Err(e) => {
            tracing::error!("Failed to create slug: {:?}", e);
            let msg = if e.to_string().contains("UNIQUE") {
                "That slug is already taken. Try another."
            } else {
                "Failed to create slug."
            };
            set_flash_and_redirect(jar, None, Some(msg), DASHBOARD)
        }
    }
}

/// GET /admin/slugs/:id
pub async fn slug_detail(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    let (jar, flash_success, flash_error) = take_flash(jar);

    let detail = match db::get_slug_detail(&state.db, id).await {
        Ok(Some(d)) => d,
        Ok(None) => return (StatusCode::NOT_FOUND, "Slug not found.").into_response(),
        Err(e) => {
            tracing::error!("Failed to load slug {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load slug.").into_response();
        }
    };

    let active = detail.targets.iter().filter(|t| t.target.is_active).count();
    let cursor_label = match detail.cursor {
        None => "Not started. The first click goes to the first active number.".to_owned(),
        Some(_) if active == 0 => "No active numbers.".to_owned(),
        Some(c) if c < 0 || c as usize >= active => {
            "Next click restarts at the first active number.".to_owned()
        }
        Some(c) => format!("Next click goes to active number #{} of {}.", c + 1, active),
    };

    let tmpl = SlugTemplate {
        public_url: format!("{}/{}", state.config.base_url, detail.slug.slug),
        image_url: detail.slug.image_url.clone().unwrap_or_default(),
        cursor_label,
        detail,
        flash_success,
        flash_error,
    };

    (jar, tmpl).into_response()
}

/// POST /admin/slugs/:id
pub async fn update_slug(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<UpdateSlugForm>,
) -> Response {
    let back = slug_path(id);

    let title = form.title.trim();
    if title.is_empty() {
        return set_flash_and_redirect(jar, None, Some("Title must not be empty."), &back);
    }
    let Some(delay_ms) = parse_delay(form.delay_ms.as_deref(), state.config.default_delay_ms)
    else {
        return set_flash_and_redirect(
            jar,
            None,
            Some("Delay must be a non-negative number of milliseconds."),
            &back,
        );
    };

    let message = form.message.as_deref().map(str::trim).unwrap_or_default();
    let image_url = non_blank(form.image_url.as_deref());

    match db::update_slug(&state.db, id, title, message, image_url, delay_ms).await {
        Ok(true) => set_flash_and_redirect(jar, Some("Settings saved."), None, &back),
        Ok(false) => set_flash_and_redirect(jar, None, Some("Slug not found."), DASHBOARD),
        Err(e) => {
            tracing::error!("Failed to update slug {}: {:?}", id, e);
            set_flash_and_redirect(jar, None, Some("Failed to save settings."), &back)
        }
    }
}

/// POST /admin/slugs/:id/toggle
pub async fn toggle_slug(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    match db::toggle_slug(&state.db, id).await {
        Ok(true) => set_flash_and_redirect(jar, Some("Slug status updated."), None, DASHBOARD),
        Ok(false) => set_flash_and_redirect(jar, None, Some("Slug not found."), DASHBOARD),
        Err(e) => {
            tracing::error!("Failed to toggle slug {}: {:?}", id, e);
            set_flash_and_redirect(jar, None, Some("Failed to update slug."), DASHBOARD)
        }
    }
}

/// POST /admin/slugs/:id/delete
///
/// Removes the slug together with its numbers, cursor and click history.
pub async fn delete_slug(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    let slug = match db::get_slug_by_id(&state.db, id).await {
        Ok(Some(s)) => s,
        Ok(None) => return set_flash_and_redirect(jar, None, Some("Slug not found."), DASHBOARD),
        Err(e) => {
            tracing::error!("Failed to fetch slug {}: {:?}", id, e);
            return set_flash_and_redirect(
                jar,
                None,
                Some("Database error while looking up slug."),
                DASHBOARD,
            );
        }
    };

    match db::delete_slug(&state.db, id).await {
        Ok(true) => {
            tracing::info!("Slug '{}' deleted", slug.slug);
            set_flash_and_redirect(
                jar,
                Some(&format!("Slug '{}' deleted.", slug.slug)),
                None,
                DASHBOARD,
            )
        }
        Ok(false) => set_flash_and_redirect(jar, None, Some("Slug not found."), DASHBOARD),
        Err(e) => {
            tracing::error!("Failed to delete slug {}: {:?}", id, e);
            set_flash_and_redirect(jar, None, Some("Failed to delete slug."), DASHBOARD)
        }
    }
}

// ── Targets ────────────────────────────────────────────────────────────────

/// POST /admin/slugs/:id/targets
pub async fn add_target(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(slug_id): Path<i64>,
    Form(form): Form<AddTargetForm>,
) -> Response {
    let back = slug_path(slug_id);

    let Some(phone) = normalize_phone(&form.phone) else {
        return set_flash_and_redirect(
            jar,
            None,
            Some("Phone must be 8 to 15 digits, including the country code."),
            &back,
        );
    };

    let position = match non_blank(form.position.as_deref()) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(p) => Some(p),
            Err(_) => {
                return set_flash_and_redirect(
                    jar,
                    None,
                    Some("Position must be a whole number."),
                    &back,
                );
            }
        },
        None => None,
    };

    match db::get_slug_by_id(&state.db, slug_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return set_flash_and_redirect(jar, None, Some("Slug not found."), DASHBOARD),
        Err(e) => {
            tracing::error!("Failed to fetch slug {}: {:?}", slug_id, e);
            return set_flash_and_redirect(jar, None, Some("Failed to add number."), &back);
        }
    }

    match db::add_target(&state.db, slug_id, &phone, position).await {
        Ok(target) => set_flash_and_redirect(
            jar,
            Some(&format!(
                "Number {} added at position {}.",
                target.phone, target.position
            )),
            None,
            &back,
        ),
        Err(e) => {
            tracing::error!("Failed to add target to slug {}: {:?}", slug_id, e);
            set_flash_and_redirect(jar, None, Some("Failed to add number."), &back)
        }
    }
}

/// POST /admin/targets/:id/toggle
pub async fn toggle_target(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    let result = match load_target(&state, id).await {
        Ok(slug_id) => (slug_id, db::toggle_target(&state.db, id).await),
        Err(redirect) => return redirect(jar),
    };
    finish_target_update(jar, id, result, "Number status updated.")
}

/// POST /admin/targets/:id/position
pub async fn set_target_position(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<PositionForm>,
) -> Response {
    let slug_id = match load_target(&state, id).await {
        Ok(slug_id) => slug_id,
        Err(redirect) => return redirect(jar),
    };
    let Ok(position) = form.position.trim().parse::<i64>() else {
        return set_flash_and_redirect(
            jar,
            None,
            Some("Position must be a whole number."),
            &slug_path(slug_id),
        );
    };
    let result = db::set_target_position(&state.db, id, position).await;
    finish_target_update(jar, id, (slug_id, result), "Position updated.")
}

/// POST /admin/targets/:id/delete
pub async fn delete_target(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    let result = match load_target(&state, id).await {
        Ok(slug_id) => (slug_id, db::delete_target(&state.db, id).await),
        Err(redirect) => return redirect(jar),
    };
    finish_target_update(jar, id, result, "Number removed.")
}

// ── Private helpers ────────────────────────────────────────────────────────

type FlashRedirect = fn(CookieJar) -> Response;

/// Resolve the slug a target belongs to, or the redirect to send instead.
async fn load_target(state: &AppState, id: i64) -> Result<i64, FlashRedirect> {
    match db::get_target_by_id(&state.db, id).await {
        Ok(Some(t)) => Ok(t.slug_id),
        Ok(None) => Err(|jar| {
            set_flash_and_redirect(jar, None, Some("Number not found."), DASHBOARD)
        }),
        Err(e) => {
            tracing::error!("Failed to fetch target {}: {:?}", id, e);
            Err(|jar| set_flash_and_redirect(jar, None, Some("Database error."), DASHBOARD))
        }
    }
}

/// Redirect back to the target's slug page with the outcome of an update.
fn finish_target_update(
    jar: CookieJar,
    id: i64,
    (slug_id, result): (i64, Result<bool, sqlx::Error>),
    success: &str,
) -> Response {
    let back = slug_path(slug_id);
    match result {
        Ok(true) => set_flash_and_redirect(jar, Some(success), None, &back),
        Ok(false) => set_flash_and_redirect(jar, None, Some("Number not found."), &back),
        Err(e) => {
            tracing::error!("Failed to update target {}: {:?}", id, e);
            set_flash_and_redirect(jar, None, Some("Failed to update number."), &back)
        }
    }
}

fn slug_path(id: i64) -> String {
    format!("/admin/slugs/{id}")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Blank means "use the default"; anything else must be a non-negative integer.
fn parse_delay(raw: Option<&str>, default: i64) -> Option<i64> {
    match non_blank(raw) {
        None => Some(default),
        Some(s) => s.parse::<i64>().ok().filter(|ms| *ms >= 0),
    }
}

/// Read the flash cookies and queue their removal.
fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>, Option<String>) {
    let success = jar.get("flash_success").map(|c| c.value().to_owned());
    let error = jar.get("flash_error").map(|c| c.value().to_owned());

    let jar = jar
        .remove(Cookie::build(("flash_success", "")).path("/").build())
        .remove(Cookie::build(("flash_error", "")).path("/").build());

    (jar, success, error)
}

/// Set a flash cookie and redirect to the given path.
fn set_flash_and_redirect(
    jar: CookieJar,
    success: Option<&str>,
    error: Option<&str>,
    destination: &str,
) -> Response {
    let mut jar = jar;

    for (name, msg) in [("flash_success", success), ("flash_error", error)] {
        if let Some(msg) = msg {
            let c = Cookie::build((name, msg.to_owned()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::seconds(30))
                .build();
            jar = jar.add(c);
        }
    }

    (jar, Redirect::to(destination)).into_response()
}

/// Generate a random 7-character slug that doesn't already exist. Tries up
/// to 10 times before falling back to a longer code (the UNIQUE constraint
/// is the real guard).
async fn generate_unique_code(pool: &sqlx::SqlitePool) -> String {
    for _ in 0..10 {
        let code = random_code(7);
        if let Ok(None) = db::get_slug_by_code(pool, &code).await {
            return code;
        }
    }
    random_code(9)
}

fn random_code(len: usize) -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app,
        testing::{memory_pool, seed_slug, test_state, ADMIN_PASSWORD},
    };
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use tower::ServiceExt;

    async fn send(router: Router, request: Request<Body>) -> Response {
        router.oneshot(request).await.unwrap()
    }

    fn form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Log in and return the `session_id=...` cookie pair.
    async fn login_cookie(state: Arc<AppState>) -> String {
        let body = format!("password={}", ADMIN_PASSWORD.replace(' ', "+"));
        let response = send(app(state), form("/admin/login", None, &body)).await;
        assert_eq!(location(&response), DASHBOARD);

        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE))
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_owned()
    }

    #[test]
    fn delay_parsing() {
        assert_eq!(parse_delay(None, 1500), Some(1500));
        assert_eq!(parse_delay(Some("  "), 1500), Some(1500));
        assert_eq!(parse_delay(Some("0"), 1500), Some(0));
        assert_eq!(parse_delay(Some("-1"), 1500), None);
        assert_eq!(parse_delay(Some("soon"), 1500), None);
    }

    #[test]
    fn random_codes_are_valid_slugs() {
        let code = random_code(7);
        assert_eq!(code.len(), 7);
        assert!(is_valid_slug(&code));
    }

    #[tokio::test]
    async fn admin_pages_require_a_session() {
        let state = test_state(memory_pool().await).await;

        let response = send(
            app(state.clone()),
            Request::builder()
                .uri("/admin/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(location(&response), "/admin/login");

        let response = send(app(state), form("/admin/slugs", None, "title=Sneaky")).await;
        assert_eq!(location(&response), "/admin/login");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let state = test_state(memory_pool().await).await;
        let response = send(app(state), form("/admin/login", None, "password=nope")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn oversized_session_length_is_capped_on_the_cookie() {
        let pool = memory_pool().await;
        let mut config = crate::testing::test_config();
        config.session_duration_hours = u64::MAX;
        let state = Arc::new(AppState {
            engine: crate::dispatch::DispatchEngine::new(crate::store::SqliteStore::new(
                pool.clone(),
            )),
            admin_password_hash: auth::hash_password(ADMIN_PASSWORD).unwrap(),
            sessions: auth::SessionStore::new(config.session_duration_hours),
            db: pool,
            config,
        });

        let body = format!("password={}", ADMIN_PASSWORD.replace(' ', "+"));
        let response = send(app(state), form("/admin/login", None, &body)).await;
        assert_eq!(location(&response), DASHBOARD);

        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE))
            .unwrap()
            .to_owned();
        let max_age = format!("Max-Age={}", MAX_SESSION_HOURS * 3600);
        assert!(cookie.contains(&max_age), "{cookie}");
    }

    #[tokio::test]
    async fn admin_can_build_a_rotation() {
        let pool = memory_pool().await;
        let state = test_state(pool.clone()).await;
        let cookie = login_cookie(state.clone()).await;

        let response = send(
            app(state.clone()),
            form(
                "/admin/slugs",
                Some(&cookie),
                "slug=vendas&title=Vendas&message=Oi&image_url=&delay_ms=",
            ),
        )
        .await;
        let slug = db::get_slug_by_code(&pool, "vendas").await.unwrap().unwrap();
        assert_eq!(location(&response), slug_path(slug.id));
        assert_eq!(slug.delay_ms, 1500);
        assert_eq!(slug.image_url, None);

        for (phone, position) in [("%2B55+11+99999-0002", "1"), ("5511999990001", "0")] {
            send(
                app(state.clone()),
                form(
                    &format!("/admin/slugs/{}/targets", slug.id),
                    Some(&cookie),
                    &format!("phone={phone}&position={position}"),
                ),
            )
            .await;
        }
        assert_eq!(
            db::active_targets_in_order(&pool, slug.id).await.unwrap(),
            vec!["5511999990001", "5511999990002"]
        );

        let first = db::get_targets(&pool, slug.id).await.unwrap()[0].id;
        send(
            app(state.clone()),
            form(&format!("/admin/targets/{first}/toggle"), Some(&cookie), ""),
        )
        .await;
        assert_eq!(
            db::active_targets_in_order(&pool, slug.id).await.unwrap(),
            vec!["5511999990002"]
        );

        let response = send(
            app(state),
            Request::builder()
                .uri(slug_path(slug.id))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("5511999990002"));
        assert!(html.contains("Not started"));
    }

    #[tokio::test]
    async fn invalid_input_is_refused() {
        let pool = memory_pool().await;
        let slug = seed_slug(&pool, "promo", &[]).await;
        let state = test_state(pool.clone()).await;
        let cookie = login_cookie(state.clone()).await;

        send(
            app(state.clone()),
            form("/admin/slugs", Some(&cookie), "slug=admin&title=Nope"),
        )
        .await;
        assert!(db::get_slug_by_code(&pool, "admin").await.unwrap().is_none());

        send(
            app(state.clone()),
            form("/admin/slugs", Some(&cookie), "slug=promo&title=Dup"),
        )
        .await;
        assert_eq!(db::get_all_slugs_with_stats(&pool).await.unwrap().len(), 1);

        send(
            app(state),
            form(
                &format!("/admin/slugs/{}/targets", slug.id),
                Some(&cookie),
                "phone=call-me",
            ),
        )
        .await;
        assert!(db::get_targets(&pool, slug.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_slug_removes_its_rotation() {
        let pool = memory_pool().await;
        let slug = seed_slug(&pool, "promo", &["5511999990001"]).await;
        db::set_cursor(&pool, slug.id, 0).await.unwrap();
        let state = test_state(pool.clone()).await;
        let cookie = login_cookie(state.clone()).await;

        let response = send(
            app(state),
            form(&format!("/admin/slugs/{}/delete", slug.id), Some(&cookie), ""),
        )
        .await;
        assert_eq!(location(&response), DASHBOARD);
        assert!(db::get_slug_by_id(&pool, slug.id).await.unwrap().is_none());
        assert_eq!(db::get_cursor(&pool, slug.id).await.unwrap(), None);
    }
}

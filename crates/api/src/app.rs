use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::repositories::{
    Clock, ClubStore, InMemoryStore, InvitationStore, MagicLinkStore, Mailer, SessionStore,
    StoreHealth, UserStore,
};
use domain::services::{ClubService, InvitationService, MagicLinkService, SessionService};
use persistence::db::PoolHealth;
use persistence::repositories::{
    ClubRepository, InvitationRepository, MagicLinkRepository, SessionRepository, UserRepository,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
    trace_id::route_path, SignInRateLimiter,
};
use crate::routes::{auth, clubs, health, invitations};
use crate::services::cookies::SessionCookie;

/// One implementation per store contract.
#[derive(Clone)]
pub struct Stores {
    pub magic_links: Arc<dyn MagicLinkStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub clubs: Arc<dyn ClubStore>,
    pub users: Arc<dyn UserStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            magic_links: Arc::new(MagicLinkRepository::new(pool.clone())),
            invitations: Arc::new(InvitationRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            clubs: Arc::new(ClubRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            health: Arc::new(PoolHealth::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            magic_links: store.clone(),
            invitations: store.clone(),
            sessions: store.clone(),
            clubs: store.clone(),
            users: store.clone(),
            health: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub magic_links: Arc<MagicLinkService>,
    pub invitations: Arc<InvitationService>,
    pub sessions: Arc<SessionService>,
    pub clubs: Arc<ClubService>,
    pub users: Arc<dyn UserStore>,
    pub health: Arc<dyn StoreHealth>,
    pub sign_in_limiter: Arc<SignInRateLimiter>,
    pub session_cookie: SessionCookie,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session_ttl = chrono::Duration::days(config.auth.session_ttl_days);

        let magic_links = MagicLinkService::new(
            stores.magic_links,
            mailer,
            clock.clone(),
            config.magic_link_settings(),
        );
        let invitations =
            InvitationService::new(stores.invitations, clock.clone(), config.invitation_settings());
        let sessions = SessionService::new(stores.sessions, clock.clone(), session_ttl);
        let clubs = ClubService::new(stores.clubs, clock.clone());

        let sign_in_limiter = SignInRateLimiter::new(
            config.security.sign_in_attempts,
            config.security.sign_in_window_secs,
        );
        let session_cookie =
            SessionCookie::new(config.auth.secure_cookies, session_ttl.num_seconds());

        Self {
            config: Arc::new(config),
            magic_links: Arc::new(magic_links),
            invitations: Arc::new(invitations),
            sessions: Arc::new(sessions),
            clubs: Arc::new(clubs),
            users: stores.users,
            health: stores.health,
            sign_in_limiter: Arc::new(sign_in_limiter),
            session_cookie,
            clock,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Session-protected handlers take the CurrentUser extractor.
    let auth_routes = Router::new()
        .route("/api/v1/auth/magic-link", post(auth::request_magic_link))
        .route("/api/v1/auth/sign-out", post(auth::sign_out))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/auth/verify", get(auth::verify));

    let club_routes = Router::new()
        .route("/api/v1/clubs", post(clubs::create_club).get(clubs::list_clubs))
        .route("/api/v1/clubs/:club_id", get(clubs::get_club))
        .route(
            "/api/v1/clubs/:club_id/invitations",
            post(invitations::create_invitation).get(invitations::list_invitations),
        );

    // `:invitation` is the token for validate and the id for cancel.
    let invitation_routes = Router::new()
        .route("/api/v1/invitations/accept", post(invitations::accept_invitation))
        .route(
            "/api/v1/invitations/:invitation/validate",
            get(invitations::validate_invitation),
        )
        .route(
            "/api/v1/invitations/:invitation",
            delete(invitations::cancel_invitation),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(club_routes)
        .merge(invitation_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!("http", method = %req.method(), path = %route_path(req))
            }),
        )
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}

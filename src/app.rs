use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::TokenSigner;
use crate::cache::{CacheStore, SessionCache};
use crate::config::AppConfig;
use crate::database::models::{blog, user};
use crate::database::{DocumentStore, IdGenerator, Repository};
use crate::handlers::{protected, public};
use crate::middleware::{optional_session, require_session};
use crate::services::{BlogService, ServiceResult, UploadService, UserService};
use crate::storage::{LocalObjectStorage, ObjectStorage};

/// Upper bound for request bodies, uploads included
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub blogs: Arc<BlogService>,
    pub uploads: Arc<UploadService>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Wire repositories, session cache, signer and storage from config, creating collections as needed
    pub async fn build(config: &AppConfig, store: Arc<dyn DocumentStore>, cache: Arc<dyn CacheStore>) -> ServiceResult<Self> {
        let ids = IdGenerator::new(config.ids.min_digits, config.ids.max_digits, config.ids.max_attempts);
        let options = config.filter_options();

        let users = Repository::new(store.clone(), user::COLLECTION, user::ID_FIELD, ids.clone(), options.clone())
            .with_unique(user::USERNAME_FIELD);
        let blogs = Repository::new(store.clone(), blog::COLLECTION, blog::ID_FIELD, ids, options);
        users.init().await?;
        blogs.init().await?;

        let sessions = SessionCache::new(
            cache,
            Duration::from_secs(config.session.max_age_secs),
            Duration::from_secs(config.session.remember_me_secs),
        );
        let signer = TokenSigner::new(config.security.jwt_secret.clone(), config.security.jwt_expiry_hours)?;
        let storage: Arc<dyn ObjectStorage> = Arc::new(LocalObjectStorage::new(
            config.storage.root.clone(),
            config.public_files_url(),
        ));

        let user_service = Arc::new(UserService::new(users, sessions, signer, config.storage.default_avatar.clone()));
        let uploads = UploadService::new(user_service.clone(), storage.clone(), config.storage.default_avatar.clone());

        info!(
            "Application state ready ({} store, sessions live {}s)",
            store.backend(),
            config.session.max_age_secs
        );

        Ok(Self {
            users: user_service,
            blogs: Arc::new(BlogService::new(blogs, storage)),
            uploads: Arc::new(uploads),
            store,
        })
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let mut app = Router::new()
        // Public
        .route("/", get(public::home::root))
        .route("/health", get(public::home::health))
        .merge(public_routes(state.clone()))
        .merge(protected_routes(state.clone()))
        .nest_service("/public", ServeDir::new(&config.storage.root))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security.cors_origins));
    }

    app.with_state(state)
}

fn public_routes(state: AppState) -> Router<AppState> {
    use public::{blog, user};

    let listing = Router::new()
        .route("/blog/api/list", post(blog::blog_list))
        .route_layer(from_fn_with_state(state, optional_session));

    Router::new()
        .route("/user/api/login", post(user::login))
        .route("/user/api/register", post(user::register))
        .route("/blog/api/list/:user_id", post(blog::somebody_blog_list))
        .route("/blog/api/info", get(blog::blog_info))
        .merge(listing)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{blog, upload, user};

    Router::new()
        .route("/user/api/info", post(user::user_info))
        .route("/user/api/logOut", get(user::logout))
        .route("/user/api/current/update", put(user::update_current))
        .route("/user/api/current/update/password", put(user::update_current_password))
        .route("/blog/api/add", post(blog::add_blog))
        .route("/blog/api/update", put(blog::update_blog))
        .route("/blog/api/delete", post(blog::delete_blog))
        .route("/upload/api/avatar", post(upload::change_avatar))
        .route("/upload/api/images", post(upload::upload_images))
        .route_layer(from_fn_with_state(state, require_session))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub mod alerts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod plugins;
pub mod server;
pub mod users;
mod utils;

pub use config::Config;
pub use error::PanelError;

use crate::alerts::AlertService;
use crate::auth::{TokenSigner, generate_secret};
use crate::jobs::JobDeps;
use crate::metrics::MetricsHandle;
use crate::plugins::{PluginManager, PluginRegistry};
use crate::server::PanelState;
use crate::users::UserService;
use tracing::{info, warn};

/// Opens the database, starts the metrics actor and builds every service.
///
/// Also creates the bootstrap admin on an empty database and, when `plugins.autoload` is set,
/// loads the plugin directory.
pub async fn assemble(cfg: &Config) -> Result<PanelState, PanelError> {
    let db = db::spawn(&cfg.basic.database_url).await?;
    let metrics = MetricsHandle::spawn(&cfg.monitor).await?;

    let secret = if cfg.auth.jwt_secret.is_empty() {
        warn!("auth.jwt_secret is empty; tokens will not survive a restart");
        generate_secret()
    } else {
        cfg.auth.jwt_secret.clone()
    };
    let signer = TokenSigner::new(&secret, cfg.auth.token_ttl_secs);

    let plugins = PluginManager::new(
        cfg.plugins.dir.clone(),
        PluginRegistry::with_builtins(),
        db.clone(),
    );
    let users = UserService::new(db.clone(), signer, &cfg.auth, plugins.clone());
    let alerts = AlertService::new(db.clone(), &cfg.alerts, plugins.clone())?;

    if users.bootstrap_admin().await? {
        info!("empty user table, bootstrap admin created");
    }

    plugins.ensure_dir().await?;
    if cfg.plugins.autoload {
        plugins.load_all().await?;
    }

    Ok(PanelState::new(
        db,
        metrics,
        users,
        alerts,
        plugins,
        cfg.monitor.clone(),
    ))
}

impl From<&PanelState> for JobDeps {
    fn from(state: &PanelState) -> Self {
        JobDeps {
            db: state.db.clone(),
            metrics: state.metrics.clone(),
            alerts: state.alerts.clone(),
            users: state.users.clone(),
            plugins: state.plugins.clone(),
        }
    }
}

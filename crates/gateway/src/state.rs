use std::sync::Arc;

use vm_domain::catalog::PromptCatalog;
use vm_domain::config::Config;

use crate::runtime::{CallAcceptor, SessionSupervisor};

/// Shared gateway state passed to every handler via axum `State`.
///
/// Everything here is immutable after startup or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<PromptCatalog>,
    pub acceptor: Arc<CallAcceptor>,
    pub supervisor: SessionSupervisor,
}

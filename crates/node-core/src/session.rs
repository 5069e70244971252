//! Process-wide manager session
//!
//! Menu callbacks only receive a node path, so the manager they act on lives
//! here. [`init`] creates it once per process; [`shutdown`] drops it.

use std::sync::{Arc, Mutex};

use crate::config::ManagerConfig;
use crate::host::Host;
use crate::manager::NodeManager;
use crate::tools::ArchiveTool;
use crate::{Error, Result};

/// Shared handle to the session manager.
pub type ManagerHandle = Arc<Mutex<NodeManager>>;

static SESSION: Mutex<Option<ManagerHandle>> = Mutex::new(None);

/// Create the session manager, or return the existing one.
///
/// Arguments are ignored when a session already exists.
pub fn init(
    config: ManagerConfig,
    host: Arc<dyn Host>,
    archive: Arc<dyn ArchiveTool>,
) -> Result<ManagerHandle> {
    let mut session = SESSION.lock().map_err(|_| Error::SessionPoisoned)?;
    if let Some(handle) = session.as_ref() {
        tracing::debug!("Node Manager session already initialised");
        return Ok(Arc::clone(handle));
    }

    let handle = Arc::new(Mutex::new(NodeManager::new(config, host, archive)?));
    *session = Some(Arc::clone(&handle));
    Ok(handle)
}

/// The session manager; fails before [`init`].
pub fn handle() -> Result<ManagerHandle> {
    SESSION
        .lock()
        .map_err(|_| Error::SessionPoisoned)?
        .clone()
        .ok_or(Error::NotInitialised)
}

pub fn is_initialised() -> bool {
    SESSION.lock().map(|s| s.is_some()).unwrap_or(false)
}

/// Run `f` with exclusive access to the session manager.
pub fn with_manager<T>(f: impl FnOnce(&mut NodeManager) -> Result<T>) -> Result<T> {
    let handle = handle()?;
    let mut manager = handle.lock().map_err(|_| Error::SessionPoisoned)?;
    f(&mut manager)
}

/// Drop the session. The manager's temp directory goes with the last handle.
pub fn shutdown() -> Result<()> {
    let previous = SESSION.lock().map_err(|_| Error::SessionPoisoned)?.take();
    if previous.is_some() {
        tracing::info!("Node Manager session shut down");
    }
    Ok(())
}

//! Background initialisation
//!
//! Discovery and loading can take a while (clones, archive tool runs), so a
//! host may run them on a single worker thread and keep its UI responsive.
//! The session lock is held for the whole load; menu callbacks issued in the
//! meantime wait for it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::ManagerConfig;
use crate::host::Host;
use crate::session::{self, ManagerHandle};
use crate::tools::ArchiveTool;
use crate::{Error, Result};

/// Name of the worker thread.
pub const THREAD_NAME: &str = "node-manager-init";

enum TaskState {
    Ready(Result<ManagerHandle>),
    Running(JoinHandle<Result<ManagerHandle>>),
}

/// A running or finished initialisation.
pub struct InitTask {
    state: TaskState,
}

impl InitTask {
    fn ready(result: Result<ManagerHandle>) -> Self {
        Self {
            state: TaskState::Ready(result),
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Ready(_) => true,
            TaskState::Running(handle) => handle.is_finished(),
        }
    }

    /// Wait for the initialisation to finish.
    pub fn join(self) -> Result<ManagerHandle> {
        match self.state {
            TaskState::Ready(result) => result,
            TaskState::Running(handle) => handle.join().map_err(|_| Error::WorkerPanicked)?,
        }
    }
}

impl std::fmt::Debug for InitTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitTask")
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn load(handle: ManagerHandle) -> Result<ManagerHandle> {
    {
        let mut manager = handle.lock().map_err(|_| Error::SessionPoisoned)?;
        if manager.is_loaded() {
            tracing::debug!("Repositories already loaded");
        } else {
            manager.load()?;
        }
    }
    Ok(handle)
}

/// Load the manager behind `handle` on the worker thread.
pub fn spawn(handle: ManagerHandle) -> Result<InitTask> {
    let worker = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            tracing::info!("Loading repositories in the background");
            load(handle)
        })?;
    Ok(InitTask {
        state: TaskState::Running(worker),
    })
}

/// Initialise the session and load its repositories.
///
/// With `background` the load runs on the worker thread; otherwise it runs
/// before returning and the task is already finished.
pub fn initialise(
    config: ManagerConfig,
    host: Arc<dyn Host>,
    archive: Arc<dyn ArchiveTool>,
    background: bool,
) -> Result<InitTask> {
    let handle = session::init(config, host, archive)?;
    if background {
        spawn(handle)
    } else {
        Ok(InitTask::ready(load(handle)))
    }
}

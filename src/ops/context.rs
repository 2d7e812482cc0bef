//! Shared download context.
//!
//! Groups the per-invocation state every worker task needs. One context is
//! built per requested module and dropped when its download completes, so
//! concurrent invocations stay isolated.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::buildlist::BuildList;
use crate::registry::ProxyClient;
use crate::sumdb;
use crate::task::TaskQueue;
use crate::types::Module;

/// Outcome of one module's artifact downloads, sent to the progress reader.
#[derive(Debug)]
pub struct Progress {
    pub module: Module,
    pub error: Option<String>,
}

/// State shared by the traversal and download tasks of one invocation.
pub struct Context {
    pub proxy: ProxyClient,
    pub out_dir: PathBuf,
    pub build_list: BuildList,
    pub queue: Arc<TaskQueue>,
    pub sumdb: sumdb::Client,
    pub progress: mpsc::UnboundedSender<Progress>,
}

impl Context {
    pub fn new(
        proxy: ProxyClient,
        out_dir: PathBuf,
        sumdb: sumdb::Client,
        progress: mpsc::UnboundedSender<Progress>,
    ) -> Arc<Self> {
        Arc::new(Self {
            proxy,
            out_dir,
            build_list: BuildList::new(),
            queue: TaskQueue::new(0),
            sumdb,
            progress,
        })
    }
}

//! Multithreaded runtime builder.

use std::io::Result;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder as RtBuilder, Runtime};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum RuntimeConfig {
    SingleThreaded,
    MultiThreaded {
        #[serde(default)]
        worker_threads: usize,
    },
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig::MultiThreaded { worker_threads: 0 }
    }
}

pub fn build_runtime(cfg: RuntimeConfig) -> Result<Runtime> {
    let mut builder = match cfg {
        RuntimeConfig::SingleThreaded => RtBuilder::new_current_thread(),
        RuntimeConfig::MultiThreaded { worker_threads } => {
            let mut builder = RtBuilder::new_multi_thread();
            if worker_threads > 0 {
                builder.worker_threads(worker_threads);
            }
            builder
        }
    };

    builder.enable_all().build()
}

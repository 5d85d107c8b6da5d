//! Bridge server backed by a logging in-memory pool.
//!
//! This example demonstrates:
//! - Loading `BridgeConfig` from `config/bridge.toml` and the environment
//! - Serving the standard pool handlers on a TCP port
//! - Graceful shutdown on Ctrl-C
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=judge_bridge=debug cargo run --example bridge_server
//! ```

use std::sync::{Arc, Mutex};

use judge_bridge::handler::pool_handlers;
use judge_bridge::protocol::SubmissionId;
use judge_bridge::{BridgeConfig, JudgeJob, Priority, Server, WorkerPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pool that queues jobs in memory and never runs them.
#[derive(Default)]
struct QueueOnlyPool {
    queue: Mutex<Vec<JudgeJob>>,
}

impl WorkerPool for QueueOnlyPool {
    fn check_priority(&self, _priority: Priority) -> bool {
        true
    }

    fn judge(&self, jobs: Vec<JudgeJob>) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        for job in &jobs {
            tracing::info!(id = job.id, problem = %job.problem, priority = %job.priority, "queued");
        }
        queue.extend(jobs);
    }

    fn abort(&self, submission_id: SubmissionId) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let before = queue.len();
        queue.retain(|job| job.id != submission_id);
        tracing::info!(submission_id, removed = queue.len() != before, "abort requested");
        // No judge ever picks up a job here, so none is left to stop it.
        false
    }

    fn disconnect(&self, judge_id: &str, force: bool) {
        tracing::info!(judge_id, force, "disconnect requested");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "judge_bridge=info,bridge_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BridgeConfig::load()?;
    let server = Server::builder(pool_handlers(Arc::new(QueueOnlyPool::default())))
        .config(&config.listen)
        .bind(config.listen.address.as_str())
        .await?;
    tracing::info!(addr = %server.local_addr()?, "bridge_server ready");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

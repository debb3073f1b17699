//! Timer loop driving [`Monitor::run_cycle`] until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::monitor::Monitor;

/// Runs a cycle every `period` until `shutdown` resolves.
///
/// Cycles never overlap: each one runs on the blocking pool and the next
/// tick is not taken until it returns. A tick that comes due meanwhile is
/// delayed rather than queued. When `shutdown` resolves mid-cycle the loop
/// stops waiting for it; the cycle itself is left to finish on its own.
///
/// Returns the number of cycles that completed.
pub async fn run_until<F>(monitor: Arc<Monitor>, period: Duration, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut completed = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let worker = Arc::clone(&monitor);
                let cycle = tokio::task::spawn_blocking(move || worker.run_cycle());
                tokio::select! {
                    () = &mut shutdown => {
                        info!("Shutdown requested while a cycle is running; not waiting for it");
                        break;
                    }
                    joined = cycle => match joined {
                        Ok(outcome) => {
                            completed += 1;
                            debug!("Cycle {completed} finished: {outcome:?}");
                        }
                        Err(e) => error!("Poll cycle aborted: {e}"),
                    },
                }
            }
        }
    }
    completed
}

/// Resolves on SIGINT, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for interrupt signal: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for terminate signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Received interrupt signal, shutting down"),
        () = terminate => info!("Received terminate signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;

    use super::*;
    use crate::adapters::scripted::{ManualClock, MemFileSystem, MemoryStore, ScriptedBuilder};
    use crate::config::MonitorConfig;
    use crate::context::ServiceContext;
    use crate::error::BuildError;
    use crate::ports::builder::{BuildReport, Builder};
    use crate::ports::shell::{ShellExecutor, ShellOutput, ShellRequest};

    struct NoShell;
    impl ShellExecutor for NoShell {
        fn run(
            &self,
            _request: &ShellRequest,
        ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
            Err("unused".into())
        }
    }

    fn monitor(store: Arc<MemoryStore>, builder: Arc<dyn Builder>) -> Arc<Monitor> {
        let ctx = ServiceContext {
            clock: Arc::new(ManualClock::new("2024-06-15T10:00:00Z".parse().unwrap())),
            fs: Arc::new(MemFileSystem::new()),
            shell: Arc::new(NoShell),
            store,
            builder,
        };
        let config = MonitorConfig {
            tables: vec!["projects".into()],
            ..MonitorConfig::default()
        };
        Arc::new(Monitor::new(&ctx, &config))
    }

    fn row(id: i64) -> serde_json::Map<String, serde_json::Value> {
        serde_json::json!({ "id": id }).as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn runs_cycles_until_shutdown() {
        let store = Arc::new(MemoryStore::new());
        store.set_rows("projects", vec![row(1)]);
        let builder = Arc::new(ScriptedBuilder::new());
        let monitor = monitor(store, builder.clone());

        let completed = run_until(
            Arc::clone(&monitor),
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await;

        assert!(completed >= 2, "only {completed} cycles ran");
        assert_eq!(builder.calls(), 0);
        assert!(monitor.state().load().unwrap().is_some());
    }

    #[tokio::test]
    async fn immediate_shutdown_runs_no_cycles() {
        let store = Arc::new(MemoryStore::new());
        let monitor = monitor(store, Arc::new(ScriptedBuilder::new()));

        let completed = run_until(monitor, Duration::from_secs(10), std::future::ready(())).await;

        assert_eq!(completed, 0);
    }

    struct SlowBuilder {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Builder for SlowBuilder {
        fn attempt_rebuild(&self) -> Result<BuildReport, BuildError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(BuildReport::default())
        }
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_for_in_flight_rebuild() {
        let store = Arc::new(MemoryStore::new());
        store.set_rows("projects", vec![row(1)]);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let builder = Arc::new(SlowBuilder {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let monitor = monitor(Arc::clone(&store), builder);
        // First cycle initializes state, so make the data differ from it afterwards.
        monitor.run_cycle();
        store.set_rows("projects", vec![row(1), row(2)]);

        let shutdown = async move {
            tokio::task::spawn_blocking(move || entered_rx.recv().unwrap())
                .await
                .unwrap();
        };
        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            run_until(Arc::clone(&monitor), Duration::from_millis(10), shutdown),
        )
        .await
        .expect("scheduler kept waiting on the rebuild");

        assert_eq!(completed, 0);
        assert!(monitor.guard().in_progress());
        release_tx.send(()).unwrap();
    }
}

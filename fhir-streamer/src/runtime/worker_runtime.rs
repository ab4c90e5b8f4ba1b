//! Runtime helper for spawning dedicated dispatch loops.

use crate::observability::events;
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::Builder;
use tracing::{debug, error};

pub(crate) const DEFAULT_AUDIT_RUNTIME_THREAD_NAME: &str = "fhir-audit-sink";
const COMPONENT: &str = "worker_runtime";

/// Join handle plus the thread label the loop runs on.
pub(crate) struct DispatchLoopHandle {
    worker_thread: String,
    join_handle: thread::JoinHandle<()>,
}

impl DispatchLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    pub(crate) fn into_join_handle(self) -> thread::JoinHandle<()> {
        self.join_handle
    }
}

/// Runs `run_loop` to completion on a new named thread with its own current-thread runtime.
pub(crate) fn spawn_dispatch_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> io::Result<DispatchLoopHandle>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "spawning dispatch loop thread"
    );

    let loop_thread_name = thread_name.clone();
    let join_handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(
                        event = events::RUNTIME_SPAWN_FAILED,
                        component = COMPONENT,
                        worker_thread = loop_thread_name.as_str(),
                        err = %err,
                        "unable to build dispatch loop runtime"
                    );
                    return;
                }
            };

            runtime.block_on(run_loop());
        })
        .inspect_err(|err| {
            error!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_thread = thread_name.as_str(),
                err = %err,
                "unable to spawn dispatch loop thread"
            );
        })?;

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "dispatch loop thread spawned"
    );

    Ok(DispatchLoopHandle {
        worker_thread: thread_name,
        join_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::spawn_dispatch_loop;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn spawn_dispatch_loop_runs_future_on_named_thread() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_loop = ran.clone();

        let handle = spawn_dispatch_loop("fhir-test-loop".to_string(), move || async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert_eq!(std::thread::current().name(), Some("fhir-test-loop"));
            ran_in_loop.store(true, Ordering::SeqCst);
        })
        .expect("thread should spawn");

        assert_eq!(handle.worker_thread(), "fhir-test-loop");
        handle
            .into_join_handle()
            .join()
            .expect("loop thread should not panic");
        assert!(ran.load(Ordering::SeqCst));
    }
}

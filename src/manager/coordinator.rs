// Execution coordinator: runs matched handlers inline or on a worker runtime

use crate::command::Timestamp;
use crate::context::CommandContext;
use crate::error::{DispatchError, DispatchResult};
use crate::syntax::Handler;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Execution strategy of a manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorType {
    /// Handlers run on the dispatching thread
    #[default]
    Sync,
    /// Handlers run on a worker, dispatch returns immediately
    Async,
}

/// How a dispatched handler finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded)
    }
}

/// Passed to the completion callback once per dispatch
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub id: Uuid,
    pub sender_name: String,
    pub command_line: String,
    pub outcome: ExecutionOutcome,
    pub elapsed: Duration,
    pub completed_at: Timestamp,
}

/// Completion callback, invoked exactly once per submitted dispatch
pub type CompletionCallback = Arc<dyn Fn(&ExecutionReport) + Send + Sync>;

/// Receives every failure raised while running a handler
pub trait ExceptionHandler<S>: Send + Sync {
    fn handle(&self, sender: &S, context: &CommandContext, error: &DispatchError);
}

/// Default exception handler, logs and moves on
pub struct LoggingExceptionHandler;

impl<S> ExceptionHandler<S> for LoggingExceptionHandler {
    fn handle(&self, _sender: &S, context: &CommandContext, error: &DispatchError) {
        log::error!("Error executing '{}': {}", context.raw_format(), error);
    }
}

/// Handle to a submitted dispatch
pub struct CompletionHandle {
    id: Uuid,
    receiver: oneshot::Receiver<ExecutionOutcome>,
}

impl CompletionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the handler to finish
    pub async fn wait(self) -> ExecutionOutcome {
        self.receiver
            .await
            .unwrap_or_else(|_| ExecutionOutcome::Failed("dispatch dropped before completion".to_string()))
    }

    /// Blocking variant of `wait`; must not be called from inside an async context
    pub fn blocking_wait(self) -> ExecutionOutcome {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| ExecutionOutcome::Failed("dispatch dropped before completion".to_string()))
    }

    /// The outcome if the handler already finished
    pub fn try_outcome(&mut self) -> Option<ExecutionOutcome> {
        self.receiver.try_recv().ok()
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle").field("id", &self.id).finish()
    }
}

/// One matched invocation, ready to run
pub(crate) struct Dispatch<S> {
    pub id: Uuid,
    pub sender: S,
    pub sender_name: String,
    pub handler: Handler<S>,
    pub context: CommandContext,
}

/// Failure and completion hooks shared by every dispatch of a manager
pub(crate) struct CompletionHooks<S> {
    pub exceptions: Arc<dyn ExceptionHandler<S>>,
    pub on_complete: Option<CompletionCallback>,
    pub log_executions: bool,
}

impl<S> CompletionHooks<S> {
    /// Run the handler, route any failure, notify completion
    pub fn run(&self, dispatch: Dispatch<S>) -> ExecutionOutcome {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            (dispatch.handler)(&dispatch.sender, &dispatch.context)
        }));
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(DispatchError::Handler(error)),
            Err(payload) => Some(DispatchError::HandlerPanicked(panic_message(payload.as_ref()))),
        };
        self.finish(dispatch, failure, started)
    }

    /// Report a dispatch whose handler will never run
    pub fn abandon(&self, dispatch: Dispatch<S>) -> ExecutionOutcome {
        log::warn!("Dispatch {} dropped before its handler ran", dispatch.id);
        self.finish(dispatch, Some(DispatchError::Abandoned), Instant::now())
    }

    fn finish(&self, dispatch: Dispatch<S>, failure: Option<DispatchError>, started: Instant) -> ExecutionOutcome {
        let Dispatch {
            id,
            sender,
            sender_name,
            context,
            ..
        } = dispatch;

        let outcome = match failure {
            None => ExecutionOutcome::Succeeded,
            Some(error) => {
                self.exceptions.handle(&sender, &context, &error);
                ExecutionOutcome::Failed(error.to_string())
            }
        };

        let report = ExecutionReport {
            id,
            sender_name,
            command_line: context.raw_format(),
            outcome: outcome.clone(),
            elapsed: started.elapsed(),
            completed_at: chrono::Utc::now(),
        };
        self.complete(&report);

        outcome
    }

    fn complete(&self, report: &ExecutionReport) {
        if self.log_executions {
            log::info!("{} has executed the command '{}'", report.sender_name, report.command_line);
        }
        if let Some(callback) = &self.on_complete {
            callback(report);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A dispatch queued on the worker
///
/// Dropping it unrun (runtime shut down, task cancelled) still routes the
/// failure and fires the completion callback.
struct PendingDispatch<S> {
    dispatch: Option<Dispatch<S>>,
    reply: Option<oneshot::Sender<ExecutionOutcome>>,
    hooks: Arc<CompletionHooks<S>>,
}

impl<S> PendingDispatch<S> {
    fn new(dispatch: Dispatch<S>, reply: oneshot::Sender<ExecutionOutcome>, hooks: Arc<CompletionHooks<S>>) -> Self {
        Self {
            dispatch: Some(dispatch),
            reply: Some(reply),
            hooks,
        }
    }

    fn run(mut self) {
        if let (Some(dispatch), Some(reply)) = (self.dispatch.take(), self.reply.take()) {
            let _ = reply.send(self.hooks.run(dispatch));
        }
    }
}

impl<S> Drop for PendingDispatch<S> {
    fn drop(&mut self) {
        if let (Some(dispatch), Some(reply)) = (self.dispatch.take(), self.reply.take()) {
            let _ = reply.send(self.hooks.abandon(dispatch));
        }
    }
}

/// Worker runtime for off-thread dispatch
///
/// Always owned by its manager, so an ambient runtime shutting down cannot
/// take queued dispatches with it.
pub struct WorkerRuntime {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl WorkerRuntime {
    pub fn new() -> Result<Self, std::io::Error> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("syntaxis-worker")
            .build()?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for WorkerRuntime {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Sync or off-thread execution strategy
pub enum ExecutionCoordinator {
    Sync,
    Async(WorkerRuntime),
}

impl ExecutionCoordinator {
    pub fn from_type(kind: CoordinatorType) -> DispatchResult<Self> {
        match kind {
            CoordinatorType::Sync => Ok(ExecutionCoordinator::Sync),
            CoordinatorType::Async => Ok(ExecutionCoordinator::Async(WorkerRuntime::new()?)),
        }
    }

    pub fn kind(&self) -> CoordinatorType {
        match self {
            ExecutionCoordinator::Sync => CoordinatorType::Sync,
            ExecutionCoordinator::Async(_) => CoordinatorType::Async,
        }
    }

    pub(crate) fn submit<S>(&self, dispatch: Dispatch<S>, hooks: &Arc<CompletionHooks<S>>) -> CompletionHandle
    where
        S: Send + Sync + 'static,
    {
        let id = dispatch.id;
        let (sender, receiver) = oneshot::channel();

        match self {
            ExecutionCoordinator::Sync => {
                let _ = sender.send(hooks.run(dispatch));
            }
            ExecutionCoordinator::Async(worker) => {
                let pending = PendingDispatch::new(dispatch, sender, Arc::clone(hooks));
                worker.handle().spawn_blocking(move || pending.run());
            }
        }

        CompletionHandle { id, receiver }
    }
}

impl fmt::Debug for ExecutionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionCoordinator::{:?}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DelegateContext;
    use crate::syntax::{FlagExtractor, FlagSet};
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    impl ExceptionHandler<String> for Recording {
        fn handle(&self, _sender: &String, _context: &CommandContext, error: &DispatchError) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    fn handler<F>(f: F) -> Handler<String>
    where
        F: Fn(&String, &CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn dispatch(handler: Handler<String>) -> Dispatch<String> {
        let flags = FlagSet::new();
        let extractor = FlagExtractor::new(&flags, "--", "-");
        let delegate = DelegateContext::new("heal", vec!["Bob".to_string()], &extractor);
        Dispatch {
            id: Uuid::new_v4(),
            sender: "Alice".to_string(),
            sender_name: "Alice".to_string(),
            handler,
            context: CommandContext::bare(delegate),
        }
    }

    fn hooks(exceptions: Arc<Recording>, reports: Arc<Mutex<Vec<ExecutionReport>>>) -> Arc<CompletionHooks<String>> {
        Arc::new(CompletionHooks {
            exceptions,
            on_complete: Some(Arc::new(move |report: &ExecutionReport| {
                reports.lock().unwrap().push(report.clone());
            })),
            log_executions: false,
        })
    }

    #[test]
    fn test_sync_success_reports_once() {
        let exceptions = Arc::new(Recording(Mutex::new(Vec::new())));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = hooks(exceptions.clone(), reports.clone());

        let mut handle = ExecutionCoordinator::Sync.submit(dispatch(handler(|_, _| Ok(()))), &hooks);
        assert_eq!(handle.try_outcome(), Some(ExecutionOutcome::Succeeded));

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, handle.id());
        assert_eq!(reports[0].command_line, "heal Bob");
        assert!(exceptions.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sync_panic_is_contained() {
        let exceptions = Arc::new(Recording(Mutex::new(Vec::new())));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = hooks(exceptions.clone(), reports.clone());

        let mut handle = ExecutionCoordinator::Sync.submit(dispatch(handler(|_, _| panic!("boom"))), &hooks);
        assert!(matches!(handle.try_outcome(), Some(ExecutionOutcome::Failed(ref m)) if m.contains("boom")));
        assert_eq!(exceptions.0.lock().unwrap().len(), 1);
        assert_eq!(reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_pending_dispatch_still_completes() {
        let exceptions = Arc::new(Recording(Mutex::new(Vec::new())));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = hooks(exceptions.clone(), reports.clone());

        let (reply, mut receiver) = oneshot::channel();
        let pending = PendingDispatch::new(dispatch(handler(|_, _| panic!("never runs"))), reply, hooks);
        drop(pending);

        assert!(matches!(receiver.try_recv(), Ok(ExecutionOutcome::Failed(ref m)) if m.contains("abandoned")));
        assert_eq!(exceptions.0.lock().unwrap().len(), 1);
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].outcome.is_success());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let exceptions = Arc::new(Recording(Mutex::new(Vec::new())));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = hooks(exceptions, reports.clone());
        ExecutionCoordinator::Sync.submit(dispatch(handler(|_, _| Err(anyhow::anyhow!("no target")))), &hooks);

        let report = reports.lock().unwrap()[0].clone();
        let json = serde_json::to_value(&report).expect("Failed to serialize");
        assert_eq!(json["id"], report.id.to_string());
        assert_eq!(json["command_line"], "heal Bob");
        assert_eq!(json["outcome"]["status"], "failed");
        assert!(json["outcome"]["reason"].as_str().unwrap().contains("no target"));
        assert!(json["completed_at"].is_string());
    }

    #[test]
    fn test_coordinator_type_serde() {
        assert_eq!(serde_json::to_string(&CoordinatorType::Async).unwrap(), "\"async\"");
        assert_eq!(ExecutionCoordinator::Sync.kind(), CoordinatorType::Sync);
    }
}

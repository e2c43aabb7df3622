//! Scripted in-process collaborator for orchestrator tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use tortoise_core::checkpoint::DiscoveredItem;
use tortoise_core::classify::ErrorClassifier;
use tortoise_core::collaborator::Collaborator;
use tortoise_core::control::RunControl;
use tortoise_core::orchestrator::Orchestrator;
use tortoise_core::pacing::PacingController;
use tortoise_core::retry::{BackoffPolicy, OperationFailure, SubAttemptPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub target: String,
    pub identity: String,
    pub at: Instant,
}

type Enumeration = (Vec<DiscoveredItem>, Result<(), OperationFailure>);

/// Answers each call from a per-target script; unscripted calls succeed.
#[derive(Default)]
pub struct Scripted {
    perform: Mutex<HashMap<String, VecDeque<Result<(), OperationFailure>>>>,
    enumerate: Mutex<HashMap<String, VecDeque<Enumeration>>>,
    hang: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_perform(&self, target: &str, results: Vec<Result<(), OperationFailure>>) {
        self.perform
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .extend(results);
    }

    /// Always fail `target` with `failure`.
    pub fn always_fail(&self, target: &str, failure: OperationFailure, times: usize) {
        self.on_perform(target, (0..times).map(|_| Err(failure.clone())).collect());
    }

    pub fn on_enumerate(&self, source: &str, items: &[&str], result: Result<(), OperationFailure>) {
        let items = items.iter().map(|id| DiscoveredItem::new(*id)).collect();
        self.enumerate
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_default()
            .push_back((items, result));
    }

    /// Calls for `target` never return (after sending scripted items).
    pub fn hang(&self, target: &str) {
        self.hang.lock().unwrap().insert(target.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, target: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.target == target).collect()
    }

    fn log(&self, op: &'static str, target: &str, identity: &str) {
        self.calls.lock().unwrap().push(Call {
            op,
            target: target.to_string(),
            identity: identity.to_string(),
            at: Instant::now(),
        });
    }

    fn hangs(&self, target: &str) -> bool {
        self.hang.lock().unwrap().contains(target)
    }
}

#[async_trait]
impl Collaborator for Scripted {
    async fn perform(&self, source_reference: &str, identity: &str) -> Result<(), OperationFailure> {
        self.log("perform", source_reference, identity);
        if self.hangs(source_reference) {
            std::future::pending::<()>().await;
        }
        let next = self
            .perform
            .lock()
            .unwrap()
            .get_mut(source_reference)
            .and_then(|q| q.pop_front());
        next.unwrap_or(Ok(()))
    }

    async fn enumerate(
        &self,
        source: &str,
        identity: &str,
        items: mpsc::Sender<DiscoveredItem>,
    ) -> Result<(), OperationFailure> {
        self.log("enumerate", source, identity);
        let next = self
            .enumerate
            .lock()
            .unwrap()
            .get_mut(source)
            .and_then(|q| q.pop_front());
        let (found, result) = next.unwrap_or((Vec::new(), Ok(())));
        for item in found {
            if items.send(item).await.is_err() {
                break;
            }
        }
        if self.hangs(source) {
            std::future::pending::<()>().await;
        }
        result
    }
}

pub fn pacing() -> PacingController {
    PacingController::new(
        BackoffPolicy::pacing(Duration::from_secs(1)),
        vec!["tv".to_string(), "web_safari".to_string(), "web".to_string(), "android".to_string()],
        SubAttemptPolicy::default(),
    )
}

pub fn orchestrator(collaborator: &Arc<Scripted>, control: RunControl) -> Orchestrator {
    let collaborator: Arc<dyn Collaborator> = Arc::clone(collaborator) as Arc<dyn Collaborator>;
    Orchestrator::new(collaborator, pacing(), ErrorClassifier::new(), control)
}

pub fn throttled() -> OperationFailure {
    OperationFailure::http(429, "ERROR: HTTP Error 429: Too Many Requests")
}

pub fn age_gate() -> OperationFailure {
    OperationFailure::http(403, "ERROR: Sign in to confirm your age. This video may be inappropriate for some users.")
}

pub fn unavailable() -> OperationFailure {
    OperationFailure::message("ERROR: [youtube] dQw4w9WgXcQ: Video unavailable. This content isn't available.")
}

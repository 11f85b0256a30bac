//! Subtract operation
//!
//! A subtract node keeps its inputs in a hidden source container and derives
//! one result per kept operand. Operands whose names are in the selected set
//! are cut away from every other operand.
//!
//! Rebuilds are single-flight per node. Triggers arriving while one runs are
//! folded into a single follow-up run.

mod pipeline;

pub use pipeline::{RebuildError, RebuildOutcome, STATUS_DO_CSG, rebuild};

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pe_core::constants::OPERAND_ALPHA;
use pe_core::scene::{
    EditorDraw, InvalidateResponse, RebuildPhase, RebuildRequest, RebuildTracker, Rebuildable,
    should_rebuild,
};
use pe_core::{DrawRequest, DrawStyle, InvalidateArgs, InvalidateKind, SceneNode, SceneObject};

use crate::kernel::BooleanKernel;
use crate::progress::{CancelToken, ProgressSink};
use crate::tasks::{Notice, TaskHandle, TaskScheduler};

/// Behavior of a subtract node
pub struct SubtractOperation {
    selected_children: Mutex<BTreeSet<String>>,
    tracker: RebuildTracker,
    kernel: Arc<dyn BooleanKernel>,
    scheduler: Arc<TaskScheduler>,
    current: Mutex<Option<TaskHandle>>,
}

impl fmt::Debug for SubtractOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtractOperation")
            .field("selected_children", &*self.selected_children.lock())
            .field("phase", &self.tracker.phase())
            .field("kernel", &self.kernel.name())
            .finish()
    }
}

/// Resets the rebuild phase if a run unwinds
struct PhaseGuard<'a>(&'a RebuildTracker);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.reset();
        }
    }
}

impl SubtractOperation {
    pub fn new(kernel: Arc<dyn BooleanKernel>, scheduler: Arc<TaskScheduler>) -> Self {
        Self {
            selected_children: Mutex::new(BTreeSet::new()),
            tracker: RebuildTracker::new(),
            kernel,
            scheduler,
            current: Mutex::new(None),
        }
    }

    /// Build a subtract node over `sources`, cutting away the ones named in
    /// `removes`. The node is not rebuilt until asked to.
    pub fn create_node(
        name: impl Into<String>,
        sources: Vec<SceneNode>,
        removes: impl IntoIterator<Item = String>,
        kernel: Arc<dyn BooleanKernel>,
        scheduler: Arc<TaskScheduler>,
    ) -> SceneNode {
        let op = Self::new(kernel, scheduler);
        op.selected_children.lock().extend(removes);
        let container = SceneObject::source_container(sources);
        SceneObject::operation(name, Arc::new(op), vec![container])
    }

    /// The subtract behind `node`, if it is a subtract node
    pub fn of(node: &SceneNode) -> Option<&SubtractOperation> {
        node.operation_handler()?
            .as_any()
            .downcast_ref::<SubtractOperation>()
    }

    /// The hidden container holding the operands
    pub fn source_container(node: &SceneNode) -> Option<SceneNode> {
        node.children()
            .iter()
            .find(|c| c.is_source_container())
            .cloned()
    }

    /// Derived children from the last committed rebuild
    pub fn result_children(node: &SceneNode) -> Vec<SceneNode> {
        node.children()
            .iter()
            .filter(|c| !c.is_source_container())
            .cloned()
            .collect()
    }

    pub fn kernel(&self) -> &Arc<dyn BooleanKernel> {
        &self.kernel
    }

    pub fn selected_children(&self) -> BTreeSet<String> {
        self.selected_children.lock().clone()
    }

    /// Replace the operands to cut away and rebuild
    pub fn set_selected_children(
        &self,
        node: &SceneNode,
        names: impl IntoIterator<Item = String>,
    ) {
        *self.selected_children.lock() = names.into_iter().collect();
        node.invalidate(InvalidateKind::Properties);
    }

    /// Drop selected names that no longer match a visible operand
    fn prune_selection(&self, present: &[String]) {
        let mut selected = self.selected_children.lock();
        let stale: Vec<String> = selected
            .iter()
            .filter(|name| !present.contains(name))
            .cloned()
            .collect();
        for name in &stale {
            selected.remove(name);
        }
        if !stale.is_empty() {
            tracing::debug!("Pruned stale subtract operands: {:?}", stale);
        }
    }

    pub fn phase(&self) -> RebuildPhase {
        self.tracker.phase()
    }

    /// Rebuild on the calling thread and notify the parent.
    ///
    /// If a rebuild of this node is already running, the request is folded
    /// into it and [`RebuildOutcome::Deferred`] is returned without running.
    pub fn rebuild_now(&self, node: &SceneNode) -> Result<RebuildOutcome, RebuildError> {
        if self.tracker.request() == RebuildRequest::Coalesced {
            tracing::debug!("Rebuild of {} already running, deferred", node.name());
            return Ok(RebuildOutcome::Deferred);
        }
        let _guard = PhaseGuard(&self.tracker);
        let cancel = CancelToken::new();
        let result = loop {
            let result = rebuild(node, self, &cancel, None);
            if !self.tracker.finish() {
                break result;
            }
        };
        notify_parent(node);
        result
    }

    /// Schedule a rebuild, or fold the request into the one in flight.
    pub fn request_rebuild(&self, node: &SceneNode) -> Option<TaskHandle> {
        match self.tracker.request() {
            RebuildRequest::Start => {
                let task_node = node.clone();
                let handle = self.scheduler.execute(
                    format!("Subtract {}", node.name()),
                    move |progress, cancel| match SubtractOperation::of(&task_node) {
                        Some(op) => op.run_rebuilds(&task_node, progress, cancel),
                        None => Err("node is not a subtract operation".to_string()),
                    },
                );
                *self.current.lock() = Some(handle.clone());
                Some(handle)
            }
            RebuildRequest::Coalesced => {
                tracing::debug!("Rebuild of {} already running, queued another", node.name());
                None
            }
        }
    }

    /// Cancel the rebuild in flight, if any
    pub fn cancel(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            handle.cancel();
        }
    }

    /// Run rebuilds until no trigger is pending
    fn run_rebuilds(
        &self,
        node: &SceneNode,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), String> {
        let _guard = PhaseGuard(&self.tracker);
        let mut failure = None;
        loop {
            match rebuild(node, self, cancel, Some(progress)) {
                Ok(RebuildOutcome::Cancelled) => {
                    tracing::debug!("Rebuild of {} cancelled", node.name());
                    self.tracker.reset();
                    break;
                }
                Ok(outcome) => {
                    tracing::info!("Rebuilt {}: {:?}", node.name(), outcome);
                    failure = None;
                }
                Err(e) => {
                    tracing::warn!("Rebuild of {} failed: {}", node.name(), e);
                    self.scheduler.notify(Notice::new(
                        format!("{} failed", self.operation_name()),
                        e.to_string(),
                    ));
                    failure = Some(e.to_string());
                }
            }
            if !self.tracker.finish() {
                break;
            }
        }
        notify_parent(node);
        failure.map_or(Ok(()), Err)
    }
}

fn notify_parent(node: &SceneNode) {
    if let Some(parent) = node.parent() {
        parent.deliver(InvalidateArgs::new(node.id(), InvalidateKind::Children));
    }
}

impl Rebuildable for SubtractOperation {
    fn operation_name(&self) -> &str {
        "Subtract"
    }

    fn on_invalidate(&self, node: &SceneNode, args: &InvalidateArgs) -> InvalidateResponse {
        let from_self = args.source == node.id();
        if should_rebuild(args.kind, from_self, node.is_rebuild_locked()) {
            self.request_rebuild(node);
            InvalidateResponse::Handled
        } else {
            InvalidateResponse::PassThrough
        }
    }

    fn draw_editor(&self, node: &SceneNode, selected: bool) -> EditorDraw {
        let Some(container) = Self::source_container(node).filter(|_| selected) else {
            return EditorDraw::default();
        };
        let removes = self.selected_children();
        let results = Self::result_children(node);
        let container_world = container.world_matrix();
        let mut requests = Vec::new();

        for operand in container.visible_descendant_meshes() {
            let name = operand.object.name();
            let matrix = container_world * operand.matrix;
            if removes.contains(&name) {
                let mut color = operand.object.color();
                color[3] = OPERAND_ALPHA;
                requests.push(DrawRequest::Mesh {
                    mesh: operand.mesh,
                    matrix,
                    color,
                    style: DrawStyle::Transparent,
                });
                continue;
            }
            let result = results
                .iter()
                .find(|r| r.name() == name)
                .and_then(|r| r.mesh().map(|mesh| (mesh, r.world_matrix())));
            let (mesh, matrix) = result.unwrap_or((operand.mesh, matrix));
            requests.push(DrawRequest::Mesh {
                mesh,
                matrix,
                color: operand.object.color(),
                style: DrawStyle::Outline,
            });
        }

        for result in results.iter().filter(|r| r.visible()) {
            if let Some(mesh) = result.mesh() {
                requests.push(DrawRequest::Mesh {
                    mesh,
                    matrix: result.world_matrix(),
                    color: result.color(),
                    style: DrawStyle::Solid,
                });
            }
        }

        EditorDraw {
            suppress_default: true,
            requests,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

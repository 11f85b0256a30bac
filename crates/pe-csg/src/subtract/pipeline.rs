//! The subtract rebuild: gather operands, fold the kernel over them and
//! swap the results in.

use std::sync::Arc;

use glam::Mat4;
use pe_core::scene::MeshInstance;
use pe_core::{Mesh, PropertyFlags, RebuildLock, SceneNode, SceneObject};
use thiserror::Error;

use super::SubtractOperation;
use crate::kernel::{BooleanError, BooleanProgress};
use crate::progress::{CancelToken, MonotonicProgress, ProgressSink};

/// Phase label reported while folding
pub const STATUS_DO_CSG: &str = "Do CSG";

/// What a rebuild did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// No visible operands; results cleared.
    Empty,
    /// A single operand, copied through unchanged.
    PassThrough,
    /// Nothing to keep or nothing to remove; results cleared.
    NoBooleanWork { keep: usize, remove: usize },
    /// One result per kept operand
    Subtracted { results: usize },
    /// Stopped early; the previous results are untouched.
    Cancelled,
    /// Another rebuild of the node was running; this one was folded into it.
    Deferred,
}

#[derive(Debug, Clone, Error)]
pub enum RebuildError {
    #[error("Operation {0} has no source container")]
    MissingSourceContainer(String),

    #[error("{node}: subtracting {remove} from {keep} failed: {source}")]
    Boolean {
        node: String,
        keep: String,
        remove: String,
        source: BooleanError,
    },
}

/// Recompute the results of a subtract node.
///
/// The previous results stay in place until the new set is complete, so a
/// cancelled or failed run leaves the node exactly as it was.
pub fn rebuild(
    node: &SceneNode,
    op: &SubtractOperation,
    cancel: &CancelToken,
    progress: Option<&dyn ProgressSink>,
) -> Result<RebuildOutcome, RebuildError> {
    let container = SubtractOperation::source_container(node)
        .ok_or_else(|| RebuildError::MissingSourceContainer(node.name()))?;
    let progress = MonotonicProgress::new(progress);
    let base = container.matrix();

    let operands = container.visible_descendant_meshes();
    match operands.as_slice() {
        [] => {
            commit(node, &container, Vec::new(), true);
            progress.update(1.0, STATUS_DO_CSG);
            return Ok(RebuildOutcome::Empty);
        }
        [single] => {
            let copy = result_object(single, single.mesh.clone(), base * single.matrix);
            commit(node, &container, vec![copy], false);
            progress.update(1.0, STATUS_DO_CSG);
            return Ok(RebuildOutcome::PassThrough);
        }
        _ => {}
    }

    let names: Vec<String> = operands.iter().map(|o| o.object.name()).collect();
    op.prune_selection(&names);
    let selected = op.selected_children();
    let (removes, keeps): (Vec<MeshInstance>, Vec<MeshInstance>) = operands
        .into_iter()
        .partition(|o| selected.contains(&o.object.name()));

    if removes.is_empty() || keeps.is_empty() {
        commit(node, &container, Vec::new(), true);
        progress.update(1.0, STATUS_DO_CSG);
        return Ok(RebuildOutcome::NoBooleanWork {
            keep: keeps.len(),
            remove: removes.len(),
        });
    }

    let total = (keeps.len() * removes.len()) as f64;
    let mut step = 0usize;
    let mut results = Vec::with_capacity(keeps.len());

    for keep in &keeps {
        let mut current: Arc<Mesh> = keep.mesh.clone();
        let mut transform = keep.matrix;
        for remove in &removes {
            if cancel.is_cancelled() {
                return Ok(RebuildOutcome::Cancelled);
            }
            let stage = BooleanProgress::new(&progress, step as f64 / total, 1.0 / total, STATUS_DO_CSG);
            let subtracted = op.kernel.subtract(
                &current,
                &transform,
                &remove.mesh,
                &remove.matrix,
                1,
                &stage,
                cancel,
            );
            current = match subtracted {
                Ok(mesh) => Arc::new(mesh),
                Err(BooleanError::Cancelled) => return Ok(RebuildOutcome::Cancelled),
                Err(source) => {
                    return Err(RebuildError::Boolean {
                        node: node.name(),
                        keep: keep.object.name(),
                        remove: remove.object.name(),
                        source,
                    });
                }
            };
            // Folded meshes are already in container space
            transform = Mat4::IDENTITY;
            step += 1;
            progress.update(step as f64 / total, STATUS_DO_CSG);
        }
        results.push(result_object(keep, current, base));
    }

    if cancel.is_cancelled() {
        return Ok(RebuildOutcome::Cancelled);
    }
    let count = results.len();
    commit(node, &container, results, false);
    progress.update(1.0, STATUS_DO_CSG);
    Ok(RebuildOutcome::Subtracted { results: count })
}

/// New visible child carrying `mesh` and the operand's name, color and
/// material.
fn result_object(operand: &MeshInstance, mesh: Arc<Mesh>, matrix: Mat4) -> SceneNode {
    let result = SceneObject::builder(operand.object.name())
        .mesh(mesh)
        .matrix(matrix)
        .build();
    result.copy_properties_from(
        &operand.object,
        PropertyFlags::ALL & !(PropertyFlags::MATRIX | PropertyFlags::VISIBLE | PropertyFlags::MESH),
    );
    result
}

/// Replace the results in one swap, with the node and everything below it
/// locked against the events the swap raises.
fn commit(node: &SceneNode, container: &SceneNode, results: Vec<SceneNode>, show_sources: bool) {
    let _lock = RebuildLock::acquire_all(node);
    container.set_visible(show_sources);
    node.modify_children(|children| {
        children.retain(|c| c.is_source_container());
        children.extend(results);
    });
}

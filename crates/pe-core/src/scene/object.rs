//! Scene objects
//!
//! Objects are shared as [`SceneNode`] (`Arc<SceneObject>`) between the
//! interaction thread and background rebuilds. All state sits behind short
//! lived locks; no lock is held while an invalidation is delivered.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use glam::Mat4;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::bvh::SpatialIndex;
use crate::constants::DEFAULT_COLOR;
use crate::mesh::Mesh;

use super::children::ChildList;
use super::flags::PropertyFlags;
use super::invalidate::{InvalidateArgs, InvalidateKind, InvalidateResponse, Rebuildable};

/// Shared handle to a scene object
pub type SceneNode = Arc<SceneObject>;

/// Unique object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What an object is
#[derive(Debug)]
pub enum ObjectKind {
    /// Scene root; counts the invalidations that reach it.
    Root(AtomicU64),
    /// Plain object: a mesh, a group, or both.
    Mesh,
    /// Hidden holder of an operation's inputs
    SourceContainer,
    /// Derived object recomputed from its source container
    Operation(Arc<dyn Rebuildable>),
}

/// Plain per-object properties
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperties {
    pub name: String,
    pub matrix: Mat4,
    pub visible: bool,
    pub material_index: i32,
    pub color: [f32; 4],
}

impl Default for ObjectProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            matrix: Mat4::IDENTITY,
            visible: true,
            material_index: -1,
            color: DEFAULT_COLOR,
        }
    }
}

/// A visible mesh leaf together with its placement
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub object: SceneNode,
    pub mesh: Arc<Mesh>,
    pub matrix: Mat4,
}

/// Builder for [`SceneObject`]
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    props: ObjectProperties,
    mesh: Option<Arc<Mesh>>,
    children: Vec<SceneNode>,
    kind: Option<ObjectKind>,
}

impl ObjectBuilder {
    pub fn matrix(mut self, matrix: Mat4) -> Self {
        self.props.matrix = matrix;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.props.visible = visible;
        self
    }

    pub fn color(mut self, color: [f32; 4]) -> Self {
        self.props.color = color;
        self
    }

    pub fn material_index(mut self, index: i32) -> Self {
        self.props.material_index = index;
        self
    }

    pub fn mesh(mut self, mesh: Arc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn build(self) -> SceneNode {
        let node = Arc::new(SceneObject {
            id: ObjectId::new(),
            kind: self.kind.unwrap_or(ObjectKind::Mesh),
            props: RwLock::new(self.props),
            mesh: RwLock::new(self.mesh),
            trace: Mutex::new(None),
            children: ChildList::new(self.children),
            parent: RwLock::new(Weak::new()),
            rebuild_locks: AtomicUsize::new(0),
        });
        for child in node.children.snapshot().iter() {
            child.set_parent(&node);
        }
        node
    }
}

/// A node in the scene tree
#[derive(Debug)]
pub struct SceneObject {
    id: ObjectId,
    kind: ObjectKind,
    props: RwLock<ObjectProperties>,
    mesh: RwLock<Option<Arc<Mesh>>>,
    trace: Mutex<Option<Arc<SpatialIndex>>>,
    children: ChildList,
    parent: RwLock<Weak<SceneObject>>,
    rebuild_locks: AtomicUsize,
}

impl SceneObject {
    /// Start building an object with the given name
    pub fn builder(name: impl Into<String>) -> ObjectBuilder {
        ObjectBuilder {
            props: ObjectProperties {
                name: name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Empty object
    pub fn new(name: impl Into<String>) -> SceneNode {
        Self::builder(name).build()
    }

    /// Object displaying a mesh
    pub fn with_mesh(name: impl Into<String>, mesh: Arc<Mesh>) -> SceneNode {
        Self::builder(name).mesh(mesh).build()
    }

    /// Group of objects
    pub fn group(name: impl Into<String>, children: Vec<SceneNode>) -> SceneNode {
        Self::builder(name).children(children).build()
    }

    /// Scene root
    pub fn root() -> SceneNode {
        Self::builder("Scene")
            .kind(ObjectKind::Root(AtomicU64::new(0)))
            .build()
    }

    /// Container holding an operation's inputs
    pub fn source_container(children: Vec<SceneNode>) -> SceneNode {
        Self::builder("Source")
            .kind(ObjectKind::SourceContainer)
            .children(children)
            .build()
    }

    /// Operation node
    pub fn operation(
        name: impl Into<String>,
        operation: Arc<dyn Rebuildable>,
        children: Vec<SceneNode>,
    ) -> SceneNode {
        Self::builder(name)
            .kind(ObjectKind::Operation(operation))
            .children(children)
            .build()
    }

    // ============== Identity ==============

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn is_source_container(&self) -> bool {
        matches!(self.kind, ObjectKind::SourceContainer)
    }

    /// The operation behind an operation node
    pub fn operation_handler(&self) -> Option<&Arc<dyn Rebuildable>> {
        match &self.kind {
            ObjectKind::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// Number of invalidations that reached this node, if it is a root
    pub fn revision(&self) -> Option<u64> {
        match &self.kind {
            ObjectKind::Root(counter) => Some(counter.load(Ordering::Acquire)),
            _ => None,
        }
    }

    // ============== Properties ==============

    pub fn properties(&self) -> ObjectProperties {
        self.props.read().clone()
    }

    pub fn name(&self) -> String {
        self.props.read().name.clone()
    }

    pub fn set_name(self: &Arc<Self>, name: impl Into<String>) {
        self.props.write().name = name.into();
        self.invalidate(InvalidateKind::Properties);
    }

    pub fn matrix(&self) -> Mat4 {
        self.props.read().matrix
    }

    pub fn set_matrix(self: &Arc<Self>, matrix: Mat4) {
        self.props.write().matrix = matrix;
        self.invalidate(InvalidateKind::Matrix);
    }

    /// Replace the matrix with `edit(matrix)` in one step
    pub fn update_matrix(self: &Arc<Self>, edit: impl FnOnce(Mat4) -> Mat4) {
        {
            let mut props = self.props.write();
            props.matrix = edit(props.matrix);
        }
        self.invalidate(InvalidateKind::Matrix);
    }

    pub fn visible(&self) -> bool {
        self.props.read().visible
    }

    pub fn set_visible(self: &Arc<Self>, visible: bool) {
        let changed = {
            let mut props = self.props.write();
            std::mem::replace(&mut props.visible, visible) != visible
        };
        if changed {
            self.invalidate(InvalidateKind::Properties);
        }
    }

    pub fn material_index(&self) -> i32 {
        self.props.read().material_index
    }

    pub fn color(&self) -> [f32; 4] {
        self.props.read().color
    }

    pub fn set_color(self: &Arc<Self>, color: [f32; 4]) {
        self.props.write().color = color;
        self.invalidate(InvalidateKind::Properties);
    }

    /// Copy the selected properties of `source` onto this object.
    pub fn copy_properties_from(self: &Arc<Self>, source: &SceneObject, flags: PropertyFlags) {
        let from = source.properties();
        {
            let mut props = self.props.write();
            if flags.contains(PropertyFlags::NAME) {
                props.name = from.name;
            }
            if flags.contains(PropertyFlags::MATRIX) {
                props.matrix = from.matrix;
            }
            if flags.contains(PropertyFlags::VISIBLE) {
                props.visible = from.visible;
            }
            if flags.contains(PropertyFlags::MATERIAL_INDEX) {
                props.material_index = from.material_index;
            }
            if flags.contains(PropertyFlags::COLOR) {
                props.color = from.color;
            }
        }
        if flags.contains(PropertyFlags::MESH) {
            if let Some(mesh) = source.mesh() {
                self.set_mesh(mesh);
            }
        }
        if flags.contains(PropertyFlags::MATRIX) {
            self.invalidate(InvalidateKind::Matrix);
        }
        if !(flags & !(PropertyFlags::MATRIX | PropertyFlags::MESH)).is_empty() {
            self.invalidate(InvalidateKind::Properties);
        }
    }

    // ============== Geometry ==============

    pub fn mesh(&self) -> Option<Arc<Mesh>> {
        self.mesh.read().clone()
    }

    /// Replace the mesh reference; the cached spatial index goes with it.
    pub fn set_mesh(self: &Arc<Self>, mesh: Arc<Mesh>) {
        *self.mesh.write() = Some(mesh);
        *self.trace.lock() = None;
        self.invalidate(InvalidateKind::Mesh);
    }

    /// Spatial index for the current mesh, built on first use and cached
    /// until the mesh reference changes.
    pub fn trace_data(&self) -> Option<Arc<SpatialIndex>> {
        let mesh = self.mesh()?;
        let mut cache = self.trace.lock();
        if let Some(index) = cache.as_ref() {
            if index.mesh_id() == mesh.id() {
                return Some(index.clone());
            }
        }
        let index = Arc::new(SpatialIndex::build(mesh));
        *cache = Some(index.clone());
        Some(index)
    }

    // ============== Hierarchy ==============

    /// Snapshot of the children
    pub fn children(&self) -> Arc<Vec<SceneNode>> {
        self.children.snapshot()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Edit the child list in one copy-on-write swap.
    ///
    /// Parent links are updated; no invalidation is raised, callers decide
    /// which notification the edit amounts to.
    pub fn modify_children<R>(self: &Arc<Self>, edit: impl FnOnce(&mut Vec<SceneNode>) -> R) -> R {
        let (previous, next, result) = self.children.modify(edit);
        for old in previous.iter() {
            if !next.iter().any(|n| Arc::ptr_eq(n, old)) && old.parent_is(self) {
                old.clear_parent();
            }
        }
        for child in next.iter() {
            child.set_parent(self);
        }
        result
    }

    /// Append a child and notify
    pub fn add_child(self: &Arc<Self>, child: SceneNode) {
        self.modify_children(|children| children.push(child));
        self.invalidate(InvalidateKind::Children);
    }

    /// Remove a child and notify. Returns false if it was not a child.
    pub fn remove_child(self: &Arc<Self>, child: &SceneNode) -> bool {
        let removed = self.modify_children(|children| {
            let before = children.len();
            children.retain(|c| !Arc::ptr_eq(c, child));
            children.len() != before
        });
        if removed {
            self.invalidate(InvalidateKind::Children);
        }
        removed
    }

    pub fn find_child(&self, name: &str) -> Option<SceneNode> {
        self.children().iter().find(|c| c.name() == name).cloned()
    }

    pub fn parent(&self) -> Option<SceneNode> {
        self.parent.read().upgrade()
    }

    fn parent_is(&self, node: &SceneNode) -> bool {
        self.parent
            .read()
            .upgrade()
            .is_some_and(|p| Arc::ptr_eq(&p, node))
    }

    fn set_parent(&self, parent: &SceneNode) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    fn clear_parent(&self) {
        *self.parent.write() = Weak::new();
    }

    /// True if `ancestor` is a strict ancestor of this object
    pub fn is_descendant_of(&self, ancestor: &SceneObject) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.id == ancestor.id {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// All descendants, depth first, parents before children
    pub fn descendants(&self) -> Vec<SceneNode> {
        let mut out = Vec::new();
        let mut stack: Vec<SceneNode> = self.children().iter().rev().cloned().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().iter().rev().cloned());
            out.push(node);
        }
        out
    }

    // ============== Transforms ==============

    /// Local-to-world matrix
    pub fn world_matrix(&self) -> Mat4 {
        let mut matrix = self.matrix();
        let mut current = self.parent();
        while let Some(node) = current {
            matrix = node.matrix() * matrix;
            current = node.parent();
        }
        matrix
    }

    /// Matrix mapping this object's local space into `ancestor`'s space.
    /// Falls back to the world matrix if `ancestor` is not above this object.
    pub fn matrix_relative_to(&self, ancestor: &SceneObject) -> Mat4 {
        let mut matrix = self.matrix();
        let mut current = self.parent();
        while let Some(node) = current {
            if node.id == ancestor.id {
                return matrix;
            }
            matrix = node.matrix() * matrix;
            current = node.parent();
        }
        matrix
    }

    /// Visible mesh leaves of this object, placed in world space.
    pub fn visible_meshes(self: &Arc<Self>) -> Vec<MeshInstance> {
        let parent_world = self
            .parent()
            .map(|p| p.world_matrix())
            .unwrap_or(Mat4::IDENTITY);
        let mut out = Vec::new();
        collect_visible(self, parent_world, &mut out);
        out
    }

    /// Visible mesh leaves below this object, ignoring its own visibility,
    /// placed relative to it.
    pub fn visible_descendant_meshes(&self) -> Vec<MeshInstance> {
        let mut out = Vec::new();
        for child in self.children().iter() {
            collect_visible(child, Mat4::IDENTITY, &mut out);
        }
        out
    }

    /// World bounds of the visible meshes
    pub fn world_bounds(self: &Arc<Self>) -> BoundingBox {
        self.visible_meshes()
            .iter()
            .fold(BoundingBox::empty(), |bounds, instance| {
                bounds.union(&instance.mesh.bounds().transform(&instance.matrix))
            })
    }

    // ============== Invalidation ==============

    pub fn is_rebuild_locked(&self) -> bool {
        self.rebuild_locks.load(Ordering::Acquire) > 0
    }

    pub(crate) fn increment_rebuild_lock(&self) {
        self.rebuild_locks.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn decrement_rebuild_lock(&self) {
        self.rebuild_locks.fetch_sub(1, Ordering::AcqRel);
    }

    /// Raise a change originating at this object
    pub fn invalidate(self: &Arc<Self>, kind: InvalidateKind) {
        self.deliver(InvalidateArgs::new(self.id, kind));
    }

    /// Offer an event to this object, then to each ancestor until one
    /// handles it.
    pub fn deliver(self: &Arc<Self>, args: InvalidateArgs) {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            match &node.kind {
                ObjectKind::Operation(op) => {
                    if op.on_invalidate(&node, &args) == InvalidateResponse::Handled {
                        return;
                    }
                }
                ObjectKind::Root(counter) => {
                    counter.fetch_add(1, Ordering::AcqRel);
                }
                ObjectKind::Mesh | ObjectKind::SourceContainer => {}
            }
            current = node.parent();
        }
    }
}

fn collect_visible(node: &SceneNode, parent_matrix: Mat4, out: &mut Vec<MeshInstance>) {
    if !node.visible() {
        return;
    }
    let matrix = parent_matrix * node.matrix();
    let children = node.children();
    if children.is_empty() {
        if let Some(mesh) = node.mesh() {
            out.push(MeshInstance {
                object: node.clone(),
                mesh,
                matrix,
            });
        }
    } else {
        for child in children.iter() {
            collect_visible(child, matrix, out);
        }
    }
}

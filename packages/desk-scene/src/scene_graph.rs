//! Scene graph for the desk scene.
//!
//! Props are assembled as owned [`SceneNode`] trees by pure constructors and
//! then attached to the [`SceneGraph`] arena. The arena stores parent links and
//! child lists so world transforms can be resolved by walking up the chain,
//! and it is cleared en masse when the scene is unmounted.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{EulerRot, Mat4, Vec3};

use crate::geometry::Geometry;
use crate::material::Material;

/// Unique identifier for scene entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Parent-relative transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3, // Euler angles in radians, applied X then Y then Z
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Local matrix: Translation * Rotation * Scale.
    pub fn matrix(&self) -> Mat4 {
        let rotation = glam::Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// A drawable attached to a node: shared geometry + shared material.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Owned node tree produced by prop constructors before attachment.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub visible: bool,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Empty transform node.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            visible: true,
            children: Vec::new(),
        }
    }

    /// Node carrying a mesh. Shadows are off until requested.
    pub fn mesh(name: impl Into<String>, geometry: Arc<Geometry>, material: Arc<Material>) -> Self {
        Self {
            mesh: Some(Mesh {
                geometry,
                material,
                cast_shadow: false,
                receive_shadow: false,
            }),
            ..Self::group(name)
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = Vec3::new(x, y, z);
        self
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.rotation = Vec3::new(x, y, z);
        self
    }

    pub fn casts_shadow(mut self) -> Self {
        if let Some(mesh) = &mut self.mesh {
            mesh.cast_shadow = true;
        }
        self
    }

    pub fn receives_shadow(mut self) -> Self {
        if let Some(mesh) = &mut self.mesh {
            mesh.receive_shadow = true;
        }
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    /// Mesh-bearing nodes in this subtree.
    pub fn mesh_count(&self) -> usize {
        usize::from(self.mesh.is_some())
            + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Number of direct children whose name starts with `prefix`.
    pub fn count_children(&self, prefix: &str) -> usize {
        self.children.iter().filter(|c| c.name.starts_with(prefix)).count()
    }
}

/// Node as stored in the arena.
#[derive(Debug, Clone)]
pub struct SceneEntity {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub visible: bool,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl SceneEntity {
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }
}

/// A mesh ready to draw, with its resolved world matrix.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    pub id: EntityId,
    pub mesh: &'a Mesh,
    pub world: Mat4,
}

/// Arena holding every node of a mounted scene.
#[derive(Debug)]
pub struct SceneGraph {
    entities: HashMap<EntityId, SceneEntity>,
    root: EntityId,
    next_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut graph = Self {
            entities: HashMap::new(),
            root: EntityId(0),
            next_id: 0,
        };
        graph.root = graph.insert(SceneNode::group("root"), None);
        graph
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    fn insert(&mut self, node: SceneNode, parent: Option<EntityId>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let SceneNode {
            name,
            transform,
            mesh,
            visible,
            children,
        } = node;

        self.entities.insert(
            id,
            SceneEntity {
                name,
                transform,
                mesh,
                visible,
                parent,
                children: Vec::with_capacity(children.len()),
            },
        );

        for child in children {
            let child_id = self.insert(child, Some(id));
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.children.push(child_id);
            }
        }

        id
    }

    /// Attach an owned subtree under `parent`. Returns `None` if the parent does not exist.
    pub fn attach(&mut self, parent: EntityId, node: SceneNode) -> Option<EntityId> {
        if !self.entities.contains_key(&parent) {
            return None;
        }
        let id = self.insert(node, Some(parent));
        if let Some(p) = self.entities.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Attach an owned subtree directly under the root.
    pub fn attach_to_root(&mut self, node: SceneNode) -> EntityId {
        let root = self.root;
        let id = self.insert(node, Some(root));
        if let Some(r) = self.entities.get_mut(&root) {
            r.children.push(id);
        }
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SceneEntity> {
        self.entities.get_mut(&id)
    }

    pub fn get_parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// First direct child of `parent` with the given name.
    pub fn find_child(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|e| e.name == name))
    }

    /// Compute the world transform matrix for an entity, walking up the parent chain.
    pub fn world_matrix(&self, id: EntityId) -> Mat4 {
        let Some(entity) = self.entities.get(&id) else {
            return Mat4::IDENTITY;
        };
        let local = entity.transform.matrix();
        match entity.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Check that an entity and all of its ancestors are visible.
    pub fn is_visible(&self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        if !entity.visible {
            return false;
        }
        match entity.parent {
            Some(parent) => self.is_visible(parent),
            None => true,
        }
    }

    /// Every visible mesh in depth-first attachment order.
    pub fn renderables(&self) -> Vec<RenderItem<'_>> {
        let mut out = Vec::new();
        self.collect(self.root, Mat4::IDENTITY, &mut out);
        out
    }

    fn collect<'a>(&'a self, id: EntityId, parent_world: Mat4, out: &mut Vec<RenderItem<'a>>) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if !entity.visible {
            return;
        }
        let world = parent_world * entity.transform.matrix();
        if let Some(mesh) = &entity.mesh {
            out.push(RenderItem { id, mesh, world });
        }
        for child in &entity.children {
            self.collect(*child, world, out);
        }
    }

    /// Total node count, root included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when only the root remains.
    pub fn is_empty(&self) -> bool {
        self.entities.len() <= 1
    }

    /// Nodes in the subtree under `id`, including `id`.
    pub fn subtree_len(&self, id: EntityId) -> usize {
        if !self.entities.contains_key(&id) {
            return 0;
        }
        1 + self
            .children(id)
            .iter()
            .map(|c| self.subtree_len(*c))
            .sum::<usize>()
    }

    /// Drop every node except a fresh root.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_id = 0;
        self.root = self.insert(SceneNode::group("root"), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use std::f32::consts::FRAC_PI_2;

    fn cube() -> SceneNode {
        SceneNode::mesh(
            "cube",
            Arc::new(Geometry::cuboid(1.0, 1.0, 1.0)),
            Arc::new(Material::lambert(Color::WHITE)),
        )
    }

    #[test]
    fn test_new_graph_has_root() {
        let graph = SceneGraph::new();
        assert_eq!(graph.len(), 1);
        assert!(graph.is_empty());
        assert!(graph.get(graph.root()).is_some());
        assert_eq!(graph.get_parent(graph.root()), None);
    }

    #[test]
    fn test_attach_subtree_links_parents() {
        let mut graph = SceneGraph::new();
        let prop = SceneNode::group("prop")
            .with_child(cube().at(1.0, 0.0, 0.0))
            .with_child(cube().at(-1.0, 0.0, 0.0));
        let id = graph.attach_to_root(prop);

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.children(id).len(), 2);
        for child in graph.children(id) {
            assert_eq!(graph.get_parent(*child), Some(id));
        }
        assert_eq!(graph.get_parent(id), Some(graph.root()));
        assert_eq!(graph.subtree_len(id), 3);
    }

    #[test]
    fn test_attach_to_missing_parent() {
        let mut graph = SceneGraph::new();
        assert!(graph.attach(EntityId(999), cube()).is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_world_matrix_composes_parent() {
        let mut graph = SceneGraph::new();
        let id = graph.attach_to_root(
            SceneNode::group("parent")
                .at(0.0, 2.0, 0.0)
                .rotated(0.0, FRAC_PI_2, 0.0)
                .with_child(cube().at(1.0, 0.0, 0.0)),
        );
        let child = graph.children(id)[0];
        let world = graph.world_matrix(child).transform_point3(Vec3::ZERO);
        // +X rotated a quarter turn about Y lands on -Z
        assert!((world - Vec3::new(0.0, 2.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_renderables_skip_hidden_subtrees() {
        let mut graph = SceneGraph::new();
        let mut hidden = SceneNode::group("hidden").with_child(cube());
        hidden.visible = false;
        graph.attach_to_root(hidden);
        graph.attach_to_root(cube());

        assert_eq!(graph.renderables().len(), 1);
    }

    #[test]
    fn test_is_visible_checks_ancestors() {
        let mut graph = SceneGraph::new();
        let id = graph.attach_to_root(SceneNode::group("g").with_child(cube()));
        let child = graph.children(id)[0];
        assert!(graph.is_visible(child));
        if let Some(e) = graph.get_mut(id) {
            e.visible = false;
        }
        assert!(!graph.is_visible(child));
    }

    #[test]
    fn test_find_child() {
        let mut graph = SceneGraph::new();
        let id = graph.attach_to_root(SceneNode::group("desk"));
        assert_eq!(graph.find_child(graph.root(), "desk"), Some(id));
        assert_eq!(graph.find_child(graph.root(), "lamp"), None);
    }

    #[test]
    fn test_clear_resets_to_root() {
        let mut graph = SceneGraph::new();
        graph.attach_to_root(SceneNode::group("a").with_child(cube()));
        graph.clear();
        assert_eq!(graph.len(), 1);
        assert!(graph.renderables().is_empty());
    }

    #[test]
    fn test_node_helpers() {
        let node = SceneNode::group("books")
            .with_child(cube())
            .with_child(SceneNode::group("book-1").with_child(cube()));
        assert_eq!(node.node_count(), 4);
        assert_eq!(node.mesh_count(), 2);
        assert_eq!(node.count_children("book-"), 1);
        assert!(node.find("book-1").is_some());
    }
}

//! The user's current selection within a stage.
//!
//! Entries hold ids only and are resolved against a [`Stage`] on every access, so a selection
//! that outlives its objects simply stops resolving.

use crate::stage::{ObjectId, SceneObject, Stage, TransformRef};
use crate::transform::Transform;

/// Something the user can select: a whole object or a bare transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectableEntity {
    Object(ObjectId),
    Transform(TransformRef),
}

impl From<ObjectId> for SelectableEntity {
    fn from(id: ObjectId) -> Self {
        SelectableEntity::Object(id)
    }
}

impl From<TransformRef> for SelectableEntity {
    fn from(reference: TransformRef) -> Self {
        SelectableEntity::Transform(reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    None,
    Single,
    Multiple,
}

impl SelectionMode {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => SelectionMode::None,
            1 => SelectionMode::Single,
            _ => SelectionMode::Multiple,
        }
    }
}

/// Ordered selection; insertion order is kept for multi-select display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    entries: Vec<SelectableEntity>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection. Repeated entities keep their first position.
    pub fn select<I, E>(&mut self, entities: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<SelectableEntity>,
    {
        self.entries.clear();
        for entity in entities {
            let entity = entity.into();
            if !self.entries.contains(&entity) {
                self.entries.push(entity);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[SelectableEntity] {
        &self.entries
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mode(&self) -> SelectionMode {
        SelectionMode::from_count(self.entries.len())
    }

    fn single(&self) -> Option<SelectableEntity> {
        match self.entries.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn active_object_id(&self) -> Option<ObjectId> {
        match self.single()? {
            SelectableEntity::Object(id) => Some(id),
            SelectableEntity::Transform(_) => None,
        }
    }

    pub fn active_object<'a>(&self, stage: &'a Stage) -> Option<&'a SceneObject> {
        stage.object(self.active_object_id()?)
    }

    pub fn active_object_mut<'a>(&self, stage: &'a mut Stage) -> Option<&'a mut SceneObject> {
        stage.object_mut(self.active_object_id()?)
    }

    /// The active object's transform, or the single selected bare transform.
    pub fn active_transform<'a>(&self, stage: &'a Stage) -> Option<&'a Transform> {
        match self.single()? {
            SelectableEntity::Object(id) => stage.object(id).map(|object| &object.transform),
            SelectableEntity::Transform(reference) => stage.transform(reference),
        }
    }

    pub fn active_transform_mut<'a>(&self, stage: &'a mut Stage) -> Option<&'a mut Transform> {
        match self.single()? {
            SelectableEntity::Object(id) => stage.object_mut(id).map(|object| &mut object.transform),
            SelectableEntity::Transform(reference) => stage.transform_mut(reference),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{HelperTransform, SetLayer};
    use glam::Vec3;

    fn stage_with(objects: Vec<SceneObject>, helper: HelperTransform) -> Stage {
        let mut layer = SetLayer::new("base").with_helper(helper);
        layer.objects = objects;
        Stage::new("stg01", "data", None).with_layer(layer)
    }

    #[test]
    fn select_replaces_and_dedups() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut selection = SelectionSet::new();
        selection.select([a]);
        selection.select([b, a, b]);
        assert_eq!(selection.entries(), &[SelectableEntity::Object(b), SelectableEntity::Object(a)]);
        assert_eq!(selection.mode(), SelectionMode::Multiple);
    }

    #[test]
    fn multiple_selection_has_no_active_entity() {
        let one = SceneObject::new("Ring", Transform::default());
        let two = SceneObject::new("Spring", Transform::default());
        let (id_one, id_two) = (one.id, two.id);
        let stage = stage_with(vec![one, two], HelperTransform::new("cam", Transform::default()));
        let mut selection = SelectionSet::new();
        selection.select([id_one, id_two]);
        assert!(selection.active_object(&stage).is_none());
        assert!(selection.active_transform(&stage).is_none());
        selection.clear();
        assert!(selection.active_object(&stage).is_none());
        assert!(selection.active_transform(&stage).is_none());
    }

    #[test]
    fn bare_transform_is_active_without_object() {
        let helper = HelperTransform::new("cam", Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let helper_id = helper.id;
        let stage = stage_with(Vec::new(), helper);
        let mut selection = SelectionSet::new();
        selection.select([TransformRef::Helper(helper_id)]);
        assert!(selection.active_object(&stage).is_none());
        let transform = selection.active_transform(&stage).expect("helper transform");
        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn stale_ids_do_not_resolve() {
        let stage = Stage::empty();
        let mut selection = SelectionSet::new();
        selection.select([ObjectId::new()]);
        assert_eq!(selection.mode(), SelectionMode::Single);
        assert!(selection.active_object(&stage).is_none());
        assert!(selection.active_transform(&stage).is_none());
    }
}

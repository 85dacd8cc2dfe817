//! Undo/redo history built from reversible deltas.
//!
//! Instead of snapshotting the whole document per step, the history records
//! only what changed: an object addition (with the object's full snapshot) or
//! a batch of property changes. A cursor marks the last applied step; steps
//! past the cursor are redoable until a fresh edit truncates them.

use crate::error::{HistoryError, HistoryResult};
use crate::shapes::{DisplayObject, ObjectId, ObjectSnapshot, Property, PropertyValue};
use serde::{Deserialize, Serialize};

/// The ordered display list the history manager replays against.
pub trait DisplayList {
    /// Objects back to front.
    fn objects(&self) -> &[DisplayObject];

    /// Mutable access by position.
    fn object_mut(&mut self, index: usize) -> Option<&mut DisplayObject>;

    /// Append an object on top.
    fn insert_object(&mut self, object: DisplayObject);

    /// Remove the object at `index`.
    fn remove_object(&mut self, index: usize) -> Option<DisplayObject>;

    /// Schedule a re-render after a batch of changes.
    fn request_render(&mut self);
}

impl DisplayList for Vec<DisplayObject> {
    fn objects(&self) -> &[DisplayObject] {
        self
    }

    fn object_mut(&mut self, index: usize) -> Option<&mut DisplayObject> {
        self.get_mut(index)
    }

    fn insert_object(&mut self, object: DisplayObject) {
        self.push(object);
    }

    fn remove_object(&mut self, index: usize) -> Option<DisplayObject> {
        (index < self.len()).then(|| self.remove(index))
    }

    fn request_render(&mut self) {}
}

/// A property change as reported by a gesture, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDelta {
    pub property: Property,
    /// Position of the object in the display list.
    pub object_index: usize,
    /// Identity of the object, when it has one.
    pub object_id: Option<ObjectId>,
    pub old_value: Option<PropertyValue>,
    pub new_value: Option<PropertyValue>,
}

impl PropertyDelta {
    pub fn new(
        property: Property,
        object_index: usize,
        old_value: impl Into<Option<PropertyValue>>,
        new_value: impl Into<Option<PropertyValue>>,
    ) -> Self {
        Self {
            property,
            object_index,
            object_id: None,
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    pub fn with_object_id(mut self, id: Option<ObjectId>) -> Self {
        self.object_id = id;
        self
    }

    fn validate(&self) -> HistoryResult<PropertyChange> {
        let (Some(old_value), Some(new_value)) = (self.old_value, self.new_value) else {
            return Err(HistoryError::InvalidChanges(format!(
                "{} change on object {} is missing a value",
                self.property, self.object_index
            )));
        };
        if !self.property.accepts(&old_value) || !self.property.accepts(&new_value) {
            return Err(HistoryError::InvalidChanges(format!(
                "{} cannot hold {old_value} -> {new_value}",
                self.property
            )));
        }
        Ok(PropertyChange {
            property: self.property,
            object_index: self.object_index,
            object_id: self.object_id,
            old_value,
            new_value,
        })
    }
}

/// A validated property change stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: Property,
    pub object_index: usize,
    pub object_id: Option<ObjectId>,
    pub old_value: PropertyValue,
    pub new_value: PropertyValue,
}

/// One reversible delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEntry {
    Add {
        object_id: ObjectId,
        snapshot: ObjectSnapshot,
    },
    Change(PropertyChange),
}

/// One undo/redo-atomic batch of entries.
pub type HistoryStep = Vec<HistoryEntry>;

/// Records reversible deltas and replays them against a [`DisplayList`].
#[derive(Debug, Clone)]
pub struct HistoryManager {
    steps: Vec<HistoryStep>,
    /// Number of applied steps; the cursor is `applied - 1`.
    applied: usize,
    next_object_id: u64,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            applied: 0,
            next_object_id: 1,
        }
    }

    pub fn steps(&self) -> &[HistoryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the last applied step, or `None` when nothing is applied.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.steps.len()
    }

    #[cfg(test)]
    fn set_cursor(&mut self, cursor: Option<usize>) {
        self.applied = cursor.map_or(0, |c| (c + 1).min(self.steps.len()));
    }

    /// Forget every step.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.applied = 0;
    }

    /// Record that `object` was added to the display list.
    ///
    /// Assigns an identity if the object has none. Returns `false` without
    /// recording anything when the most recent applied step already adds this
    /// object with an equal snapshot, which happens when redo re-inserts an
    /// object and the backend reports it as added again.
    pub fn record_addition(&mut self, object: &mut DisplayObject) -> bool {
        let snapshot = object.snapshot();
        if self.is_current_addition(object.id(), &snapshot) {
            log::debug!("Skipping duplicate addition of {:?}", object.id());
            return false;
        }

        self.truncate_future();

        let object_id = match object.id() {
            Some(id) => {
                self.next_object_id = self.next_object_id.max(id.0 + 1);
                id
            }
            None => {
                let id = ObjectId(self.next_object_id);
                self.next_object_id += 1;
                object.assign_id(id);
                id
            }
        };

        self.steps.push(vec![HistoryEntry::Add { object_id, snapshot }]);
        self.applied += 1;
        log::debug!("Recorded addition of object {object_id}, cursor {:?}", self.cursor());
        true
    }

    /// Record a batch of co-occurring property changes as one step.
    ///
    /// Every delta must carry both values, of a kind the property accepts;
    /// otherwise nothing is recorded.
    pub fn record_property_changes(&mut self, batch: &[PropertyDelta]) -> HistoryResult<()> {
        if batch.is_empty() {
            return Err(HistoryError::InvalidChanges("empty change batch".to_string()));
        }
        let step = batch
            .iter()
            .map(|delta| delta.validate().map(HistoryEntry::Change))
            .collect::<HistoryResult<HistoryStep>>()?;

        self.truncate_future();
        self.steps.push(step);
        self.applied += 1;
        log::debug!("Recorded {} property change(s), cursor {:?}", batch.len(), self.cursor());
        Ok(())
    }

    /// Record a single property change.
    pub fn record_property_change(
        &mut self,
        property: Property,
        object_index: usize,
        old_value: PropertyValue,
        new_value: PropertyValue,
    ) -> HistoryResult<()> {
        self.record_property_changes(&[PropertyDelta::new(property, object_index, old_value, new_value)])
    }

    /// Reverse the step at the cursor.
    ///
    /// All entries of the step are reversed before the cursor moves; on error
    /// the cursor stays put and entries already reversed are not rolled back.
    pub fn undo<L: DisplayList + ?Sized>(&mut self, list: &mut L) -> HistoryResult<()> {
        let Some(cursor) = self.cursor() else {
            return Ok(());
        };

        for entry in &self.steps[cursor] {
            match entry {
                HistoryEntry::Add { object_id, snapshot } => {
                    if let Some(index) = find_added(list.objects(), *object_id, snapshot) {
                        list.remove_object(index);
                    }
                }
                HistoryEntry::Change(change) => {
                    let object = list
                        .object_mut(change.object_index)
                        .ok_or(HistoryError::MissingObject { index: change.object_index })?;
                    object.set(change.property, &change.old_value);
                    object.set_coords();
                }
            }
        }

        self.applied -= 1;
        list.request_render();
        log::debug!("Undo, cursor {:?}", self.cursor());
        Ok(())
    }

    /// Re-apply the step after the cursor.
    ///
    /// Re-added objects keep the identity they were first recorded with.
    pub fn redo<L: DisplayList + ?Sized>(&mut self, list: &mut L) -> HistoryResult<()> {
        if !self.can_redo() {
            return Ok(());
        }

        for entry in &self.steps[self.applied] {
            match entry {
                HistoryEntry::Add { object_id, snapshot } => {
                    list.insert_object(DisplayObject::restore(snapshot.clone(), *object_id));
                }
                HistoryEntry::Change(change) => {
                    let object = list
                        .object_mut(change.object_index)
                        .ok_or(HistoryError::MissingObject { index: change.object_index })?;
                    object.set(change.property, &change.new_value);
                    object.set_coords();
                }
            }
        }

        self.applied += 1;
        list.request_render();
        log::debug!("Redo, cursor {:?}", self.cursor());
        Ok(())
    }

    /// The last recorded value of `property` for an object.
    ///
    /// Walks applied steps from newest to oldest and returns the first write
    /// to that property for the object, or the value in the object's addition
    /// snapshot when there is none. `None` if the object was never recorded.
    pub fn last_property_value(&self, object_id: ObjectId, property: Property) -> Option<PropertyValue> {
        self.steps[..self.applied]
            .iter()
            .rev()
            .flat_map(|step| step.iter().rev())
            .find_map(|entry| match entry {
                HistoryEntry::Add { object_id: id, snapshot } if *id == object_id => {
                    Some(property.read(snapshot))
                }
                HistoryEntry::Change(change)
                    if change.property == property && change.object_id == Some(object_id) =>
                {
                    Some(change.new_value)
                }
                _ => None,
            })
    }

    fn is_current_addition(&self, id: Option<ObjectId>, snapshot: &ObjectSnapshot) -> bool {
        let (Some(id), Some(cursor)) = (id, self.cursor()) else {
            return false;
        };
        self.steps[cursor].iter().any(|entry| {
            matches!(entry, HistoryEntry::Add { object_id, snapshot: recorded }
                if *object_id == id && recorded == snapshot)
        })
    }

    fn truncate_future(&mut self) {
        if self.applied < self.steps.len() {
            log::debug!("Discarding {} redoable step(s)", self.steps.len() - self.applied);
            self.steps.truncate(self.applied);
        }
    }
}

/// Locate a recorded addition in the display list: by identity first, then by
/// snapshot equality for objects that never received one.
fn find_added(objects: &[DisplayObject], object_id: ObjectId, snapshot: &ObjectSnapshot) -> Option<usize> {
    objects
        .iter()
        .position(|o| o.id() == Some(object_id))
        .or_else(|| objects.iter().position(|o| o.id().is_none() && o.state() == snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{CompositeMode, PathShape, SerializableColor};
    use kurbo::{BezPath, Point};

    fn stroke(x: f64) -> DisplayObject {
        let mut path = BezPath::new();
        path.move_to(Point::new(x, 0.0));
        path.line_to(Point::new(x + 10.0, 10.0));
        DisplayObject::path_at(PathShape::stroked(path, SerializableColor::black(), 2.0))
    }

    /// Add an object the way the canvas does: insert, then record.
    fn add(history: &mut HistoryManager, list: &mut Vec<DisplayObject>, object: DisplayObject) {
        list.push(object);
        let last = list.len() - 1;
        history.record_addition(&mut list[last]);
    }

    fn num(v: f64) -> PropertyValue {
        PropertyValue::Number(v)
    }

    #[test]
    fn test_initial_state() {
        let history = HistoryManager::new();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_addition_assigns_id() {
        let mut history = HistoryManager::new();
        let mut object = stroke(0.0);
        assert!(history.record_addition(&mut object));
        assert_eq!(object.id(), Some(ObjectId(1)));
        assert_eq!(history.cursor(), Some(0));
        assert!(matches!(history.steps()[0][0], HistoryEntry::Add { object_id: ObjectId(1), .. }));

        let mut second = stroke(50.0);
        history.record_addition(&mut second);
        assert_eq!(second.id(), Some(ObjectId(2)));
    }

    #[test]
    fn test_duplicate_addition_is_ignored() {
        let mut history = HistoryManager::new();
        let mut object = stroke(0.0);
        history.record_addition(&mut object);
        let mut copy = object.clone();
        assert!(!history.record_addition(&mut copy));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_equal_new_object_is_recorded() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        add(&mut history, &mut list, stroke(0.0));
        add(&mut history, &mut list, stroke(0.0));
        assert_eq!(history.len(), 2);
        assert_ne!(list[0].id(), list[1].id());

        history.undo(&mut list).unwrap();
        history.undo(&mut list).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_redrawing_an_undone_object_replaces_redo() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        add(&mut history, &mut list, stroke(0.0));
        history.undo(&mut list).unwrap();

        add(&mut history, &mut list, stroke(0.0));
        assert_eq!(history.cursor(), Some(0));
        assert!(!history.can_redo());

        history.redo(&mut list).unwrap();
        assert_eq!(list.len(), 1);
        history.undo(&mut list).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_property_changes_recorded_as_one_step() {
        let mut history = HistoryManager::new();
        history.record_property_change(Property::ScaleX, 2, num(1.0), num(1.5)).unwrap();
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_invalid_changes_append_nothing() {
        let mut history = HistoryManager::new();
        let batch = [
            PropertyDelta::new(Property::Left, 0, num(1.0), num(2.0)),
            PropertyDelta::new(Property::Top, 0, None, num(2.0)),
        ];
        assert!(matches!(
            history.record_property_changes(&batch),
            Err(HistoryError::InvalidChanges(_))
        ));
        assert!(history.is_empty());

        let mismatched = [PropertyDelta::new(
            Property::Angle,
            0,
            num(0.0),
            PropertyValue::Composite(CompositeMode::DestinationOut),
        )];
        assert!(history.record_property_changes(&mismatched).is_err());
        assert!(history.record_property_changes(&[]).is_err());
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn test_new_addition_discards_redoable_steps() {
        let mut history = HistoryManager::new();
        history.record_property_change(Property::ScaleX, 0, num(1.0), num(2.0)).unwrap();
        history.record_property_change(Property::ScaleY, 0, num(2.0), num(3.0)).unwrap();
        history.set_cursor(Some(0));

        let mut object = stroke(0.0);
        history.record_addition(&mut object);

        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.len(), 2);
        assert!(matches!(&history.steps()[0][0], HistoryEntry::Change(c) if c.property == Property::ScaleX));
        assert!(matches!(history.steps()[1][0], HistoryEntry::Add { .. }));
    }

    #[test]
    fn test_new_change_discards_redoable_steps() {
        let mut history = HistoryManager::new();
        history.record_property_change(Property::ScaleX, 0, num(1.0), num(2.0)).unwrap();
        history.record_property_change(Property::ScaleY, 0, num(2.0), num(3.0)).unwrap();
        history.set_cursor(Some(0));

        history.record_property_change(Property::ScaleX, 0, num(2.0), num(3.0)).unwrap();

        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.len(), 2);
        assert!(matches!(&history.steps()[1][0], HistoryEntry::Change(c) if c.property == Property::ScaleX));
    }

    #[test]
    fn test_undo_removes_addition() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        add(&mut history, &mut list, stroke(0.0));

        history.undo(&mut list).unwrap();
        assert!(list.is_empty());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn test_undo_restores_old_value() {
        let mut history = HistoryManager::new();
        let mut list = vec![stroke(0.0)];
        list[0].set(Property::Left, &num(40.0));
        history.record_property_change(Property::Left, 0, num(0.0), num(40.0)).unwrap();

        history.undo(&mut list).unwrap();
        assert_eq!(list[0].get(Property::Left), num(0.0));
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn test_undo_and_redo_at_boundaries_are_noops() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        history.undo(&mut list).unwrap();
        assert_eq!(history.cursor(), None);

        add(&mut history, &mut list, stroke(0.0));
        history.redo(&mut list).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_undo_missing_object_fails() {
        let mut history = HistoryManager::new();
        let mut list: Vec<DisplayObject> = Vec::new();
        history.record_property_change(Property::Left, 3, num(0.0), num(1.0)).unwrap();
        assert_eq!(history.undo(&mut list), Err(HistoryError::MissingObject { index: 3 }));
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_redo_missing_object_fails() {
        let mut history = HistoryManager::new();
        let mut list = vec![stroke(0.0)];
        history.record_property_change(Property::Left, 0, num(0.0), num(1.0)).unwrap();
        history.undo(&mut list).unwrap();
        list.clear();
        assert_eq!(history.redo(&mut list), Err(HistoryError::MissingObject { index: 0 }));
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn test_undo_redo_many_additions_keeps_identity() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        for i in 0..5 {
            add(&mut history, &mut list, stroke(i as f64 * 20.0));
        }
        let original = list.clone();

        for _ in 0..5 {
            history.undo(&mut list).unwrap();
        }
        assert!(list.is_empty());

        for _ in 0..5 {
            history.redo(&mut list).unwrap();
            // the backend reports the re-insert as a new addition
            let last = list.len() - 1;
            assert!(!history.record_addition(&mut list[last]));
        }
        assert_eq!(list, original);
        assert_eq!(history.len(), 5);
        assert_eq!(history.cursor(), Some(4));
    }

    #[test]
    fn test_batch_undoes_atomically() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        add(&mut history, &mut list, stroke(0.0));
        {
            let p = list[0].presentation_mut();
            p.left = 10.0;
            p.top = 20.0;
            p.scale_x = 1.0;
        }

        let id = list[0].id();
        list[0].set(Property::Top, &num(15.0));
        list[0].set(Property::ScaleX, &num(2.0));
        let batch = [
            PropertyDelta::new(Property::Top, 0, num(20.0), num(15.0)).with_object_id(id),
            PropertyDelta::new(Property::ScaleX, 0, num(1.0), num(2.0)).with_object_id(id),
        ];
        history.record_property_changes(&batch).unwrap();

        history.undo(&mut list).unwrap();
        assert_eq!(list[0].get(Property::Left), num(10.0));
        assert_eq!(list[0].get(Property::Top), num(20.0));
        assert_eq!(list[0].get(Property::ScaleX), num(1.0));

        history.redo(&mut list).unwrap();
        assert_eq!(list[0].get(Property::Top), num(15.0));
        assert_eq!(list[0].get(Property::ScaleX), num(2.0));
    }

    #[test]
    fn test_redo_after_new_step_has_nothing() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        add(&mut history, &mut list, stroke(0.0));
        add(&mut history, &mut list, stroke(20.0));
        history.undo(&mut list).unwrap();

        add(&mut history, &mut list, stroke(40.0));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        history.redo(&mut list).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_last_property_value() {
        let mut history = HistoryManager::new();
        let mut list = Vec::new();
        let mut object = stroke(0.0);
        object.presentation_mut().left = 5.0;
        add(&mut history, &mut list, object);
        let id = list[0].id().unwrap();

        assert_eq!(history.last_property_value(id, Property::Left), Some(num(5.0)));

        let delta = PropertyDelta::new(Property::Left, 0, num(5.0), num(9.0)).with_object_id(Some(id));
        history.record_property_changes(&[delta]).unwrap();
        // a change to another object must not leak into this one
        let other = PropertyDelta::new(Property::Left, 1, num(0.0), num(99.0)).with_object_id(Some(ObjectId(42)));
        history.record_property_changes(&[other]).unwrap();

        assert_eq!(history.last_property_value(id, Property::Left), Some(num(9.0)));
        assert_eq!(history.last_property_value(id, Property::Angle), Some(num(0.0)));
        assert_eq!(history.last_property_value(ObjectId(77), Property::Left), None);
    }
}

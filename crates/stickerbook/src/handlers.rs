//! Internal listeners that run on canvas events before user handlers.

use stickerbook_core::{HistoryManager, HistoryResult, Property, PropertyDelta};
use stickerbook_render::DrawingCanvas;

/// Freehand output is not manipulable: lock every added object that is not
/// an image.
pub fn disable_selectability(canvas: &mut DrawingCanvas, index: usize) {
    let Some(object) = canvas.object_mut(index) else {
        return;
    };
    if object.is_image() {
        return;
    }
    object.lock();
    canvas.request_render();
}

/// Record the object at `index` as added. Re-insertions by redo are skipped
/// by the history manager.
pub fn record_object_addition(history: &mut HistoryManager, canvas: &mut DrawingCanvas, index: usize) -> bool {
    canvas
        .object_mut(index)
        .is_some_and(|object| history.record_addition(object))
}

/// Record what a gesture changed on the object at `index` as one step.
///
/// Each tracked property is compared against its last recorded value; only
/// the ones that differ are recorded. Returns whether a step was added.
pub fn record_property_change(
    history: &mut HistoryManager,
    canvas: &DrawingCanvas,
    index: usize,
) -> HistoryResult<bool> {
    let Some(object) = canvas.object(index) else {
        return Ok(false);
    };
    let Some(id) = object.id() else {
        log::warn!("Modified object {index} was never recorded; ignoring");
        return Ok(false);
    };

    let batch: Vec<PropertyDelta> = Property::TRACKED
        .iter()
        .filter_map(|&property| {
            let new_value = object.get(property);
            let old_value = history.last_property_value(id, property);
            (old_value != Some(new_value))
                .then(|| PropertyDelta::new(property, index, old_value, new_value).with_object_id(Some(id)))
        })
        .collect();

    if batch.is_empty() {
        return Ok(false);
    }
    history.record_property_changes(&batch)?;
    Ok(true)
}

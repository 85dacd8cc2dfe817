//! Undo/redo behavior driven through the widget.

use kurbo::Point;
use stickerbook::core::{ObjectId, Property, PropertyValue, StickerbookConfig};
use stickerbook::{Container, PlaceOptions, Stickerbook};

fn config() -> StickerbookConfig {
    StickerbookConfig::from_json(
        r##"{
            "brush": { "enabled": ["pencil", "circle"], "widths": [4], "colors": ["#000000"] },
            "stickers": { "enabled": ["box.png"] }
        }"##,
    )
    .unwrap()
}

fn book() -> Stickerbook {
    Stickerbook::new(config(), Container::new(120, 120)).unwrap()
}

fn line(book: &mut Stickerbook, y: f64) {
    book.pointer_down(Point::new(10.0, y)).unwrap();
    book.pointer_move(Point::new(100.0, y)).unwrap();
    book.pointer_up(Point::new(100.0, y)).unwrap();
}

fn ids(book: &Stickerbook) -> Vec<Option<ObjectId>> {
    book.canvas().objects().iter().map(|o| o.id()).collect()
}

fn with_sticker() -> Stickerbook {
    let mut book = book();
    book.set_sticker("box.png").unwrap();
    let png = stickerbook::render::encode_png(&[9u8, 9, 9, 255].repeat(100), 10, 10).unwrap();
    book.image_loaded("box.png", &png).unwrap();
    book.place_sticker(PlaceOptions::at(10.0, 20.0)).unwrap();
    book
}

#[test]
fn undo_all_additions_then_redo_restores_identities() {
    let mut book = book();
    for i in 0..4 {
        line(&mut book, 10.0 + 20.0 * f64::from(i));
    }
    let before = ids(&book);
    assert_eq!(before.len(), 4);
    assert!(before.iter().all(Option::is_some));

    for _ in 0..4 {
        book.undo().unwrap();
    }
    assert!(book.canvas().objects().is_empty());
    assert!(book.canvas().lower().is_blank());

    for _ in 0..4 {
        book.redo().unwrap();
    }
    assert_eq!(ids(&book), before);
    // redo does not record the re-inserted objects again
    assert_eq!(book.history().len(), 4);
}

#[test]
fn undo_and_redo_are_noops_at_the_boundaries() {
    let mut book = book();
    book.undo().unwrap();
    assert_eq!(book.history().cursor(), None);

    line(&mut book, 30.0);
    book.redo().unwrap();
    assert_eq!(book.history().cursor(), Some(0));
    assert_eq!(book.canvas().objects().len(), 1);

    book.undo().unwrap().undo().unwrap();
    assert_eq!(book.history().cursor(), None);
    assert!(book.canvas().objects().is_empty());
}

#[test]
fn new_step_discards_redoable_steps() {
    let mut book = book();
    line(&mut book, 20.0);
    line(&mut book, 40.0);
    book.undo().unwrap();
    assert!(book.history().can_redo());

    line(&mut book, 60.0);
    assert_eq!(book.history().len(), 2);
    assert!(!book.history().can_redo());

    book.redo().unwrap();
    assert_eq!(book.canvas().objects().len(), 2);
}

#[test]
fn gesture_undoes_atomically() {
    let mut book = with_sticker();
    book.modify_object(0, |object| {
        let p = object.presentation_mut();
        p.top = 15.0;
        p.scale_x = 2.0;
    })
    .unwrap();
    assert_eq!(book.history().len(), 2);

    book.undo().unwrap();
    let object = &book.canvas().objects()[0];
    assert_eq!(object.get(Property::Left), PropertyValue::Number(10.0));
    assert_eq!(object.get(Property::Top), PropertyValue::Number(20.0));
    assert_eq!(object.get(Property::ScaleX), PropertyValue::Number(1.0));

    book.redo().unwrap();
    let object = &book.canvas().objects()[0];
    assert_eq!(object.get(Property::Top), PropertyValue::Number(15.0));
    assert_eq!(object.get(Property::ScaleX), PropertyValue::Number(2.0));
}

#[test]
fn unchanged_gesture_records_nothing() {
    let mut book = with_sticker();
    book.modify_object(0, |_| {}).unwrap();
    assert_eq!(book.history().len(), 1);
}

#[test]
fn clear_discards_history() {
    let mut book = with_sticker();
    book.modify_object(0, |object| object.presentation_mut().left = 50.0)
        .unwrap();
    book.clear().unwrap();
    assert!(book.history().is_empty());
    book.undo().unwrap();
    assert!(book.canvas().objects().is_empty());
}

#[test]
fn identical_stickers_are_undone_one_by_one() {
    let mut book = with_sticker();
    book.place_sticker(PlaceOptions::at(10.0, 20.0)).unwrap();
    assert_eq!(book.canvas().objects().len(), 2);
    assert_eq!(book.history().len(), 2);

    book.undo().unwrap().undo().unwrap();
    assert!(book.canvas().objects().is_empty());
}

#[test]
fn redrawing_an_undone_stroke_is_recorded() {
    let mut book = book();
    line(&mut book, 30.0);
    book.undo().unwrap();

    line(&mut book, 30.0);
    assert_eq!(book.history().cursor(), Some(0));
    assert!(!book.history().can_redo());

    book.redo().unwrap();
    assert_eq!(book.canvas().objects().len(), 1);
    book.undo().unwrap();
    assert!(book.canvas().objects().is_empty());
}

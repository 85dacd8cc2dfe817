//! Headless demo: draws a small scene and writes it out as a PNG.
//!
//! Usage: `stickerbook-demo [output.png]`

use kurbo::Point;
use std::collections::HashMap;
use stickerbook::core::{BrushConfig, StickerbookConfig};
use stickerbook::{Container, PlaceOptions, Stickerbook};

const CONFIG: &str = r##"{
    "brush": {
        "enabled": ["pencil", "marker", "spray", "circle", "pattern", "fill", "eraser"],
        "widths": [4, 12, 24],
        "colors": ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"]
    },
    "stickers": {
        "enabled": ["sun.png"],
        "controls": { "cornerColor": "#d62728", "cornerSize": 10 }
    },
    "background": {
        "enabled": ["sky.png"],
        "default": "sky.png",
        "positioning": "fit-width"
    },
    "containerBackground": "rgba(255, 255, 255, 1)"
}"##;

/// A solid-color PNG, optionally with a transparent margin.
fn swatch(width: u32, height: u32, rgba: [u8; 4], margin: u32) -> Result<Vec<u8>, stickerbook::render::RenderError> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let inside = x >= margin && y >= margin && x + margin < width && y + margin < height;
            data.extend_from_slice(if inside { &rgba } else { &[0, 0, 0, 0] });
        }
    }
    stickerbook::render::encode_png(&data, width, height)
}

fn images() -> Result<HashMap<String, Vec<u8>>, stickerbook::render::RenderError> {
    Ok(HashMap::from([
        ("sky.png".to_string(), swatch(32, 16, [200, 225, 255, 255], 0)?),
        ("sun.png".to_string(), swatch(40, 40, [255, 200, 0, 255], 4)?),
        ("dot.png".to_string(), swatch(8, 8, [120, 60, 200, 255], 1)?),
    ]))
}

fn drag(book: &mut Stickerbook, points: &[(f64, f64)]) -> stickerbook::Result<()> {
    let Some((&first, rest)) = points.split_first() else {
        return Ok(());
    };
    book.pointer_down(Point::from(first))?;
    for &point in rest {
        book.pointer_move(Point::from(point))?;
    }
    book.pointer_up(Point::from(points[points.len() - 1]))
}

fn run(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = images()?;
    let config = StickerbookConfig::from_json(CONFIG)?;
    let mut book = Stickerbook::new(config, Container::new(320, 240))?;
    book.run_until_idle(&mut loader)?;

    book.set_brush_width(12.0)?.set_color("#1f77b4")?;
    drag(&mut book, &[(20.0, 200.0), (80.0, 150.0), (140.0, 190.0), (200.0, 140.0)])?;

    book.set_brush("marker", None)?.set_color("#d62728")?;
    drag(&mut book, &[(30.0, 40.0), (120.0, 60.0), (200.0, 40.0)])?;

    book.set_brush("spray", None)?.set_brush_width(24.0)?;
    drag(&mut book, &[(250.0, 200.0), (280.0, 180.0), (300.0, 210.0)])?;

    book.set_brush("pattern", Some(BrushConfig::pattern(["dot.png"])))?;
    book.run_until_idle(&mut loader)?;
    drag(&mut book, &[(40.0, 100.0), (160.0, 100.0), (280.0, 100.0)])?;

    // a stroke we take back
    book.set_brush("circle", None)?;
    drag(&mut book, &[(10.0, 10.0), (310.0, 230.0)])?;
    book.undo()?;

    book.set_brush("fill", Some(BrushConfig::fill(true, 5, false)))?.set_color("#2ca02c")?;
    drag(&mut book, &[(300.0, 20.0)])?;
    book.run_until_idle(&mut loader)?;

    book.set_sticker("sun.png")?;
    book.run_until_idle(&mut loader)?;
    book.place_sticker(PlaceOptions::at(250.0, 30.0))?;

    log::info!(
        "Scene has {} objects and {} history steps",
        book.canvas().objects().len(),
        book.history().len()
    );
    std::fs::write(output, book.to_png()?)?;
    log::info!("Wrote {output}");
    book.destroy();
    Ok(())
}

fn main() {
    env_logger::init();
    let output = std::env::args().nth(1).unwrap_or_else(|| "stickerbook.png".to_string());
    if let Err(e) = run(&output) {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

use brandmark::batch::slogans_from_quotes;
use brandmark::quotes::Quote;
use brandmark::slogan::{Stage, header_origin};
use brandmark::{Config, FontRegistry, SloganComposer, SloganError};
use image::{Rgba, RgbaImage};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const FONTS: &str = "static/fonts";

fn fonts_available() -> bool {
    Path::new(FONTS).join("DejaVuSans.ttf").exists()
        && Path::new(FONTS).join("DejaVuSans-Bold.ttf").exists()
}

fn branded_config(extra: serde_json::Value) -> Config {
    let mut document = json!({
        "Background": {"Colour": [255, 125, 255]},
        "Font": {"Name": "DejaVuSans", "Size": 90, "Colour": [255, 255, 255]},
        "Borders": [10, 90, 25, 75],
        "Header": {"Text": "Quote Of The Day", "Font": "dejavusans-bold", "Size": 180},
        "Author": {"WidthPercent": 50},
        "Fonts": {"Folder": FONTS}
    });
    if let (Some(base), Some(extra)) = (document.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    Config::from_value(document).unwrap().config
}

#[test]
fn test_header_is_drawn_at_its_origin() {
    if !fonts_available() {
        return;
    }

    let config = branded_config(json!({}));
    let registry = FontRegistry::discover(Path::new(FONTS)).unwrap();
    let composer = SloganComposer::new(&config, &registry);

    let composition = composer.compose("Be here now", None).unwrap();
    let canvas = composition.canvas;
    assert_eq!(canvas.dimensions(), (2000, 2000));

    let header = registry.load("dejavusans-bold", 180.0).unwrap();
    let (width, height) = header.text_size("Quote Of The Day");
    let (x, y) = header_origin((2000, 2000));
    assert_eq!((x, y), (250, 100));

    let background = Rgba([255, 125, 255, 255]);
    let inked = (y as u32..y as u32 + height)
        .flat_map(|py| (x as u32..x as u32 + width).map(move |px| (px, py)))
        .any(|(px, py)| *canvas.get_pixel(px, py) != background);
    assert!(inked, "no header pixels found in the header box");

    // Far corner stays untouched
    assert_eq!(canvas.get_pixel(1999, 0), &background);
}

#[test]
fn test_quote_over_eight_lines_is_rejected() {
    if !fonts_available() {
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    // Text area only fits one word per line at this size
    let config = branded_config(json!({
        "Font": {"Name": "DejaVuSans", "Size": 150},
        "Borders": [45, 55, 10, 90]
    }));
    let registry = FontRegistry::discover(Path::new(FONTS)).unwrap();
    let composer = SloganComposer::new(&config, &registry);

    let output = temp_dir.path().join("rejected.png");
    let result = composer.run(
        "one two three four five six seven eight nine",
        None,
        &output,
    );

    assert!(matches!(result, Err(SloganError::QuoteTooLong(_))));
    assert!(!output.exists());
}

#[test]
fn test_full_slogan_with_author_and_logo() {
    if !fonts_available() {
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let logo_path = temp_dir.path().join("logo.png");
    RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255]))
        .save(&logo_path)
        .unwrap();

    let config = branded_config(json!({
        "Canvas": {"Width": 1000, "Height": 1000},
        "Font": {"Name": "DejaVuSans", "Size": 60, "Colour": [255, 255, 255]},
        "Header": {"Text": "Quote Of The Day", "Font": "dejavusans-bold", "Size": 90},
        "logo": {"path": logo_path, "size": 10, "alignX": "right", "alignY": "bottom"}
    }));
    let registry = FontRegistry::discover(Path::new(FONTS)).unwrap();
    let composer = SloganComposer::new(&config, &registry);

    let output = temp_dir.path().join("out").join("slogan.png");
    let report = composer
        .run(
            "The best way to predict the future is to invent it",
            Some("\"Alan Kay\""),
            &output,
        )
        .unwrap();

    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    let canvas = image::open(&output).unwrap().to_rgba8();

    // 10% of 1000px on the binding width: a 100x50 logo in the corner
    assert_eq!(canvas.get_pixel(999, 999), &Rgba([0, 0, 255, 255]));
    assert_eq!(canvas.get_pixel(900, 950), &Rgba([0, 0, 255, 255]));
    assert_ne!(canvas.get_pixel(899, 949), &Rgba([0, 0, 255, 255]));

    // Author caption sits in the lower-left part of the canvas
    let background = Rgba([255, 125, 255, 255]);
    let author_ink = (700..1000)
        .flat_map(|y| (0..500).map(move |x| (x, y)))
        .any(|(x, y)| *canvas.get_pixel(x, y) != background);
    assert!(author_ink);
}

/// Rightmost non-background column in the lower part of the canvas, where
/// only the author caption is drawn.
fn author_right_edge(canvas: &RgbaImage, from_row: u32) -> Option<u32> {
    let background = Rgba([255, 125, 255, 255]);
    (from_row..canvas.height())
        .flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
        .filter(|&(x, y)| *canvas.get_pixel(x, y) != background)
        .map(|(x, _)| x)
        .max()
}

fn author_config(width_percent: f32) -> Config {
    branded_config(json!({
        "Canvas": {"Width": 1000, "Height": 1000},
        "Font": {"Name": "DejaVuSans", "Size": 50, "Colour": [255, 255, 255]},
        "Header": {"Text": "Quote Of The Day", "Font": "dejavusans-bold", "Size": 90},
        "Author": {"WidthPercent": width_percent}
    }))
}

const LONG_AUTHOR: &str = "Bartholomew Fitzwilliam";

#[test]
fn test_long_author_shrinks_to_width_cap() {
    if !fonts_available() {
        return;
    }

    let config = author_config(20.0);
    let registry = FontRegistry::discover(Path::new(FONTS)).unwrap();
    let composition = SloganComposer::new(&config, &registry)
        .compose("Hi", Some(LONG_AUTHOR))
        .unwrap();
    assert!(composition.skipped.is_empty());

    // Caption starts at 5% of the width; the cap is 20% of 1000px
    let x = 50;
    let right = author_right_edge(&composition.canvas, 700).unwrap();
    assert!(right < x + 200, "caption reaches x={}", right);

    let full = registry.load("dejavusans", 50.0).unwrap();
    let (_, _, full_right, _) = full.ink_bounds(&format!("{}:", LONG_AUTHOR)).unwrap();
    assert!(full_right > 200);
}

#[test]
fn test_author_that_never_fits_keeps_original_size() {
    if !fonts_available() {
        return;
    }

    // 0.1% of 1000px leaves a single pixel, too narrow even at 2px
    let config = author_config(0.1);
    let registry = FontRegistry::discover(Path::new(FONTS)).unwrap();
    let composition = SloganComposer::new(&config, &registry)
        .compose("Hi", Some(LONG_AUTHOR))
        .unwrap();
    assert!(composition.skipped.is_empty());

    let original = registry.load("dejavusans", 50.0).unwrap();
    let (_, _, caption_right, _) = original
        .ink_bounds(&format!("{}:", LONG_AUTHOR))
        .unwrap();
    let expected = (50 + caption_right - 1) as u32;

    let right = author_right_edge(&composition.canvas, 700).unwrap();
    assert!(right <= expected, "caption reaches x={}", right);
    assert!(right + 3 >= expected, "caption stops at x={}", right);
}

#[test]
fn test_logo_without_fonts() {
    let temp_dir = TempDir::new().unwrap();
    let logo_path = temp_dir.path().join("logo.png");
    RgbaImage::from_pixel(40, 80, Rgba([255, 0, 0, 255]))
        .save(&logo_path)
        .unwrap();

    let config = branded_config(json!({
        "Canvas": {"Width": 200, "Height": 200},
        "Fonts": {"Folder": temp_dir.path()},
        "logo": {"path": logo_path, "size": 50, "alignX": "middle", "alignY": "top"}
    }));
    let registry = FontRegistry::discover(temp_dir.path()).unwrap();
    let composition = SloganComposer::new(&config, &registry)
        .compose("No fonts here", None)
        .unwrap();

    // Tall logo binds on height: 100px tall, 50px wide, centred at the top
    let canvas = composition.canvas;
    assert_eq!(canvas.get_pixel(75, 0), &Rgba([255, 0, 0, 255]));
    assert_eq!(canvas.get_pixel(124, 99), &Rgba([255, 0, 0, 255]));
    assert_eq!(canvas.get_pixel(74, 0), &Rgba([255, 125, 255, 255]));
    assert_eq!(canvas.get_pixel(75, 100), &Rgba([255, 125, 255, 255]));

    let skipped: Vec<Stage> = composition.skipped.iter().map(|s| s.stage).collect();
    assert_eq!(skipped, vec![Stage::DrawQuoteText, Stage::DrawHeader]);
}

#[test]
fn test_slogans_from_quotes_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = branded_config(json!({
        "Canvas": {"Width": 64, "Height": 64},
        "Fonts": {"Folder": temp_dir.path()}
    }));
    let registry = FontRegistry::default();
    let composer = SloganComposer::new(&config, &registry);

    let quotes = vec![
        Quote {
            text: "First".to_string(),
            author: None,
        },
        Quote {
            text: "Second".to_string(),
            author: Some("Someone".to_string()),
        },
    ];
    let output = temp_dir.path().join("slogans");
    let summary = slogans_from_quotes(&composer, &quotes, &output);

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert!(output.join("slogan_001.png").exists());
    assert!(output.join("slogan_002.png").exists());
}

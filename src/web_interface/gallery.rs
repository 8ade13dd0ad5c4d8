//! Gallery page rendering.
//!
//! Pure function from an ordered list of capture records to HTML. Markup is
//! built with `maud`, which escapes every interpolated value; the stylesheet and
//! the rotation script are embedded from `assets/`.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use rust_embed::RustEmbed;

use crate::error_handling::types::WebError;
use crate::storage::types::CaptureRecord;

const STYLESHEET: &str = "gallery.css";
const SCRIPT: &str = "gallery.js";

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct Assets;

fn asset(name: &str) -> Result<String, WebError> {
    let file = Assets::get(name).ok_or_else(|| WebError::TemplateMissing(name.into()))?;
    Ok(String::from_utf8_lossy(&file.data).into_owned())
}

/// Renders `records` in order, one `.capture` block each.
pub fn render_gallery(records: &[CaptureRecord]) -> Result<String, WebError> {
    let style = asset(STYLESHEET)?;
    let script = asset(SCRIPT)?;

    let page = html! {
        (DOCTYPE)
        html {
            head {
                title { "Shipped" }
                meta charset="utf-8";
                style { (PreEscaped(style)) }
            }
            body {
                div.container {
                    @for record in records {
                        (render_capture(record))
                    }
                }
                script { (PreEscaped(script)) }
            }
        }
    };
    Ok(page.into_string())
}

fn render_capture(record: &CaptureRecord) -> Markup {
    let timestamp = record
        .captured_at
        .format("%a %b %d %Y %H:%M:%S UTC")
        .to_string();
    html! {
        div.capture {
            div.overlay { (record.overlay) }
            div.timestamp { (timestamp) }
            div.key { (record.key) }
            img src=(format!("/captures/{}", record.artifact_name));
        }
    }
}

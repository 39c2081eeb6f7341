//! Typed view over the project's `<window>` element.

use crate::document::{NodeId, XmlDocument};

pub const DEFAULT_TITLE: &str = "My Game";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub width: i32,
    pub height: i32,
    pub scale: i32,
    /// Hex RGB without the leading `#`.
    pub draw_color: String,
    pub title: String,
    pub fps: i32,
    /// Filled in when the game is exported.
    pub default_room: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            scale: 2,
            draw_color: "000000".to_owned(),
            title: DEFAULT_TITLE.to_owned(),
            fps: 60,
            default_room: String::new(),
        }
    }
}

impl WindowConfig {
    /// Read from a window element. Missing or malformed numbers read as 0.
    pub fn read(doc: &XmlDocument, node: NodeId) -> Self {
        let int = |key: &str| -> i32 {
            doc.attribute(node, key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };
        let string = |key: &str| doc.attribute(node, key).unwrap_or_default().to_owned();
        Self {
            width: int("width"),
            height: int("height"),
            scale: int("scale"),
            draw_color: string("drawcolor"),
            title: string("title"),
            fps: int("fps"),
            default_room: string("defaultroom"),
        }
    }

    /// Write every field back as an attribute of `node`.
    pub fn write(&self, doc: &mut XmlDocument, node: NodeId) {
        doc.set_attribute(node, "width", self.width);
        doc.set_attribute(node, "height", self.height);
        doc.set_attribute(node, "scale", self.scale);
        doc.set_attribute(node, "drawcolor", &self.draw_color);
        doc.set_attribute(node, "title", &self.title);
        doc.set_attribute(node, "fps", self.fps);
        doc.set_attribute(node, "defaultroom", &self.default_room);
    }
}

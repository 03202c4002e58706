//! Slash-style block insertion menu.

use serde_json::{json, Value};

use super::blocks::{Block, BlockKind};

/// Width reserved for the menu when clamping it inside the viewport.
pub const MENU_WIDTH: f64 = 340.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    Media,
    Text,
    Layout,
}

impl BlockCategory {
    pub fn label(self) -> &'static str {
        match self {
            BlockCategory::Media => "Media",
            BlockCategory::Text => "Text",
            BlockCategory::Layout => "Layout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BlockCategory,
    pub kind: BlockKind,
}

impl BlockEntry {
    /// The block this entry inserts, with the entry's preset attributes.
    pub fn create_block(&self) -> Block {
        let attrs: Value = match self.id {
            "image-full" => json!({ "variant": "full" }),
            "image-16-9" => json!({ "variant": "16-9" }),
            "simple-text" => json!({ "variant": "simple" }),
            "about-section" => json!({ "variant": "about" }),
            "heading-2" => json!({ "level": 2 }),
            "heading-3" => json!({ "level": 3 }),
            _ => json!({}),
        };
        match attrs.as_object() {
            Some(map) => Block::from_attrs(self.kind, map),
            None => Block::new(self.kind),
        }
    }
}

const fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    category: BlockCategory,
    kind: BlockKind,
) -> BlockEntry {
    BlockEntry {
        id,
        name,
        description,
        icon,
        category,
        kind,
    }
}

pub static CATALOG: [BlockEntry; 11] = [
    entry("image-full", "Image full width", "Edge-to-edge image", "🖼️", BlockCategory::Media, BlockKind::Image),
    entry("image-16-9", "Image 16:9", "Image cropped to a 16:9 ratio", "📐", BlockCategory::Media, BlockKind::Image),
    entry("image-grid", "Image grid", "Two-column grid of images", "🔲", BlockCategory::Media, BlockKind::ImageGrid),
    entry("rich-text", "Rich text", "Formatted paragraphs, lists and links", "📝", BlockCategory::Text, BlockKind::Text),
    entry("simple-text", "Simple text", "Plain paragraph", "✏️", BlockCategory::Text, BlockKind::Text),
    entry("heading-1", "Heading 1", "Large section title", "H1", BlockCategory::Text, BlockKind::Heading),
    entry("heading-2", "Heading 2", "Medium section title", "H2", BlockCategory::Text, BlockKind::Heading),
    entry("heading-3", "Heading 3", "Small section title", "H3", BlockCategory::Text, BlockKind::Heading),
    entry("testimony", "Testimony", "Client quote with author", "💬", BlockCategory::Text, BlockKind::Testimony),
    entry("video", "Video", "Embedded video player", "🎥", BlockCategory::Media, BlockKind::Video),
    entry("about-section", "About section", "Introduction text block", "👤", BlockCategory::Layout, BlockKind::Text),
];

pub fn find_entry(id: &str) -> Option<&'static BlockEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

/// Case-insensitive substring match over name and description, in catalog order.
pub fn filter(query: &str) -> Vec<&'static BlockEntry> {
    let needle = query.trim().to_lowercase();
    CATALOG
        .iter()
        .filter(|e| {
            needle.is_empty() || e.name.to_lowercase().contains(&needle) || e.description.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    Selected(&'static str),
    Close,
}

#[derive(Debug, Default)]
pub struct BlockMenu {
    open: bool,
    query: String,
    selected: usize,
    position: Point,
}

impl BlockMenu {
    pub fn new() -> Self {
        BlockMenu::default()
    }

    /// Opens at `at`, pulled left so the menu stays inside the viewport.
    pub fn open(&mut self, at: Point, viewport_width: f64) {
        self.open = true;
        self.query.clear();
        self.selected = 0;
        self.position = Point {
            x: at.x.min(viewport_width - MENU_WIDTH).max(0.0),
            y: at.y,
        };
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn set_query(&mut self, query: &str) {
        if !self.open {
            return;
        }
        if self.query != query {
            self.query = query.to_string();
            self.selected = 0;
        }
    }

    pub fn results(&self) -> Vec<&'static BlockEntry> {
        filter(&self.query)
    }

    /// Results grouped by category, groups in first-seen order.
    pub fn grouped(&self) -> Vec<(BlockCategory, Vec<&'static BlockEntry>)> {
        let mut groups: Vec<(BlockCategory, Vec<&'static BlockEntry>)> = Vec::new();
        for e in self.results() {
            match groups.iter_mut().find(|(cat, _)| *cat == e.category) {
                Some((_, items)) => items.push(e),
                None => groups.push((e.category, vec![e])),
            }
        }
        groups
    }

    pub fn empty_message(&self) -> Option<String> {
        if self.results().is_empty() {
            Some(format!("No blocks found for \"{}\"", self.query))
        } else {
            None
        }
    }

    pub fn handle_key(&mut self, key: MenuKey) -> Option<MenuEvent> {
        if !self.open {
            return None;
        }
        let results = self.results();
        match key {
            MenuKey::ArrowDown if !results.is_empty() => {
                self.selected = (self.selected + 1) % results.len();
                None
            }
            MenuKey::ArrowUp if !results.is_empty() => {
                self.selected = (self.selected + results.len() - 1) % results.len();
                None
            }
            MenuKey::Enter => {
                let id = results.get(self.selected)?.id;
                self.close();
                Some(MenuEvent::Selected(id))
            }
            MenuKey::Escape => {
                self.close();
                Some(MenuEvent::Close)
            }
            _ => None,
        }
    }

    /// A press outside `menu_rect` closes the menu.
    pub fn handle_pointer_down(&mut self, at: Point, menu_rect: Rect) -> Option<MenuEvent> {
        if !self.open || menu_rect.contains(at) {
            return None;
        }
        self.close();
        Some(MenuEvent::Close)
    }
}

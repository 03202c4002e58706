//! Block kinds, their typed attributes and the HTML class contract of the
//! public site.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::editor::html::Element;
use crate::editor::node_views::NodeViewKind;
use crate::helper::sanitization_helpers;

/// Ratio modifier the site's stylesheet applies to every image that is not 16:9.
pub const IMAGE_RATIO_MODIFIER: &str = "w-variant-e18145a5-28b8-affd-e283-83a4aa5ff6de";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Image,
    Text,
    Testimony,
    Video,
    ImageGrid,
    Heading,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Image,
        BlockKind::Text,
        BlockKind::Testimony,
        BlockKind::Video,
        BlockKind::ImageGrid,
        BlockKind::Heading,
    ];

    /// Name the block is stored and looked up under.
    pub fn node_name(self) -> &'static str {
        match self {
            BlockKind::Image => "universalImage",
            BlockKind::Text => "universalText",
            BlockKind::Testimony => "testimony",
            BlockKind::Video => "universalVideo",
            BlockKind::ImageGrid => "imageGrid",
            BlockKind::Heading => "heading",
        }
    }

    /// Value of the `data-type` attribute on the rendered section.
    pub fn data_type(self) -> &'static str {
        match self {
            BlockKind::Image => "universal-image",
            BlockKind::Text => "universal-text",
            BlockKind::Testimony => "testimony",
            BlockKind::Video => "universal-video",
            BlockKind::ImageGrid => "image-grid",
            BlockKind::Heading => "heading",
        }
    }

    pub fn view(self) -> NodeViewKind {
        match self {
            BlockKind::Image => NodeViewKind::Image,
            BlockKind::Text => NodeViewKind::Text,
            BlockKind::Testimony => NodeViewKind::Testimony,
            BlockKind::Video => NodeViewKind::Video,
            BlockKind::ImageGrid => NodeViewKind::ImageGrid,
            BlockKind::Heading => NodeViewKind::Heading,
        }
    }

    pub fn default_attrs(self) -> BlockAttrs {
        match self {
            BlockKind::Image => BlockAttrs::Image(ImageAttrs::default()),
            BlockKind::Text => BlockAttrs::Text(TextAttrs::default()),
            BlockKind::Testimony => BlockAttrs::Testimony(TestimonyAttrs::default()),
            BlockKind::Video => BlockAttrs::Video(VideoAttrs::default()),
            BlockKind::ImageGrid => BlockAttrs::ImageGrid(ImageGridAttrs::default()),
            BlockKind::Heading => BlockAttrs::Heading(HeadingAttrs::default()),
        }
    }
}

/// Where a media attribute points. `Pending` marks a file picked in the
/// editor that has not been sent to the media API yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    Pending { upload_id: String },
}

impl MediaSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            MediaSource::Url(url) => Some(url),
            MediaSource::Pending { .. } => None,
        }
    }

    pub fn pending_id(&self) -> Option<&str> {
        match self {
            MediaSource::Pending { upload_id } => Some(upload_id),
            MediaSource::Url(_) => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(MediaSource::Url(s.trim().to_string())),
            Value::Object(map) => map
                .get("pendingUpload")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(|id| MediaSource::Pending {
                    upload_id: id.to_string(),
                }),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            MediaSource::Url(url) => Value::String(url.clone()),
            MediaSource::Pending { upload_id } => json!({ "pendingUpload": upload_id }),
        }
    }
}

fn source_value(source: &Option<MediaSource>) -> Value {
    source.as_ref().map(MediaSource::to_value).unwrap_or(Value::Null)
}

fn string_value(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_optional_string(value: Option<&Value>) -> Option<String> {
    coerce_string(value).filter(|s| !s.trim().is_empty())
}

fn coerce_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(default, |f| f != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" | "" => false,
            _ => default,
        },
        _ => default,
    }
}

fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_source(value: Option<&Value>) -> Option<MediaSource> {
    value.and_then(MediaSource::from_value)
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

string_enum!(ImageVariant { Auto => "auto", Ratio16x9 => "16-9", Full => "full" });
string_enum!(ImageSize { Small => "small", Medium => "medium", Large => "large" });
string_enum!(TextVariant { Rich => "rich", Simple => "simple", About => "about" });
string_enum!(GridLayout { TwoColumns => "2-columns", ThreeColumns => "3-columns" });
string_enum!(TextAlign { Left => "left", Center => "center", Right => "right", Justify => "justify" });

impl ImageVariant {
    /// Order the control strip cycles through.
    pub fn next(self) -> Self {
        match self {
            ImageVariant::Auto => ImageVariant::Ratio16x9,
            ImageVariant::Ratio16x9 => ImageVariant::Full,
            ImageVariant::Full => ImageVariant::Auto,
        }
    }
}

impl TextVariant {
    pub fn container_class(self) -> &'static str {
        match self {
            TextVariant::Rich => "temp-rich u-color-dark w-richtext",
            TextVariant::About => "temp-about_container",
            TextVariant::Simple => "temp-comp-text",
        }
    }
}

fn coerce_enum<T>(value: Option<&Value>, parse: fn(&str) -> Option<T>, default: T) -> T {
    coerce_string(value).and_then(|s| parse(s.trim())).unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttrs {
    pub src: Option<MediaSource>,
    pub alt: Option<String>,
    pub variant: ImageVariant,
    pub size: ImageSize,
}

impl Default for ImageAttrs {
    fn default() -> Self {
        ImageAttrs {
            src: None,
            alt: None,
            variant: ImageVariant::Auto,
            size: ImageSize::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAttrs {
    pub variant: TextVariant,
}

impl Default for TextAttrs {
    fn default() -> Self {
        TextAttrs {
            variant: TextVariant::Rich,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestimonyAttrs {
    pub quote: String,
    pub author_name: String,
    pub author_role: String,
    pub author_image: Option<MediaSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoAttrs {
    pub src: Option<MediaSource>,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub autoplay: bool,
    pub controls: bool,
    pub loop_playback: bool,
    pub muted: bool,
}

impl Default for VideoAttrs {
    fn default() -> Self {
        VideoAttrs {
            src: None,
            alt: None,
            title: None,
            autoplay: false,
            controls: true,
            loop_playback: false,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridImage {
    pub src: Option<MediaSource>,
    pub alt: Option<String>,
    pub has_video: bool,
    pub video_src: Option<String>,
}

impl GridImage {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(GridImage {
                src: coerce_source(map.get("src")),
                alt: coerce_optional_string(map.get("alt")),
                has_video: coerce_bool(map.get("hasVideo"), false),
                video_src: coerce_optional_string(map.get("videoSrc")),
            }),
            Value::String(_) => Some(GridImage {
                src: MediaSource::from_value(value),
                ..GridImage::default()
            }),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "src": source_value(&self.src),
            "alt": string_value(&self.alt),
            "hasVideo": self.has_video,
            "videoSrc": string_value(&self.video_src),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGridAttrs {
    pub images: Vec<GridImage>,
    pub layout: GridLayout,
}

impl Default for ImageGridAttrs {
    fn default() -> Self {
        ImageGridAttrs {
            images: Vec::new(),
            layout: GridLayout::TwoColumns,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingAttrs {
    /// 1 to 6.
    pub level: u8,
    pub text_align: TextAlign,
}

impl Default for HeadingAttrs {
    fn default() -> Self {
        HeadingAttrs {
            level: 1,
            text_align: TextAlign::Left,
        }
    }
}

/// Typed attributes, one variant per block kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockAttrs {
    Image(ImageAttrs),
    Text(TextAttrs),
    Testimony(TestimonyAttrs),
    Video(VideoAttrs),
    ImageGrid(ImageGridAttrs),
    Heading(HeadingAttrs),
}

impl BlockAttrs {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockAttrs::Image(_) => BlockKind::Image,
            BlockAttrs::Text(_) => BlockKind::Text,
            BlockAttrs::Testimony(_) => BlockKind::Testimony,
            BlockAttrs::Video(_) => BlockKind::Video,
            BlockAttrs::ImageGrid(_) => BlockKind::ImageGrid,
            BlockAttrs::Heading(_) => BlockKind::Heading,
        }
    }

    /// Coerces loosely typed values into the kind's attributes. Missing or
    /// unusable values take the default; unknown keys are ignored.
    pub fn from_map(kind: BlockKind, map: &Map<String, Value>) -> Self {
        match kind {
            BlockKind::Image => {
                let d = ImageAttrs::default();
                BlockAttrs::Image(ImageAttrs {
                    src: coerce_source(map.get("src")),
                    alt: coerce_optional_string(map.get("alt")),
                    variant: coerce_enum(map.get("variant"), ImageVariant::parse, d.variant),
                    size: coerce_enum(map.get("size"), ImageSize::parse, d.size),
                })
            }
            BlockKind::Text => BlockAttrs::Text(TextAttrs {
                variant: coerce_enum(map.get("variant"), TextVariant::parse, TextVariant::Rich),
            }),
            BlockKind::Testimony => BlockAttrs::Testimony(TestimonyAttrs {
                quote: coerce_string(map.get("quote")).unwrap_or_default(),
                author_name: coerce_string(map.get("authorName")).unwrap_or_default(),
                author_role: coerce_string(map.get("authorRole")).unwrap_or_default(),
                author_image: coerce_source(map.get("authorImage")),
            }),
            BlockKind::Video => {
                let d = VideoAttrs::default();
                BlockAttrs::Video(VideoAttrs {
                    src: coerce_source(map.get("src")),
                    alt: coerce_optional_string(map.get("alt")),
                    title: coerce_optional_string(map.get("title")),
                    autoplay: coerce_bool(map.get("autoplay"), d.autoplay),
                    controls: coerce_bool(map.get("controls"), d.controls),
                    loop_playback: coerce_bool(map.get("loop"), d.loop_playback),
                    muted: coerce_bool(map.get("muted"), d.muted),
                })
            }
            BlockKind::ImageGrid => BlockAttrs::ImageGrid(ImageGridAttrs {
                images: map
                    .get("images")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(GridImage::from_value).collect())
                    .unwrap_or_default(),
                layout: coerce_enum(map.get("layout"), GridLayout::parse, GridLayout::TwoColumns),
            }),
            BlockKind::Heading => BlockAttrs::Heading(HeadingAttrs {
                level: coerce_int(map.get("level")).map_or(1, |l| l.clamp(1, 6) as u8),
                text_align: coerce_enum(map.get("textAlign"), TextAlign::parse, TextAlign::Left),
            }),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let value = match self {
            BlockAttrs::Image(a) => json!({
                "src": source_value(&a.src),
                "alt": string_value(&a.alt),
                "variant": a.variant.as_str(),
                "size": a.size.as_str(),
            }),
            BlockAttrs::Text(a) => json!({ "variant": a.variant.as_str() }),
            BlockAttrs::Testimony(a) => json!({
                "quote": a.quote,
                "authorName": a.author_name,
                "authorRole": a.author_role,
                "authorImage": source_value(&a.author_image),
            }),
            BlockAttrs::Video(a) => json!({
                "src": source_value(&a.src),
                "alt": string_value(&a.alt),
                "title": string_value(&a.title),
                "autoplay": a.autoplay,
                "controls": a.controls,
                "loop": a.loop_playback,
                "muted": a.muted,
            }),
            BlockAttrs::ImageGrid(a) => json!({
                "images": a.images.iter().map(GridImage::to_value).collect::<Vec<_>>(),
                "layout": a.layout.as_str(),
            }),
            BlockAttrs::Heading(a) => json!({
                "level": a.level,
                "textAlign": a.text_align.as_str(),
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Every media source held by the block, in render order.
    pub fn media_sources_mut(&mut self) -> Vec<&mut MediaSource> {
        match self {
            BlockAttrs::Image(a) => a.src.iter_mut().collect(),
            BlockAttrs::Video(a) => a.src.iter_mut().collect(),
            BlockAttrs::Testimony(a) => a.author_image.iter_mut().collect(),
            BlockAttrs::ImageGrid(a) => a.images.iter_mut().filter_map(|img| img.src.as_mut()).collect(),
            BlockAttrs::Text(_) | BlockAttrs::Heading(_) => Vec::new(),
        }
    }

    pub fn media_sources(&self) -> Vec<&MediaSource> {
        match self {
            BlockAttrs::Image(a) => a.src.iter().collect(),
            BlockAttrs::Video(a) => a.src.iter().collect(),
            BlockAttrs::Testimony(a) => a.author_image.iter().collect(),
            BlockAttrs::ImageGrid(a) => a.images.iter().filter_map(|img| img.src.as_ref()).collect(),
            BlockAttrs::Text(_) | BlockAttrs::Heading(_) => Vec::new(),
        }
    }
}

/// One block of a document. `content` carries the child HTML of text
/// blocks and the plain text of headings.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub attrs: BlockAttrs,
    pub content: String,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Block {
            id: Uuid::new_v4().to_string(),
            attrs: kind.default_attrs(),
            content: String::new(),
        }
    }

    pub fn from_attrs(kind: BlockKind, attrs: &Map<String, Value>) -> Self {
        Block {
            id: Uuid::new_v4().to_string(),
            attrs: BlockAttrs::from_map(kind, attrs),
            content: String::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.attrs.kind()
    }

    /// Merges one attribute into the block, re-coercing the whole set.
    pub fn set_attr(&mut self, name: &str, value: Value) {
        let mut map = self.attrs.to_map();
        if map.contains_key(name) {
            map.insert(name.to_string(), value);
            self.attrs = BlockAttrs::from_map(self.kind(), &map);
        } else {
            log::debug!("Ignoring unknown attribute '{}' on {}", name, self.kind().node_name());
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "type": self.kind().node_name(),
            "attrs": Value::Object(self.attrs.to_map()),
            "content": self.content,
        })
    }

    pub fn render(&self) -> String {
        self.render_element().to_html()
    }

    pub fn render_element(&self) -> Element {
        let kind = self.kind();
        let mut section = Element::new("div").attr("data-type", kind.data_type()).class("section");
        if let BlockAttrs::Image(a) = &self.attrs {
            section = section.attr("data-wf--template-section-image--variant", a.variant.as_str());
        }

        let body = match &self.attrs {
            BlockAttrs::Image(a) => render_image(a),
            BlockAttrs::Text(a) => Element::new("div")
                .class(a.variant.container_class())
                .raw(sanitization_helpers::sanitize_rich_content(&self.content)),
            BlockAttrs::Testimony(a) => render_testimony(a),
            BlockAttrs::Video(a) => render_video(a),
            BlockAttrs::ImageGrid(a) => render_grid(a),
            BlockAttrs::Heading(a) => render_heading(a, &self.content),
        };

        section.child(Element::new("div").class("u-container").child(body))
    }
}

fn placeholder(class: &str, icon: &str, label: &str, source: Option<&MediaSource>) -> Element {
    let mut el = Element::new("div").class(class);
    if let Some(id) = source.and_then(MediaSource::pending_id) {
        el = el.attr("data-pending-upload", id);
    }
    el.child(Element::new("div").class(format!("{}-icon", class)).text(icon))
        .child(Element::new("div").class(format!("{}-text", class)).text(label))
}

fn comp_img(src: &str, alt: Option<&str>) -> Element {
    Element::new("img")
        .class("comp-img")
        .attr("data-wf--template-image--variant", "radius-16px")
        .attr("src", src)
        .attr("alt", alt.unwrap_or_default())
}

fn render_image(a: &ImageAttrs) -> Element {
    let container_class = match a.variant {
        ImageVariant::Full => "temp-img_container full-width".to_string(),
        _ => "temp-img_container".to_string(),
    };
    let frame_class = match a.variant {
        ImageVariant::Ratio16x9 => "temp-img".to_string(),
        _ => format!("temp-img {}", IMAGE_RATIO_MODIFIER),
    };
    let label = match a.variant {
        ImageVariant::Full => "Full-width image",
        ImageVariant::Ratio16x9 => "16:9 image",
        ImageVariant::Auto => "Standard image",
    };

    let inner = match a.src.as_ref().and_then(MediaSource::url) {
        Some(src) => comp_img(src, a.alt.as_deref()),
        None => placeholder("block-placeholder", "🖼️", label, a.src.as_ref()),
    };

    Element::new("div").class(container_class).child(
        Element::new("div")
            .class(frame_class)
            .child(Element::new("div").class("img-wrp").child(inner)),
    )
}

fn render_testimony(a: &TestimonyAttrs) -> Element {
    let mut profile = Element::new("div").class("testimony-profile");
    if let Some(src) = a.author_image.as_ref().and_then(MediaSource::url) {
        let alt = if a.author_name.is_empty() { "Author" } else { a.author_name.as_str() };
        profile = profile.child(
            Element::new("div").class("testimony-profile-img").child(
                Element::new("img")
                    .class("testimonial-img-item")
                    .attr("src", src)
                    .attr("alt", alt),
            ),
        );
    }
    let or = |value: &str, fallback: &str| {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    profile = profile
        .child(
            Element::new("div")
                .class("testimony-profile-name")
                .text(or(&a.author_name, "Author name")),
        )
        .child(
            Element::new("div")
                .class("testimony-profile-role")
                .text(or(&a.author_role, "Author role")),
        );

    Element::new("div")
        .class("temp-comp-testimony")
        .child(
            Element::new("h4")
                .class("testimony")
                .text(or(&a.quote, "Click to add a quote...")),
        )
        .child(profile)
}

fn render_video(a: &VideoAttrs) -> Element {
    let inner = match a.src.as_ref().and_then(MediaSource::url) {
        Some(src) => Element::new("video")
            .class("video")
            .attr("src", src)
            .attr("title", a.title.as_deref().or(a.alt.as_deref()).unwrap_or_default())
            .flag("controls", a.controls)
            .flag("autoplay", a.autoplay)
            .flag("loop", a.loop_playback)
            .flag("muted", a.muted),
        None => placeholder("video-placeholder", "🎥", "Click to add a video", a.src.as_ref()),
    };
    Element::new("div").class("video-wrp").child(inner)
}

fn render_grid(a: &ImageGridAttrs) -> Element {
    let cells = a.images.iter().map(|image| {
        let inner = match &image.src {
            Some(MediaSource::Pending { .. }) => placeholder("block-placeholder", "🖼️", "Uploading image", image.src.as_ref()),
            Some(MediaSource::Url(src)) => comp_img(src, image.alt.as_deref()),
            None => comp_img("", image.alt.as_deref()),
        };
        Element::new("div").class("img_grid-container").child(
            Element::new("div")
                .class("temp-img none-ratio")
                .child(Element::new("div").class("img-wrp").child(inner)),
        )
    });
    Element::new("div").class("temp-comp-img_grid").children(cells)
}

fn render_heading(a: &HeadingAttrs, text: &str) -> Element {
    let level = a.level.clamp(1, 6);
    let mut heading = Element::new(format!("h{}", level))
        .class("universal-heading")
        .attr("data-level", level.to_string());
    if a.text_align != TextAlign::Left {
        heading = heading.attr("style", format!("text-align: {}", a.text_align.as_str()));
    }
    heading.text(text)
}

/// Registered form of a block kind.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub kind: BlockKind,
    pub name: &'static str,
    pub data_type: &'static str,
    pub defaults: Map<String, Value>,
    pub view: NodeViewKind,
}

/// Lookup table from node name to node type, built once per editor.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    types: HashMap<&'static str, NodeType>,
}

impl BlockRegistry {
    /// A registry with every block kind registered.
    pub fn new() -> Self {
        let mut registry = BlockRegistry::default();
        for kind in BlockKind::ALL {
            registry.register(kind);
        }
        registry
    }

    /// Registers `kind` together with its editing view. Registering twice
    /// returns the existing entry.
    pub fn register(&mut self, kind: BlockKind) -> &NodeType {
        self.types.entry(kind.node_name()).or_insert_with(|| NodeType {
            kind,
            name: kind.node_name(),
            data_type: kind.data_type(),
            defaults: kind.default_attrs().to_map(),
            view: kind.view(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn view_for(&self, name: &str) -> Option<NodeViewKind> {
        self.lookup(name).map(|t| t.view)
    }

    /// Builds a block of the named type, or `None` for unregistered names.
    pub fn build(&self, name: &str, attrs: &Map<String, Value>) -> Option<Block> {
        self.lookup(name).map(|t| Block::from_attrs(t.kind, attrs))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

//! Block editor model used to author `Project.content`.
//!
//! A [`Document`] is an ordered list of typed [`Block`]s that renders to the
//! HTML class contract of the public site. Media picked in the editor is held
//! as a pending source until [`Document::resolve_uploads`] swaps in the URL
//! returned by the media API. Per-editor resources (cache, object URLs,
//! lazily loaded components, timings, viewport) live in [`EditorServices`].

pub mod blocks;
pub mod cache;
pub mod document;
pub mod html;
pub mod lazy_load;
pub mod memory;
pub mod menu;
pub mod node_views;
pub mod performance;
pub mod responsive;
pub mod services;

pub use blocks::{Block, BlockAttrs, BlockKind, BlockRegistry, MediaSource, NodeType};
pub use document::Document;
pub use menu::{BlockMenu, MenuEvent, MenuKey};
pub use node_views::{ControlAction, NodeView, NodeViewKind, ViewOutcome};
pub use services::{Clock, EditorServices, ManualClock, SystemClock};

use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::blocks::{Block, BlockRegistry, MediaSource};
use super::memory::MemoryManager;
use super::node_views::PendingUpload;

/// Ordered list of blocks; the unit that is saved as `Project.content`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Inserts at `index`, appending when the index is past the end.
    pub fn insert(&mut self, index: usize, block: Block) {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
    }

    pub fn remove(&mut self, id: &str) -> Option<Block> {
        let pos = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(pos))
    }

    /// Moves the block to `to` (clamped). Returns false for an unknown id.
    pub fn move_block(&mut self, id: &str, to: usize) -> bool {
        let Some(from) = self.blocks.iter().position(|b| b.id == id) else {
            return false;
        };
        let block = self.blocks.remove(from);
        let to = to.min(self.blocks.len());
        self.blocks.insert(to, block);
        true
    }

    pub fn to_html(&self) -> String {
        self.blocks.iter().map(Block::render).collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": "doc",
            "content": self.blocks.iter().map(Block::to_json).collect::<Vec<_>>(),
        })
    }

    /// Rebuilds a document from its JSON form. Blocks of unregistered types
    /// are skipped.
    pub fn from_json(value: &Value, registry: &BlockRegistry) -> Self {
        let empty = Vec::new();
        let items = value.get("content").and_then(Value::as_array).unwrap_or(&empty);
        let empty_attrs = Map::new();

        let blocks = items
            .iter()
            .filter_map(|item| {
                let name = item.get("type").and_then(Value::as_str).unwrap_or_default();
                let attrs = item.get("attrs").and_then(Value::as_object).unwrap_or(&empty_attrs);
                let Some(mut block) = registry.build(name, attrs) else {
                    log::warn!("Dropping block of unknown type '{}'", name);
                    return None;
                };
                if let Some(id) = item.get("id").and_then(Value::as_str) {
                    block.id = id.to_string();
                }
                if let Some(content) = item.get("content").and_then(Value::as_str) {
                    block.content = content.to_string();
                }
                Some(block)
            })
            .collect();

        Document { blocks }
    }

    /// Upload ids still waiting for a media URL, in document order.
    pub fn pending_uploads(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|b| b.attrs.media_sources())
            .filter_map(MediaSource::pending_id)
            .map(str::to_string)
            .collect()
    }

    /// Replaces pending sources with the URLs returned by the media API and
    /// revokes the previews of those uploads. Returns how many were resolved;
    /// ids missing from `urls` stay pending.
    pub fn resolve_uploads(
        &mut self,
        urls: &HashMap<String, String>,
        uploads: &[PendingUpload],
        memory: &mut MemoryManager,
    ) -> usize {
        let mut resolved = 0;
        for block in &mut self.blocks {
            for source in block.attrs.media_sources_mut() {
                let url = source.pending_id().and_then(|id| urls.get(id)).cloned();
                if let Some(url) = url {
                    *source = MediaSource::Url(url);
                    resolved += 1;
                }
            }
        }
        for upload in uploads.iter().filter(|u| urls.contains_key(&u.upload_id)) {
            memory.revoke_object_url(&upload.preview_url);
        }
        resolved
    }

    pub fn is_persistable(&self) -> bool {
        self.pending_uploads().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::blocks::BlockKind;
    use crate::editor::memory::NoopRevoker;
    use crate::editor::node_views::MediaKind;
    use crate::editor::services::ManualClock;
    use std::sync::Arc;

    fn pending_image(id: &str) -> Block {
        let attrs = json!({ "src": { "pendingUpload": id }, "variant": "full" });
        Block::from_attrs(BlockKind::Image, attrs.as_object().unwrap())
    }

    #[test]
    fn pending_uploads_block_saving_until_resolved() {
        let mut doc = Document::new();
        doc.push(pending_image("up-1"));
        let grid = json!({ "images": [{ "src": "/uploads/a.webp" }, { "src": { "pendingUpload": "up-2" } }] });
        doc.push(Block::from_attrs(BlockKind::ImageGrid, grid.as_object().unwrap()));

        assert_eq!(doc.pending_uploads(), vec!["up-1", "up-2"]);
        assert!(!doc.is_persistable());

        let mut memory = MemoryManager::new(Arc::new(ManualClock::new(0)), Arc::new(NoopRevoker));
        let uploads: Vec<PendingUpload> = ["up-1", "up-2"]
            .iter()
            .map(|id| {
                memory.register_object_url(&format!("blob:{}", id), None);
                PendingUpload {
                    upload_id: id.to_string(),
                    file_name: format!("{}.png", id),
                    preview_url: format!("blob:{}", id),
                    media: MediaKind::Image,
                }
            })
            .collect();

        let mut urls = HashMap::new();
        urls.insert("up-1".to_string(), "/uploads/hero.webp".to_string());
        assert_eq!(doc.resolve_uploads(&urls, &uploads, &mut memory), 1);
        assert_eq!(doc.pending_uploads(), vec!["up-2"]);
        assert!(!memory.is_tracked("blob:up-1"));
        assert!(memory.is_tracked("blob:up-2"));

        urls.insert("up-2".to_string(), "/uploads/b.webp".to_string());
        assert_eq!(doc.resolve_uploads(&urls, &uploads, &mut memory), 1);
        assert_eq!(memory.stats().object_url_count, 0);
        assert!(doc.is_persistable());
        assert!(doc.to_html().contains("src=\"/uploads/hero.webp\""));
    }

    #[test]
    fn json_form_survives_and_drops_unknown_types() {
        let registry = BlockRegistry::new();
        let mut doc = Document::new();
        doc.push(Block::new(BlockKind::Heading).with_content("Intro"));
        doc.push(pending_image("up-9"));

        let mut value = doc.to_json();
        value["content"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "type": "carousel", "attrs": {} }));

        let restored = Document::from_json(&value, &registry);
        assert_eq!(restored, doc);
    }

    #[test]
    fn insert_move_and_remove() {
        let mut doc = Document::new();
        let a = Block::new(BlockKind::Text);
        let b = Block::new(BlockKind::Video);
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        doc.push(a);
        doc.insert(0, b);
        assert_eq!(doc.blocks()[0].id, b_id);

        assert!(doc.move_block(&b_id, 10));
        assert_eq!(doc.blocks()[1].id, b_id);
        assert!(!doc.move_block("missing", 0));

        assert_eq!(doc.remove(&a_id).map(|blk| blk.id), Some(a_id));
        assert_eq!(doc.len(), 1);
    }
}

/// Content blocks: the placeable units of a site canvas.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::BlockContent;
use crate::error::{BuilderError, Result};

/// Flat map of style property name to value for one breakpoint.
pub type StyleMap = BTreeMap<String, String>;

/// Opaque, immutable block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of block kinds.
///
/// Serialized as its lowercase name; deserialization accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlockType {
    Header,
    Menu,
    Gallery,
    Contact,
    Events,
    Hours,
}

impl BlockType {
    pub const ALL: [BlockType; 6] = [
        BlockType::Header,
        BlockType::Menu,
        BlockType::Gallery,
        BlockType::Contact,
        BlockType::Events,
        BlockType::Hours,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Header => "header",
            BlockType::Menu => "menu",
            BlockType::Gallery => "gallery",
            BlockType::Contact => "contact",
            BlockType::Events => "events",
            BlockType::Hours => "hours",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = BuilderError;

    /// Parses a type name case-insensitively (`"HEADER"`, `"header"`).
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        BlockType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| BuilderError::InvalidBlockType(s.to_string()))
    }
}

impl TryFrom<String> for BlockType {
    type Error = BuilderError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

/// Responsive breakpoints with independent style overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakpoint {
    Desktop,
    Tablet,
    Mobile,
}

/// One placeable unit on the site canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    id: BlockId,
    /// Position among siblings. Equal to the block's index after every edit.
    pub order: u32,
    /// Type-specific content. The variant fixes the block's type.
    pub content: BlockContent,
    pub styles: StyleMap,
    pub mobile_styles: StyleMap,
    pub tablet_styles: StyleMap,
    pub is_visible: bool,
}

impl ContentBlock {
    /// Creates a visible, unstyled block with a fresh id.
    pub fn new(content: BlockContent) -> Self {
        Self::with_id(BlockId::generate(), content)
    }

    /// Creates a block with a caller-supplied id.
    pub fn with_id(id: BlockId, content: BlockContent) -> Self {
        Self {
            id,
            order: 0,
            content,
            styles: StyleMap::new(),
            mobile_styles: StyleMap::new(),
            tablet_styles: StyleMap::new(),
            is_visible: true,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    /// The override map for one breakpoint.
    pub fn styles_for(&self, breakpoint: Breakpoint) -> &StyleMap {
        match breakpoint {
            Breakpoint::Desktop => &self.styles,
            Breakpoint::Tablet => &self.tablet_styles,
            Breakpoint::Mobile => &self.mobile_styles,
        }
    }

    /// Desktop styles with the breakpoint's overrides applied on top.
    pub fn effective_styles(&self, breakpoint: Breakpoint) -> StyleMap {
        let mut merged = self.styles.clone();
        if breakpoint != Breakpoint::Desktop {
            merged.extend(
                self.styles_for(breakpoint)
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        merged
    }

    /// Merges `patch` into this block.
    ///
    /// Content is replaced wholesale and must keep the block's type. Style
    /// entries are merged per property; an empty value removes the property.
    pub fn apply(&mut self, patch: BlockPatch) -> Result<()> {
        if let Some(content) = patch.content {
            let expected = self.block_type();
            let found = content.block_type();
            if expected != found {
                return Err(BuilderError::ContentTypeMismatch { expected, found });
            }
            content.validate()?;
            self.content = content;
        }
        merge_styles(&mut self.styles, patch.styles);
        merge_styles(&mut self.tablet_styles, patch.tablet_styles);
        merge_styles(&mut self.mobile_styles, patch.mobile_styles);
        if let Some(visible) = patch.is_visible {
            self.is_visible = visible;
        }
        Ok(())
    }
}

fn merge_styles(target: &mut StyleMap, overrides: Option<StyleMap>) {
    for (property, value) in overrides.into_iter().flatten() {
        if value.is_empty() {
            target.remove(&property);
        } else {
            target.insert(property, value);
        }
    }
}

/// Partial update for a block. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPatch {
    pub content: Option<BlockContent>,
    pub styles: Option<StyleMap>,
    pub tablet_styles: Option<StyleMap>,
    pub mobile_styles: Option<StyleMap>,
    pub is_visible: Option<bool>,
}

impl BlockPatch {
    pub fn content(content: BlockContent) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn visibility(visible: bool) -> Self {
        Self {
            is_visible: Some(visible),
            ..Default::default()
        }
    }

    /// Adds one style override for `breakpoint`.
    pub fn with_style(mut self, breakpoint: Breakpoint, property: &str, value: &str) -> Self {
        let map = match breakpoint {
            Breakpoint::Desktop => &mut self.styles,
            Breakpoint::Tablet => &mut self.tablet_styles,
            Breakpoint::Mobile => &mut self.mobile_styles,
        };
        map.get_or_insert_with(StyleMap::new)
            .insert(property.to_string(), value.to_string());
        self
    }
}

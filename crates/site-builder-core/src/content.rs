/// Type-specific block content and the default-content generator.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::block::BlockType;
use crate::error::{BuilderError, Result};

/// Largest number of gallery columns a layout supports.
const MAX_GALLERY_COLUMNS: u8 = 6;

/// Largest number of events an events block may list.
const MAX_EVENT_ITEMS: u8 = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderContent {
    pub title: String,
    pub subtitle: String,
    pub logo_url: Option<String>,
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
    /// Display price, already formatted ("12.50").
    pub price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSection {
    pub name: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuContent {
    pub title: String,
    pub sections: Vec<MenuSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryImage {
    pub url: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryContent {
    pub title: String,
    pub columns: u8,
    pub images: Vec<GalleryImage>,
}

impl Default for GalleryContent {
    fn default() -> Self {
        Self {
            title: String::new(),
            columns: 3,
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactContent {
    pub title: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub show_map: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsContent {
    pub title: String,
    pub max_items: u8,
    pub show_ticket_links: bool,
}

impl Default for EventsContent {
    fn default() -> Self {
        Self {
            title: String::new(),
            max_items: 3,
            show_ticket_links: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoursEntry {
    pub day: String,
    /// Opening time, "HH:MM".
    pub opens: String,
    /// Closing time, "HH:MM".
    pub closes: String,
    pub closed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoursContent {
    pub title: String,
    pub entries: Vec<HoursEntry>,
}

/// Block content, one shape per block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockContent {
    Header(HeaderContent),
    Menu(MenuContent),
    Gallery(GalleryContent),
    Contact(ContactContent),
    Events(EventsContent),
    Hours(HoursContent),
}

impl BlockContent {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Header(_) => BlockType::Header,
            BlockContent::Menu(_) => BlockType::Menu,
            BlockContent::Gallery(_) => BlockType::Gallery,
            BlockContent::Contact(_) => BlockType::Contact,
            BlockContent::Events(_) => BlockType::Events,
            BlockContent::Hours(_) => BlockType::Hours,
        }
    }

    /// Checks the shape constraints of this content.
    pub fn validate(&self) -> Result<()> {
        match self {
            BlockContent::Header(h) => {
                if h.title.trim().is_empty() {
                    return invalid("header title must not be empty");
                }
            }
            BlockContent::Menu(m) => {
                let unnamed = m
                    .sections
                    .iter()
                    .flat_map(|s| &s.items)
                    .any(|item| item.name.trim().is_empty());
                if unnamed {
                    return invalid("menu items must have a name");
                }
            }
            BlockContent::Gallery(g) => {
                if !(1..=MAX_GALLERY_COLUMNS).contains(&g.columns) {
                    return invalid(format!(
                        "gallery columns must be between 1 and {MAX_GALLERY_COLUMNS}, got {}",
                        g.columns
                    ));
                }
                if g.images.iter().any(|img| img.url.trim().is_empty()) {
                    return invalid("gallery images must have a url");
                }
            }
            BlockContent::Contact(c) => {
                if !c.email.is_empty() && !c.email.contains('@') {
                    return invalid(format!("contact email is malformed: {}", c.email));
                }
            }
            BlockContent::Events(e) => {
                if !(1..=MAX_EVENT_ITEMS).contains(&e.max_items) {
                    return invalid(format!(
                        "events max_items must be between 1 and {MAX_EVENT_ITEMS}, got {}",
                        e.max_items
                    ));
                }
            }
            BlockContent::Hours(h) => {
                if h.entries.len() > 7 {
                    return invalid("hours can list at most 7 days");
                }
                let mut seen = HashSet::new();
                for entry in &h.entries {
                    let day = entry.day.trim().to_ascii_lowercase();
                    if day.is_empty() {
                        return invalid("hours entries must name a day");
                    }
                    if !seen.insert(day) {
                        return invalid(format!("hours lists {} more than once", entry.day));
                    }
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<()> {
    Err(BuilderError::InvalidContent(message.into()))
}

/// Supplies the starting content for a newly placed block.
pub trait ContentDefaults {
    fn default_content(&self, block_type: BlockType) -> BlockContent;
}

/// Built-in placeholder content for each block type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockContent;

impl ContentDefaults for StockContent {
    fn default_content(&self, block_type: BlockType) -> BlockContent {
        match block_type {
            BlockType::Header => BlockContent::Header(HeaderContent {
                title: "Your Restaurant".to_string(),
                subtitle: "Fresh food, friendly faces".to_string(),
                ..Default::default()
            }),
            BlockType::Menu => BlockContent::Menu(MenuContent {
                title: "Menu".to_string(),
                sections: vec![MenuSection {
                    name: "Starters".to_string(),
                    items: vec![MenuItem {
                        name: "House salad".to_string(),
                        description: "Seasonal greens, vinaigrette".to_string(),
                        price: "8.00".to_string(),
                    }],
                }],
            }),
            BlockType::Gallery => BlockContent::Gallery(GalleryContent {
                title: "Gallery".to_string(),
                ..Default::default()
            }),
            BlockType::Contact => BlockContent::Contact(ContactContent {
                title: "Contact us".to_string(),
                show_map: true,
                ..Default::default()
            }),
            BlockType::Events => BlockContent::Events(EventsContent {
                title: "Upcoming events".to_string(),
                ..Default::default()
            }),
            BlockType::Hours => BlockContent::Hours(HoursContent {
                title: "Opening hours".to_string(),
                entries: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                    .iter()
                    .map(|day| HoursEntry {
                        day: day.to_string(),
                        opens: "11:00".to_string(),
                        closes: "22:00".to_string(),
                        closed: false,
                    })
                    .collect(),
            }),
        }
    }
}

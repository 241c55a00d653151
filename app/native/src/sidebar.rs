//! Sidebar fixtures and read-back views.
//!
//! A fixture is a JSON description of a room list that builds a [`Document`]
//! following a [`DomContract`]. Under the default contract:
//!
//! ```text
//! <ul id="RoomList">
//!   <li role="tab" aria-label="Alpha Chat">
//!     <ul>
//!       <li data-testid="unread-badge"><span>3</span></li>
//!     </ul>
//!   </li>
//! </ul>
//! ```
//!
//! A view reads a (possibly grouped) list back into plain data for printing
//! and assertions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DomContract;
use crate::constants::classes;
use crate::dom::{Document, DomError, ElementMatcher, NodeId};
use crate::error::GroupyError;
use crate::reconcile::snapshot::read_room;

// ============================================================================
// Fixtures
// ============================================================================

/// One room of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomFixture {
    /// Display name. Rooms without a name get no label attribute.
    #[serde(default)]
    pub name: Option<String>,
    /// Unread count shown in the badge.
    #[serde(default)]
    pub unread: u32,
    /// Whether the badge is the mention variant.
    #[serde(default)]
    pub mention: bool,
}

impl RoomFixture {
    /// Creates a named room.
    #[must_use]
    pub fn new(name: &str, unread: u32, mention: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            unread,
            mention,
        }
    }
}

/// A room list description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarFixture {
    /// Rooms in list order.
    pub rooms: Vec<RoomFixture>,
}

impl SidebarFixture {
    /// Reads a fixture from a JSON/JSONC file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GroupyError> {
        let file = fs::File::open(path)?;
        let reader = json_comments::StripComments::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds a document with the room list attached to the root.
    ///
    /// The list and its rooms carry the markup `contract` looks for, so the
    /// document can be read back with the same contract.
    ///
    /// # Errors
    ///
    /// Returns an error if a tree edit fails.
    pub fn build(&self, contract: &DomContract) -> Result<Document, DomError> {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        doc.set_attribute(list, "id", &contract.list_id)?;
        doc.append_child(doc.root(), list)?;

        for room in &self.rooms {
            let item = build_room(&mut doc, room, contract)?;
            doc.append_child(list, item)?;
        }
        Ok(doc)
    }
}

/// Builds a detached room entry following `contract`.
///
/// # Errors
///
/// Returns an error if a tree edit fails.
pub fn build_room(
    doc: &mut Document,
    room: &RoomFixture,
    contract: &DomContract,
) -> Result<NodeId, DomError> {
    let item = contract.room.create(doc)?;
    if let Some(name) = &room.name {
        doc.set_attribute(item, &contract.label_attribute, name)?;
    }

    if room.mention || room.unread > 0 {
        let badges = doc.create_element("ul");
        let matcher = if room.mention { &contract.mention_badge } else { &contract.unread_badge };
        let badge = matcher.create(doc)?;
        let count = doc.create_element("span");
        let text = doc.create_text(&room.unread.to_string());
        doc.append_child(count, text)?;
        doc.append_child(badge, count)?;
        doc.append_child(badges, badge)?;
        doc.append_child(item, badges)?;
    }
    Ok(item)
}

// ============================================================================
// Views
// ============================================================================

/// A room as seen in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    /// Label, if any.
    pub name: Option<String>,
    /// Unread count.
    pub unread: u32,
    /// Mention badge present.
    pub mention: bool,
}

/// A top-level entry of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntryView {
    /// A rendered group container.
    #[serde(rename_all = "camelCase")]
    Group {
        /// Header name.
        name: String,
        /// Unread total shown in the header.
        unread_total: u32,
        /// Mention indicator shown in the header.
        mention: bool,
        /// Expanded.
        open: bool,
        /// Member rooms in order.
        rooms: Vec<RoomView>,
    },
    /// An ungrouped room.
    Room(RoomView),
}

/// Reads the top level of the room list. Returns `None` if the list is missing.
#[must_use]
pub fn describe(doc: &Document, contract: &DomContract) -> Option<Vec<EntryView>> {
    let list = doc.element_by_id(&contract.list_id)?;
    let entries = doc
        .children(list)
        .iter()
        .filter_map(|&child| {
            if doc.has_class(child, classes::GROUP) {
                Some(describe_group(doc, child, contract))
            } else if contract.room.matches(doc, child) {
                Some(EntryView::Room(describe_room(doc, child, contract)))
            } else {
                None
            }
        })
        .collect();
    Some(entries)
}

fn describe_room(doc: &Document, room: NodeId, contract: &DomContract) -> RoomView {
    let info = read_room(doc, room, contract);
    RoomView {
        name: info.label,
        unread: info.unread,
        mention: info.has_mention,
    }
}

fn describe_group(doc: &Document, container: NodeId, contract: &DomContract) -> EntryView {
    let name = doc
        .query(container, &ElementMatcher::class(classes::NAME))
        .map(|node| doc.text_content(node))
        .unwrap_or_default();
    let unread_total = doc
        .query(container, &ElementMatcher::class(classes::UNREAD))
        .and_then(|node| doc.attribute(node, "data-count"))
        .and_then(|count| count.parse().ok())
        .unwrap_or(0);
    let mention = doc.query(container, &ElementMatcher::class(classes::MENTION)).is_some();
    let rooms = doc
        .query(container, &ElementMatcher::class(classes::CONTENT))
        .map(|content| {
            doc.children(content)
                .iter()
                .filter(|&&child| contract.room.matches(doc, child))
                .map(|&child| describe_room(doc, child, contract))
                .collect()
        })
        .unwrap_or_default();

    EntryView::Group {
        name,
        unread_total,
        mention,
        open: doc.has_class(container, classes::OPEN),
        rooms,
    }
}

/// Labels of every room in the list, in document order, including grouped ones.
#[must_use]
pub fn room_labels(doc: &Document, contract: &DomContract) -> Vec<Option<String>> {
    doc.element_by_id(&contract.list_id)
        .map(|list| {
            doc.query_all(list, &contract.room)
                .into_iter()
                .map(|room| doc.attribute(room, &contract.label_attribute).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

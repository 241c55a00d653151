//! Pre-rebuild snapshot: open state, unwrapping, and room render data.

use std::collections::HashSet;

use super::OpenState;
use crate::config::DomContract;
use crate::constants::classes;
use crate::dom::{Document, DomError, ElementMatcher, NodeId};
use crate::grouping::RoomInfo;

/// Everything a pass needs from the tree as it was before regrouping.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Names of groups that were open.
    pub open_groups: HashSet<String>,
    /// Number of group containers that were unwrapped.
    pub unwrapped: usize,
    /// Room entries in document order.
    pub rooms: Vec<NodeId>,
    /// Render data for each entry of `rooms`.
    pub infos: Vec<RoomInfo>,
}

/// Captures the snapshot and flattens the list.
///
/// After this returns, no group container remains under `list` and every room
/// entry sits directly where its container used to be.
///
/// # Errors
///
/// Returns an error if unwrapping a container fails.
pub fn take(
    doc: &mut Document,
    list: NodeId,
    contract: &DomContract,
    open_state: &OpenState,
    rendered: &[String],
) -> Result<Snapshot, DomError> {
    let open_groups = open_state.snapshot(rendered);
    let unwrapped = unwrap_groups(doc, list, contract)?;

    let rooms = doc.query_all(list, &contract.room);
    let infos = rooms.iter().map(|&room| read_room(doc, room, contract)).collect();

    Ok(Snapshot { open_groups, unwrapped, rooms, infos })
}

/// Moves the rooms of every group container back in front of it, then removes the container.
///
/// Returns the number of containers removed.
///
/// # Errors
///
/// Returns an error if a tree edit fails.
pub fn unwrap_groups(
    doc: &mut Document,
    list: NodeId,
    contract: &DomContract,
) -> Result<usize, DomError> {
    let containers = doc.query_all(list, &ElementMatcher::class(classes::GROUP));
    let content_matcher = ElementMatcher::class(classes::CONTENT);
    let mut removed = 0;

    for container in containers {
        // Nested containers go away with their parent.
        if !doc.is_connected(container) {
            continue;
        }
        let parent = doc.parent(container).unwrap_or(list);

        if let Some(content) = doc.query(container, &content_matcher) {
            let members: Vec<NodeId> = doc
                .children(content)
                .iter()
                .copied()
                .filter(|&child| contract.room.matches(doc, child))
                .collect();
            for member in members {
                doc.insert_before(parent, member, Some(container))?;
            }
        }

        doc.remove(container)?;
        removed += 1;
    }

    if removed > 0 {
        tracing::trace!(removed, "unwrapped group containers");
    }
    Ok(removed)
}

/// Reads a room's label, unread count and mention flag.
///
/// The count is taken from the mention badge when present, otherwise from the
/// plain unread badge. A mention badge marks the room even when its count is 0.
#[must_use]
pub fn read_room(doc: &Document, room: NodeId, contract: &DomContract) -> RoomInfo {
    let label = doc.attribute(room, &contract.label_attribute).map(String::from);
    let mention_badge = doc.query(room, &contract.mention_badge);
    let unread = mention_badge
        .or_else(|| doc.query(room, &contract.unread_badge))
        .map_or(0, |badge| parse_count(&doc.text_content(badge)));

    RoomInfo {
        label,
        unread,
        has_mention: mention_badge.is_some(),
    }
}

/// Parses the leading integer of a badge text, `0` when there is none.
///
/// `"12"`, `" 12"` and `"12+"` all read as 12. Negative values read as 0.
#[must_use]
pub fn parse_count(text: &str) -> u32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if negative || end == 0 {
        return 0;
    }
    digits[..end].parse().unwrap_or(u32::MAX)
}

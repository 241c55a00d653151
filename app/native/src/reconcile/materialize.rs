//! Group container rendering.
//!
//! Each container looks like:
//!
//! ```text
//! <div class="groupy-group [open]" data-group="Team A">
//!   <div class="groupy-header" style="background-color: ...; color: ...;">
//!     <span class="groupy-name">Team A</span>
//!     <span class="groupy-count">
//!       <span class="groupy-badge groupy-unread" title="Unread" data-count="3">Unread 3</span>
//!       <span class="groupy-badge groupy-mention" title="Mentioned">To</span>
//!     </span>
//!   </div>
//!   <div class="groupy-content"> ...rooms... </div>
//! </div>
//! ```

use std::sync::Arc;

use super::OpenState;
use super::snapshot::Snapshot;
use crate::constants::classes;
use crate::dom::{Document, DomError, NodeId};
use crate::grouping::{Assignment, Group};
use crate::rules::Rule;

/// Header colors used when a rule does not set its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Default header background.
    pub background: String,
    /// Default header text color.
    pub text: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: crate::constants::colors::DEFAULT_BACKGROUND.to_string(),
            text: crate::constants::colors::DEFAULT_TEXT.to_string(),
        }
    }
}

/// A container created by [`materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGroup {
    /// Group name.
    pub name: String,
    /// Container element.
    pub container: NodeId,
    /// Whether it was rendered open.
    pub open: bool,
}

/// Renders every group and inserts the containers into `list`.
///
/// The assignment indexes into `snapshot.rooms`. Containers end up first in
/// the list, in rule order, followed by the ungrouped rooms in their original
/// order. A group is rendered open if its name is in `snapshot.open_groups`.
///
/// # Errors
///
/// Returns an error if a tree edit fails.
pub fn materialize(
    doc: &mut Document,
    list: NodeId,
    rules: &[Rule],
    assignment: &Assignment,
    snapshot: &Snapshot,
    open_state: &OpenState,
    palette: &Palette,
) -> Result<Vec<RenderedGroup>, DomError> {
    let mut rendered = Vec::with_capacity(assignment.groups().len());

    for group in assignment.groups() {
        let rule = &rules[group.rule_index];
        let open = snapshot.open_groups.contains(&group.name);
        let container = build_container(doc, rule, group, open, open_state, palette)?;

        let content = doc
            .children(container)
            .last()
            .copied()
            .ok_or(DomError::UnknownNode(container))?;
        for &member in &group.members {
            doc.append_child(content, snapshot.rooms[member])?;
        }

        rendered.push(RenderedGroup { name: group.name.clone(), container, open });
    }

    insert_in_rule_order(doc, list, &rendered)?;

    tracing::trace!(groups = rendered.len(), "materialized groups");
    Ok(rendered)
}

/// Inserts containers at the front of the list, one after another.
fn insert_in_rule_order(
    doc: &mut Document,
    list: NodeId,
    rendered: &[RenderedGroup],
) -> Result<(), DomError> {
    let mut target = doc.first_child(list);

    for group in rendered {
        match target {
            Some(node) if doc.parent(node) == Some(list) => {
                doc.insert_before(list, group.container, Some(node))?;
            }
            _ => doc.append_child(list, group.container)?,
        }
        target = doc.next_sibling(group.container);
    }
    Ok(())
}

fn build_container(
    doc: &mut Document,
    rule: &Rule,
    group: &Group,
    open: bool,
    open_state: &OpenState,
    palette: &Palette,
) -> Result<NodeId, DomError> {
    let container = doc.create_element("div");
    doc.add_class(container, classes::GROUP)?;
    doc.set_attribute(container, "data-group", &group.name)?;
    if open {
        doc.add_class(container, classes::OPEN)?;
    }

    let header = doc.create_element("div");
    doc.add_class(header, classes::HEADER)?;
    let background = rule.background_color.as_deref().unwrap_or(&palette.background);
    let text = rule.text_color.as_deref().unwrap_or(&palette.text);
    doc.set_attribute(header, "style", &format!("background-color: {background}; color: {text};"))?;

    let name = element_with_text(doc, "span", &group.name)?;
    doc.add_class(name, classes::NAME)?;
    doc.append_child(header, name)?;

    let count = doc.create_element("span");
    doc.add_class(count, classes::COUNT)?;

    let unread = element_with_text(doc, "span", &format!("Unread {}", group.unread_total))?;
    doc.add_class(unread, classes::BADGE)?;
    doc.add_class(unread, classes::UNREAD)?;
    doc.set_attribute(unread, "title", "Unread")?;
    doc.set_attribute(unread, "data-count", &group.unread_total.to_string())?;
    doc.append_child(count, unread)?;

    if group.has_mention {
        let mention = element_with_text(doc, "span", "To")?;
        doc.add_class(mention, classes::BADGE)?;
        doc.add_class(mention, classes::MENTION)?;
        doc.set_attribute(mention, "title", "Mentioned")?;
        doc.append_child(count, mention)?;
    }
    doc.append_child(header, count)?;

    let toggle_state = open_state.clone();
    let toggle_name = group.name.clone();
    doc.add_click_listener(
        header,
        Arc::new(move |doc: &mut Document, _| match doc.toggle_class(container, classes::OPEN) {
            Ok(open) => toggle_state.set(&toggle_name, open),
            Err(err) => tracing::debug!(error = %err, "ignoring click on stale group header"),
        }),
    );

    let content = doc.create_element("div");
    doc.add_class(content, classes::CONTENT)?;

    doc.append_child(container, header)?;
    doc.append_child(container, content)?;
    Ok(container)
}

fn element_with_text(doc: &mut Document, tag: &str, text: &str) -> Result<NodeId, DomError> {
    let element = doc.create_element(tag);
    let text = doc.create_text(text);
    doc.append_child(element, text)?;
    Ok(element)
}

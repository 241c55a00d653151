//! Room-to-group assignment.
//!
//! This is the pure core of Groupy: given the ordered rule list and the flat
//! list of rooms, decide which group (if any) each room belongs to.
//!
//! # Matching
//!
//! A room matches a rule when its label contains at least one of the rule's
//! keywords (case-sensitive substring). Rules whose keywords are malformed
//! match nothing. Rooms without a label match nothing.
//!
//! # Precedence
//!
//! Rules are applied in list order and a matched room stays in the candidate
//! pool, so a later rule re-claims it (last match wins):
//!
//! ```text
//! rules: [X: "foo"], [Y: "foo"]
//! room:  "foobar"  ->  Y
//! ```
//!
//! Rules left without members produce no group.

use crate::rules::Rule;

/// Render data of one room, captured before grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomInfo {
    /// Display name, if the room has one.
    pub label: Option<String>,
    /// Unread message count.
    pub unread: u32,
    /// Whether the room shows a mention badge.
    pub has_mention: bool,
}

impl RoomInfo {
    /// Creates a labelled room.
    #[must_use]
    pub fn new(label: &str, unread: u32, has_mention: bool) -> Self {
        Self {
            label: Some(label.to_string()),
            unread,
            has_mention,
        }
    }
}

/// A non-empty group produced by [`group_rooms`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Position of the owning rule in the rule list.
    pub rule_index: usize,
    /// Group name taken from the rule.
    pub name: String,
    /// Indices of member rooms, in their original order.
    pub members: Vec<usize>,
    /// Sum of the members' unread counts.
    pub unread_total: u32,
    /// Whether any member shows a mention badge.
    pub has_mention: bool,
}

/// Result of a grouping run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    owners: Vec<Option<usize>>,
    groups: Vec<Group>,
}

impl Assignment {
    /// Non-empty groups in rule order.
    #[must_use]
    pub fn groups(&self) -> &[Group] { &self.groups }

    /// Index of the rule owning a room, if any.
    #[must_use]
    pub fn owner(&self, room: usize) -> Option<usize> { self.owners.get(room).copied().flatten() }

    /// Indices of rooms that stay in the flat list, in original order.
    #[must_use]
    pub fn ungrouped(&self) -> Vec<usize> {
        self.owners.iter().enumerate().filter(|(_, owner)| owner.is_none()).map(|(i, _)| i).collect()
    }

    /// Returns `true` if no room was grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.groups.is_empty() }
}

/// Assigns rooms to rule groups, last match winning.
#[must_use]
pub fn group_rooms(rules: &[Rule], rooms: &[RoomInfo]) -> Assignment {
    let mut owners: Vec<Option<usize>> = vec![None; rooms.len()];

    for (rule_index, rule) in rules.iter().enumerate() {
        if rule.is_malformed() {
            tracing::warn!(
                rule_id = rule.id,
                group = %rule.group_name,
                "skipping rule with malformed keywords"
            );
            continue;
        }

        for (room_index, room) in rooms.iter().enumerate() {
            if room.label.as_deref().is_some_and(|label| rule.matches(label)) {
                owners[room_index] = Some(rule_index);
            }
        }
    }

    let groups = rules
        .iter()
        .enumerate()
        .filter_map(|(rule_index, rule)| {
            let members: Vec<usize> = owners
                .iter()
                .enumerate()
                .filter(|(_, owner)| **owner == Some(rule_index))
                .map(|(room_index, _)| room_index)
                .collect();

            if members.is_empty() {
                return None;
            }

            let unread_total =
                members.iter().fold(0u32, |total, &i| total.saturating_add(rooms[i].unread));
            let has_mention = members.iter().any(|&i| rooms[i].has_mention);

            Some(Group {
                rule_index,
                name: rule.group_name.clone(),
                members,
                unread_total,
                has_mention,
            })
        })
        .collect();

    Assignment { owners, groups }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(assignment: &Assignment) -> Vec<&str> {
        assignment.groups().iter().map(|g| g.name.as_str()).collect()
    }

    // ========================================================================
    // Matching
    // ========================================================================

    #[test]
    fn test_single_rule_groups_matching_room() {
        let rules = vec![Rule::new(1, "Team A", &["Alpha"])];
        let rooms = vec![RoomInfo::new("Alpha Chat", 3, false), RoomInfo::new("Beta Chat", 0, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(names(&assignment), vec!["Team A"]);
        let group = &assignment.groups()[0];
        assert_eq!(group.members, vec![0]);
        assert_eq!(group.unread_total, 3);
        assert!(!group.has_mention);
        assert_eq!(assignment.ungrouped(), vec![1]);
    }

    #[test]
    fn test_any_keyword_matches() {
        let rules = vec![Rule::new(1, "Ops", &["deploy", "oncall"])];
        let rooms = vec![
            RoomInfo::new("deploy-prod", 0, false),
            RoomInfo::new("oncall rotation", 0, false),
            RoomInfo::new("random", 0, false),
        ];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(assignment.groups()[0].members, vec![0, 1]);
    }

    #[test]
    fn test_unlabelled_room_is_never_grouped() {
        let rules = vec![Rule::new(1, "All", &[""])];
        let rooms = vec![RoomInfo::default(), RoomInfo::new("named", 0, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(assignment.owner(0), None);
        assert_eq!(assignment.owner(1), Some(0));
    }

    #[test]
    fn test_malformed_rule_is_skipped() {
        let malformed: Rule =
            serde_json::from_str(r#"{ "groupName": "Broken", "keywords": "Alpha" }"#).unwrap();
        let rules = vec![malformed, Rule::new(2, "Team A", &["Alpha"])];
        let rooms = vec![RoomInfo::new("Alpha Chat", 1, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(names(&assignment), vec!["Team A"]);
        assert_eq!(assignment.groups()[0].rule_index, 1);
    }

    #[test]
    fn test_no_rules_groups_nothing() {
        let rooms = vec![RoomInfo::new("Alpha Chat", 1, true)];

        let assignment = group_rooms(&[], &rooms);

        assert!(assignment.is_empty());
        assert_eq!(assignment.ungrouped(), vec![0]);
    }

    // ========================================================================
    // Precedence
    // ========================================================================

    #[test]
    fn test_last_match_wins() {
        let rules = vec![Rule::new(1, "X", &["foo"]), Rule::new(2, "Y", &["foo"])];
        let rooms = vec![RoomInfo::new("foobar", 0, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(names(&assignment), vec!["Y"]);
        assert_eq!(assignment.owner(0), Some(1));
    }

    #[test]
    fn test_earlier_rule_keeps_rooms_not_reclaimed() {
        let rules = vec![Rule::new(1, "Chats", &["Chat"]), Rule::new(2, "Alpha", &["Alpha"])];
        let rooms = vec![
            RoomInfo::new("Alpha Chat", 2, false),
            RoomInfo::new("Beta Chat", 5, true),
        ];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(names(&assignment), vec!["Chats", "Alpha"]);
        assert_eq!(assignment.groups()[0].members, vec![1]);
        assert_eq!(assignment.groups()[0].unread_total, 5);
        assert_eq!(assignment.groups()[1].members, vec![0]);
        assert_eq!(assignment.groups()[1].unread_total, 2);
    }

    #[test]
    fn test_groups_follow_rule_order_not_room_order() {
        let rules = vec![Rule::new(1, "Second", &["b"]), Rule::new(2, "First", &["a"])];
        let rooms = vec![RoomInfo::new("a", 0, false), RoomInfo::new("b", 0, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(names(&assignment), vec!["Second", "First"]);
    }

    #[test]
    fn test_duplicate_group_names_render_separately() {
        let rules = vec![Rule::new(1, "Dup", &["a"]), Rule::new(2, "Dup", &["b"])];
        let rooms = vec![RoomInfo::new("a", 0, false), RoomInfo::new("b", 0, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(assignment.groups().len(), 2);
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    #[test]
    fn test_mention_without_unread_sets_indicator() {
        let rules = vec![Rule::new(1, "Team A", &["Alpha"])];
        let rooms = vec![RoomInfo::new("Alpha Chat", 0, true)];

        let assignment = group_rooms(&rules, &rooms);

        let group = &assignment.groups()[0];
        assert_eq!(group.unread_total, 0);
        assert!(group.has_mention);
    }

    #[test]
    fn test_unread_total_sums_members() {
        let rules = vec![Rule::new(1, "Team", &["team"])];
        let rooms = vec![
            RoomInfo::new("team-1", 4, false),
            RoomInfo::new("other", 100, true),
            RoomInfo::new("team-2", 7, false),
        ];

        let assignment = group_rooms(&rules, &rooms);

        let group = &assignment.groups()[0];
        assert_eq!(group.unread_total, 11);
        assert!(!group.has_mention);
    }

    #[test]
    fn test_unread_total_saturates() {
        let rules = vec![Rule::new(1, "Busy", &["busy"])];
        let rooms = vec![RoomInfo::new("busy-1", u32::MAX, false), RoomInfo::new("busy-2", 1, false)];

        let assignment = group_rooms(&rules, &rooms);

        assert_eq!(assignment.groups()[0].unread_total, u32::MAX);
    }
}

//! Internal constants for grouping and reconciliation.
//!
//! # Organization
//!
//! - `timing` - Debouncing and polling delays
//! - `colors` - Header colors used when a rule does not set its own
//! - `classes` - Class names of the rendered group containers
//! - `host` - Defaults of the host page contract

/// Timing constants for mutation handling and startup polling.
pub mod timing {
    /// Trailing-edge debounce applied to room list mutations (ms).
    ///
    /// The host re-renders badges and reorders rooms in bursts; one pass runs
    /// once the burst has been quiet for this long.
    pub const MUTATION_DEBOUNCE_MS: u64 = 500;

    /// Delay between retries while the room list is not rendered yet (ms).
    pub const LIST_POLL_INTERVAL_MS: u64 = 500;

    /// Debounce for rule file change events (ms).
    ///
    /// Editors often emit several events per save (temp file, rename, chmod).
    pub const RULE_FILE_DEBOUNCE_MS: u64 = 200;
}

/// Header colors used when a rule leaves them unset.
pub mod colors {
    /// Default header background.
    pub const DEFAULT_BACKGROUND: &str = "#f6f8fa";

    /// Default header text color.
    pub const DEFAULT_TEXT: &str = "#24292e";
}

/// Class names of rendered group containers.
pub mod classes {
    /// Outer group container.
    pub const GROUP: &str = "groupy-group";

    /// Marks an expanded group.
    pub const OPEN: &str = "open";

    /// Clickable header.
    pub const HEADER: &str = "groupy-header";

    /// Group name label inside the header.
    pub const NAME: &str = "groupy-name";

    /// Badge strip inside the header.
    pub const COUNT: &str = "groupy-count";

    /// Any header badge.
    pub const BADGE: &str = "groupy-badge";

    /// Unread total badge.
    pub const UNREAD: &str = "groupy-unread";

    /// Mention indicator badge.
    pub const MENTION: &str = "groupy-mention";

    /// Area holding the grouped rooms.
    pub const CONTENT: &str = "groupy-content";
}

/// Defaults of the host page contract.
pub mod host {
    /// `id` of the room list container.
    pub const ROOM_LIST_ID: &str = "RoomList";

    /// Tag of a room entry.
    pub const ROOM_TAG: &str = "li";

    /// `role` of a room entry.
    pub const ROOM_ROLE: &str = "tab";

    /// Attribute carrying the room's display name.
    pub const LABEL_ATTRIBUTE: &str = "aria-label";

    /// `data-testid` of the plain unread badge.
    pub const UNREAD_BADGE_TEST_ID: &str = "unread-badge";

    /// `data-testid` of the badge shown when the unread messages include a mention.
    pub const MENTION_BADGE_TEST_ID: &str = "unread-badge-with-mention";
}

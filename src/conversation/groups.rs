//! Grouping conversations by age for a sidebar-style listing.

use chrono::{DateTime, Duration, Local, TimeZone};

use crate::types::Conversation;

/// Age bucket of a conversation, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationGroup {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Older,
}

impl ConversationGroup {
    pub const ALL: [Self; 5] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
        Self::Older,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
            Self::Older => "Older",
        }
    }

    /// Bucket for a creation time, relative to `now`, using calendar days of `now`'s zone.
    pub fn classify<Tz: TimeZone>(created: &DateTime<Tz>, now: &DateTime<Tz>) -> Self {
        let created_day = created.date_naive();
        let today = now.date_naive();

        if created_day >= today {
            Self::Today
        } else if today.pred_opt() == Some(created_day) {
            Self::Yesterday
        } else if *created > now.clone() - Duration::days(7) {
            Self::Last7Days
        } else if *created > now.clone() - Duration::days(30) {
            Self::Last30Days
        } else {
            Self::Older
        }
    }
}

impl std::fmt::Display for ConversationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Every group in display order, each with its conversations in input order.
pub type ConversationGroups<'a> = Vec<(ConversationGroup, Vec<&'a Conversation>)>;

/// Group by creation time relative to the local clock.
pub fn group_conversations(conversations: &[Conversation]) -> ConversationGroups<'_> {
    group_conversations_at(conversations, &Local::now())
}

/// Group by creation time relative to `now`.
pub fn group_conversations_at<'a, Tz: TimeZone>(
    conversations: &'a [Conversation],
    now: &DateTime<Tz>,
) -> ConversationGroups<'a> {
    let mut groups: ConversationGroups<'a> = ConversationGroup::ALL
        .iter()
        .map(|group| (*group, Vec::new()))
        .collect();

    for conversation in conversations {
        let created = conversation.created_datetime().with_timezone(&now.timezone());
        let group = ConversationGroup::classify(&created, now);
        groups[group as usize].1.push(conversation);
    }

    groups
}

use crate::models::{Message, MessageCounts, MessageStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Unread,
    Read,
    Archived,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::All, Tab::Unread, Tab::Read, Tab::Archived];

    pub fn next(self) -> Tab {
        match self {
            Tab::All => Tab::Unread,
            Tab::Unread => Tab::Read,
            Tab::Read => Tab::Archived,
            Tab::Archived => Tab::All,
        }
    }

    pub fn prev(self) -> Tab {
        match self {
            Tab::All => Tab::Archived,
            Tab::Unread => Tab::All,
            Tab::Read => Tab::Unread,
            Tab::Archived => Tab::Read,
        }
    }
}

/// What the `Unread` tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreadPolicy {
    /// Only messages whose status is `unread`.
    #[default]
    Strict,
    /// Everything not `read`, archived messages included.
    NotRead,
}

pub fn in_tab(message: &Message, tab: Tab, policy: UnreadPolicy) -> bool {
    match tab {
        Tab::All => true,
        Tab::Unread => match policy {
            UnreadPolicy::Strict => message.status == MessageStatus::Unread,
            UnreadPolicy::NotRead => message.status != MessageStatus::Read,
        },
        Tab::Read => message.status == MessageStatus::Read,
        Tab::Archived => message.status == MessageStatus::Archived,
    }
}

pub fn matches_search(message: &Message, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&message.name, &message.email, &message.body]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Newest first. Missing or unparseable timestamps go last; the sort is
/// stable so ties keep fetch order.
pub fn newest_first(a: &Message, b: &Message) -> Ordering {
    match (a.created_at_parsed(), b.created_at_parsed()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn visible<'a>(
    messages: &'a [Message],
    tab: Tab,
    policy: UnreadPolicy,
    search: Option<&str>,
) -> Vec<&'a Message> {
    let mut view: Vec<&Message> = messages
        .iter()
        .filter(|m| in_tab(m, tab, policy))
        .filter(|m| search.is_none_or(|q| matches_search(m, q)))
        .collect();
    view.sort_by(|a, b| newest_first(a, b));
    view
}

pub fn tab_count(messages: &[Message], tab: Tab, policy: UnreadPolicy) -> usize {
    messages.iter().filter(|m| in_tab(m, tab, policy)).count()
}

pub fn counts(messages: &[Message]) -> MessageCounts {
    let mut counts = MessageCounts {
        total: messages.len(),
        ..MessageCounts::default()
    };
    for m in messages {
        match m.status {
            MessageStatus::Unread => counts.unread += 1,
            MessageStatus::Read => counts.read += 1,
            MessageStatus::Archived => counts.archived += 1,
        }
    }
    counts.active = counts.total - counts.archived;
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn msg(id: i64, created_at: Option<&str>, status: MessageStatus) -> Message {
        Message {
            id,
            name: Some(format!("Sender {}", id)),
            email: Some(format!("sender{}@example.com", id)),
            body: Some(format!("Body of message {}", id)),
            created_at: created_at.map(str::to_string),
            status,
        }
    }

    fn mixed() -> Vec<Message> {
        vec![
            msg(1, Some("2024-01-01"), MessageStatus::Unread),
            msg(2, Some("2024-01-02"), MessageStatus::Read),
            msg(3, Some("2024-01-03"), MessageStatus::Archived),
            msg(4, None, MessageStatus::Unread),
            msg(5, Some("2024-01-05"), MessageStatus::Read),
        ]
    }

    fn ids(view: &[&Message]) -> Vec<i64> {
        view.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_sort_newest_first_nulls_last() {
        let messages = vec![
            msg(10, Some("2024-01-03"), MessageStatus::Unread),
            msg(11, None, MessageStatus::Unread),
            msg(12, Some("2024-01-05"), MessageStatus::Unread),
        ];
        let view = visible(&messages, Tab::All, UnreadPolicy::Strict, None);
        assert_eq!(ids(&view), vec![12, 10, 11]);
    }

    #[test]
    fn test_sort_invalid_timestamp_sorts_with_missing() {
        let messages = vec![
            msg(1, Some("not a date"), MessageStatus::Read),
            msg(2, None, MessageStatus::Read),
            msg(3, Some("2020-06-01T12:00:00Z"), MessageStatus::Read),
        ];
        let view = visible(&messages, Tab::All, UnreadPolicy::Strict, None);
        // Stable: 1 and 2 keep fetch order behind the dated message.
        assert_eq!(ids(&view), vec![3, 1, 2]);
    }

    #[test]
    fn test_sort_is_non_increasing() {
        let messages = mixed();
        let view = visible(&messages, Tab::All, UnreadPolicy::Strict, None);
        let stamps: Vec<_> = view.iter().map(|m| m.created_at_parsed()).collect();
        for pair in stamps.windows(2) {
            match (pair[0], pair[1]) {
                (Some(a), Some(b)) => assert!(a >= b),
                (None, Some(_)) => panic!("missing timestamp sorted before a dated one"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_strict_policy_partitions_all() {
        let messages = mixed();
        let all: HashSet<i64> = ids(&visible(&messages, Tab::All, UnreadPolicy::Strict, None))
            .into_iter()
            .collect();
        let unread = ids(&visible(&messages, Tab::Unread, UnreadPolicy::Strict, None));
        let read = ids(&visible(&messages, Tab::Read, UnreadPolicy::Strict, None));
        let archived = ids(&visible(&messages, Tab::Archived, UnreadPolicy::Strict, None));

        assert_eq!(unread, vec![1, 4]);
        assert_eq!(read, vec![5, 2]);
        assert_eq!(archived, vec![3]);

        let mut union: Vec<i64> = unread.into_iter().chain(read).chain(archived).collect();
        let len = union.len();
        union.sort();
        union.dedup();
        assert_eq!(union.len(), len, "buckets overlap");
        assert_eq!(union.into_iter().collect::<HashSet<_>>(), all);
    }

    #[test]
    fn test_not_read_policy_includes_archived_in_unread() {
        let messages = mixed();
        let unread = ids(&visible(&messages, Tab::Unread, UnreadPolicy::NotRead, None));
        assert_eq!(unread, vec![3, 1, 4]);
        let archived = ids(&visible(&messages, Tab::Archived, UnreadPolicy::NotRead, None));
        assert_eq!(archived, vec![3]);
    }

    #[test]
    fn test_search_matches_any_field_case_insensitive() {
        let messages = mixed();
        let view = visible(&messages, Tab::All, UnreadPolicy::Strict, Some("SENDER2@"));
        assert_eq!(ids(&view), vec![2]);
        let view = visible(&messages, Tab::Read, UnreadPolicy::Strict, Some("message 5"));
        assert_eq!(ids(&view), vec![5]);
        let view = visible(&messages, Tab::All, UnreadPolicy::Strict, Some("   "));
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn test_counts() {
        let c = counts(&mixed());
        assert_eq!(c.total, 5);
        assert_eq!(c.unread, 2);
        assert_eq!(c.read, 2);
        assert_eq!(c.archived, 1);
        assert_eq!(c.active, 4);
    }

    #[test]
    fn test_tab_cycle() {
        let mut tab = Tab::All;
        for _ in 0..4 {
            tab = tab.next();
        }
        assert_eq!(tab, Tab::All);
        assert_eq!(Tab::All.prev(), Tab::Archived);
    }
}

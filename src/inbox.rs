//! Admin inbox state: the message list, the active tab, the single expanded
//! message and the queue of read transitions that have been shown locally
//! but not yet written back.
//!
//! Read-state is committed in batches on boundary crossings (tab switch,
//! interaction outside the list, quit). Archive, restore and delete are
//! written immediately and only touch local state once the backend agrees.

use crate::filter::{self, Tab, UnreadPolicy};
use crate::gateway::{Gateway, GatewayError};
use crate::models::{Message, MessageCounts, MessageId, MessageStatus};
use ratatui::layout::{Position, Rect};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("could not load messages: {0}")]
    Load(#[source] GatewayError),
    #[error("could not persist read state for {count} message(s): {source}")]
    BatchPersist {
        count: usize,
        #[source]
        source: GatewayError,
    },
    #[error("{action} failed: {source}")]
    Mutation {
        action: &'static str,
        #[source]
        source: GatewayError,
    },
}

/// The region that counts as "inside" the message list.
pub trait Container {
    fn is_inside(&self, point: Position) -> bool;
}

impl Container for Rect {
    fn is_inside(&self, point: Position) -> bool {
        self.contains(point)
    }
}

/// A destructive action waiting for the admin to say yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    DeleteOne(MessageId),
    DeleteAllArchived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    LoadFailed,
    Archived,
    ArchiveFailed,
    Restored,
    RestoreFailed,
    Deleted(usize),
    DeleteFailed,
    NothingArchived,
}

impl NoticeKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            NoticeKind::LoadFailed
                | NoticeKind::ArchiveFailed
                | NoticeKind::RestoreFailed
                | NoticeKind::DeleteFailed
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Notice {
    pub kind: NoticeKind,
    pub raised_at: Instant,
}

pub struct Inbox {
    messages: Vec<Message>,
    tab: Tab,
    expanded: Option<MessageId>,
    pending_reads: BTreeSet<MessageId>,
    confirmation: Option<Confirmation>,
    notice: Option<Notice>,
    notice_ttl: Duration,
    policy: UnreadPolicy,
    search: Option<String>,
}

impl Inbox {
    pub fn new(policy: UnreadPolicy, notice_ttl: Duration) -> Self {
        Self {
            messages: Vec::new(),
            tab: Tab::default(),
            expanded: None,
            pending_reads: BTreeSet::new(),
            confirmation: None,
            notice: None,
            notice_ttl,
            policy,
            search: None,
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn expanded(&self) -> Option<MessageId> {
        self.expanded
    }

    pub fn pending_reads(&self) -> &BTreeSet<MessageId> {
        &self.pending_reads
    }

    pub fn confirmation(&self) -> Option<Confirmation> {
        self.confirmation
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn set_search(&mut self, query: Option<String>) {
        self.search = query.filter(|q| !q.trim().is_empty());
    }

    /// Sorted, tab-filtered projection of the list.
    pub fn visible(&self) -> Vec<&Message> {
        filter::visible(&self.messages, self.tab, self.policy, self.search.as_deref())
    }

    /// Size of a tab's list under the active unread policy.
    pub fn tab_count(&self, tab: Tab) -> usize {
        filter::tab_count(&self.messages, tab, self.policy)
    }

    pub fn counts(&self) -> MessageCounts {
        filter::counts(&self.messages)
    }

    /// The current notice, if it is still within its display window.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| n.raised_at.elapsed() < self.notice_ttl)
    }

    fn raise(&mut self, kind: NoticeKind) {
        self.notice = Some(Notice {
            kind,
            raised_at: Instant::now(),
        });
    }

    /// Replaces the list with a fresh fetch. On failure the previous list
    /// stays as it was.
    pub async fn load_messages<G: Gateway + ?Sized>(&mut self, gw: &G) -> Result<(), InboxError> {
        match gw.list_messages().await {
            Ok(mut messages) => {
                // Reads still waiting for a flush stay read on screen.
                for m in messages.iter_mut() {
                    if self.pending_reads.contains(&m.id) {
                        m.status = MessageStatus::Read;
                    }
                }
                self.pending_reads
                    .retain(|id| messages.iter().any(|m| m.id == *id));
                if let Some(id) = self.expanded {
                    if !messages.iter().any(|m| m.id == id) {
                        self.expanded = None;
                    }
                }
                info!("Loaded {} messages", messages.len());
                self.messages = messages;
                Ok(())
            }
            Err(e) => {
                error!("Loading messages failed: {}", e);
                self.raise(NoticeKind::LoadFailed);
                Err(InboxError::Load(e))
            }
        }
    }

    /// Flushes queued reads, then switches tab. The switch happens even if
    /// the flush fails; the queue is kept for the next boundary.
    pub async fn select_tab<G: Gateway + ?Sized>(&mut self, gw: &G, tab: Tab) {
        let _ = self.flush_read_queue(gw).await;
        self.tab = tab;
    }

    /// Accordion toggle. Opening an unread message marks it read locally and
    /// queues the write.
    pub fn toggle_expand(&mut self, id: MessageId) {
        if self.expanded == Some(id) {
            self.expanded = None;
            return;
        }
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return;
        };
        self.expanded = Some(id);
        if message.status == MessageStatus::Unread {
            message.status = MessageStatus::Read;
            self.pending_reads.insert(id);
            debug!("Queued read for message {}", id);
        }
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }

    /// Writes all queued reads in one request. Local state is never rolled
    /// back: on failure the ids stay queued and the next boundary retries.
    pub async fn flush_read_queue<G: Gateway + ?Sized>(&mut self, gw: &G) -> Result<(), InboxError> {
        if self.pending_reads.is_empty() {
            return Ok(());
        }
        let batch: Vec<MessageId> = self.pending_reads.iter().copied().collect();
        match gw.update_message_status(&batch, MessageStatus::Read).await {
            Ok(()) => {
                for id in &batch {
                    self.pending_reads.remove(id);
                }
                debug!("Persisted read state for {:?}", batch);
                Ok(())
            }
            Err(e) => {
                warn!("Persisting read state for {:?} failed: {}", batch, e);
                Err(InboxError::BatchPersist {
                    count: batch.len(),
                    source: e,
                })
            }
        }
    }

    pub async fn archive<G: Gateway + ?Sized>(&mut self, gw: &G, id: MessageId) -> Result<(), InboxError> {
        self.set_status(gw, id, MessageStatus::Archived).await
    }

    /// Restoring always lands on `read`, whatever the message was before it
    /// was archived. Only archived messages can be restored.
    pub async fn restore<G: Gateway + ?Sized>(&mut self, gw: &G, id: MessageId) -> Result<(), InboxError> {
        if self.message(id).map(|m| m.status) != Some(MessageStatus::Archived) {
            return Ok(());
        }
        self.set_status(gw, id, MessageStatus::Read).await
    }

    async fn set_status<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<(), InboxError> {
        if self.message(id).is_none() {
            return Ok(());
        }
        let (action, done, failed) = match status {
            MessageStatus::Archived => ("archive", NoticeKind::Archived, NoticeKind::ArchiveFailed),
            _ => ("restore", NoticeKind::Restored, NoticeKind::RestoreFailed),
        };
        match gw.update_message_status(&[id], status).await {
            Ok(()) => {
                if let Some(m) = self.messages.iter_mut().find(|m| m.id == id) {
                    m.status = status;
                }
                // The immediate write supersedes any queued read.
                self.pending_reads.remove(&id);
                info!("Message {} is now {}", id, status.as_str());
                self.raise(done);
                Ok(())
            }
            Err(e) => {
                error!("Failed to {} message {}: {}", action, id, e);
                self.raise(failed);
                Err(InboxError::Mutation { action, source: e })
            }
        }
    }

    /// Opens the confirmation step for deleting one message.
    pub fn request_delete(&mut self, id: MessageId) {
        if self.message(id).is_some() {
            self.confirmation = Some(Confirmation::DeleteOne(id));
        }
    }

    /// Opens the confirmation step for deleting every archived message.
    pub fn request_delete_all_archived(&mut self) {
        if self.archived_ids().is_empty() {
            self.raise(NoticeKind::NothingArchived);
            return;
        }
        self.confirmation = Some(Confirmation::DeleteAllArchived);
    }

    pub fn cancel_confirmation(&mut self) {
        if let Some(c) = self.confirmation.take() {
            debug!("Cancelled {:?}", c);
        }
    }

    /// Runs the action waiting for confirmation. Without one this does
    /// nothing, so no delete ever reaches the backend unconfirmed.
    pub async fn confirm<G: Gateway + ?Sized>(&mut self, gw: &G) -> Result<(), InboxError> {
        match self.confirmation.take() {
            None => Ok(()),
            Some(Confirmation::DeleteOne(id)) => self.delete_one(gw, id).await,
            Some(Confirmation::DeleteAllArchived) => self.delete_all_archived(gw).await,
        }
    }

    async fn delete_one<G: Gateway + ?Sized>(&mut self, gw: &G, id: MessageId) -> Result<(), InboxError> {
        if self.message(id).is_none() {
            return Ok(());
        }
        self.delete_ids(gw, vec![id]).await
    }

    async fn delete_all_archived<G: Gateway + ?Sized>(&mut self, gw: &G) -> Result<(), InboxError> {
        let ids = self.archived_ids();
        if ids.is_empty() {
            self.raise(NoticeKind::NothingArchived);
            return Ok(());
        }
        self.delete_ids(gw, ids).await
    }

    async fn delete_ids<G: Gateway + ?Sized>(
        &mut self,
        gw: &G,
        ids: Vec<MessageId>,
    ) -> Result<(), InboxError> {
        match gw.delete_messages(&ids).await {
            Ok(()) => {
                self.messages.retain(|m| !ids.contains(&m.id));
                self.pending_reads.retain(|id| !ids.contains(id));
                if self.expanded.is_some_and(|id| ids.contains(&id)) {
                    self.expanded = None;
                }
                info!("Deleted messages {:?}", ids);
                self.raise(NoticeKind::Deleted(ids.len()));
                Ok(())
            }
            Err(e) => {
                error!("Deleting messages {:?} failed: {}", ids, e);
                self.raise(NoticeKind::DeleteFailed);
                Err(InboxError::Mutation {
                    action: "delete",
                    source: e,
                })
            }
        }
    }

    /// A pointer event outside the list commits queued reads and collapses
    /// the open message. Events inside the list, or with nothing expanded,
    /// are ignored.
    pub async fn handle_outside_interaction<G, C>(
        &mut self,
        gw: &G,
        point: Position,
        container: &C,
    ) -> Result<(), InboxError>
    where
        G: Gateway + ?Sized,
        C: Container + ?Sized,
    {
        if container.is_inside(point) || self.expanded.is_none() {
            return Ok(());
        }
        let flushed = self.flush_read_queue(gw).await;
        self.expanded = None;
        flushed
    }

    fn archived_ids(&self) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|m| m.status == MessageStatus::Archived)
            .map(|m| m.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{Call, MemoryGateway};

    fn msg(id: MessageId, status: MessageStatus) -> Message {
        Message {
            id,
            name: Some(format!("Client {}", id)),
            email: Some(format!("client{}@example.com", id)),
            body: Some("Need a quote for a balcony railing.".to_string()),
            created_at: Some(format!("2024-01-{:02}T09:00:00Z", id)),
            status,
        }
    }

    async fn loaded(messages: Vec<Message>) -> (Inbox, MemoryGateway) {
        let gw = MemoryGateway::with_messages(messages);
        let mut inbox = Inbox::new(UnreadPolicy::Strict, Duration::from_secs(4));
        inbox.load_messages(&gw).await.unwrap();
        gw.clear_calls();
        (inbox, gw)
    }

    fn list_area() -> Rect {
        Rect::new(0, 2, 40, 20)
    }

    #[tokio::test]
    async fn test_load_replaces_list() {
        let (inbox, _gw) = loaded(vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Read),
        ])
        .await;
        let ids: Vec<_> = inbox.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        gw.fail_next(1);
        assert!(matches!(
            inbox.load_messages(&gw).await,
            Err(InboxError::Load(_))
        ));
        assert_eq!(inbox.messages().len(), 1);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::LoadFailed));
    }

    #[tokio::test]
    async fn test_flush_empty_queue_makes_no_calls() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.flush_read_queue(&gw).await.unwrap();
        inbox.flush_read_queue(&gw).await.unwrap();
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_flush_after_success_is_noop() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        inbox.flush_read_queue(&gw).await.unwrap();
        inbox.flush_read_queue(&gw).await.unwrap();
        assert_eq!(
            gw.calls(),
            vec![Call::UpdateStatus(vec![1], MessageStatus::Read)]
        );
    }

    #[tokio::test]
    async fn test_expand_enqueues_exactly_once() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        inbox.toggle_expand(1);
        assert_eq!(inbox.expanded(), None);
        inbox.toggle_expand(1);
        assert_eq!(inbox.pending_reads().iter().copied().collect::<Vec<_>>(), vec![1]);

        inbox.flush_read_queue(&gw).await.unwrap();
        inbox.toggle_expand(1);
        inbox.toggle_expand(1);
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_expanding_read_or_archived_does_not_enqueue() {
        let (mut inbox, _gw) = loaded(vec![
            msg(1, MessageStatus::Read),
            msg(2, MessageStatus::Archived),
        ])
        .await;
        inbox.toggle_expand(1);
        inbox.toggle_expand(2);
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(inbox.message(2).unwrap().status, MessageStatus::Archived);
    }

    #[tokio::test]
    async fn test_expand_unknown_id_is_ignored() {
        let (mut inbox, _gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(99);
        assert_eq!(inbox.expanded(), None);
        assert!(inbox.pending_reads().is_empty());
    }

    #[tokio::test]
    async fn test_accordion_keeps_one_expanded() {
        let (mut inbox, _gw) = loaded(vec![
            msg(1, MessageStatus::Read),
            msg(2, MessageStatus::Read),
        ])
        .await;
        inbox.toggle_expand(1);
        assert_eq!(inbox.expanded(), Some(1));
        inbox.toggle_expand(2);
        assert_eq!(inbox.expanded(), Some(2));
        inbox.toggle_expand(2);
        assert_eq!(inbox.expanded(), None);
    }

    #[tokio::test]
    async fn test_expand_two_then_switch_tab_flushes_one_batch() {
        let (mut inbox, gw) = loaded(vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Unread),
        ])
        .await;

        inbox.toggle_expand(1);
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        inbox.toggle_expand(2);
        assert_eq!(inbox.expanded(), Some(2));
        assert_eq!(
            inbox.pending_reads().iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(gw.calls().is_empty());

        inbox.select_tab(&gw, Tab::Read).await;
        assert_eq!(
            gw.calls(),
            vec![Call::UpdateStatus(vec![1, 2], MessageStatus::Read)]
        );
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(inbox.tab(), Tab::Read);
        let shown: Vec<_> = inbox.visible().iter().map(|m| m.id).collect();
        assert_eq!(shown, vec![2, 1]);
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Read));
        assert_eq!(gw.stored_status(2), Some(MessageStatus::Read));
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_queue_and_local_read() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        gw.fail_next(1);

        inbox.select_tab(&gw, Tab::Read).await;
        assert_eq!(inbox.tab(), Tab::Read);
        assert!(inbox.pending_reads().contains(&1));
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        // Read-state failures are logged only.
        assert!(inbox.notice().is_none());
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Unread));

        inbox.flush_read_queue(&gw).await.unwrap();
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Read));
        assert_eq!(
            gw.calls(),
            vec![
                Call::UpdateStatus(vec![1], MessageStatus::Read),
                Call::UpdateStatus(vec![1], MessageStatus::Read),
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_keeps_optimistic_reads() {
        let (mut inbox, gw) = loaded(vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Unread),
        ])
        .await;
        inbox.toggle_expand(1);
        inbox.load_messages(&gw).await.unwrap();
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        assert_eq!(inbox.message(2).unwrap().status, MessageStatus::Unread);
        assert!(inbox.pending_reads().contains(&1));
    }

    #[tokio::test]
    async fn test_reload_drops_queued_ids_that_are_gone() {
        let (mut inbox, gw) = loaded(vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Unread),
        ])
        .await;
        inbox.toggle_expand(1);
        assert!(inbox.pending_reads().contains(&1));
        gw.delete_messages(&[1]).await.unwrap();

        inbox.load_messages(&gw).await.unwrap();
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(inbox.expanded(), None);
        assert!(inbox.message(1).is_none());

        gw.clear_calls();
        inbox.flush_read_queue(&gw).await.unwrap();
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restore_ignores_messages_that_are_not_archived() {
        let (mut inbox, gw) = loaded(vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Read),
        ])
        .await;
        inbox.restore(&gw, 1).await.unwrap();
        inbox.restore(&gw, 2).await.unwrap();
        assert!(gw.calls().is_empty());
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Unread);
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Unread));
        assert!(inbox.notice().is_none());
    }

    #[tokio::test]
    async fn test_tab_count_follows_unread_policy() {
        let messages = vec![
            msg(1, MessageStatus::Unread),
            msg(2, MessageStatus::Read),
            msg(3, MessageStatus::Archived),
        ];
        let (strict, _gw) = loaded(messages.clone()).await;
        assert_eq!(strict.tab_count(Tab::Unread), 1);

        let gw = MemoryGateway::with_messages(messages);
        let mut not_read = Inbox::new(UnreadPolicy::NotRead, Duration::from_secs(4));
        not_read.load_messages(&gw).await.unwrap();
        assert_eq!(not_read.tab_count(Tab::Unread), 2);
        assert_eq!(not_read.tab_count(Tab::All), 3);
    }

    #[tokio::test]
    async fn test_archive_then_restore_lands_on_read() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.archive(&gw, 1).await.unwrap();
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Archived);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::Archived));
        inbox.restore(&gw, 1).await.unwrap();
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Read));
        assert_eq!(
            gw.calls(),
            vec![
                Call::UpdateStatus(vec![1], MessageStatus::Archived),
                Call::UpdateStatus(vec![1], MessageStatus::Read),
            ]
        );
    }

    #[tokio::test]
    async fn test_archive_drops_queued_read() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        inbox.archive(&gw, 1).await.unwrap();
        assert!(inbox.pending_reads().is_empty());
        inbox.select_tab(&gw, Tab::Archived).await;
        assert_eq!(gw.stored_status(1), Some(MessageStatus::Archived));
        assert_eq!(inbox.visible().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_failure_leaves_local_state() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Read)]).await;
        gw.fail_next(1);
        let err = inbox.archive(&gw, 1).await.unwrap_err();
        assert!(matches!(err, InboxError::Mutation { action: "archive", .. }));
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Read);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::ArchiveFailed));
    }

    #[tokio::test]
    async fn test_restore_failure_leaves_local_state() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Archived)]).await;
        gw.fail_next(1);
        assert!(inbox.restore(&gw, 1).await.is_err());
        assert_eq!(inbox.message(1).unwrap().status, MessageStatus::Archived);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::RestoreFailed));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Read)]).await;

        inbox.confirm(&gw).await.unwrap();
        inbox.request_delete(1);
        assert_eq!(inbox.confirmation(), Some(Confirmation::DeleteOne(1)));
        inbox.cancel_confirmation();
        inbox.confirm(&gw).await.unwrap();
        assert!(gw.calls().is_empty());
        assert_eq!(inbox.messages().len(), 1);

        inbox.request_delete(1);
        inbox.confirm(&gw).await.unwrap();
        assert_eq!(gw.calls(), vec![Call::DeleteMessages(vec![1])]);
        assert!(inbox.messages().is_empty());
        assert_eq!(inbox.confirmation(), None);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::Deleted(1)));
    }

    #[tokio::test]
    async fn test_delete_clears_expanded_and_queue() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        inbox.request_delete(1);
        inbox.confirm(&gw).await.unwrap();
        assert_eq!(inbox.expanded(), None);
        assert!(inbox.pending_reads().is_empty());
        assert!(gw.stored_message_ids().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_message() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Read)]).await;
        inbox.request_delete(1);
        gw.fail_next(1);
        assert!(inbox.confirm(&gw).await.is_err());
        assert_eq!(inbox.messages().len(), 1);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::DeleteFailed));
    }

    #[tokio::test]
    async fn test_delete_all_archived_in_one_batch() {
        let (mut inbox, gw) = loaded(vec![
            msg(1, MessageStatus::Archived),
            msg(2, MessageStatus::Read),
            msg(3, MessageStatus::Archived),
        ])
        .await;
        inbox.request_delete_all_archived();
        assert!(gw.calls().is_empty());
        inbox.confirm(&gw).await.unwrap();
        assert_eq!(gw.calls(), vec![Call::DeleteMessages(vec![3, 1])]);
        assert_eq!(gw.stored_message_ids(), vec![2]);
        let left: Vec<_> = inbox.messages().iter().map(|m| m.id).collect();
        assert_eq!(left, vec![2]);
    }

    #[tokio::test]
    async fn test_delete_all_archived_with_none_archived() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Read)]).await;
        inbox.request_delete_all_archived();
        assert_eq!(inbox.confirmation(), None);
        assert_eq!(inbox.notice().map(|n| n.kind), Some(NoticeKind::NothingArchived));
        inbox.confirm(&gw).await.unwrap();
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_outside_interaction_flushes_and_collapses() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);

        inbox
            .handle_outside_interaction(&gw, Position::new(5, 5), &list_area())
            .await
            .unwrap();
        assert_eq!(inbox.expanded(), Some(1));
        assert!(gw.calls().is_empty());

        inbox
            .handle_outside_interaction(&gw, Position::new(60, 5), &list_area())
            .await
            .unwrap();
        assert_eq!(inbox.expanded(), None);
        assert!(inbox.pending_reads().is_empty());
        assert_eq!(
            gw.calls(),
            vec![Call::UpdateStatus(vec![1], MessageStatus::Read)]
        );
    }

    #[tokio::test]
    async fn test_outside_interaction_without_expansion_is_ignored() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        inbox.toggle_expand(1);
        inbox
            .handle_outside_interaction(&gw, Position::new(60, 5), &list_area())
            .await
            .unwrap();
        assert!(gw.calls().is_empty());
        assert!(inbox.pending_reads().contains(&1));
    }

    #[tokio::test]
    async fn test_tab_switch_then_outside_click_flushes_once() {
        let (mut inbox, gw) = loaded(vec![msg(1, MessageStatus::Unread)]).await;
        inbox.toggle_expand(1);
        inbox.select_tab(&gw, Tab::All).await;
        inbox
            .handle_outside_interaction(&gw, Position::new(60, 5), &list_area())
            .await
            .unwrap();
        assert_eq!(gw.calls().len(), 1);
        assert_eq!(inbox.expanded(), None);
    }

    #[tokio::test]
    async fn test_search_narrows_visible() {
        let (mut inbox, _gw) = loaded(vec![
            msg(1, MessageStatus::Read),
            msg(2, MessageStatus::Read),
        ])
        .await;
        inbox.set_search(Some("client2".to_string()));
        let shown: Vec<_> = inbox.visible().iter().map(|m| m.id).collect();
        assert_eq!(shown, vec![2]);
        inbox.set_search(Some(" ".to_string()));
        assert_eq!(inbox.search(), None);
        assert_eq!(inbox.visible().len(), 2);
    }
}

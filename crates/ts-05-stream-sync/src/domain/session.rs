//! Per-peer session state: which chunks are outstanding, which arrived, and
//! how far the local store has applied.
//!
//! Chunks live in an arena keyed by start index. A chunk is applied only
//! when it starts exactly at the applied cursor, so items are stored in
//! ascending index order with no gaps. A short response splits its chunk:
//! the delivered prefix stays, the remainder becomes a new unsent chunk.

use serde::{Deserialize, Serialize};
use shared_types::{Metric, PeerId};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::stream::{ChunkRequest, ChunkResponse, SessionId, StreamKind};
use crate::error::SessionError;

/// Coarse session state, for status reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing outstanding
    Idle,
    /// Chunk requests being issued
    Requesting,
    /// Waiting for responses
    AwaitingChunk,
    /// Applying a received chunk
    Applying,
    /// No progress within the restart deadline
    Stalled,
    /// Restarted from the applied cursor
    Restarting,
    /// The peer has nothing more
    Done,
}

/// Chunk sizing of a leecher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Budget of one chunk
    pub limit: Metric,
    /// Chunks outstanding at once
    pub parallel: usize,
}

#[derive(Debug)]
struct PendingChunk<I> {
    end: u64,
    sent: bool,
    items: Option<Vec<I>>,
}

/// Public view of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// Current incarnation
    pub id: SessionId,
    /// Peer
    pub peer: PeerId,
    /// Stream
    pub kind: StreamKind,
    /// State
    pub state: SessionState,
    /// Next index to apply
    pub cursor: u64,
    /// Chunks outstanding or buffered
    pub pending: usize,
    /// Restarts so far
    pub restarts: u32,
}

/// Leecher session with one peer on one stream.
#[derive(Debug)]
pub struct Session<I> {
    id: SessionId,
    peer: PeerId,
    kind: StreamKind,
    state: SessionState,
    cursor: u64,
    next_start: u64,
    exhausted_at: Option<u64>,
    pending: BTreeMap<u64, PendingChunk<I>>,
    last_progress: Instant,
    restarts: u32,
}

impl<I> Session<I> {
    /// New session applying from `start`.
    pub fn new(peer: PeerId, kind: StreamKind, start: u64, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            kind,
            state: SessionState::Idle,
            cursor: start,
            next_start: start,
            exhausted_at: None,
            pending: BTreeMap::new(),
            last_progress: now,
            restarts: 0,
        }
    }

    /// Current incarnation ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next index to apply.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// State.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Restarts so far.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Time of the last applied chunk or (re)start.
    pub fn last_progress(&self) -> Instant {
        self.last_progress
    }

    /// Requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.pending
            .values()
            .filter(|c| c.sent && c.items.is_none())
            .count()
    }

    /// Whether the chunk at `start` arrived and waits to be applied.
    pub fn is_buffered(&self, start: u64) -> bool {
        self.pending.get(&start).is_some_and(|c| c.items.is_some())
    }

    /// Whether the peer has nothing left and everything received is applied.
    pub fn is_done(&self) -> bool {
        self.exhausted_at.is_some() && self.pending.is_empty()
    }

    /// Whether no chunk was applied for `deadline`.
    pub fn is_stalled(&self, now: Instant, deadline: Duration) -> bool {
        now.saturating_duration_since(self.last_progress) >= deadline
    }

    /// Requests to send now: unsent remainders first, then new chunks past
    /// the highest requested index, up to `plan.parallel` outstanding.
    pub fn plan_requests(&mut self, plan: &ChunkPlan) -> Vec<ChunkRequest> {
        let mut out = Vec::new();
        let mut outstanding = self.in_flight();

        for (start, chunk) in self.pending.iter_mut() {
            if outstanding >= plan.parallel {
                break;
            }
            if !chunk.sent {
                chunk.sent = true;
                outstanding += 1;
                out.push(ChunkRequest {
                    session: self.id,
                    kind: self.kind,
                    start: *start,
                    limit: Metric::new(chunk.end - start, plan.limit.size),
                });
            }
        }

        while outstanding < plan.parallel && self.exhausted_at.is_none() && plan.limit.num > 0 {
            let start = self.next_start;
            let end = start.saturating_add(plan.limit.num);
            self.pending.insert(
                start,
                PendingChunk {
                    end,
                    sent: true,
                    items: None,
                },
            );
            self.next_start = end;
            outstanding += 1;
            out.push(ChunkRequest {
                session: self.id,
                kind: self.kind,
                start,
                limit: plan.limit,
            });
        }

        if !out.is_empty() {
            self.state = SessionState::Requesting;
        }
        out
    }

    /// Every request of the last plan was sent or requeued.
    pub fn requests_issued(&mut self) {
        if self.state == SessionState::Requesting {
            self.state = if self.in_flight() > 0 {
                SessionState::AwaitingChunk
            } else {
                SessionState::Idle
            };
        }
    }

    /// Mark a sent chunk for resending, e.g. after a transport failure.
    pub fn requeue(&mut self, start: u64) {
        if let Some(chunk) = self.pending.get_mut(&start) {
            if chunk.items.is_none() {
                chunk.sent = false;
            }
        }
    }

    /// Record a response.
    pub fn on_response(&mut self, resp: ChunkResponse<I>) -> Result<(), SessionError> {
        if resp.session != self.id {
            return Err(SessionError::StaleResponse);
        }
        if resp.kind != self.kind {
            return Err(SessionError::KindMismatch {
                expected: self.kind,
                got: resp.kind,
            });
        }

        let start = resp.start;
        let Some(chunk) = self.pending.get_mut(&start) else {
            // Chunks past the seeder's tail are dropped once it is known.
            if self.exhausted_at.is_some_and(|at| start >= at) {
                return Ok(());
            }
            return Err(SessionError::UnexpectedChunk { start });
        };
        if !chunk.sent || chunk.items.is_some() {
            return Err(SessionError::UnexpectedChunk { start });
        }

        let requested = chunk.end - start;
        let got = resp.items.len() as u64;
        if got > requested {
            return Err(SessionError::OversizedChunk {
                start,
                requested,
                got,
            });
        }

        if got == 0 {
            self.pending.remove(&start);
            let at = self.exhausted_at.map_or(start, |at| at.min(start));
            self.exhausted_at = Some(at);
            self.next_start = self.next_start.min(at);
            self.pending.retain(|s, _| *s < at);
            return Ok(());
        }

        let end = chunk.end;
        let delivered_end = start + got;
        chunk.end = delivered_end;
        chunk.items = Some(resp.items);
        if delivered_end < end {
            self.pending.insert(
                delivered_end,
                PendingChunk {
                    end,
                    sent: false,
                    items: None,
                },
            );
        }
        Ok(())
    }

    /// Next chunk that can be applied in order, if it has arrived.
    pub fn take_ready(&mut self) -> Option<(u64, Vec<I>)> {
        let ready = self
            .pending
            .first_key_value()
            .is_some_and(|(start, c)| *start == self.cursor && c.items.is_some());
        if !ready {
            return None;
        }
        let (start, chunk) = self.pending.pop_first()?;
        self.state = SessionState::Applying;
        chunk.items.map(|items| (start, items))
    }

    /// Advance the cursor past an applied chunk.
    pub fn confirm_applied(&mut self, start: u64, count: u64, now: Instant) {
        self.cursor = self.cursor.max(start + count);
        self.last_progress = now;
        self.state = if self.is_done() {
            SessionState::Done
        } else if self.in_flight() > 0 {
            SessionState::AwaitingChunk
        } else {
            SessionState::Idle
        };
    }

    /// Mark the session as stalled.
    pub fn mark_stalled(&mut self) {
        self.state = SessionState::Stalled;
    }

    /// Drop everything outstanding and start over from `from`, which is
    /// never behind the applied cursor.
    pub fn restart(&mut self, from: u64, now: Instant) {
        self.id = Uuid::new_v4();
        self.cursor = self.cursor.max(from);
        self.next_start = self.cursor;
        self.exhausted_at = None;
        self.pending.clear();
        self.last_progress = now;
        self.restarts += 1;
        self.state = SessionState::Restarting;
    }

    /// Public view.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            peer: self.peer,
            kind: self.kind,
            state: if self.is_done() { SessionState::Done } else { self.state },
            cursor: self.cursor,
            pending: self.pending.len(),
            restarts: self.restarts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::NodeId;

    fn plan(num: u64, parallel: usize) -> ChunkPlan {
        ChunkPlan {
            limit: Metric::new(num, 1 << 20),
            parallel,
        }
    }

    fn respond(session: &Session<u64>, start: u64, items: std::ops::Range<u64>) -> ChunkResponse<u64> {
        ChunkResponse {
            session: session.id(),
            kind: StreamKind::Events,
            start,
            items: items.collect(),
        }
    }

    fn session(start: u64) -> Session<u64> {
        Session::new(NodeId([1; 32]), StreamKind::Events, start, Instant::now())
    }

    #[test]
    fn test_parallel_requests_are_contiguous() {
        let mut s = session(100);
        let reqs = s.plan_requests(&plan(50, 3));
        let starts: Vec<u64> = reqs.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![100, 150, 200]);
        assert!(reqs.iter().all(|r| r.limit.num == 50));
        assert!(s.plan_requests(&plan(50, 3)).is_empty());
        assert_eq!(s.state(), SessionState::Requesting);
        s.requests_issued();
        assert_eq!(s.state(), SessionState::AwaitingChunk);
    }

    #[test]
    fn test_requeued_plan_falls_back_to_idle() {
        let mut s = session(0);
        assert_eq!(s.state(), SessionState::Idle);
        let reqs = s.plan_requests(&plan(10, 2));
        assert_eq!(s.info().state, SessionState::Requesting);
        for req in &reqs {
            s.requeue(req.start);
        }
        s.requests_issued();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.in_flight(), 0);

        // the requeued chunks go out again first
        let again: Vec<u64> = s.plan_requests(&plan(10, 2)).iter().map(|r| r.start).collect();
        assert_eq!(again, vec![0, 10]);
    }

    #[test]
    fn test_partial_tail_schedules_follow_up() {
        let mut s = session(100);
        s.plan_requests(&plan(50, 1));

        s.on_response(respond(&s, 100, 100..130)).unwrap();
        let (start, items) = s.take_ready().unwrap();
        assert_eq!((start, items.len()), (100, 30));
        s.confirm_applied(start, 30, Instant::now());
        assert_eq!(s.cursor(), 130);

        let follow_up = s.plan_requests(&plan(50, 1));
        assert_eq!(follow_up.len(), 1);
        assert_eq!(follow_up[0].start, 130);
        assert_eq!(follow_up[0].limit.num, 20);

        s.on_response(respond(&s, 130, 130..130)).unwrap();
        assert!(s.is_done());
        assert!(s.plan_requests(&plan(50, 1)).is_empty());
    }

    #[test]
    fn test_out_of_order_arrival_applies_in_order() {
        let mut s = session(0);
        s.plan_requests(&plan(10, 2));
        s.on_response(respond(&s, 10, 10..20)).unwrap();
        assert!(s.take_ready().is_none());

        s.on_response(respond(&s, 0, 0..10)).unwrap();
        let (a, _) = s.take_ready().unwrap();
        s.confirm_applied(a, 10, Instant::now());
        let (b, _) = s.take_ready().unwrap();
        s.confirm_applied(b, 10, Instant::now());
        assert_eq!((a, b, s.cursor()), (0, 10, 20));
    }

    #[test]
    fn test_empty_response_drops_later_chunks() {
        let mut s = session(0);
        s.plan_requests(&plan(10, 3));
        s.on_response(respond(&s, 10, 10..10)).unwrap();
        // The chunk past the tail is forgotten; its late answer is ignored.
        s.on_response(respond(&s, 20, 20..20)).unwrap();
        assert!(!s.is_done());

        s.on_response(respond(&s, 0, 0..10)).unwrap();
        let (start, items) = s.take_ready().unwrap();
        s.confirm_applied(start, items.len() as u64, Instant::now());
        assert!(s.is_done());
        assert_eq!(s.info().state, SessionState::Done);
    }

    #[test]
    fn test_rejects_foreign_and_oversized_responses() {
        let mut s = session(0);
        s.plan_requests(&plan(10, 1));

        let mut stale = respond(&s, 0, 0..10);
        stale.session = Uuid::new_v4();
        assert_eq!(s.on_response(stale), Err(SessionError::StaleResponse));

        assert!(matches!(
            s.on_response(respond(&s, 0, 0..11)),
            Err(SessionError::OversizedChunk { got: 11, .. })
        ));
        assert_eq!(
            s.on_response(respond(&s, 5, 5..6)),
            Err(SessionError::UnexpectedChunk { start: 5 })
        );
    }

    #[test]
    fn test_restart_resumes_from_cursor_with_new_id() {
        let mut s = session(0);
        s.plan_requests(&plan(10, 2));
        s.on_response(respond(&s, 0, 0..10)).unwrap();
        let (start, _) = s.take_ready().unwrap();
        s.confirm_applied(start, 10, Instant::now());

        let old = s.id();
        s.restart(0, Instant::now());
        assert_ne!(s.id(), old);
        assert_eq!(s.restarts(), 1);
        let reqs = s.plan_requests(&plan(10, 1));
        assert_eq!(reqs[0].start, 10);
    }

    #[test]
    fn test_requeue_resends_same_range() {
        let mut s = session(0);
        s.plan_requests(&plan(10, 1));
        s.requeue(0);
        let again = s.plan_requests(&plan(10, 1));
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].start, 0);
        assert_eq!(again[0].limit.num, 10);
    }

    proptest! {
        /// Whatever prefix lengths the seeder returns, applied items are
        /// exactly 0..tail in order.
        #[test]
        fn prop_applies_contiguous_prefix(
            tail in 0u64..200,
            cuts in proptest::collection::vec(1u64..10, 1..64),
            parallel in 1usize..4,
        ) {
            let mut s = session(0);
            let mut applied = Vec::new();
            let mut cut = cuts.iter().cycle();
            for _ in 0..10_000 {
                if s.is_done() {
                    break;
                }
                for req in s.plan_requests(&plan(10, parallel)) {
                    let take = (*cut.next().unwrap()).min(req.limit.num);
                    let end = (req.start + take).min(tail.max(req.start));
                    s.on_response(respond(&s, req.start, req.start..end)).unwrap();
                }
                while let Some((start, items)) = s.take_ready() {
                    let n = items.len() as u64;
                    applied.extend(items);
                    s.confirm_applied(start, n, Instant::now());
                }
            }
            prop_assert!(s.is_done());
            prop_assert_eq!(applied, (0..tail).collect::<Vec<_>>());
        }
    }
}

//! Runs DAG stream chunks through the event checkers.

use shared_types::{Event, EventId};
use std::collections::HashMap;
use std::sync::Arc;
use ts_02_event_check::Checkers;

use crate::ports::{EventLookup, ItemRejection, ItemValidator};

/// Validates events of a chunk in order. Parents may be earlier events of
/// the same chunk or events already stored; events already stored are
/// skipped.
pub struct EventChunkValidator {
    checkers: Checkers,
    lookup: Arc<dyn EventLookup>,
}

impl EventChunkValidator {
    /// Validator using `checkers`, resolving parents through `lookup`.
    pub fn new(checkers: Checkers, lookup: Arc<dyn EventLookup>) -> Self {
        Self { checkers, lookup }
    }
}

impl ItemValidator<Event> for EventChunkValidator {
    fn validate_chunk(&self, start: u64, items: &[Event]) -> Result<(), ItemRejection> {
        let mut fresh: HashMap<EventId, &Event> = HashMap::with_capacity(items.len());

        for (i, event) in items.iter().enumerate() {
            let index = start + i as u64;
            if self.lookup.has_event(&event.id()) {
                continue;
            }

            let mut parents = Vec::with_capacity(event.parents().len());
            for id in event.parents() {
                let parent = fresh
                    .get(id)
                    .map(|e| (*e).clone())
                    .or_else(|| self.lookup.get_event(id));
                match parent {
                    Some(parent) => parents.push(parent),
                    None => {
                        return Err(ItemRejection {
                            index,
                            reason: format!("event {event} has unknown parent {}", hex::encode(&id[..8])),
                            penalize: true,
                        })
                    }
                }
            }

            self.checkers
                .validate(event, &parents)
                .map_err(|err| ItemRejection {
                    index,
                    reason: format!("event {event}: {err}"),
                    penalize: err.penalizes_peer(),
                })?;
            fresh.insert(event.id(), event);
        }
        Ok(())
    }
}

//! Frontier: run-scoped dedup set and the current page's pending links

use crate::state::EntryState;
use crate::url::PostingId;
use crate::SourcetapError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// A posting discovered on a listing page, waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Id as it appeared in the listing href
    pub posting_id: PostingId,

    /// Absolute detail page URL
    pub detail_url: Url,

    /// Listing page the link was found on
    pub discovered_on_page: u32,
}

#[derive(Debug, Default)]
struct FrontierInner {
    /// Every id seen this run and where it is in its lifecycle
    states: HashMap<PostingId, EntryState>,

    /// Entries admitted since the last `take_pending`, in discovery order
    pending: Vec<FrontierEntry>,
}

/// Concurrency-safe set of known posting ids
///
/// The listing walker admits ids one at a time; pool workers then mark them
/// concurrently. Once an id has been admitted it is never admitted again, so
/// each posting is fetched at most once per run, also when its fetch failed.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `entry` as pending if its id is unseen
    ///
    /// Returns false if the id is already pending, in flight, processed,
    /// or failed.
    pub fn admit(&self, entry: FrontierEntry) -> bool {
        let mut inner = self.lock();
        if inner.states.contains_key(&entry.posting_id) {
            return false;
        }
        inner
            .states
            .insert(entry.posting_id.clone(), EntryState::Pending);
        inner.pending.push(entry);
        true
    }

    /// Drains the pending list, preserving discovery order
    pub fn take_pending(&self) -> Vec<FrontierEntry> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Pending -> Fetching
    pub fn mark_fetching(&self, id: &PostingId) -> Result<(), SourcetapError> {
        self.transition(id, EntryState::Fetching)
    }

    /// Fetching -> Failed
    pub fn mark_failed(&self, id: &PostingId) -> Result<(), SourcetapError> {
        self.transition(id, EntryState::Failed)
    }

    /// Marks a fetched posting as processed
    ///
    /// `canonical` is the id read from the detail page URL. When it differs
    /// from the listing id both are recorded, so neither form can be admitted
    /// again later in the run. A canonical id that is pending, in flight or
    /// failed is claimed by this fetch.
    ///
    /// Returns true if the caller holds the only record for `canonical` and
    /// should keep it, false if that record was already claimed by another
    /// fetch.
    pub fn mark_processed(
        &self,
        listing_id: &PostingId,
        canonical: &PostingId,
    ) -> Result<bool, SourcetapError> {
        let mut inner = self.lock();

        let listing_state = inner
            .states
            .get(listing_id)
            .copied()
            .ok_or_else(|| SourcetapError::UnknownPosting(listing_id.to_string()))?;
        match listing_state {
            EntryState::Fetching => {
                inner.states.insert(listing_id.clone(), EntryState::Processed);
            }
            // Claimed while in flight by a fetch that resolved to this id.
            EntryState::Processed if canonical == listing_id => return Ok(false),
            EntryState::Processed => {}
            from => {
                return Err(SourcetapError::InvalidTransition {
                    posting_id: listing_id.to_string(),
                    from,
                    to: EntryState::Processed,
                })
            }
        }

        if canonical == listing_id {
            return Ok(true);
        }

        let previous = inner
            .states
            .insert(canonical.clone(), EntryState::Processed);
        Ok(previous != Some(EntryState::Processed))
    }

    fn transition(&self, id: &PostingId, next: EntryState) -> Result<(), SourcetapError> {
        let mut inner = self.lock();
        Self::transition_locked(&mut inner, id, next)
    }

    fn transition_locked(
        inner: &mut FrontierInner,
        id: &PostingId,
        next: EntryState,
    ) -> Result<(), SourcetapError> {
        let current = inner
            .states
            .get_mut(id)
            .ok_or_else(|| SourcetapError::UnknownPosting(id.to_string()))?;

        if !current.can_transition_to(next) {
            return Err(SourcetapError::InvalidTransition {
                posting_id: id.to_string(),
                from: *current,
                to: next,
            });
        }
        *current = next;
        Ok(())
    }

    pub fn state_of(&self, id: &PostingId) -> Option<EntryState> {
        self.lock().states.get(id).copied()
    }

    pub fn is_processed(&self, id: &PostingId) -> bool {
        self.state_of(id) == Some(EntryState::Processed)
    }

    /// Ids whose detail page was parsed successfully
    pub fn processed_ids(&self) -> HashSet<PostingId> {
        self.lock()
            .states
            .iter()
            .filter(|(_, state)| state.is_success())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of distinct ids known this run
    pub fn seen_count(&self) -> usize {
        self.lock().states.len()
    }
}

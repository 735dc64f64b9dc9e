//! Candidate resolver: what can be picked right now, and in which order.
//!
//! Every call derives its result from the declared inputs; nothing is cached,
//! so the candidate list can never drift from the buffer it was computed for.

use std::collections::HashMap;

use handreceipt_inventory::search::collation_key;
use handreceipt_inventory::{Allocation, AllocationKey, ItemInstance, PoolKey, SearchQuery};

use crate::availability::Availability;
use crate::buffer::CompositionBuffer;

/// Search and ranking inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub text: Option<SearchQuery>,
    /// Recipient's home allocation; matching instances rank first.
    pub home: Option<AllocationKey>,
    /// Truncate the ordered result.
    pub limit: Option<usize>,
}

impl CandidateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank text is the same as no text.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = SearchQuery::parse(text);
        self
    }

    pub fn with_home(mut self, home: Option<AllocationKey>) -> Self {
        self.home = home;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// An instance eligible for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub instance: &'a ItemInstance,
    /// Unused supply of the instance's pool minus what the buffer reserves;
    /// at most 1 for report-required instances.
    pub remaining: usize,
}

/// Per-pool view for quantity pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary<'a> {
    pub pool: PoolKey,
    pub allocation: Option<&'a Allocation>,
    pub supply: usize,
    pub reserved: usize,
    pub remaining: usize,
}

type RankKey = (u8, u8, (String, String), Option<String>, usize);

fn rank(instance: &ItemInstance, home: Option<&AllocationKey>, position: usize) -> RankKey {
    let key = instance.allocation_key();
    let home_rank = match (key, home) {
        (Some(key), Some(home)) if key.matches_hint(home) => 0,
        _ => 1,
    };
    let allocated_rank = if key.is_some() { 0 } else { 1 };
    (
        home_rank,
        allocated_rank,
        collation_key(instance.group()),
        instance.serial().map(str::to_string),
        position,
    )
}

/// Instances eligible for selection, ordered for display.
///
/// Drops instances bound to other receipts (unless the edited receipt owned
/// them), instances already in `buffer`, and instances not matching the query
/// text. Ranks home-allocation matches first, then allocated before
/// unallocated, then alphabetically by group name.
pub fn resolve<'a>(
    availability: &'a Availability,
    buffer: &CompositionBuffer,
    query: &CandidateQuery,
) -> Vec<Candidate<'a>> {
    let supplies = availability.supplies();

    let mut ranked: Vec<(RankKey, Candidate<'a>)> = availability
        .catalog()
        .iter()
        .enumerate()
        .filter(|(_, i)| !availability.is_blocked(i.id()))
        .filter(|(_, i)| !buffer.contains(i.id()))
        .filter(|(_, i)| query.text.as_ref().is_none_or(|q| i.matches(q)))
        .map(|(position, instance)| {
            let remaining = if instance.is_report_required() {
                1
            } else {
                let pool = instance.pool_key();
                let supply = supplies.get(&pool).copied().unwrap_or(0);
                supply.saturating_sub(buffer.reserved(&pool))
            };
            (
                rank(instance, query.home.as_ref(), position),
                Candidate {
                    instance,
                    remaining,
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| a.0.cmp(&b.0));

    let limit = query.limit.unwrap_or(usize::MAX);
    ranked.into_iter().take(limit).map(|(_, c)| c).collect()
}

/// Supply summary of every ordinary pool with at least one unblocked
/// instance matching the query, in the same order as `resolve`.
pub fn group_summaries<'a>(
    availability: &'a Availability,
    buffer: &CompositionBuffer,
    query: &CandidateQuery,
) -> Vec<GroupSummary<'a>> {
    let mut first_seen: HashMap<PoolKey, (usize, &'a ItemInstance)> = HashMap::new();
    let mut supplies: HashMap<PoolKey, usize> = HashMap::new();
    let mut matching: HashMap<PoolKey, bool> = HashMap::new();

    for (position, instance) in availability.catalog().iter().enumerate() {
        if instance.is_report_required() || availability.is_blocked(instance.id()) {
            continue;
        }
        let pool = instance.pool_key();
        let hit = query.text.as_ref().is_none_or(|q| instance.matches(q));
        *supplies.entry(pool.clone()).or_insert(0) += 1;
        *matching.entry(pool.clone()).or_insert(false) |= hit;
        first_seen.entry(pool).or_insert((position, instance));
    }

    let mut ranked: Vec<(RankKey, GroupSummary<'a>)> = first_seen
        .into_iter()
        .filter(|(pool, _)| matching.get(pool).copied().unwrap_or(false))
        .map(|(pool, (position, instance))| {
            let supply = supplies.get(&pool).copied().unwrap_or(0);
            let reserved = buffer.reserved(&pool);
            let mut key = rank(instance, query.home.as_ref(), position);
            key.3 = None;
            (
                key,
                GroupSummary {
                    allocation: instance.allocation(),
                    supply,
                    reserved,
                    remaining: supply.saturating_sub(reserved),
                    pool,
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| a.0.cmp(&b.0));

    let limit = query.limit.unwrap_or(usize::MAX);
    ranked.into_iter().take(limit).map(|(_, s)| s).collect()
}

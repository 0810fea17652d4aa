use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::card::{CardId, Deck, DeckEntry, Flashcard};
use crate::progress::{self, PracticeRecord, ProgressStats};
use crate::scheduler::{self, BucketMap, Difficulty, MAX_BUCKET, StructuralError};

pub const DEFAULT_RETIRED_BUCKET: u32 = 5;

#[derive(Debug, Clone)]
pub struct Study {
    deck: Deck,
    buckets: BucketMap,
    history: Vec<PracticeRecord>,
    day: u64,
}

impl Study {
    /// Places each entry in its stored bucket. Bucket 0 and a retired
    /// bucket always exist afterwards; an entry stored above
    /// `retired_bucket` becomes the retired bucket instead. Buckets past
    /// [`MAX_BUCKET`] are clamped to it.
    pub fn new(entries: Vec<DeckEntry>, retired_bucket: u32) -> Study {
        let mut deck = Deck::new();
        let mut buckets = BucketMap::new();
        for entry in entries {
            let bucket = if entry.bucket > MAX_BUCKET {
                log::warn!(
                    "card {:?} stored in bucket {}, clamping to {}",
                    entry.card.front,
                    entry.bucket,
                    MAX_BUCKET
                );
                MAX_BUCKET
            } else {
                entry.bucket
            };
            let id = deck.insert(entry.card);
            buckets.entry(bucket).or_default().insert(id);
        }
        buckets.entry(0).or_default();
        let retired_bucket = retired_bucket.clamp(1, MAX_BUCKET);
        if buckets.keys().next_back().is_some_and(|&max| max < retired_bucket) {
            buckets.entry(retired_bucket).or_default();
        }

        log::debug!(
            "study loaded: {} cards across {} buckets",
            deck.len(),
            buckets.len()
        );
        Study {
            deck,
            buckets,
            history: Vec::new(),
            day: 0,
        }
    }

    pub fn buckets(&self) -> &BucketMap {
        &self.buckets
    }

    pub fn history(&self) -> &[PracticeRecord] {
        &self.history
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn card(&self, id: CardId) -> Option<&Flashcard> {
        self.deck.get(id)
    }

    pub fn find_card(&self, front: &str, back: &str) -> Option<CardId> {
        self.deck
            .iter()
            .find(|(_, card)| card.front == front && card.back == back)
            .map(|(id, _)| id)
    }

    pub fn find_card_bucket(&self, id: CardId) -> Option<u32> {
        scheduler::find_bucket(&self.buckets, id)
    }

    pub fn practice_cards(&self) -> Result<Vec<CardId>, StructuralError> {
        let sets = scheduler::normalize(&self.buckets)?;
        let due: BTreeSet<CardId> = scheduler::select_due(&sets, self.day);
        Ok(due.into_iter().collect())
    }

    /// Applies an answer and logs it. Returns `None`, leaving everything
    /// as it was, when the card is in no bucket.
    pub fn answer(
        &mut self,
        id: CardId,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Option<PracticeRecord> {
        let previous_bucket = self.find_card_bucket(id)?;
        let card = self.deck.get(id)?;

        self.buckets = scheduler::update(&self.buckets, id, difficulty);
        let new_bucket = self.find_card_bucket(id)?;

        let record = PracticeRecord {
            card_front: card.front.clone(),
            card_back: card.back.clone(),
            timestamp: now,
            difficulty,
            previous_bucket,
            new_bucket,
        };
        log::info!(
            "answered {:?} with {:?}: bucket {} -> {}",
            record.card_front,
            difficulty,
            previous_bucket,
            new_bucket
        );
        self.history.push(record.clone());
        Some(record)
    }

    pub fn hint(&self, id: CardId) -> Option<&str> {
        self.deck.get(id).map(scheduler::hint)
    }

    pub fn progress(&self) -> Result<ProgressStats, StructuralError> {
        progress::compute_progress(&self.buckets, &self.history)
    }

    pub fn next_day(&mut self) -> u64 {
        self.day += 1;
        log::info!("advanced to day {}", self.day);
        self.day
    }

    pub fn entries(&self) -> Vec<DeckEntry> {
        self.deck
            .iter()
            .filter_map(|(id, card)| {
                self.find_card_bucket(id).map(|bucket| DeckEntry {
                    card: card.clone(),
                    bucket,
                })
            })
            .collect()
    }
}

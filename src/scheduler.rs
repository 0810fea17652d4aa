// Leitner box scheduling.
// Bucket 0 is reviewed every day, bucket i every 2^i days, and the highest
// bucket holds retired cards that are never scheduled.

use std::collections::{BTreeMap, BTreeSet};

use crate::card::{CardId, Flashcard};

pub type BucketMap = BTreeMap<u32, BTreeSet<CardId>>;

pub type BucketSets = Vec<BTreeSet<CardId>>;

// Bucket 63 already has the longest interval a u64 day counter can hit.
pub const MAX_BUCKET: u32 = 63;

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Wrong = 0,
    Hard = 1,
    Easy = 2,
}

impl Difficulty {
    pub fn from_u8(n: u8) -> Option<Difficulty> {
        match n {
            0 => Some(Difficulty::Wrong),
            1 => Some(Difficulty::Hard),
            2 => Some(Difficulty::Easy),
            _ => None,
        }
    }

    // Hard still counts as recalled.
    pub fn is_success(self) -> bool {
        self != Difficulty::Wrong
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> u8 {
        d as u8
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(n: u8) -> Result<Difficulty, String> {
        Difficulty::from_u8(n).ok_or_else(|| format!("invalid difficulty {n}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("buckets must include at least bucket 0 and a retired bucket")]
    MissingBaseBucket,
    #[error("must have a retired bucket with number > 0")]
    MissingRetiredBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub min: u32,
    pub max: u32,
}

pub fn check_structure(buckets: &BucketMap) -> Result<(), StructuralError> {
    if !buckets.contains_key(&0) {
        return Err(StructuralError::MissingBaseBucket);
    }
    if buckets.range(1..).next().is_none() {
        return Err(StructuralError::MissingRetiredBucket);
    }
    Ok(())
}

pub fn normalize(buckets: &BucketMap) -> Result<BucketSets, StructuralError> {
    let Some(&max) = buckets.keys().next_back() else {
        return Ok(Vec::new());
    };
    check_structure(buckets)?;

    let mut sets = vec![BTreeSet::new(); max as usize + 1];
    for (&number, cards) in buckets {
        sets[number as usize] = cards.clone();
    }
    Ok(sets)
}

pub fn bucket_range(buckets: &[BTreeSet<CardId>]) -> Option<BucketRange> {
    let mut occupied = buckets
        .iter()
        .enumerate()
        .filter(|(_, cards)| !cards.is_empty())
        .map(|(i, _)| i as u32);
    let min = occupied.next()?;
    let max = occupied.last().unwrap_or(min);
    Some(BucketRange { min, max })
}

fn bucket_due(bucket: usize, day: u64) -> bool {
    if day == 0 {
        return bucket == 0;
    }
    match u32::try_from(bucket).ok().and_then(|b| 1u64.checked_shl(b)) {
        Some(interval) => day % interval == 0,
        None => false,
    }
}

// The last bucket is the retired one and is skipped.
pub fn select_due(buckets: &[BTreeSet<CardId>], day: u64) -> BTreeSet<CardId> {
    let mut due = BTreeSet::new();
    if let Some(first) = buckets.first() {
        due.extend(first.iter().copied());
    }
    let last = buckets.len().saturating_sub(1);
    for (i, cards) in buckets.iter().enumerate().take(last).skip(1) {
        if bucket_due(i, day) {
            due.extend(cards.iter().copied());
        }
    }
    due
}

pub fn find_bucket(buckets: &BucketMap, card: CardId) -> Option<u32> {
    buckets
        .iter()
        .find(|(_, cards)| cards.contains(&card))
        .map(|(&number, _)| number)
}

/// Moves `card` according to `difficulty` and returns the new assignment.
/// The input is left untouched, and a card found in no bucket changes
/// nothing.
pub fn update(buckets: &BucketMap, card: CardId, difficulty: Difficulty) -> BucketMap {
    let mut next = buckets.clone();
    let Some(current) = find_bucket(buckets, card) else {
        return next;
    };

    let target = match difficulty {
        Difficulty::Wrong => 0,
        Difficulty::Hard => current,
        Difficulty::Easy => current.saturating_add(1),
    };

    if let Some(cards) = next.get_mut(&current) {
        cards.remove(&card);
    }
    next.entry(target).or_default().insert(card);
    next
}

pub fn hint(card: &Flashcard) -> &str {
    card.hint.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Deck;

    fn ids(n: usize) -> (Deck, Vec<CardId>) {
        let mut deck = Deck::new();
        let ids = (0..n)
            .map(|i| deck.insert(Flashcard::new(&format!("Q{i}"), &format!("A{i}"), "", &[])))
            .collect();
        (deck, ids)
    }

    fn set(cards: &[CardId]) -> BTreeSet<CardId> {
        cards.iter().copied().collect()
    }

    #[test]
    fn difficulty_ordinals() {
        assert_eq!(Difficulty::from_u8(0), Some(Difficulty::Wrong));
        assert_eq!(Difficulty::from_u8(1), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_u8(2), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_u8(3), None);
        assert_eq!(u8::from(Difficulty::Easy), 2);
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "1");
        assert!(serde_json::from_str::<Difficulty>("7").is_err());
    }

    #[test]
    fn empty_map_gives_empty_sets() {
        assert_eq!(normalize(&BucketMap::new()), Ok(Vec::new()));
    }

    #[test]
    fn missing_bucket_zero_is_rejected() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(1, set(&c))]);
        assert_eq!(normalize(&buckets), Err(StructuralError::MissingBaseBucket));
    }

    #[test]
    fn missing_retired_bucket_is_rejected() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&c))]);
        assert_eq!(
            normalize(&buckets),
            Err(StructuralError::MissingRetiredBucket)
        );
    }

    #[test]
    fn gaps_are_filled_with_empty_sets() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&[])), (2, set(&c)), (3, set(&[]))]);
        let sets = normalize(&buckets).unwrap();
        assert_eq!(sets, vec![set(&[]), set(&[]), set(&c), set(&[])]);
    }

    #[test]
    fn bucket_range_spans_occupied_buckets() {
        let (_, c) = ids(1);
        assert_eq!(bucket_range(&[]), None);
        assert_eq!(bucket_range(&[set(&[]), set(&[])]), None);
        assert_eq!(
            bucket_range(&[set(&[]), set(&c), set(&[])]),
            Some(BucketRange { min: 1, max: 1 })
        );
        assert_eq!(
            bucket_range(&[set(&[]), set(&c), set(&[]), set(&c)]),
            Some(BucketRange { min: 1, max: 3 })
        );
    }

    #[test]
    fn day_zero_selects_only_bucket_zero() {
        let (_, c) = ids(4);
        let sets = vec![set(&c[0..1]), set(&c[1..2]), set(&c[2..3]), set(&c[3..4])];
        assert_eq!(select_due(&sets, 0), set(&c[0..1]));
    }

    #[test]
    fn buckets_follow_power_of_two_intervals() {
        let (_, c) = ids(5);
        let sets = vec![
            set(&c[0..1]),
            set(&c[1..2]),
            set(&c[2..3]),
            set(&c[3..4]),
            set(&c[4..5]),
        ];
        assert_eq!(select_due(&sets, 1), set(&c[0..1]));
        assert_eq!(select_due(&sets, 2), set(&c[0..2]));
        assert_eq!(select_due(&sets, 4), set(&c[0..3]));
        assert_eq!(select_due(&sets, 6), set(&c[0..2]));
        assert_eq!(select_due(&sets, 8), set(&c[0..4]));
    }

    #[test]
    fn retired_bucket_is_never_due() {
        let (_, c) = ids(1);
        let sets = vec![set(&[]), set(&[]), set(&c)];
        for day in 0..16 {
            assert!(select_due(&sets, day).is_empty());
        }
    }

    #[test]
    fn empty_buckets_select_nothing() {
        assert!(select_due(&[], 3).is_empty());
        assert!(select_due(&[set(&[]), set(&[])], 0).is_empty());
    }

    #[test]
    fn huge_bucket_numbers_do_not_overflow() {
        assert!(!bucket_due(200, 1 << 40));
        assert!(bucket_due(63, 1 << 63));
    }

    #[test]
    fn easy_promotes_one_bucket() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&c)), (1, set(&[])), (2, set(&[]))]);
        let next = update(&buckets, c[0], Difficulty::Easy);
        assert_eq!(find_bucket(&next, c[0]), Some(1));
        assert!(next[&0].is_empty());
    }

    #[test]
    fn easy_promotes_past_retirement() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&[])), (2, set(&c))]);
        let next = update(&buckets, c[0], Difficulty::Easy);
        assert_eq!(find_bucket(&next, c[0]), Some(3));
        assert!(next[&2].is_empty());
    }

    #[test]
    fn easy_at_highest_bucket_number_saturates() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&[])), (u32::MAX, set(&c))]);
        let next = update(&buckets, c[0], Difficulty::Easy);
        assert_eq!(find_bucket(&next, c[0]), Some(u32::MAX));
        assert!(next[&0].is_empty());
    }

    #[test]
    fn hard_stays_put() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(0, set(&[])), (1, set(&[])), (2, set(&c))]);
        let next = update(&buckets, c[0], Difficulty::Hard);
        assert_eq!(next, buckets);
    }

    #[test]
    fn wrong_resets_to_zero() {
        let (_, c) = ids(1);
        let buckets = BucketMap::from([(3, set(&c)), (4, set(&[]))]);
        let next = update(&buckets, c[0], Difficulty::Wrong);
        assert_eq!(find_bucket(&next, c[0]), Some(0));
        assert!(next[&3].is_empty());
    }

    #[test]
    fn unknown_card_changes_nothing() {
        let (_, c) = ids(2);
        let buckets = BucketMap::from([(0, set(&c[0..1])), (1, set(&[]))]);
        for difficulty in [Difficulty::Wrong, Difficulty::Hard, Difficulty::Easy] {
            assert_eq!(update(&buckets, c[1], difficulty), buckets);
        }
    }

    #[test]
    fn update_leaves_input_untouched() {
        let (_, c) = ids(2);
        let buckets = BucketMap::from([(0, set(&c)), (1, set(&[]))]);
        let before = buckets.clone();
        let first = update(&buckets, c[0], Difficulty::Easy);
        let second = update(&buckets, c[0], Difficulty::Easy);
        assert_eq!(buckets, before);
        assert_eq!(first, second);
    }

    #[test]
    fn identical_cards_move_independently() {
        let mut deck = Deck::new();
        let a = deck.insert(Flashcard::new("Q", "A", "", &[]));
        let b = deck.insert(Flashcard::new("Q", "A", "", &[]));
        let buckets = BucketMap::from([(0, set(&[a, b])), (1, set(&[]))]);
        let next = update(&buckets, a, Difficulty::Easy);
        assert_eq!(find_bucket(&next, a), Some(1));
        assert_eq!(find_bucket(&next, b), Some(0));
    }

    #[test]
    fn hint_falls_back_to_empty() {
        assert_eq!(hint(&Flashcard::new("Q", "A", "This is a hint", &[])), "This is a hint");
        assert_eq!(hint(&Flashcard::new("Q", "A", "", &[])), "");
        assert_eq!(hint(&Flashcard::without_hint("Q", "A", &[])), "");
    }
}

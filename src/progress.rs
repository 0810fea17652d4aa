use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::scheduler::{self, BucketMap, Difficulty, StructuralError};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRecord {
    pub card_front: String,
    pub card_back: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub previous_bucket: u32,
    pub new_bucket: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardCard {
    pub front: String,
    pub back: String,
    pub wrong_count: usize,
    pub move_count: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_cards: usize,
    pub cards_by_bucket: BTreeMap<u32, usize>,
    pub retired_cards: usize,
    pub success_rate: f64,
    pub average_moves_per_card: f64,
    pub total_practice_events: usize,
    // Most-missed first.
    pub hardest_cards: Vec<HardCard>,
}

pub fn compute_progress(
    buckets: &BucketMap,
    history: &[PracticeRecord],
) -> Result<ProgressStats, StructuralError> {
    scheduler::check_structure(buckets)?;

    let total_cards = buckets.values().map(|cards| cards.len()).sum();

    let max = buckets.keys().next_back().copied().unwrap_or(0);
    let cards_by_bucket = (0..=max)
        .map(|n| (n, buckets.get(&n).map_or(0, |cards| cards.len())))
        .collect();
    let retired_cards = buckets.get(&max).map_or(0, |cards| cards.len());

    let total = history.len();
    let successes = history.iter().filter(|r| r.difficulty.is_success()).count();
    let success_rate = if total > 0 {
        successes as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let hardest_cards = rank_cards(history);
    let average_moves_per_card = if hardest_cards.is_empty() {
        0.0
    } else {
        total as f64 / hardest_cards.len() as f64
    };

    Ok(ProgressStats {
        total_cards,
        cards_by_bucket,
        retired_cards,
        success_rate,
        average_moves_per_card,
        total_practice_events: total,
        hardest_cards,
    })
}

// Cards are keyed by (front, back) and start in first-seen order, so equal
// scores keep that order through the stable sort.
fn rank_cards(history: &[PracticeRecord]) -> Vec<HardCard> {
    let mut cards: Vec<HardCard> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for record in history {
        let key = (record.card_front.as_str(), record.card_back.as_str());
        let i = *index.entry(key).or_insert_with(|| {
            cards.push(HardCard {
                front: record.card_front.clone(),
                back: record.card_back.clone(),
                wrong_count: 0,
                move_count: 0,
            });
            cards.len() - 1
        });
        cards[i].move_count += 1;
        if record.difficulty == Difficulty::Wrong {
            cards[i].wrong_count += 1;
        }
    }

    cards.sort_by(|a, b| {
        b.wrong_count
            .cmp(&a.wrong_count)
            .then(b.move_count.cmp(&a.move_count))
    });
    cards
}

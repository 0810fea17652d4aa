use std::path::{Path, PathBuf};

use crate::scheduler::MAX_BUCKET;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    /// `None` when the deck never supplied a hint, `Some("")` for an
    /// explicitly blank one.
    pub hint: Option<String>,
    pub tags: Vec<String>,
}

impl Flashcard {
    pub fn new(front: &str, back: &str, hint: &str, tags: &[&str]) -> Flashcard {
        Flashcard {
            front: front.to_string(),
            back: back.to_string(),
            hint: Some(hint.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn without_hint(front: &str, back: &str, tags: &[&str]) -> Flashcard {
        Flashcard {
            hint: None,
            ..Flashcard::new(front, back, "", tags)
        }
    }
}

/// Handle to a card in a [`Deck`]. Two cards with identical fields get
/// distinct ids, so bucket membership is by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId(usize);

#[derive(Debug, Default, Clone)]
pub struct Deck {
    cards: Vec<Flashcard>,
}

impl Deck {
    pub fn new() -> Deck {
        Deck::default()
    }

    pub fn insert(&mut self, card: Flashcard) -> CardId {
        self.cards.push(card);
        CardId(self.cards.len() - 1)
    }

    pub fn get(&self, id: CardId) -> Option<&Flashcard> {
        self.cards.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CardId, &Flashcard)> {
        self.cards.iter().enumerate().map(|(i, c)| (CardId(i), c))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckEntry {
    pub card: Flashcard,
    pub bucket: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: csv::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: csv::Error },
    #[error("invalid bucket {value:?} in {}", .path.display())]
    InvalidBucket { path: PathBuf, value: String },
    #[error("flush error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn sample_deck() -> Vec<DeckEntry> {
    [
        Flashcard::new(
            "What is the capital of France?",
            "Paris",
            "This city is known for the Eiffel Tower",
            &["geography", "European capitals"],
        ),
        Flashcard::new(
            "What is 2 + 2?",
            "4",
            "This is a basic arithmetic operation",
            &["math", "basic arithmetic"],
        ),
        Flashcard::new(
            "Who wrote 'Romeo and Juliet'?",
            "William Shakespeare",
            "He was an English playwright from the Elizabethan era",
            &["literature", "playwright"],
        ),
        Flashcard::new(
            "What is the largest planet in our solar system?",
            "Jupiter",
            "This gas giant has a great red spot",
            &["astronomy", "planets"],
        ),
    ]
    .into_iter()
    .map(|card| DeckEntry { card, bucket: 0 })
    .collect()
}

fn split_tags(s: &str) -> Vec<String> {
    s.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_field(record: &csv::StringRecord, index: Option<usize>) -> String {
    index.and_then(|i| record.get(i)).unwrap_or("").to_string()
}

/// Loads a deck file, finding the `front,back,hint,tags,bucket` columns by
/// header name. Short rows are allowed; a file without a `hint` column
/// yields cards with no hint supplied.
pub fn load_csv(path: &Path) -> Result<Vec<DeckEntry>, DeckError> {
    let read_err = |source| DeckError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let headers = reader.headers().map_err(read_err)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (front, back, hint, tags, bucket_col) = (
        column("front"),
        column("back"),
        column("hint"),
        column("tags"),
        column("bucket"),
    );

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result.map_err(read_err)?;

        let bucket_raw = get_field(&record, bucket_col);
        let bucket = if bucket_raw.trim().is_empty() {
            0
        } else {
            bucket_raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&b| b <= MAX_BUCKET)
                .ok_or_else(|| DeckError::InvalidBucket {
                    path: path.to_path_buf(),
                    value: bucket_raw.clone(),
                })?
        };

        entries.push(DeckEntry {
            card: Flashcard {
                front: get_field(&record, front),
                back: get_field(&record, back),
                hint: hint.and_then(|i| record.get(i)).map(str::to_string),
                tags: split_tags(&get_field(&record, tags)),
            },
            bucket,
        });
    }
    Ok(entries)
}

// The hint column is only written when some card has a hint, so a deck
// that never had hints reloads without them.
pub fn save_csv(path: &Path, entries: &[DeckEntry]) -> Result<(), DeckError> {
    let write_err = |source| DeckError::Write {
        path: path.to_path_buf(),
        source,
    };

    let with_hint = entries.iter().any(|e| e.card.hint.is_some());
    let header: &[&str] = if with_hint {
        &["front", "back", "hint", "tags", "bucket"]
    } else {
        &["front", "back", "tags", "bucket"]
    };

    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer.write_record(header).map_err(write_err)?;

    for entry in entries {
        let card = &entry.card;
        let mut record = vec![card.front.clone(), card.back.clone()];
        if with_hint {
            record.push(card.hint.clone().unwrap_or_default());
        }
        record.push(card.tags.join(";"));
        record.push(entry.bucket.to_string());
        writer.write_record(&record).map_err(write_err)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn load_decks(files: &[PathBuf]) -> Vec<(DeckEntry, PathBuf)> {
    let mut loaded = Vec::new();
    for file in files {
        match load_csv(file) {
            Ok(entries) => {
                log::debug!("{}: {} cards", file.display(), entries.len());
                loaded.extend(entries.into_iter().map(|e| (e, file.clone())));
            }
            Err(e) => log::warn!("{e}"),
        }
    }
    loaded
}

pub fn discover_files(paths: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for p in paths {
        let path = PathBuf::from(p);
        if path.is_dir() {
            collect_csv_recursive(&path, &mut files);
        } else if is_csv(&path) {
            files.push(path);
        }
    }
    files.sort();
    files.dedup();
    files
}

fn is_csv(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("csv")
}

fn collect_csv_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::warn!("cannot read directory {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_csv_recursive(&path, files);
        } else if is_csv(&path) {
            files.push(path);
        }
    }
}

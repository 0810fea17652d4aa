use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use leitner::card::{self, DeckEntry};
use leitner::config::{DrillConfig, ServeConfig};
use leitner::review::Study;
use leitner::scheduler::Difficulty;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: leitner <command> [args...]");
        eprintln!("Commands:");
        eprintln!("  drill <paths...> [-d DAY] [-r RETIRED]      Review due cards in the terminal");
        eprintln!("  serve [paths...] [-p PORT] [-r RETIRED]     Start the JSON API (default port 3001)");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "drill" => {
            let config = DrillConfig::from_args(&args[2..]).unwrap_or_else(|e| {
                eprintln!("Usage: leitner drill <paths...> [-d DAY] [-r RETIRED]: {e}");
                std::process::exit(1);
            });
            if let Err(e) = drill(&config) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        "serve" => {
            let env_port = std::env::var("PORT").ok();
            let config = ServeConfig::from_args(&args[2..], env_port.as_deref())
                .unwrap_or_else(|e| {
                    eprintln!("Usage: leitner serve [paths...] [-p PORT] [-r RETIRED]: {e}");
                    std::process::exit(1);
                });
            let result = tokio::runtime::Runtime::new()
                .and_then(|rt| rt.block_on(leitner::web::serve(config)));
            if let Err(e) = result {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            eprintln!("Commands: drill, serve");
            std::process::exit(1);
        }
    }
}

fn drill(config: &DrillConfig) -> io::Result<()> {
    let files = card::discover_files(&config.paths);
    if files.is_empty() {
        eprintln!("No CSV files found.");
        std::process::exit(1);
    }

    let (entries, card_source): (Vec<DeckEntry>, Vec<PathBuf>) =
        card::load_decks(&files).into_iter().unzip();
    if entries.is_empty() {
        eprintln!("No cards found.");
        std::process::exit(1);
    }

    let mut study = Study::new(entries, config.retired_bucket);
    for _ in 0..config.day {
        study.next_day();
    }

    let due = match study.practice_cards() {
        Ok(due) => due,
        Err(e) => {
            eprintln!("Cannot schedule: {e}");
            std::process::exit(1);
        }
    };
    if due.is_empty() {
        println!("No cards due on day {}.", study.day());
        return Ok(());
    }

    println!("Day {}: {} cards due for review.\n", study.day(), due.len());

    // Drill loop
    let mut counts = [0u32; 3]; // wrong, hard, easy
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    for (i, &id) in due.iter().enumerate() {
        let Some(card) = study.card(id).cloned() else {
            continue;
        };
        println!("[{}/{}] {}", i + 1, due.len(), card.tags.join(", "));
        println!();
        println!("{}", card.front);
        println!();

        let hint = leitner::scheduler::hint(&card);
        if !hint.is_empty() {
            println!("Hint: {hint}");
            println!();
        }

        print!("Press Enter to reveal...");
        io::stdout().flush()?;
        let mut buf = String::new();
        stdin.read_line(&mut buf)?;

        println!("{}", card.back);
        println!();

        let difficulty = loop {
            print!("Rate (0=wrong, 1=hard, 2=easy): ");
            io::stdout().flush()?;
            buf.clear();
            if stdin.read_line(&mut buf)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
            }
            if let Ok(n) = buf.trim().parse::<u8>()
                && let Some(d) = Difficulty::from_u8(n)
            {
                break d;
            }
            println!("Please enter 0, 1, or 2.");
        };

        counts[u8::from(difficulty) as usize] += 1;
        study.answer(id, difficulty, chrono::Utc::now());
        println!();
    }

    // Save all cards back to their source files
    let mut files_to_save: HashMap<PathBuf, Vec<DeckEntry>> = HashMap::new();
    for (entry, source) in study.entries().into_iter().zip(&card_source) {
        files_to_save.entry(source.clone()).or_default().push(entry);
    }

    for (path, entries) in &files_to_save {
        if let Err(e) = card::save_csv(path, entries) {
            log::error!("{e}");
            eprintln!("Error saving {}: {e}", path.display());
        }
    }

    println!("Session complete!");
    println!(
        "  Wrong: {}, Hard: {}, Easy: {}",
        counts[0], counts[1], counts[2]
    );
    if let Ok(stats) = study.progress() {
        println!(
            "  Success rate: {:.0}%, retired cards: {}",
            stats.success_rate, stats.retired_cards
        );
    }
    Ok(())
}

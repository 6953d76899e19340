use screener_core::{
    CancelToken, Screener, SearchOptions, WatchlistProvider, WatchlistRecord,
};
use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};

const RESULT_COUNT: usize = 5;

/// Reads the watch-list from a JSON file:
/// `[{"id": 1, "full_name": "EL MUHAMMED HALED", "birthday": "1982-10-03"}, ...]`
struct FileProvider {
    path: PathBuf,
}

impl WatchlistProvider for FileProvider {
    fn get_all_records(
        &self,
    ) -> Result<Vec<WatchlistRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let data = std::fs::read_to_string(&self.path)?;
        let records: Vec<WatchlistRecord> = serde_json::from_str(&data)?;
        Ok(records)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: screener <watchlist.json>");
            std::process::exit(2);
        }
    };

    let screener = Screener::new();
    if let Err(e) = reload(&screener, &path) {
        eprintln!("failed to load watch-list: {e}");
        std::process::exit(1);
    }

    println!("Watch-list name screener. Type a name to search, 'reload' to re-read the file, 'exit' to quit.");
    println!("--------------------------------------------------------------------------------------------");

    let options = SearchOptions::default();

    loop {
        print!("> ");
        let _ = stdout().flush();

        let mut line = String::new();
        if stdin().read_line(&mut line).is_err() {
            break;
        }
        let query = line.trim();

        match query {
            "exit" => break,
            "reload" => {
                if let Err(e) = reload(&screener, &path) {
                    eprintln!("reload failed, previous catalog kept: {e}");
                }
            }
            "" => {}
            _ => {
                let hits = screener.search(query, Some(RESULT_COUNT), &options, &CancelToken::new());
                if hits.is_empty() {
                    println!("no matches");
                } else {
                    for (rank, hit) in hits.iter().enumerate() {
                        let birthday = hit
                            .birthday
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        println!(
                            "{:>2}. {:.4}  [{}] {} (born {birthday})",
                            rank + 1,
                            hit.avg_coefficient,
                            hit.person_id,
                            hit.full_name,
                        );
                    }
                }
            }
        }
    }
}

fn reload(screener: &Screener, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let provider = FileProvider {
        path: path.to_path_buf(),
    };
    let stats = screener.refresh(&provider)?;
    println!("loaded {} records ({} rejected)", stats.loaded, stats.rejected);
    Ok(())
}

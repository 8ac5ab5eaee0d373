use clap::Parser;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use tokio::time::Duration;
use tracing::{error, info, Level};

use zoekt_client::render::{render_repository_table, render_search_result};
use zoekt_client::{
    Args, BatchRunner, Command, ListOptions, ListOptionsField, QueryComponents, SearchOptions,
    ZoektClient,
};

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load .env before clap reads ZOEKT_* variables
    dotenv().ok();
    let args = Args::parse();

    // Initialize the tracing logger
    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = args.client_config()?;
    let client = ZoektClient::new(config)?;

    match args.command {
        Command::Search {
            query,
            context,
            max_matches,
            json,
            language,
            file,
            repo,
            case_sensitive,
            tab_size,
        } => {
            // Build query with filters
            let mut components = QueryComponents::parse(&query);
            if let Some(language) = &language {
                components.set_language(language);
            }
            if let Some(file) = &file {
                components.add_file_pattern(file);
            }
            if let Some(repo) = &repo {
                components.add_repo_pattern(repo);
            }
            if case_sensitive {
                components.set_case_sensitive();
            }
            let final_query = components.build();

            let options = SearchOptions::default()
                .with_context_lines(context)
                .with_max_doc_display_count(max_matches);

            let pb = spinner(format!("Searching '{}'", final_query));
            let outcome = client.search(&final_query, &options).await;
            pb.finish_and_clear();

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("Search failed: {}", e);
                    return Err(e.into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_search_result(&result, tab_size)?);
            }
        }

        Command::List {
            query,
            json,
            minimal,
        } => {
            let options = ListOptions {
                field: ListOptionsField::Full,
            };
            let list = client.list_repositories(&query, Some(options)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if minimal {
                for info in &list.repos {
                    println!("{}", info.repository.name);
                }
            } else {
                print!("{}", render_repository_table(&list));
            }
        }

        Command::Batch {
            words,
            output,
            concurrency,
        } => {
            let runner = BatchRunner::new(client, &output, concurrency);
            let results = runner.run(words).await?;
            let matches: i64 = results.iter().map(|(_, r)| r.stats.match_count).sum();
            info!(
                "Finished {} searches ({} matches), saved to '{}'",
                results.len(),
                matches,
                output
            );
        }
    }

    Ok(())
}

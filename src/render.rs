//! Terminal rendering of search results and repository lists.

use colored::Colorize;

use crate::error::ZoektError;
use crate::highlight::{fragment_spans, highlight_line, match_columns};
use crate::models::{ChunkMatch, FileMatch, LineMatch, RepositoryList, SearchResult};

fn paint_match(text: &str) -> String {
    text.black().on_yellow().bold().to_string()
}

pub fn render_search_result(result: &SearchResult, tab_size: usize) -> Result<String, ZoektError> {
    let mut out = String::new();
    out.push_str(&format!(
        "{}{} {}{} {}\n",
        "Found ".green().bold(),
        result.stats.match_count.to_string().yellow().bold(),
        "matches in ".green().bold(),
        result.stats.file_count.to_string().yellow().bold(),
        "files".green().bold()
    ));

    for file in &result.files {
        out.push('\n');
        out.push_str(&render_file_header(result, file));
        for chunk in file.chunk_matches.iter().flatten() {
            out.push_str(&render_chunk(chunk, tab_size)?);
        }
        for line_match in file.line_matches.iter().flatten() {
            out.push_str(&render_line_match(line_match, tab_size)?);
        }
    }
    Ok(out)
}

fn render_file_header(result: &SearchResult, file: &FileMatch) -> String {
    let mut out = format!(
        "{}{}\n",
        format!("{}/", file.repository).blue().bold(),
        file.file_name.cyan().bold()
    );
    out.push_str(&format!(
        "  Language: {} | Score: {:.2}\n",
        file.language.as_deref().unwrap_or("unknown"),
        file.score
    ));
    if let Some(url) = result.file_url(file, file.first_line_number()) {
        out.push_str(&format!("  {}\n", url.underline()));
    }
    out
}

/// Line-numbered chunk content with every match range highlighted.
pub fn render_chunk(chunk: &ChunkMatch, tab_size: usize) -> Result<String, ZoektError> {
    let content = chunk.decoded_content()?;
    let first_line = chunk.content_start.line_number;
    let lines: Vec<&str> = content.lines().collect();
    let width = (first_line as usize + lines.len()).to_string().len();

    let mut out = String::new();
    for (line_number, line) in (first_line..).zip(lines) {
        let spans = match_columns(&chunk.ranges, line_number, line.chars().count());
        out.push_str(&format!(
            "{} │ {}\n",
            format!("{:>width$}", line_number, width = width).dimmed(),
            highlight_line(line, &spans, tab_size, paint_match)
        ));
    }
    Ok(out)
}

pub fn render_line_match(line_match: &LineMatch, tab_size: usize) -> Result<String, ZoektError> {
    let line = line_match.decoded_line()?;
    let context = line_match.decoded_context()?;

    let spans = fragment_spans(&line, &line_match.line_fragments);

    let mut out = String::new();
    for before in &context.before {
        out.push_str(&format!("  {}\n", before));
    }
    out.push_str(&format!(
        "{} {}\n",
        format!("{:>5} >", line_match.line_number).green().bold(),
        highlight_line(&line, &spans, tab_size, paint_match)
    ));
    for after in &context.after {
        out.push_str(&format!("  {}\n", after));
    }
    Ok(out)
}

pub fn render_repository_table(list: &RepositoryList) -> String {
    let mut out = format!(
        "{}{}{}\n\n",
        "Found ".green().bold(),
        list.repos.len().to_string().yellow().bold(),
        " repositories".green().bold()
    );

    let rows: Vec<[String; 5]> = list
        .repos
        .iter()
        .map(|info| {
            let repo = &info.repository;
            [
                repo.name.clone(),
                repo.branches
                    .iter()
                    .map(|b| b.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                repo.latest_commit_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                if repo.has_symbols { "Yes" } else { "No" }.to_string(),
                info.stats.documents.to_string(),
            ]
        })
        .collect();

    let headers = ["Repository", "Branches", "Latest Commit", "Symbols", "Files"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&format!("{}\n", header.bold()));
    for row in &rows {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = w))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

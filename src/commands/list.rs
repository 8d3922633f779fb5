// ABOUTME: List command showing every term that still has legacy meta
// ABOUTME: Collects per-term rows and renders them as table, csv, json, or count

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::carriers::CarrierIndex;
use crate::platform::Platform;

/// Output format for the list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Csv,
    Json,
    Count,
}

/// One term with legacy meta, as displayed to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMetaRow {
    pub post_id: u64,
    pub taxonomy: String,
    pub term_id: u64,
    pub term_slug: String,
    pub term_name: String,
    pub meta_entries: usize,
}

const COLUMNS: [&str; 6] = [
    "Post ID",
    "Taxonomy",
    "Term ID",
    "Term Slug",
    "Term Name",
    "Meta Entries",
];

/// List all terms with legacy term meta. Pure read.
pub async fn list<P: Platform>(db: &P, format: ListFormat) -> Result<()> {
    let rows = collect_rows(db).await?;

    match format {
        ListFormat::Table => print!("{}", render_table(&rows)),
        ListFormat::Csv => print!("{}", render_csv(&rows)),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        ListFormat::Count => println!("{}", rows.len()),
    }

    Ok(())
}

/// Resolve every carrier and count its legacy meta entries, flattened
/// to the total value count across keys.
pub async fn collect_rows<P: Platform>(db: &P) -> Result<Vec<TermMetaRow>> {
    let mut index = CarrierIndex::new();
    let resolved = index.resolve_terms(db).await?;

    let mut rows = Vec::with_capacity(resolved.len());
    for item in resolved {
        let meta_entries = match db
            .legacy_term_meta(item.term.term_id, &item.term.taxonomy)
            .await
        {
            Ok(meta) => meta.iter().map(|(_, values)| values.len()).sum(),
            Err(e) => {
                tracing::warn!(
                    "Failed to count term meta for term {}: {:#}",
                    item.term.term_id,
                    e
                );
                0
            }
        };

        rows.push(TermMetaRow {
            post_id: item.carrier.id,
            taxonomy: item.term.taxonomy,
            term_id: item.term.term_id,
            term_slug: item.term.slug,
            term_name: item.term.name,
            meta_entries,
        });
    }

    Ok(rows)
}

fn cells(row: &TermMetaRow) -> [String; 6] {
    [
        row.post_id.to_string(),
        row.taxonomy.clone(),
        row.term_id.to_string(),
        row.term_slug.clone(),
        row.term_name.clone(),
        row.meta_entries.to_string(),
    ]
}

fn render_table(rows: &[TermMetaRow]) -> String {
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
    let all_cells: Vec<[String; 6]> = rows.iter().map(cells).collect();
    for row in &all_cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let render_line = |fields: &[&str], out: &mut String| {
        let mut line = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(field);
            let pad = widths[i].saturating_sub(field.chars().count());
            if i + 1 < fields.len() {
                line.extend(std::iter::repeat(' ').take(pad));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };

    render_line(&COLUMNS, &mut out);
    let separators: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let separator_refs: Vec<&str> = separators.iter().map(String::as_str).collect();
    render_line(&separator_refs, &mut out);
    for row in &all_cells {
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        render_line(&refs, &mut out);
    }
    out
}

fn render_csv(rows: &[TermMetaRow]) -> String {
    let mut out = String::new();
    out.push_str(&COLUMNS.map(csv_escape).join(","));
    out.push('\n');
    for row in rows {
        let line = cells(row).map(|c| csv_escape(&c)).join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

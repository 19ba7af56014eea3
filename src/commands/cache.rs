//! `gitdiagram cache` command.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::context::ServiceContext;
use crate::diagram::gateway::CacheGateway;
use crate::ports::cache::{CachePage, ListQuery, SortDirection, SortField};

/// Execute the `cache` command.
///
/// Prints one page of cached diagrams as a table. An unreadable cache
/// lists as empty.
///
/// # Errors
///
/// Returns an error string if the page arguments are invalid.
pub fn run(
    ctx: &ServiceContext,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: usize,
    page_size: usize,
    search: &str,
) -> Result<(), String> {
    if page == 0 || page_size == 0 {
        return Err("--page and --page-size must be at least 1".to_string());
    }
    let query = ListQuery { sort_field, sort_direction, page, page_size, search: search.to_string() };
    let gateway = CacheGateway::new(Arc::clone(&ctx.cache));
    print!("{}", render(&gateway.list(&query)));
    Ok(())
}

/// Formats a listing page as an aligned table with a pagination footer.
fn render(page: &CachePage) -> String {
    if page.data.is_empty() {
        return "No cached diagrams.\n".to_string();
    }

    let rows: Vec<(String, String, &str)> = page
        .data
        .iter()
        .map(|r| {
            let own_key = if r.used_own_key { "yes" } else { "no" };
            (r.full_name(), r.updated_at.format("%Y-%m-%d %H:%M").to_string(), own_key)
        })
        .collect();

    let repo_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(10).max(10);
    let updated_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(7).max(7);

    let mut out = String::new();
    let _ = writeln!(out, "{:<repo_width$}  {:<updated_width$}  OWN KEY", "REPOSITORY", "UPDATED");
    let _ = writeln!(out, "{:-<repo_width$}  {:-<updated_width$}  -------", "", "");
    for (repo, updated, own_key) in &rows {
        let _ = writeln!(out, "{repo:<repo_width$}  {updated:<updated_width$}  {own_key}");
    }
    let p = &page.pagination;
    let _ = writeln!(out, "\nPage {} of {} ({} total).", p.current_page, p.total_pages, p.total);
    out
}

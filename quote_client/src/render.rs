//! Plain-text rendering of a snapshot.
use chrono::{DateTime, Local};
use quote_common::{QuoteState, Snapshot};
use std::fmt::Write;

fn row(quote: &QuoteState) -> String {
    let tier = if quote.is_priority { '*' } else { ' ' };
    let source = if quote.is_live { "LIVE" } else { "" };
    if quote.has_price() {
        format!(
            "{}{:<8} {:>10.2} {:>+8.2}% {}",
            tier, quote.symbol, quote.price, quote.change_percent, source
        )
    } else {
        format!("{}{:<8} {:>10} {:>9} {}", tier, quote.symbol, "--", "--", source)
    }
}

/// Render up to `rows` quotes under a timestamped header.
pub fn render_table(snapshot: &Snapshot, rows: usize) -> String {
    let taken_at = DateTime::from_timestamp_millis(snapshot.taken_at)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let live = snapshot.quotes.iter().filter(|q| q.is_live).count();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {} symbols, {} live",
        taken_at,
        snapshot.quotes.len(),
        live
    );
    let _ = writeln!(out, " {:<8} {:>10} {:>9}", "SYMBOL", "PRICE", "CHG");
    for quote in snapshot.quotes.iter().take(rows) {
        let _ = writeln!(out, "{}", row(quote));
    }
    if snapshot.quotes.len() > rows {
        let _ = writeln!(out, " ... {} more", snapshot.quotes.len() - rows);
    }
    out
}

//! Server-side HTML for the full page and the embeddable table.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use url::form_urlencoded;

use crate::{
    models::LeaderboardEntry,
    table::{SortDirection, SortField, SortState, TableView},
};

pub const EXPLORER_ADDRESS_URL: &str = "https://optimistic.etherscan.io/address/";

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: linear-gradient(#000, #111827); color: #fff; min-height: 100vh; }
.container { max-width: 1100px; margin: 0 auto; padding: 48px 16px; }
.embed { padding: 16px; }
header { text-align: center; margin-bottom: 48px; }
h1 { font-size: 3rem; margin: 0 0 16px; }
.subtitle { color: #9ca3af; font-size: 1.1rem; margin: 0; }
.muted { color: #6b7280; font-size: .875rem; }
.panel { background: rgba(0,0,0,.4); border: 1px solid rgba(255,255,255,.1); border-radius: 16px; overflow: hidden; }
.search { padding: 16px; border-bottom: 1px solid rgba(255,255,255,.1); }
.search input { width: 100%; box-sizing: border-box; padding: 8px 12px; background: #111; color: #fff; border: 1px solid #374151; border-radius: 8px; }
table { width: 100%; border-collapse: collapse; }
th { position: sticky; top: 0; background: rgba(0,0,0,.9); padding: 16px; font-size: .8rem; text-transform: uppercase; letter-spacing: .05em; color: #9ca3af; text-align: left; }
th a { color: inherit; text-decoration: none; }
th.num, td.num { text-align: right; }
td { padding: 16px; font-size: .875rem; border-bottom: 1px solid rgba(255,255,255,.05); }
td.total { font-weight: bold; font-size: 1.1rem; }
td.addr a { color: #9ca3af; font-family: monospace; font-size: .75rem; text-decoration: none; }
tr.rank-1 { background: rgba(234,179,8,.1); }
tr.rank-2 { background: rgba(156,163,175,.1); }
tr.rank-3 { background: rgba(234,88,12,.1); }
.podium { font-size: 1.1rem; font-weight: bold; }
.placeholder { padding: 48px; text-align: center; color: #9ca3af; }
.placeholder.error { color: #f87171; }
.notice { margin: 0; padding: 12px 16px; background: rgba(234,179,8,.1); color: #facc15; font-size: .875rem; }
footer { margin-top: 48px; text-align: center; }
footer a { color: #f87171; }
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// en-US style, two decimals: `1234.5` → `1,234.50`
pub fn format_respect(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac)
}

/// `0x1234...abcd`
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn row_class(rank: u32) -> &'static str {
    match rank {
        1 => "rank-1",
        2 => "rank-2",
        3 => "rank-3",
        _ => "",
    }
}

fn view_href(sort: SortState, filter: &str, limit: Option<usize>, stamp: Option<i64>) -> String {
    let mut qs = form_urlencoded::Serializer::new(String::new());
    qs.append_pair("sort", sort.field.as_str())
        .append_pair("dir", sort.direction.as_str());
    if !filter.is_empty() {
        qs.append_pair("q", filter);
    }
    if let Some(limit) = limit {
        qs.append_pair("limit", &limit.to_string());
    }
    if let Some(stamp) = stamp {
        qs.append_pair("at", &stamp.to_string());
    }
    format!("?{}", qs.finish())
}

fn header_cell(view: &TableView, field: SortField, stamp: Option<i64>) -> String {
    let next = view.sort.select(field);
    let arrow = if view.sort.field == field {
        match view.sort.direction {
            SortDirection::Asc => " ▲",
            SortDirection::Desc => " ▼",
        }
    } else {
        ""
    };
    let class = if field.is_numeric() { " class=\"num\"" } else { "" };
    format!(
        "<th{}><a href=\"{}\">{}{}</a></th>",
        class,
        escape(&view_href(next, &view.filter, view.limit, stamp)),
        field.label(),
        arrow
    )
}

fn search_form(view: &TableView, stamp: Option<i64>) -> String {
    let mut hidden = format!(
        "<input type=\"hidden\" name=\"sort\" value=\"{}\"><input type=\"hidden\" name=\"dir\" value=\"{}\">",
        view.sort.field.as_str(),
        view.sort.direction.as_str()
    );
    if let Some(limit) = view.limit {
        hidden.push_str(&format!(
            "<input type=\"hidden\" name=\"limit\" value=\"{}\">",
            limit
        ));
    }
    if let Some(stamp) = stamp {
        hidden.push_str(&format!(
            "<input type=\"hidden\" name=\"at\" value=\"{}\">",
            stamp
        ));
    }
    format!(
        "<form class=\"search\" method=\"get\">{}<input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search by name or address\"></form>",
        hidden,
        escape(&view.filter)
    )
}

fn table_row(entry: &LeaderboardEntry) -> String {
    let rank = if entry.rank <= 3 {
        format!("<span class=\"podium\">{}</span>", entry.rank)
    } else {
        entry.rank.to_string()
    };
    format!(
        "<tr class=\"{}\"><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num total\">{}</td><td class=\"addr\"><a href=\"{}{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></td></tr>",
        row_class(entry.rank),
        rank,
        escape(&entry.name),
        format_respect(entry.og_respect),
        format_respect(entry.zor_respect),
        format_respect(entry.total_respect),
        EXPLORER_ADDRESS_URL,
        escape(&entry.address),
        escape(&shorten_address(&entry.address))
    )
}

/// Table markup for `ranked`, shaped by `view`.
///
/// `stamp` identifies the snapshot `ranked` came from. It is carried in every
/// link so the next view can tell when the data underneath it was rebuilt.
pub fn render_table(view: &TableView, ranked: &[LeaderboardEntry], stamp: Option<i64>) -> String {
    let mut html = String::new();
    if let (Some(seen), Some(stamp)) = (view.seen, stamp) {
        if seen != stamp {
            html.push_str(
                "<p class=\"notice\">Leaderboard data was refreshed since your last view; ranks may have changed.</p>",
            );
        }
    }
    html.push_str(&search_form(view, stamp));
    html.push_str("<table><thead><tr>");
    for field in SortField::ALL {
        html.push_str(&header_cell(view, field, stamp));
    }
    html.push_str("<th>Address</th></tr></thead><tbody>");

    let rows = view.rows(ranked);
    if rows.is_empty() {
        html.push_str("<tr><td colspan=\"6\" class=\"placeholder\">No matching members</td></tr>");
    }
    for entry in rows {
        html.push_str(&table_row(entry));
    }
    html.push_str("</tbody></table>");
    html
}

fn placeholder(title: &str, detail: Option<&str>, error: bool) -> String {
    let class = if error { "placeholder error" } else { "placeholder" };
    let detail = detail
        .map(|d| format!("<p class=\"muted\">{}</p>", escape(d)))
        .unwrap_or_default();
    format!("<div class=\"{}\"><p>{}</p>{}</div>", class, escape(title), detail)
}

fn document(title: &str, body_class: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{}</title><style>{}</style></head><body><main class=\"{}\">{}</main></body></html>",
        escape(title),
        STYLE,
        body_class,
        body
    )
}

/// What the page shows inside its panel
pub enum PageContent<'a> {
    Ready {
        ranked: &'a [LeaderboardEntry],
        generated_at: DateTime<Utc>,
    },
    Failed(&'a str),
}

/// Full leaderboard page
pub fn render_page(view: &TableView, content: PageContent<'_>) -> String {
    let (panel, updated) = match content {
        PageContent::Ready { ranked, .. } if ranked.is_empty() => (
            placeholder("No data available", Some("Please check back shortly"), false),
            String::new(),
        ),
        PageContent::Ready {
            ranked,
            generated_at,
        } => (
            render_table(view, ranked, Some(generated_at.timestamp_millis())),
            format!(
                "<p class=\"muted\">Last updated {}</p>",
                generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
        ),
        PageContent::Failed(message) => (
            placeholder("Error loading leaderboard", Some(message), true),
            String::new(),
        ),
    };

    let body = format!(
        "<div class=\"container\">\
         <header><h1>leaderboard</h1>\
         <p class=\"subtitle\">ZAO Community Respect Rankings</p>\
         <p class=\"muted\">Tracking OG ZAO &amp; ZOR Respect on Optimism</p></header>\
         <div class=\"panel\">{}</div>\
         <footer class=\"muted\"><p>Data refreshes every 5 minutes</p>{}\
         <p>Powered by <a href=\"https://www.optimism.io/\" target=\"_blank\" rel=\"noopener noreferrer\">Optimism</a></p>\
         </footer></div>",
        panel, updated
    );
    document("ZAO Respect Leaderboard", "", &body)
}

/// Embeddable table; anything but a non-empty board shows the loading placeholder
pub fn render_embed(view: &TableView, content: PageContent<'_>) -> String {
    let panel = match content {
        PageContent::Ready {
            ranked,
            generated_at,
        } if !ranked.is_empty() => {
            render_table(view, ranked, Some(generated_at.timestamp_millis()))
        }
        _ => placeholder("Loading leaderboard data...", None, false),
    };
    document(
        "ZAO Respect Leaderboard - Embed",
        "embed",
        &format!("<div class=\"panel\">{}</div>", panel),
    )
}

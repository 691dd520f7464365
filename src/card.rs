//! Display cards for filter results and the render targets that use them.
//!
//! [`HtmlTarget`] collects HTML fragments the way a results container in a
//! page would; [`TextTarget`] writes the same information as plain text.

use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;

use tracing::warn;

use crate::index::{EnumItem, EnumType, EnumValue, FilterableItem, Member};
use crate::render::RenderTarget;

pub const API_BASE_URL: &str = "https://robloxapi.github.io/ref";

pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

pub fn member_link(member: &Member) -> String {
    format!(
        "{API_BASE_URL}/class/{}#member-{}",
        urlencoding::encode(&member.class_name),
        urlencoding::encode(&member.name)
    )
}

pub fn enum_link(enum_type: &EnumType) -> String {
    format!("{API_BASE_URL}/enum/{}", urlencoding::encode(&enum_type.name))
}

fn member_tags(member: &Member) -> Vec<Cow<'_, str>> {
    let mut tags = vec![Cow::Borrowed(member.member_type.as_str())];
    for (set, label) in [
        (member.unreplicated, "Unreplicated"),
        (member.deprecated, "Deprecated"),
        (member.hidden, "Hidden"),
        (member.unscriptable, "Unscriptable"),
    ] {
        if set {
            tags.push(Cow::Borrowed(label));
        }
    }
    if let Some(security) = &member.security {
        tags.push(Cow::Borrowed(security));
    }
    tags
}

// enum items never show an unreplicated tag
fn enum_item_tags(item: &EnumItem) -> Vec<&str> {
    let mut tags = Vec::new();
    for (set, label) in [(item.deprecated, "Deprecated"), (item.hidden, "Hidden"), (item.unscriptable, "Unscriptable")] {
        if set {
            tags.push(label);
        }
    }
    if let Some(security) = &item.security {
        tags.push(security.as_str());
    }
    tags
}

fn tag_class(tag: &str, member: &Member) -> String {
    if member.security.as_deref() == Some(tag) { "security".into() } else { tag.to_lowercase() }
}

pub fn member_card_html(member: &Member) -> String {
    let tags: String = member_tags(member)
        .iter()
        .map(|tag| format!(r#"<span class="tag {}">{}</span>"#, tag_class(tag, member), escape_html(tag)))
        .collect();
    let inheritance = if member.inheritance.is_empty() {
        String::new()
    } else {
        let chain: Vec<Cow<str>> = member.inheritance.iter().map(|c| escape_html(c)).collect();
        format!(r#"<div class="inheritance">Inherits: {}</div>"#, chain.join(" → "))
    };
    format!(
        concat!(
            r#"<div class="result-item"><div class="result-header"><div>"#,
            r#"<div class="result-title"><a href="{link}" target="_blank" rel="noopener noreferrer" class="api-link">{name}</a></div>"#,
            r#"<div class="class-name">{class}</div>{inheritance}</div><div class="tags">{tags}</div></div>"#,
            r#"<div class="result-details"><div class="detail-row"><span class="detail-label">Type:</span>"#,
            r#"<span class="detail-value">{value_type}</span></div></div></div>"#
        ),
        link = escape_html(&member_link(member)),
        name = escape_html(&member.name),
        class = escape_html(&member.class_name),
        inheritance = inheritance,
        tags = tags,
        value_type = escape_html(member.value_type.as_deref().unwrap_or("N/A")),
    )
}

pub fn enum_card_html(enum_type: &EnumType) -> String {
    let items: String = enum_type
        .enum_items
        .iter()
        .map(|item| {
            let tags = enum_item_tags(item);
            let tags = if tags.is_empty() {
                String::new()
            } else {
                let spans: String = tags
                    .iter()
                    .map(|tag| {
                        let class = if item.security.as_deref() == Some(*tag) { "security".into() } else { tag.to_lowercase() };
                        format!(r#"<span class="tag {class}">{}</span>"#, escape_html(tag))
                    })
                    .collect();
                format!(r#"<div class="enum-item-tags">{spans}</div>"#)
            };
            format!(
                r#"<div class="enum-item"><div class="enum-item-header"><span class="enum-item-name">{}</span><span class="enum-item-value">{}</span></div>{tags}</div>"#,
                escape_html(&item.name),
                escape_html(&item.value.to_string()),
            )
        })
        .collect();
    format!(
        concat!(
            r#"<div class="result-item enum-result"><div class="result-header"><div>"#,
            r#"<div class="result-title"><a href="{link}" target="_blank" rel="noopener noreferrer" class="api-link">{name}</a></div>"#,
            r#"<div class="class-name">Enum ({count} items)</div></div>"#,
            r#"<div class="tags"><span class="tag enum">Enum</span></div></div>"#,
            r#"<div class="enum-items-container">{items}</div></div>"#
        ),
        link = escape_html(&enum_link(enum_type)),
        name = escape_html(&enum_type.name),
        count = enum_type.enum_items.len(),
        items = items,
    )
}

pub fn card_html(item: &FilterableItem) -> String {
    match item {
        FilterableItem::Member(m) => member_card_html(m),
        FilterableItem::Enum(e) => enum_card_html(e),
    }
}

fn bracket(tags: &[&str]) -> String {
    tags.iter().map(|t| format!(" [{t}]")).collect()
}

pub fn card_text(item: &FilterableItem) -> String {
    match item {
        FilterableItem::Member(m) => {
            let tags: Vec<Cow<str>> = member_tags(m);
            let tags: Vec<&str> = tags.iter().map(|t| t.as_ref()).collect();
            let mut card = format!("{}{}\n  {}", m.name, bracket(&tags), m.class_name);
            if !m.inheritance.is_empty() {
                card.push_str(&format!(" (inherits: {})", m.inheritance.join(" → ")));
            }
            card.push_str(&format!("\n  Type: {}", m.value_type.as_deref().unwrap_or("N/A")));
            card
        }
        FilterableItem::Enum(e) => {
            let mut card = format!("{} [Enum]\n  Enum ({} items)", e.name, e.enum_items.len());
            for item in &e.enum_items {
                let tags = bracket(&enum_item_tags(item));
                match &item.value {
                    EnumValue::Null => card.push_str(&format!("\n    {}{tags}", item.name)),
                    value => card.push_str(&format!("\n    {} = {value}{tags}", item.name)),
                }
            }
            card
        }
    }
}

pub const NO_RESULTS: &str = "No results found. Try adjusting your query.";

pub fn progress_message(rendered: usize, total: usize) -> String {
    format!("Showing {rendered} of {total} results. Scroll to load more...")
}

/// Collects HTML fragments for a results container.
#[derive(Debug, Clone, Default)]
pub struct HtmlTarget {
    cards: Vec<String>,
    indicator: Option<String>,
    no_results: bool,
}

impl HtmlTarget {
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }
    pub fn indicator(&self) -> Option<&str> {
        self.indicator.as_deref()
    }
    pub fn html(&self) -> String {
        if self.no_results {
            return format!(r#"<div class="no-results">{NO_RESULTS}</div>"#);
        }
        let mut html = self.cards.concat();
        if let Some(indicator) = &self.indicator {
            html.push_str(&format!(r#"<div id="loadingIndicator" class="loading-indicator">{indicator}</div>"#));
        }
        html
    }
}

impl RenderTarget for HtmlTarget {
    fn clear(&mut self) {
        self.cards.clear();
        self.indicator = None;
        self.no_results = false;
    }
    fn append(&mut self, batch: &[Arc<FilterableItem>]) {
        self.cards.extend(batch.iter().map(|item| card_html(item)));
    }
    fn show_no_results(&mut self) {
        self.no_results = true;
    }
    fn show_progress(&mut self, rendered: usize, total: usize) {
        self.indicator = (rendered < total).then(|| progress_message(rendered, total));
    }
}

/// Writes cards as plain text, e.g. to a terminal.
#[derive(Debug)]
pub struct TextTarget<W: Write> {
    out: W,
}

impl<W: Write> TextTarget<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
    pub fn get_ref(&self) -> &W {
        &self.out
    }
    pub fn into_inner(self) -> W {
        self.out
    }
    pub fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!(error = %e, "failed to write output");
        }
    }
}

impl<W: Write> RenderTarget for TextTarget<W> {
    fn clear(&mut self) {
        self.write_line("");
    }
    fn append(&mut self, batch: &[Arc<FilterableItem>]) {
        for item in batch {
            let card = card_text(item);
            self.write_line(&card);
        }
    }
    fn show_no_results(&mut self) {
        self.write_line(NO_RESULTS);
    }
    fn show_progress(&mut self, rendered: usize, total: usize) {
        if rendered < total {
            self.write_line(&format!("-- {} (:more) --", progress_message(rendered, total)));
        }
    }
}

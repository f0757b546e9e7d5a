//! HTML page generation
//!
//! Generates a self-contained page with embedded CSS and JavaScript. Every
//! tab's table is rendered up front; the script only toggles visibility,
//! keeps `?tab=` in sync and pins sticky columns, so the page works offline.
//!
//! Global invariants enforced:
//! - This is the only module that produces markup
//! - All dataset text is escaped
//! - Identical input yields byte-for-byte identical output

use crate::aggregate::{KNOWN_FORMATS_COLUMN, TOTAL_LABEL};
use crate::dataset::{format_number, CellValue, Metric, MODALITY_COLUMN};
use crate::layout::{CellContent, HeaderCell, RenderedCell, TableLayout};
use crate::tabs::TabState;
use crate::widget::MatrixWidget;

/// Render the widget as a complete HTML document
pub fn render_page(widget: &MatrixWidget) -> String {
    let controller = widget.tab_controller();
    let active = controller.active().id.clone();

    let tables: Vec<String> = widget
        .tables()
        .iter()
        .filter_map(|entry| {
            widget
                .layout(&entry.id)
                .map(|layout| render_table(&entry.id, &layout, entry.id != active))
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        {header}
        <div id="tabs" class="tabs" data-default-tab="{active}">
{tabs}
        </div>
        <div class="table-scroll">
{tables}
        </div>
        {footer}
    </div>
    <script>{js}</script>
</body>
</html>"#,
        title = html_escape(&widget.settings().title),
        css = inline_css(),
        js = inline_javascript(),
        header = render_header(widget),
        active = html_escape(&active),
        tabs = render_tabs(&controller.tab_states()),
        tables = tables.join("\n"),
        footer = render_footer(),
    )
}

/// Title plus a one-line summary taken from the Overview's Total row
fn render_header(widget: &MatrixWidget) -> String {
    let modalities = widget.tables().len().saturating_sub(1);
    let known_formats = widget
        .overview()
        .rows
        .iter()
        .find(|row| row.get(MODALITY_COLUMN).and_then(CellValue::as_text) == Some(TOTAL_LABEL))
        .and_then(|row| match row.get(KNOWN_FORMATS_COLUMN) {
            Some(CellValue::Metric(m)) => match m.value {
                Metric::Number(n) => Some(n),
                Metric::Flag(_) => None,
            },
            _ => None,
        })
        .unwrap_or(0.0);

    format!(
        r#"<header>
            <h1>{}</h1>
            <div class="meta">{} modalities &middot; {} known formats</div>
        </header>"#,
        html_escape(&widget.settings().title),
        modalities,
        format_number(known_formats),
    )
}

/// One tab control per table; the active one carries `selected`
pub fn render_tabs(states: &[TabState]) -> String {
    states
        .iter()
        .map(|s| {
            format!(
                r#"<div class="tab" id="{id}"{selected}><span>{label}</span></div>"#,
                id = html_escape(&s.id),
                selected = if s.selected { " selected" } else { "" },
                label = html_escape(&s.label),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one table layout; hidden tables are shown by the page script
pub fn render_table(id: &str, layout: &TableLayout, hidden: bool) -> String {
    let mut html = format!(
        r#"<table class="matrix" data-tab="{}" data-sticky="{}"{}>"#,
        html_escape(id),
        layout.sticky_columns,
        if hidden { " hidden" } else { "" },
    );

    html.push_str("\n<thead>\n<tr>");
    for cell in &layout.header {
        html.push_str(&render_header_cell(cell));
    }
    html.push_str("</tr>\n");

    if !layout.subheader.is_empty() {
        html.push_str(r#"<tr class="nested">"#);
        for subtitle in &layout.subheader {
            html.push_str(&format!("<th>{}</th>", html_escape(subtitle)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</thead>\n<tbody>\n");

    for row in &layout.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&render_cell(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn render_header_cell(cell: &HeaderCell) -> String {
    let mut attrs = String::new();
    if cell.colspan > 1 {
        attrs.push_str(&format!(r#" colspan="{}""#, cell.colspan));
    }
    if cell.rowspan > 1 {
        attrs.push_str(&format!(r#" rowspan="{}""#, cell.rowspan));
    }
    if cell.sticky {
        attrs.push_str(r#" class="sticky""#);
    }
    format!("<th{}>{}</th>", attrs, html_escape(&cell.label))
}

fn render_cell(cell: &RenderedCell) -> String {
    let mut classes = Vec::new();
    if cell.sticky {
        classes.push("sticky");
    }
    if cell.url.is_some() {
        classes.push("link");
    }

    let mut attrs = String::new();
    if !classes.is_empty() {
        attrs.push_str(&format!(r#" class="{}""#, classes.join(" ")));
    }
    attrs.push_str(&format!(r#" data-value="{}""#, html_escape(&cell.raw)));
    if let Some(url) = &cell.url {
        attrs.push_str(&format!(r#" data-url="{}""#, html_escape(url)));
    }
    if let Some(color) = &cell.background {
        attrs.push_str(&format!(r#" style="background: {}""#, color));
    }

    let content = match &cell.content {
        CellContent::Empty => String::new(),
        CellContent::Text { title, subtitle } => match subtitle {
            Some(sub) => format!(
                "<strong>{}</strong><br><small>{}</small>",
                html_escape(title),
                html_escape(sub)
            ),
            None => format!("<strong>{}</strong>", html_escape(title)),
        },
        CellContent::Metric { value, percent } => match percent {
            Some(pct) => format!("{}<small> ({})</small>", html_escape(value), pct),
            None => html_escape(value),
        },
    };

    format!("<td{}>{}</td>", attrs, content)
}

/// Inline CSS styles
fn inline_css() -> &'static str {
    r#"
* {
    box-sizing: border-box;
    margin: 0;
    padding: 0;
}

body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    line-height: 1.5;
    color: #111827;
    background: #ffffff;
}

.container {
    max-width: 1600px;
    margin: 0 auto;
    padding: 2rem;
}

header {
    margin-bottom: 1.5rem;
    padding-bottom: 1rem;
    border-bottom: 2px solid #e5e7eb;
}

header h1 {
    font-size: 2rem;
    font-weight: 700;
    margin-bottom: 0.25rem;
}

header .meta {
    color: #6b7280;
    font-size: 0.875rem;
}

/* Tabs */
.tabs {
    display: flex;
    flex-wrap: wrap;
    gap: 0.25rem;
    margin-bottom: 1rem;
    border-bottom: 1px solid #e5e7eb;
}

.tab {
    padding: 0.5rem 1rem;
    cursor: pointer;
    user-select: none;
    font-size: 0.875rem;
    font-weight: 600;
    color: #6b7280;
    border-bottom: 3px solid transparent;
}

.tab:hover {
    color: #111827;
}

.tab[selected] {
    color: #1d4ed8;
    border-bottom-color: #3b82f6;
}

/* Table */
.table-scroll {
    overflow-x: auto;
}

table.matrix {
    border-collapse: separate;
    border-spacing: 0;
    background: #ffffff;
    font-size: 0.8125rem;
}

table.matrix[hidden] {
    display: none;
}

th {
    padding: 0.5rem 0.75rem;
    text-align: center;
    font-weight: 600;
    color: #374151;
    background: #f9fafb;
    border-bottom: 2px solid #e5e7eb;
    white-space: nowrap;
}

tr.nested th {
    font-weight: 500;
    font-size: 0.75rem;
    color: #6b7280;
}

td {
    padding: 0.5rem 0.75rem;
    border-bottom: 1px solid #e5e7eb;
    white-space: nowrap;
    text-align: center;
}

td small {
    color: #6b7280;
}

tbody tr:last-child td {
    border-bottom: none;
}

.sticky {
    position: sticky;
    z-index: 1;
    background: #ffffff;
    text-align: left;
}

th.sticky {
    z-index: 2;
    background: #f9fafb;
}

td.link {
    cursor: pointer;
    text-decoration: underline dotted;
}

td.link:hover {
    filter: brightness(0.92);
}

footer {
    margin-top: 3rem;
    padding-top: 1rem;
    border-top: 1px solid #e5e7eb;
    text-align: center;
    color: #6b7280;
    font-size: 0.875rem;
}

@media (max-width: 768px) {
    .container {
        padding: 1rem;
    }

    header h1 {
        font-size: 1.5rem;
    }

    th, td {
        padding: 0.375rem 0.5rem;
    }
}

@media (prefers-color-scheme: dark) {
    body, table.matrix, .sticky {
        background: #111827;
        color: #f9fafb;
    }

    header, .tabs {
        border-bottom-color: #374151;
    }

    th, th.sticky {
        background: #1f2937;
        color: #f9fafb;
        border-bottom-color: #374151;
    }

    td {
        border-bottom-color: #374151;
    }

    footer {
        border-top-color: #374151;
    }
}
"#
}

/// Inline JavaScript for tab switching, URL sync and sticky offsets
fn inline_javascript() -> &'static str {
    r#"
(function() {
    const tabs = document.getElementById('tabs');
    const tables = Array.from(document.querySelectorAll('table.matrix'));

    // Offset each pinned cell by the rendered width of the pinned cells before it
    function makeSticky(cells) {
        cells.reduce((acc, cell) => {
            cell.style.left = `${acc}px`;
            return acc + cell.getBoundingClientRect().width;
        }, 0);
    }

    function applySticky(table) {
        table.querySelectorAll('tr').forEach(tr => {
            makeSticky(Array.from(tr.children).filter(c => c.classList.contains('sticky')));
        });
    }

    function updateTable(tab, replace) {
        let target = tables.find(t => t.dataset.tab === tab);
        if (!target) {
            console.warn('No table found for', tab);
            target = tables[0];
            tab = target.dataset.tab;
        }

        tables.forEach(t => { t.hidden = t !== target; });

        Array.from(tabs.children).forEach(t => {
            if (t.id === tab) t.setAttribute('selected', '');
            else t.removeAttribute('selected');
        });

        const searchParams = new URLSearchParams(window.location.search);
        searchParams.set('tab', tab);
        const url = `${window.location.pathname}?${searchParams}`;
        if (replace) window.history.replaceState({}, '', url);
        else window.history.pushState({}, '', url);

        applySticky(target);
    }

    Array.from(tabs.children).forEach(t => {
        t.addEventListener('click', () => updateTable(t.id, false));
    });

    document.querySelectorAll('td.link').forEach(td => {
        td.addEventListener('click', () => window.open(td.dataset.url, '_blank'));
    });

    window.addEventListener('resize', () => {
        const visible = tables.find(t => !t.hidden);
        if (visible) applySticky(visible);
    });

    const requested = new URLSearchParams(window.location.search).get('tab') || tabs.dataset.defaultTab;
    updateTable(requested, true);
})();
"#
}

fn render_footer() -> String {
    r#"<footer>
            <p>Generated by formatmatrix</p>
        </footer>"#
        .to_string()
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::layout::{layout_table, LayoutOptions};

    fn layout(json: &str, sticky: usize) -> TableLayout {
        let dataset = Dataset::from_json_str(json).unwrap();
        layout_table(&dataset, &LayoutOptions::default(), sticky)
    }

    #[test]
    fn test_grouped_headers_markup() {
        let table = layout(r#"[{"A - x": true, "A - y": false, "B": "b"}]"#, 0);
        let html = render_table("t", &table, false);
        assert!(html.contains(r#"<th colspan="2">A</th>"#));
        assert!(html.contains(r#"<th rowspan="2">B</th>"#));
        let nested = r#"<tr class="nested"><th>x</th><th>y</th></tr>"#;
        assert!(html.contains(nested));
        assert!(!html.contains(" hidden"));
    }

    #[test]
    fn test_hidden_and_sticky_markup() {
        let table = layout(r#"[{"Format": "NWB - 2.0", "Status": "ok"}]"#, 1);
        let html = render_table("t", &table, true);
        assert!(html.contains(r#"data-tab="t" data-sticky="1" hidden>"#));
        assert!(html.contains(r#"<th class="sticky">Format</th>"#));
        let format_cell = concat!(
            r#"<td class="sticky" data-value="NWB - 2.0">"#,
            "<strong>NWB</strong><br><small>2.0</small></td>"
        );
        assert!(html.contains(format_cell));
    }

    #[test]
    fn test_link_cell_markup() {
        let json = r#"[{"Neo - Raw IO": {"value": true, "url": "https://neo.org/?a=1&b=2"}}]"#;
        let html = render_table("t", &layout(json, 0), false);
        assert!(html.contains(r#"class="link""#));
        assert!(html.contains(r#"data-url="https://neo.org/?a=1&amp;b=2""#));
        assert!(html.contains(r#"style="background: #00ff0066""#));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_table("t", &layout(r#"[{"Format": "<script>"}]"#, 0), false);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_tabs_mark_selected() {
        let states = vec![
            TabState {
                id: "overview".into(),
                label: "Overview".into(),
                selected: false,
            },
            TabState {
                id: "behavior".into(),
                label: "Behavior".into(),
                selected: true,
            },
        ];
        let html = render_tabs(&states);
        let overview = r#"<div class="tab" id="overview"><span>Overview</span></div>"#;
        let behavior = r#"<div class="tab" id="behavior" selected><span>Behavior</span></div>"#;
        assert!(html.contains(overview));
        assert!(html.contains(behavior));
        assert!(!html.contains("data-tab"));
    }

    #[test]
    fn test_script_matches_tabs_by_id() {
        let js = inline_javascript();
        assert!(js.contains("if (t.id === tab)"));
        assert!(js.contains("updateTable(t.id, false)"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"a&b<c>"d'"#), "a&amp;b&lt;c&gt;&quot;d&#39;");
    }
}

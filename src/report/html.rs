//! HTML report generation with D3.js visualizations

use super::Report;
use crate::aggregate::AugmentedTable;
use std::io::{self, Write};

/// Stylesheet shared by the report and the interactive UI
pub const STYLE_CSS: &str = r#"
:root {
    --bg: #1e1e2f;
    --card: #252836;
    --border: rgba(255, 255, 255, 0.1);
    --text: #ffffff;
    --dim: #aaaaaa;
    --accent: #3498db;
    --ok: #2ecc71;
    --fail: #f85149;
    --radius: 12px;
}
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: 'Inter', 'Segoe UI', Roboto, sans-serif;
    background: var(--bg);
    color: var(--text);
    line-height: 1.5;
}
.container { max-width: 1400px; margin: 0 auto; padding: 2rem; }
h1 { color: var(--accent); font-weight: 700; }
.subtitle { color: var(--dim); margin-bottom: 1.5rem; }
.card {
    background: var(--card);
    border: 1px solid var(--border);
    border-radius: var(--radius);
    padding: 1.25rem;
    margin-bottom: 1.25rem;
}
.stats { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; margin-bottom: 1.25rem; }
.stat { text-align: center; }
.stat-value { font-size: 2.5rem; font-weight: 700; line-height: 1; }
.stat-label { color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }
.stat.ok .stat-value { color: var(--ok); }
.stat.fail .stat-value { color: var(--fail); }
.charts { display: grid; grid-template-columns: 1fr 1fr; gap: 1.25rem; }
.chart-title { color: var(--dim); font-weight: 600; margin-bottom: 0.75rem; }
.legend { display: flex; flex-wrap: wrap; gap: 1rem; margin-top: 0.75rem; font-size: 0.85rem; }
.legend-item { display: flex; align-items: center; gap: 0.4rem; }
.legend-dot { width: 12px; height: 12px; border-radius: 50%; display: inline-block; }
.empty { color: var(--dim); font-style: italic; }
.tabs { display: flex; gap: 0.5rem; margin-bottom: 1rem; }
.tab, button {
    background: var(--accent);
    color: white;
    border: none;
    border-radius: var(--radius);
    padding: 0.5rem 1.25rem;
    cursor: pointer;
}
.tab { background: var(--card); border: 1px solid var(--border); }
.tab.active { background: var(--accent); }
.panel { display: none; }
.panel.active { display: block; }
details { border-bottom: 1px solid var(--border); padding: 0.6rem 0; }
summary { cursor: pointer; font-weight: 600; }
details pre { white-space: pre-wrap; font-family: inherit; color: var(--dim); margin-top: 0.5rem; }
details.failed summary { color: var(--fail); }
.table-wrap { overflow-x: auto; }
table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
th, td { border: 1px solid var(--border); padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
th { background: rgba(255, 255, 255, 0.04); position: sticky; top: 0; }
td.assessment { white-space: pre-wrap; min-width: 320px; }
svg text { fill: var(--dim); }
svg .domain, svg .tick line { stroke: var(--border); }
"#;

/// Rendering code shared by the report and the interactive UI.
///
/// `renderReport(report)` expects the JSON shape of [`Report`] and fills
/// `#stats`, `#risk-chart`, `#category-chart`, `#details` and `#raw-table`.
pub const RENDER_JS: &str = r#"
function initTabs() {
    document.querySelectorAll('.tab').forEach(tab => {
        tab.addEventListener('click', () => {
            document.querySelectorAll('.tab').forEach(t => t.classList.toggle('active', t === tab));
            document.querySelectorAll('.panel').forEach(p => p.classList.toggle('active', p.id === tab.dataset.tab));
        });
    });
}

function el(tag, cls, text) {
    const node = document.createElement(tag);
    if (cls) node.className = cls;
    if (text !== undefined) node.textContent = text;
    return node;
}

function renderStats(summary) {
    const root = document.getElementById('stats');
    root.replaceChildren();
    [['Assets', summary.total, ''], ['Assessed', summary.succeeded, 'ok'], ['Failed', summary.failed, 'fail']]
        .forEach(([label, value, cls]) => {
            const stat = el('div', 'card stat ' + cls);
            stat.append(el('div', 'stat-value', String(value)), el('div', 'stat-label', label));
            root.append(stat);
        });
}

function drawPie(selector, dist) {
    const root = d3.select(selector);
    root.selectAll('*').remove();
    if (!dist.buckets.length) { root.append('p').attr('class', 'empty').text('Nothing to chart'); return; }

    const size = 260, r = size / 2;
    const color = d3.scaleOrdinal(d3.schemeTableau10).domain(dist.buckets.map(b => b.value));
    const g = root.append('svg').attr('width', size).attr('height', size)
        .append('g').attr('transform', `translate(${r},${r})`);
    const arcs = d3.pie().value(b => b.count).sort(null)(dist.buckets);
    const arc = d3.arc().innerRadius(r * 0.55).outerRadius(r - 4);

    g.selectAll('path').data(arcs).join('path')
        .attr('d', arc)
        .attr('fill', d => color(d.data.value))
        .append('title').text(d => `${d.data.value}: ${d.data.count}`);

    const legend = root.append('div').attr('class', 'legend');
    dist.buckets.forEach(b => {
        const item = legend.append('span').attr('class', 'legend-item');
        item.append('span').attr('class', 'legend-dot').style('background', color(b.value));
        item.append('span').text(`${b.value} (${b.count})`);
    });
}

function drawBars(selector, dist) {
    const root = d3.select(selector);
    root.selectAll('*').remove();
    if (!dist.buckets.length) { root.append('p').attr('class', 'empty').text('Nothing to chart'); return; }

    const w = 560, h = 280, m = { top: 10, right: 10, bottom: 70, left: 40 };
    const x = d3.scaleBand().domain(dist.buckets.map(b => b.value)).range([m.left, w - m.right]).padding(0.2);
    const y = d3.scaleLinear().domain([0, d3.max(dist.buckets, b => b.count)]).nice().range([h - m.bottom, m.top]);
    const svg = root.append('svg').attr('viewBox', `0 0 ${w} ${h}`).attr('width', '100%');

    svg.append('g').selectAll('rect').data(dist.buckets).join('rect')
        .attr('x', b => x(b.value))
        .attr('y', b => y(b.count))
        .attr('width', x.bandwidth())
        .attr('height', b => y(0) - y(b.count))
        .attr('fill', '#3498db')
        .append('title').text(b => `${b.value}: ${b.count}`);

    svg.append('g').attr('transform', `translate(0,${h - m.bottom})`).call(d3.axisBottom(x))
        .selectAll('text').attr('transform', 'rotate(-30)').style('text-anchor', 'end');
    svg.append('g').attr('transform', `translate(${m.left},0)`)
        .call(d3.axisLeft(y).ticks(Math.min(5, y.domain()[1])).tickFormat(d3.format('d')));
}

function renderDetails(report) {
    const root = document.getElementById('details');
    root.replaceChildren();
    report.rows.forEach(row => {
        const failed = row.assessment.status !== 'success';
        const item = el('details', failed ? 'failed' : '');
        item.append(el('summary', '', `Asset: ${row.record['Asset'] ?? '?'} - Risk Analysis`));
        item.append(el('pre', '', failed ? `Assessment Failed (${row.assessment.text})` : row.assessment.text));
        root.append(item);
    });
    if (!report.rows.length) root.append(el('p', 'empty', 'No assets in this inventory'));
}

function renderTable(report) {
    const root = document.getElementById('raw-table');
    root.replaceChildren();
    const table = el('table');
    const head = el('tr');
    report.columns.forEach(c => head.append(el('th', '', c)));
    table.append(head);
    const last = report.columns[report.columns.length - 1];
    report.rows.forEach(row => {
        const tr = el('tr');
        report.columns.forEach(c => {
            if (c === last) {
                tr.append(el('td', 'assessment', row.assessment.status === 'success' ? row.assessment.text : 'Assessment Failed'));
            } else {
                tr.append(el('td', '', row.record[c] ?? ''));
            }
        });
        table.append(tr);
    });
    root.append(table);
}

function renderReport(report) {
    renderStats(report.summary);
    drawPie('#risk-chart', report.summary.risk_levels);
    drawBars('#category-chart', report.summary.categories);
    renderDetails(report);
    renderTable(report);
}
"#;

/// Tabbed result area, shared with the interactive UI
pub const RESULTS_HTML: &str = r#"
<div id="stats" class="stats"></div>
<div class="tabs">
    <button class="tab active" data-tab="tab-charts">Risk Assessment</button>
    <button class="tab" data-tab="tab-details">Detailed Analysis</button>
    <button class="tab" data-tab="tab-raw">Raw Data</button>
</div>
<section id="tab-charts" class="panel active">
    <div class="charts">
        <div class="card"><div class="chart-title">Risk Level Distribution</div><div id="risk-chart"></div></div>
        <div class="card"><div class="chart-title">Asset Category Analysis</div><div id="category-chart"></div></div>
    </div>
</section>
<section id="tab-details" class="panel card"><div id="details"></div></section>
<section id="tab-raw" class="panel card"><div id="raw-table" class="table-wrap"></div></section>
"#;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AIRisk Analysis Report</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>{{STYLE}}</style>
</head>
<body>
<div class="container">
    <h1>AIRisk Analysis Report</h1>
    <p class="subtitle">Generated {{GENERATED}}</p>
    {{RESULTS}}
</div>
<script id="report-data" type="application/json">{{DATA}}</script>
<script>
{{RENDER_JS}}
initTabs();
renderReport(JSON.parse(document.getElementById('report-data').textContent));
</script>
</body>
</html>
"#;

pub fn write<W: Write>(writer: &mut W, augmented: &AugmentedTable) -> io::Result<()> {
    let report = Report::new(augmented);
    let generated = report.generated.clone();
    let data = script_safe_json(&report)?;

    // Data goes in last so user text can never be mistaken for a placeholder
    let html = TEMPLATE
        .replace("{{STYLE}}", STYLE_CSS)
        .replace("{{RESULTS}}", RESULTS_HTML)
        .replace("{{RENDER_JS}}", RENDER_JS)
        .replace("{{GENERATED}}", &generated)
        .replace("{{DATA}}", &data);

    writer.write_all(html.as_bytes())
}

/// JSON that is safe to inline in a `<script>` element
pub fn script_safe_json<T: serde::Serialize>(value: &T) -> io::Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(json.replace('<', "\\u003c"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::attach_results;
    use crate::assess::AssessmentResult;
    use crate::inventory::{AssetRecord, AssetTable};

    fn render(asset: &str, assessment: AssessmentResult) -> String {
        let record: AssetRecord = vec![("Asset", asset)].into_iter().collect();
        let table = AssetTable::from_parts(vec!["Asset".into()], vec![record]);
        let augmented = attach_results(&table, vec![assessment]).unwrap();
        let mut buf = Vec::new();
        write(&mut buf, &augmented).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_html_contains_chart_containers() {
        let html = render("Laptop", AssessmentResult::Success("ok".into()));
        assert!(html.contains(r#"id="risk-chart""#));
        assert!(html.contains(r#"id="category-chart""#));
        assert!(html.contains("renderReport(JSON.parse"));
        assert!(!html.contains("{{"), "unreplaced placeholder");
    }

    #[test]
    fn test_html_embeds_data() {
        let html = render("Laptop", AssessmentResult::Success("Encrypt the disk".into()));
        assert!(html.contains("Encrypt the disk"));
        assert!(html.contains(r#""Asset":"Laptop""#));
    }

    #[test]
    fn test_html_neutralizes_script_breakout() {
        let html = render("</script><script>alert(1)</script>", AssessmentResult::Success("x".into()));
        assert_eq!(html.matches("</script>").count(), 3, "only the template's own closing tags");
        assert!(html.contains("\\u003c/script>"));
    }

    #[test]
    fn test_html_placeholder_text_in_data_is_inert() {
        let html = render("{{RENDER_JS}}", AssessmentResult::Success("x".into()));
        assert_eq!(html.matches("function renderReport").count(), 1);
    }
}

use std::fmt::Write as _;

use crate::{
    export::{CSV_FILENAME, JSON_FILENAME},
    models::SimulationForm,
    view::{Advisory, Body, ErrorView, Page, ResultView, SimulatePanel, TrendsPanel},
};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Header chip describing where requests go.
pub struct Chrome<'a> {
    pub title: &'a str,
    pub backend_mode: &'a str,
    pub backend_url: &'a str,
}

pub fn render_page(page: &Page, chrome: &Chrome<'_>) -> String {
    let nav: String = page
        .actions
        .iter()
        .map(|a| {
            format!(
                r#"<form method="post" action="/action/{slug}"><button class="btn" type="submit">{label}</button></form>"#,
                slug = a.slug(),
                label = a.label()
            )
        })
        .collect();

    let body = match &page.body {
        Body::Home => render_home(),
        Body::Simulate { form, panel } => render_simulate(form, panel, page.can_export),
        Body::Trends(panel) => render_trends(panel),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>
      :root {{
        --bg: #0b1220;
        --panel: rgba(255,255,255,0.06);
        --stroke: rgba(255,255,255,0.12);
        --text: rgba(255,255,255,0.92);
        --muted: rgba(255,255,255,0.65);
        --bad: #ff4d4d;
        --warn: #ffcc00;
        --brand: #7c5cff;
        --brand2: #3dd6d0;
      }}
      * {{ box-sizing: border-box; }}
      body {{
        margin: 0;
        font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial;
        color: var(--text);
        background: radial-gradient(1200px 900px at 15% 10%, rgba(124,92,255,0.20), transparent 60%), var(--bg);
      }}
      .wrap {{ max-width: 980px; margin: 0 auto; padding: 22px 18px 42px; }}
      .topbar {{
        display: flex; align-items: center; justify-content: space-between; gap: 12px;
        padding: 16px; border: 1px solid var(--stroke); border-radius: 16px;
        background: linear-gradient(180deg, rgba(255,255,255,0.06), rgba(255,255,255,0.03));
      }}
      .title {{ font-weight: 800; letter-spacing: 0.2px; }}
      .subtitle {{ color: var(--muted); font-size: 12px; margin-top: 2px; }}
      .nav {{ display: flex; gap: 8px; }}
      .card {{ margin-top: 14px; border: 1px solid var(--stroke); border-radius: 16px; background: var(--panel); padding: 14px; }}
      .card h2 {{ margin: 0 0 10px; font-size: 16px; }}
      .kpis {{ display: grid; gap: 10px; grid-template-columns: repeat(3, 1fr); }}
      .kpi {{ border: 1px solid rgba(255,255,255,0.10); border-radius: 14px; padding: 12px; }}
      .kpi .lbl {{ color: var(--muted); font-size: 12px; }}
      .kpi .val {{ font-size: 22px; font-weight: 850; margin-top: 6px; }}
      .notice {{ margin-top: 10px; padding: 10px 12px; border-radius: 12px; border: 1px solid var(--stroke); }}
      .notice.warn {{ background: rgba(255,204,0,0.10); color: var(--warn); }}
      .notice.info {{ background: rgba(61,214,208,0.10); color: var(--brand2); }}
      .notice.bad {{ background: rgba(255,77,77,0.10); color: var(--bad); }}
      .btn {{
        cursor: pointer; padding: 8px 10px; border-radius: 10px;
        border: 1px solid rgba(255,255,255,0.12); background: rgba(255,255,255,0.05);
        color: var(--text); font-weight: 700; font-size: 12px; text-decoration: none;
      }}
      .btn:hover {{ background: rgba(255,255,255,0.08); }}
      .fields {{ display: grid; gap: 10px; grid-template-columns: repeat(2, 1fr); }}
      label {{ display: flex; flex-direction: column; gap: 4px; font-size: 12px; color: var(--muted); }}
      input {{ padding: 7px 9px; border-radius: 8px; border: 1px solid var(--stroke); background: rgba(0,0,0,0.25); color: var(--text); }}
      .small {{ font-size: 12px; color: var(--muted); }}
      .mono {{ font-family: ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, monospace; }}
      pre {{ white-space: pre-wrap; word-break: break-word; margin: 6px 0 0; }}
      .chart {{ width: 100%; height: auto; }}
      .chart .axis {{ stroke: var(--stroke); }}
      .chart .tick {{ fill: var(--muted); font-size: 11px; }}
      .chart .line {{ stroke: var(--brand2); stroke-width: 2; }}
      .chart .dot {{ fill: var(--brand); }}
      @media (max-width: 700px) {{
        .kpis, .fields {{ grid-template-columns: 1fr; }}
      }}
    </style>
  </head>
  <body>
    <div class="wrap">
      <div class="topbar">
        <div>
          <div class="title">{title} • Dashboard</div>
          <div class="subtitle">backend=<b>{mode}</b> • <span class="mono">{url}</span> • screen=<b>{screen}</b></div>
        </div>
        <div class="nav">{nav}</div>
      </div>
      {body}
    </div>
  </body>
</html>"#,
        title = escape_html(chrome.title),
        mode = escape_html(chrome.backend_mode),
        url = escape_html(chrome.backend_url),
        screen = page.screen,
        nav = nav,
        body = body,
    )
}

fn render_home() -> String {
    r#"<div class="card"><h2>Welcome</h2><div class="small">Run a solar + storage simulation against the backend, or browse the recorded trends.</div></div>"#
        .to_string()
}

// Numeric fields are text inputs; parsing happens server-side.
fn input(name: &str, label: &str, value: &Option<String>) -> String {
    format!(
        r#"<label>{label}<input name="{name}" type="text" value="{value}" /></label>"#,
        value = escape_html(value.as_deref().unwrap_or_default())
    )
}

fn render_form(form: &SimulationForm) -> String {
    let checked = if form.noise() == Some(true) { " checked" } else { "" };
    let mut out = String::from(r#"<form method="post" action="/simulate/run"><div class="fields">"#);
    out.push_str(&input("location", "Location", &form.location));
    out.push_str(&input("scenario", "Scenario", &form.scenario));
    out.push_str(&input("battery_size", "Battery size (kWh)", &form.battery_size));
    out.push_str(&input("efficiency", "Efficiency", &form.efficiency));
    out.push_str(&input("dod", "Depth of discharge", &form.dod));
    out.push_str(&input("loss_factor", "Loss factor", &form.loss_factor));
    let _ = write!(
        out,
        r#"<label><span><input name="noise" type="checkbox"{checked} /> Add noise</span></label></div>"#
    );
    out.push_str(r#"<div style="margin-top:12px;"><button class="btn" type="submit">Run</button></div></form>"#);
    out
}

fn render_error(err: &ErrorView) -> String {
    let mut out = format!(r#"<div class="notice bad">{}</div>"#, escape_html(&err.message));
    if let Some(status) = err.status {
        let _ = write!(out, r#"<div class="small" style="margin-top:8px;">Status code: <b>{status}</b></div>"#);
    }
    if let Some(raw) = &err.raw_body {
        let _ = write!(
            out,
            r#"<div class="small">Raw response:</div><pre class="mono small" id="rawBody">{}</pre>"#,
            escape_html(raw)
        );
    }
    out
}

fn render_result(v: &ResultView, can_export: bool) -> String {
    let mut out = String::from(r#"<div class="kpis">"#);
    for m in &v.metrics {
        let _ = write!(
            out,
            r#"<div class="kpi"><div class="lbl">{}</div><div class="val">{}</div></div>"#,
            escape_html(m.label),
            escape_html(&m.value)
        );
    }
    out.push_str("</div>");
    if let Some(ts) = &v.timestamp {
        let _ = write!(out, r#"<div class="small" style="margin-top:6px;">as of {}</div>"#, escape_html(ts));
    }
    for a in &v.advisories {
        let cls = match a {
            Advisory::LowBattery => "warn",
            Advisory::HighOutput => "info",
        };
        let _ = write!(out, r#"<div class="notice {cls}">{}</div>"#, escape_html(a.message()));
    }
    if can_export {
        let _ = write!(
            out,
            r#"<div class="nav" style="margin-top:12px;"><a class="btn" href="/export/{CSV_FILENAME}" download>Download CSV</a><a class="btn" href="/export/{JSON_FILENAME}" download>Download JSON</a></div>"#
        );
    }
    let _ = write!(
        out,
        r#"<details style="margin-top:12px;"><summary class="small">Status code: {}</summary><pre class="mono small">{}</pre></details>"#,
        v.status,
        escape_html(&v.raw_body)
    );
    out
}

fn render_simulate(form: &SimulationForm, panel: &SimulatePanel, can_export: bool) -> String {
    let result = match panel {
        SimulatePanel::NotRun => {
            let mut s = String::from(r#"<div class="small">Set the parameters and press Run.</div>"#);
            if can_export {
                let _ = write!(
                    s,
                    r#"<div class="nav" style="margin-top:12px;"><a class="btn" href="/export/{CSV_FILENAME}" download>Download last CSV</a><a class="btn" href="/export/{JSON_FILENAME}" download>Download last JSON</a></div>"#
                );
            }
            s
        }
        SimulatePanel::InvalidInput(msg) => {
            format!(r#"<div class="notice bad">Invalid input: {}</div>"#, escape_html(msg))
        }
        SimulatePanel::Error(err) => render_error(err),
        SimulatePanel::Result(v) => render_result(v, can_export),
    };
    format!(
        r#"<div class="card"><h2>Simulation</h2>{form}</div><div class="card"><h2>Result</h2>{result}</div>"#,
        form = render_form(form),
    )
}

fn render_trends(panel: &TrendsPanel) -> String {
    match panel {
        TrendsPanel::Error(err) => format!(r#"<div class="card"><h2>Trends</h2>{}</div>"#, render_error(err)),
        TrendsPanel::NoData => {
            r#"<div class="card"><h2>Trends</h2><div class="small">The backend returned no data points.</div></div>"#
                .to_string()
        }
        TrendsPanel::Charts(v) => {
            let mut out = format!(
                r#"<div class="card"><h2>Trends</h2><div class="small">{n} points • {from} → {to}</div></div>"#,
                n = v.points,
                from = v.range.0.format("%Y-%m-%d %H:%M:%S"),
                to = v.range.1.format("%Y-%m-%d %H:%M:%S"),
            );
            for chart in &v.charts {
                let _ = write!(
                    out,
                    r#"<div class="card"><h2>{}</h2>{}</div>"#,
                    escape_html(chart.title),
                    chart.to_svg()
                );
            }
            out
        }
    }
}

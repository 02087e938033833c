//! Turns a session plus whatever the backend said into a plain view model.
//! Nothing here does I/O, so every screen can be checked without a browser.

use chrono::NaiveDateTime;

use crate::{
    charts::LineChart,
    client::{FetchError, Fetched},
    models::{ChartSeries, SimulationForm, SimulationResult},
    session::{Action, RunOutcome, Screen, Session},
};

pub const LOW_CHARGE_PERCENT: f64 = 20.0;
pub const HIGH_OUTPUT_KW: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    LowBattery,
    HighOutput,
}

impl Advisory {
    pub fn message(self) -> &'static str {
        match self {
            Self::LowBattery => "Low battery: charge level is below 20%. Consider reducing load.",
            Self::HighOutput => "High output: panels are producing more than 4 kW.",
        }
    }
}

pub fn advisories(r: &SimulationResult) -> Vec<Advisory> {
    let mut out = Vec::new();
    if r.charge_percent < LOW_CHARGE_PERCENT {
        out.push(Advisory::LowBattery);
    }
    if r.panel_output_kw > HIGH_OUTPUT_KW {
        out.push(Advisory::HighOutput);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

/// Shortest faithful form: `15.0` shows as `15`, `5.2` as `5.2`.
pub fn format_number(v: f64) -> String {
    if v == 0.0 {
        // covers -0.0
        "0".to_string()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

pub fn metrics(r: &SimulationResult) -> [Metric; 3] {
    [
        Metric {
            label: "Panel Output (kW)",
            value: format_number(r.panel_output_kw),
        },
        Metric {
            label: "Storage (kW)",
            value: format_number(r.storage_kw),
        },
        Metric {
            label: "Charge Level (%)",
            value: format!("{}%", format_number(r.charge_percent)),
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorView {
    pub message: String,
    pub status: Option<u16>,
    pub raw_body: Option<String>,
}

pub fn error_view(err: &FetchError) -> ErrorView {
    let message = match err {
        FetchError::Transport(fault) => format!("Could not reach the backend: {fault}"),
        FetchError::Status { status, .. } => format!("Backend request failed (HTTP {status})."),
        FetchError::NotJson { .. } => "Response is not valid JSON. See raw response below.".to_string(),
        FetchError::Decode { message, .. } => {
            format!("Response JSON did not have the expected shape: {message}")
        }
    };
    ErrorView {
        message,
        status: err.status(),
        raw_body: err.body().map(str::to_string),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub metrics: [Metric; 3],
    pub advisories: Vec<Advisory>,
    pub timestamp: Option<String>,
    pub status: u16,
    pub raw_body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatePanel {
    NotRun,
    Result(ResultView),
    Error(ErrorView),
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendsView {
    pub charts: [LineChart; 2],
    pub points: usize,
    pub range: (NaiveDateTime, NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendsPanel {
    Charts(TrendsView),
    NoData,
    Error(ErrorView),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Home,
    Simulate {
        form: SimulationForm,
        panel: SimulatePanel,
    },
    Trends(TrendsPanel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub screen: Screen,
    pub actions: &'static [Action],
    pub can_export: bool,
    pub body: Body,
}

pub fn simulate_panel(outcome: Option<&RunOutcome>) -> SimulatePanel {
    match outcome {
        None => SimulatePanel::NotRun,
        Some(RunOutcome::Invalid(e)) => SimulatePanel::InvalidInput(e.to_string()),
        Some(RunOutcome::Failed(e)) => SimulatePanel::Error(error_view(e)),
        Some(RunOutcome::Success(fetched)) => SimulatePanel::Result(ResultView {
            metrics: metrics(&fetched.payload),
            advisories: advisories(&fetched.payload),
            timestamp: fetched.payload.timestamp.clone(),
            status: fetched.status,
            raw_body: fetched.body.clone(),
        }),
    }
}

pub fn trends_panel(fetched: &Result<Fetched<ChartSeries>, FetchError>) -> TrendsPanel {
    let series = match fetched {
        Err(e) => return TrendsPanel::Error(error_view(e)),
        Ok(f) => &f.payload,
    };
    let Some(range) = series.time_range() else {
        return TrendsPanel::NoData;
    };
    TrendsPanel::Charts(TrendsView {
        charts: [
            LineChart::new("Panel Output (kW)", "kW", series.panel_output()),
            LineChart::new("Charge Level (%)", "%", series.charge_percent()),
        ],
        points: series.len(),
        range,
    })
}

/// `charts` is only consulted on the trends screen, where the caller has just fetched it.
pub fn build_page(
    session: &Session,
    charts: Option<&Result<Fetched<ChartSeries>, FetchError>>,
) -> Page {
    let body = match session.screen {
        Screen::Home => Body::Home,
        Screen::Simulate => Body::Simulate {
            form: session.form.clone(),
            panel: simulate_panel(session.last_run.as_ref()),
        },
        Screen::Trends => Body::Trends(match charts {
            Some(fetched) => trends_panel(fetched),
            None => TrendsPanel::NoData,
        }),
    };
    Page {
        screen: session.screen,
        actions: session.screen.actions(),
        can_export: session.screen == Screen::Simulate && session.last_result.is_some(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartRow, ParamError};

    fn result(panel: f64, storage: f64, charge: f64) -> SimulationResult {
        SimulationResult {
            panel_output_kw: panel,
            storage_kw: storage,
            charge_percent: charge,
            timestamp: None,
        }
    }

    #[test]
    fn low_battery_threshold_is_strict() {
        for (charge, shown) in [(0.0, true), (19.99, true), (20.0, false), (55.0, false), (100.0, false)] {
            let got = advisories(&result(1.0, 1.0, charge)).contains(&Advisory::LowBattery);
            assert_eq!(got, shown, "charge={charge}");
        }
    }

    #[test]
    fn high_output_threshold_is_strict() {
        for (panel, shown) in [(0.0, false), (4.0, false), (4.01, true), (12.0, true)] {
            let got = advisories(&result(panel, 1.0, 50.0)).contains(&Advisory::HighOutput);
            assert_eq!(got, shown, "panel={panel}");
        }
    }

    #[test]
    fn reference_example() {
        let r: SimulationResult =
            serde_json::from_str(r#"{"panel_output_kw": 5.2, "storage_kw": 3.1, "charge_percent": 15}"#)
                .unwrap();
        let values: Vec<String> = metrics(&r).into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec!["5.2", "3.1", "15%"]);
        assert_eq!(advisories(&r), vec![Advisory::LowBattery, Advisory::HighOutput]);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(0.125), "0.125");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn error_messages_per_failure_kind() {
        let v = error_view(&FetchError::Transport("connection refused".into()));
        assert!(v.message.contains("connection refused"));
        assert_eq!(v.status, None);
        assert_eq!(v.raw_body, None);

        let v = error_view(&FetchError::Status {
            status: 503,
            body: "down".into(),
        });
        assert_eq!(v.message, "Backend request failed (HTTP 503).");
        assert_eq!(v.raw_body.as_deref(), Some("down"));

        let v = error_view(&FetchError::NotJson {
            status: 200,
            content_type: "text/plain".into(),
            body: "<b>hi</b>".into(),
        });
        assert!(v.message.contains("not valid JSON"));
        assert_eq!(v.raw_body.as_deref(), Some("<b>hi</b>"));

        let v = error_view(&FetchError::Decode {
            status: 200,
            body: r#"{"panel_output_kw":2}"#.into(),
            message: "missing field `storage_kw`".into(),
        });
        assert_eq!(
            v.message,
            "Response JSON did not have the expected shape: missing field `storage_kw`"
        );
        assert_eq!(v.status, Some(200));
        assert_eq!(v.raw_body.as_deref(), Some(r#"{"panel_output_kw":2}"#));
    }

    #[test]
    fn simulate_screen_shows_metrics_only_on_success() {
        let mut session = Session {
            screen: Screen::Simulate,
            ..Default::default()
        };
        let page = build_page(&session, None);
        assert!(matches!(
            page.body,
            Body::Simulate {
                panel: SimulatePanel::NotRun,
                ..
            }
        ));
        assert!(!page.can_export);

        session.record_run(RunOutcome::Failed(FetchError::Status {
            status: 500,
            body: String::new(),
        }));
        let page = build_page(&session, None);
        assert!(matches!(page.body, Body::Simulate { panel: SimulatePanel::Error(_), .. }));
        assert!(!page.can_export);

        session.record_run(RunOutcome::Invalid(ParamError {
            field: "dod",
            value: "x".into(),
        }));
        let page = build_page(&session, None);
        assert!(matches!(
            page.body,
            Body::Simulate { panel: SimulatePanel::InvalidInput(_), .. }
        ));

        session.record_run(RunOutcome::Success(Fetched {
            status: 200,
            body: "{..}".into(),
            payload: result(2.0, 1.0, 80.0),
        }));
        let page = build_page(&session, None);
        match page.body {
            Body::Simulate {
                panel: SimulatePanel::Result(v),
                ..
            } => {
                assert!(v.advisories.is_empty());
                assert_eq!(v.status, 200);
                assert_eq!(v.raw_body, "{..}");
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert!(page.can_export);
    }

    #[test]
    fn home_page_offers_only_navigation() {
        let page = build_page(&Session::default(), None);
        assert_eq!(page.body, Body::Home);
        assert_eq!(page.actions, &[Action::Simulate, Action::ViewTrends]);
    }

    #[test]
    fn trends_panel_variants() {
        let rows = vec![
            ChartRow {
                timestamp: "2024-06-01T10:00:00".into(),
                panel_output_kw: 3.0,
                charge_percent: 60.0,
                storage_kw: None,
            },
            ChartRow {
                timestamp: "2024-06-01T09:00:00".into(),
                panel_output_kw: 1.0,
                charge_percent: 50.0,
                storage_kw: None,
            },
        ];
        let ok: Result<_, FetchError> = Ok(Fetched {
            status: 200,
            body: String::new(),
            payload: ChartSeries::from_rows(rows).unwrap(),
        });
        match trends_panel(&ok) {
            TrendsPanel::Charts(v) => {
                assert_eq!(v.points, 2);
                assert_eq!(v.charts[0].points[0].1, 1.0);
                assert_eq!(v.charts[1].points[1].1, 60.0);
                assert!(v.range.0 < v.range.1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let empty: Result<_, FetchError> = Ok(Fetched {
            status: 200,
            body: "[]".into(),
            payload: ChartSeries::default(),
        });
        assert_eq!(trends_panel(&empty), TrendsPanel::NoData);

        let failed: Result<Fetched<ChartSeries>, _> = Err(FetchError::Transport("dns".into()));
        assert!(matches!(trends_panel(&failed), TrendsPanel::Error(_)));

        let session = Session {
            screen: Screen::Trends,
            ..Default::default()
        };
        let page = build_page(&session, Some(&failed));
        assert_eq!(page.actions, &[Action::Back]);
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One run of the backend simulation, as returned by `/simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub panel_output_kw: f64,
    pub storage_kw: f64,
    pub charge_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SimulationResult {
    /// Names of fields outside their documented range. Such values are still shown as received.
    pub fn out_of_range_fields(&self) -> Vec<&'static str> {
        let mut bad = Vec::new();
        if !(self.panel_output_kw >= 0.0) {
            bad.push("panel_output_kw");
        }
        if !(self.storage_kw >= 0.0) {
            bad.push("storage_kw");
        }
        if !(0.0..=100.0).contains(&self.charge_percent) {
            bad.push("charge_percent");
        }
        bad
    }
}

/// Query parameters accepted by `/simulate`. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationParams {
    pub location: Option<String>,
    pub scenario: Option<String>,
    pub noise: Option<bool>,
    pub battery_size: Option<f64>,
    pub efficiency: Option<f64>,
    pub dod: Option<f64>,
    pub loss_factor: Option<f64>,
}

impl SimulationParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(v) = &self.location {
            q.push(("location", v.clone()));
        }
        if let Some(v) = &self.scenario {
            q.push(("scenario", v.clone()));
        }
        if let Some(v) = self.noise {
            q.push(("noise", v.to_string()));
        }
        let numeric = [
            ("battery_size", self.battery_size),
            ("efficiency", self.efficiency),
            ("dod", self.dod),
            ("loss_factor", self.loss_factor),
        ];
        for (key, value) in numeric {
            if let Some(v) = value {
                q.push((key, v.to_string()));
            }
        }
        q
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} must be a number (got {value:?})")]
pub struct ParamError {
    pub field: &'static str,
    pub value: String,
}

/// Raw form fields as posted by the simulate screen. Kept as typed so a rejected
/// value is shown back to the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationForm {
    pub location: Option<String>,
    pub scenario: Option<String>,
    pub noise: Option<String>,
    pub battery_size: Option<String>,
    pub efficiency: Option<String>,
    pub dod: Option<String>,
    pub loss_factor: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_number(field: &'static str, v: &Option<String>) -> Result<Option<f64>, ParamError> {
    match non_blank(v) {
        None => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(ParamError { field, value: s }),
        },
    }
}

impl SimulationForm {
    /// Checkboxes post "on" when ticked and nothing otherwise.
    pub fn noise(&self) -> Option<bool> {
        non_blank(&self.noise)
            .map(|v| matches!(v.to_lowercase().as_str(), "on" | "true" | "1" | "yes"))
    }

    pub fn to_params(&self) -> Result<SimulationParams, ParamError> {
        Ok(SimulationParams {
            location: non_blank(&self.location),
            scenario: non_blank(&self.scenario),
            noise: self.noise(),
            battery_size: parse_number("battery_size", &self.battery_size)?,
            efficiency: parse_number("efficiency", &self.efficiency)?,
            dod: parse_number("dod", &self.dod)?,
            loss_factor: parse_number("loss_factor", &self.loss_factor)?,
        })
    }
}

/// One row of `/charts` as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub timestamp: String,
    pub panel_output_kw: f64,
    pub charge_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_kw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub at: NaiveDateTime,
    pub row: ChartRow,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {index}: timestamp {value:?} is not ISO-8601")]
pub struct SeriesError {
    pub index: usize,
    pub value: String,
}

/// Time series from `/charts`, always in ascending time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Parses every timestamp and sorts ascending. One bad timestamp rejects the series.
    pub fn from_rows(rows: Vec<ChartRow>) -> Result<Self, SeriesError> {
        let mut points = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| match parse_timestamp(&row.timestamp) {
                Some(at) => Ok(ChartPoint { at, row }),
                None => Err(SeriesError {
                    index,
                    value: row.timestamp.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        points.sort_by_key(|p| p.at);
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.points.first()?.at, self.points.last()?.at))
    }

    pub fn panel_output(&self) -> Vec<(NaiveDateTime, f64)> {
        self.points()
            .iter()
            .map(|p| (p.at, p.row.panel_output_kw))
            .collect()
    }

    pub fn charge_percent(&self) -> Vec<(NaiveDateTime, f64)> {
        self.points()
            .iter()
            .map(|p| (p.at, p.row.charge_percent))
            .collect()
    }
}

/// Accepts RFC 3339 (normalised to UTC), naive `YYYY-MM-DDTHH:MM:SS[.f]` and plain dates.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: &str, panel: f64, charge: f64) -> ChartRow {
        ChartRow {
            timestamp: ts.to_string(),
            panel_output_kw: panel,
            charge_percent: charge,
            storage_kw: None,
        }
    }

    #[test]
    fn decodes_result_with_and_without_timestamp() {
        let r: SimulationResult =
            serde_json::from_str(r#"{"panel_output_kw": 5.2, "storage_kw": 3.1, "charge_percent": 15}"#)
                .unwrap();
        assert_eq!(r.charge_percent, 15.0);
        assert_eq!(r.timestamp, None);

        let r: SimulationResult = serde_json::from_str(
            r#"{"panel_output_kw": 1, "storage_kw": 2, "charge_percent": 50, "timestamp": "2024-06-01T12:00:00"}"#,
        )
        .unwrap();
        assert_eq!(r.timestamp.as_deref(), Some("2024-06-01T12:00:00"));
    }

    #[test]
    fn missing_key_is_a_decode_error() {
        let err = serde_json::from_str::<SimulationResult>(r#"{"panel_output_kw": 1, "storage_kw": 2}"#)
            .unwrap_err();
        assert!(err.to_string().contains("charge_percent"));
    }

    #[test]
    fn range_check_flags_but_keeps_values() {
        let r = SimulationResult {
            panel_output_kw: -1.0,
            storage_kw: 0.0,
            charge_percent: 101.0,
            timestamp: None,
        };
        assert_eq!(r.out_of_range_fields(), vec!["panel_output_kw", "charge_percent"]);
    }

    #[test]
    fn query_keeps_field_order_and_skips_absent() {
        let p = SimulationParams {
            location: Some("Berlin".into()),
            noise: Some(true),
            dod: Some(0.8),
            ..Default::default()
        };
        assert_eq!(
            p.to_query(),
            vec![
                ("location", "Berlin".to_string()),
                ("noise", "true".to_string()),
                ("dod", "0.8".to_string()),
            ]
        );
        assert!(SimulationParams::default().to_query().is_empty());
    }

    #[test]
    fn form_blank_fields_are_absent_and_bad_numbers_rejected() {
        let form = SimulationForm {
            location: Some("  ".into()),
            scenario: Some("cloudy".into()),
            noise: Some("on".into()),
            battery_size: Some("13.5".into()),
            efficiency: Some("".into()),
            ..Default::default()
        };
        let p = form.to_params().unwrap();
        assert_eq!(p.location, None);
        assert_eq!(p.scenario.as_deref(), Some("cloudy"));
        assert_eq!(p.noise, Some(true));
        assert_eq!(p.battery_size, Some(13.5));
        assert_eq!(p.efficiency, None);

        let form = SimulationForm {
            loss_factor: Some("lots".into()),
            ..Default::default()
        };
        let err = form.to_params().unwrap_err();
        assert_eq!(err.field, "loss_factor");
        assert_eq!(form.loss_factor.as_deref(), Some("lots"));
    }

    #[test]
    fn series_is_sorted_by_time() {
        let s = ChartSeries::from_rows(vec![
            row("2024-06-01T12:00:00", 3.0, 60.0),
            row("2024-06-01T10:00:00Z", 1.0, 40.0),
            row("2024-06-01 11:00:00", 2.0, 50.0),
        ])
        .unwrap();
        let panel: Vec<f64> = s.panel_output().into_iter().map(|(_, v)| v).collect();
        assert_eq!(panel, vec![1.0, 2.0, 3.0]);
        let (first, last) = s.time_range().unwrap();
        assert!(first < last);
    }

    #[test]
    fn offsets_are_normalised_before_sorting() {
        // 12:00+02:00 is 10:00 UTC, earlier than 11:00 naive.
        let s = ChartSeries::from_rows(vec![
            row("2024-06-01T11:00:00", 2.0, 0.0),
            row("2024-06-01T12:00:00+02:00", 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(s.points()[0].row.panel_output_kw, 1.0);
    }

    #[test]
    fn bad_timestamp_rejects_series() {
        let err = ChartSeries::from_rows(vec![
            row("2024-06-01T10:00:00", 1.0, 1.0),
            row("yesterday", 1.0, 1.0),
        ])
        .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.value, "yesterday");
    }

    #[test]
    fn empty_series_has_no_range() {
        let s = ChartSeries::from_rows(Vec::new()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.time_range(), None);
    }

    #[test]
    fn chart_rows_ignore_unknown_keys() {
        let rows: Vec<ChartRow> = serde_json::from_str(
            r#"[{"timestamp": "2024-01-01", "panel_output_kw": 1.5, "charge_percent": 80, "storage_kw": 2, "temperature": 21}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].storage_kw, Some(2.0));
        assert!(parse_timestamp(&rows[0].timestamp).is_some());
    }
}

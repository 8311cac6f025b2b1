//! Yahoo-style chart API bar source (`/v8/finance/chart/{symbol}`).
//!
//! Bars are returned in exchange-local time using the `gmtoffset` from the
//! response metadata. Rows where any price is null are dropped; the feed
//! emits them for halted sessions and for the still-forming bar.

use crate::domain::bar::Bar;
use crate::domain::error::SwingError;
use crate::ports::bar_source::{keep_last, BarSource, Interval};
use chrono::{DateTime, Duration as ChronoDuration};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) swingtrader";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Chart range wide enough for `lookback` bars of `interval`; 0 asks for
/// the widest range the API serves at that interval.
pub fn range_for(interval: Interval, lookback: usize) -> &'static str {
    match interval {
        // intraday history is capped at 730 days upstream
        Interval::Hour if lookback == 0 || lookback > 400 => "730d",
        Interval::Hour => "60d",
        Interval::Day if lookback == 0 || lookback > 480 => "10y",
        Interval::Day => "2y",
        Interval::Week if lookback == 0 || lookback > 500 => "max",
        Interval::Week => "10y",
    }
}

pub struct YahooBarSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooBarSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SwingError> {
        let invalid = |key: &str, reason: String| SwingError::ConfigInvalid {
            section: "market".to_string(),
            key: key.to_string(),
            reason,
        };
        reqwest::Url::parse(base_url)
            .map_err(|e| invalid("base_url", format!("'{}': {}", base_url, e)))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e: reqwest::Error| invalid("source", format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, instrument: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, instrument)
    }
}

fn parse_chart(instrument: &str, body: &str) -> Result<Vec<Bar>, SwingError> {
    let fail = |reason: String| SwingError::Fetch {
        instrument: instrument.to_string(),
        reason,
    };

    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e: serde_json::Error| fail(format!("malformed chart response: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(fail(format!("{}: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| fail("empty chart result".to_string()))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = ChronoDuration::seconds(result.meta.gmtoffset);

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let prices = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = prices else {
            continue;
        };
        let Some(utc) = DateTime::from_timestamp(ts, 0) else {
            return Err(fail(format!("timestamp {} out of range", ts)));
        };

        bars.push(Bar {
            timestamp: utc.naive_utc() + offset,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, i).unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}

impl BarSource for YahooBarSource {
    fn fetch(
        &self,
        instrument: &str,
        interval: Interval,
        lookback: usize,
    ) -> Result<Vec<Bar>, SwingError> {
        let fail = |e: reqwest::Error| SwingError::Fetch {
            instrument: instrument.to_string(),
            reason: e.to_string(),
        };

        let range = range_for(interval, lookback);
        let body = self
            .client
            .get(self.chart_url(instrument))
            .query(&[("interval", interval.as_str()), ("range", range)])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(fail)?;

        let bars = parse_chart(instrument, &body)?;
        debug!(instrument, %interval, range, bars = bars.len(), "chart fetched");
        Ok(keep_last(bars, lookback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "TCS.NS", "gmtoffset": 19800},
                "timestamp": [1704685500, 1704771900, 1704689100],
                "indicators": {"quote": [{
                    "open":   [3700.0, null, 3710.0],
                    "high":   [3720.0, null, 3730.0],
                    "low":    [3690.0, null, 3705.0],
                    "close":  [3715.0, null, 3725.5],
                    "volume": [1200, null, null]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_bars_in_local_time() {
        let bars = parse_chart("TCS.NS", CHART).unwrap();
        assert_eq!(bars.len(), 2);
        // 2024-01-08 03:45 UTC is 09:15 in +05:30
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 8)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap()
        );
        assert_eq!(bars[0].volume, 1200.0);
        assert_eq!(bars[1].close, 3725.5);
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn api_error_is_a_fetch_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("NOPE.NS", body).unwrap_err();
        assert!(matches!(&err, SwingError::Fetch { instrument, .. } if instrument == "NOPE.NS"));
        assert!(err.to_string().contains("symbol may be delisted"));
    }

    #[test]
    fn malformed_body_is_a_fetch_error() {
        let err = parse_chart("TCS.NS", "<html>").unwrap_err();
        assert!(err.to_string().contains("malformed chart response"));
    }

    #[test]
    fn range_covers_lookback() {
        assert_eq!(range_for(Interval::Hour, 300), "60d");
        assert_eq!(range_for(Interval::Hour, 0), "730d");
        assert_eq!(range_for(Interval::Day, 250), "2y");
        assert_eq!(range_for(Interval::Week, 0), "max");
    }

    #[test]
    fn chart_url_trims_trailing_slash() {
        let source =
            YahooBarSource::new("https://query1.finance.yahoo.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            source.chart_url("BTC-USD"),
            "https://query1.finance.yahoo.com/v8/finance/chart/BTC-USD"
        );
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        let err = YahooBarSource::new("query1 finance", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, SwingError::ConfigInvalid { key, .. } if key == "base_url"));
    }
}

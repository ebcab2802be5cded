//! Presenter formats an `AnalysisResult` for a caller-chosen output
//! format. Ships JSON, CSV, and plain-text renderers since they are cheap
//! and testable.

use crate::domain::{AnalysisResult, OutputFormat};
use crate::error::Result;

pub trait Renderer {
    fn render(&self, result: &AnalysisResult, format: OutputFormat) -> Result<String>;
}

pub struct DefaultRenderer;

impl Renderer for DefaultRenderer {
    fn render(&self, result: &AnalysisResult, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => render_json(result),
            OutputFormat::Csv => render_csv(result),
            OutputFormat::Text => render_text(result),
        }
    }
}

fn render_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

fn render_csv(result: &AnalysisResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "start_value",
            "end_value",
            "absolute_change",
            "percentage_change",
            "trend_direction",
            "currency_code",
        ])
        .map_err(crate::error::FpmaError::from)?;
    writer
        .write_record([
            result.start_value.to_string(),
            result.end_value.to_string(),
            result.absolute_change.to_string(),
            result
                .percentage_change
                .map(|p| p.to_string())
                .unwrap_or_default(),
            format!("{:?}", result.trend_direction).to_uppercase(),
            result.currency_code.clone(),
        ])
        .map_err(crate::error::FpmaError::from)?;

    if let Some(series) = &result.time_series {
        writer
            .write_record(["bucket_start", "avg", "min", "max", "count"])
            .map_err(crate::error::FpmaError::from)?;
        for row in series {
            writer
                .write_record([
                    row.bucket_start.to_rfc3339(),
                    row.avg.map(|v| v.to_string()).unwrap_or_default(),
                    row.min.map(|v| v.to_string()).unwrap_or_default(),
                    row.max.map(|v| v.to_string()).unwrap_or_default(),
                    row.count.to_string(),
                ])
                .map_err(crate::error::FpmaError::from)?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| {
        crate::error::FpmaError::configuration(format!("csv writer flush failed: {e}"))
    })?;
    String::from_utf8(bytes)
        .map_err(|e| crate::error::FpmaError::configuration(format!("csv output not utf8: {e}")))
}

fn render_text(result: &AnalysisResult) -> Result<String> {
    let mut lines = vec![
        format!("Freight Price Movement Analysis ({})", result.currency_code),
        format!("  start_value:        {}", result.start_value),
        format!("  end_value:          {}", result.end_value),
        format!("  absolute_change:    {}", result.absolute_change),
        format!(
            "  percentage_change:  {}",
            result
                .percentage_change
                .map(|p| p.to_string())
                .unwrap_or_else(|| "undefined".to_string())
        ),
        format!("  trend_direction:    {:?}", result.trend_direction),
        format!(
            "  overall:            avg={} min={} max={} count={}",
            result.overall_stats.avg,
            result.overall_stats.min,
            result.overall_stats.max,
            result.overall_stats.count
        ),
    ];

    if let Some(baseline) = &result.baseline_comparison {
        lines.push(format!(
            "  baseline_comparison: {:?} (percentage_difference={})",
            baseline.comparison, baseline.percentage_difference
        ));
    }

    Ok(lines.join("\n"))
}

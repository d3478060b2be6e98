//! Chart renderer collaborator
//!
//! The copilot only describes charts. A [`ChartRenderer`] turns a
//! [`ChartDescriptor`] into whatever the plotting front end consumes; the
//! default emits a Vega-Lite v5 document.

use crate::models::{ChartDescriptor, ChartKind};
use crate::Result;
use serde_json::{json, Value};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Trait for chart rendering back ends
pub trait ChartRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    fn render(&self, chart: &ChartDescriptor) -> Result<Value>;
}

pub struct VegaLiteRenderer;

impl ChartRenderer for VegaLiteRenderer {
    fn name(&self) -> &'static str {
        "vega-lite"
    }

    fn render(&self, chart: &ChartDescriptor) -> Result<Value> {
        // undefined points stay null so line charts show a gap
        let values: Vec<Value> = chart
            .points
            .iter()
            .map(|p| json!({ "label": p.label, "value": p.value }))
            .collect();

        let (mark, encoding) = match chart.kind {
            ChartKind::Bar => (
                json!({ "type": "bar" }),
                cartesian_encoding(chart),
            ),
            ChartKind::Line => (
                json!({ "type": "line", "point": true }),
                cartesian_encoding(chart),
            ),
            ChartKind::Pie => (
                json!({ "type": "arc" }),
                json!({
                    "theta": { "field": "value", "type": "quantitative", "title": chart.y_label },
                    "color": { "field": "label", "type": "nominal", "title": chart.x_label, "sort": null },
                }),
            ),
        };

        Ok(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "title": chart.title,
            "data": { "values": values },
            "mark": mark,
            "encoding": encoding,
        }))
    }
}

fn cartesian_encoding(chart: &ChartDescriptor) -> Value {
    json!({
        "x": { "field": "label", "type": "ordinal", "title": chart.x_label, "sort": null },
        "y": { "field": "value", "type": "quantitative", "title": chart.y_label },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartPoint;

    fn chart(kind: ChartKind) -> ChartDescriptor {
        ChartDescriptor {
            kind,
            title: "Gross Margin % Trend".into(),
            x_label: "Period".into(),
            y_label: "GM %".into(),
            points: vec![
                ChartPoint::new("2025-05", None),
                ChartPoint::new("2025-06", Some(62.5)),
            ],
        }
    }

    #[test]
    fn test_line_spec() {
        let spec = VegaLiteRenderer.render(&chart(ChartKind::Line)).unwrap();
        assert_eq!(spec["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(spec["mark"]["type"], "line");
        assert_eq!(spec["encoding"]["y"]["title"], "GM %");
        assert!(spec["data"]["values"][0]["value"].is_null());
        assert_eq!(spec["data"]["values"][1]["value"], 62.5);
    }

    #[test]
    fn test_pie_spec_uses_theta() {
        let spec = VegaLiteRenderer.render(&chart(ChartKind::Pie)).unwrap();
        assert_eq!(spec["mark"]["type"], "arc");
        assert_eq!(spec["encoding"]["theta"]["field"], "value");
        assert!(spec["encoding"].get("x").is_none());
    }
}

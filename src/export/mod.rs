//! PDF snapshot export
//!
//! Two fixed US Letter pages: revenue vs budget on the first, the opex
//! breakdown on the second, each as text lines above a bar chart. The
//! metrics arrive already computed; this module only draws them.

use crate::error::CopilotError;
use crate::metrics::{OpexBreakdown, RevenueVsBudget};
use crate::models::ChartDescriptor;
use crate::tools::format::{format_signed_pct, format_usd};
use crate::tools::metric_tools::{opex_chart, revenue_chart};
use crate::Result;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};
use tracing::debug;

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 15.0;
const LINE_STEP: f32 = 7.0;
const TOP_CATEGORIES: usize = 10;
const MAX_LABEL_CHARS: usize = 14;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Plot area in page coordinates (millimetres from the bottom-left corner)
#[derive(Debug, Clone, Copy)]
struct ChartArea {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn pdf_error<E: std::fmt::Display>(e: E) -> CopilotError {
    CopilotError::Export(e.to_string())
}

/// Render the two-page snapshot and return the PDF bytes
pub fn render_snapshot(revenue: &RevenueVsBudget, opex: &OpexBreakdown) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        "CFO Snapshot",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Revenue",
    );
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
    };

    // Page 1: revenue vs budget
    let layer = doc.get_page(page1).get_layer(layer1);
    let variance_side = if revenue.variance >= 0.0 { "above" } else { "below" };
    let lines = vec![
        format!("Period: {}", revenue.period),
        format!("Revenue (Actual): {}", format_usd(revenue.actual)),
        format!("Revenue (Budget): {}", format_usd(revenue.budget)),
        format!(
            "Variance: {} ({}, {} budget)",
            format_usd(revenue.variance),
            format_signed_pct(revenue.variance_pct),
            variance_side
        ),
    ];
    let text_bottom = draw_text_block(&layer, &fonts, "Revenue vs Budget", &lines);
    draw_bar_chart(
        &layer,
        &fonts,
        &revenue_chart(revenue),
        chart_area_below(text_bottom),
    );

    // Page 2: opex breakdown, largest categories first
    let (page2, layer2) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Opex");
    let layer = doc.get_page(page2).get_layer(layer2);
    let mut lines: Vec<String> = opex
        .categories
        .iter()
        .take(TOP_CATEGORIES)
        .map(|c| format!("{}: {}", c.category, format_usd(c.amount_usd)))
        .collect();
    if lines.is_empty() {
        lines.push(format!("No opex recorded for {}.", opex.period));
    } else {
        lines.push(format!("Total opex {}: {}", opex.period, format_usd(opex.total())));
    }
    let text_bottom = draw_text_block(&layer, &fonts, "Opex Breakdown (Top Categories)", &lines);

    let mut chart = opex_chart(opex);
    chart.points.truncate(TOP_CATEGORIES);
    draw_bar_chart(&layer, &fonts, &chart, chart_area_below(text_bottom));

    let bytes = doc.save_to_bytes().map_err(pdf_error)?;
    debug!(bytes = bytes.len(), period = %revenue.period, "Snapshot PDF rendered");
    Ok(bytes)
}

/// Title plus text lines from the top margin down; returns the y of the last line
fn draw_text_block(layer: &PdfLayerReference, fonts: &Fonts, title: &str, lines: &[String]) -> f32 {
    let mut y = PAGE_HEIGHT - MARGIN - 5.0;
    layer.use_text(title, 16.0, Mm(MARGIN), Mm(y), &fonts.bold);
    y -= LINE_STEP * 1.5;

    for line in lines {
        layer.use_text(line.as_str(), 12.0, Mm(MARGIN), Mm(y), &fonts.regular);
        y -= LINE_STEP;
    }
    y
}

fn chart_area_below(text_bottom: f32) -> ChartArea {
    let top = (text_bottom - 15.0).min(PAGE_HEIGHT * 0.6);
    ChartArea {
        x: MARGIN + 10.0,
        y: 30.0,
        width: PAGE_WIDTH - 2.0 * MARGIN - 20.0,
        height: (top - 30.0).max(40.0),
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 2).collect();
        format!("{}..", head)
    }
}

/// Vertical bars from a chart descriptor. Undefined values are left blank;
/// negative values are labelled but drawn at zero height.
fn draw_bar_chart(layer: &PdfLayerReference, fonts: &Fonts, chart: &ChartDescriptor, area: ChartArea) {
    layer.use_text(
        chart.title.as_str(),
        11.0,
        Mm(area.x),
        Mm(area.y + area.height + 6.0),
        &fonts.bold,
    );

    // axes
    layer.set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
    layer.set_outline_thickness(0.8);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(area.x), Mm(area.y + area.height)), false),
            (Point::new(Mm(area.x), Mm(area.y)), false),
            (Point::new(Mm(area.x + area.width), Mm(area.y)), false),
        ],
        is_closed: false,
    });

    if chart.points.is_empty() {
        return;
    }

    let max = chart
        .points
        .iter()
        .filter_map(|p| p.value)
        .fold(0.0_f64, f64::max);
    let slot = area.width / chart.points.len() as f32;
    let bar_width = slot * 0.6;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.22, 0.42, 0.69, None)));

    for (i, point) in chart.points.iter().enumerate() {
        let left = area.x + slot * i as f32 + (slot - bar_width) / 2.0;

        layer.use_text(
            truncate_label(&point.label),
            7.0,
            Mm(left),
            Mm(area.y - 5.0),
            &fonts.regular,
        );

        let Some(value) = point.value else {
            layer.use_text("n/a", 7.0, Mm(left), Mm(area.y + 2.0), &fonts.regular);
            continue;
        };

        let height = if max > 0.0 {
            (value.max(0.0) / max) as f32 * area.height
        } else {
            0.0
        };
        if height > 0.0 {
            let rect = Rect::new(Mm(left), Mm(area.y), Mm(left + bar_width), Mm(area.y + height))
                .with_mode(PaintMode::Fill);
            layer.add_rect(rect);
        }

        layer.use_text(
            format_usd(value),
            7.0,
            Mm(left),
            Mm(area.y + height + 2.0),
            &fonts.regular,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::OpexCategory;
    use crate::models::Period;

    fn revenue() -> RevenueVsBudget {
        RevenueVsBudget {
            period: Period::new(2025, 6).unwrap(),
            actual: 120000.0,
            budget: 100000.0,
            variance: 20000.0,
            variance_pct: Some(20.0),
        }
    }

    #[test]
    fn test_snapshot_is_a_pdf() {
        let opex = OpexBreakdown {
            period: Period::new(2025, 6).unwrap(),
            categories: (0..12)
                .map(|i| OpexCategory {
                    category: format!("Category number {}", i),
                    amount_usd: 1000.0 * (12 - i) as f64,
                })
                .collect(),
        };

        let bytes = render_snapshot(&revenue(), &opex).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_snapshot_without_opex() {
        let opex = OpexBreakdown {
            period: Period::new(2025, 6).unwrap(),
            categories: vec![],
        };
        let bytes = render_snapshot(&revenue(), &opex).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("R&D"), "R&D");
        assert_eq!(truncate_label("Sales and Marketing"), "Sales and Ma..");
    }
}

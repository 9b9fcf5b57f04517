//! Turns a [`DispatchReport`] into presentation-ready panels and renders
//! them as plain text or JSON.

use std::fmt::Write as _;

use serde::Serialize;

use chorus_types::{ProviderResult, Result};

use crate::report::DispatchReport;

/// One labeled result, ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub label: String,
    /// `vendor/variant` the panel belongs to.
    pub spec: String,
    pub body: PanelBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelBody {
    Text(String),
    Error { category: String, detail: String },
}

impl Panel {
    pub fn title(&self) -> String {
        format!("{} response", self.label)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, PanelBody::Error { .. })
    }
}

/// One panel per report entry, in report order.
pub fn format_report(report: &DispatchReport) -> Vec<Panel> {
    report
        .iter()
        .map(|entry| {
            let body = match &entry.result {
                ProviderResult::Success { text } => PanelBody::Text(text.clone()),
                ProviderResult::Failure { kind, message } => PanelBody::Error {
                    category: kind.label().to_string(),
                    detail: message.clone(),
                },
            };
            Panel {
                label: entry.label.clone(),
                spec: entry.spec.to_string(),
                body,
            }
        })
        .collect()
}

/// Plain text: one titled section per panel, separated by blank lines.
pub fn render_text(panels: &[Panel]) -> String {
    let mut out = String::new();
    for (i, panel) in panels.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let title = panel.title();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
        match &panel.body {
            PanelBody::Text(text) => {
                let _ = writeln!(out, "{}", text.trim_end());
            }
            PanelBody::Error { category, detail } => {
                let _ = writeln!(out, "Error ({category}): {detail}");
            }
        }
    }
    out
}

pub fn render_json(panels: &[Panel]) -> Result<String> {
    Ok(serde_json::to_string_pretty(panels)?)
}

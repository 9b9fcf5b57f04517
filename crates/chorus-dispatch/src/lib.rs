//! Dispatch engine for chorus: fans one prompt out to many providers
//! concurrently and collects an ordered, per-provider report.

mod dispatcher;
mod format;
mod report;

pub use dispatcher::Dispatcher;
pub use format::{format_report, render_json, render_text, Panel, PanelBody};
pub use report::{DispatchReport, ReportEntry};

//! Presentation layer
//!
//! Read-only projections of a state snapshot, plus the single-page
//! dashboard that polls them.

mod view;

pub use view::{
    ConnectionPhase, DashboardView, EmotionBars, EmotionSeries, LogView, MessageView, TrendPoint,
    ViewOptions,
};

/// The dashboard page (polls `/api/view`)
pub const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

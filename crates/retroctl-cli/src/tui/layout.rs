//! Layout management for adaptive terminal sizing

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Size category for the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCategory {
    /// Less than 24 lines
    Small,
    /// 24-40 lines
    Medium,
    /// More than 40 lines
    Large,
}

impl SizeCategory {
    pub fn from_height(height: u16) -> Self {
        if height < 24 {
            SizeCategory::Small
        } else if height < 40 {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        }
    }
}

/// Layout slots - header, loop table, log, footer
pub struct LayoutSlots {
    pub size: SizeCategory,
    pub header: Rect,
    pub main: Rect,
    pub log: Rect,
    pub footer: Rect,
}

/// Create the main layout
pub fn create_layout(area: Rect) -> LayoutSlots {
    let size = SizeCategory::from_height(area.height);

    let log_height = match size {
        SizeCategory::Small => 4,
        SizeCategory::Medium => 6,
        SizeCategory::Large => 8,
    };

    let constraints = vec![
        Constraint::Length(4),           // Header: transport + beat cells
        Constraint::Min(10),             // Loop table and pending ops
        Constraint::Length(log_height),  // Log
        Constraint::Length(4),           // Footer key help
    ];

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    LayoutSlots {
        size,
        header: sections[0],
        main: sections[1],
        log: sections[2],
        footer: sections[3],
    }
}

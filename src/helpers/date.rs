//! Date helper functions

use chrono::NaiveDateTime;

use crate::content::parse_date;

/// Date styles used across the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `Jun 1, 2024`, used in the post list
    Short,
    /// `June 1, 2024`, used on post pages
    Long,
    /// `2024-06-01`, for `<time datetime>`
    Iso,
    /// `24年6月1日`, the rolodex timeline label
    Compact,
    /// `24年6月`, the timeline's starting label
    Month,
}

impl DateStyle {
    fn pattern(self) -> &'static str {
        match self {
            DateStyle::Short => "%b %-d, %Y",
            DateStyle::Long => "%B %-d, %Y",
            DateStyle::Iso => "%Y-%m-%d",
            DateStyle::Compact => "%y年%-m月%-d日",
            DateStyle::Month => "%y年%-m月",
        }
    }

    /// Look a style up by the name templates use
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "short" => Some(DateStyle::Short),
            "long" => Some(DateStyle::Long),
            "iso" => Some(DateStyle::Iso),
            "compact" => Some(DateStyle::Compact),
            "month" => Some(DateStyle::Month),
            _ => None,
        }
    }
}

/// Format a date
///
/// # Examples
/// ```ignore
/// format_date(&date, DateStyle::Short) // -> "Jun 1, 2024"
/// ```
pub fn format_date(date: &NaiveDateTime, style: DateStyle) -> String {
    date.format(style.pattern()).to_string()
}

/// Format a raw front-matter date, `None` when it cannot be parsed
pub fn format_date_str(raw: &str, style: DateStyle) -> Option<String> {
    parse_date(raw).map(|date| format_date(&date, style))
}

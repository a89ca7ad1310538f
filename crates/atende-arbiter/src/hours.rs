// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working-hours window evaluation.

use chrono::{Datelike, NaiveDateTime, NaiveTime};

use atende_storage::models::AgentConfig;

/// Whether automation may reply at `now` (local time).
///
/// An empty weekday set means every day is eligible. A missing or
/// unparseable hours window fails open. Windows crossing midnight
/// (start > end) are supported.
pub fn within_working_hours(config: &AgentConfig, now: NaiveDateTime) -> bool {
    if !config.weekdays.is_empty() {
        let today = now.weekday().num_days_from_monday() as u8;
        if !config.weekdays.contains(&today) {
            return false;
        }
    }

    let (Some(start), Some(end)) = (config.hours_start.as_deref(), config.hours_end.as_deref())
    else {
        return true;
    };
    let Ok(start) = NaiveTime::parse_from_str(start, "%H:%M") else {
        return true;
    };
    let Ok(end) = NaiveTime::parse_from_str(end, "%H:%M") else {
        return true;
    };

    let t = now.time();
    if start <= end {
        t >= start && t < end
    } else {
        t >= start || t < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config(start: Option<&str>, end: Option<&str>, weekdays: Vec<u8>) -> AgentConfig {
        AgentConfig {
            id: "cfg-1".to_string(),
            sector_id: "sector-1".to_string(),
            agent_name: "Clara".to_string(),
            persona: None,
            tone: None,
            business_context: None,
            faq: None,
            model: "claude-haiku-4-5-20250901".to_string(),
            enabled: true,
            auto_reply: true,
            hybrid_timeout_minutes: 5,
            response_delay_secs: 0,
            escalation_keywords: Vec::new(),
            hours_start: start.map(|s| s.to_string()),
            hours_end: end.map(|s| s.to_string()),
            weekdays,
            out_of_hours_template: None,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        // 2026-08-03 is a Monday.
        NaiveDate::from_ymd_opt(2026, 8, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn sunday_at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn no_window_is_always_open() {
        let cfg = config(None, None, Vec::new());
        assert!(within_working_hours(&cfg, monday_at(3, 0)));
    }

    #[test]
    fn window_bounds_are_half_open() {
        let cfg = config(Some("08:00"), Some("18:00"), Vec::new());
        assert!(!within_working_hours(&cfg, monday_at(7, 59)));
        assert!(within_working_hours(&cfg, monday_at(8, 0)));
        assert!(within_working_hours(&cfg, monday_at(17, 59)));
        assert!(!within_working_hours(&cfg, monday_at(18, 0)));
    }

    #[test]
    fn empty_weekdays_means_every_day() {
        let cfg = config(Some("08:00"), Some("18:00"), Vec::new());
        assert!(within_working_hours(&cfg, sunday_at(10)));
    }

    #[test]
    fn weekday_set_excludes_other_days() {
        // Monday through Friday.
        let cfg = config(Some("08:00"), Some("18:00"), vec![0, 1, 2, 3, 4]);
        assert!(within_working_hours(&cfg, monday_at(10, 0)));
        assert!(!within_working_hours(&cfg, sunday_at(10)));
    }

    #[test]
    fn overnight_window_crosses_midnight() {
        let cfg = config(Some("22:00"), Some("06:00"), Vec::new());
        assert!(within_working_hours(&cfg, monday_at(23, 0)));
        assert!(within_working_hours(&cfg, monday_at(5, 0)));
        assert!(!within_working_hours(&cfg, monday_at(12, 0)));
    }

    #[test]
    fn unparseable_window_fails_open() {
        let cfg = config(Some("8am"), Some("6pm"), Vec::new());
        assert!(within_working_hours(&cfg, monday_at(3, 0)));
    }
}

//! Month calendar with completion dots

use chrono::{Datelike, Months, NaiveDate};
use ratatui::prelude::*;

use crate::progress::CalendarMarkMap;

const WEEKDAY_HEADER: &str = " Su  Mo  Tu  We  Th  Fr  Sa";

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Same day in the neighbouring month, clamped to that month's length
pub fn shift_month(date: NaiveDate, forward: bool) -> NaiveDate {
    let shifted = if forward {
        date.checked_add_months(Months::new(1))
    } else {
        date.checked_sub_months(Months::new(1))
    };
    shifted.unwrap_or(date)
}

/// Weeks of the month, Sunday first; days outside the month are `None`
pub fn month_weeks(anchor: NaiveDate) -> Vec<[Option<NaiveDate>; 7]> {
    let first = month_start(anchor);
    let offset = first.weekday().num_days_from_sunday() as usize;

    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = offset;
    let mut day = Some(first);
    while let Some(date) = day.filter(|d| d.month() == first.month()) {
        week[slot] = Some(date);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
        day = date.succ_opt();
    }
    if slot > 0 {
        weeks.push(week);
    }
    weeks
}

/// Calendar lines: title, weekday header, one line per week
pub fn render_month(cursor: NaiveDate, today: NaiveDate, marks: &CalendarMarkMap) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(cursor.format("%B %Y").to_string())
            .style(Style::default().fg(Color::Cyan).bold())
            .centered(),
        Line::from(WEEKDAY_HEADER).style(Style::default().fg(Color::DarkGray)),
    ];

    for week in month_weeks(cursor) {
        let spans: Vec<Span> = week
            .iter()
            .map(|day| match day {
                None => Span::raw("    "),
                Some(date) => {
                    let marked = marks.is_marked(date);
                    let label = format!(" {:>2}{}", date.day(), if marked { "•" } else { " " });
                    let mut style = Style::default();
                    if marked {
                        style = style.fg(Color::Green).bold();
                    }
                    if *date == today {
                        style = style.underlined();
                    }
                    if *date == cursor {
                        style = style.reversed();
                    }
                    Span::styled(label, style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

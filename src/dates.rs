use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// `YYYY-MM-DD`, the date format every API parameter uses.
pub fn format_day(date: Date) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    date.format(&fmt).unwrap_or_default()
}

pub fn today() -> String {
    format_day(OffsetDateTime::now_utc().date())
}

/// Current (year, month) with month in 1..=12.
pub fn current_year_month() -> (i32, u8) {
    let now = OffsetDateTime::now_utc();
    (now.year(), u8::from(now.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_day(date!(2026 - 01 - 03)), "2026-01-03");
        assert_eq!(today().len(), 10);
        let (_, month) = current_year_month();
        assert!((1..=12).contains(&month));
    }
}

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};

/// Elapsed time between two instants in business days, excluding weekends
/// and the Irish public-holiday calendar. Fractions within a day count.
/// Returns 0.0 whenever `end <= start`.
pub fn business_duration(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    if end <= start {
        return 0.0;
    }
    let start = start.naive_local();
    let end = end.naive_local();

    let mut total = 0.0;
    let mut holidays: Vec<NaiveDate> = vec![];
    let mut holidays_year = i32::MIN;
    let mut day = start.date();
    while day <= end.date() {
        if day.year() != holidays_year {
            holidays_year = day.year();
            holidays = ireland_holidays(holidays_year);
        }
        if is_business_day(day, &holidays) {
            let midnight = day.and_hms_opt(0, 0, 0).unwrap();
            let next_midnight = day.succ_opt().unwrap().and_hms_opt(0, 0, 0).unwrap();
            let from = start.max(midnight);
            let to = end.min(next_midnight);
            if to > from {
                total += (to - from).num_seconds() as f64 / 86_400.0;
            }
        }
        day = day.succ_opt().unwrap();
    }
    total
}

fn is_business_day(day: NaiveDate, holidays: &[NaiveDate]) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&day)
}

/// Irish public holidays for one year.
fn ireland_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = vec![];

    // New Year's Day
    push_observed(&mut days, date(year, 1, 1));
    // St Brigid's Day: first Monday of February, or 1 February when that
    // is a Friday. Introduced in 2023.
    if year >= 2023 {
        let feb_first = date(year, 2, 1);
        if feb_first.weekday() == Weekday::Fri {
            days.push(feb_first);
        } else {
            days.push(first_weekday(year, 2, Weekday::Mon));
        }
    }
    // St Patrick's Day
    push_observed(&mut days, date(year, 3, 17));
    // Easter Monday
    days.push(easter_sunday(year).succ_opt().unwrap());
    // May Day, June Holiday, August Holiday
    days.push(first_weekday(year, 5, Weekday::Mon));
    days.push(first_weekday(year, 6, Weekday::Mon));
    days.push(first_weekday(year, 8, Weekday::Mon));
    // October Holiday
    days.push(last_weekday(year, 10, Weekday::Mon));
    // Christmas Day, St Stephen's Day
    push_observed(&mut days, date(year, 12, 25));
    push_observed(&mut days, date(year, 12, 26));

    days
}

// A holiday landing on a weekend is observed on the next free weekday.
fn push_observed(days: &mut Vec<NaiveDate>, day: NaiveDate) {
    days.push(day);
    if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        return;
    }
    let mut observed = day;
    while matches!(observed.weekday(), Weekday::Sat | Weekday::Sun) || days.contains(&observed) {
        observed = observed.succ_opt().unwrap();
    }
    days.push(observed);
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn first_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let mut day = date(year, month, 1);
    while day.weekday() != weekday {
        day = day.succ_opt().unwrap();
    }
    day
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let mut day = date(year, month + 1, 1).pred_opt().unwrap();
    while day.weekday() != weekday {
        day = day.pred_opt().unwrap();
    }
    day
}

// Anonymous Gregorian computus (Meeus/Jones/Butcher).
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    date(year, month as u32, day as u32)
}

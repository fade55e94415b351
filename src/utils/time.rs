use chrono::{DateTime, TimeZone};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Whole days between `moment` and `now`, rounded towards the past. Moments in the future give
/// negative values.
pub fn days_ago<Tz: TimeZone, Tz2: TimeZone>(moment: &DateTime<Tz>, now: &DateTime<Tz2>) -> i64 {
    let elapsed = now.timestamp() - moment.timestamp();
    elapsed.div_euclid(SECONDS_PER_DAY)
}

/// Makes the time easier to read for humans: "never", "1 day ago", "12 days ago".
pub fn humanize<Tz: TimeZone, Tz2: TimeZone>(
    moment: Option<&DateTime<Tz>>,
    now: &DateTime<Tz2>,
) -> String {
    let Some(moment) = moment else {
        return "never".into();
    };
    let days = days_ago(moment, now).max(0);
    let unit = if days == 1 { "day" } else { "days" };
    format!("{days} {unit} ago")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{days_ago, humanize};

    #[test]
    fn test_days_ago_floors() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(days_ago(&now, &now), 0);
        assert_eq!(days_ago(&(now - Duration::hours(23)), &now), 0);
        assert_eq!(days_ago(&(now - Duration::hours(24)), &now), 1);
        assert_eq!(days_ago(&(now - Duration::hours(71)), &now), 2);
        assert_eq!(days_ago(&(now + Duration::hours(1)), &now), -1);
    }

    #[test]
    fn test_humanize() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(humanize::<Utc, Utc>(None, &now), "never");
        assert_eq!(humanize(Some(&now), &now), "0 days ago");
        assert_eq!(humanize(Some(&(now - Duration::days(1))), &now), "1 day ago");
        assert_eq!(humanize(Some(&(now - Duration::days(30))), &now), "30 days ago");
    }
}

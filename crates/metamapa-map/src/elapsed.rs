// "Last updated" labels for the map footer.
use chrono::{DateTime, Utc};

pub const NO_TIMESTAMP_LABEL: &str = "-";

/// Spanish relative-time label for `since`, measured at `now`.
///
/// Future timestamps count as zero elapsed.
pub fn format_elapsed(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(since) = since else {
        return NO_TIMESTAMP_LABEL.to_string();
    };
    let seconds = (now - since).num_seconds().max(0);
    let minutes = seconds / 60;
    match minutes {
        0 => "hace unos segundos".to_string(),
        1 => "hace 1 min".to_string(),
        2..=59 => format!("hace {minutes} min"),
        _ => match minutes / 60 {
            1 => "hace 1 hora".to_string(),
            hours => format!("hace {hours} horas"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn label(seconds: i64) -> String {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("now");
        format_elapsed(Some(now - Duration::seconds(seconds)), now)
    }

    #[test]
    fn elapsed_boundaries() {
        assert_eq!(label(0), "hace unos segundos");
        assert_eq!(label(59), "hace unos segundos");
        assert_eq!(label(60), "hace 1 min");
        assert_eq!(label(119), "hace 1 min");
        assert_eq!(label(120), "hace 2 min");
        assert_eq!(label(3599), "hace 59 min");
        assert_eq!(label(3600), "hace 1 hora");
        assert_eq!(label(7199), "hace 1 hora");
        assert_eq!(label(7200), "hace 2 horas");
        assert_eq!(label(26 * 3600), "hace 26 horas");
    }

    #[test]
    fn future_and_missing_timestamps() {
        assert_eq!(label(-30), "hace unos segundos");
        assert_eq!(format_elapsed(None, Utc::now()), "-");
    }
}

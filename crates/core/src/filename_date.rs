use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

// Messaging-app export names, e.g. "WhatsApp Image 2023-03-12 at 17.18.03.jpeg".
// Matched anywhere in the stem, whatever app name precedes the stamp.
static EXPORT_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<y>\d{4})-(?P<mo>\d{2})-(?P<d>\d{2}) at (?P<h>\d{2})\.(?P<mi>\d{2})\.(?P<s>\d{2})",
    )
    .unwrap()
});

/// Capture date embedded in an export file name. Seconds are dropped: the
/// export stamp is only trusted to the minute.
pub fn date_from_filename(path: &Path) -> Option<DateTime<Local>> {
    let stem = path.file_stem()?.to_str()?;
    let caps = EXPORT_STAMP.captures(stem)?;
    let num = |name: &str| caps.name(name)?.as_str().parse::<u32>().ok();

    let year = i32::try_from(num("y")?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, num("mo")?, num("d")?)?;
    let stamped = date.and_hms_opt(num("h")?, num("mi")?, num("s")?)?;
    let naive = stamped.with_second(0)?;

    Local.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::date_from_filename;
    use chrono::{Local, TimeZone};
    use std::path::Path;

    #[test]
    fn parses_whatsapp_image_and_truncates_seconds() {
        let got = date_from_filename(Path::new("/pics/WhatsApp Image 2023-03-12 at 17.18.03.jpg"));
        let want = Local
            .with_ymd_and_hms(2023, 3, 12, 17, 18, 0)
            .single()
            .expect("valid local time");
        assert_eq!(got, Some(want));
    }

    #[test]
    fn accepts_duplicate_suffix_and_jpeg_extension() {
        let got = date_from_filename(Path::new("WhatsApp Image 2022-11-05 at 08.01.59 (1).jpeg"));
        let want = Local
            .with_ymd_and_hms(2022, 11, 5, 8, 1, 0)
            .single()
            .expect("valid local time");
        assert_eq!(got, Some(want));
    }

    #[test]
    fn stamp_is_accepted_without_whatsapp_prefix() {
        let want = Local
            .with_ymd_and_hms(2021, 4, 9, 13, 45, 0)
            .single()
            .expect("valid local time");
        assert_eq!(
            date_from_filename(Path::new("Signal 2021-04-09 at 13.45.22.jpg")),
            Some(want)
        );
        assert_eq!(
            date_from_filename(Path::new("WhatsApp Video 2021-04-09 at 13.45.59.mp4")),
            Some(want)
        );
        assert_eq!(
            date_from_filename(Path::new("receipt 2021-04-09 at 13.45.00 scan.jpg")),
            Some(want)
        );
    }

    #[test]
    fn rejects_names_without_stamp() {
        assert!(date_from_filename(Path::new("IMG_0001.JPG")).is_none());
        assert!(date_from_filename(Path::new("2023-03-12 17.18.03.jpg")).is_none());
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(date_from_filename(Path::new("WhatsApp Image 2023-02-30 at 17.18.03.jpg")).is_none());
        assert!(date_from_filename(Path::new("WhatsApp Image 2023-03-12 at 25.18.03.jpg")).is_none());
        assert!(date_from_filename(Path::new("WhatsApp Image 2023-03-12 at 17.18.75.jpg")).is_none());
    }
}

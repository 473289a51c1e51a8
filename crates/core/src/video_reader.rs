use chrono::{DateTime, Local, NaiveDate, Utc};
use log::debug;
use nom_exif::{MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use std::path::Path;

/// Creation timestamp stored in a video container (MP4/MOV/3GP/MKV), if the
/// file is one and the value is plausible.
pub fn read_video_creation_date(path: &Path) -> Option<DateTime<Local>> {
    let source = match MediaSource::file_path(path) {
        Ok(source) => source,
        Err(err) => {
            debug!("メディアとして認識できませんでした: {}: {err}", path.display());
            return None;
        }
    };
    if !source.has_track() {
        return None;
    }

    let mut parser = MediaParser::new();
    let info: TrackInfo = match parser.parse(source) {
        Ok(info) => info,
        Err(err) => {
            debug!("動画メタデータを解析できませんでした: {}: {err}", path.display());
            return None;
        }
    };

    let created = info
        .get(TrackInfoTag::CreateDate)
        .and_then(|value| value.as_time())
        .map(|t| t.with_timezone(&Utc))?;

    if !is_plausible_video_date(created) {
        debug!(
            "動画の作成日時を除外しました ({}): {}",
            created,
            path.display()
        );
        return None;
    }
    Some(created.with_timezone(&Local))
}

/// Encoders without a clock write zero, which decodes to the 1904 container
/// epoch. Only dates strictly after 1950-01-01 are kept.
pub fn is_plausible_video_date(date: DateTime<Utc>) -> bool {
    let floor = NaiveDate::from_ymd_opt(1950, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc());
    match floor {
        Some(floor) => date > floor,
        None => false,
    }
}

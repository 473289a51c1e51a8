use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use exif::{In, Reader, Tag};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// What the EXIF reader learned about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifProbe {
    /// Image with a parseable `DateTimeOriginal`.
    Dated(DateTime<Local>),
    /// Recognized image container without a `DateTimeOriginal` tag.
    Undated,
    /// `DateTimeOriginal` is present but holds no valid date, such as the
    /// all-zero value some cameras write. The tag is never replaced.
    Unparseable,
    /// Not a decodable image: unknown container, corrupt or unreadable.
    NotImage,
}

pub fn probe_capture_date(path: &Path) -> ExifProbe {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            debug!("EXIF読み込み対象を開けませんでした: {}: {err}", path.display());
            return ExifProbe::NotImage;
        }
    };
    let mut buf = BufReader::new(file);

    match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => match exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) {
            Some(field) => {
                let raw = field.display_value().to_string();
                match parse_date(&raw) {
                    Some(date) => ExifProbe::Dated(date),
                    None => {
                        debug!("DateTimeOriginalを解釈できません ({raw}): {}", path.display());
                        ExifProbe::Unparseable
                    }
                }
            }
            None => ExifProbe::Undated,
        },
        Err(exif::Error::NotFound(container)) => {
            debug!("EXIFなし ({container}): {}", path.display());
            ExifProbe::Undated
        }
        Err(err) => {
            debug!("画像として解析できませんでした: {}: {err}", path.display());
            ExifProbe::NotImage
        }
    }
}

/// JPEG is the only format the tool writes tags into. Checked by the SOI
/// marker, so a misnamed extension does not matter.
pub fn is_jpeg(path: &Path) -> Result<bool> {
    let mut file = File::open(path)
        .with_context(|| format!("ファイルを開けませんでした: {}", path.display()))?;
    let mut head = [0u8; 3];
    match file.read_exact(&mut head) {
        Ok(()) => Ok(head == [0xFF, 0xD8, 0xFF]),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(anyhow::Error::from(err)
            .context(format!("ファイル先頭を読めませんでした: {}", path.display()))),
    }
}

pub fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim();

    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Some(local);
            }
        }
    }

    None
}

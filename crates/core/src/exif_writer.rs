use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use exif::Reader;
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Writes `DateTimeOriginal` into a JPEG in place, keeping any other tags
/// already present.
pub fn write_date_time_original(path: &Path, date: DateTime<Local>) -> Result<()> {
    let value = date.format(EXIF_DATE_FORMAT).to_string();

    let mut metadata = load_existing(path)?;
    metadata.set_tag(ExifTag::DateTimeOriginal(value.clone()));
    metadata
        .write_to_file(path)
        .with_context(|| format!("EXIFを書き込めませんでした: {}", path.display()))?;

    info!("DateTimeOriginal={} を書き込みました: {}", value, path.display());
    Ok(())
}

/// Starts from the tags already in the file. A file with an EXIF block that
/// cannot be parsed is refused, since rewriting it would drop every tag.
fn load_existing(path: &Path) -> Result<Metadata> {
    let file = File::open(path)
        .with_context(|| format!("ファイルを開けませんでした: {}", path.display()))?;
    match Reader::new().read_from_container(&mut BufReader::new(file)) {
        Err(exif::Error::NotFound(_)) => Ok(Metadata::new()),
        Err(err) => Err(anyhow::Error::from(err)
            .context(format!("既存のEXIFを解析できないため書き込みません: {}", path.display()))),
        Ok(_) => Metadata::new_from_path(path).with_context(|| {
            format!("既存のEXIFを読み込めませんでした: {}", path.display())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::write_date_time_original;
    use crate::exif_reader::fixtures::write_raw_date_time_original;
    use crate::exif_reader::fixtures::minimal_jpeg;
    use crate::exif_reader::{probe_capture_date, ExifProbe};
    use chrono::{Local, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn written_tag_is_read_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        fs::write(&path, minimal_jpeg()).expect("write jpeg");

        let date = Local
            .with_ymd_and_hms(2021, 7, 7, 12, 3, 0)
            .single()
            .expect("valid local time");
        write_date_time_original(&path, date).expect("write exif");

        assert_eq!(probe_capture_date(&path), ExifProbe::Dated(date));
    }

    #[test]
    fn rewriting_replaces_previous_value() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        fs::write(&path, minimal_jpeg()).expect("write jpeg");

        let first = Local
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .expect("valid local time");
        let second = Local
            .with_ymd_and_hms(2024, 12, 25, 12, 0, 0)
            .single()
            .expect("valid local time");
        write_date_time_original(&path, first).expect("first write");
        write_date_time_original(&path, second).expect("second write");

        assert_eq!(probe_capture_date(&path), ExifProbe::Dated(second));
    }

    #[test]
    fn other_tags_survive_the_write() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        fs::write(&path, minimal_jpeg()).expect("write jpeg");
        let mut seeded = little_exif::metadata::Metadata::new();
        seeded.set_tag(little_exif::exif_tag::ExifTag::Model("PocketCam".to_string()));
        seeded.write_to_file(&path).expect("seed model");

        let date = Local
            .with_ymd_and_hms(2022, 2, 2, 8, 0, 0)
            .single()
            .expect("valid local time");
        write_date_time_original(&path, date).expect("write exif");

        let file = fs::File::open(&path).expect("open");
        let exif = exif::Reader::new()
            .read_from_container(&mut std::io::BufReader::new(file))
            .expect("read exif");
        let model = exif
            .get_field(exif::Tag::Model, exif::In::PRIMARY)
            .map(|f| f.display_value().to_string())
            .expect("model kept");
        assert!(model.contains("PocketCam"));
        assert_eq!(probe_capture_date(&path), ExifProbe::Dated(date));
    }

    #[test]
    fn broken_exif_block_is_left_untouched() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.jpg");
        // APP1 carries the Exif marker followed by an invalid TIFF header.
        let bytes = vec![
            0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10, b'E', b'x', b'i', b'f', 0x00, 0x00, b'g', b'a',
            b'r', b'b', b'a', b'g', b'e', b'!', 0xFF, 0xD9,
        ];
        fs::write(&path, &bytes).expect("write jpeg");

        let date = Local
            .with_ymd_and_hms(2022, 2, 2, 8, 0, 0)
            .single()
            .expect("valid local time");
        let err = write_date_time_original(&path, date).expect_err("refuse broken exif");

        assert!(err.to_string().contains("既存のEXIFを解析できない"));
        assert_eq!(fs::read(&path).expect("read back"), bytes);
    }

    #[test]
    fn zero_date_tag_can_be_replaced_explicitly() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("camera.jpg");
        fs::write(&path, minimal_jpeg()).expect("write jpeg");
        write_raw_date_time_original(&path, "0000:00:00 00:00:00");

        let date = Local
            .with_ymd_and_hms(2018, 10, 1, 7, 15, 0)
            .single()
            .expect("valid local time");
        write_date_time_original(&path, date).expect("write exif");

        assert_eq!(probe_capture_date(&path), ExifProbe::Dated(date));
    }
}

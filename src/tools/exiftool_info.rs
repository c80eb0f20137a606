use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// exiftool 標籤 -> 內部 metadata 鍵
const TAG_MAPPING: &[(&str, &str)] = &[
    ("DateTimeOriginal", "dateTimeOriginal"),
    ("CreateDate", "dateTimeDigitized"),
    ("Make", "camera_make"),
    ("Model", "camera_model"),
    ("LensModel", "lens_model"),
    ("ImageWidth", "width"),
    ("ImageHeight", "height"),
    ("Software", "software"),
    ("ImageDescription", "image_description"),
    ("GPSLatitude", "gps_latitude"),
    ("GPSLongitude", "gps_longitude"),
];

/// 拍攝時間的候選標籤，依序採用第一個有效值
const DATETIME_TAGS: &[&str] = &[
    "DateTimeOriginal",
    "CreateDate",
    "MediaCreateDate",
    "TrackCreateDate",
    "ModifyDate",
];

/// 檢查 exiftool 是否可用
#[must_use]
pub fn is_exiftool_available() -> bool {
    Command::new("exiftool")
        .arg("-ver")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// 使用 exiftool 取得檔案的 metadata
pub fn get_exif_info(path: &Path) -> Result<BTreeMap<String, String>> {
    let output = Command::new("exiftool")
        .args(["-json", "-n", "-api", "QuickTimeUTC"])
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 exiftool: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("exiftool 執行失敗: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let entries: Vec<Map<String, Value>> =
        serde_json::from_str(&stdout).with_context(|| "無法解析 exiftool 輸出")?;

    let tags = entries
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("exiftool 沒有輸出: {}", path.display()))?;

    Ok(map_exiftool_tags(&tags))
}

fn tag_value(tags: &Map<String, Value>, tag: &str) -> Option<String> {
    let value = match tags.get(tag)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// 全為零的日期（相機未設定時間）視為無效
fn valid_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.get(..19)?, EXIF_DATETIME_FORMAT).ok()
}

/// 將 exiftool 的 JSON 物件轉為內部 metadata 鍵值
#[must_use]
pub fn map_exiftool_tags(tags: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    for (tag, key) in TAG_MAPPING {
        if let Some(value) = tag_value(tags, tag) {
            metadata.insert((*key).to_string(), value);
        }
    }

    let datetime = DATETIME_TAGS
        .iter()
        .filter_map(|tag| tag_value(tags, tag))
        .find_map(|value| valid_datetime(&value).map(|dt| (value, dt)));

    if let Some((raw, dt)) = datetime {
        metadata.insert("datetime".to_string(), raw.chars().take(19).collect());
        metadata.insert("year".to_string(), format!("{:04}", dt.year()));
        metadata.insert("month".to_string(), format!("{:02}", dt.month()));
        metadata.insert("day".to_string(), format!("{:02}", dt.day()));
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_map_camera_photo() {
        let metadata = map_exiftool_tags(&tags(json!({
            "SourceFile": "IMG_0001.JPG",
            "DateTimeOriginal": "2023:01:15 12:30:45",
            "Make": "Apple",
            "Model": "iPhone 14 Pro",
            "ImageWidth": 4032,
            "ImageHeight": 3024,
            "GPSLatitude": 25.033,
        })));

        assert_eq!(metadata["datetime"], "2023:01:15 12:30:45");
        assert_eq!(metadata["dateTimeOriginal"], "2023:01:15 12:30:45");
        assert_eq!(metadata["year"], "2023");
        assert_eq!(metadata["month"], "01");
        assert_eq!(metadata["day"], "15");
        assert_eq!(metadata["camera_make"], "Apple");
        assert_eq!(metadata["width"], "4032");
        assert_eq!(metadata["gps_latitude"], "25.033");
        assert!(!metadata.contains_key("software"));
    }

    #[test]
    fn test_zero_date_falls_through_to_next_tag() {
        let metadata = map_exiftool_tags(&tags(json!({
            "DateTimeOriginal": "0000:00:00 00:00:00",
            "CreateDate": "2022:06:01 08:00:00+08:00",
        })));

        assert_eq!(metadata["datetime"], "2022:06:01 08:00:00");
        assert_eq!(metadata["dateTimeDigitized"], "2022:06:01 08:00:00+08:00");
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let metadata = map_exiftool_tags(&tags(json!({ "Software": "  ", "Make": null })));
        assert!(metadata.is_empty());
    }
}

use exif::{In, Reader, Tag, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str;
use thiserror::Error;

pub const REQUIRED_EXIF_TAGS: &[&str] = &["DateTimeOriginal", "GPSInfo"];

#[derive(Debug, Error)]
#[error("画像として読めませんでした: {path}")]
pub struct UnreadableImage {
    pub path: PathBuf,
}

#[derive(Debug, Error)]
#[error("未知のEXIFタグ名です: {name}")]
pub struct UnknownTagName {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ExifTagTable {
    entries: Vec<(String, Tag)>,
}

impl ExifTagTable {
    pub fn resolve(names: &[&str]) -> Result<Self, UnknownTagName> {
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let tag = tag_for_name(name).ok_or_else(|| UnknownTagName {
                name: (*name).to_string(),
            })?;
            entries.push(((*name).to_string(), tag));
        }
        Ok(Self { entries })
    }
}

fn tag_for_name(name: &str) -> Option<Tag> {
    match name {
        "DateTime" => Some(Tag::DateTime),
        "DateTimeOriginal" => Some(Tag::DateTimeOriginal),
        "DateTimeDigitized" => Some(Tag::DateTimeDigitized),
        // kamadak-exif does not expose the GPS IFD pointer as a field,
        // so presence is detected through the latitude entry.
        "GPSInfo" => Some(Tag::GPSLatitude),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataRecord {
    fields: HashMap<String, Option<String>>,
}

impl MetadataRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|value| value.as_deref())
    }

    fn absent(table: &ExifTagTable) -> Self {
        let fields = table
            .entries
            .iter()
            .map(|(name, _)| (name.clone(), None))
            .collect();
        Self { fields }
    }
}

pub fn read_metadata(path: &Path, table: &ExifTagTable) -> Result<MetadataRecord, UnreadableImage> {
    let file = File::open(path).map_err(|_| UnreadableImage {
        path: path.to_path_buf(),
    })?;
    let mut buf = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => exif,
        // A readable image with no EXIF block is not an error: every
        // requested field is simply absent.
        Err(exif::Error::NotFound(_)) => return Ok(MetadataRecord::absent(table)),
        Err(_) => {
            return Err(UnreadableImage {
                path: path.to_path_buf(),
            })
        }
    };

    let mut fields = HashMap::with_capacity(table.entries.len());
    for (name, tag) in &table.entries {
        fields.insert(name.clone(), field_value(&exif, *tag));
    }
    Ok(MetadataRecord { fields })
}

fn field_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        // The default formatter wraps ASCII values in quotes; the raw
        // bytes keep the YYYY:MM:DD HH:MM:SS colon form intact.
        Value::Ascii(ref vec) if !vec.is_empty() => str::from_utf8(&vec[0])
            .ok()
            .map(|value| value.trim().to_string()),
        _ => Some(field.display_value().to_string()),
    }
}

// Minimal JPEG carrying one APP1/TIFF segment whose Exif IFD holds a
// single DateTimeOriginal entry.
#[cfg(test)]
pub(crate) fn jpeg_with_datetime_original(datetime: &str) -> Vec<u8> {
    let mut ascii = datetime.as_bytes().to_vec();
    ascii.push(0);

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    // 0th IFD: one LONG entry pointing at the Exif IFD (offset 26)
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&26u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    // Exif IFD: DateTimeOriginal as ASCII, value stored at offset 44
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(ascii.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&44u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&ascii);

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

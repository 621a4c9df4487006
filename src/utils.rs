use crate::constants::ACCEPTED_IMAGE_TYPES;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

pub fn read_file_bytes(filename: &Path) -> Result<Vec<u8>> {
    let mut file =
        File::open(filename).with_context(|| format!("Failed to open file: {:?}", filename))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .with_context(|| "Failed to read file contents")?;
    Ok(contents)
}

/// Sibling path no other writer uses: `.<name>.<pid>.<n>.tmp`.
fn unique_temp_path(filename: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = filename
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    filename.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}

/// Writes `contents` through a sibling temporary file and a rename.
pub fn write_file_atomic(filename: &Path, contents: &[u8]) -> Result<()> {
    let temp_filename = unique_temp_path(filename);

    let mut file = File::options()
        .write(true)
        .create_new(true)
        .open(&temp_filename)
        .with_context(|| format!("Failed to create temporary file: {:?}", temp_filename))?;

    file.write_all(contents)
        .with_context(|| "Failed to write content to temporary file")?;

    file.sync_all()
        .with_context(|| "Failed to sync temporary file")?;

    std::fs::rename(&temp_filename, filename)
        .with_context(|| format!("Failed to rename temporary file to {:?}", filename))?;

    Ok(())
}

/// Returns the MIME type of an image the editor accepts, judged by extension.
pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let guessed = mime_guess::from_path(path).first()?;
    ACCEPTED_IMAGE_TYPES
        .iter()
        .copied()
        .find(|accepted| *accepted == guessed.essence_str())
}

pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

fn data_uri_regex() -> &'static Regex {
    static DATA_URI_REGEX: OnceLock<Regex> = OnceLock::new();
    DATA_URI_REGEX.get_or_init(|| {
        Regex::new(r"^data:([\w.+-]+/[\w.+-]+);base64,([A-Za-z0-9+/=\s]*)$")
            .expect("data URI pattern is valid")
    })
}

/// Splits a base64 data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let caps = data_uri_regex()
        .captures(uri.trim())
        .ok_or_else(|| anyhow!("Not a base64 data URI"))?;
    let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(payload)
        .with_context(|| "Invalid base64 payload in data URI")?;
    Ok((caps[1].to_string(), bytes))
}

/// File extension conventionally used for an image MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        write_file_atomic(&path, b"\x89PNG data").unwrap();
        assert_eq!(read_file_bytes(&path).unwrap(), b"\x89PNG data");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_keeps_unrelated_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.png");
        let neighbour = dir.path().join("edited.tmp");
        std::fs::write(&neighbour, b"user data").unwrap();

        write_file_atomic(&path, b"first").unwrap();
        write_file_atomic(&path, b"second").unwrap();

        assert_eq!(read_file_bytes(&neighbour).unwrap(), b"user data");
        assert_eq!(read_file_bytes(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_read_file_not_found() {
        let path = std::env::temp_dir().join("nonexistent_nexus_file_12345.png");
        assert!(read_file_bytes(&path).is_err());
    }

    #[test]
    fn test_image_mime_for_accepted_types() {
        assert_eq!(image_mime_for(Path::new("cat.png")), Some("image/png"));
        assert_eq!(image_mime_for(Path::new("cat.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for(Path::new("cat.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_for(Path::new("cat.webp")), Some("image/webp"));
    }

    #[test]
    fn test_image_mime_for_rejects_others() {
        assert_eq!(image_mime_for(Path::new("cat.gif")), None);
        assert_eq!(image_mime_for(Path::new("notes.txt")), None);
        assert_eq!(image_mime_for(Path::new("no_extension")), None);
    }

    #[test]
    fn test_data_uri_roundtrip() {
        let uri = encode_data_uri("image/png", &[1, 2, 3, 250]);
        assert_eq!(uri, "data:image/png;base64,AQID+g==");

        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![1, 2, 3, 250]);
    }

    #[test]
    fn test_decode_data_uri_rejects_garbage() {
        assert!(decode_data_uri("blob:http://localhost/1234").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
    }
}

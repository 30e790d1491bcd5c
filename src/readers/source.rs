use crate::error::Result;
use encoding_rs::{Encoding, UTF_8};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::warn;

/// Reads input files into text.
///
/// A byte-order mark wins; otherwise the fallback encoding is used. The
/// station exports this pipeline was built for are UTF-8 or Big5.
#[derive(Debug, Clone)]
pub struct TextSource {
    encoding: &'static Encoding,
    use_mmap: bool,
}

impl TextSource {
    pub fn new() -> Self {
        Self {
            encoding: UTF_8,
            use_mmap: false,
        }
    }

    /// Unknown labels fall back to UTF-8
    pub fn with_encoding(mut self, label: &str) -> Self {
        self.encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or(UTF_8);
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn read_to_string(&self, path: &Path) -> Result<String> {
        if self.use_mmap {
            let file = File::open(path)?;
            if file.metadata()?.len() == 0 {
                return Ok(String::new());
            }
            let mmap = unsafe { Mmap::map(&file)? };
            Ok(self.decode(&mmap, path))
        } else {
            let bytes = std::fs::read(path)?;
            Ok(self.decode(&bytes, path))
        }
    }

    fn decode(&self, bytes: &[u8], path: &Path) -> String {
        let (text, used, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            warn!(
                "{} is not valid {}; undecodable bytes were replaced",
                path.display(),
                used.name()
            );
        }
        text.into_owned()
    }
}

impl Default for TextSource {
    fn default() -> Self {
        Self::new()
    }
}

//! Episode archive fixtures.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Builder for ZIP archives shaped like published episodes.
///
/// Entry names are written verbatim, so a fixture can also describe hostile
/// archives (`../escape.txt`, absolute paths).
///
/// ```rust,no_run
/// use epsync::test_utils::ZipFixture;
///
/// let bytes = ZipFixture::new()
///     .file("MyEpisode/level1.wld", "world")
///     .file("MyEpisode/gfx/tiles.png", [0x89, b'P', b'N', b'G'])
///     .to_bytes();
/// ```
#[derive(Clone, Debug, Default)]
pub struct ZipFixture {
    entries: Vec<(String, Vec<u8>)>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typical episode: two levels, a graphics file, and a world map, all
    /// under `name/`.
    pub fn episode(name: &str) -> Self {
        Self::new()
            .file(&format!("{name}/level1.wld"), "level one v1")
            .file(&format!("{name}/level2.wld"), "level two v1")
            .file(&format!("{name}/world.wwx"), "world map v1")
            .file(&format!("{name}/graphics/tiles.png"), "tiles v1")
    }

    /// Adds a file entry.
    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Encodes the archive.
    ///
    /// # Panics
    ///
    /// When the zip writer fails, which only happens on a bug in the fixture.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in &self.entries {
            zip.start_file(name.as_str(), options).expect("start zip entry");
            zip.write_all(content).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }
}

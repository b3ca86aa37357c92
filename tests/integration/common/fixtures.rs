//! Two small releases laid out the way the ingest pipeline writes them.

use nr_types::ReleaseMapping;
use std::path::Path;

pub const BUCKET: &str = "clinvar-ingest";

/// Objects of one release directory.
pub struct ReleaseFixture {
    pub release_date: &'static str,
    pub release_dir: &'static str,
    pub objects: Vec<(&'static str, &'static str)>,
}

impl ReleaseFixture {
    /// Full keys and contents, directory included.
    pub fn keyed_objects(&self) -> Vec<(String, &'static str)> {
        self.objects
            .iter()
            .map(|(path, content)| (format!("{}/{}", self.release_dir, path), *content))
            .collect()
    }

    pub fn mapping(&self) -> ReleaseMapping {
        ReleaseMapping::new(self.release_date, self.release_dir)
    }
}

/// Releases of 2022-04-03 and 2022-04-13.
///
/// The second release adds a deleted submitter, grows the updated
/// submitters, and carries a stray README that must be excluded.
pub fn releases() -> Vec<ReleaseFixture> {
    vec![
        ReleaseFixture {
            release_date: "2022-04-03",
            release_dir: "clinvar_2022-04-03",
            objects: vec![
                ("release_date.txt", "2022-04-03\n"),
                ("gene/created/000000000000", "{\"id\":1}\n{\"id\":2}\n"),
                ("submitter/updated/000000000000", "{\"id\":10}\n"),
            ],
        },
        ReleaseFixture {
            release_date: "2022-04-13",
            release_dir: "clinvar_2022-04-13",
            objects: vec![
                ("release_date.txt", "2022-04-13\n"),
                ("gene/created/000000000000", "{\"id\":1}\n{\"id\":2}\n\n"),
                (
                    "submitter/updated/000000000000",
                    "{\"id\":10}\n{\"id\":11}\n",
                ),
                ("submitter/updated/000000000001", "{\"id\":12}\n"),
                ("submitter/deleted/000000000000", "{\"id\":9}\n"),
                ("README.md", "scratch notes\n"),
            ],
        },
    ]
}

pub fn mappings() -> Vec<ReleaseMapping> {
    releases().iter().map(ReleaseFixture::mapping).collect()
}

/// Write every release under `<root>/<BUCKET>/`.
pub fn write_to_dir(root: &Path) {
    for release in releases() {
        for (key, content) in release.keyed_objects() {
            let path = root.join(BUCKET).join(&key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }
}

//! Testing utilities and mock implementations.
//!
//! Mocks for the record store and upstream fetcher, so the orchestrator and
//! the HTTP layer can be tested without a database or network.
//!
//! # Example
//!
//! ```rust,ignore
//! use dhtinfo_core::testing::{fixtures, MockFetcher, MockRecordStore};
//!
//! let store = MockRecordStore::new();
//! let fetcher = MockFetcher::new();
//! fetcher.set_record(fixtures::torrent_record(&fixtures::info_hash('a'), "Debian")).await;
//! ```

mod mock_fetcher;
mod mock_store;

pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use mock_store::MockRecordStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::record::{InfoHash, TorrentFile, TorrentRecord};

    /// An info hash made of one repeated hex digit.
    ///
    /// Panics if `digit` is not a hex digit.
    pub fn info_hash(digit: char) -> InfoHash {
        InfoHash::parse(&digit.to_string().repeat(40)).expect("fixture info hash")
    }

    /// Create a test torrent record with two files.
    pub fn torrent_record(info_hash: &InfoHash, name: &str) -> TorrentRecord {
        TorrentRecord {
            info_hash: info_hash.clone(),
            name: name.to_string(),
            size: 1024 * 1024 * 700, // 700 MB
            age: "2 years".to_string(),
            files: vec![
                TorrentFile {
                    name: format!("{}.mkv", name),
                    size: 1024 * 1024 * 699,
                },
                TorrentFile {
                    name: "sample.mkv".to_string(),
                    size: 1024 * 1024,
                },
            ],
        }
    }
}

//! Catalog documents: fetching, parsing, and querying.

pub mod annotation;
pub mod fetcher;
pub mod index;

pub use fetcher::{digest_hex, fetch_first, HttpFetcher};
pub use index::{
    compare_versions, index_url, is_path_safe, resolve_url, Entry, Index, IndexFile,
};

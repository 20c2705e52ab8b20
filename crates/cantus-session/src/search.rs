//! Artist search against the native catalog
//!
//! A search is synchronous once the session mutex is held: create the
//! search object, copy the artist names out, release the object. The
//! release is tied to a lease value, so every path out of a search
//! releases exactly once, including early exits.

use crate::backend::{
    BackendError, ResultWindow, SearchKind, SearchRequest, SearchToken, StreamingBackend,
};

/// Most artists one search returns. Fixed service-side page size.
pub const ARTIST_SEARCH_LIMIT: u32 = 100;

/// Scoped ownership of one backend search object.
///
/// Dropping the lease releases the search object exactly once.
struct SearchLease<'a, B: StreamingBackend> {
    backend: &'a mut B,
    token: SearchToken,
}

impl<'a, B: StreamingBackend> SearchLease<'a, B> {
    /// Start an artists-only standard search and acquire its result.
    fn create(backend: &'a mut B, query: &str) -> Result<Self, BackendError> {
        let request =
            SearchRequest::artists_only(query, ResultWindow::first(ARTIST_SEARCH_LIMIT));
        let token = backend.create_search(&request, SearchKind::Standard)?;
        Ok(Self { backend, token })
    }

    /// Copy every artist display name out of the search result.
    fn artist_names(&self) -> Vec<String> {
        let count = self.backend.search_artist_count(self.token);
        let mut names = Vec::with_capacity(count);
        for index in 0..count {
            if let Some(name) = self.backend.search_artist_name(self.token, index) {
                names.push(name);
            }
        }
        names
    }
}

impl<B: StreamingBackend> Drop for SearchLease<'_, B> {
    fn drop(&mut self) {
        self.backend.release_search(self.token);
    }
}

/// Run one artists-only search to completion.
///
/// Returns `None` when the backend fails to create the search; a search
/// that runs but matches nothing returns an empty vector.
pub(crate) fn collect_artists<B: StreamingBackend>(
    backend: &mut B,
    query: &str,
) -> Option<Vec<String>> {
    let lease = match SearchLease::create(backend, query) {
        Ok(lease) => lease,
        Err(error) => {
            log::warn!("Artist search for '{}' failed: {}", query, error);
            return None;
        }
    };

    let names = lease.artist_names();
    log::info!("Found {} artists for '{}'", names.len(), query);
    Some(names)
}

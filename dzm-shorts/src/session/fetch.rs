//! Tagged fetch results
//!
//! Every request the session starts is stamped with the request generation
//! and the category filter in force when it was issued. Results travel back
//! to the session through a channel and are checked against the session's
//! state at the moment they are applied, not when they were started.

use crate::catalog::FeedPage;
use crate::error::FetchError;
use dzm_common::Category;

/// Identity of one outstanding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTag {
    pub request_id: u64,
    /// Bumped on every feed replacement (start, category change, reload)
    pub generation: u64,
    pub category: Option<String>,
}

/// A finished request waiting to be applied by the session
#[derive(Debug)]
pub(crate) enum FetchOutcome {
    Load {
        tag: RequestTag,
        result: Result<FeedPage, FetchError>,
    },
    Append {
        tag: RequestTag,
        result: Result<FeedPage, FetchError>,
    },
    /// Category requests fail soft, so there is no error arm
    Categories {
        request_id: u64,
        categories: Vec<Category>,
    },
}

impl FetchOutcome {
    pub fn request_id(&self) -> u64 {
        match self {
            FetchOutcome::Load { tag, .. } | FetchOutcome::Append { tag, .. } => tag.request_id,
            FetchOutcome::Categories { request_id, .. } => *request_id,
        }
    }
}

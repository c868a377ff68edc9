//! Chapter structure for decoded plain-text documents.
//!
//! [`scan`] walks a document line by line and records every line that opens
//! with a structural heading (`第N章`, `卷N`, `上册`, `Chapter N`, `番外`,
//! `楔子`, ...). [`resolve_positions`] then turns those, possibly drifted,
//! entries into exact `[start, end)` spans that can be sliced out of the text.

mod consts;
pub mod models;
mod resolve;
mod scan;

pub use models::{ChapterEntry, ChapterSpan};
pub use resolve::{find_anchor, resolve_positions};
pub use scan::{Boundary, BoundaryKind, match_boundary, scan};

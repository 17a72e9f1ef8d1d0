//! Page-level building blocks of a crawl.
//!
//! Every source goes through the same steps, driven by its own
//! configuration instead of a hand-written module per outlet:
//!
//! 1. **Fetching** ([`fetch`]): download the root page and each article page
//! 2. **Indexing** ([`links`]): discover article URLs on the root page
//! 3. **Extraction** ([`extract`]): pull title, author and body from an article page
//!
//! | Step | Input | Output | Failure mode |
//! |------|-------|--------|--------------|
//! | fetch | URL | HTML body | `FetchError`, abandons one unit of work |
//! | links | root HTML | absolute article URLs | none, best-effort parse |
//! | extract | article HTML | `ArticleFields` | `None` when the page has no title |
//!
//! Parsing and extraction are synchronous; fetching is the only await point.

pub mod extract;
pub mod fetch;
pub mod links;

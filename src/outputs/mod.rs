//! Document rewriting.
//!
//! Every maintained document is plain wiki text. The engines here only touch
//! the managed region between marker comments and return new text; writing
//! it back (and advancing the ledger afterwards) is the pipeline's job.
//!
//! # Submodules
//!
//! - [`region`]: splits a document around its `<!-- Label Start -->` / `<!-- Label End -->` markers
//! - [`news_page`]: folds postable records into the day-bucketed news page
//! - [`current_list`]: folds active events and sales into their tables
//! - [`maintenance`]: renders the upcoming maintenance banner
//!
//! # Documents
//!
//! ```text
//! Wiki_Home/WikiUpdates         <!-- News ... -->   day blocks, newest first
//! Wiki_Home/Current_Events      <!-- List ... -->   one table row per event
//! Wiki_Home/Current_Sales       <!-- List ... -->   one table row per sale
//! Wiki_Home/Maintenance_Notice  (whole page)        {{Maintenance Notice}}
//! ```

pub mod current_list;
pub mod maintenance;
pub mod news_page;
pub mod region;

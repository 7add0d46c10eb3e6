//! API types shared between the server and its clients.
//!
//! This crate contains:
//! - Row types (e.g., `Review`, `Comment`) - the API representation of database entities
//! - Request types (e.g., `SubmitReviewRequest`, `CreateCommentRequest`) - API input types
//! - Derived read models (`ApprovalStatus`) and the realtime event envelopes

pub mod activity;
pub mod approval;
pub mod comment;
pub mod events;
pub mod project;
pub mod review;
pub mod team;
pub mod user;

pub use activity::*;
pub use approval::*;
pub use comment::*;
pub use events::*;
pub use project::*;
pub use review::*;
pub use team::*;
pub use user::*;

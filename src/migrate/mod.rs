//! Blogger to local store migration.
//!
//! - [`mapper`] - pure record conversions (timestamps, draft flag, slugs, tags)
//! - [`session`] - login and resolving author, blog, category and site
//! - `orchestrator` - the post loop with per-post failure isolation
//! - `comments` - comment get-or-create under a new entry
//! - `report` - console lines gated by verbosity
//! - `prompt` - operator interaction behind the [`Prompt`] trait
//!
//! # Example
//!
//! ```ignore
//! let client = session::authenticate(&mut prompt, http, &endpoints, None, None).await?;
//! let plan = session::prepare(&client, &db, &mut prompt, &options).await?;
//! let summary = Migrator::new(&client, &db, Reporter::stdout(1)).run(&plan).await?;
//! ```

mod comments;
mod error;
pub mod mapper;
mod orchestrator;
mod prompt;
mod report;
pub mod session;

pub use comments::{import_comments, CommentOutcome, CommentTarget};
pub use error::MigrateError;
pub use mapper::{Attribution, MapError};
pub use orchestrator::{MigrationPlan, Migrator, ENTRY_APP_LABEL, ENTRY_MODEL};
pub use prompt::{select_blog, ConsolePrompt, Prompt};
pub use report::{MigrationSummary, Reporter};
pub use session::SessionOptions;

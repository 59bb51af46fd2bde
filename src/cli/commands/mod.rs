mod batch;
mod config;
mod convert;
mod index;
mod query;
mod status;

use clap::Args;
use indicatif::ProgressStyle;

use crate::models::{Classification, DefaultsConfig};

pub use batch::BatchArgs;
pub use config::ConfigCommand;
pub use convert::ConvertArgs;
pub use index::IndexArgs;
pub use query::QueryArgs;

pub use batch::handle_batch;
pub use config::handle_config;
pub use convert::handle_convert;
pub use index::handle_index;
pub use query::handle_query;
pub use status::handle_status;

/// Classification flags shared by `convert` and `batch`. Unset flags fall
/// back to the `[defaults]` config section.
#[derive(Debug, Clone, Default, Args)]
pub struct ClassificationArgs {
    /// Education board, e.g. "State Board Maharashtra"
    #[arg(long)]
    pub board: Option<String>,

    /// Subject name
    #[arg(long)]
    pub subject: Option<String>,

    /// Grade or class number
    #[arg(long)]
    pub grade: Option<u32>,

    /// Book title
    #[arg(long)]
    pub book: Option<String>,

    /// Language code of the text
    #[arg(long)]
    pub language: Option<String>,
}

impl ClassificationArgs {
    pub fn resolve(self, defaults: &DefaultsConfig) -> Classification {
        Classification {
            board: self.board.unwrap_or_else(|| defaults.board.clone()),
            subject: self.subject.unwrap_or_else(|| defaults.subject.clone()),
            grade: self.grade.unwrap_or(defaults.grade),
            book: self.book.unwrap_or_else(|| defaults.book.clone()),
            language: self.language.unwrap_or_else(|| defaults.language.clone()),
        }
    }
}

pub(crate) fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}

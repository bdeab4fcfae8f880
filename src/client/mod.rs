//! Client side of the articles API: access tokens, the HTTP client, and the
//! markdown importer used by the `import` and `link` commands.

mod api;
mod front_matter;
mod importer;
mod token;

pub use api::{content_type_for, ApiClient, IMAGE_FIELD};
pub use front_matter::{ImportArticle, PUBLISH_DATE_FORMAT};
pub use importer::{markdown_files, ArticleImporter, ImportSummary, SKIPPED_ENTRIES};
pub use token::{AccessTokenService, ClientCredentials, DEFAULT_TOKEN_LIFETIME};

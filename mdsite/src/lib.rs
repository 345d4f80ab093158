mod autolink;
mod blog;
mod builder;
mod config;
mod convert;
mod footnote;
mod highlight;
mod manifest;
mod markdown;
mod math;
pub mod serve;
pub mod watch;

pub use blog::{wrap_blog, HOME_PAGE};
pub use builder::PageBuilder;
pub use config::{Config, ServeConfig, DEFAULT_MANIFEST, DEFAULT_OUTPUT_DIR, DEFAULT_PORT};
pub use convert::Site;
pub use highlight::SyntaxHighlighter;
pub use manifest::{Entry, EntryKind, Manifest};
pub use markdown::Renderer;
pub use math::MathToken;

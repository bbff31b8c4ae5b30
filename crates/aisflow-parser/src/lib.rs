pub mod errors;
pub mod reader;
pub mod schema;

pub use errors::ParserError;
pub use reader::{parse_delimited, read_delimited, COMMA, PIPE};
pub use schema::{normalize_schema, RenameReport, CANONICAL_COLUMNS, RENAME_MAP};

pub mod completion;
pub mod db;
pub mod extract;
pub mod storage;

pub use completion::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use extract::PdfTextExtractor;
pub use storage::CloudinaryAdapter;

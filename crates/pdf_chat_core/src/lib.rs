pub mod domain;
pub mod ports;
pub mod prompts;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use domain::{
    Account, AccountCredentials, AccountUpdate, Document, DocumentDetail, Exchange, NewAccount,
    NewDocument, NewExchange, PdfUpload, StoredObject,
};
pub use ports::{
    CompletionService, DatabaseService, ObjectStorageService, PortError, PortResult,
    TextExtractionService,
};
pub use workflow::{DocumentWorkflow, WorkflowError, WorkflowResult};

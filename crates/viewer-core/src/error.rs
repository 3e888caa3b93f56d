use leafview_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("failed to open document: {0}")]
    Open(#[source] EngineError),
    #[error("document was rejected by the renderer")]
    InvalidDocument,
    #[error("failed to render page {page}: {source}")]
    Render {
        page: u32,
        #[source]
        source: EngineError,
    },
    #[error("invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: i64 },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

pub type ViewResult<T> = Result<T, ViewError>;

//! Error types for shell generation

use shell_cad::CadError;

use crate::export::ExportError;
use crate::params::ParamsError;

/// Fatal generation errors. Recoverable failures (fillets, fonts, degenerate
/// bottom cutout) are logged and reported instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShellError {
    #[error("CAD kernel error: {0}")]
    Cad(#[from] CadError),
    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type ShellResult<T> = Result<T, ShellError>;

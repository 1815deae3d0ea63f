use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ArgumentParse(#[from] clap::Error),
    #[error(transparent)]
    Synthesis(#[from] lambdalith_engine::SynthesisError),
    #[error(transparent)]
    Report(#[from] lambdalith_report::ReportError),
    #[error("failed to write plan to {path}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

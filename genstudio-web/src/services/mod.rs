//! Services for genstudio-web

pub mod archive;
pub mod artifacts;
pub mod asset_ingestor;
pub mod batch_invoker;
pub mod job_registry;
pub mod prompt_library;
pub mod sentence_splitter;
pub mod spreadsheet;
pub mod uploads;

pub use archive::{build_zip, bundle_files, ArchiveError};
pub use artifacts::{download_url, ArtifactArea, ArtifactStore};
pub use asset_ingestor::{AssetIngestor, IngestionError, IngestionPolicy};
pub use batch_invoker::{run_batch, run_batch_with, BatchContext, BatchProgress};
pub use job_registry::{JobHandle, JobRegistry, JobRegistryError};
pub use prompt_library::{prompt_library, PromptCategory, PromptTemplate};
pub use sentence_splitter::split_sentences;
pub use spreadsheet::{
    read_first_sheet, read_workbook, summarize_workbook, write_workbook, SheetTable,
    SpreadsheetError, SUMMARY_CHAR_BUDGET,
};
pub use uploads::{MediaKind, TempUpload};

use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::job::JobOutcome;
use crate::processor::ocr::build_ocr;
use crate::processor::render::PdftoppmRenderer;
use crate::processor::{Document, TextExtractor};
use crate::storage::DocumentStorage;
use crate::summarizer::{build_engine, truncate_words, SummarizationEngine, SummarizeError};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;

/// Load → extract → summarize for a single job. Holds no per-job state, so
/// one instance can serve any number of jobs in sequence.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    storage: DocumentStorage,
    extractor: TextExtractor,
    summarizer: Arc<dyn SummarizationEngine>,
}

impl Pipeline {
    /// Production constructor: builds every component from config.
    pub fn from_config(config: Arc<PipelineConfig>) -> Result<Self, SummarizeError> {
        let extractor = TextExtractor::new(
            build_ocr(&config.ocr),
            Arc::new(PdftoppmRenderer::new()),
            config.ocr.dpi,
        );
        let summarizer = build_engine(&config.summarizer)?;
        let storage = DocumentStorage::new(&config.documents_directory);

        Ok(Self::new(config, storage, extractor, summarizer))
    }

    /// Wires explicit components, e.g. fakes in tests.
    pub fn new(
        config: Arc<PipelineConfig>,
        storage: DocumentStorage,
        extractor: TextExtractor,
        summarizer: Arc<dyn SummarizationEngine>,
    ) -> Self {
        Self {
            config,
            storage,
            extractor,
            summarizer,
        }
    }

    pub fn summarizer_name(&self) -> &str {
        self.summarizer.name()
    }

    /// Runs the pipeline for one job.
    /// Returns the outcome together with the context as far as it got.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
    ) -> (Result<JobOutcome, PipelineError>, PipelineContext) {
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job_id,
            kind = %ctx.input_kind,
            summarizer = self.summarizer.name(),
        )
        .entered();

        let result = self.run_steps(&mut ctx);
        (result, ctx)
    }

    fn run_steps(&self, ctx: &mut PipelineContext) -> Result<JobOutcome, PipelineError> {
        // Step 1: Load document bytes
        let bytes = {
            let _step = info_span!("load_document").entered();
            self.storage.read(&ctx.input_ref)?
        };

        // Step 2: Extract text, OCR per unit where needed
        {
            let _step = info_span!("extract_text").entered();
            let extracted = self
                .extractor
                .extract(Document::new(ctx.input_kind, bytes))?;
            debug!(
                units = extracted.fragments.len(),
                ocr_units = extracted.ocr_units,
                "Text extracted"
            );
            ctx.original_text = Some(extracted.concatenated());
            ctx.extracted = Some(extracted);
        }
        let original_text = ctx.original_text.clone().unwrap_or_default();

        // Step 3: Fit the input under the summarizer's ceiling
        let input = {
            let _step = info_span!("prepare_input").entered();
            let ceiling = self.summarizer.input_ceiling();
            match truncate_words(&original_text, ceiling) {
                Some(prefix) => {
                    warn!(ceiling, "Summarizer input truncated to ceiling");
                    ctx.input_truncated = true;
                    prefix
                }
                None => original_text.as_str(),
            }
        };

        // Step 4: Summarize (exactly one engine call)
        let summary = {
            let _step = info_span!("summarize").entered();
            let summary = self.summarizer.summarize(input, self.config.constraints)?;
            summary.trim().to_string()
        };
        if summary.is_empty() {
            return Err(PipelineError::EmptySummary);
        }
        ctx.summary = Some(summary.clone());

        // Step 5: Build result
        let title = make_title(&summary, self.config.title_length);
        Ok(JobOutcome {
            title,
            summary,
            original_text,
            input_truncated: ctx.input_truncated,
        })
    }
}

/// The first `max_chars` characters of the summary.
pub fn make_title(summary: &str, max_chars: usize) -> String {
    summary.chars().take(max_chars).collect()
}

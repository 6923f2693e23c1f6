//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::config::Config;
use crate::db::Database;
use crate::error::{ExtractionError, OcrError};
use crate::job::{Job, JobStore};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::processor::ocr::OcrEngine;
use crate::processor::render::PageRenderer;
use crate::processor::{DocumentKind, ImageRenderableSource, NativeTextSource, TextExtractor};
use crate::queue::{JobQueue, SqliteQueue};
use crate::storage::DocumentStorage;
use crate::summarizer::{LengthConstraints, SummarizationEngine, SummarizeError};
use crate::worker::JobWorker;

/// OCR engine that counts calls. Images are the UTF-8 bytes produced by
/// [`FakeRenderer`] or [`FakeSource`], e.g. `page-2`.
pub struct FakeOcr {
    calls: AtomicUsize,
    fixed: Option<String>,
    mapping: HashMap<String, String>,
}

impl FakeOcr {
    /// Recognizes every image as `text`.
    pub fn returning(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fixed: Some(text.to_string()),
            mapping: HashMap::new(),
        }
    }

    /// Recognizes listed images only; anything else is a recognition error.
    pub fn mapping(pairs: Vec<(&str, &str)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fixed: None,
            mapping: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(text) = &self.fixed {
            return Ok(text.clone());
        }
        let key = String::from_utf8_lossy(image).to_string();
        self.mapping
            .get(&key)
            .cloned()
            .ok_or_else(|| OcrError::Recognition(format!("unrecognizable image {}", key)))
    }
}

/// Renders PDF page `n` as the bytes `page-n` and records the page numbers.
#[derive(Default)]
pub struct FakeRenderer {
    rendered: Mutex<Vec<u32>>,
}

impl FakeRenderer {
    pub fn rendered(&self) -> Vec<u32> {
        self.rendered.lock().unwrap().clone()
    }
}

impl PageRenderer for FakeRenderer {
    fn render(&self, _pdf_bytes: &[u8], page: u32, _dpi: u32) -> Result<Vec<u8>, OcrError> {
        self.rendered.lock().unwrap().push(page);
        Ok(format!("page-{}", page).into_bytes())
    }
}

/// In-memory multi-unit document. `None` units have no native text.
/// Unit `n` renders as `page-n` (0-based).
pub struct FakeSource {
    units: Vec<Option<String>>,
    failing_native: Option<usize>,
    failing_render: Option<usize>,
    renders: AtomicUsize,
}

impl FakeSource {
    pub fn new(units: Vec<Option<&str>>) -> Self {
        Self {
            units: units.into_iter().map(|u| u.map(str::to_string)).collect(),
            failing_native: None,
            failing_render: None,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn failing_native(mut self, unit: usize) -> Self {
        self.failing_native = Some(unit);
        self
    }

    pub fn failing_render(mut self, unit: usize) -> Self {
        self.failing_render = Some(unit);
        self
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl NativeTextSource for FakeSource {
    fn unit_count(&self) -> usize {
        self.units.len()
    }

    fn native_text(&self, unit: usize) -> Result<String, ExtractionError> {
        if self.failing_native == Some(unit) {
            return Err(ExtractionError::Unreadable(format!("unit {} is damaged", unit)));
        }
        Ok(self.units[unit].clone().unwrap_or_default())
    }
}

impl ImageRenderableSource for FakeSource {
    fn render_unit(&self, unit: usize, _dpi: u32) -> Result<Vec<u8>, OcrError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.failing_render == Some(unit) {
            return Err(OcrError::Render {
                page: unit as u32,
                reason: "renderer crashed".to_string(),
            });
        }
        Ok(format!("page-{}", unit).into_bytes())
    }
}

enum Reply {
    Echo,
    Fixed(String),
    Fail(SummarizeError),
    Panic,
}

/// Summarizer that records every input it is given.
pub struct FakeSummarizer {
    reply: Reply,
    ceiling: usize,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            ceiling: 10_000,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Returns the input unchanged.
    pub fn echo() -> Self {
        Self::with_reply(Reply::Echo)
    }

    pub fn fixed(summary: &str) -> Self {
        Self::with_reply(Reply::Fixed(summary.to_string()))
    }

    pub fn failing(err: SummarizeError) -> Self {
        Self::with_reply(Reply::Fail(err))
    }

    pub fn panicking() -> Self {
        Self::with_reply(Reply::Panic)
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

impl SummarizationEngine for FakeSummarizer {
    fn name(&self) -> &str {
        "fake"
    }

    fn input_ceiling(&self) -> usize {
        self.ceiling
    }

    fn summarize(&self, text: &str, _constraints: LengthConstraints) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        match &self.reply {
            Reply::Echo => Ok(text.to_string()),
            Reply::Fixed(summary) => Ok(summary.clone()),
            Reply::Fail(err) => Err(err.clone()),
            Reply::Panic => panic!("summarizer exploded"),
        }
    }
}

/// Builds a PDF with one page per entry. `Some(text)` pages carry that text
/// in a Courier text object; `None` pages have an empty content stream.
pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let content = match page {
            Some(text) => format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text),
            None => String::new(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Everything a worker needs, wired over an in-memory database and a temp
/// documents directory.
pub struct WorkerFixture {
    pub dir: TempDir,
    pub db: Database,
    pub store: JobStore,
    pub queue: Arc<SqliteQueue>,
    pub storage: DocumentStorage,
    pub ocr: Arc<FakeOcr>,
    pub summarizer: Arc<FakeSummarizer>,
}

impl WorkerFixture {
    pub fn new(summarizer: FakeSummarizer, visibility: Duration) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::new(db.clone());
        let queue = Arc::new(SqliteQueue::new(
            db.clone(),
            visibility,
            Duration::from_millis(10),
        ));
        let storage = DocumentStorage::new(dir.path());

        Self {
            dir,
            db,
            store,
            queue,
            storage,
            ocr: Arc::new(FakeOcr::returning("")),
            summarizer: Arc::new(summarizer),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(self.summarizer.clone())
    }

    pub fn pipeline_with(&self, summarizer: Arc<dyn SummarizationEngine>) -> Pipeline {
        let mut config = Config::default();
        config.documents_directory = self.dir.path().to_path_buf();
        let config = Arc::new(PipelineConfig::from_config(&config));
        let extractor = TextExtractor::new(self.ocr.clone(), Arc::new(FakeRenderer::default()), 300);
        Pipeline::new(config, self.storage.clone(), extractor, summarizer)
    }

    pub fn worker(&self, id: usize) -> JobWorker {
        JobWorker::new(id, self.store.clone(), self.queue.clone(), self.pipeline())
    }

    /// Stores the document, creates the pending job, and enqueues it.
    pub fn submit_text(&self, owner: &str, text: &str) -> String {
        let id = Job::new_id();
        let kind = DocumentKind::Text;
        let input_ref = self.storage.put(&id, kind, text.as_bytes()).unwrap();
        let job = Job::new(id.clone(), owner.to_string(), input_ref, kind);
        self.store.create(&job).unwrap();
        self.queue.enqueue(&id).unwrap();
        id
    }

    pub fn job(&self, id: &str) -> Job {
        self.store.get(id).unwrap().unwrap()
    }
}

//! End-to-end outline pipeline.
//!
//! Router → extractor → classifier → title selector → assembler. One
//! document runs sequentially; batches fan out across documents with rayon,
//! each document owning its own profile and features.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{DocumentFontProfile, TitleSelector};
use crate::assemble::OutlineAssembler;
use crate::classify::{ClassifyContext, FontRankClassifier, HeadingClassifier, LearnedClassifier, Strategy};
use crate::error::{Error, Result, Stage};
use crate::extract::{
    DocumentRouter, ExtractedDocument, ExtractionSource, LopdfSource, NativeExtractor, OcrEngine,
    OcrExtractor, OcrOptions, PageSource, RouteReport, RouterConfig,
};
use crate::ml::{ArtifactStore, TrainedModelArtifact};
use crate::model::{AlignmentRule, OutlineDocument};

/// Options for the outline pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Which heading classifier to run
    pub strategy: Strategy,
    /// Pages past this limit are not read
    pub max_pages: u32,
    pub router: RouterConfig,
    /// Alignment rule for text-native fragments
    pub alignment: AlignmentRule,
    pub ocr: OcrOptions,
    /// Process batches in parallel
    pub parallel: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Heuristic,
            max_pages: 50,
            router: RouterConfig::default(),
            alignment: AlignmentRule::default(),
            ocr: OcrOptions::default(),
            parallel: true,
        }
    }
}

impl PipelineOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classifier strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use the learned classifier.
    pub fn learned(mut self) -> Self {
        self.strategy = Strategy::Learned;
        self
    }

    /// Set the page limit.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the router configuration.
    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Set the native alignment rule.
    pub fn with_alignment(mut self, alignment: AlignmentRule) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set OCR options.
    pub fn with_ocr(mut self, ocr: OcrOptions) -> Self {
        self.ocr = ocr;
        self
    }

    /// Enable or disable parallel batch processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Process batches one document at a time.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Per-document outcome of a batch run.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: Result<OutlineDocument>,
}

/// Runs documents through routing, extraction, classification, and assembly.
#[derive(Clone, Default)]
pub struct OutlinePipeline {
    options: PipelineOptions,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
    store: Option<ArtifactStore>,
    pinned: Option<Arc<TrainedModelArtifact>>,
}

impl std::fmt::Debug for OutlinePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlinePipeline")
            .field("options", &self.options)
            .field("ocr_engine", &self.ocr_engine.is_some())
            .field("store", &self.store)
            .field("pinned", &self.pinned.as_ref().map(|a| a.version.clone()))
            .finish()
    }
}

impl OutlinePipeline {
    /// Create a pipeline.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Attach an OCR engine for image-only documents.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    /// Resolve the learned model from an artifact store on every call.
    pub fn with_artifact_store(mut self, store: ArtifactStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use one fixed model snapshot instead of the store's current one.
    pub fn with_artifact(mut self, artifact: Arc<TrainedModelArtifact>) -> Self {
        self.pinned = Some(artifact);
        self
    }

    /// Pipeline options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Bind the configured classifier. The learned strategy resolves its
    /// snapshot here, once.
    pub fn bind_classifier(&self) -> Result<Box<dyn HeadingClassifier>> {
        match self.options.strategy {
            Strategy::Heuristic => Ok(Box::new(FontRankClassifier::new())),
            Strategy::Learned => {
                let artifact = match (&self.pinned, &self.store) {
                    (Some(artifact), _) => Arc::clone(artifact),
                    (None, Some(store)) => store.load_current().map_err(|e| e.at(Stage::ArtifactLoad))?,
                    (None, None) => {
                        return Err(Error::Artifact("no trained model configured".to_string())
                            .at(Stage::ArtifactLoad))
                    }
                };
                Ok(Box::new(LearnedClassifier::new(artifact)))
            }
        }
    }

    /// Sample a document's leading pages and report the routing decision.
    pub fn route(&self, source: &dyn PageSource) -> Result<RouteReport> {
        DocumentRouter::new(self.options.router.clone())
            .route(source)
            .map_err(|e| e.at(Stage::Route))
    }

    /// Route a document and run the matching extractor.
    ///
    /// `path` is handed to the OCR engine when the document is image-only.
    pub fn extract_source(&self, source: &dyn PageSource, path: &Path) -> Result<ExtractedDocument> {
        let name = document_name(path);
        let report = self.route(source)?;

        let doc = match report.decision {
            ExtractionSource::Native => NativeExtractor::new(self.options.alignment, self.options.max_pages)
                .extract(source, &name)
                .map_err(|e| e.at(Stage::NativeExtract))?,
            ExtractionSource::Ocr => {
                let engine = self
                    .ocr_engine
                    .as_deref()
                    .ok_or_else(|| Error::OcrUnavailable.at(Stage::OcrExtract))?;
                let mut doc = OcrExtractor::new(self.options.ocr.clone())
                    .extract(engine, path, &name, self.options.max_pages)
                    .map_err(|e| e.at(Stage::OcrExtract))?;
                doc.page_count = doc.page_count.max(source.page_count().min(self.options.max_pages));
                doc
            }
        };

        if doc.is_empty() {
            return Err(Error::EmptyDocument(name));
        }
        log::info!(
            "{}: {} fragment(s) from {} page(s) via {:?}",
            name,
            doc.text_blocks.len(),
            doc.page_count,
            doc.source
        );
        Ok(doc)
    }

    /// Open and extract a document from disk.
    pub fn extract_path(&self, path: &Path) -> Result<ExtractedDocument> {
        let source = LopdfSource::open(path).map_err(|e| e.at(Stage::Open))?;
        self.extract_source(&source, path)
    }

    /// Build the outline of already-extracted fragments.
    pub fn process_document(
        &self,
        doc: &ExtractedDocument,
        classifier: &dyn HeadingClassifier,
    ) -> Result<OutlineDocument> {
        if doc.is_empty() {
            return Err(Error::EmptyDocument(doc.pdf_name.clone()));
        }
        let fragments = &doc.text_blocks;

        let title = TitleSelector::default().select(fragments);
        let profile = DocumentFontProfile::from_fragments(fragments);
        if profile.is_none() {
            log::debug!("{}: every fragment is noise", doc.pdf_name);
        }
        let context = ClassifyContext::new(&title, profile.as_ref());

        let labeled = classifier
            .classify(fragments, &context)
            .map_err(|e| e.at(Stage::Classify))?;
        log::debug!(
            "{}: {} classifier found {} heading(s)",
            doc.pdf_name,
            classifier.name(),
            labeled.len()
        );

        Ok(OutlineAssembler::new(self.options.max_pages).assemble(
            &title,
            &labeled,
            fragments,
            doc.page_count,
        ))
    }

    /// Extract and outline one in-memory document.
    pub fn process_source(&self, source: &dyn PageSource, path: &Path) -> Result<OutlineDocument> {
        let classifier = self.bind_classifier()?;
        let doc = self.extract_source(source, path)?;
        self.process_document(&doc, classifier.as_ref())
    }

    /// Extract and outline one file.
    pub fn process_path(&self, path: &Path) -> Result<OutlineDocument> {
        let classifier = self.bind_classifier()?;
        self.process_path_with(path, classifier.as_ref())
    }

    fn process_path_with(&self, path: &Path, classifier: &dyn HeadingClassifier) -> Result<OutlineDocument> {
        let doc = self.extract_path(path)?;
        self.process_document(&doc, classifier)
    }

    /// Outline many files. One classifier (and model snapshot) is bound for
    /// the whole batch; per-document failures are reported per item.
    pub fn process_batch(&self, paths: &[PathBuf]) -> Result<Vec<BatchItem>> {
        let classifier = self.bind_classifier()?;
        let classifier = classifier.as_ref();

        let run = |path: &PathBuf| BatchItem {
            path: path.clone(),
            result: self.process_path_with(path, classifier),
        };
        let items: Vec<BatchItem> = if self.options.parallel {
            paths.par_iter().map(run).collect()
        } else {
            paths.iter().map(run).collect()
        };

        let failed = items.iter().filter(|i| i.result.is_err()).count();
        log::info!("batch: {} document(s), {} failed", items.len(), failed);
        Ok(items)
    }
}

/// Document identity used to key tables: the file name of the path.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

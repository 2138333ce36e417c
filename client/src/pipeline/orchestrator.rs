//! Sequences the four stages of a run and reports the outcome to the UI

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::annotation::{AnnotationSet, ResponseParser};
use crate::config::Config;
use crate::render::{Annotator, RenderError, RenderedImage};
use crate::source::{ContentResolver, ImageReference, SourceResolver};
use crate::upload::{UploadClient, UploadError};

use super::error::{StageError, StageFailure};
use super::state::PipelineState;
use super::ui::{BusyGuard, UiEvent, UiHandle};

/// Outcome of one run: the annotated image or the stage that failed
pub type PipelineResult = Result<RenderedImage, StageError>;

/// Drives Resolve → Upload → Parse → Render for one image at a time
///
/// `run` takes `&mut self`, so a second run cannot start until the first
/// has delivered its outcome.
pub struct Orchestrator {
    resolver: SourceResolver,
    uploader: UploadClient,
    parser: ResponseParser,
    annotator: Annotator,
    ui: UiHandle,
    state: watch::Sender<PipelineState>,
    last_outcome: Option<PipelineState>,
    last_annotations: Option<AnnotationSet>,
}

impl Orchestrator {
    pub fn new(config: &Config, ui: UiHandle) -> Result<Self, UploadError> {
        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            resolver: SourceResolver::new(&config.source),
            uploader: UploadClient::new(&config.upload)?,
            parser: ResponseParser::new(),
            annotator: Annotator::new(),
            ui,
            state,
            last_outcome: None,
            last_annotations: None,
        })
    }

    /// Register a content resolver for `scheme://` references
    pub fn with_resolver(
        mut self,
        scheme: impl Into<String>,
        resolver: Arc<dyn ContentResolver>,
    ) -> Self {
        self.resolver = self.resolver.with_resolver(scheme, resolver);
        self
    }

    /// Watch state transitions as they happen
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Terminal state of the most recent run, if any run has finished
    pub fn last_outcome(&self) -> Option<PipelineState> {
        self.last_outcome
    }

    /// Annotations drawn by the most recent successful run
    pub fn last_annotations(&self) -> Option<&AnnotationSet> {
        self.last_annotations.as_ref()
    }

    /// Run the pipeline for one image reference
    ///
    /// The UI sees `Busy(true)` and disabled controls first, then exactly one
    /// of `DisplayImage` or `DisplayError` after the busy indicator is
    /// cleared, then re-enabled controls. Any temporary copy made during
    /// resolution is removed before this returns.
    pub async fn run(&mut self, reference: ImageReference) -> PipelineResult {
        self.last_annotations = None;
        let guard = BusyGuard::engage(&self.ui);
        let reset = IdleOnDrop(&self.state);
        let start = Instant::now();
        info!("Pipeline run started for {}", reference);

        let outcome = self.execute(&reference).await;
        let (result, annotations) = match outcome {
            Ok((image, annotations)) => (Ok(image), Some(annotations)),
            Err(error) => (Err(error), None),
        };

        match &result {
            Ok(image) => {
                self.state.send_replace(PipelineState::Displaying);
                info!(
                    "Pipeline run finished in {:?}: {}x{} image",
                    start.elapsed(),
                    image.width(),
                    image.height()
                );
                counter!("starmark_pipeline_runs_total", "outcome" => "success").increment(1);
                guard.finish(UiEvent::DisplayImage(image.clone()));
            }
            Err(error) => {
                self.state.send_replace(PipelineState::Failed(error.stage));
                warn!("Pipeline run failed after {:?}: {}", start.elapsed(), error);
                counter!("starmark_pipeline_runs_total", "outcome" => "failure").increment(1);
                counter!("starmark_stage_failures_total", "stage" => error.stage.as_str())
                    .increment(1);
                guard.finish(UiEvent::DisplayError(error.user_message()));
            }
        }

        let terminal = self.state();
        drop(reset);
        self.last_outcome = Some(terminal);
        self.last_annotations = annotations;
        result
    }

    async fn execute(
        &self,
        reference: &ImageReference,
    ) -> Result<(RenderedImage, AnnotationSet), StageError> {
        let file = self.stage(self.resolver.resolve(reference)).await?;
        let body = self.stage(self.uploader.upload(&file)).await?;
        let annotations = self.stage(async { self.parser.parse(&body) }).await?;
        debug!("Service returned {} annotations", annotations.len());

        // Decoding and drawing are CPU-bound; the temp copy is dropped with the closure
        let annotator = self.annotator;
        let drawn = annotations.clone();
        let image = self
            .stage(async move {
                match tokio::task::spawn_blocking(move || annotator.render(&file, &drawn)).await {
                    Ok(rendered) => rendered,
                    Err(join) => Err(RenderError::Worker(join)),
                }
            })
            .await?;

        Ok((image, annotations))
    }

    /// Publish the stage's running state, then time and tag its work
    async fn stage<T, E, F>(&self, work: F) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, E>>,
        E: StageFailure,
    {
        self.state.send_replace(PipelineState::running(E::STAGE));
        debug!("Entering {} stage", E::STAGE);
        let start = Instant::now();

        let result = work.await;
        histogram!("starmark_stage_duration_seconds", "stage" => E::STAGE.as_str())
            .record(start.elapsed());

        result.map_err(StageError::from)
    }
}

/// Returns the published state to `Idle` however the run ends
struct IdleOnDrop<'a>(&'a watch::Sender<PipelineState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(PipelineState::Idle);
    }
}

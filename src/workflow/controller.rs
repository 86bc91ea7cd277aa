//! Async controller driving the generate/edit workflow.

use crate::client::{CreateImageRequest, EditImageRequest, ImageService};
use crate::error::{GenEditError, Operation, Result};
use crate::image::{EncodedImage, ImageCodec, ImageFile, ImageSize};
use crate::workflow::state::{Event, UploadPlan, WorkflowState};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// File name given to encoded images materialized for upload.
pub const PLACEHOLDER_FILE_NAME: &str = "generated.png";

/// Owns the workflow state and runs operations against an [`ImageService`].
///
/// The state lock is only held for transitions, never across I/O, so a
/// generation and an edit may be in flight at the same time. A second
/// submission of an operation that is already pending is rejected with
/// [`GenEditError::Busy`] and leaves the state untouched.
pub struct Workflow<S> {
    service: S,
    codec: ImageCodec,
    state: Mutex<WorkflowState>,
}

impl<S: ImageService> Workflow<S> {
    /// Creates a controller with a fresh session state.
    pub fn new(service: S) -> Self {
        Self {
            service,
            codec: ImageCodec::default(),
            state: Mutex::new(WorkflowState::default()),
        }
    }

    /// Uses `codec` to materialize encoded images for editing.
    pub fn with_codec(mut self, codec: ImageCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns the codec used to materialize encoded images.
    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.lock().clone()
    }

    /// Sets the generation prompt.
    pub fn set_generation_prompt(&self, prompt: impl Into<String>) {
        self.dispatch(Event::GenerationPromptChanged(prompt.into()));
    }

    /// Sets the edit prompt.
    pub fn set_edit_prompt(&self, prompt: impl Into<String>) {
        self.dispatch(Event::EditPromptChanged(prompt.into()));
    }

    /// Selects the output size for future generations.
    pub fn select_size(&self, size: ImageSize) {
        self.dispatch(Event::SizeSelected(size));
    }

    /// Makes a local file the edit source, replacing any previous source.
    pub fn select_local_file(&self, file: ImageFile) {
        tracing::debug!(file_name = %file.name, bytes = file.size(), "selected local file");
        self.dispatch(Event::LocalFileSelected(file));
    }

    /// Makes the generated image the edit source.
    ///
    /// Returns `false` and changes nothing if no image has been generated.
    pub fn use_generated_as_source(&self) -> bool {
        let mut state = self.lock();
        if !state.can_use_generated() {
            return false;
        }
        *state = std::mem::take(&mut *state).apply(Event::UseGenerated);
        true
    }

    /// Makes the last edited image the edit source, for chained refinements.
    ///
    /// Returns `false` and changes nothing if no edit has succeeded.
    pub fn use_edited_as_source(&self) -> bool {
        let mut state = self.lock();
        if !state.can_use_edited() {
            return false;
        }
        *state = std::mem::take(&mut *state).apply(Event::UseEdited);
        true
    }

    /// Sets the prompt and size, then runs [`Self::submit_generation`].
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        size: ImageSize,
    ) -> Result<EncodedImage> {
        self.set_generation_prompt(prompt);
        self.select_size(size);
        self.submit_generation().await
    }

    /// Creates an image from the current generation prompt and size.
    ///
    /// On success the image becomes both the generated image and the edit
    /// source. Failures are recorded in the state and also returned.
    pub async fn submit_generation(&self) -> Result<EncodedImage> {
        let request = {
            let mut state = self.lock();
            if state.is_generating() {
                return Err(GenEditError::Busy(Operation::Generate));
            }
            *state = std::mem::take(&mut *state).apply(Event::GenerationStarted);
            CreateImageRequest::new(state.generation_prompt.clone()).with_size(state.size)
        };
        let task = PendingTask::new(&self.state, Operation::Generate);

        let result = self.service.create_image(&request).await;
        match &result {
            Ok(image) => {
                tracing::info!(size = %request.size, "image generated");
                task.finish(Event::GenerationSucceeded(image.clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "image generation failed");
                task.finish(Event::GenerationFailed(e.to_string()));
            }
        }
        result
    }

    /// Sets the edit prompt, then runs [`Self::submit_edit`].
    pub async fn edit(&self, prompt: impl Into<String>) -> Result<EncodedImage> {
        self.set_edit_prompt(prompt);
        self.submit_edit().await
    }

    /// Edits the current source image with the current edit prompt.
    ///
    /// The source must resolve to a file before the prompt is checked; both
    /// checks happen before anything is sent to the service.
    pub async fn submit_edit(&self) -> Result<EncodedImage> {
        let (prompt, plan) = {
            let mut state = self.lock();
            if state.is_editing() {
                return Err(GenEditError::Busy(Operation::Edit));
            }
            *state = std::mem::take(&mut *state).apply(Event::EditStarted);
            (state.edit_prompt.clone(), state.upload_plan())
        };
        let task = PendingTask::new(&self.state, Operation::Edit);

        let result = self.run_edit(prompt, plan).await;
        match &result {
            Ok(image) => {
                tracing::info!("image edited");
                task.finish(Event::EditSucceeded(image.clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = ?e.kind(), "image edit failed");
                task.finish(Event::EditFailed(e.to_string()));
            }
        }
        result
    }

    async fn run_edit(&self, prompt: String, plan: UploadPlan) -> Result<EncodedImage> {
        let image = match plan {
            UploadPlan::Ready(file) => file,
            UploadPlan::Decode(encoded) => {
                self.codec.to_file(&encoded, PLACEHOLDER_FILE_NAME).await?
            }
            UploadPlan::Missing => return Err(GenEditError::MissingSourceImage),
        };

        if prompt.trim().is_empty() {
            return Err(GenEditError::EmptyEditPrompt);
        }

        self.service
            .edit_image(&EditImageRequest::new(prompt, image))
            .await
    }

    fn dispatch(&self, event: Event) {
        transition(&self.state, event);
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<WorkflowState>) -> MutexGuard<'_, WorkflowState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition(state: &Mutex<WorkflowState>, event: Event) {
    let mut guard = lock(state);
    *guard = std::mem::take(&mut *guard).apply(event);
}

/// Releases an operation's pending status on every exit path.
///
/// If the operation future is dropped before completing, the task is marked
/// failed so the busy flag cannot stick.
struct PendingTask<'a> {
    state: &'a Mutex<WorkflowState>,
    operation: Operation,
    finished: bool,
}

impl<'a> PendingTask<'a> {
    fn new(state: &'a Mutex<WorkflowState>, operation: Operation) -> Self {
        Self {
            state,
            operation,
            finished: false,
        }
    }

    fn finish(mut self, event: Event) {
        self.finished = true;
        transition(self.state, event);
    }
}

impl Drop for PendingTask<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let message = format!("{} was interrupted", self.operation);
        let event = match self.operation {
            Operation::Generate => Event::GenerationFailed(message),
            Operation::Edit => Event::EditFailed(message),
        };
        transition(self.state, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::TaskStatus;
    use crate::ImageSource;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;

    const GENERATED: &str = "data:image/png;base64,iVBORw0KGgoAAAAA";
    const EDITED: &str = "data:image/png;base64,iVBORw0KGgoBBBBB";

    #[derive(Clone)]
    enum Reply {
        Image(&'static str),
        Fail(u16, &'static str),
    }

    impl Reply {
        fn into_result(self) -> Result<EncodedImage> {
            match self {
                Reply::Image(image) => Ok(EncodedImage::new(image)),
                Reply::Fail(status, message) => Err(GenEditError::Service {
                    status,
                    message: message.into(),
                }),
            }
        }
    }

    struct FakeService {
        create_reply: Reply,
        edit_reply: Reply,
        create_gate: Option<Arc<Notify>>,
        creates: Mutex<Vec<CreateImageRequest>>,
        edits: Mutex<Vec<EditImageRequest>>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                create_reply: Reply::Image(GENERATED),
                edit_reply: Reply::Image(EDITED),
                create_gate: None,
                creates: Mutex::new(Vec::new()),
                edits: Mutex::new(Vec::new()),
            }
        }

        fn create_count(&self) -> usize {
            self.creates.lock().unwrap().len()
        }

        fn edit_count(&self) -> usize {
            self.edits.lock().unwrap().len()
        }

        fn last_edit(&self) -> EditImageRequest {
            self.edits.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ImageService for FakeService {
        async fn create_image(&self, request: &CreateImageRequest) -> Result<EncodedImage> {
            self.creates.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.create_gate {
                gate.notified().await;
            }
            self.create_reply.clone().into_result()
        }

        async fn edit_image(&self, request: &EditImageRequest) -> Result<EncodedImage> {
            self.edits.lock().unwrap().push(request.clone());
            self.edit_reply.clone().into_result()
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn local_file() -> ImageFile {
        ImageFile::new("photo.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[tokio::test]
    async fn test_generate_then_edit_scenario() {
        let workflow = Workflow::new(FakeService::new());

        let image = workflow
            .generate("a cozy cabin in the mountains during sunset", ImageSize::Square)
            .await
            .unwrap();
        assert_eq!(image.as_str(), GENERATED);

        let state = workflow.state();
        assert_eq!(state.generated_image, Some(EncodedImage::new(GENERATED)));
        assert_eq!(
            state.source_image,
            Some(ImageSource::Encoded(EncodedImage::new(GENERATED)))
        );
        let sent = workflow.service().creates.lock().unwrap()[0].clone();
        assert_eq!(sent.prompt, "a cozy cabin in the mountains during sunset");
        assert_eq!(sent.size, ImageSize::Square);

        let edited = workflow.edit("add a light snowfall").await.unwrap();
        assert_eq!(edited.as_str(), EDITED);

        let state = workflow.state();
        assert_eq!(state.edited_image, Some(EncodedImage::new(EDITED)));
        assert_eq!(state.generated_image, Some(EncodedImage::new(GENERATED)));
        assert_eq!(
            state.source_image,
            Some(ImageSource::Encoded(EncodedImage::new(GENERATED)))
        );
        assert!(state.error.is_none());
        assert!(!state.is_generating());
        assert!(!state.is_editing());
    }

    #[tokio::test]
    async fn test_codec_materializes_generated_image() {
        let workflow = Workflow::new(FakeService::new()).with_codec(ImageCodec::default());
        let file = workflow
            .codec()
            .to_file(&EncodedImage::new(GENERATED), PLACEHOLDER_FILE_NAME)
            .await
            .unwrap();
        assert_eq!(file.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_generated_source_goes_through_codec() {
        let workflow = Workflow::new(FakeService::new());
        workflow.generate("cabin", ImageSize::Landscape).await.unwrap();
        workflow.edit("add snow").await.unwrap();

        let sent = workflow.service().last_edit();
        assert_eq!(sent.prompt, "add snow");
        assert_eq!(sent.image.name, PLACEHOLDER_FILE_NAME);
        assert_eq!(sent.image.mime_type, "image/png");
        assert_eq!(&sent.image.data[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn test_undeclared_mime_defaults_to_png() {
        let mut service = FakeService::new();
        service.create_reply = Reply::Image("data:;base64,aGVsbG8=");
        let workflow = Workflow::new(service);

        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.edit("add snow").await.unwrap();

        let sent = workflow.service().last_edit();
        assert_eq!(sent.image.mime_type, "image/png");
        assert_eq!(sent.image.data, b"hello");
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces_detail() {
        let mut service = FakeService::new();
        service.create_reply = Reply::Fail(429, "rate limited");
        let workflow = Workflow::new(service);

        let err = workflow.generate("cabin", ImageSize::Square).await.unwrap_err();
        assert!(matches!(err, GenEditError::Service { status: 429, .. }));

        let state = workflow.state();
        assert_eq!(state.error.as_deref(), Some("rate limited"));
        assert!(state.generated_image.is_none());
        assert!(!state.is_generating());
        assert_eq!(state.generation, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_generation_success_clears_local_file() {
        let workflow = Workflow::new(FakeService::new());
        workflow.select_local_file(local_file());

        workflow.generate("cabin", ImageSize::Square).await.unwrap();

        let state = workflow.state();
        assert!(state.local_file().is_none());
        assert_eq!(
            state.source_image,
            state.generated_image.clone().map(ImageSource::Encoded)
        );
    }

    #[tokio::test]
    async fn test_empty_generation_prompt_is_sent() {
        let mut service = FakeService::new();
        service.create_reply = Reply::Fail(400, "Prompt is required to generate an image");
        let workflow = Workflow::new(service);

        workflow.generate("", ImageSize::Square).await.unwrap_err();
        assert_eq!(workflow.service().create_count(), 1);
        assert_eq!(
            workflow.state().error.as_deref(),
            Some("Prompt is required to generate an image")
        );
    }

    #[tokio::test]
    async fn test_use_generated_without_generation_is_noop() {
        let workflow = Workflow::new(FakeService::new());
        workflow.select_local_file(local_file());
        let before = workflow.state();

        assert!(!workflow.use_generated_as_source());
        assert_eq!(workflow.state(), before);
    }

    #[tokio::test]
    async fn test_use_generated_drops_local_file() {
        let workflow = Workflow::new(FakeService::new());
        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.select_local_file(local_file());

        assert!(workflow.use_generated_as_source());
        workflow.edit("add snow").await.unwrap();

        assert_eq!(workflow.service().last_edit().image.name, PLACEHOLDER_FILE_NAME);
    }

    #[tokio::test]
    async fn test_local_file_is_uploaded_as_is() {
        let workflow = Workflow::new(FakeService::new());
        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.select_local_file(local_file());

        workflow.edit("make it brighter").await.unwrap();

        assert_eq!(workflow.service().last_edit().image, local_file());
    }

    #[tokio::test]
    async fn test_blank_edit_prompt_is_rejected_locally() {
        let workflow = Workflow::new(FakeService::new());
        workflow.select_local_file(local_file());

        for prompt in ["", "   \n\t"] {
            let err = workflow.edit(prompt).await.unwrap_err();
            assert!(matches!(err, GenEditError::EmptyEditPrompt));
        }

        let state = workflow.state();
        assert_eq!(state.error.as_deref(), Some("Please provide an edit prompt"));
        assert_eq!(state.local_file(), Some(&local_file()));
        assert!(!state.is_editing());
        assert_eq!(workflow.service().edit_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_without_source_is_rejected_locally() {
        let workflow = Workflow::new(FakeService::new());

        let err = workflow.edit("add snow").await.unwrap_err();
        assert!(matches!(err, GenEditError::MissingSourceImage));

        let state = workflow.state();
        assert_eq!(
            state.error.as_deref(),
            Some("Please upload or generate an image to edit")
        );
        assert!(!state.is_editing());
        assert_eq!(workflow.service().edit_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_reported_before_empty_prompt() {
        let workflow = Workflow::new(FakeService::new());
        let err = workflow.edit("").await.unwrap_err();
        assert!(matches!(err, GenEditError::MissingSourceImage));
    }

    #[tokio::test]
    async fn test_undecodable_source_is_rejected_locally() {
        let mut service = FakeService::new();
        service.create_reply = Reply::Image("data:image/png;base64,@@@");
        let workflow = Workflow::new(service);

        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        let err = workflow.edit("add snow").await.unwrap_err();

        assert!(matches!(err, GenEditError::Decode(_)));
        assert!(workflow.state().error.is_some());
        assert!(!workflow.state().is_editing());
        assert_eq!(workflow.service().edit_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_failure_overwrites_error_and_keeps_source() {
        let mut service = FakeService::new();
        service.edit_reply = Reply::Fail(500, "Failed to edit image");
        let workflow = Workflow::new(service);

        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.edit("add snow").await.unwrap_err();

        let state = workflow.state();
        assert_eq!(state.error.as_deref(), Some("Failed to edit image"));
        assert!(state.edited_image.is_none());
        assert!(state.generated_image.is_some());
        assert!(!state.is_editing());
    }

    #[tokio::test]
    async fn test_new_operation_clears_previous_error() {
        let mut service = FakeService::new();
        service.edit_reply = Reply::Fail(500, "boom");
        let workflow = Workflow::new(service);

        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.edit("add snow").await.unwrap_err();
        assert!(workflow.state().error.is_some());

        workflow.generate("cabin again", ImageSize::Portrait).await.unwrap();
        assert!(workflow.state().error.is_none());
    }

    #[tokio::test]
    async fn test_chained_edit_uses_edited_image() {
        let workflow = Workflow::new(FakeService::new());
        assert!(!workflow.use_edited_as_source());

        workflow.generate("cabin", ImageSize::Square).await.unwrap();
        workflow.edit("add snow").await.unwrap();
        assert!(workflow.use_edited_as_source());

        assert_eq!(
            workflow.state().source_image,
            Some(ImageSource::Encoded(EncodedImage::new(EDITED)))
        );
        workflow.edit("add smoke from the chimney").await.unwrap();
        assert_eq!(workflow.service().edit_count(), 2);
    }

    #[tokio::test]
    async fn test_generation_and_edit_may_overlap() {
        let gate = Arc::new(Notify::new());
        let mut service = FakeService::new();
        service.create_gate = Some(gate.clone());
        let workflow = Workflow::new(service);
        workflow.select_local_file(local_file());

        let generation = workflow.generate("cabin", ImageSize::Square);
        let edit = async {
            assert!(workflow.state().is_generating());
            let busy = workflow.submit_generation().await.unwrap_err();
            assert!(matches!(busy, GenEditError::Busy(Operation::Generate)));

            let edited = workflow.edit("add snow").await;
            assert!(workflow.state().is_generating());
            gate.notify_one();
            edited
        };

        let (generated, edited) = tokio::join!(generation, edit);
        assert!(generated.is_ok());
        assert!(edited.is_ok());
        assert_eq!(workflow.service().create_count(), 1);

        let state = workflow.state();
        assert!(!state.is_generating());
        assert!(!state.is_editing());
        assert_eq!(state.edited_image, Some(EncodedImage::new(EDITED)));
        assert_eq!(
            state.source_image,
            Some(ImageSource::Encoded(EncodedImage::new(GENERATED)))
        );
    }

    #[tokio::test]
    async fn test_dropped_operation_releases_busy_flag() {
        let mut service = FakeService::new();
        service.create_gate = Some(Arc::new(Notify::new()));
        let workflow = Workflow::new(service);

        {
            let generation = workflow.generate("cabin", ImageSize::Square);
            let timed_out =
                tokio::time::timeout(std::time::Duration::from_millis(10), generation).await;
            assert!(timed_out.is_err());
        }

        let state = workflow.state();
        assert!(!state.is_generating());
        assert_eq!(state.error.as_deref(), Some("generation was interrupted"));
    }
}

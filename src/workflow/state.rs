//! Workflow state and its pure transitions.

use crate::image::{EncodedImage, ImageFile, ImageSize, ImageSource};

/// Lifecycle of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    /// Never started.
    #[default]
    Idle,
    /// Request in flight.
    Pending,
    /// Last run produced an image.
    Succeeded,
    /// Last run failed; the message is in [`WorkflowState::error`].
    Failed,
}

impl TaskStatus {
    /// Returns true while the task is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    /// Prompt for the create-image request.
    pub generation_prompt: String,
    /// Prompt for the edit-image request.
    pub edit_prompt: String,
    /// Selected output size.
    pub size: ImageSize,
    /// Result of the last successful generation.
    pub generated_image: Option<EncodedImage>,
    /// Image the next edit will be applied to.
    pub source_image: Option<ImageSource>,
    /// Result of the last successful edit.
    pub edited_image: Option<EncodedImage>,
    /// Most recent failure of either operation.
    pub error: Option<String>,
    /// Generation task status.
    pub generation: TaskStatus,
    /// Edit task status.
    pub edit: TaskStatus,
}

/// Inputs that move the workflow from one state to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The generation prompt text changed.
    GenerationPromptChanged(String),
    /// The edit prompt text changed.
    EditPromptChanged(String),
    /// A size option was selected.
    SizeSelected(ImageSize),
    /// A generation request is about to be sent.
    GenerationStarted,
    /// The generation request returned an image.
    GenerationSucceeded(EncodedImage),
    /// The generation request failed.
    GenerationFailed(String),
    /// The user picked a local file as edit source.
    LocalFileSelected(ImageFile),
    /// The user chose the generated image as edit source.
    UseGenerated,
    /// The user chose the edited image as edit source.
    UseEdited,
    /// An edit is about to be resolved and sent.
    EditStarted,
    /// The edit request returned an image.
    EditSucceeded(EncodedImage),
    /// The edit failed validation, decoding, or at the service.
    EditFailed(String),
}

/// How the next edit obtains its upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    /// A local file is uploaded as-is.
    Ready(ImageFile),
    /// The encoded image must go through the codec first.
    Decode(EncodedImage),
    /// Nothing to edit.
    Missing,
}

impl WorkflowState {
    /// Returns true while a generation request is in flight.
    pub fn is_generating(&self) -> bool {
        self.generation.is_pending()
    }

    /// Returns true while an edit is in flight.
    pub fn is_editing(&self) -> bool {
        self.edit.is_pending()
    }

    /// Returns true if "use generated image" would have an effect.
    pub fn can_use_generated(&self) -> bool {
        self.generated_image.is_some()
    }

    /// Returns true if "use edited image" would have an effect.
    pub fn can_use_edited(&self) -> bool {
        self.edited_image.is_some()
    }

    /// Returns the local file that will be uploaded as-is, if any.
    pub fn local_file(&self) -> Option<&ImageFile> {
        self.source_image.as_ref().and_then(ImageSource::local_file)
    }

    /// Resolves where the next edit's upload comes from.
    pub fn upload_plan(&self) -> UploadPlan {
        match &self.source_image {
            Some(ImageSource::Local(file)) => UploadPlan::Ready(file.clone()),
            Some(ImageSource::Encoded(image)) if !image.is_empty() => {
                UploadPlan::Decode(image.clone())
            }
            Some(ImageSource::Encoded(_)) | None => UploadPlan::Missing,
        }
    }

    /// Applies `event` and returns the next state.
    pub fn apply(mut self, event: Event) -> Self {
        match event {
            Event::GenerationPromptChanged(prompt) => self.generation_prompt = prompt,
            Event::EditPromptChanged(prompt) => self.edit_prompt = prompt,
            Event::SizeSelected(size) => self.size = size,
            Event::GenerationStarted => {
                self.generation = TaskStatus::Pending;
                self.error = None;
                self.generated_image = None;
            }
            Event::GenerationSucceeded(image) => {
                self.generation = TaskStatus::Succeeded;
                self.source_image = Some(ImageSource::Encoded(image.clone()));
                self.generated_image = Some(image);
            }
            Event::GenerationFailed(message) => {
                self.generation = TaskStatus::Failed;
                self.error = Some(message);
            }
            Event::LocalFileSelected(file) => {
                self.source_image = Some(ImageSource::Local(file));
            }
            Event::UseGenerated => {
                if let Some(image) = &self.generated_image {
                    self.source_image = Some(ImageSource::Encoded(image.clone()));
                }
            }
            Event::UseEdited => {
                if let Some(image) = &self.edited_image {
                    self.source_image = Some(ImageSource::Encoded(image.clone()));
                }
            }
            Event::EditStarted => {
                self.edit = TaskStatus::Pending;
                self.error = None;
                self.edited_image = None;
            }
            Event::EditSucceeded(image) => {
                self.edit = TaskStatus::Succeeded;
                self.edited_image = Some(image);
            }
            Event::EditFailed(message) => {
                self.edit = TaskStatus::Failed;
                self.error = Some(message);
            }
        }
        self
    }
}

use tracing::{debug, info};

use crate::{
    content::select_content_file,
    domain::{Credential, NotificationLevel, ReviewRequest},
    github::{Tracker, TrackerError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolMode {
    Review,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Describes the request currently loaded for review.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewSession {
    pub request_id: u64,
    pub title: String,
    pub html_url: String,
    pub file_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationInput {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

/// Editor-side hooks invoked while opening a request.
pub trait ReviewHost {
    fn open_file(&mut self, file: OpenedFile, force_extension: Option<&str>);
    fn set_tool_mode(&mut self, mode: ToolMode);
    fn set_review_session(&mut self, session: ReviewSession);
    fn push_notification(&mut self, input: NotificationInput);
}

#[derive(Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(ReviewSession),
    NoSupportedFile,
}

/// Loads the request's highest-priority lyric file into the editor and
/// switches it into review mode.
pub fn open_review_request<T, H>(
    tracker: &T,
    credential: &Credential,
    request: &ReviewRequest,
    host: &mut H,
) -> Result<OpenOutcome, TrackerError>
where
    T: Tracker + ?Sized,
    H: ReviewHost + ?Sized,
{
    let files = tracker.list_request_files(credential, request.id)?;
    debug!(request = request.id, files = files.len(), "listed changed files");

    let Some(file) = select_content_file(&files) else {
        host.push_notification(NotificationInput {
            level: NotificationLevel::Warning,
            title: format!("Review request #{} has no lyric file", request.id),
            description: "None of the changed files is in a supported lyric format.".to_owned(),
        });
        return Ok(OpenOutcome::NoSupportedFile);
    };

    let bytes = tracker.fetch_raw_content(credential, &file.raw_url)?;
    let extension = file.extension();
    host.open_file(
        OpenedFile {
            name: file.filename.clone(),
            bytes,
        },
        extension.as_deref(),
    );
    host.set_tool_mode(ToolMode::Review);

    let session = ReviewSession {
        request_id: request.id,
        title: request.title.clone(),
        html_url: request.html_url.clone(),
        file_name: file.filename.clone(),
    };
    host.set_review_session(session.clone());
    info!(request = request.id, file = %file.filename, "opened review request");

    Ok(OpenOutcome::Opened(session))
}

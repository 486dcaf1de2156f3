use thiserror::Error;

/// Failure of a single call to an external speech or language service.
///
/// The variant describes what went wrong on the wire; which pipeline stage
/// the failure belongs to is decided by the caller.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("{0} API key not configured")]
    MissingCredential(&'static str),

    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} returned empty result")]
    EmptyResult(&'static str),

    #[error("No audio URL in response")]
    MissingAudioUrl,

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("{service} did not finish within {secs} seconds")]
    Timeout { service: &'static str, secs: u64 },
}

impl VoiceError {
    /// Wraps a transport error. The request URL is stripped so nothing from
    /// it reaches logs or response bodies.
    pub(crate) fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Http {
            service,
            source: source.without_url(),
        }
    }
}

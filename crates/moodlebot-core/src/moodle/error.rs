//! Error type for Moodle web-service calls.
//!
//! Every failure a tool can hit funnels through [`MoodleError`]; tools
//! stringify it into their normal output instead of propagating, so the
//! agent always receives plain text it can relay to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoodleError {
    /// The admin token could not be obtained. Covers both bad credentials
    /// and an unreachable site — the token endpoint does not let us tell
    /// them apart.
    #[error("Token de Moodle (admin) no disponible. Detalle: {0}")]
    TokenUnavailable(String),

    /// Transport-level failure while calling a web-service function.
    #[error("Error en llamada a API Moodle ({function}): {source}")]
    Transport {
        function: String,
        #[source]
        source: reqwest::Error,
    },

    /// Moodle answered with an explicit exception payload.
    #[error("Moodle devolvió una excepción en '{function}' [{errorcode}]: {message}")]
    Ws {
        function: String,
        errorcode: String,
        message: String,
    },
}

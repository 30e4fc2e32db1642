//! Error types shared by the VGate crates.
//!
//! [`Denial`] is the request-scoped failure taxonomy: every way a single
//! request can be refused by the engine. [`LoadError`] covers failures found
//! while turning loaded configuration into a snapshot, before any request runs.

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Why a request was refused.
///
/// The variant identity is what tests and observability assert on; the status
/// code and message are only the default rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    /// The supplied or default version identifier has no matching entry.
    #[error("version `{name}` does not exist in specification `{spec_id}`")]
    VersionDoesNotExist { spec_id: String, name: String },

    /// Versioning is enabled, nothing was supplied and there is no default.
    #[error("specification `{spec_id}` requires a version and has no default")]
    VersionNotFound { spec_id: String },

    #[error("version `{name}` of specification `{spec_id}` expired at {expires_at}")]
    VersionExpired {
        spec_id: String,
        name: String,
        expires_at: String,
    },

    #[error("access to version `{name}` of specification `{spec_id}` is not granted")]
    AccessDisallowed { spec_id: String, name: String },

    /// Operator-facing: an override target inside a versioned specification.
    #[error("specification `{spec_id}` overrides the target host while versioning is enabled (version `{name}`)")]
    ConfigurationConflict { spec_id: String, name: String },

    /// No specification is mounted on the request path.
    #[error("no specification is mounted on `{path}`")]
    SpecificationNotFound { path: String },
}

impl Denial {
    /// Stable machine-readable code, one per variant.
    pub fn code(&self) -> &'static str {
        match self {
            Denial::VersionDoesNotExist { .. } => "VERSION_DOES_NOT_EXIST",
            Denial::VersionNotFound { .. } => "VERSION_NOT_FOUND",
            Denial::VersionExpired { .. } => "VERSION_EXPIRED",
            Denial::AccessDisallowed { .. } => "ACCESS_DISALLOWED",
            Denial::ConfigurationConflict { .. } => "CONFIGURATION_CONFLICT",
            Denial::SpecificationNotFound { .. } => "SPECIFICATION_NOT_FOUND",
        }
    }

    /// Message shown to callers. Carries no configuration detail.
    pub fn message(&self) -> &'static str {
        match self {
            Denial::VersionDoesNotExist { .. } => "This API version does not seem to exist",
            Denial::VersionNotFound { .. } => "Version information not found",
            Denial::VersionExpired { .. } => {
                "Api Version has expired, please check documentation or contact administrator"
            }
            Denial::AccessDisallowed { .. } => "Access to this API has been disallowed",
            Denial::ConfigurationConflict { .. } => "There was a problem proxying the request",
            Denial::SpecificationNotFound { .. } => "Specification not found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Denial::VersionDoesNotExist { .. }
            | Denial::VersionNotFound { .. }
            | Denial::VersionExpired { .. }
            | Denial::AccessDisallowed { .. } => StatusCode::FORBIDDEN,
            Denial::ConfigurationConflict { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Denial::SpecificationNotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// `false` for server-side misconfiguration, `true` for caller-caused refusals.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// Failure while building a snapshot from loaded configuration.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("specification id cannot be empty")]
    EmptySpecificationId,

    #[error("specification `{0}` is declared more than once")]
    DuplicateSpecification(String),

    #[error("specification `{spec_id}` version `{version}` links to unknown specification `{target}`")]
    UnknownLinkedSpecification {
        spec_id: String,
        version: String,
        target: String,
    },

    #[error("specification `{spec_id}` version `{version}` links to itself")]
    SelfLink { spec_id: String, version: String },

    #[error("specification `{spec_id}` version `{version}` links to `{target}`, which links further")]
    ChainedLink {
        spec_id: String,
        version: String,
        target: String,
    },

    #[error("specification `{spec_id}` version `{version}` has an invalid rewrite pattern `{pattern}`: {reason}")]
    InvalidRewritePattern {
        spec_id: String,
        version: String,
        pattern: String,
        reason: String,
    },

    #[error("specification `{spec_id}` version `{version}` has an invalid method `{method}`")]
    InvalidMethod {
        spec_id: String,
        version: String,
        method: String,
    },

    #[error("specification `{spec_id}` version `{version}` has an invalid status code {code}")]
    InvalidStatusCode {
        spec_id: String,
        version: String,
        code: u16,
    },

    #[error("specification `{spec_id}` version `{version}` has an invalid reply header `{header}`")]
    InvalidHeader {
        spec_id: String,
        version: String,
        header: String,
    },

    #[error("specification `{0}` is not versioned but declares several versions and no default")]
    AmbiguousImplicitVersion(String),

    #[error("specification `{spec_id}` cannot be mounted on `{listen_path}`: {reason}")]
    ListenPathConflict {
        spec_id: String,
        listen_path: String,
        reason: String,
    },
}

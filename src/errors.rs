//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Routec Error Module
//!
//! This module defines the error types used throughout Routec for consistent
//! error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Routec separates problems into two channels:
//!
//! - **Diagnostics**: syntax and resolution problems found while compiling a
//!   configuration. These never abort a compile; they accumulate in a
//!   [`Diagnostics`](crate::diagnostics::Diagnostics) sink so a single pass
//!   reports every defect it can find.
//! - **Errors**: problems that make the current read or write impossible
//!   (archive format errors, IO failures). These are returned immediately as
//!   a [`RouterError`].
//!
//! ## Error Categories
//!
//! - **Io**: Filesystem and standard stream errors, with the offending path
//! - **Format**: Archive container errors ([`ArchiveError`])
//! - **Compile**: A compile finished with one or more error diagnostics
//! - **Validation**: Graph mutations rejected for local well-formedness
//! - **Config**: Compiler configuration could not be loaded
//! - **Serde**: Serialization errors
//!
//! ## Usage
//!
//! ```rust
//! use routec::errors::{Result, RouterError};
//!
//! fn example(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(RouterError::validation("element name cannot be empty"));
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Convenience result type used throughout Routec.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors raised while decoding or encoding an archive container.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveError {
    /// Input started with `!` but not with the `!<arch>\n` magic.
    #[error("bad archive magic")]
    BadMagic,

    /// The stream ended inside a member header or member data.
    #[error("truncated archive: {0}")]
    Truncated(String),

    /// A member header could not be parsed.
    #[error("malformed archive header at byte {offset}: {message}")]
    BadHeader { offset: usize, message: String },

    /// The archive has no live primary configuration member.
    #[error("archive has no `config' section")]
    MissingConfig,

    /// A numeric header field does not fit its fixed-width column.
    #[error("archive member `{name}`: {field} {value} does not fit in the member header")]
    FieldOverflow {
        name: String,
        field: String,
        value: u64,
    },

    /// A member name cannot be represented in the long-name table.
    #[error("archive member name {0:?} cannot be encoded")]
    InvalidName(String),

    /// Liveness flags that the decoder's last-of-name shadowing would not
    /// reproduce.
    #[error("archive member `{0}` has a liveness flag that shadowing by name does not reproduce")]
    LivenessConflict(String),
}

/// Canonical error enumeration for Routec.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum RouterError {
    /// Errors originating from filesystem or standard stream IO.
    #[error("io error: {0}")]
    Io(String),

    /// Archive container errors; fatal for the current read or write.
    #[error("archive error: {0}")]
    Format(#[from] ArchiveError),

    /// The compile of `landmark` recorded at least one error diagnostic.
    #[error("{landmark}: compile failed with {} error(s)", diagnostics.nerrors())]
    Compile {
        landmark: String,
        diagnostics: Diagnostics,
    },

    /// Graph mutations rejected by local well-formedness checks.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Compiler configuration could not be loaded or parsed.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<io::Error> for RouterError {
    fn from(err: io::Error) -> Self {
        RouterError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::Serde(err.to_string())
    }
}

impl RouterError {
    /// Helper to construct validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        RouterError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct configuration errors.
    pub fn config<T: Into<String>>(message: T) -> Self {
        RouterError::Config {
            message: message.into(),
        }
    }

    /// IO error tagged with the path it concerns.
    pub fn io_at(path: impl AsRef<Path>, err: io::Error) -> Self {
        RouterError::Io(format!("{}: {}", path.as_ref().display(), err))
    }

    /// Diagnostics carried by a failed compile, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            RouterError::Compile { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

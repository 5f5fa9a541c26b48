// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::prelude::*;

/// Message published when a catalog contains no usable entries.
pub const NO_VALID_ENTRIES_MESSAGE: &str = "No valid streams found";

/// A single playable item of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Display label
    ///
    /// Not required to be unique.
    pub title: String,

    /// Reference to a preview image.
    pub image_url: String,

    /// Reference to a playable resource, either a segmented streaming
    /// manifest or a direct media file.
    pub stream_url: String,
}

/// The raw value of a candidate field before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    #[default]
    Missing,
    Text(String),
    /// Present, but not a text value.
    NotText,
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Missing | Self::NotText => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(from: String) -> Self {
        Self::Text(from)
    }
}

impl From<&str> for FieldValue {
    fn from(from: &str) -> Self {
        Self::Text(from.to_owned())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldInvalidity {
    Missing,
    NotText,
}

impl Validate for FieldValue {
    type Invalidity = FieldInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(matches!(self, Self::Missing), Self::Invalidity::Missing)
            .invalidate_if(matches!(self, Self::NotText), Self::Invalidity::NotText)
            .into()
    }
}

/// An element of the catalog as received from the source.
///
/// Only candidates with all fields present as text are accepted
/// as catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: FieldValue,
    pub image_url: FieldValue,
    pub stream_url: FieldValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CandidateInvalidity {
    Title(FieldInvalidity),
    ImageUrl(FieldInvalidity),
    StreamUrl(FieldInvalidity),
}

impl Validate for Candidate {
    type Invalidity = CandidateInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let Self {
            title,
            image_url,
            stream_url,
        } = self;
        ValidationContext::new()
            .validate_with(title, Self::Invalidity::Title)
            .validate_with(image_url, Self::Invalidity::ImageUrl)
            .validate_with(stream_url, Self::Invalidity::StreamUrl)
            .into()
    }
}

impl From<Entry> for Candidate {
    fn from(from: Entry) -> Self {
        let Entry {
            title,
            image_url,
            stream_url,
        } = from;
        Self {
            title: title.into(),
            image_url: image_url.into(),
            stream_url: stream_url.into(),
        }
    }
}

/// Accepts valid candidates and hands back rejected ones unmodified.
impl TryFrom<Candidate> for Entry {
    type Error = Candidate;

    fn try_from(from: Candidate) -> Result<Self, Self::Error> {
        match from {
            Candidate {
                title: FieldValue::Text(title),
                image_url: FieldValue::Text(image_url),
                stream_url: FieldValue::Text(stream_url),
            } => Ok(Self {
                title,
                image_url,
                stream_url,
            }),
            rejected => {
                debug_assert!(!rejected.is_valid());
                Err(rejected)
            }
        }
    }
}

/// Outcome of filtering candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Accepted entries in the order of the source.
    pub entries: Vec<Entry>,

    /// Total number of candidates, both accepted and rejected.
    pub total: usize,
}

impl Filtered {
    /// Number of rejected candidates.
    #[must_use]
    pub fn dropped(&self) -> usize {
        debug_assert!(self.entries.len() <= self.total);
        self.total - self.entries.len()
    }
}

/// Retain all valid candidates while preserving their order.
#[must_use]
pub fn filter_valid(candidates: impl IntoIterator<Item = Candidate>) -> Filtered {
    let mut total = 0;
    let entries = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            total += 1;
            match Entry::try_from(candidate) {
                Ok(entry) => Some(entry),
                Err(rejected) => {
                    if let Err(invalidity) = rejected.validate() {
                        log::debug!("Rejected catalog candidate #{index}: {invalidity:?}");
                    }
                    None
                }
            }
        })
        .collect();
    Filtered { entries, total }
}

/// Failure of a load cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The source is unreachable or responded with a non-success status.
    #[error("Failed to load streams: {0}")]
    Transport(String),

    /// The response could not be parsed or is not a sequence.
    #[error("Invalid streams data format: {0}")]
    Format(String),

    /// The cycle has been dropped before it completed.
    #[error("Loading streams aborted")]
    Aborted,
}

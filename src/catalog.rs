//! Validation rules for course material submitted by instructors.

use crate::roles::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A {kind} lesson requires '{field}'")]
    MissingContent {
        kind: LessonKind,
        field: &'static str,
    },

    #[error("A {kind} lesson must not set '{field}'")]
    UnexpectedContent {
        kind: LessonKind,
        field: &'static str,
    },

    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),

    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    #[error("'{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i32,
        max: i32,
        value: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Document,
    Text,
}

impl LessonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Video => "video",
            LessonKind::Document => "document",
            LessonKind::Text => "text",
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(LessonKind::Video),
            "document" => Ok(LessonKind::Document),
            "text" => Ok(LessonKind::Text),
            other => Err(UnknownVariant {
                kind: "lesson kind",
                value: other.to_string(),
            }),
        }
    }
}

/// The content columns of a lesson, exactly one of which is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonContent {
    pub video_url: Option<String>,
    pub document_path: Option<String>,
    pub text_content: Option<String>,
}

impl LessonContent {
    /// Checks that the field matching `kind` is present and the others are not.
    /// Blank strings are treated as absent.
    pub fn validated(
        kind: LessonKind,
        video_url: Option<String>,
        document_path: Option<String>,
        text_content: Option<String>,
    ) -> Result<Self, ValidationError> {
        let content = LessonContent {
            video_url: non_blank(video_url),
            document_path: non_blank(document_path),
            text_content: non_blank(text_content),
        };

        let fields = [
            (LessonKind::Video, "video_url", content.video_url.is_some()),
            (
                LessonKind::Document,
                "document_path",
                content.document_path.is_some(),
            ),
            (LessonKind::Text, "text_content", content.text_content.is_some()),
        ];
        for (field_kind, field, present) in fields {
            if field_kind == kind && !present {
                return Err(ValidationError::MissingContent { kind, field });
            }
            if field_kind != kind && present {
                return Err(ValidationError::UnexpectedContent { kind, field });
            }
        }

        if let Some(url) = &content.video_url {
            Url::parse(url).map_err(|_| ValidationError::InvalidUrl(url.clone()))?;
        }

        Ok(content)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

pub fn require_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

/// Passing threshold in percent, attempt cap and optional time limit in minutes.
pub fn validate_quiz_settings(
    passing_score: i32,
    max_attempts: i32,
    time_limit_minutes: Option<i32>,
) -> Result<(), ValidationError> {
    require_range("passing_score", passing_score, 0, 100)?;
    require_range("max_attempts", max_attempts, 1, i32::MAX)?;
    if let Some(limit) = time_limit_minutes {
        require_range("time_limit_minutes", limit, 1, i32::MAX)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_lesson_requires_url_only() {
        let content = LessonContent::validated(
            LessonKind::Video,
            Some("https://example.org/watch?v=1".to_string()),
            None,
            Some("   ".to_string()),
        )
        .unwrap();
        assert_eq!(
            content.video_url.as_deref(),
            Some("https://example.org/watch?v=1")
        );
        assert_eq!(content.text_content, None);

        assert_eq!(
            LessonContent::validated(LessonKind::Video, None, None, None),
            Err(ValidationError::MissingContent {
                kind: LessonKind::Video,
                field: "video_url"
            })
        );
    }

    #[test]
    fn lesson_rejects_content_of_another_kind() {
        assert_eq!(
            LessonContent::validated(
                LessonKind::Text,
                Some("https://example.org".to_string()),
                None,
                Some("Body".to_string()),
            ),
            Err(ValidationError::UnexpectedContent {
                kind: LessonKind::Text,
                field: "video_url"
            })
        );
    }

    #[test]
    fn video_url_must_parse() {
        assert_eq!(
            LessonContent::validated(LessonKind::Video, Some("not a url".to_string()), None, None),
            Err(ValidationError::InvalidUrl("not a url".to_string()))
        );
    }

    #[test]
    fn document_lesson_accepts_path() {
        let content = LessonContent::validated(
            LessonKind::Document,
            None,
            Some("lessons/intro.pdf".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(content.document_path.as_deref(), Some("lessons/intro.pdf"));
    }

    #[test]
    fn quiz_settings_bounds() {
        assert!(validate_quiz_settings(70, 3, None).is_ok());
        assert!(validate_quiz_settings(0, 1, Some(1)).is_ok());
        assert!(validate_quiz_settings(101, 3, None).is_err());
        assert!(validate_quiz_settings(70, 0, None).is_err());
        assert_eq!(
            validate_quiz_settings(70, 1, Some(0)),
            Err(ValidationError::OutOfRange {
                field: "time_limit_minutes",
                min: 1,
                max: i32::MAX,
                value: 0
            })
        );
    }

    #[test]
    fn lesson_kind_round_trips_through_storage_tag() {
        for kind in [LessonKind::Video, LessonKind::Document, LessonKind::Text] {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
        assert!("audio".parse::<LessonKind>().is_err());
    }
}

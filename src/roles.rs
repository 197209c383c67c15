use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Account role stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

/// Actions gated by role rather than by ownership or enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageCourses,
    ManageQuizzes,
    ViewGrades,
    IssueCertificates,
    TriggerNotifications,
    ViewAnyAttempt,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        match self {
            Role::Instructor | Role::Admin => true,
            Role::Student => match capability {
                Capability::ManageCourses
                | Capability::ManageQuizzes
                | Capability::ViewGrades
                | Capability::IssueCertificates
                | Capability::TriggerNotifications
                | Capability::ViewAnyAttempt => false,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_hold_no_management_capabilities() {
        for capability in [
            Capability::ManageCourses,
            Capability::ManageQuizzes,
            Capability::ViewGrades,
            Capability::IssueCertificates,
            Capability::TriggerNotifications,
            Capability::ViewAnyAttempt,
        ] {
            assert!(!Role::Student.can(capability));
            assert!(Role::Instructor.can(capability));
            assert!(Role::Admin.can(capability));
        }
    }

    #[test]
    fn parses_stored_role_tags() {
        assert_eq!("student".parse(), Ok(Role::Student));
        assert_eq!("instructor".parse(), Ok(Role::Instructor));
        assert_eq!("admin".parse(), Ok(Role::Admin));
        assert!("teacher".parse::<Role>().is_err());
        assert_eq!(Role::Instructor.to_string(), "instructor");
    }
}

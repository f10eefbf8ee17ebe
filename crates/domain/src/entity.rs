use std::fmt::{Display, Formatter};
use std::str::FromStr;

use campus_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Business entity collections whose writes are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackedEntityType {
    /// Enrolled or applicant student profiles.
    Student,
    /// Class sections with their assigned students.
    Section,
    /// Curriculum and subject offerings.
    Curriculum,
    /// Tuition and payment gateway settings.
    PaymentSettings,
}

impl TrackedEntityType {
    /// Returns the stable collection name for live documents.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Section => "Section",
            Self::Curriculum => "Curriculum",
            Self::PaymentSettings => "PaymentSettings",
        }
    }

    /// Returns the collection name holding soft-deleted documents.
    #[must_use]
    pub fn archive_collection(&self) -> &'static str {
        match self {
            Self::Student => "StudentArchive",
            Self::Section => "SectionArchive",
            Self::Curriculum => "CurriculumArchive",
            Self::PaymentSettings => "PaymentSettingsArchive",
        }
    }

    /// Returns all tracked entity types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[TrackedEntityType] = &[
            TrackedEntityType::Student,
            TrackedEntityType::Section,
            TrackedEntityType::Curriculum,
            TrackedEntityType::PaymentSettings,
        ];

        ALL
    }
}

impl Display for TrackedEntityType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TrackedEntityType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Student" | "student" | "students" => Ok(Self::Student),
            "Section" | "section" | "sections" => Ok(Self::Section),
            "Curriculum" | "curriculum" | "curricula" => Ok(Self::Curriculum),
            "PaymentSettings" | "payment_settings" | "payment-settings" => {
                Ok(Self::PaymentSettings)
            }
            _ => Err(AppError::Validation(format!(
                "unknown entity type '{value}'"
            ))),
        }
    }
}

/// Persisted state of one business document, opaque to the audit layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    entity_id: NonEmptyString,
    entity_type: NonEmptyString,
    data: Value,
}

impl EntitySnapshot {
    /// Creates a validated snapshot. Document data must be a JSON object.
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        data: Value,
    ) -> AppResult<Self> {
        if !data.is_object() {
            return Err(AppError::Validation(
                "entity document data must be a JSON object".to_owned(),
            ));
        }

        Ok(Self {
            entity_id: NonEmptyString::new(entity_id)?,
            entity_type: NonEmptyString::new(entity_type)?,
            data,
        })
    }

    /// Returns the stable document identifier.
    #[must_use]
    pub fn entity_id(&self) -> &NonEmptyString {
        &self.entity_id
    }

    /// Returns the collection the document belongs to.
    #[must_use]
    pub fn entity_type(&self) -> &NonEmptyString {
        &self.entity_type
    }

    /// Returns the document JSON object.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the snapshot and returns the document JSON object.
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }
}

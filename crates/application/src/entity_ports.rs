use async_trait::async_trait;
use campus_core::{AppError, AppResult};
use campus_domain::{EntitySnapshot, values_equal};
use serde_json::{Map, Value};

/// Top-level field equality filter used by update-by-query writes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    /// Top-level field name.
    pub field: String,
    /// Value the field must hold.
    pub value: Value,
}

impl FieldMatch {
    /// Returns true when `data` holds `value` at `field`.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        data.get(self.field.as_str())
            .is_some_and(|current| values_equal(current, &self.value))
    }
}

/// Shallow patch applied to every document matched by an update-by-query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    /// Top-level fields assigned verbatim. `null` assigns null.
    pub set: Map<String, Value>,
    /// Top-level fields removed from the document.
    pub unset: Vec<String>,
}

impl EntityPatch {
    /// Rejects patches that would not change anything.
    pub fn validate(&self) -> AppResult<()> {
        if self.set.is_empty() && self.unset.is_empty() {
            return Err(AppError::Validation(
                "patch must set or unset at least one field".to_owned(),
            ));
        }

        if let Some(field) = self
            .unset
            .iter()
            .find(|field| self.set.contains_key(field.as_str()))
        {
            return Err(AppError::Validation(format!(
                "field '{field}' cannot be both set and unset"
            )));
        }

        Ok(())
    }

    /// Applies the patch to a document object in place.
    pub fn apply_to(&self, data: &mut Value) -> AppResult<()> {
        let document = data.as_object_mut().ok_or_else(|| {
            AppError::Validation("entity document data must be a JSON object".to_owned())
        })?;

        for (field, value) in &self.set {
            document.insert(field.clone(), value.clone());
        }
        for field in &self.unset {
            document.remove(field.as_str());
        }

        Ok(())
    }
}

/// Repository port for business entity documents and their archives.
///
/// Collections are addressed by name; archive collections are ordinary
/// collections named by [`campus_domain::TrackedEntityType::archive_collection`].
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Returns the durable state of one document.
    async fn find_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>>;

    /// Lists documents in a collection, optionally filtered.
    async fn list_entities(
        &self,
        entity_type: &str,
        filter: Option<&FieldMatch>,
    ) -> AppResult<Vec<EntitySnapshot>>;

    /// Inserts a document. A missing identifier is generated by the store.
    async fn insert_entity(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        data: Value,
    ) -> AppResult<EntitySnapshot>;

    /// Replaces the full document stored under `entity_id`.
    async fn replace_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        data: Value,
    ) -> AppResult<EntitySnapshot>;

    /// Applies `patch` to every document matching `filter`.
    async fn update_matching(
        &self,
        entity_type: &str,
        filter: &FieldMatch,
        patch: &EntityPatch,
    ) -> AppResult<Vec<EntitySnapshot>>;

    /// Removes one document.
    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<()>;

    /// Moves one document between collections as a single atomic step.
    ///
    /// The document keeps its identifier. When the target collection already
    /// holds the identifier the move fails and the source is left untouched.
    async fn move_entity(
        &self,
        from_type: &str,
        to_type: &str,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot>;
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::{EntityPatch, FieldMatch};

    #[test]
    fn field_match_compares_top_level_values() {
        let filter = FieldMatch {
            field: "grade".to_owned(),
            value: json!(7),
        };
        assert!(filter.matches(&json!({"grade": 7.0})));
        assert!(!filter.matches(&json!({"grade": 8})));
        assert!(!filter.matches(&json!({"level": 7})));
    }

    #[test]
    fn patch_sets_and_unsets_fields() {
        let mut set = Map::new();
        set.insert("section".to_owned(), json!("7-B"));
        set.insert("adviser".to_owned(), json!(null));
        let patch = EntityPatch {
            set,
            unset: vec!["remarks".to_owned()],
        };

        let mut data = json!({"name": "Ana", "section": "7-A", "remarks": "late"});
        assert!(patch.validate().is_ok());
        assert!(patch.apply_to(&mut data).is_ok());
        assert_eq!(
            data,
            json!({"name": "Ana", "section": "7-B", "adviser": null})
        );
    }

    #[test]
    fn patch_rejects_empty_and_conflicting_fields() {
        assert!(EntityPatch::default().validate().is_err());

        let mut set = Map::new();
        set.insert("section".to_owned(), json!("7-B"));
        let conflicting = EntityPatch {
            set,
            unset: vec!["section".to_owned()],
        };
        assert!(conflicting.validate().is_err());
    }
}

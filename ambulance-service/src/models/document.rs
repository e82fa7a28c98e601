use serde::{de::DeserializeOwned, Serialize};

/// A record stored in its own collection and keyed by a string identifier.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Entity kind; doubles as the default collection name.
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Overwrite every field for which `incoming` carries a non-default value.
    ///
    /// Absent and zero-valued fields keep what is stored; the identifier is
    /// never touched.
    fn merge(&mut self, incoming: Self);

    /// Assign a fresh UUID when the caller left the identifier blank.
    fn ensure_id(&mut self) {
        if self.id().trim().is_empty() {
            self.set_id(uuid::Uuid::new_v4().to_string());
        }
    }
}

/// Replace `target` with `incoming` unless `incoming` is the type's zero value.
pub fn merge_field<V: PartialEq + Default>(target: &mut V, incoming: V) {
    if incoming != V::default() {
        *target = incoming;
    }
}

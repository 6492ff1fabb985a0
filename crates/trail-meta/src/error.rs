/// Errors produced while mapping and describing domain types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    /// A declared type (often a container element) has no mapping.
    #[error("type not mapped: {type_name}")]
    TypeNotMapped { type_name: String },

    /// An entity has zero or several id properties.
    #[error("entity {class} must have exactly one id property, found {found}")]
    EntityWithoutId { class: String, found: usize },

    /// An explicitly named property does not exist on the class.
    #[error("property '{property}' not found on {class}")]
    PropertyNotFound { class: String, property: String },

    /// The type is a class but does not provide a class description.
    #[error("class {type_name} is not described")]
    ClassNotDescribed { type_name: String },

    /// Class names end up inside global ids and must stay parseable.
    #[error("invalid class name {0:?}: must be non-empty and must not contain '/' or '#'")]
    InvalidClassName(String),

    /// A reader or codec received an object of another type.
    #[error("{class}.{property}: target object has an unexpected type")]
    TargetMismatch { class: String, property: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for meta-model results.
pub type MetaResult<T> = Result<T, MetaError>;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;
use crate::path::FragmentPath;

/// Stable identifier of a node in a managed object graph.
///
/// Equality and hashing are structural. The canonical string form
/// (`Display`) parses back to an equal id:
///
/// - `Person/bob` for an entity instance,
/// - `Address/` for a value object without an owner,
/// - `Person/bob#address.lines[2]` for a value object owned by an entity.
///
/// `%` and `#` inside id values are percent-escaped so that the owner and
/// fragment parts can always be told apart.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalId {
    /// An entity instance, identified by its type and canonical id value.
    Instance { type_name: String, id: String },
    /// A standalone value object with no owning entity.
    UnboundedValueObject { type_name: String },
    /// A value object located at `fragment` inside its owner's graph.
    ValueObject {
        owner: Box<GlobalId>,
        fragment: FragmentPath,
    },
}

impl GlobalId {
    pub fn instance(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Instance {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    pub fn unbounded(type_name: impl Into<String>) -> Self {
        Self::UnboundedValueObject {
            type_name: type_name.into(),
        }
    }

    pub fn value_object(owner: GlobalId, fragment: FragmentPath) -> Self {
        Self::ValueObject {
            owner: Box::new(owner),
            fragment,
        }
    }

    /// Type name carried by the id itself. Owned value objects don't carry one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Instance { type_name, .. } | Self::UnboundedValueObject { type_name } => {
                Some(type_name)
            }
            Self::ValueObject { .. } => None,
        }
    }

    /// The owning id of a value object.
    pub fn owner(&self) -> Option<&GlobalId> {
        match self {
            Self::ValueObject { owner, .. } => Some(owner),
            _ => None,
        }
    }

    pub fn fragment(&self) -> Option<&FragmentPath> {
        match self {
            Self::ValueObject { fragment, .. } => Some(fragment),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance { .. })
    }

    pub fn is_value_object(&self) -> bool {
        !self.is_instance()
    }

    /// The entity (or unbounded value object) at the top of the ownership chain.
    pub fn root(&self) -> &GlobalId {
        match self {
            Self::ValueObject { owner, .. } => owner.root(),
            other => other,
        }
    }

    /// Id of a value object nested under this one at `property`.
    ///
    /// Value objects inside value objects share the top-level owner and
    /// extend its fragment path.
    pub fn child(&self, property: &FragmentPath) -> GlobalId {
        match self {
            Self::ValueObject { owner, fragment } => GlobalId::ValueObject {
                owner: owner.clone(),
                fragment: FragmentPath::from_normalized(format!("{fragment}.{property}")),
            },
            other => GlobalId::value_object(other.clone(), property.clone()),
        }
    }

    fn parse_owner(input: &str, whole: &str) -> Result<Self, TypeError> {
        let (type_name, id) = input.split_once('/').ok_or_else(|| TypeError::InvalidGlobalId {
            input: whole.to_string(),
            reason: "missing '/' after type name".into(),
        })?;
        if type_name.is_empty() {
            return Err(TypeError::InvalidGlobalId {
                input: whole.to_string(),
                reason: "empty type name".into(),
            });
        }
        if id.is_empty() {
            Ok(Self::unbounded(type_name))
        } else {
            Ok(Self::instance(type_name, unescape(id)))
        }
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance { type_name, id } => write!(f, "{type_name}/{}", escape(id)),
            Self::UnboundedValueObject { type_name } => write!(f, "{type_name}/"),
            Self::ValueObject { owner, fragment } => write!(f, "{owner}#{fragment}"),
        }
    }
}

impl fmt::Debug for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalId({self})")
    }
}

impl FromStr for GlobalId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((owner, fragment)) => {
                if fragment.is_empty() {
                    return Err(TypeError::InvalidGlobalId {
                        input: s.to_string(),
                        reason: "empty fragment path".into(),
                    });
                }
                let owner = Self::parse_owner(owner, s)?;
                Ok(Self::value_object(owner, FragmentPath::from_normalized(fragment)))
            }
            None => Self::parse_owner(s, s),
        }
    }
}

impl Serialize for GlobalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GlobalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("%25") {
            out.push('%');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%23") {
            out.push('#');
            rest = after;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn instance_display() {
        assert_eq!(GlobalId::instance("Person", "bob").to_string(), "Person/bob");
    }

    #[test]
    fn unbounded_display() {
        assert_eq!(GlobalId::unbounded("Address").to_string(), "Address/");
    }

    #[test]
    fn value_object_display() {
        let owner = GlobalId::instance("Person", "bob");
        let id = GlobalId::value_object(owner, FragmentPath::new("address"));
        assert_eq!(id.to_string(), "Person/bob#address");
    }

    #[test]
    fn compound_id_roundtrip() {
        let inner = GlobalId::instance("Order", "7");
        let id = GlobalId::instance("OrderLine", inner.to_string());
        assert_eq!(id.to_string(), "OrderLine/Order/7");
        assert_eq!("OrderLine/Order/7".parse::<GlobalId>().unwrap(), id);
    }

    #[test]
    fn hash_in_id_is_escaped() {
        let id = GlobalId::instance("Tag", "c#");
        assert_eq!(id.to_string(), "Tag/c%23");
        assert_eq!(id.to_string().parse::<GlobalId>().unwrap(), id);
    }

    #[test]
    fn child_of_value_object_extends_owner_path() {
        let person = GlobalId::instance("Person", "bob");
        let address = person.child(&FragmentPath::new("address"));
        let line = address.child(&FragmentPath::new("lines").index(2));
        assert_eq!(line.to_string(), "Person/bob#address.lines[2]");
        assert_eq!(line.owner(), Some(&person));
        assert_eq!(line.root(), &person);
    }

    #[test]
    fn type_name_only_for_ids_that_carry_one() {
        let person = GlobalId::instance("Person", "bob");
        assert_eq!(person.type_name(), Some("Person"));
        assert_eq!(GlobalId::unbounded("Address").type_name(), Some("Address"));
        assert_eq!(person.child(&FragmentPath::new("address")).type_name(), None);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("Person".parse::<GlobalId>().is_err());
        assert!("/bob".parse::<GlobalId>().is_err());
        assert!("Person/bob#".parse::<GlobalId>().is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = GlobalId::value_object(
            GlobalId::instance("Person", "bob"),
            FragmentPath::new("address"),
        );
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Person/bob#address\"");
        let parsed: GlobalId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn unescape_keeps_unknown_sequences() {
        assert_eq!(unescape("50%off"), "50%off");
        assert_eq!(unescape("%2523"), "%23");
    }

    proptest! {
        #[test]
        fn canonical_string_roundtrips(
            type_name in "[A-Za-z][A-Za-z0-9_.]{0,12}",
            id in ".+",
            property in "[a-z][a-zA-Z0-9]{0,8}",
            index in 0usize..50,
        ) {
            let instance = GlobalId::instance(type_name.clone(), id);
            prop_assert_eq!(instance.to_string().parse::<GlobalId>().unwrap(), instance.clone());

            let nested = instance.child(&FragmentPath::new(&property).index(index));
            prop_assert_eq!(nested.to_string().parse::<GlobalId>().unwrap(), nested);

            let unbounded = GlobalId::unbounded(type_name);
            prop_assert_eq!(unbounded.to_string().parse::<GlobalId>().unwrap(), unbounded);
        }
    }
}

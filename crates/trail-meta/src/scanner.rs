use serde::{Deserialize, Serialize};

use crate::class_def::{ClassDef, Member, MemberKind};

/// Which class members become properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStyle {
    /// Fields, own and inherited, minus static, transient and synthetic ones.
    #[default]
    Fields,
    /// Getters named `getX` or `isX`, property name `x`.
    Getters,
}

/// A member selected as a property, with its property name.
#[derive(Clone, Debug)]
pub struct ScannedProperty<'d> {
    pub name: String,
    pub member: &'d Member,
}

/// Enumerates the properties of a described class.
#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyScanner {
    style: MappingStyle,
}

impl PropertyScanner {
    pub fn new(style: MappingStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> MappingStyle {
        self.style
    }

    /// Properties of `def` in declaration order, inherited ones first.
    pub fn scan<'d>(&self, def: &'d ClassDef) -> Vec<ScannedProperty<'d>> {
        let mut properties: Vec<ScannedProperty<'d>> = Vec::new();
        for member in def.members() {
            if !member.modifiers().is_plain() {
                continue;
            }
            let name = match (self.style, member.kind()) {
                (MappingStyle::Fields, MemberKind::Field) => member.name().to_string(),
                (MappingStyle::Getters, MemberKind::Getter) => {
                    match property_name_of_getter(member.name()) {
                        Some(name) => name,
                        None => continue,
                    }
                }
                _ => continue,
            };
            if properties.iter().any(|p| p.name == name) {
                continue;
            }
            properties.push(ScannedProperty { name, member });
        }
        properties
    }
}

/// Property name of a `getX`/`isX` getter, `None` if `method` is not one.
///
/// ```
/// use trail_meta::scanner::property_name_of_getter;
///
/// assert_eq!(property_name_of_getter("getName").as_deref(), Some("name"));
/// assert_eq!(property_name_of_getter("isActive").as_deref(), Some("active"));
/// assert_eq!(property_name_of_getter("getURL").as_deref(), Some("URL"));
/// assert_eq!(property_name_of_getter("getaway"), None);
/// ```
pub fn property_name_of_getter(method: &str) -> Option<String> {
    let rest = method
        .strip_prefix("get")
        .or_else(|| method.strip_prefix("is"))?;
    if !rest.chars().next()?.is_uppercase() {
        return None;
    }
    Some(decapitalize(rest))
}

/// Decapitalization where leading acronyms stay as they are (`URL`).
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) {
        return name.to_string();
    }
    first.to_lowercase().chain(name.chars().skip(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_def::Modifiers;
    use crate::inspect::Inspect;

    struct Account {
        number: String,
        active: bool,
        cache: Vec<u8>,
        version: u32,
        url: String,
    }

    impl Account {
        fn get_number(&self) -> &String {
            &self.number
        }

        fn is_active(&self) -> &bool {
            &self.active
        }

        fn get_url(&self) -> &String {
            &self.url
        }
    }

    impl Inspect for Account {}

    fn def() -> ClassDef {
        ClassDef::of::<Account>("Account")
            .id_field("number", |a: &Account| &a.number)
            .field("active", |a: &Account| &a.active)
            .transient_field("cache", |a: &Account| &a.cache)
            .field_with("version", Modifiers::STATIC, |a: &Account| &a.version)
            .field_with("$outer", Modifiers::SYNTHETIC, |a: &Account| &a.url)
            .id_getter("getNumber", Account::get_number)
            .getter("isActive", Account::is_active)
            .getter("getURL", Account::get_url)
            .getter("toString", Account::get_url)
            .build()
    }

    fn names(properties: &[ScannedProperty<'_>]) -> Vec<String> {
        properties.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn field_mode_skips_excluded_members() {
        let def = def();
        let scanned = PropertyScanner::new(MappingStyle::Fields).scan(&def);
        assert_eq!(names(&scanned), vec!["number", "active"]);
        assert!(scanned[0].member.is_id());
    }

    #[test]
    fn getter_mode_derives_property_names() {
        let def = def();
        let scanned = PropertyScanner::new(MappingStyle::Getters).scan(&def);
        assert_eq!(names(&scanned), vec!["number", "active", "URL"]);
        assert_eq!(scanned[0].member.name(), "getNumber");
    }

    #[test]
    fn default_style_is_fields() {
        assert_eq!(PropertyScanner::default().style(), MappingStyle::Fields);
    }

    #[test]
    fn decapitalize_keeps_acronyms() {
        assert_eq!(decapitalize("Name"), "name");
        assert_eq!(decapitalize("X"), "x");
        assert_eq!(decapitalize("URL"), "URL");
        assert_eq!(decapitalize(""), "");
    }

    #[test]
    fn style_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MappingStyle::Getters).unwrap(), "\"getters\"");
    }
}

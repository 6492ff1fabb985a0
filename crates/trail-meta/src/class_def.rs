//! Explicit class descriptors.
//!
//! A [`ClassDef`] lists the members of a user class together with typed read
//! accessors. Members are either fields or getters; which of them become
//! properties is decided later by the [`PropertyScanner`](crate::PropertyScanner).

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::inspect::{Inspect, Live};
use crate::type_ref::{ClassRef, TypeRef};

/// Whether a member is a stored field or an accessor method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Getter,
}

/// Member flags that exclude it from property scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_transient: bool,
    pub is_synthetic: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        is_static: false,
        is_transient: false,
        is_synthetic: false,
    };
    pub const STATIC: Self = Self {
        is_static: true,
        ..Self::NONE
    };
    pub const TRANSIENT: Self = Self {
        is_transient: true,
        ..Self::NONE
    };
    pub const SYNTHETIC: Self = Self {
        is_synthetic: true,
        ..Self::NONE
    };

    /// `true` if none of the excluding flags are set.
    pub fn is_plain(&self) -> bool {
        !(self.is_static || self.is_transient || self.is_synthetic)
    }
}

/// Reads one member out of a type-erased target.
pub(crate) trait Reader: Send + Sync {
    fn read<'a>(&self, target: &'a dyn Any) -> Option<Live<'a>>;
}

struct FieldReader<T, V, F> {
    getter: F,
    _marker: PhantomData<fn(&T) -> &V>,
}

impl<T, V, F> Reader for FieldReader<T, V, F>
where
    T: Any,
    V: Inspect,
    F: for<'a> Fn(&'a T) -> &'a V + Send + Sync,
{
    fn read<'a>(&self, target: &'a dyn Any) -> Option<Live<'a>> {
        target
            .downcast_ref::<T>()
            .map(|object| (self.getter)(object).inspect())
    }
}

struct DynamicReader<T, F> {
    read: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> Reader for DynamicReader<T, F>
where
    T: Any,
    F: for<'a> Fn(&'a T) -> Live<'a> + Send + Sync,
{
    fn read<'a>(&self, target: &'a dyn Any) -> Option<Live<'a>> {
        target.downcast_ref::<T>().map(|object| (self.read)(object))
    }
}

/// Reads an inherited member through the child's projection onto its parent.
struct ProjectedReader<C, P, F> {
    project: Arc<F>,
    inner: Arc<dyn Reader>,
    _marker: PhantomData<fn(&C) -> &P>,
}

impl<C, P, F> Reader for ProjectedReader<C, P, F>
where
    C: Any,
    P: Any,
    F: for<'a> Fn(&'a C) -> &'a P + Send + Sync,
{
    fn read<'a>(&self, target: &'a dyn Any) -> Option<Live<'a>> {
        let child = target.downcast_ref::<C>()?;
        let parent: &'a P = (*self.project)(child);
        self.inner.read(parent)
    }
}

/// One declared member of a class.
#[derive(Clone)]
pub struct Member {
    name: String,
    kind: MemberKind,
    modifiers: Modifiers,
    is_id: bool,
    declared: TypeRef,
    reader: Arc<dyn Reader>,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Marked as the identity of its class.
    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn declared_type(&self) -> &TypeRef {
        &self.declared
    }

    /// Read the member from `target`. `None` if `target` is of another type.
    pub fn read<'a>(&self, target: &'a dyn Any) -> Option<Live<'a>> {
        self.reader.read(target)
    }

    pub(crate) fn reader(&self) -> Arc<dyn Reader> {
        Arc::clone(&self.reader)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &self.modifiers)
            .field("is_id", &self.is_id)
            .field("declared", &self.declared)
            .finish()
    }
}

/// Explicit description of a user class.
#[derive(Clone, Debug)]
pub struct ClassDef {
    class: ClassRef,
    name: String,
    members: Vec<Member>,
}

impl ClassDef {
    /// Start describing `T` under the managed type name `name`.
    pub fn of<T: Inspect>(name: impl Into<String>) -> ClassDefBuilder<T> {
        ClassDefBuilder {
            class: ClassRef::of::<T>(),
            name: name.into(),
            inherited: Vec::new(),
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn class(&self) -> ClassRef {
        self.class
    }

    /// Managed type name, as it appears in global ids.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order, inherited ones first.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Builder returned by [`ClassDef::of`].
pub struct ClassDefBuilder<T> {
    class: ClassRef,
    name: String,
    inherited: Vec<Member>,
    members: Vec<Member>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Inspect> ClassDefBuilder<T> {
    pub fn field<V, F>(self, name: &str, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Field, Modifiers::NONE, false, getter)
    }

    /// A field that identifies the instance.
    pub fn id_field<V, F>(self, name: &str, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Field, Modifiers::NONE, true, getter)
    }

    pub fn transient_field<V, F>(self, name: &str, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Field, Modifiers::TRANSIENT, false, getter)
    }

    pub fn field_with<V, F>(self, name: &str, modifiers: Modifiers, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Field, modifiers, false, getter)
    }

    /// An accessor named `getX` or `isX`, e.g. `getName` or `isActive`.
    pub fn getter<V, F>(self, name: &str, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Getter, Modifiers::NONE, false, getter)
    }

    pub fn id_getter<V, F>(self, name: &str, getter: F) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Getter, Modifiers::NONE, true, getter)
    }

    /// A field whose shape is produced by hand, with an explicit type hint.
    ///
    /// Used for type-erased members (`Box<dyn Any>` and friends) where the
    /// declared type cannot be derived from the Rust type.
    pub fn dynamic<F>(mut self, name: &str, declared: TypeRef, read: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Live<'a> + Send + Sync + 'static,
    {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Field,
            modifiers: Modifiers::NONE,
            is_id: false,
            declared,
            reader: Arc::new(DynamicReader {
                read,
                _marker: PhantomData::<fn(&T)>,
            }),
        });
        self
    }

    /// Inherit the members of `parent`, reached through `project`.
    ///
    /// Inherited members come first; a member declared on the child with the
    /// same name and kind replaces the inherited one in place.
    pub fn extends<P, F>(mut self, parent: ClassDef, project: F) -> Self
    where
        P: Inspect,
        F: for<'a> Fn(&'a T) -> &'a P + Send + Sync + 'static,
    {
        let project = Arc::new(project);
        for member in parent.members {
            let inner = member.reader;
            self.inherited.push(Member {
                reader: Arc::new(ProjectedReader {
                    project: Arc::clone(&project),
                    inner,
                    _marker: PhantomData::<fn(&T) -> &P>,
                }),
                ..member
            });
        }
        self
    }

    pub fn build(self) -> ClassDef {
        let mut members = self.inherited;
        for member in self.members {
            match members
                .iter_mut()
                .find(|m| m.name == member.name && m.kind == member.kind)
            {
                Some(slot) => *slot = member,
                None => members.push(member),
            }
        }
        ClassDef {
            class: self.class,
            name: self.name,
            members,
        }
    }

    fn push<V, F>(
        mut self,
        name: &str,
        kind: MemberKind,
        modifiers: Modifiers,
        is_id: bool,
        getter: F,
    ) -> Self
    where
        V: Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.members.push(Member {
            name: name.to_string(),
            kind,
            modifiers,
            is_id,
            declared: V::declared_type(),
            reader: Arc::new(FieldReader {
                getter,
                _marker: PhantomData::<fn(&T) -> &V>,
            }),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_ref::PrimitiveKind;
    use serde_json::json;

    struct Base {
        id: u64,
        label: String,
    }

    impl Inspect for Base {}

    struct Derived {
        base: Base,
        label: String,
        extra: Vec<String>,
    }

    impl Inspect for Derived {}

    fn base_def() -> ClassDef {
        ClassDef::of::<Base>("Base")
            .id_field("id", |b: &Base| &b.id)
            .field("label", |b: &Base| &b.label)
            .build()
    }

    fn derived() -> Derived {
        Derived {
            base: Base {
                id: 7,
                label: "base".into(),
            },
            label: "derived".into(),
            extra: vec!["x".into()],
        }
    }

    fn value_of(live: Option<Live<'_>>) -> serde_json::Value {
        match live {
            Some(Live::Value(v)) => v,
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn members_keep_declaration_order() {
        let def = base_def();
        let names: Vec<_> = def.members().iter().map(Member::name).collect();
        assert_eq!(names, vec!["id", "label"]);
        assert!(def.member("id").unwrap().is_id());
        assert_eq!(
            def.member("label").unwrap().declared_type(),
            &TypeRef::Primitive(PrimitiveKind::String)
        );
    }

    #[test]
    fn field_reader_reads_typed_target() {
        let def = base_def();
        let base = Base {
            id: 1,
            label: "one".into(),
        };
        assert_eq!(value_of(def.member("id").unwrap().read(&base)), json!(1));
    }

    #[test]
    fn reader_rejects_other_types() {
        let def = base_def();
        assert!(def.member("id").unwrap().read(&"not a base").is_none());
    }

    #[test]
    fn inherited_members_come_first_and_can_be_overridden() {
        let def = ClassDef::of::<Derived>("Derived")
            .extends(base_def(), |d: &Derived| &d.base)
            .field("extra", |d: &Derived| &d.extra)
            .field("label", |d: &Derived| &d.label)
            .build();

        let names: Vec<_> = def.members().iter().map(Member::name).collect();
        assert_eq!(names, vec!["id", "label", "extra"]);

        let object = derived();
        assert_eq!(value_of(def.member("id").unwrap().read(&object)), json!(7));
        assert_eq!(
            value_of(def.member("label").unwrap().read(&object)),
            json!("derived")
        );
    }

    #[test]
    fn dynamic_member_uses_hint() {
        let def = ClassDef::of::<Derived>("Derived")
            .dynamic("anything", TypeRef::list(TypeRef::Unknown), |_d: &Derived| Live::Null)
            .build();
        let member = def.member("anything").unwrap();
        assert_eq!(member.declared_type(), &TypeRef::list(TypeRef::Unknown));
        assert!(member.read(&derived()).unwrap().is_null());
    }

    #[test]
    fn modifiers() {
        assert!(Modifiers::NONE.is_plain());
        assert!(!Modifiers::STATIC.is_plain());
        assert!(!Modifiers::TRANSIENT.is_plain());
        assert!(!Modifiers::SYNTHETIC.is_plain());
    }
}

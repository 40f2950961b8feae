//! Resolved (semantic) types.
//!
//! Type resolution turns every written [`crate::ast::Type`] into a
//! [`ResolvedType`]. Struct declarations live in a [`StructTable`] and are
//! referred to by [`StructId`]; a generic struct used with concrete
//! arguments becomes a `StructRef` carrying those arguments and the
//! instance version handed out by [`Instances`].
//!
//! Three relations are defined here:
//!
//! - [`resolved_type_eq`]: structural equality. Pointer mutability is
//!   ignored and a struct reference equals its own declaration.
//! - [`resolved_type_implict_to`]: implicit conversion along the numeric
//!   widening lattice, pointer mutability, and struct ref/decl unification.
//! - [`resolved_type_cast_to`]: what an explicit `cast<T>(e)` accepts.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::NodeId;
use crate::builtins::{Family, Scalar};
use crate::package::PackageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub u32);

impl StructId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    Void,
    Scalar(Scalar),
    Pointer(Box<ResolvedType>),
    MutPointer(Box<ResolvedType>),
    Array {
        elem: Box<ResolvedType>,
        len: Option<u64>,
    },
    Function {
        params: Vec<ResolvedType>,
        ret: Box<ResolvedType>,
    },
    /// A struct as declared; the template when it has generic parameters.
    StructDecl(StructId),
    /// A struct used with concrete generic arguments.
    StructRef {
        decl: StructId,
        args: Vec<ResolvedType>,
        impl_version: u32,
    },
    /// A generic parameter, bound to the struct declaration that owns it.
    Generic {
        name: String,
        index: u32,
        owner: NodeId,
    },
    /// An opaque `typedef Name;`, only usable behind a pointer.
    Opaque {
        name: String,
        package: PackageId,
        /// Spelled as `name` in C rather than mangled.
        native: bool,
    },
    /// An imported package used as a name prefix.
    Namespace(PackageId),
}

impl ResolvedType {
    pub fn pointer(inner: ResolvedType) -> Self {
        ResolvedType::Pointer(Box::new(inner))
    }

    pub fn mut_pointer(inner: ResolvedType) -> Self {
        ResolvedType::MutPointer(Box::new(inner))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, ResolvedType::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ResolvedType::Scalar(Scalar::Bool))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ResolvedType::Scalar(s) if *s != Scalar::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ResolvedType::Scalar(s) if s.is_integer())
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, ResolvedType::Pointer(_) | ResolvedType::MutPointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, ResolvedType::StructDecl(_) | ResolvedType::StructRef { .. })
    }

    /// Pointee of a pointer, element of an array.
    pub fn element(&self) -> Option<&ResolvedType> {
        match self {
            ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner) => Some(inner),
            ResolvedType::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn struct_id(&self) -> Option<StructId> {
        match self {
            ResolvedType::StructDecl(id) | ResolvedType::StructRef { decl: id, .. } => Some(*id),
            _ => None,
        }
    }

    /// True if any generic placeholder remains inside.
    pub fn has_generics(&self) -> bool {
        match self {
            ResolvedType::Generic { .. } => true,
            ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner) => inner.has_generics(),
            ResolvedType::Array { elem, .. } => elem.has_generics(),
            ResolvedType::Function { params, ret } => {
                params.iter().any(ResolvedType::has_generics) || ret.has_generics()
            }
            ResolvedType::StructRef { args, .. } => args.iter().any(ResolvedType::has_generics),
            _ => false,
        }
    }

    /// Replace the generic parameters owned by `owner` with `args`.
    pub fn substitute(&self, owner: NodeId, args: &[ResolvedType]) -> ResolvedType {
        match self {
            ResolvedType::Generic {
                index,
                owner: generic_owner,
                ..
            } if *generic_owner == owner => args
                .get(*index as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            ResolvedType::Pointer(inner) => ResolvedType::pointer(inner.substitute(owner, args)),
            ResolvedType::MutPointer(inner) => {
                ResolvedType::mut_pointer(inner.substitute(owner, args))
            }
            ResolvedType::Array { elem, len } => ResolvedType::Array {
                elem: Box::new(elem.substitute(owner, args)),
                len: *len,
            },
            ResolvedType::Function { params, ret } => ResolvedType::Function {
                params: params.iter().map(|p| p.substitute(owner, args)).collect(),
                ret: Box::new(ret.substitute(owner, args)),
            },
            ResolvedType::StructRef {
                decl,
                args: inner,
                impl_version,
            } => ResolvedType::StructRef {
                decl: *decl,
                args: inner.iter().map(|a| a.substitute(owner, args)).collect(),
                impl_version: *impl_version,
            },
            other => other.clone(),
        }
    }
}

/// A struct declaration as seen by type resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StructInfo {
    pub name: String,
    pub package: PackageId,
    /// The declaring node; generic parameters point back to it.
    pub node: NodeId,
    pub generics: Vec<String>,
    /// Filled once every struct name is known, so fields may refer to any.
    pub fields: Vec<(String, ResolvedType)>,
}

impl StructInfo {
    pub fn field(&self, name: &str) -> Option<&ResolvedType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }
}

#[derive(Debug, Default)]
pub struct StructTable {
    structs: Vec<StructInfo>,
}

impl StructTable {
    pub fn new() -> Self {
        StructTable::default()
    }

    pub fn add(&mut self, info: StructInfo) -> StructId {
        let id = StructId(self.structs.len() as u32);
        self.structs.push(info);
        id
    }

    pub fn get(&self, id: StructId) -> &StructInfo {
        &self.structs[id.index()]
    }

    pub fn get_mut(&mut self, id: StructId) -> &mut StructInfo {
        &mut self.structs[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructId, &StructInfo)> {
        self.structs
            .iter()
            .enumerate()
            .map(|(i, info)| (StructId(i as u32), info))
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Field type of `ty` (a struct or a pointer to one) with generic
    /// arguments applied.
    pub fn field_type(&self, ty: &ResolvedType, field: &str) -> Option<ResolvedType> {
        match ty {
            ResolvedType::StructDecl(id) => self.get(*id).field(field).cloned(),
            ResolvedType::StructRef { decl, args, .. } => {
                let info = self.get(*decl);
                info.field(field).map(|f| f.substitute(info.node, args))
            }
            _ => None,
        }
    }
}

/// One concrete use of a generic struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub decl: StructId,
    pub args: Vec<ResolvedType>,
    pub version: u32,
}

/// Versions for every (declaration, arguments) pair seen so far.
#[derive(Debug, Clone, Default)]
pub struct Instances {
    versions: HashMap<(StructId, Vec<ResolvedType>), u32>,
    list: Vec<Instance>,
}

impl Instances {
    pub fn new() -> Self {
        Instances::default()
    }

    /// The version of `decl<args>`, assigning the next one on first use.
    pub fn instantiate(&mut self, decl: StructId, args: Vec<ResolvedType>) -> u32 {
        if let Some(version) = self.versions.get(&(decl, args.clone())) {
            return *version;
        }
        let version = self.list.iter().filter(|i| i.decl == decl).count() as u32;
        self.versions.insert((decl, args.clone()), version);
        self.list.push(Instance {
            decl,
            args,
            version,
        });
        version
    }

    pub fn get(&self, decl: StructId, version: u32) -> Option<&Instance> {
        self.list
            .iter()
            .find(|i| i.decl == decl && i.version == version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

// ---------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------

/// Structural equality.
pub fn resolved_type_eq(structs: &StructTable, a: &ResolvedType, b: &ResolvedType) -> bool {
    eq_inner(structs, a, b, true)
}

/// `deep` compares struct declarations by content; nested comparisons
/// inside fields only compare identities so recursive structs terminate.
fn eq_inner(structs: &StructTable, a: &ResolvedType, b: &ResolvedType, deep: bool) -> bool {
    use ResolvedType as T;
    match (a, b) {
        (T::Void, T::Void) => true,
        (T::Scalar(x), T::Scalar(y)) => x == y,
        (T::Pointer(x) | T::MutPointer(x), T::Pointer(y) | T::MutPointer(y)) => {
            eq_inner(structs, x, y, deep)
        }
        (T::Array { elem: x, len: lx }, T::Array { elem: y, len: ly }) => {
            lx == ly && eq_inner(structs, x, y, deep)
        }
        (
            T::Function {
                params: px,
                ret: rx,
            },
            T::Function {
                params: py,
                ret: ry,
            },
        ) => {
            px.len() == py.len()
                && px.iter().zip(py).all(|(x, y)| eq_inner(structs, x, y, deep))
                && eq_inner(structs, rx, ry, deep)
        }
        (
            T::StructRef {
                decl: x, args: ax, ..
            },
            T::StructRef {
                decl: y, args: ay, ..
            },
        ) => {
            let same = if deep { struct_decl_eq(structs, *x, *y) } else { x == y };
            same
                && ax.len() == ay.len()
                && ax.iter().zip(ay).all(|(x, y)| eq_inner(structs, x, y, deep))
        }
        (
            T::StructDecl(x) | T::StructRef { decl: x, .. },
            T::StructDecl(y) | T::StructRef { decl: y, .. },
        ) => {
            if deep {
                struct_decl_eq(structs, *x, *y)
            } else {
                x == y
            }
        }
        (
            T::Generic {
                name: nx,
                index: ix,
                owner: ox,
            },
            T::Generic {
                name: ny,
                index: iy,
                owner: oy,
            },
        ) => ox == oy && ix == iy && nx == ny,
        (
            T::Opaque {
                name: nx,
                package: px,
                ..
            },
            T::Opaque {
                name: ny,
                package: py,
                ..
            },
        ) => nx == ny && px == py,
        (T::Namespace(x), T::Namespace(y)) => x == y,
        _ => false,
    }
}

/// Two declarations are equal when they are the same one, or when name,
/// generic parameters and fields all match.
fn struct_decl_eq(structs: &StructTable, a: StructId, b: StructId) -> bool {
    if a == b {
        return true;
    }
    let (x, y) = (structs.get(a), structs.get(b));
    x.name == y.name
        && x.generics == y.generics
        && x.fields.len() == y.fields.len()
        && x.fields
            .iter()
            .zip(&y.fields)
            .all(|((nx, tx), (ny, ty))| nx == ny && eq_inner(structs, tx, ty, false))
}

/// Whether a value of type `from` may be used where `to` is expected.
pub fn resolved_type_implict_to(structs: &StructTable, from: &ResolvedType, to: &ResolvedType) -> bool {
    use ResolvedType as T;
    if resolved_type_eq(structs, from, to) {
        return true;
    }
    match (from, to) {
        (T::Generic { .. }, _) | (_, T::Generic { .. }) => true,
        (T::Scalar(f), T::Scalar(t)) => scalar_implicit(*f, *t),
        (T::Pointer(f), T::Pointer(t))
        | (T::MutPointer(f), T::MutPointer(t))
        | (T::MutPointer(f), T::Pointer(t)) => resolved_type_implict_to(structs, f, t),
        (T::Array { elem, .. }, T::Pointer(t) | T::MutPointer(t)) => {
            resolved_type_eq(structs, elem, t)
        }
        (T::Array { elem: f, len: lf }, T::Array { elem: t, len: lt }) => {
            (lt.is_none() || lf == lt) && resolved_type_eq(structs, f, t)
        }
        // Instances of one declaration convert when every argument matches
        // or is still a placeholder.
        (
            T::StructRef {
                decl: f, args: fa, ..
            },
            T::StructRef {
                decl: t, args: ta, ..
            },
        ) => {
            struct_decl_eq(structs, *f, *t)
                && fa.len() == ta.len()
                && fa.iter().zip(ta).all(|(f, t)| {
                    f.has_generics() || t.has_generics() || resolved_type_eq(structs, f, t)
                })
        }
        (T::StructRef { decl: f, .. }, T::StructDecl(t)) => struct_decl_eq(structs, *f, *t),
        // The reverse direction also checks that the reference is fully
        // applied.
        (T::StructDecl(f), T::StructRef { decl: t, args, .. }) => {
            struct_decl_eq(structs, *f, *t) && args.len() == structs.get(*t).generics.len()
        }
        _ => false,
    }
}

/// The numeric widening lattice.
pub fn scalar_implicit(from: Scalar, to: Scalar) -> bool {
    if from == to {
        return true;
    }
    if from.is_best_width() {
        return to == Scalar::Bool || (to.family() == Family::Pointer && from.is_integer());
    }
    match from.family() {
        Family::Float => to.is_float() && to.width() >= from.width(),
        Family::Bool | Family::Char | Family::Signed | Family::Unsigned => {
            to.family() != Family::Pointer && to.width() >= from.width()
        }
        Family::Pointer => false,
    }
}

/// Whether `cast<to>(from)` is allowed.
pub fn resolved_type_cast_to(structs: &StructTable, from: &ResolvedType, to: &ResolvedType) -> bool {
    use ResolvedType as T;
    if resolved_type_implict_to(structs, from, to) {
        return true;
    }
    match (from, to) {
        (T::Pointer(_) | T::MutPointer(_), T::Pointer(_) | T::MutPointer(_)) => true,
        (T::Scalar(_), T::Scalar(_)) => true,
        (T::Pointer(_) | T::MutPointer(_), T::Scalar(s))
        | (T::Scalar(s), T::Pointer(_) | T::MutPointer(_)) => s.is_integer(),
        (T::Array { .. }, T::Pointer(_) | T::MutPointer(_)) => true,
        (T::StructDecl(_) | T::StructRef { .. }, T::StructDecl(_) | T::StructRef { .. }) => true,
        _ => false,
    }
}

/// Human readable spelling, as it would be written in source.
pub fn type_name(structs: &StructTable, ty: &ResolvedType) -> String {
    let mut out = String::new();
    write_type(structs, ty, &mut out);
    out
}

fn write_type(structs: &StructTable, ty: &ResolvedType, out: &mut String) {
    match ty {
        ResolvedType::Void => out.push_str("void"),
        ResolvedType::Scalar(s) => out.push_str(s.name()),
        ResolvedType::Pointer(inner) => {
            write_type(structs, inner, out);
            out.push('*');
        }
        ResolvedType::MutPointer(inner) => {
            write_type(structs, inner, out);
            out.push_str(" mut*");
        }
        ResolvedType::Array { elem, len } => {
            write_type(structs, elem, out);
            match len {
                Some(len) => {
                    let _ = write!(out, "[{len}]");
                }
                None => out.push_str("[]"),
            }
        }
        ResolvedType::Function { params, ret } => {
            write_type(structs, ret, out);
            out.push('(');
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(structs, param, out);
            }
            out.push(')');
        }
        ResolvedType::StructDecl(id) => out.push_str(&structs.get(*id).name),
        ResolvedType::StructRef { decl, args, .. } => {
            out.push_str(&structs.get(*decl).name);
            out.push('<');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(structs, arg, out);
            }
            out.push('>');
        }
        ResolvedType::Generic { name, .. } | ResolvedType::Opaque { name, .. } => out.push_str(name),
        ResolvedType::Namespace(id) => {
            let _ = write!(out, "<package #{}>", id.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::SCALARS;

    fn scalar(s: Scalar) -> ResolvedType {
        ResolvedType::Scalar(s)
    }

    fn table() -> (StructTable, StructId, StructId) {
        let mut structs = StructTable::new();
        let point = structs.add(StructInfo {
            name: "Point".into(),
            package: PackageId(0),
            node: NodeId(1),
            generics: Vec::new(),
            fields: vec![("x".into(), scalar(Scalar::Int)), ("y".into(), scalar(Scalar::Int))],
        });
        let boxed = structs.add(StructInfo {
            name: "Box".into(),
            package: PackageId(0),
            node: NodeId(2),
            generics: vec!["T".into()],
            fields: vec![(
                "value".into(),
                ResolvedType::Generic {
                    name: "T".into(),
                    index: 0,
                    owner: NodeId(2),
                },
            )],
        });
        (structs, point, boxed)
    }

    fn samples(point: StructId, boxed: StructId) -> Vec<ResolvedType> {
        let mut out: Vec<ResolvedType> = SCALARS.iter().map(|d| scalar(d.scalar)).collect();
        out.extend([
            ResolvedType::Void,
            ResolvedType::pointer(scalar(Scalar::Int)),
            ResolvedType::mut_pointer(scalar(Scalar::Int)),
            ResolvedType::pointer(scalar(Scalar::U8)),
            ResolvedType::Array {
                elem: Box::new(scalar(Scalar::Char)),
                len: Some(4),
            },
            ResolvedType::Function {
                params: vec![scalar(Scalar::Int)],
                ret: Box::new(ResolvedType::Void),
            },
            ResolvedType::StructDecl(point),
            ResolvedType::StructDecl(boxed),
            ResolvedType::StructRef {
                decl: boxed,
                args: vec![scalar(Scalar::Int)],
                impl_version: 0,
            },
            ResolvedType::StructRef {
                decl: boxed,
                args: vec![scalar(Scalar::U8)],
                impl_version: 1,
            },
            ResolvedType::Generic {
                name: "T".into(),
                index: 0,
                owner: NodeId(2),
            },
            ResolvedType::Namespace(PackageId(3)),
        ]);
        out
    }

    #[test]
    fn equality_implies_implicit_conversion_both_ways() {
        let (structs, point, boxed) = table();
        let all = samples(point, boxed);
        for a in &all {
            for b in &all {
                if resolved_type_eq(&structs, a, b) {
                    assert!(resolved_type_implict_to(&structs, a, b), "{a:?} -> {b:?}");
                    assert!(resolved_type_implict_to(&structs, b, a), "{b:?} -> {a:?}");
                }
            }
        }
    }

    #[test]
    fn widening_follows_the_lattice() {
        assert!(scalar_implicit(Scalar::I8, Scalar::I32));
        assert!(scalar_implicit(Scalar::U8, Scalar::I16));
        assert!(scalar_implicit(Scalar::I32, Scalar::F64));
        assert!(scalar_implicit(Scalar::Bool, Scalar::U64));
        assert!(scalar_implicit(Scalar::F32, Scalar::F64));
        assert!(scalar_implicit(Scalar::F32, Scalar::Float));
        assert!(!scalar_implicit(Scalar::I64, Scalar::I32));
        assert!(!scalar_implicit(Scalar::F64, Scalar::F32));
        assert!(!scalar_implicit(Scalar::F32, Scalar::I64));
        assert!(!scalar_implicit(Scalar::I32, Scalar::Iptr));
    }

    #[test]
    fn best_width_types_only_reach_bool_and_pointer_kinds() {
        assert!(scalar_implicit(Scalar::Int, Scalar::Bool));
        assert!(scalar_implicit(Scalar::Int, Scalar::Iptr));
        assert!(scalar_implicit(Scalar::Uptr, Scalar::Iptr));
        assert!(!scalar_implicit(Scalar::Int, Scalar::I64));
        assert!(!scalar_implicit(Scalar::Float, Scalar::F64));
        assert!(!scalar_implicit(Scalar::Float, Scalar::Iptr));
    }

    #[test]
    fn every_scalar_pair_casts_both_ways() {
        let structs = StructTable::new();
        for a in SCALARS {
            for b in SCALARS {
                let (x, y) = (scalar(a.scalar), scalar(b.scalar));
                if scalar_implicit(a.scalar, b.scalar) {
                    assert!(resolved_type_implict_to(&structs, &x, &y));
                }
                assert!(resolved_type_cast_to(&structs, &x, &y));
                assert!(resolved_type_cast_to(&structs, &y, &x));
            }
        }
    }

    #[test]
    fn mutable_pointers_narrow_to_const_only() {
        let structs = StructTable::new();
        let int_ptr = ResolvedType::pointer(scalar(Scalar::I8));
        let wide_mut = ResolvedType::mut_pointer(scalar(Scalar::I32));
        let wide_ptr = ResolvedType::pointer(scalar(Scalar::I32));
        assert!(resolved_type_implict_to(&structs, &wide_mut, &wide_ptr));
        assert!(resolved_type_implict_to(&structs, &int_ptr, &wide_ptr));
        assert!(!resolved_type_implict_to(&structs, &int_ptr, &wide_mut));
        assert!(resolved_type_cast_to(&structs, &int_ptr, &wide_mut));
        let floats = ResolvedType::pointer(scalar(Scalar::F64));
        assert!(!resolved_type_implict_to(&structs, &floats, &int_ptr));
        assert!(resolved_type_cast_to(&structs, &floats, &int_ptr));
    }

    #[test]
    fn struct_reference_matches_its_declaration() {
        let (structs, point, boxed) = table();
        let full = ResolvedType::StructRef {
            decl: boxed,
            args: vec![scalar(Scalar::Int)],
            impl_version: 0,
        };
        let bare = ResolvedType::StructRef {
            decl: boxed,
            args: Vec::new(),
            impl_version: 0,
        };
        let decl = ResolvedType::StructDecl(boxed);
        assert!(resolved_type_eq(&structs, &full, &decl));
        assert!(resolved_type_implict_to(&structs, &bare, &decl));
        assert!(!resolved_type_eq(&structs, &decl, &ResolvedType::StructDecl(point)));
        assert!(resolved_type_cast_to(&structs, &decl, &ResolvedType::StructDecl(point)));
    }

    #[test]
    fn instances_of_one_struct_compare_their_arguments() {
        let (structs, _, boxed) = table();
        let instance = |arg| ResolvedType::StructRef {
            decl: boxed,
            args: vec![arg],
            impl_version: 0,
        };
        let ints = instance(scalar(Scalar::Int));
        let bytes = instance(scalar(Scalar::U8));
        let open = instance(ResolvedType::Generic {
            name: "T".into(),
            index: 0,
            owner: NodeId(2),
        });
        assert!(resolved_type_eq(&structs, &ints, &instance(scalar(Scalar::Int))));
        assert!(!resolved_type_eq(&structs, &ints, &bytes));
        assert!(!resolved_type_implict_to(&structs, &ints, &bytes));
        assert!(!resolved_type_implict_to(&structs, &bytes, &ints));
        assert!(resolved_type_implict_to(&structs, &open, &ints));
        assert!(resolved_type_implict_to(&structs, &bytes, &open));
        assert!(resolved_type_cast_to(&structs, &ints, &bytes));
    }

    #[test]
    fn generics_accept_anything() {
        let (structs, point, _) = table();
        let generic = ResolvedType::Generic {
            name: "T".into(),
            index: 0,
            owner: NodeId(2),
        };
        let other = ResolvedType::Generic {
            name: "T".into(),
            index: 0,
            owner: NodeId(9),
        };
        assert!(!resolved_type_eq(&structs, &generic, &other));
        assert!(resolved_type_implict_to(&structs, &ResolvedType::StructDecl(point), &generic));
        assert!(resolved_type_implict_to(&structs, &generic, &scalar(Scalar::U8)));
    }

    #[test]
    fn field_types_substitute_generic_arguments() {
        let (structs, _, boxed) = table();
        let instance = ResolvedType::StructRef {
            decl: boxed,
            args: vec![scalar(Scalar::U16)],
            impl_version: 0,
        };
        assert_eq!(structs.field_type(&instance, "value"), Some(scalar(Scalar::U16)));
        assert_eq!(structs.field_type(&instance, "missing"), None);
    }

    #[test]
    fn instances_are_versioned_per_declaration() {
        let mut instances = Instances::new();
        let a = instances.instantiate(StructId(0), vec![scalar(Scalar::Int)]);
        let b = instances.instantiate(StructId(0), vec![scalar(Scalar::U8)]);
        let again = instances.instantiate(StructId(0), vec![scalar(Scalar::Int)]);
        let other = instances.instantiate(StructId(1), vec![scalar(Scalar::Int)]);
        assert_eq!((a, b, again, other), (0, 1, 0, 0));
        assert_eq!(instances.len(), 3);
    }

    #[test]
    fn names_read_like_source() {
        let (structs, _, boxed) = table();
        let ty = ResolvedType::mut_pointer(ResolvedType::StructRef {
            decl: boxed,
            args: vec![scalar(Scalar::Int)],
            impl_version: 0,
        });
        assert_eq!(type_name(&structs, &ty), "Box<int> mut*");
    }
}

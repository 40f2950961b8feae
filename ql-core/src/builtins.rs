//! Built-in scalar types.
//!
//! Every scalar keyword of the language is described once here; the
//! parser, the type model and the C backend all consult this table
//! instead of hard-coding names.

use crate::lexer::TokenKind;

/// Built-in scalar kinds, excluding `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Best-width signed integer.
    Int,
    /// Best-width unsigned integer.
    Uint,
    /// Best-width float.
    Float,
    /// Pointer-sized signed integer.
    Iptr,
    /// Pointer-sized unsigned integer.
    Uptr,
}

/// Numeric family of a scalar; decides which best-width type it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Bool,
    Char,
    Signed,
    Unsigned,
    Float,
    Pointer,
}

/// Metadata about a single scalar keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarDescriptor {
    pub name: &'static str,
    pub token: TokenKind,
    pub scalar: Scalar,
    /// Spelling in generated C.
    pub c_name: &'static str,
    /// Nominal width in bits, used by the widening lattice.
    pub width: u32,
    pub family: Family,
    /// Best-width types only convert within their family (see `types`).
    pub best_width: bool,
    /// printf conversion used when the value is interpolated into a message.
    /// The value is converted to [`Scalar::printf_type`] before it is passed,
    /// so `%lld` stays correct where `int64_t` is `long`.
    pub printf: &'static str,
}

pub const SCALARS: &[ScalarDescriptor] = &[
    ScalarDescriptor {
        name: "bool",
        token: TokenKind::Bool,
        scalar: Scalar::Bool,
        c_name: "bool",
        width: 1,
        family: Family::Bool,
        best_width: false,
        printf: "%d",
    },
    ScalarDescriptor {
        name: "char",
        token: TokenKind::Char,
        scalar: Scalar::Char,
        c_name: "char",
        width: 8,
        family: Family::Char,
        best_width: false,
        printf: "%c",
    },
    ScalarDescriptor {
        name: "i8",
        token: TokenKind::I8,
        scalar: Scalar::I8,
        c_name: "int8_t",
        width: 8,
        family: Family::Signed,
        best_width: false,
        printf: "%d",
    },
    ScalarDescriptor {
        name: "i16",
        token: TokenKind::I16,
        scalar: Scalar::I16,
        c_name: "int16_t",
        width: 16,
        family: Family::Signed,
        best_width: false,
        printf: "%d",
    },
    ScalarDescriptor {
        name: "i32",
        token: TokenKind::I32,
        scalar: Scalar::I32,
        c_name: "int32_t",
        width: 32,
        family: Family::Signed,
        best_width: false,
        printf: "%d",
    },
    ScalarDescriptor {
        name: "i64",
        token: TokenKind::I64,
        scalar: Scalar::I64,
        c_name: "int64_t",
        width: 64,
        family: Family::Signed,
        best_width: false,
        printf: "%lld",
    },
    ScalarDescriptor {
        name: "u8",
        token: TokenKind::U8,
        scalar: Scalar::U8,
        c_name: "uint8_t",
        width: 8,
        family: Family::Unsigned,
        best_width: false,
        printf: "%u",
    },
    ScalarDescriptor {
        name: "u16",
        token: TokenKind::U16,
        scalar: Scalar::U16,
        c_name: "uint16_t",
        width: 16,
        family: Family::Unsigned,
        best_width: false,
        printf: "%u",
    },
    ScalarDescriptor {
        name: "u32",
        token: TokenKind::U32,
        scalar: Scalar::U32,
        c_name: "uint32_t",
        width: 32,
        family: Family::Unsigned,
        best_width: false,
        printf: "%u",
    },
    ScalarDescriptor {
        name: "u64",
        token: TokenKind::U64,
        scalar: Scalar::U64,
        c_name: "uint64_t",
        width: 64,
        family: Family::Unsigned,
        best_width: false,
        printf: "%llu",
    },
    ScalarDescriptor {
        name: "f32",
        token: TokenKind::F32,
        scalar: Scalar::F32,
        c_name: "float",
        width: 32,
        family: Family::Float,
        best_width: false,
        printf: "%f",
    },
    ScalarDescriptor {
        name: "f64",
        token: TokenKind::F64,
        scalar: Scalar::F64,
        c_name: "double",
        width: 64,
        family: Family::Float,
        best_width: false,
        printf: "%f",
    },
    ScalarDescriptor {
        name: "int",
        token: TokenKind::Int,
        scalar: Scalar::Int,
        c_name: "int",
        width: 32,
        family: Family::Signed,
        best_width: true,
        printf: "%d",
    },
    ScalarDescriptor {
        name: "uint",
        token: TokenKind::Uint,
        scalar: Scalar::Uint,
        c_name: "unsigned int",
        width: 32,
        family: Family::Unsigned,
        best_width: true,
        printf: "%u",
    },
    ScalarDescriptor {
        name: "float",
        token: TokenKind::Float,
        scalar: Scalar::Float,
        c_name: "double",
        width: 64,
        family: Family::Float,
        best_width: true,
        printf: "%f",
    },
    ScalarDescriptor {
        name: "iptr",
        token: TokenKind::Iptr,
        scalar: Scalar::Iptr,
        c_name: "intptr_t",
        width: 64,
        family: Family::Pointer,
        best_width: true,
        printf: "%lld",
    },
    ScalarDescriptor {
        name: "uptr",
        token: TokenKind::Uptr,
        scalar: Scalar::Uptr,
        c_name: "uintptr_t",
        width: 64,
        family: Family::Pointer,
        best_width: true,
        printf: "%llu",
    },
];

impl Scalar {
    pub fn descriptor(self) -> &'static ScalarDescriptor {
        // The table is ordered exactly like the enum.
        &SCALARS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn c_name(self) -> &'static str {
        self.descriptor().c_name
    }

    /// The C type the `printf` conversion reads.
    pub fn printf_type(self) -> &'static str {
        match self.descriptor().printf {
            "%lld" => "long long",
            "%llu" => "unsigned long long",
            "%u" => "unsigned int",
            "%f" => "double",
            _ => "int",
        }
    }

    pub fn width(self) -> u32 {
        self.descriptor().width
    }

    pub fn family(self) -> Family {
        self.descriptor().family
    }

    pub fn is_best_width(self) -> bool {
        self.descriptor().best_width
    }

    pub fn is_float(self) -> bool {
        self.family() == Family::Float
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self.family(),
            Family::Signed | Family::Unsigned | Family::Char | Family::Pointer
        )
    }

    /// The best-width type of this scalar's family, if the family has one.
    pub fn best_of_family(self) -> Option<Scalar> {
        match self.family() {
            Family::Signed => Some(Scalar::Int),
            Family::Unsigned => Some(Scalar::Uint),
            Family::Float => Some(Scalar::Float),
            Family::Pointer => Some(self),
            Family::Bool | Family::Char => None,
        }
    }
}

/// Look up a scalar by its keyword token.
pub fn scalar_for_token(token: TokenKind) -> Option<Scalar> {
    SCALARS.iter().find(|d| d.token == token).map(|d| d.scalar)
}

/// Look up a scalar by its source spelling.
pub fn find_scalar(name: &str) -> Option<Scalar> {
    SCALARS.iter().find(|d| d.name == name).map(|d| d.scalar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_enum() {
        for descriptor in SCALARS {
            assert_eq!(descriptor.scalar.descriptor().name, descriptor.name);
        }
    }

    #[test]
    fn finds_scalars_by_token_and_name() {
        assert_eq!(scalar_for_token(TokenKind::U16), Some(Scalar::U16));
        assert_eq!(scalar_for_token(TokenKind::Void), None);
        assert_eq!(find_scalar("uptr"), Some(Scalar::Uptr));
        assert_eq!(Scalar::Uint.c_name(), "unsigned int");
    }

    #[test]
    fn printf_types_match_their_conversions() {
        assert_eq!(Scalar::I64.printf_type(), "long long");
        assert_eq!(Scalar::Uptr.printf_type(), "unsigned long long");
        assert_eq!(Scalar::U32.printf_type(), "unsigned int");
        assert_eq!(Scalar::F32.printf_type(), "double");
        assert_eq!(Scalar::Char.printf_type(), "int");
        for descriptor in SCALARS {
            let wide = descriptor.printf.starts_with("%ll");
            assert_eq!(wide, descriptor.scalar.printf_type().contains("long long"), "{}", descriptor.name);
        }
    }
}

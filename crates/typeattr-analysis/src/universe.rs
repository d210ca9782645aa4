//! The universe scope: predeclared types, constants, `nil` and built-ins.

use std::collections::HashMap;

use crate::obj::{Builtin, ConstValue};
use crate::objects::{ObjKey, ScopeKey, TCObjects, TypeKey};
use crate::scope::{Scope, ScopeKind};
use crate::typ::{BasicDetail, BasicInfo, BasicType};

/// Basic types in the order their names enter the universe. Names with a
/// space cannot be written in source and are never declared.
const BASIC_TYPES: [(BasicType, BasicInfo, &str); 27] = [
    (BasicType::Invalid, BasicInfo::IsInvalid, "invalid type"),
    (BasicType::Bool, BasicInfo::IsBoolean, "bool"),
    (BasicType::Int, BasicInfo::IsInteger, "int"),
    (BasicType::Int8, BasicInfo::IsInteger, "int8"),
    (BasicType::Int16, BasicInfo::IsInteger, "int16"),
    (BasicType::Int32, BasicInfo::IsInteger, "int32"),
    (BasicType::Int64, BasicInfo::IsInteger, "int64"),
    (BasicType::Uint, BasicInfo::IsInteger, "uint"),
    (BasicType::Uint8, BasicInfo::IsInteger, "uint8"),
    (BasicType::Uint16, BasicInfo::IsInteger, "uint16"),
    (BasicType::Uint32, BasicInfo::IsInteger, "uint32"),
    (BasicType::Uint64, BasicInfo::IsInteger, "uint64"),
    (BasicType::Uintptr, BasicInfo::IsInteger, "uintptr"),
    (BasicType::Float32, BasicInfo::IsFloat, "float32"),
    (BasicType::Float64, BasicInfo::IsFloat, "float64"),
    (BasicType::Complex64, BasicInfo::IsComplex, "complex64"),
    (BasicType::Complex128, BasicInfo::IsComplex, "complex128"),
    (BasicType::Str, BasicInfo::IsString, "string"),
    (BasicType::UntypedBool, BasicInfo::IsBoolean, "untyped bool"),
    (BasicType::UntypedInt, BasicInfo::IsInteger, "untyped int"),
    (BasicType::UntypedRune, BasicInfo::IsInteger, "untyped rune"),
    (BasicType::UntypedFloat, BasicInfo::IsFloat, "untyped float"),
    (BasicType::UntypedComplex, BasicInfo::IsComplex, "untyped complex"),
    (BasicType::UntypedString, BasicInfo::IsString, "untyped string"),
    (BasicType::UntypedNil, BasicInfo::IsNil, "untyped nil"),
    (BasicType::Byte, BasicInfo::IsInteger, "byte"),
    (BasicType::Rune, BasicInfo::IsInteger, "rune"),
];

#[derive(Debug, Default)]
pub struct Universe {
    scope: ScopeKey,
    iota: ObjKey,
    byte: TypeKey,
    rune: TypeKey,
    slice_of_bytes: TypeKey,
    no_value_tuple: TypeKey,
    error_type: TypeKey,
    types: HashMap<BasicType, TypeKey>,
}

impl Universe {
    pub(crate) fn new(objs: &mut TCObjects) -> Universe {
        let scope = objs.new_scope(None, ScopeKind::Universe, 0, 0);
        let types = Universe::define_basic_types(scope, objs);
        let byte = types[&BasicType::Byte];
        let rune = types[&BasicType::Rune];
        let error_type = Universe::define_error_type(&types, scope, objs);
        let iota = Universe::define_constants(&types, scope, objs);

        let nil = objs.new_nil(types[&BasicType::UntypedNil]);
        Scope::insert(scope, nil, objs);

        // built-ins have no single signature; calls are checked case by case
        let invalid = types[&BasicType::Invalid];
        for b in Builtin::ALL {
            let okey = objs.new_builtin(b, invalid);
            Scope::insert(scope, okey, objs);
        }

        let slice_of_bytes = objs.new_t_slice(byte);
        let no_value_tuple = objs.new_t_tuple(vec![]);
        Universe {
            scope,
            iota,
            byte,
            rune,
            slice_of_bytes,
            no_value_tuple,
            error_type,
            types,
        }
    }

    pub fn scope(&self) -> ScopeKey {
        self.scope
    }

    pub fn iota(&self) -> ObjKey {
        self.iota
    }

    pub fn byte(&self) -> TypeKey {
        self.byte
    }

    pub fn rune(&self) -> TypeKey {
        self.rune
    }

    pub fn slice_of_bytes(&self) -> TypeKey {
        self.slice_of_bytes
    }

    /// The type of expressions that produce no value.
    pub fn no_value_tuple(&self) -> TypeKey {
        self.no_value_tuple
    }

    pub fn error_type(&self) -> TypeKey {
        self.error_type
    }

    pub fn invalid_type(&self) -> TypeKey {
        self.types[&BasicType::Invalid]
    }

    pub fn types(&self) -> &HashMap<BasicType, TypeKey> {
        &self.types
    }

    fn define_basic_types(scope: ScopeKey, objs: &mut TCObjects) -> HashMap<BasicType, TypeKey> {
        let mut types = HashMap::with_capacity(BASIC_TYPES.len());
        for (typ, info, name) in BASIC_TYPES {
            let tkey = objs.new_t_basic(BasicDetail::new(typ, info, name));
            types.insert(typ, tkey);
            if !name.contains(' ') {
                let okey = objs.new_type_name(0, None, name.to_string(), Some(tkey));
                Scope::insert(scope, okey, objs);
            }
        }
        types
    }

    /// `type error interface { Error() string }`
    fn define_error_type(
        types: &HashMap<BasicType, TypeKey>,
        scope: ScopeKey,
        objs: &mut TCObjects,
    ) -> TypeKey {
        let res = objs.new_param_var(0, None, String::new(), Some(types[&BasicType::Str]));
        let params = objs.new_t_tuple(vec![]);
        let results = objs.new_t_tuple(vec![res]);
        let sig = objs.new_t_signature(None, None, params, results, false);
        let method = objs.new_func(0, None, "Error".to_string(), Some(sig));
        let underlying = objs.new_t_interface(vec![method], vec![]);

        let tname = objs.new_type_name(0, None, "error".to_string(), None);
        let named = objs.new_t_named(Some(tname), Some(underlying), vec![]);
        Scope::insert(scope, tname, objs);
        named
    }

    fn define_constants(
        types: &HashMap<BasicType, TypeKey>,
        scope: ScopeKey,
        objs: &mut TCObjects,
    ) -> ObjKey {
        let ubool = types[&BasicType::UntypedBool];
        for (name, val) in [("true", true), ("false", false)] {
            let okey = objs.new_const(0, None, name.to_string(), Some(ubool), ConstValue::Bool(val));
            Scope::insert(scope, okey, objs);
        }
        let uint = types[&BasicType::UntypedInt];
        let iota = objs.new_const(0, None, "iota".to_string(), Some(uint), ConstValue::with_i64(0));
        Scope::insert(scope, iota, objs);
        iota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::obj_string;
    use crate::typ::type_string;

    #[test]
    fn test_universe_declares_predeclared_names_in_fixed_order() {
        let objs = TCObjects::new();
        let univ = objs.universe();
        let names = objs.scopes[univ.scope()].names();
        assert_eq!(&names[..4], &["bool", "int", "int8", "int16"]);
        assert!(names.contains(&"complex128"));
        assert!(names.contains(&"error"));
        assert!(names.contains(&"nil"));
        assert!(names.contains(&"recover"));
        assert!(!names.iter().any(|n| n.contains(' ')));
    }

    #[test]
    fn test_error_type_shape() {
        let objs = TCObjects::new();
        let univ = objs.universe();
        assert_eq!(type_string(univ.error_type(), &objs), "error");
        let err = objs.scopes[univ.scope()].lookup("error").unwrap();
        assert_eq!(obj_string(err, &objs), "type error interface{Error() string}");
        assert_eq!(type_string(univ.slice_of_bytes(), &objs), "[]byte");
        let iota = objs.lobjs[univ.iota()].const_val().cloned();
        assert_eq!(iota, Some(ConstValue::with_i64(0)));
    }
}

//! Resolved selector expressions.

use std::fmt::{self, Write};

use crate::objects::{ObjKey, TCObjects, TypeKey};
use crate::typ;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` is a struct field.
    FieldVal,
    /// `x.f` is a method bound to the value `x`.
    MethodVal,
    /// `T.f` is a method expression.
    MethodExpr,
}

/// The field or method a selector `x.f` denotes and how it is reached.
#[derive(Clone, Debug)]
pub struct Selection {
    kind: SelectionKind,
    recv: TypeKey,
    obj: ObjKey,
    indices: Vec<usize>,
    indirect: bool,
    typ: TypeKey,
}

impl Selection {
    /// Builds the selection and derives its type: the field type, the
    /// method signature bound to `recv`, or for method expressions the
    /// signature taking `recv` as an extra first parameter.
    pub fn new(
        kind: SelectionKind,
        recv: TypeKey,
        obj: ObjKey,
        indices: Vec<usize>,
        indirect: bool,
        objs: &mut TCObjects,
    ) -> Selection {
        let typ = Selection::eval_type(kind, recv, obj, objs);
        Selection {
            kind,
            recv,
            obj,
            indices,
            indirect,
            typ,
        }
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    /// The type of `x` in `x.f`.
    pub fn recv(&self) -> TypeKey {
        self.recv
    }

    pub fn obj(&self) -> ObjKey {
        self.obj
    }

    pub fn typ(&self) -> TypeKey {
        self.typ
    }

    /// Path from `x` to `f`: the embedded field indices followed by the
    /// index of `f` in its struct, named type or interface.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn indirect(&self) -> bool {
        self.indirect
    }

    fn eval_type(kind: SelectionKind, recv: TypeKey, obj: ObjKey, objs: &mut TCObjects) -> TypeKey {
        let invalid = objs.universe().invalid_type();
        let otyp = objs.lobjs[obj].typ().unwrap_or(invalid);
        if kind == SelectionKind::FieldVal {
            return otyp;
        }
        let Some(sig) = objs.types[otyp].try_as_signature().copied() else {
            return otyp;
        };
        let (pos, pkg, name) = match sig.recv() {
            Some(r) => {
                let r = &objs.lobjs[*r];
                (r.pos(), r.pkg(), r.name().to_string())
            }
            None => (0, objs.lobjs[obj].pkg(), String::new()),
        };
        let rebound = objs.new_param_var(pos, pkg, name, Some(recv));
        match kind {
            SelectionKind::MethodVal => {
                objs.new_t_signature(sig.scope(), Some(rebound), sig.params(), sig.results(), sig.variadic())
            }
            _ => {
                let mut params = vec![rebound];
                params.extend_from_slice(sig.param_vars(objs));
                let params = objs.new_t_tuple(params);
                objs.new_t_signature(sig.scope(), None, params, sig.results(), sig.variadic())
            }
        }
    }

    /// Writes the selection as `field (main.A) b int` or
    /// `method expr (main.A) f(main.A, int)`.
    pub fn fmt(&self, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
        f.write_str(match self.kind {
            SelectionKind::FieldVal => "field (",
            SelectionKind::MethodVal => "method (",
            SelectionKind::MethodExpr => "method expr (",
        })?;
        typ::fmt_type(Some(self.recv), f, objs)?;
        write!(f, ") {}", objs.lobjs[self.obj].name())?;
        match self.kind {
            SelectionKind::FieldVal => {
                f.write_char(' ')?;
                typ::fmt_type(Some(self.typ), f, objs)
            }
            _ => typ::fmt_signature(self.typ, f, objs),
        }
    }

    pub fn display(&self, objs: &TCObjects) -> String {
        let mut s = String::new();
        let _ = self.fmt(&mut s, objs);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typ::BasicType;

    #[test]
    fn test_method_expression_prepends_receiver() {
        let mut objs = TCObjects::new();
        let pkg = objs.new_package("main".to_string());
        let int = objs.universe().types()[&BasicType::Int];
        let empty = objs.new_t_struct(vec![], None);
        let tname = objs.new_type_name(0, Some(pkg), "B".to_string(), None);
        let b = objs.new_t_named(Some(tname), Some(empty), vec![]);

        let recv = objs.new_param_var(0, Some(pkg), String::new(), Some(b));
        let p = objs.new_param_var(0, Some(pkg), String::new(), Some(int));
        let params = objs.new_t_tuple(vec![p]);
        let results = objs.new_t_tuple(vec![]);
        let sig = objs.new_t_signature(None, Some(recv), params, results, false);
        let f = objs.new_func(0, Some(pkg), "f".to_string(), Some(sig));

        let val = Selection::new(SelectionKind::MethodVal, b, f, vec![0], false, &mut objs);
        assert_eq!(val.display(&objs), "method (main.B) f(int)");

        let pb = objs.new_t_pointer(b);
        let expr = Selection::new(SelectionKind::MethodExpr, pb, f, vec![0], true, &mut objs);
        assert_eq!(expr.display(&objs), "method expr (*main.B) f(*main.B, int)");
        assert_eq!(expr.indices(), &[0]);
        assert!(expr.indirect());
    }
}

//! Type checker: compatibility, unification and signature matching.
//!
//! `compatible` is directional: it answers "may a value of `from` be used
//! where `to` is expected", widening `Int` to `Float` and a class to an
//! ancestor. `unify` is the symmetric least upper bound used when two
//! values have to share one type (container elements, reassignment).

use crate::api::ApiSignature;
use crate::error::{Result, TranslateError};
use crate::hierarchy::Hierarchy;
use crate::ty::{Generics, Ty, FLOAT, INT};

/// The type a `from` value takes when used as `to`, or `None`.
///
/// Holes on either side are filled by the other side.
pub fn compatible(from: &Ty, to: &Ty, hierarchy: &Hierarchy) -> Option<Ty> {
    if from == to {
        return Some(to.clone());
    }
    match (from, to) {
        (_, Ty::Any) => Some(from.clone()),
        (_, Ty::Number) => from.is_number().then(|| from.clone()),
        (Ty::Hole, _) => Some(to.clone()),
        (_, Ty::Hole) => Some(from.clone()),
        (Ty::Atom(f), Ty::Atom(t)) => {
            if f == INT && t == FLOAT {
                Some(Ty::float())
            } else if hierarchy.is_class(f) && hierarchy.is_subclass(f, t) {
                Some(to.clone())
            } else {
                None
            }
        }
        (Ty::List(f), Ty::List(t)) => compatible(f, t, hierarchy).map(Ty::list),
        (Ty::Set(f), Ty::Set(t)) => compatible(f, t, hierarchy).map(Ty::set),
        (Ty::Array(f, n), Ty::Array(t, m)) if n == m => {
            compatible(f, t, hierarchy).map(|e| Ty::array(e, *n))
        }
        (Ty::Dictionary(fk, fv), Ty::Dictionary(tk, tv)) => Some(Ty::dictionary(
            compatible(fk, tk, hierarchy)?,
            compatible(fv, tv, hierarchy)?,
        )),
        (Ty::Tuple(fs), Ty::Tuple(ts)) if fs.len() == ts.len() => fs
            .iter()
            .zip(ts)
            .map(|(f, t)| compatible(f, t, hierarchy))
            .collect::<Option<Vec<_>>>()
            .map(Ty::Tuple),
        (Ty::Function(fp, fr), Ty::Function(tp, tr)) if fp.len() == tp.len() => {
            let params = fp
                .iter()
                .zip(tp)
                .map(|(f, t)| compatible(f, t, hierarchy))
                .collect::<Option<Vec<_>>>()?;
            Some(Ty::function(params, compatible(fr, tr, hierarchy)?))
        }
        _ => None,
    }
}

/// [`compatible`], failing with `"{what} from {from} to {to}"`.
pub fn expect_compatible(from: &Ty, to: &Ty, hierarchy: &Hierarchy, what: &str) -> Result<Ty> {
    compatible(from, to, hierarchy).ok_or_else(|| {
        TranslateError::type_check(format!("{} from {} to {}", what, from, to))
            .with_wrong_type(from.clone())
    })
}

/// The least type both `a` and `b` can be used as.
pub fn unify(a: &Ty, b: &Ty, hierarchy: &Hierarchy) -> Option<Ty> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (Ty::Hole, t) | (t, Ty::Hole) => Some(t.clone()),
        (Ty::Atom(x), Ty::Atom(y)) => {
            if a.is_number() && b.is_number() {
                Some(Ty::float())
            } else if hierarchy.is_class(x) && hierarchy.is_class(y) {
                hierarchy.common_ancestor(x, y).map(Ty::atom)
            } else {
                None
            }
        }
        (Ty::List(x), Ty::List(y)) => unify(x, y, hierarchy).map(Ty::list),
        (Ty::Set(x), Ty::Set(y)) => unify(x, y, hierarchy).map(Ty::set),
        (Ty::Array(x, n), Ty::Array(y, m)) if n == m => unify(x, y, hierarchy).map(|e| Ty::array(e, *n)),
        (Ty::Dictionary(xk, xv), Ty::Dictionary(yk, yv)) => Some(Ty::dictionary(
            unify(xk, yk, hierarchy)?,
            unify(xv, yv, hierarchy)?,
        )),
        (Ty::Tuple(xs), Ty::Tuple(ys)) if xs.len() == ys.len() => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| unify(x, y, hierarchy))
            .collect::<Option<Vec<_>>>()
            .map(Ty::Tuple),
        _ => compatible(a, b, hierarchy).or_else(|| compatible(b, a, hierarchy)),
    }
}

/// The outcome of matching a standard API signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SigMatch {
    /// The return type with generics substituted.
    pub ret: Ty,
    /// The receiver's type with holes filled from the arguments, when
    /// the call taught us something new about it.
    pub refined_receiver: Option<Ty>,
}

/// Match `args` against a standard API signature.
///
/// Generic placeholders are bound from the receiver first; a placeholder
/// still unresolved there (an empty container) is bound from the first
/// argument that meets it.
pub fn check_signature(
    sig: &ApiSignature,
    name: &str,
    receiver: Option<&Ty>,
    args: &[Ty],
    hierarchy: &Hierarchy,
) -> Result<SigMatch> {
    let mut generics = receiver.map(Generics::from_receiver).unwrap_or_default();

    let expected = if sig.variadic { args.len() } else { sig.params.len() };
    if args.len() != expected {
        return Err(TranslateError::type_check(format!(
            "{} expects {} args, not {}",
            name,
            expected,
            args.len()
        )));
    }

    for (i, arg) in args.iter().enumerate() {
        let param = if sig.variadic { &sig.params[0] } else { &sig.params[i] };
        if let Ty::Generic(g) = param {
            match generics.get(*g).cloned() {
                None | Some(Ty::Hole) => generics.bind(*g, arg.clone()),
                Some(bound) => {
                    let what = format!("{} can't convert arg {}", name, i);
                    let merged = expect_compatible(arg, &bound, hierarchy, &what)?;
                    if bound.has_holes() {
                        generics.bind(*g, bound.fill_holes(&merged));
                    }
                }
            }
            continue;
        }
        let param = param.substitute(&generics);
        if compatible(arg, &param, hierarchy).is_none() {
            return Err(TranslateError::type_check(format!(
                "{} expected {} not {}",
                name, param, arg
            ))
            .with_wrong_type(arg.clone()));
        }
    }

    let refined_receiver = receiver
        .filter(|r| r.has_holes())
        .map(|r| r.fill_holes(&generics.receiver_shape(r)))
        .filter(|refined| Some(refined) != receiver);

    Ok(SigMatch {
        ret: sig.ret.substitute(&generics),
        refined_receiver,
    })
}

/// Match call arguments against a user signature's parameters.
///
/// Unresolved parameters take the argument's type; resolved ones must
/// accept it. Returns the parameter list after the call.
pub fn check_params(params: &[Ty], args: &[Ty], name: &str, hierarchy: &Hierarchy) -> Result<Vec<Ty>> {
    if params.len() != args.len() {
        return Err(TranslateError::type_check(format!(
            "{} expects {} args, not {}",
            name,
            params.len(),
            args.len()
        )));
    }
    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            if *param == Ty::Hole {
                Ok(arg.clone())
            } else {
                expect_compatible(arg, param, hierarchy, &format!("can't convert {} arg {}", name, i))
            }
        })
        .collect()
}

impl Generics {
    /// The receiver's constructor rebuilt from the current bindings, with
    /// holes where a placeholder is unbound.
    fn receiver_shape(&self, receiver: &Ty) -> Ty {
        use crate::ty::Generic;
        let bound = |g: Generic| self.get(g).cloned().unwrap_or(Ty::Hole);
        match receiver {
            Ty::List(_) => Ty::list(bound(Generic::T)),
            Ty::Set(_) => Ty::set(bound(Generic::T)),
            Ty::Array(_, n) => Ty::array(bound(Generic::T), *n),
            Ty::Dictionary(..) => Ty::dictionary(bound(Generic::K), bound(Generic::V)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiTables;

    fn classes() -> Hierarchy {
        let mut h = Hierarchy::new();
        h.declare_class("Animal", None);
        h.declare_class("Dog", Some("Animal"));
        h.declare_class("Cat", Some("Animal"));
        h
    }

    #[test]
    fn widening_is_directional() {
        let h = Hierarchy::new();
        assert_eq!(compatible(&Ty::int(), &Ty::float(), &h), Some(Ty::float()));
        assert_eq!(compatible(&Ty::float(), &Ty::int(), &h), None);
    }

    #[test]
    fn subclass_widens_to_ancestor() {
        let h = classes();
        assert_eq!(compatible(&Ty::atom("Dog"), &Ty::atom("Animal"), &h), Some(Ty::atom("Animal")));
        assert_eq!(compatible(&Ty::atom("Animal"), &Ty::atom("Dog"), &h), None);
        assert_eq!(unify(&Ty::atom("Dog"), &Ty::atom("Cat"), &h), Some(Ty::atom("Animal")));
    }

    #[test]
    fn parametric_types_match_pointwise() {
        let h = Hierarchy::new();
        assert_eq!(
            compatible(&Ty::list(Ty::Hole), &Ty::list(Ty::string()), &h),
            Some(Ty::list(Ty::string()))
        );
        assert_eq!(compatible(&Ty::list(Ty::int()), &Ty::set(Ty::int()), &h), None);
        assert_eq!(compatible(&Ty::array(Ty::int(), 2), &Ty::array(Ty::int(), 3), &h), None);
        assert_eq!(
            unify(&Ty::dictionary(Ty::string(), Ty::int()), &Ty::dictionary(Ty::Hole, Ty::float()), &h),
            Some(Ty::dictionary(Ty::string(), Ty::float()))
        );
    }

    #[test]
    fn generics_bind_from_receiver() {
        let api = ApiTables::standard();
        let h = Hierarchy::new();
        let push = api.signature("List", "push").unwrap();
        let ints = Ty::list(Ty::int());
        let m = check_signature(push, "List#push", Some(&ints), &[Ty::int()], &h).unwrap();
        assert_eq!(m.ret, Ty::void());
        assert_eq!(m.refined_receiver, None);

        let err = check_signature(push, "List#push", Some(&ints), &[Ty::string()], &h).unwrap_err();
        insta::assert_snapshot!(err.message, @"List#push can't convert arg 0 from String to Int");
    }

    #[test]
    fn empty_receiver_is_refined_by_argument() {
        let api = ApiTables::standard();
        let h = Hierarchy::new();
        let push = api.signature("List", "push").unwrap();
        let m = check_signature(push, "List#push", Some(&Ty::list(Ty::Hole)), &[Ty::string()], &h).unwrap();
        assert_eq!(m.refined_receiver, Some(Ty::list(Ty::string())));
    }

    #[test]
    fn number_and_variadic_parameters() {
        let api = ApiTables::standard();
        let h = Hierarchy::new();
        let sin = api.signature("math", "sin").unwrap();
        assert!(check_signature(sin, "math:sin", None, &[Ty::int()], &h).is_ok());
        assert!(check_signature(sin, "math:sin", None, &[Ty::string()], &h).is_err());
        let display = api.signature("io", "display").unwrap();
        let m = check_signature(display, "io:display", None, &[Ty::int(), Ty::string()], &h).unwrap();
        assert_eq!(m.ret, Ty::void());
    }

    #[test]
    fn user_params_fill_then_check() {
        let h = Hierarchy::new();
        let params = check_params(&[Ty::Hole, Ty::float()], &[Ty::string(), Ty::int()], "f", &h).unwrap();
        assert_eq!(params, vec![Ty::string(), Ty::float()]);
        assert!(check_params(&[Ty::int()], &[Ty::float()], "f", &h).is_err());
        assert!(check_params(&[Ty::int()], &[], "f", &h).is_err());
    }
}

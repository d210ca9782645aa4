//! Diagnostic definitions for the checker.
//!
//! Every error the checker reports carries a [`TypeError`] code. The codes
//! are grouped by range so a driver can filter by phase.

use thiserror::Error;
use typeattr_common::{Diagnostic, FileId, Span};

/// Checker error codes (2xxx range).
///
/// Error code ranges:
/// - 2000-2099: Collection phase errors
/// - 2100-2199: Resolution phase errors
/// - 2200-2299: General type errors
/// - 2300-2399: Operator errors
/// - 2400-2499: Builtin function errors
/// - 2500-2599: Index, slice and selector errors
/// - 2600-2699: Assignment errors
/// - 2700-2799: Control flow errors
/// - 2800-2899: Channel errors
/// - 2900-2999: Composite literal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TypeError {
    // === Collection Phase (2000-2099) ===
    /// Identifier redeclared in the same block.
    Redeclared = 2000,
    /// `:=` without a new variable on the left.
    NoNewVariables = 2001,
    /// The importer could not provide a package.
    ImportFailed = 2002,
    /// Files of one package disagree on the package name.
    MismatchedPkgName = 2003,
    /// Receiver is not a defined type of this package.
    InvalidRecv = 2004,
    /// Method or field declared twice on one type.
    DuplicateMethod = 2005,

    // === Resolution Phase (2100-2199) ===
    Undeclared = 2100,
    NotAType = 2101,
    InvalidRecursiveType = 2102,
    /// Map key type is not comparable.
    InvalidMapKey = 2103,
    InvalidArrayLength = 2104,
    /// Package-level initialization refers back to itself.
    InitCycle = 2105,
    /// Declaration depends on its own type or value.
    InvalidDeclCycle = 2106,

    // === General Type Errors (2200-2299) ===
    /// A type, built-in or valueless call used where a value is needed.
    NotAnExpr = 2200,
    NotCallable = 2201,
    WrongArgCount = 2202,
    /// A value is not assignable to the destination type.
    TypeMismatch = 2203,
    WrongResultCount = 2204,
    InvalidConversion = 2205,
    /// A constant conversion whose value does not fit the target type.
    ConversionRange = 2206,
    /// A constant overflows or is truncated by its type.
    NumericOverflow = 2207,
    /// A multi-value expression where a single value is expected.
    TooManyValues = 2208,
    /// Constant declaration initialized by a non-constant.
    NotConstant = 2209,
    /// Expression evaluated only for its side effects is not used.
    UnusedExpr = 2210,

    // === Operator Errors (2300-2399) ===
    InvalidOp = 2300,
    MismatchedTypes = 2301,
    DivisionByZero = 2302,
    InvalidShiftCount = 2303,
    InvalidShiftOperand = 2304,

    // === Builtin Function Errors (2400-2499) ===
    InvalidBuiltinCall = 2400,

    // === Index, Slice and Selector Errors (2500-2599) ===
    NonIndexable = 2500,
    InvalidIndex = 2501,
    NonSliceable = 2502,
    /// `x.f` where `f` is neither a field nor a method of `x`.
    UnresolvedSelector = 2510,
    /// `x.f` where `f` is reachable at one depth along several paths.
    AmbiguousSelector = 2511,
    InvalidMethodExpr = 2512,
    /// `pkg.Name` where `Name` is not an exported member of `pkg`.
    UnexportedName = 2513,

    // === Assignment Errors (2600-2699) ===
    UnassignableOperand = 2600,
    AssignCountMismatch = 2601,

    // === Control Flow Errors (2700-2799) ===
    InvalidCond = 2700,
    InvalidRangeExpr = 2701,
    InvalidAssertion = 2702,
    ImpossibleAssert = 2703,
    InvalidTypeSwitch = 2704,
    DuplicateDefault = 2706,
    DuplicateCase = 2707,

    // === Channel Errors (2800-2899) ===
    InvalidSend = 2800,
    InvalidReceive = 2801,

    // === Composite Literal Errors (2900-2999) ===
    InvalidLit = 2900,
    UnknownField = 2901,
    DuplicateLitField = 2902,
    MixedStructLit = 2903,
    DuplicateLitKey = 2904,
}

impl TypeError {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Short description of the error class.
    pub fn message(self) -> &'static str {
        match self {
            TypeError::Redeclared => "redeclared in this block",
            TypeError::NoNewVariables => "no new variables on left side of :=",
            TypeError::ImportFailed => "could not import package",
            TypeError::MismatchedPkgName => "package name mismatch",
            TypeError::InvalidRecv => "invalid receiver",
            TypeError::DuplicateMethod => "method already declared",

            TypeError::Undeclared => "undeclared name",
            TypeError::NotAType => "is not a type",
            TypeError::InvalidRecursiveType => "invalid recursive type",
            TypeError::InvalidMapKey => "invalid map key type",
            TypeError::InvalidArrayLength => "invalid array length",
            TypeError::InitCycle => "initialization cycle",
            TypeError::InvalidDeclCycle => "invalid declaration cycle",

            TypeError::NotAnExpr => "is not an expression",
            TypeError::NotCallable => "cannot call non-function",
            TypeError::WrongArgCount => "wrong number of arguments",
            TypeError::TypeMismatch => "cannot use value as destination type",
            TypeError::WrongResultCount => "wrong number of return values",
            TypeError::InvalidConversion => "cannot convert",
            TypeError::ConversionRange => "constant out of range for conversion",
            TypeError::NumericOverflow => "constant overflow",
            TypeError::TooManyValues => "multiple-value in single-value context",
            TypeError::NotConstant => "is not constant",
            TypeError::UnusedExpr => "is not used",

            TypeError::InvalidOp => "invalid operation",
            TypeError::MismatchedTypes => "mismatched types",
            TypeError::DivisionByZero => "division by zero",
            TypeError::InvalidShiftCount => "invalid shift count",
            TypeError::InvalidShiftOperand => "shifted operand must be integer",

            TypeError::InvalidBuiltinCall => "invalid built-in call",

            TypeError::NonIndexable => "cannot index",
            TypeError::InvalidIndex => "invalid index",
            TypeError::NonSliceable => "cannot slice",
            TypeError::UnresolvedSelector => "no field or method",
            TypeError::AmbiguousSelector => "ambiguous selector",
            TypeError::InvalidMethodExpr => "invalid method expression",
            TypeError::UnexportedName => "name not exported by package",

            TypeError::UnassignableOperand => "cannot assign",
            TypeError::AssignCountMismatch => "assignment mismatch",

            TypeError::InvalidCond => "non-boolean condition",
            TypeError::InvalidRangeExpr => "cannot range over",
            TypeError::InvalidAssertion => "invalid type assertion",
            TypeError::ImpossibleAssert => "impossible type assertion",
            TypeError::InvalidTypeSwitch => "invalid type switch",
            TypeError::DuplicateDefault => "multiple defaults",
            TypeError::DuplicateCase => "duplicate case",

            TypeError::InvalidSend => "invalid send",
            TypeError::InvalidReceive => "invalid receive",

            TypeError::InvalidLit => "invalid composite literal",
            TypeError::UnknownField => "unknown field in struct literal",
            TypeError::DuplicateLitField => "duplicate field in struct literal",
            TypeError::MixedStructLit => "mixture of field:value and value elements in struct literal",
            TypeError::DuplicateLitKey => "duplicate key in literal",
        }
    }
}

/// One error found while checking a package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CheckError {
    pub code: TypeError,
    pub span: Span,
    pub message: String,
    /// Soft errors do not invalidate the checked construct.
    pub soft: bool,
}

impl CheckError {
    pub fn new(code: TypeError, span: Span, message: impl Into<String>) -> CheckError {
        CheckError {
            code,
            span,
            message: message.into(),
            soft: false,
        }
    }

    pub fn soft(mut self) -> CheckError {
        self.soft = true;
        self
    }

    /// Converts to the shared diagnostic type, labelled in `file_id`.
    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic {
        let diag = if self.soft {
            Diagnostic::warning(self.message.clone())
        } else {
            Diagnostic::error(self.message.clone())
        };
        diag.with_code(self.code.code())
            .with_label(file_id, self.span, self.code.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TypeError::Redeclared.code(), 2000);
        assert_eq!(TypeError::Undeclared.code(), 2100);
        assert_eq!(TypeError::NotAnExpr.code(), 2200);
        assert_eq!(TypeError::InvalidOp.code(), 2300);
        assert_eq!(TypeError::InvalidBuiltinCall.code(), 2400);
        assert_eq!(TypeError::NonIndexable.code(), 2500);
        assert_eq!(TypeError::AmbiguousSelector.code(), 2511);
        assert_eq!(TypeError::UnassignableOperand.code(), 2600);
        assert_eq!(TypeError::InvalidCond.code(), 2700);
        assert_eq!(TypeError::InvalidSend.code(), 2800);
        assert_eq!(TypeError::InvalidLit.code(), 2900);
    }

    #[test]
    fn test_check_error_to_diagnostic() {
        let err = CheckError::new(TypeError::Undeclared, Span::new(10, 13), "undeclared name: foo");
        assert_eq!(err.to_string(), "undeclared name: foo");
        let diag = err.to_diagnostic(0);
        assert!(diag.is_error());
        assert_eq!(diag.code(), Some(2100));
        assert_eq!(diag.message(), "undeclared name: foo");
        assert_eq!(diag.spans().collect::<Vec<_>>(), vec![Span::new(10, 13)]);
    }

    #[test]
    fn test_soft_errors_become_warnings() {
        let err = CheckError::new(TypeError::NoNewVariables, Span::point(4), "no new variables").soft();
        assert!(err.soft);
        assert!(!err.to_diagnostic(1).is_error());
    }
}

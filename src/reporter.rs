//! Error reporter (§7): accumulates semantic errors without aborting the
//! checker, then renders them with a source line and column caret.
//!
//! Grounded in `examples/original_source/src/error/{err_type,err_report}.hpp`:
//! the same three-tier severity split (lexical / syntactic / semantic), the
//! same "scope name" field carried by semantic errors, and the same
//! `--->`/line/caret rendering, re-expressed in the teacher's
//! `String`-error idiom instead of an exception hierarchy.

use std::fmt;

use crate::source::{Position, SourceFile};

/// Semantic error kinds, named per spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemErrorKind {
    MissingRetval,
    RetTypeMismatch,
    TypeInferenceFailure,
    TypeMismatch,
    UnexpectedExprType,
    BreakCtxError,
    BreakTypeMismatch,
    ContinueCtxError,
    UndeclaredVar,
    UninitializedVar,
    OutOfBoundsAccess,
    AssignImmutable,
    AssignMismatch,
    IncomparableTypes,
    NonComputableTypes,
    CallUndeclaredFunc,
    ArgCntMismatch,
    ArgTypeMismatch,
    MissingElse,
    DuplicateFunction,
}

impl fmt::Display for SemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemErrorKind::MissingRetval => "missing-retval",
            SemErrorKind::RetTypeMismatch => "ret-type-mismatch",
            SemErrorKind::TypeInferenceFailure => "type-inference-failure",
            SemErrorKind::TypeMismatch => "type-mismatch",
            SemErrorKind::UnexpectedExprType => "unexpected-expr-type",
            SemErrorKind::BreakCtxError => "break-ctx-error",
            SemErrorKind::BreakTypeMismatch => "break-type-mismatch",
            SemErrorKind::ContinueCtxError => "continue-ctx-error",
            SemErrorKind::UndeclaredVar => "undeclared-var",
            SemErrorKind::UninitializedVar => "uninitialized-var",
            SemErrorKind::OutOfBoundsAccess => "out-of-bounds-access",
            SemErrorKind::AssignImmutable => "assign-immutable",
            SemErrorKind::AssignMismatch => "assign-mismatch",
            SemErrorKind::IncomparableTypes => "incomparable-types",
            SemErrorKind::NonComputableTypes => "non-computable-types",
            SemErrorKind::CallUndeclaredFunc => "call-undeclared-func",
            SemErrorKind::ArgCntMismatch => "arg-cnt-mismatch",
            SemErrorKind::ArgTypeMismatch => "arg-type-mismatch",
            SemErrorKind::MissingElse => "missing-else",
            SemErrorKind::DuplicateFunction => "duplicate-function",
        };
        write!(f, "{}", s)
    }
}

/// A single accumulated semantic error.
#[derive(Debug, Clone)]
pub struct SemError {
    pub kind: SemErrorKind,
    pub message: String,
    pub pos: Position,
    pub scope: String,
    pub details: Option<String>,
}

/// A non-hard diagnostic: code after a statement that always returns.
#[derive(Debug, Clone)]
pub struct Unreachable {
    pub pos: Position,
    pub scope: String,
}

/// Accumulates semantic errors and unreachable-code diagnostics across a
/// full checking pass. The checker never aborts early on a `SemError`;
/// only an internal invariant violation panics.
pub struct Reporter<'a> {
    source: &'a SourceFile,
    errors: Vec<SemError>,
    unreachable: Vec<Unreachable>,
}

impl<'a> Reporter<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Reporter {
            source,
            errors: Vec::new(),
            unreachable: Vec::new(),
        }
    }

    pub fn report(
        &mut self,
        kind: SemErrorKind,
        message: impl Into<String>,
        pos: Position,
        scope: impl Into<String>,
    ) {
        self.errors.push(SemError {
            kind,
            message: message.into(),
            pos,
            scope: scope.into(),
            details: None,
        });
    }

    pub fn report_with_details(
        &mut self,
        kind: SemErrorKind,
        message: impl Into<String>,
        pos: Position,
        scope: impl Into<String>,
        details: impl Into<String>,
    ) {
        self.errors.push(SemError {
            kind,
            message: message.into(),
            pos,
            scope: scope.into(),
            details: Some(details.into()),
        });
    }

    pub fn report_unreachable(&mut self, pos: Position, scope: impl Into<String>) {
        self.unreachable.push(Unreachable {
            pos,
            scope: scope.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[SemError] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Render every accumulated error/diagnostic to a single string, in the
    /// `err_report.cpp` layout: severity tag, cause, `scope: (row, col)`,
    /// source line with caret, optional Details line, and a trailing count.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.errors {
            out.push_str(&format!("Semantic Error[{}]: {}\n", e.kind, e.message));
            out.push_str(&format!(
                " ---> {}: {}\n",
                e.scope,
                Position::new(e.pos.row, e.pos.col)
            ));
            out.push_str("   |\n");
            out.push_str(&format!("{:<3}| {}\n", e.pos.row + 1, self.source.line(e.pos.row)));
            let caret_offset = 3 + 2 + e.pos.col;
            out.push_str(&format!("   |{}^\n", " ".repeat(caret_offset.saturating_sub(4))));
            if let Some(details) = &e.details {
                out.push_str(&format!("   = Details: {}\n", details));
            }
            out.push('\n');
        }
        for u in &self.unreachable {
            out.push_str(&format!(
                "Semantic Warning[unreachable-code]: statement is unreachable\n ---> {}: {}\n\n",
                u.scope,
                Position::new(u.pos.row, u.pos.col)
            ));
        }
        out.push_str(&format!("{} error(s) reported\n", self.errors.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_without_aborting() {
        let src = SourceFile::new("t.rvi", "let x = 1;\nx = 2;\n");
        let mut r = Reporter::new(&src);
        r.report(
            SemErrorKind::AssignImmutable,
            "cannot assign twice to immutable variable `x`",
            Position::new(1, 0),
            "main",
        );
        r.report(SemErrorKind::UndeclaredVar, "undeclared", Position::new(0, 0), "main");
        assert!(r.has_errors());
        assert_eq!(r.error_count(), 2);
        let rendered = r.render();
        assert!(rendered.contains("assign-immutable"));
        assert!(rendered.contains("2 error(s) reported"));
    }
}

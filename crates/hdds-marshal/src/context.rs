// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-declaration generation state.
//!
//! A [`GenerationContext`] lives for exactly one declaration and one target
//! layout. It owns the indentation level, the loop-counter naming scope, the
//! direction currently being emitted and the diagnostics collected so far.
//! Nothing in it is shared between declarations.

use crate::config::TargetLayout;
use crate::error::Diagnostic;

/// Which artifact is being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToTransfer,
    FromTransfer,
    Release,
    Encode,
    Decode,
    Initialize,
}

pub struct GenerationContext {
    declaration: String,
    target: TargetLayout,
    direction: Direction,
    indent: usize,
    indent_unit: String,
    loop_prefix: String,
    loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl GenerationContext {
    pub fn new(declaration: impl Into<String>, target: TargetLayout) -> Self {
        Self {
            declaration: declaration.into(),
            target,
            direction: Direction::ToTransfer,
            indent: 0,
            indent_unit: "    ".to_string(),
            loop_prefix: "i".to_string(),
            loop_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_indent_width(mut self, spaces: usize) -> Self {
        self.indent_unit = " ".repeat(spaces);
        self
    }

    #[must_use]
    pub fn with_loop_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.loop_prefix = prefix.into();
        self
    }

    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    pub fn target(&self) -> TargetLayout {
        self.target
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        if direction != self.direction {
            tracing::trace!("{}: emitting {:?}", self.declaration, direction);
        }
        self.direction = direction;
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn set_indent_level(&mut self, level: usize) {
        self.indent = level;
    }

    // --- diagnostics ---

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(direction = ?self.direction, "{}", diagnostic);
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // --- loop counters ---

    /// Allocate the counter name for the next nested loop level.
    ///
    /// Names are derived from the nesting depth, so sibling loops reuse
    /// `i0` while a loop nested inside another always gets a fresh name.
    pub fn push_index(&mut self) -> String {
        let name = format!("{}{}", self.loop_prefix, self.loop_depth);
        self.loop_depth += 1;
        name
    }

    pub fn pop_index(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    pub fn loop_depth(&self) -> usize {
        self.loop_depth
    }

    // --- text emission ---

    /// Append one indented line.
    pub fn line(&self, out: &mut String, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                out.push_str(&self.indent_unit);
            }
            out.push_str(text);
        }
        out.push('\n');
    }

    pub fn blank_line(&self, out: &mut String) {
        out.push('\n');
    }

    /// Write `header`, an opening brace on its own line, and indent.
    pub fn open(&mut self, out: &mut String, header: impl AsRef<str>) {
        self.line(out, header);
        self.open_bare(out);
    }

    /// Open an anonymous scope block.
    pub fn open_bare(&mut self, out: &mut String) {
        self.line(out, "{");
        self.indent += 1;
    }

    pub fn close(&mut self, out: &mut String) {
        self.close_with(out, "}");
    }

    pub fn close_with(&mut self, out: &mut String, closing: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(out, closing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> GenerationContext {
        GenerationContext::new("Demo::Type", TargetLayout::Jagged)
    }

    #[test]
    fn test_blocks_indent_and_dedent() {
        let mut ctx = ctx();
        let mut out = String::new();
        ctx.open(&mut out, "class Foo");
        ctx.line(&mut out, "int x;");
        ctx.open(&mut out, "void Bar()");
        ctx.line(&mut out, "x = 1;");
        ctx.close(&mut out);
        ctx.close(&mut out);

        assert_eq!(
            out,
            "class Foo\n{\n    int x;\n    void Bar()\n    {\n        x = 1;\n    }\n}\n"
        );
        assert_eq!(ctx.indent_level(), 0);
    }

    #[test]
    fn test_index_names_follow_nesting_depth() {
        let mut ctx = ctx().with_loop_prefix("k");
        let outer = ctx.push_index();
        let inner = ctx.push_index();
        ctx.pop_index();
        let sibling = ctx.push_index();
        assert_eq!((outer.as_str(), inner.as_str()), ("k0", "k1"));
        assert_eq!(sibling, "k1");
    }

    #[test]
    fn test_empty_line_has_no_trailing_whitespace() {
        let mut ctx = ctx().with_indent_width(2);
        ctx.set_indent_level(3);
        let mut out = String::new();
        ctx.line(&mut out, "");
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_diagnostics_are_deduplicated() {
        let mut ctx = ctx();
        let diag = Diagnostic::ExtendedPrecisionLoss {
            declaration: "Demo::Type".into(),
            field: "value".into(),
        };
        ctx.warn(diag.clone());
        ctx.warn(diag);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.take_diagnostics().len(), 1);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_direction_follows_emitted_artifact() {
        let mut ctx = ctx();
        assert_eq!(ctx.direction(), Direction::ToTransfer);
        ctx.set_direction(Direction::Release);
        ctx.set_direction(Direction::Release);
        assert_eq!(ctx.direction(), Direction::Release);
    }
}

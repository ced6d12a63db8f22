// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Index-Loop Synthesizer.
//!
//! Emits `for` nests over fixed array dimensions and the jagged row
//! allocations needed before a deeper index can be assigned. Loop bounds
//! are always the literal dimension sizes of the array type.

use crate::context::GenerationContext;
use crate::error::GenResult;

/// Row allocation emitted between loop levels when the destination is a
/// jagged (`T[][]`) array.
#[derive(Debug, Clone, Copy)]
pub struct JaggedAllocation<'a> {
    /// Expression naming the outermost array (`this.grid`).
    pub target: &'a str,
    /// Element value type (`float`).
    pub element_type: &'a str,
    /// Full dimensions of the array.
    pub dims: &'a [u32],
}

impl JaggedAllocation<'_> {
    /// Statement allocating the row at `indices`.
    ///
    /// `indices.len()` is the level being allocated and must be below the rank.
    pub fn row(&self, indices: &[String]) -> String {
        let level = indices.len();
        let remaining = self.dims.len().saturating_sub(level + 1);
        format!(
            "{} = new {}[{}]{};",
            jagged_access(self.target, indices),
            self.element_type,
            self.dims.get(level).copied().unwrap_or_default(),
            "[]".repeat(remaining)
        )
    }
}

/// Emit one loop per dimension, dimension 0 outermost, and call `body`
/// inside the innermost loop with the counter names.
///
/// Loops are closed and counters released even when `body` fails.
pub fn emit_nested_loops<F>(
    ctx: &mut GenerationContext,
    out: &mut String,
    dims: &[u32],
    jagged: Option<&JaggedAllocation<'_>>,
    body: F,
) -> GenResult<()>
where
    F: FnOnce(&mut GenerationContext, &mut String, &[String]) -> GenResult<()>,
{
    let mut indices: Vec<String> = Vec::with_capacity(dims.len());
    for (level, dim) in dims.iter().enumerate() {
        let index = ctx.push_index();
        ctx.open(out, format!("for (int {index} = 0; {index} < {dim}; ++{index})"));
        indices.push(index);
        if let Some(alloc) = jagged {
            if level + 1 < alloc.dims.len() {
                ctx.line(out, alloc.row(&indices));
            }
        }
    }

    let result = body(ctx, out, &indices);

    for _ in dims {
        ctx.close(out);
        ctx.pop_index();
    }
    result
}

/// Allocate every row of a jagged array down to the innermost level,
/// without visiting the elements themselves.
pub fn emit_jagged_rows(
    ctx: &mut GenerationContext,
    out: &mut String,
    alloc: &JaggedAllocation<'_>,
) -> GenResult<()> {
    let Some((_, outer)) = alloc.dims.split_last() else {
        return Ok(());
    };
    if outer.is_empty() {
        return Ok(());
    }
    // The nest allocates each level as it opens; nothing is left for the body.
    emit_nested_loops(ctx, out, outer, Some(alloc), |_, _, _| Ok(()))
}

/// Emit a single loop running `0..bound`, where `bound` is a C# expression.
pub fn emit_counted_loop<F>(
    ctx: &mut GenerationContext,
    out: &mut String,
    bound: &str,
    body: F,
) -> GenResult<()>
where
    F: FnOnce(&mut GenerationContext, &mut String, &str) -> GenResult<()>,
{
    let index = ctx.push_index();
    ctx.open(out, format!("for (int {index} = 0; {index} < {bound}; ++{index})"));
    let result = body(ctx, out, &index);
    ctx.close(out);
    ctx.pop_index();
    result
}

/// `base[i0][i1]...`
pub fn jagged_access(base: &str, indices: &[String]) -> String {
    let mut access = String::from(base);
    for index in indices {
        access.push('[');
        access.push_str(index);
        access.push(']');
    }
    access
}

/// Row-major strides: the element distance between consecutive values of
/// each index.
pub fn strides(dims: &[u32]) -> Vec<u64> {
    let mut strides = vec![1u64; dims.len()];
    for level in (0..dims.len().saturating_sub(1)).rev() {
        strides[level] = strides[level + 1].saturating_mul(u64::from(dims[level + 1]));
    }
    strides
}

/// Row-major flat index expression, e.g. `(i0 * 12) + (i1 * 4) + i2`.
pub fn flat_index(dims: &[u32], indices: &[String]) -> String {
    let terms: Vec<String> = strides(dims)
        .into_iter()
        .zip(indices)
        .map(|(stride, index)| {
            if stride == 1 {
                index.clone()
            } else {
                format!("({index} * {stride})")
            }
        })
        .collect();
    terms.join(" + ")
}

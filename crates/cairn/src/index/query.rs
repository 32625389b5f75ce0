//! Range compilation: logical key ranges into flat-store scan predicates.
//!
//! A compiled query carries two layers. The [`ScanQuery`] holds what the flat
//! store can evaluate on raw bytes: non-null checks, encoded-bound
//! comparisons, and (for multi-entry indexes) a coarse containment prefilter.
//! The logical [`KeyRange`] rides along for the fetch engine's exact
//! membership re-check — for multi-entry matching the prefilter can
//! over-match (a packed composite may contain an element's bytes inside a
//! longer frame), so the re-check is authoritative and the prefilter is only
//! a row-pruning optimization.

use cairn_core::{Key, KeyRange};
use cairn_store::{CompareOp, Direction, Predicate, ScanQuery};

use crate::error::{EngineError, EngineResult};

/// How a query will be consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Counting only: no ordering directive is emitted.
    pub count_only: bool,
    /// A concrete key/range argument is required (`get`/`get_key`).
    pub null_disallowed: bool,
}

/// The compiled form of one index query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Predicates and ordering the flat store evaluates.
    pub scan: ScanQuery,
    /// The index's physical column.
    pub column: String,
    /// The authoritative logical range; `None` matches every entry.
    pub range: Option<KeyRange>,
    /// Whether rows hold packed composite key sets.
    pub multi_entry: bool,
}

/// Compile a logical range against one index column.
///
/// # Errors
///
/// Returns [`EngineError::Data`] when `null_disallowed` is set and no range
/// was supplied, and [`EngineError::InvalidKey`] if a bound key cannot be
/// encoded.
pub fn compile(
    column: &str,
    multi_entry: bool,
    range: Option<&KeyRange>,
    opts: QueryOptions,
) -> EngineResult<CompiledQuery> {
    if opts.null_disallowed && range.is_none() {
        return Err(EngineError::data("a key or range argument is required"));
    }

    // Unpopulated entries never match anything.
    let mut scan = ScanQuery::new().with_predicate(Predicate::IsNotNull {
        column: column.to_string(),
    });

    if let Some(range) = range {
        if multi_entry {
            // Only an exact-key lookup gets a usable prefilter; a general
            // range gives the flat store nothing byte-comparable to prune on.
            if range.is_only() {
                if let Some(key) = &range.lower {
                    scan = scan.with_predicate(Predicate::Contains {
                        column: column.to_string(),
                        needle: key.encode()?,
                    });
                }
            }
        } else {
            if let Some(lower) = &range.lower {
                scan = scan.with_predicate(Predicate::Compare {
                    column: column.to_string(),
                    op: if range.lower_open { CompareOp::Gt } else { CompareOp::Ge },
                    value: lower.encode()?,
                });
            }
            if let Some(upper) = &range.upper {
                scan = scan.with_predicate(Predicate::Compare {
                    column: column.to_string(),
                    op: if range.upper_open { CompareOp::Lt } else { CompareOp::Le },
                    value: upper.encode()?,
                });
            }
        }
    }

    // Multi-entry ordering is by logical element, which the store cannot
    // produce from packed composites; the fetch engine sorts those itself.
    if !opts.count_only && !multi_entry {
        scan = scan.order_by(column, Direction::Forward);
    }

    Ok(CompiledQuery {
        scan,
        column: column.to_string(),
        range: range.cloned(),
        multi_entry,
    })
}

/// Compile a candidate-list membership lookup against a multi-entry column:
/// one containment prefilter per candidate, OR-ed together. Used by
/// equality/disjunction lookups; each candidate still gets the exact re-check
/// at fetch time.
pub fn compile_candidates(column: &str, candidates: &[Key]) -> EngineResult<ScanQuery> {
    let mut branches = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        branches.push(Predicate::Contains {
            column: column.to_string(),
            needle: candidate.encode()?,
        });
    }
    Ok(ScanQuery::new()
        .with_predicate(Predicate::IsNotNull {
            column: column.to_string(),
        })
        .with_predicate(Predicate::AnyOf(branches)))
}

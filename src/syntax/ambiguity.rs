// Registration-time ambiguity analysis

use crate::error::SyntaxConflict;
use crate::syntax::Syntax;
use std::sync::Arc;

/// Pairwise static check over the syntaxes of one command
///
/// Two syntaxes are ambiguous when they need the same number of tokens and
/// no position holds two literals with different text. Value ranges are not
/// considered, so two integer arguments with disjoint bounds still conflict.
pub struct AmbiguityChecker<'a, S> {
    syntaxes: &'a [Arc<Syntax<S>>],
}

impl<'a, S> AmbiguityChecker<'a, S> {
    pub fn of(syntaxes: &'a [Arc<Syntax<S>>]) -> Self {
        Self { syntaxes }
    }

    /// Every conflicting pair, in registration order
    pub fn find_ambiguity(&self) -> Vec<SyntaxConflict> {
        let mut conflicts = Vec::new();

        for (i, first) in self.syntaxes.iter().enumerate() {
            for (j, second) in self.syntaxes.iter().enumerate().skip(i + 1) {
                if Self::ambiguous(first, second) {
                    conflicts.push(SyntaxConflict {
                        first_index: i,
                        second_index: j,
                        first_usage: first.usage(),
                        second_usage: second.usage(),
                    });
                }
            }
        }

        conflicts
    }

    /// Symmetric pairwise test
    pub fn ambiguous(first: &Syntax<S>, second: &Syntax<S>) -> bool {
        if first.required_length() != second.required_length() {
            return false;
        }

        let distinguishable = first
            .arguments()
            .iter()
            .zip(second.arguments())
            .any(|(a, b)| a.is_literal() && b.is_literal() && !a.id().eq_ignore_ascii_case(b.id()));

        !distinguishable
    }
}

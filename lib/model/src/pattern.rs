use crate::{
    InvalidVariableError, NamedNodePattern, Term, TermPattern, Triple, TriplePattern, Variable,
};
use std::fmt::{Display, Formatter};

/// One of the three slots of a triple or a triple pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

impl TriplePosition {
    /// All positions in the order subject, predicate, object.
    pub const ALL: [TriplePosition; 3] = [
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ];

    /// Returns the term that `triple` holds at this position.
    pub fn term_of(self, triple: &Triple) -> Term {
        match self {
            TriplePosition::Subject => triple.subject.clone().into(),
            TriplePosition::Predicate => triple.predicate.clone().into(),
            TriplePosition::Object => triple.object.clone(),
        }
    }

    /// Returns the variable that `pattern` holds at this position, if the slot is a variable.
    pub fn variable_of(self, pattern: &TriplePattern) -> Option<&Variable> {
        match self {
            TriplePosition::Subject => term_pattern_variable(&pattern.subject),
            TriplePosition::Predicate => match &pattern.predicate {
                NamedNodePattern::Variable(v) => Some(v),
                NamedNodePattern::NamedNode(_) => None,
            },
            TriplePosition::Object => term_pattern_variable(&pattern.object),
        }
    }
}

impl Display for TriplePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TriplePosition::Subject => f.write_str("subject"),
            TriplePosition::Predicate => f.write_str("predicate"),
            TriplePosition::Object => f.write_str("object"),
        }
    }
}

fn term_pattern_variable(pattern: &TermPattern) -> Option<&Variable> {
    match pattern {
        TermPattern::Variable(v) => Some(v),
        _ => None,
    }
}

/// Creates a [TriplePattern] from its three slots.
pub fn triple_pattern(
    subject: impl Into<TermPattern>,
    predicate: impl Into<NamedNodePattern>,
    object: impl Into<TermPattern>,
) -> TriplePattern {
    TriplePattern {
        subject: subject.into(),
        predicate: predicate.into(),
        object: object.into(),
    }
}

/// Returns the variables of `pattern` in the order of their first occurrence. A variable that
/// occurs multiple times is only returned once.
pub fn pattern_variables(pattern: &TriplePattern) -> Vec<Variable> {
    let mut result: Vec<Variable> = Vec::with_capacity(3);
    for position in TriplePosition::ALL {
        if let Some(variable) = position.variable_of(pattern) {
            if !result.contains(variable) {
                result.push(variable.clone());
            }
        }
    }
    result
}

/// Returns all positions at which `variable` occurs in `pattern`.
pub fn variable_positions<'a>(
    pattern: &'a TriplePattern,
    variable: &'a Variable,
) -> impl Iterator<Item = TriplePosition> + 'a {
    TriplePosition::ALL
        .into_iter()
        .filter(move |position| position.variable_of(pattern) == Some(variable))
}

/// Returns the first position at which `variable` occurs in `pattern`.
pub fn variable_position(
    pattern: &TriplePattern,
    variable: &Variable,
) -> Result<TriplePosition, InvalidVariableError> {
    variable_positions(pattern, variable)
        .next()
        .ok_or_else(|| InvalidVariableError {
            variable: variable.clone(),
            pattern: pattern.clone(),
        })
}

/// Checks whether `triple` is a match of `pattern`.
///
/// Bound slots must be equal to the corresponding term of the triple. Blank nodes in the pattern
/// act as wildcards. A variable that occurs multiple times must be bound to the same term at all
/// of its positions.
pub fn pattern_matches(pattern: &TriplePattern, triple: &Triple) -> bool {
    let predicate_matches = match &pattern.predicate {
        NamedNodePattern::NamedNode(node) => *node == triple.predicate,
        NamedNodePattern::Variable(_) => true,
    };
    predicate_matches
        && term_pattern_matches(&pattern.subject, &TriplePosition::Subject.term_of(triple))
        && term_pattern_matches(&pattern.object, &triple.object)
        && pattern_variables(pattern)
            .iter()
            .all(|v| project(pattern, triple, v).is_some())
}

fn term_pattern_matches(pattern: &TermPattern, term: &Term) -> bool {
    match (pattern, term) {
        (TermPattern::NamedNode(expected), Term::NamedNode(actual)) => expected == actual,
        (TermPattern::Literal(expected), Term::Literal(actual)) => expected == actual,
        (TermPattern::NamedNode(_) | TermPattern::Literal(_), _) => false,
        _ => true,
    }
}

/// Projects `triple` onto `variable` of `pattern`.
///
/// Returns [None] if the variable does not occur in the pattern or if the triple binds the
/// variable to different terms at different positions.
pub fn project(pattern: &TriplePattern, triple: &Triple, variable: &Variable) -> Option<Term> {
    let mut positions = variable_positions(pattern, variable);
    let term = positions.next()?.term_of(triple);
    positions
        .all(|position| position.term_of(triple) == term)
        .then_some(term)
}

use super::{
    Field,
    FieldRef,
    Value,
};
use crate::model::LobbyServer;
use regex::{
    Regex,
    RegexBuilder,
};
use std::collections::HashSet;

/// Conjunction of predicates; an empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the value. On list fields: the list contains the value.
    Eq(Field, Value),
    /// Field matches the regular expression somewhere.
    Regex {
        field: Field,
        pattern: String,
        case_insensitive: bool,
    },
    /// Field (or any element of a list field) is one of the values.
    AnyOf(Field, Vec<String>),
    /// Integer field is less than or equal to the bound.
    Lte(Field, i64),
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Predicate::Eq(field, _) | Predicate::AnyOf(field, _) | Predicate::Lte(field, _) => *field,
            Predicate::Regex { field, .. } => *field,
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn eq(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.push(Predicate::Eq(field, value.into()));
        self
    }

    /// Case insensitive regular expression match.
    pub fn regex(mut self, field: Field, pattern: impl Into<String>) -> Self {
        self.push(Predicate::Regex {
            field,
            pattern: pattern.into(),
            case_insensitive: true,
        });
        self
    }

    pub fn any_of(mut self, field: Field, values: Vec<String>) -> Self {
        self.push(Predicate::AnyOf(field, values));
        self
    }

    pub fn lte(mut self, field: Field, bound: i64) -> Self {
        self.push(Predicate::Lte(field, bound));
        self
    }

    /// Replaces any equality predicate on `field` with `field == value`.
    pub fn set_eq(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.predicates
            .retain(|p| !matches!(p, Predicate::Eq(f, _) if *f == field));
        self.eq(field, value)
    }

    pub(crate) fn compile(&self) -> Result<CompiledFilter, regex::Error> {
        let predicates = self
            .predicates
            .iter()
            .map(|predicate| {
                Ok(match predicate {
                    Predicate::Eq(field, value) => Compiled::Eq(*field, value.clone()),
                    Predicate::Regex {
                        field,
                        pattern,
                        case_insensitive,
                    } => Compiled::Regex(
                        *field,
                        RegexBuilder::new(pattern)
                            .case_insensitive(*case_insensitive)
                            .build()?,
                    ),
                    Predicate::AnyOf(field, values) => Compiled::AnyOf(*field, values.iter().cloned().collect()),
                    Predicate::Lte(field, bound) => Compiled::Lte(*field, *bound),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(CompiledFilter { predicates })
    }
}

/// A filter with its patterns compiled, ready to be evaluated in memory.
pub(crate) struct CompiledFilter {
    predicates: Vec<Compiled>,
}

enum Compiled {
    Eq(Field, Value),
    Regex(Field, Regex),
    AnyOf(Field, HashSet<String>),
    Lte(Field, i64),
}

impl CompiledFilter {
    pub(crate) fn matches(&self, server: &LobbyServer) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(server))
    }
}

impl Compiled {
    fn matches(&self, server: &LobbyServer) -> bool {
        match self {
            Compiled::Eq(field, expected) => match (server.field(*field), expected) {
                (FieldRef::Str(actual), Value::Str(expected)) => actual == expected,
                (FieldRef::Int(actual), Value::Int(expected)) => actual == *expected,
                (FieldRef::Bool(actual), Value::Bool(expected)) => actual == *expected,
                (FieldRef::List(actual), Value::Str(expected)) => actual.contains(expected),
                (FieldRef::List(actual), Value::List(expected)) => actual == expected.as_slice(),
                _ => false,
            },
            Compiled::Regex(field, regex) => match server.field(*field) {
                FieldRef::Str(actual) => regex.is_match(actual),
                FieldRef::List(actual) => actual.iter().any(|v| regex.is_match(v)),
                FieldRef::Int(_) | FieldRef::Bool(_) => false,
            },
            Compiled::AnyOf(field, values) => match server.field(*field) {
                FieldRef::Str(actual) => values.contains(actual),
                FieldRef::List(actual) => actual.iter().any(|v| values.contains(v)),
                FieldRef::Int(_) | FieldRef::Bool(_) => false,
            },
            Compiled::Lte(field, bound) => match server.field(*field) {
                FieldRef::Int(actual) => actual <= *bound,
                _ => false,
            },
        }
    }
}

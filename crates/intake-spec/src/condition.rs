use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::Answer;
use crate::error::IntakeError;
use crate::node::NodeKey;
use crate::user_fields::{GENDER, UserFields};

/// Live state a condition is evaluated against.
pub trait DataSource {
    fn answer_for(&self, question_id: &str) -> Option<&Answer>;
    fn is_question_visible(&self, question_id: &str) -> bool;
    fn question_key(&self, question_id: &str) -> Option<NodeKey>;
    fn user_fields(&self) -> &UserFields;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerPredicate {
    pub question_id: String,
    #[serde(rename = "potential_answers_id", alias = "potential_answer_ids", default)]
    pub potential_answer_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntegerPredicate {
    pub key: String,
    #[serde(alias = "int_value")]
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoolPredicate {
    pub key: String,
    #[serde(alias = "bool_value")]
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    fn apply(self, left: i64, right: i64) -> bool {
        match self {
            CompareOp::Equal => left == right,
            CompareOp::Less => left < right,
            CompareOp::LessOrEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterOrEqual => left >= right,
        }
    }
}

/// Branching predicate attached to screens and questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    AnswerContainsAny(AnswerPredicate),
    AnswerContainsAll(AnswerPredicate),
    AnswerEqualsExact(AnswerPredicate),
    GenderEquals {
        #[serde(alias = "value")]
        gender: String,
    },
    IntegerEqualTo(IntegerPredicate),
    IntegerLessThan(IntegerPredicate),
    IntegerLessThanEqualTo(IntegerPredicate),
    IntegerGreaterThan(IntegerPredicate),
    IntegerGreaterThanEqualTo(IntegerPredicate),
    BoolEquals(BoolPredicate),
    And { operands: Vec<Condition> },
    Or { operands: Vec<Condition> },
    Not { operands: Vec<Condition> },
}

impl Condition {
    pub fn contains_any(question_id: impl Into<String>, ids: &[&str]) -> Self {
        Condition::AnswerContainsAny(AnswerPredicate {
            question_id: question_id.into(),
            potential_answer_ids: ids.iter().map(|id| id.to_string()).collect(),
        })
    }

    /// Checks structural rules that serde cannot express.
    pub fn validate(&self) -> Result<(), IntakeError> {
        match self {
            Condition::Not { operands } if operands.len() != 1 => Err(IntakeError::layout(
                format!("'not' condition requires exactly one operand, found {}", operands.len()),
            )),
            Condition::And { operands } | Condition::Or { operands } | Condition::Not { operands } => {
                operands.iter().try_for_each(Condition::validate)
            }
            Condition::AnswerContainsAny(p)
            | Condition::AnswerContainsAll(p)
            | Condition::AnswerEqualsExact(p)
                if p.question_id.is_empty() =>
            {
                Err(IntakeError::layout("answer condition is missing question_id"))
            }
            _ => Ok(()),
        }
    }

    /// Question ids this condition reads, in declaration order.
    pub fn question_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_question_ids(&mut ids);
        ids
    }

    fn collect_question_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::AnswerContainsAny(p)
            | Condition::AnswerContainsAll(p)
            | Condition::AnswerEqualsExact(p) => {
                if !out.contains(&p.question_id.as_str()) {
                    out.push(&p.question_id);
                }
            }
            Condition::And { operands } | Condition::Or { operands } | Condition::Not { operands } => {
                for operand in operands {
                    operand.collect_question_ids(out);
                }
            }
            _ => {}
        }
    }

    /// Nodes whose state this condition reads.
    pub fn dependencies<D: DataSource + ?Sized>(&self, ds: &D) -> Vec<NodeKey> {
        self.question_ids()
            .into_iter()
            .filter_map(|id| ds.question_key(id))
            .collect()
    }

    /// Rewrites question references through `mapping`, leaving unmapped ids untouched.
    pub fn rewrite_question_ids(&mut self, mapping: &BTreeMap<String, String>) {
        match self {
            Condition::AnswerContainsAny(p)
            | Condition::AnswerContainsAll(p)
            | Condition::AnswerEqualsExact(p) => {
                if let Some(replacement) = mapping.get(&p.question_id) {
                    p.question_id = replacement.clone();
                }
            }
            Condition::And { operands } | Condition::Or { operands } | Condition::Not { operands } => {
                for operand in operands {
                    operand.rewrite_question_ids(mapping);
                }
            }
            _ => {}
        }
    }

    pub fn evaluate<D: DataSource + ?Sized>(&self, ds: &D) -> bool {
        match self {
            Condition::AnswerContainsAny(p) => selected_ids(ds, &p.question_id)
                .is_some_and(|selected| p.potential_answer_ids.iter().any(|id| selected.contains(id.as_str()))),
            Condition::AnswerContainsAll(p) => selected_ids(ds, &p.question_id)
                .is_some_and(|selected| p.potential_answer_ids.iter().all(|id| selected.contains(id.as_str()))),
            Condition::AnswerEqualsExact(p) => selected_ids(ds, &p.question_id).is_some_and(|selected| {
                let expected: BTreeSet<&str> =
                    p.potential_answer_ids.iter().map(String::as_str).collect();
                selected == expected
            }),
            Condition::GenderEquals { gender } => ds
                .user_fields()
                .text(GENDER)
                .is_some_and(|value| value.eq_ignore_ascii_case(gender)),
            Condition::IntegerEqualTo(p) => integer_compare(ds, p, CompareOp::Equal),
            Condition::IntegerLessThan(p) => integer_compare(ds, p, CompareOp::Less),
            Condition::IntegerLessThanEqualTo(p) => integer_compare(ds, p, CompareOp::LessOrEqual),
            Condition::IntegerGreaterThan(p) => integer_compare(ds, p, CompareOp::Greater),
            Condition::IntegerGreaterThanEqualTo(p) => {
                integer_compare(ds, p, CompareOp::GreaterOrEqual)
            }
            Condition::BoolEquals(p) => ds.user_fields().boolean(&p.key) == Some(p.value),
            Condition::And { operands } => operands.iter().all(|c| c.evaluate(ds)),
            Condition::Or { operands } => operands.iter().any(|c| c.evaluate(ds)),
            Condition::Not { operands } => match operands.as_slice() {
                [operand] => !operand.evaluate(ds),
                _ => false,
            },
        }
    }
}

fn integer_compare<D: DataSource + ?Sized>(ds: &D, p: &IntegerPredicate, op: CompareOp) -> bool {
    ds.user_fields()
        .integer(&p.key)
        .is_some_and(|value| op.apply(value, p.value))
}

/// Selected potential answer ids of a visible choice-family question.
fn selected_ids<'a, D: DataSource + ?Sized>(ds: &'a D, question_id: &str) -> Option<BTreeSet<&'a str>> {
    if !ds.is_question_visible(question_id) {
        return None;
    }
    let choice = ds.answer_for(question_id)?.as_choice()?;
    Some(
        choice
            .selections
            .iter()
            .map(|selection| selection.potential_answer_id.as_str())
            .collect(),
    )
}

//! Filter Compiler Tests
//!
//! Wire filter → typed tree → native predicate, evaluated against documents:
//! - Operator semantics for the full operator table
//! - Blank operands reduce to no constraint
//! - Field normalization and operand coercion
//! - Strict and lenient handling of unknown operators

use crmcore::filter::{
    Condition, FilterCompiler, FilterParser, NativePredicate, Operand, OperatorPolicy,
};
use serde_json::{json, Value};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn compile(filter: Value) -> NativePredicate {
    let node = FilterParser::default().parse(&filter).unwrap();
    FilterCompiler::compile_optional(node.as_ref()).unwrap()
}

fn select<'a>(filter: Value, documents: &'a [Value]) -> Vec<&'a Value> {
    let predicate = compile(filter);
    documents.iter().filter(|d| predicate.matches(d)).collect()
}

fn names(selected: &[&Value]) -> Vec<String> {
    selected
        .iter()
        .map(|d| d["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn companies() -> Vec<Value> {
    vec![
        json!({"name": "Acme", "industry": "Software", "size": 50, "tags": ["b2b", "saas"]}),
        json!({"name": "Globex", "industry": "Energy", "size": 500}),
        json!({"name": "Initech", "industry": "software", "size": 10, "tags": ["b2b"]}),
        json!({"name": "Umbrella", "size": 5000}),
    ]
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

/// iLike selects by case-insensitive substring.
#[test]
fn test_ilike_selects_matching_email() {
    let records = vec![json!({"email": "a@acme.com"}), json!({"email": "b@x.com"})];
    let selected = select(json!({"email": {"iLike": "%@acme.com%"}}), &records);
    assert_eq!(selected, vec![&records[0]]);
}

/// A blank leaf inside AND drops out, leaving the other leaf alone.
#[test]
fn test_blank_leaf_reduces_conjunction() {
    let predicate = compile(json!({"and": [{"value": {"gte": 100}}, {"value": {"lte": ""}}]}));
    assert_eq!(
        predicate,
        NativePredicate::field("value", Condition::Gte(Operand::Json(json!(100))))
    );
    assert_eq!(predicate.to_json(), json!({"value": {"$gte": 100}}));
}

// =============================================================================
// Operator Semantics
// =============================================================================

#[test]
fn test_equality_operators() {
    let docs = companies();
    assert_eq!(names(&select(json!({"name": {"eq": "Acme"}}), &docs)), vec!["Acme"]);
    assert_eq!(
        names(&select(json!({"industry": {"neq": "Energy"}}), &docs)),
        vec!["Acme", "Initech", "Umbrella"]
    );
}

#[test]
fn test_comparison_operators() {
    let docs = companies();
    assert_eq!(
        names(&select(json!({"size": {"gt": 50}}), &docs)),
        vec!["Globex", "Umbrella"]
    );
    assert_eq!(
        names(&select(json!({"size": {"gte": 50, "lt": 5000}}), &docs)),
        vec!["Acme", "Globex"]
    );
    assert_eq!(names(&select(json!({"size": {"lte": 10}}), &docs)), vec!["Initech"]);
}

#[test]
fn test_pattern_operators() {
    let docs = companies();
    assert_eq!(
        names(&select(json!({"industry": {"like": "%Soft%"}}), &docs)),
        vec!["Acme"]
    );
    assert_eq!(
        names(&select(json!({"industry": {"iLike": "soft"}}), &docs)),
        vec!["Acme", "Initech"]
    );
    assert_eq!(
        names(&select(json!({"industry": {"notILike": "%soft%"}}), &docs)),
        vec!["Globex", "Umbrella"]
    );
    assert_eq!(
        names(&select(json!({"industry": {"notLike": "Soft"}}), &docs)),
        vec!["Globex", "Initech", "Umbrella"]
    );
}

/// Regex metacharacters in a like operand match literally.
#[test]
fn test_like_operand_is_literal() {
    let docs = vec![json!({"name": "a.c"}), json!({"name": "abc"})];
    assert_eq!(names(&select(json!({"name": {"like": "%a.c%"}}), &docs)), vec!["a.c"]);
}

#[test]
fn test_double_percent_is_no_constraint() {
    assert_eq!(select(json!({"name": {"iLike": "%%"}}), &companies()).len(), 4);
}

#[test]
fn test_set_operators() {
    let docs = companies();
    assert_eq!(
        names(&select(json!({"industry": {"in": ["Energy", "Software"]}}), &docs)),
        vec!["Acme", "Globex"]
    );
    assert_eq!(
        names(&select(json!({"industry": {"notIn": ["Energy", "Software"]}}), &docs)),
        vec!["Initech", "Umbrella"]
    );
    assert_eq!(
        names(&select(json!({"tags": {"in": ["saas"]}}), &docs)),
        vec!["Acme"]
    );
}

#[test]
fn test_existence_operators() {
    let docs = companies();
    assert_eq!(
        names(&select(json!({"tags": {"is": true}}), &docs)),
        vec!["Acme", "Initech"]
    );
    assert_eq!(
        names(&select(json!({"industry": {"isNot": true}}), &docs)),
        vec!["Umbrella"]
    );
}

/// Bounds may arrive in either order; the range is inclusive.
#[test]
fn test_between_is_order_insensitive() {
    let docs = companies();
    let forward = names(&select(json!({"size": {"between": [10, 500]}}), &docs));
    let reversed = names(&select(json!({"size": {"between": [500, 10]}}), &docs));
    assert_eq!(forward, vec!["Acme", "Globex", "Initech"]);
    assert_eq!(forward, reversed);

    assert_eq!(
        names(&select(json!({"size": {"notBetween": [10, 500]}}), &docs)),
        vec!["Umbrella"]
    );
}

#[test]
fn test_between_rejects_wrong_arity() {
    let node = FilterParser::default()
        .parse(&json!({"size": {"between": [1, 2, 3]}}))
        .unwrap()
        .unwrap();
    let err = FilterCompiler::compile(&node).unwrap_err();
    assert_eq!(err.code(), "CRM_FILTER_INVALID_VALUE");
}

#[test]
fn test_or_combinator() {
    let docs = companies();
    let selected = select(
        json!({"or": [{"name": {"eq": "Globex"}}, {"size": {"lt": 20}}]}),
        &docs,
    );
    assert_eq!(names(&selected), vec!["Globex", "Initech"]);
}

// =============================================================================
// Normalization
// =============================================================================

/// `id` segments address `_id` and identifier operands become UUIDs.
#[test]
fn test_id_fields_normalized() {
    let acme = Uuid::new_v4();
    let other = Uuid::new_v4();
    let deals = vec![
        json!({"name": "A", "company": {"_id": acme.to_string()}}),
        json!({"name": "B", "company": {"_id": other.to_string()}}),
    ];

    let selected = select(json!({"company": {"id": {"eq": acme.to_string()}}}), &deals);
    assert_eq!(names(&selected), vec!["A"]);

    let node = FilterParser::default()
        .parse(&json!({"id": {"eq": "not-a-uuid"}}))
        .unwrap()
        .unwrap();
    assert_eq!(
        FilterCompiler::compile(&node).unwrap_err().code(),
        "CRM_FILTER_INVALID_VALUE"
    );
}

/// Date operands compare chronologically against stored timestamps.
#[test]
fn test_date_fields_coerced() {
    let tasks = vec![
        json!({"name": "early", "dueDate": "2024-01-05T00:00:00.000Z"}),
        json!({"name": "late", "dueDate": "2024-03-01T00:00:00.000Z"}),
    ];
    let selected = select(json!({"dueDate": {"gte": "2024-02-01"}}), &tasks);
    assert_eq!(names(&selected), vec!["late"]);

    let node = FilterParser::default()
        .parse(&json!({"createdAt": {"gt": "yesterday"}}))
        .unwrap()
        .unwrap();
    assert!(FilterCompiler::compile(&node).is_err());
}

// =============================================================================
// Operator Policy
// =============================================================================

#[test]
fn test_strict_policy_rejects_unknown_operator() {
    let err = FilterParser::new(OperatorPolicy::Strict)
        .parse(&json!({"name": {"startsWith": "Ac"}}))
        .unwrap_err();
    assert_eq!(err.code(), "CRM_FILTER_INVALID_OPERATOR");
}

#[test]
fn test_lenient_policy_ignores_unknown_operator() {
    let parser = FilterParser::new(OperatorPolicy::Lenient);
    assert_eq!(parser.parse(&json!({"name": {"startsWith": "Ac"}})).unwrap(), None);

    let node = parser
        .parse(&json!({"name": {"startsWith": "Ac", "eq": "Acme"}}))
        .unwrap()
        .unwrap();
    let predicate = FilterCompiler::compile(&node).unwrap();
    assert_eq!(
        predicate,
        NativePredicate::field("name", Condition::Eq(Operand::Json(json!("Acme"))))
    );
}

/// Compiling is pure.
#[test]
fn test_compile_twice_is_equal() {
    let filter = json!({"and": [{"name": {"iLike": "%a%"}}, {"size": {"between": [1, 9]}}]});
    assert_eq!(compile(filter.clone()), compile(filter));
}

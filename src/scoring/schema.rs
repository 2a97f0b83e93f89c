//! Declarative response schema
//!
//! The schema is declared once as a tree of [`SchemaNode`]s. The same tree renders
//! the JSON Schema sent in the provider's `response_format` and validates what the
//! provider sends back. Validation rejects; it never coerces.

use serde_json::{Map, Value, json};

pub const SCHEMA_NAME: &str = "ielts_speech_analysis";
pub const SCHEMA_DESCRIPTION: &str = "Detailed IELTS-aligned speech performance analysis";

const BAND_STEP: f64 = 0.5;

/// One property of an object node
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub required: bool,
    pub node: SchemaNode,
}

#[derive(Debug, Clone)]
pub enum SchemaNode {
    Object {
        description: Option<&'static str>,
        fields: Vec<Field>,
    },
    Array {
        description: &'static str,
        items: Box<SchemaNode>,
    },
    String {
        description: Option<&'static str>,
    },
    Number {
        description: &'static str,
        minimum: Option<f64>,
        maximum: Option<f64>,
        multiple_of: Option<f64>,
    },
}

/// A single mismatch between a value and the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path, `$` is the document root
    pub path: String,
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

fn required(name: &'static str, node: SchemaNode) -> Field {
    Field {
        name,
        required: true,
        node,
    }
}

fn object(description: &'static str, fields: Vec<Field>) -> SchemaNode {
    SchemaNode::Object {
        description: Some(description),
        fields,
    }
}

fn text(description: &'static str) -> SchemaNode {
    SchemaNode::String {
        description: Some(description),
    }
}

fn string_list(description: &'static str) -> SchemaNode {
    SchemaNode::Array {
        description,
        items: Box::new(SchemaNode::String { description: None }),
    }
}

fn band_score(description: &'static str) -> SchemaNode {
    SchemaNode::Number {
        description,
        minimum: Some(1.0),
        maximum: Some(9.0),
        multiple_of: Some(BAND_STEP),
    }
}

/// The five-section IELTS speaking analysis
pub fn analysis_schema() -> SchemaNode {
    SchemaNode::Object {
        description: None,
        fields: vec![
            required(
                "fluency_and_coherence",
                object(
                    "Evaluates the smooth flow of speech and logical organization of ideas",
                    vec![
                        required(
                            "band_score",
                            band_score("IELTS band score for fluency and coherence component (1-9)"),
                        ),
                        required(
                            "strengths",
                            string_list("List of positive aspects in speaker's fluency and coherence"),
                        ),
                        required(
                            "areas_for_improvement",
                            string_list("Specific areas where fluency and coherence can be enhanced"),
                        ),
                        required(
                            "detailed_feedback",
                            text("Comprehensive analysis of fluency and coherence performance"),
                        ),
                    ],
                ),
            ),
            required(
                "lexical_resource",
                object(
                    "Assesses vocabulary range, accuracy, and appropriateness",
                    vec![
                        required(
                            "band_score",
                            band_score("IELTS band score for lexical resource component (1-9)"),
                        ),
                        required(
                            "vocabulary_analysis",
                            object(
                                "Detailed analysis of vocabulary usage",
                                vec![
                                    required(
                                        "sophisticated_terms",
                                        string_list("Advanced vocabulary words used in the speech"),
                                    ),
                                    required(
                                        "collocations",
                                        string_list("Natural word combinations used correctly"),
                                    ),
                                    required(
                                        "idiomatic_expressions",
                                        string_list("Native-like expressions and idioms used"),
                                    ),
                                ],
                            ),
                        ),
                        required(
                            "detailed_feedback",
                            text("Comprehensive analysis of vocabulary usage and effectiveness"),
                        ),
                    ],
                ),
            ),
            required(
                "grammatical_range_and_accuracy",
                object(
                    "Evaluates grammar usage, complexity, and correctness",
                    vec![
                        required(
                            "band_score",
                            band_score("IELTS band score for grammatical range and accuracy (1-9)"),
                        ),
                        required(
                            "structure_analysis",
                            object(
                                "Analysis of grammatical structures used",
                                vec![
                                    required(
                                        "complex_structures",
                                        string_list("Advanced grammatical constructions used correctly"),
                                    ),
                                    required(
                                        "errors",
                                        string_list("Grammatical mistakes identified in the speech"),
                                    ),
                                ],
                            ),
                        ),
                        required(
                            "detailed_feedback",
                            text("Comprehensive analysis of grammatical performance"),
                        ),
                    ],
                ),
            ),
            required(
                "pronunciation",
                object(
                    "Assesses speech clarity, intonation, and sound production",
                    vec![
                        required(
                            "band_score",
                            band_score("IELTS band score for pronunciation component (1-9)"),
                        ),
                        required(
                            "phonetic_analysis",
                            object(
                                "Detailed analysis of pronunciation features",
                                vec![
                                    required(
                                        "clarity_score",
                                        SchemaNode::Number {
                                            description: "Overall clarity score between 0 and 1",
                                            minimum: Some(0.0),
                                            maximum: Some(1.0),
                                            multiple_of: None,
                                        },
                                    ),
                                    required(
                                        "problem_sounds",
                                        string_list("Specific sounds that need improvement"),
                                    ),
                                    required(
                                        "intonation_patterns",
                                        string_list("Analysis of speech rhythm and stress patterns"),
                                    ),
                                ],
                            ),
                        ),
                        required(
                            "detailed_feedback",
                            text("Comprehensive analysis of pronunciation performance"),
                        ),
                    ],
                ),
            ),
            required(
                "overall_assessment",
                object(
                    "Complete evaluation of speaking performance",
                    vec![
                        required(
                            "band_score",
                            band_score("Final IELTS band score averaging all components"),
                        ),
                        required(
                            "key_strengths",
                            string_list("Main strong points across all assessment areas"),
                        ),
                        required(
                            "priority_improvements",
                            string_list("Critical areas requiring immediate attention"),
                        ),
                        required(
                            "summary",
                            text("Overall performance summary and recommendations"),
                        ),
                    ],
                ),
            ),
        ],
    }
}

/// `response_format` body for an OpenAI-compatible chat completion
pub fn response_format(schema: &SchemaNode) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "description": SCHEMA_DESCRIPTION,
            "schema": schema.to_json_schema(),
        }
    })
}

impl SchemaNode {
    /// Render as a JSON Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::Object {
                description,
                fields,
            } => {
                out.insert("type".into(), json!("object"));
                if let Some(d) = description {
                    out.insert("description".into(), json!(d));
                }
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.name.to_string(), f.node.to_json_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(properties));
                let required: Vec<&str> =
                    fields.iter().filter(|f| f.required).map(|f| f.name).collect();
                out.insert("required".into(), json!(required));
            }
            Self::Array { description, items } => {
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), items.to_json_schema());
                out.insert("description".into(), json!(description));
            }
            Self::String { description } => {
                out.insert("type".into(), json!("string"));
                if let Some(d) = description {
                    out.insert("description".into(), json!(d));
                }
            }
            Self::Number {
                description,
                minimum,
                maximum,
                multiple_of,
            } => {
                out.insert("type".into(), json!("number"));
                if let Some(min) = minimum {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    out.insert("maximum".into(), json!(max));
                }
                if let Some(step) = multiple_of {
                    out.insert("multipleOf".into(), json!(step));
                }
                out.insert("description".into(), json!(description));
            }
        }
        Value::Object(out)
    }

    /// Check `value` against this node. Returns every violation found.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        self.check(value, "$", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        let mut fail = |reason: String| {
            out.push(Violation {
                path: path.to_string(),
                reason,
            })
        };

        match self {
            Self::Object { fields, .. } => {
                let Some(map) = value.as_object() else {
                    fail(format!("expected object, got {}", type_name(value)));
                    return;
                };
                for field in fields {
                    let child = format!("{}.{}", path, field.name);
                    match map.get(field.name) {
                        Some(v) => field.node.check(v, &child, out),
                        None if field.required => out.push(Violation {
                            path: child,
                            reason: "missing required field".to_string(),
                        }),
                        None => {}
                    }
                }
            }
            Self::Array { items, .. } => {
                let Some(list) = value.as_array() else {
                    fail(format!("expected array, got {}", type_name(value)));
                    return;
                };
                for (i, item) in list.iter().enumerate() {
                    items.check(item, &format!("{}[{}]", path, i), out);
                }
            }
            Self::String { .. } => {
                if !value.is_string() {
                    fail(format!("expected string, got {}", type_name(value)));
                }
            }
            Self::Number {
                minimum,
                maximum,
                multiple_of,
                ..
            } => {
                let Some(n) = value.as_f64() else {
                    fail(format!("expected number, got {}", type_name(value)));
                    return;
                };
                if let Some(min) = minimum
                    && n < *min
                {
                    fail(format!("{} is below minimum {}", n, min));
                }
                if let Some(max) = maximum
                    && n > *max
                {
                    fail(format!("{} is above maximum {}", n, max));
                }
                if let Some(step) = multiple_of
                    && !is_multiple_of(n, *step)
                {
                    fail(format!("{} is not a multiple of {}", n, step));
                }
            }
        }
    }
}

fn is_multiple_of(n: f64, step: f64) -> bool {
    let ratio = n / step;
    (ratio - ratio.round()).abs() < 1e-9
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! XPath Functions
//!
//! The XPath 1.0 core function library plus `ends-with`, `lower-case` and
//! `upper-case`. Names are resolved to [`Function`] when an expression is
//! compiled; argument counts and types are checked when it is evaluated.

use super::value::{parse_number, XPathValue};
use crate::dom::namespace::ns;
use crate::dom::{node_string_value, DocumentAccess, NodeId, NodeKind};
use crate::error::EvalError;

/// A function known to the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Node set
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    // String
    String,
    Concat,
    StartsWith,
    EndsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    LowerCase,
    UpperCase,
    // Boolean
    Boolean,
    Not,
    True,
    False,
    Lang,
    // Number
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "last" => Function::Last,
            "position" => Function::Position,
            "count" => Function::Count,
            "id" => Function::Id,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "name" => Function::Name,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "ends-with" => Function::EndsWith,
            "contains" => Function::Contains,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "substring" => Function::Substring,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "lower-case" => Function::LowerCase,
            "upper-case" => Function::UpperCase,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "lang" => Function::Lang,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Last => "last",
            Function::Position => "position",
            Function::Count => "count",
            Function::Id => "id",
            Function::LocalName => "local-name",
            Function::NamespaceUri => "namespace-uri",
            Function::Name => "name",
            Function::String => "string",
            Function::Concat => "concat",
            Function::StartsWith => "starts-with",
            Function::EndsWith => "ends-with",
            Function::Contains => "contains",
            Function::SubstringBefore => "substring-before",
            Function::SubstringAfter => "substring-after",
            Function::Substring => "substring",
            Function::StringLength => "string-length",
            Function::NormalizeSpace => "normalize-space",
            Function::Translate => "translate",
            Function::LowerCase => "lower-case",
            Function::UpperCase => "upper-case",
            Function::Boolean => "boolean",
            Function::Not => "not",
            Function::True => "true",
            Function::False => "false",
            Function::Lang => "lang",
            Function::Number => "number",
            Function::Sum => "sum",
            Function::Floor => "floor",
            Function::Ceiling => "ceiling",
            Function::Round => "round",
        }
    }

    /// Accepted argument counts, `None` meaning unbounded
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Last | Function::Position | Function::True | Function::False => (0, Some(0)),
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => (0, Some(1)),
            Function::Count
            | Function::Id
            | Function::LowerCase
            | Function::UpperCase
            | Function::Boolean
            | Function::Not
            | Function::Lang
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => (1, Some(1)),
            Function::StartsWith
            | Function::EndsWith
            | Function::Contains
            | Function::SubstringBefore
            | Function::SubstringAfter => (2, Some(2)),
            Function::Substring => (2, Some(3)),
            Function::Translate => (3, Some(3)),
            Function::Concat => (2, None),
        }
    }
}

/// Call an XPath function
pub fn call<D: DocumentAccess + ?Sized>(
    function: Function,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, EvalError> {
    check_arity(function, args.len())?;

    let value = match function {
        // Node Set Functions
        Function::Last => XPathValue::Number(size as f64),
        Function::Position => XPathValue::Number(position as f64),
        Function::Count => XPathValue::Number(node_set(function, &args[0])?.len() as f64),
        Function::Id => {
            return Err(EvalError::new(
                "id() is not supported: documents are not validated, so no attribute is of type ID",
            ))
        }
        Function::LocalName => XPathValue::String(fn_local_name(doc, target_node(function, &args, context)?)),
        Function::NamespaceUri => XPathValue::String(
            target_node(function, &args, context)?
                .filter(|&id| matches!(doc.kind(id), Some(NodeKind::Element | NodeKind::Attribute)))
                .map(|id| doc.namespace_uri(id).to_string())
                .unwrap_or_default(),
        ),
        Function::Name => XPathValue::String(fn_name(doc, target_node(function, &args, context)?)),

        // String Functions
        Function::String => XPathValue::String(string_arg(doc, &args, context)),
        Function::Concat => XPathValue::String(args.iter().map(|a| a.to_string_value(doc)).collect()),
        Function::StartsWith => {
            let (s, prefix) = two_strings(doc, &args);
            XPathValue::Boolean(s.starts_with(&prefix))
        }
        Function::EndsWith => {
            let (s, suffix) = two_strings(doc, &args);
            XPathValue::Boolean(s.ends_with(&suffix))
        }
        Function::Contains => {
            let (s, pattern) = two_strings(doc, &args);
            XPathValue::Boolean(s.contains(&pattern))
        }
        Function::SubstringBefore => {
            let (s, pattern) = two_strings(doc, &args);
            XPathValue::String(s.find(&pattern).map(|pos| s[..pos].to_string()).unwrap_or_default())
        }
        Function::SubstringAfter => {
            let (s, pattern) = two_strings(doc, &args);
            XPathValue::String(
                s.find(&pattern)
                    .map(|pos| s[pos + pattern.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::Substring => fn_substring(doc, &args),
        Function::StringLength => XPathValue::Number(string_arg(doc, &args, context).chars().count() as f64),
        Function::NormalizeSpace => XPathValue::String(normalize_space(&string_arg(doc, &args, context))),
        Function::Translate => fn_translate(doc, &args),
        Function::LowerCase => XPathValue::String(args[0].to_string_value(doc).to_lowercase()),
        Function::UpperCase => XPathValue::String(args[0].to_string_value(doc).to_uppercase()),

        // Boolean Functions
        Function::Boolean => XPathValue::Boolean(args[0].to_boolean()),
        Function::Not => XPathValue::Boolean(!args[0].to_boolean()),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),
        Function::Lang => XPathValue::Boolean(fn_lang(doc, context, &args[0].to_string_value(doc))),

        // Number Functions
        Function::Number => XPathValue::Number(match args.first() {
            Some(arg) => arg.to_number(doc),
            None => parse_number(&node_string_value(doc, context)),
        }),
        Function::Sum => XPathValue::Number(
            node_set(function, &args[0])?
                .iter()
                .map(|&id| parse_number(&node_string_value(doc, id)))
                .sum(),
        ),
        Function::Floor => XPathValue::Number(args[0].to_number(doc).floor()),
        Function::Ceiling => XPathValue::Number(args[0].to_number(doc).ceil()),
        Function::Round => XPathValue::Number(round(args[0].to_number(doc))),
    };
    Ok(value)
}

fn check_arity(function: Function, count: usize) -> Result<(), EvalError> {
    let (min, max) = function.arity();
    if count >= min && max.is_none_or(|max| count <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("exactly {min}"),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    };
    Err(EvalError::new(format!(
        "{}() expects {expected} argument(s), got {count}",
        function.name()
    )))
}

fn node_set(function: Function, value: &XPathValue) -> Result<&[NodeId], EvalError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(EvalError::new(format!(
            "{}() argument must be a node-set, got {}",
            function.name(),
            other.type_name()
        ))),
    }
}

/// First node of the optional node-set argument, or the context node
fn target_node(function: Function, args: &[XPathValue], context: NodeId) -> Result<Option<NodeId>, EvalError> {
    match args.first() {
        None => Ok(Some(context)),
        Some(arg) => Ok(node_set(function, arg)?.first().copied()),
    }
}

/// Optional string argument, defaulting to the context node's string-value
fn string_arg<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue], context: NodeId) -> String {
    match args.first() {
        Some(arg) => arg.to_string_value(doc),
        None => node_string_value(doc, context),
    }
}

fn two_strings<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> (String, String) {
    (args[0].to_string_value(doc), args[1].to_string_value(doc))
}

fn fn_local_name<D: DocumentAccess + ?Sized>(doc: &D, node: Option<NodeId>) -> String {
    match node.and_then(|id| doc.kind(id).map(|k| (id, k))) {
        Some((id, NodeKind::Element | NodeKind::Attribute | NodeKind::Declaration)) => doc.local_name(id).to_string(),
        _ => String::new(),
    }
}

fn fn_name<D: DocumentAccess + ?Sized>(doc: &D, node: Option<NodeId>) -> String {
    match node.and_then(|id| doc.kind(id).map(|k| (id, k))) {
        Some((id, NodeKind::Element | NodeKind::Attribute)) => match doc.prefix(id) {
            "" => doc.local_name(id).to_string(),
            prefix => format!("{prefix}:{}", doc.local_name(id)),
        },
        Some((id, NodeKind::Declaration)) => doc.local_name(id).to_string(),
        _ => String::new(),
    }
}

/// Characters at 1-based positions p with round(start) <= p < round(start) + round(len)
fn fn_substring<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> XPathValue {
    let s = args[0].to_string_value(doc);
    let start = round(args[1].to_number(doc));
    let end = args.get(2).map(|len| start + round(len.to_number(doc)));

    let result = s
        .chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= start && end.is_none_or(|end| p < end)
        })
        .map(|(_, c)| c)
        .collect();
    XPathValue::String(result)
}

fn fn_translate<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> XPathValue {
    let s = args[0].to_string_value(doc);
    let from: Vec<char> = args[1].to_string_value(doc).chars().collect();
    let to: Vec<char> = args[2].to_string_value(doc).chars().collect();

    let result = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    XPathValue::String(result)
}

fn normalize_space(s: &str) -> String {
    s.split([' ', '\t', '\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Nearest `xml:lang` on the node or its ancestors, matched case-insensitively
/// either exactly or as a prefix followed by `-`
fn fn_lang<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, target: &str) -> bool {
    let target = target.to_lowercase();
    let mut current = Some(context);
    while let Some(id) = current {
        let Some(node) = doc.get_node(id) else {
            return false;
        };
        if node.is_element() {
            let lang = node
                .attribute_ids()
                .find(|&a| doc.local_name(a) == "lang" && doc.namespace_uri(a) == ns::XML);
            if let Some(attr) = lang {
                let lang = doc.value(attr).to_lowercase();
                return lang == target
                    || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
            }
        }
        current = node.parent;
    }
    false
}

/// XPath round(): halves round towards positive infinity
fn round(n: f64) -> f64 {
    if !n.is_finite() || n == 0.0 {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    // exact for every finite n, unlike n + 0.5
    let floor = n.floor();
    if n - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

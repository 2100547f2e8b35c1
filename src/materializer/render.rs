//! Canonical request layout: one selection per line, two-space indentation,
//! closing braces on their own line. The Retrier relies on this layout to
//! find selection blocks by indentation.

use async_graphql_parser::types::{
    Directive, DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql_parser::{parse_query, Positioned};

use crate::errors::FuzzError;

const INDENT: &str = "  ";

/// Parses a request and re-prints it in the canonical layout.
pub fn prettify(payload: &str) -> Result<String, FuzzError> {
    let document = parse_query(payload).map_err(|e| FuzzError::InvalidPayload(format!("{e}: {payload}")))?;
    Ok(print_document(&document))
}

/// Whether `selection` (including its braces) parses as a selection set.
pub fn is_valid_selection(selection: &str) -> bool {
    parse_query(format!("query STUFF {selection}")).is_ok()
}

pub fn is_valid_request(payload: &str) -> bool {
    parse_query(payload).is_ok()
}

/// Strips empty braces and doubled commas left behind by partial expansions.
pub fn clean_output_selectors(selection: &str) -> String {
    let mut current = selection.to_string();
    loop {
        let next = current
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(",,", ",")
            .replace("{ }", "")
            .replace("{}", "")
            .replace(", }", " }");
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

pub fn print_document(document: &ExecutableDocument) -> String {
    let mut out = String::new();
    match &document.operations {
        DocumentOperations::Single(op) => print_operation(None, &op.node, &mut out),
        DocumentOperations::Multiple(ops) => {
            let mut named: Vec<_> = ops.iter().collect();
            named.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
            for (name, op) in named {
                print_operation(Some(name.as_str()), &op.node, &mut out);
            }
        }
    }

    let mut fragments: Vec<_> = document.fragments.iter().collect();
    fragments.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    for (name, fragment) in fragments {
        out.push_str(&format!("fragment {} on {}", name, fragment.node.type_condition.node.on.node));
        print_directives(&fragment.node.directives, &mut out);
        out.push(' ');
        print_selection_set(&fragment.node.selection_set.node, 0, &mut out);
        out.push('\n');
    }

    out.trim_end().to_string()
}

fn print_operation(name: Option<&str>, op: &OperationDefinition, out: &mut String) {
    out.push_str(match op.ty {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    });
    if let Some(name) = name {
        out.push(' ');
        out.push_str(name);
    }
    if !op.variable_definitions.is_empty() {
        let vars: Vec<String> = op
            .variable_definitions
            .iter()
            .map(|v| {
                let mut def = format!("${}: {}", v.node.name.node, v.node.var_type.node);
                if let Some(default) = &v.node.default_value {
                    def.push_str(&format!(" = {}", default.node));
                }
                def
            })
            .collect();
        out.push_str(&format!("({})", vars.join(", ")));
    }
    print_directives(&op.directives, out);
    out.push(' ');
    print_selection_set(&op.selection_set.node, 0, out);
    out.push('\n');
}

fn print_selection_set(set: &SelectionSet, indent: usize, out: &mut String) {
    out.push_str("{\n");
    for item in &set.items {
        print_selection(&item.node, indent + 1, out);
    }
    out.push_str(&INDENT.repeat(indent));
    out.push('}');
}

fn print_selection(selection: &Selection, indent: usize, out: &mut String) {
    out.push_str(&INDENT.repeat(indent));
    match selection {
        Selection::Field(field) => {
            let field = &field.node;
            if let Some(alias) = &field.alias {
                out.push_str(&format!("{}: ", alias.node));
            }
            out.push_str(field.name.node.as_str());
            if !field.arguments.is_empty() {
                let args: Vec<String> = field
                    .arguments
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name.node, value.node))
                    .collect();
                out.push_str(&format!("({})", args.join(", ")));
            }
            print_directives(&field.directives, out);
            if !field.selection_set.node.items.is_empty() {
                out.push(' ');
                print_selection_set(&field.selection_set.node, indent, out);
            }
        }
        Selection::FragmentSpread(spread) => {
            out.push_str(&format!("...{}", spread.node.fragment_name.node));
            print_directives(&spread.node.directives, out);
        }
        Selection::InlineFragment(fragment) => {
            out.push_str("...");
            if let Some(condition) = &fragment.node.type_condition {
                out.push_str(&format!(" on {}", condition.node.on.node));
            }
            print_directives(&fragment.node.directives, out);
            out.push(' ');
            print_selection_set(&fragment.node.selection_set.node, indent, out);
        }
    }
    out.push('\n');
}

fn print_directives(directives: &[Positioned<Directive>], out: &mut String) {
    for directive in directives {
        out.push_str(&format!(" @{}", directive.node.name.node));
        if !directive.node.arguments.is_empty() {
            let args: Vec<String> = directive
                .node
                .arguments
                .iter()
                .map(|(name, value)| format!("{}: {}", name.node, value.node))
                .collect();
            out.push_str(&format!("({})", args.join(", ")));
        }
    }
}

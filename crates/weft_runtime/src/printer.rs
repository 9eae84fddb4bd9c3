//! SDL printer.

use crate::schema::Schema;
use crate::types::{FieldDefinition, InputValue, NamedType, TypeRef};
use indexmap::IndexMap;
use std::fmt::Write;
use weft_core::Map;

/// Prints every non-built-in type of the schema in registration order.
#[must_use]
pub fn print_schema(schema: &Schema) -> String {
    let mut blocks = Vec::new();

    if let Some(description) = schema.description() {
        let mut block = String::new();
        print_description(&mut block, description, "");
        block.push_str("schema {\n");
        let _ = writeln!(block, "  query: {}", schema.get(schema.query()).name());
        if let Some(mutation) = schema.mutation() {
            let _ = writeln!(block, "  mutation: {}", schema.get(mutation).name());
        }
        if let Some(subscription) = schema.subscription() {
            let _ = writeln!(block, "  subscription: {}", schema.get(subscription).name());
        }
        block.push('}');
        blocks.push(block);
    }

    for (index, ty) in schema.types() {
        if !schema.is_builtin(index) {
            blocks.push(print_type(schema, ty));
        }
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn print_type(schema: &Schema, ty: &NamedType) -> String {
    let mut out = String::new();
    if let Some(description) = ty.description() {
        print_description(&mut out, description, "");
    }

    match ty {
        NamedType::Scalar(scalar) => {
            let _ = write!(out, "scalar {}", scalar.name);
        }
        NamedType::Object(object) => {
            let _ = write!(out, "type {}", object.name);
            if !object.interfaces.is_empty() {
                let names: Vec<_> = object
                    .interfaces
                    .iter()
                    .map(|i| schema.get(*i).name())
                    .collect();
                let _ = write!(out, " implements {}", names.join(" & "));
            }
            for key in &object.keys {
                let _ = write!(out, " @key(fields: {})", quote(key));
            }
            print_fields(&mut out, schema, &object.fields);
        }
        NamedType::Interface(interface) => {
            let _ = write!(out, "interface {}", interface.name);
            print_fields(&mut out, schema, &interface.fields);
        }
        NamedType::Union(union) => {
            let members: Vec<_> = union.members.iter().map(|m| schema.get(*m).name()).collect();
            let _ = write!(out, "union {} = {}", union.name, members.join(" | "));
        }
        NamedType::Enum(enum_type) => {
            let _ = writeln!(out, "enum {} {{", enum_type.name);
            for value in enum_type.values.values() {
                if let Some(description) = &value.description {
                    print_description(&mut out, description, "  ");
                }
                let _ = write!(out, "  {}", value.name);
                print_deprecated(&mut out, value.deprecation_reason.as_deref());
                out.push('\n');
            }
            out.push('}');
        }
        NamedType::InputObject(input) => {
            let _ = writeln!(out, "input {} {{", input.name);
            for field in input.fields.values() {
                if let Some(description) = &field.description {
                    print_description(&mut out, description, "  ");
                }
                out.push_str("  ");
                print_input_value(&mut out, schema, field);
                out.push('\n');
            }
            out.push('}');
        }
    }

    out
}

fn print_fields(out: &mut String, schema: &Schema, fields: &IndexMap<String, FieldDefinition>) {
    if fields.is_empty() {
        return;
    }
    out.push_str(" {\n");
    for field in fields.values() {
        if let Some(description) = &field.description {
            print_description(out, description, "  ");
        }
        let _ = write!(out, "  {}", field.name);
        if !field.arguments.is_empty() {
            out.push('(');
            for (i, argument) in field.arguments.values().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_input_value(out, schema, argument);
            }
            out.push(')');
        }
        let _ = write!(out, ": {}", schema.display_type(&field.ty));
        print_deprecated(out, field.deprecation_reason.as_deref());
        out.push('\n');
    }
    out.push('}');
}

fn print_input_value(out: &mut String, schema: &Schema, value: &InputValue) {
    let _ = write!(out, "{}: {}", value.name, schema.display_type(&value.ty));
    if let Some(default) = &value.default_value {
        out.push_str(" = ");
        print_value(out, schema, default, &value.ty);
    }
}

fn print_deprecated(out: &mut String, reason: Option<&str>) {
    if let Some(reason) = reason {
        let _ = write!(out, " @deprecated(reason: {})", quote(reason));
    }
}

fn print_description(out: &mut String, description: &str, indent: &str) {
    if description.contains('\n') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in description.lines() {
            let _ = writeln!(out, "{indent}{}", line.replace("\"\"\"", "\\\"\"\""));
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        let _ = writeln!(out, "{indent}{}", quote(description));
    }
}

/// Prints a `Map` as a GraphQL literal of the given type.
fn print_value(out: &mut String, schema: &Schema, value: &Map, ty: &TypeRef) {
    let is_enum = matches!(schema.get(ty.named()), NamedType::Enum(_));
    let fields = match schema.get(ty.named()) {
        NamedType::InputObject(input) => Some(&input.fields),
        _ => None,
    };

    match value {
        Map::Null => out.push_str("null"),
        Map::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Map::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Map::Double(d) => {
            let _ = write!(out, "{d:?}");
        }
        Map::String(s) if is_enum => out.push_str(s),
        Map::String(s) => out.push_str(&quote(s)),
        Map::Array(items) => {
            let item_ty = list_item(ty);
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_value(out, schema, item, item_ty);
            }
            out.push(']');
        }
        Map::Object(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{key}: ");
                match fields.and_then(|fields| fields.get(key)) {
                    Some(field) => print_value(out, schema, item, &field.ty),
                    None => out.push_str(&item.to_string()),
                }
            }
            out.push('}');
        }
    }
}

fn list_item(ty: &TypeRef) -> &TypeRef {
    match ty {
        TypeRef::NonNull(inner) => list_item(inner),
        TypeRef::List(inner) => inner,
        TypeRef::Named(_) => ty,
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

//! JSON interchange format for symbol graphs.
//!
//! These types exist solely for serde deserialization; they are fed through
//! [`GraphBuilder`] so a JSON graph gets exactly the same validation as one
//! built in code.
//!
//! ```json
//! {
//!   "builtins": ["java.."],
//!   "builtin-types": ["int", "void"],
//!   "symbols": [
//!     { "kind": "class", "name": "app.controller.OrderController" },
//!     { "kind": "field", "name": "service", "declared-in": "app.controller.OrderController",
//!       "type": "app.service.OrderService", "annotations": ["Autowired"] }
//!   ],
//!   "edges": [
//!     { "from": "app.controller.OrderController.service", "to": "app.service.OrderService",
//!       "kind": "field-type" }
//!   ]
//! }
//! ```

use super::{EdgeKind, GraphBuilder, GraphError, Symbol, SymbolGraph, SymbolKind};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GraphDto {
    #[serde(default)]
    builtins: Vec<String>,
    #[serde(default)]
    builtin_types: Vec<String>,
    #[serde(default)]
    symbols: Vec<SymbolDto>,
    #[serde(default)]
    edges: Vec<EdgeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SymbolDto {
    kind: SymbolKind,
    /// Qualified name for classes, simple name for members.
    name: String,
    #[serde(default)]
    declared_in: Option<String>,
    #[serde(default)]
    annotations: Vec<String>,
    #[serde(default)]
    supertypes: Vec<String>,
    /// Field type or method return type.
    #[serde(default, rename = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EdgeDto {
    from: String,
    to: String,
    #[serde(default)]
    kind: EdgeKind,
    #[serde(default)]
    external: bool,
}

fn convert_symbol(dto: SymbolDto) -> Result<Symbol, GraphError> {
    let symbol = match (dto.kind, dto.declared_in.as_deref()) {
        (SymbolKind::Class, _) => Symbol::class(dto.name),
        (SymbolKind::Field, Some(class)) => Symbol::field(class, &dto.name),
        (SymbolKind::Method, Some(class)) => Symbol::method(class, &dto.name),
        (kind, None) => {
            return Err(GraphError::MissingDeclaringClass {
                kind,
                member: dto.name,
            })
        }
    };
    let symbol = match dto.type_name {
        Some(type_name) => symbol.with_type(type_name),
        None => symbol,
    };
    let symbol = dto
        .annotations
        .into_iter()
        .fold(symbol, Symbol::with_annotation);
    Ok(dto
        .supertypes
        .into_iter()
        .fold(symbol, Symbol::with_supertype))
}

pub(super) fn parse(content: &str) -> Result<SymbolGraph, GraphError> {
    let dto: GraphDto = serde_json::from_str(content)?;

    let builder = dto
        .builtins
        .into_iter()
        .fold(GraphBuilder::new(), GraphBuilder::builtin);
    let mut builder = dto
        .builtin_types
        .into_iter()
        .fold(builder, GraphBuilder::builtin_type);

    for symbol in dto.symbols {
        builder = builder.symbol(convert_symbol(symbol)?);
    }
    for edge in dto.edges {
        builder = if edge.external {
            builder.external_edge(edge.from, edge.to, edge.kind)
        } else {
            builder.edge(edge.from, edge.to, edge.kind)
        };
    }

    builder.build()
}

//! Custom-field values versus the document's declarations.

use crate::fixer::{FixContext, FixOutcome, Fixer};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::Node;

/// Drops `Custom` values whose field is not declared for the node's class
/// (a declaration on a superclass counts).
#[derive(Debug, Default)]
pub struct CustomFieldPruner;

impl Fixer for CustomFieldPruner {
    fn name(&self) -> &'static str {
        "custom-field-pruner"
    }

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let class = node.class().to_string();
        let removed = node.retain_customs(|name| ctx.header.is_declared(&class, name));
        let guid = node.guid();
        for name in removed {
            let line = format!("Removed value of undeclared custom field '{name}' from {class} {guid}");
            log_now(log, guid, &line);
        }
        FixOutcome::Keep
    }
}

/// Adds `<Custom name=".." val="0"/>` for declared integer and date fields
/// the node lacks.
#[derive(Debug, Default)]
pub struct CustomFieldDefaults;

impl Fixer for CustomFieldDefaults {
    fn name(&self) -> &'static str {
        "custom-field-defaults"
    }

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let missing: Vec<String> = ctx
            .header
            .fields_for(node.class())
            .filter(|d| d.kind.is_value_typed() && !node.has_custom(&d.name))
            .map(|d| d.name.clone())
            .collect();
        let guid = node.guid();
        for name in missing {
            node.push_custom_val(&name, "0");
            let line = format!("Added default value 0 for custom field '{name}' to {} {guid}", node.class());
            log_now(log, guid, &line);
        }
        FixOutcome::Keep
    }
}

//! Baseline referential integrity. Runs first in the standard pipeline.
//!
//! Owner attributes are made to agree with the index, references to nodes
//! that are missing or being deleted are dropped (unless a later fixer has
//! claimed or redirected them), duplicate alternatives are collapsed, legacy
//! writing-system tags are normalized and unreadable dates are reset.

use crate::decisions::Decisions;
use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::dates::{is_date_property, parse_date, ZERO_DATE};
use mendgraph_model::wstag::normalize_ws_tag;
use mendgraph_model::{Element, Guid, Node};
use std::collections::{BTreeMap, HashSet};

pub const NAME: &str = "baseline";

const ALTERNATIVE_ELEMENTS: &[&str] = &["AUni", "AStr"];

#[derive(Debug, Default)]
pub struct BaselineFixer {
    normalizations: BTreeMap<String, String>,
}

impl BaselineFixer {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_tags(&mut self, element: &Element) {
        if let Some(ws) = element.attr("ws") {
            if !self.normalizations.contains_key(ws) {
                if let Some(canonical) = normalize_ws_tag(ws) {
                    self.normalizations.insert(ws.to_string(), canonical);
                }
            }
        }
        for child in element.elements() {
            self.collect_tags(child);
        }
    }
}

impl Fixer for BaselineFixer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        self.collect_tags(node.element());
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        for (old, new) in &self.normalizations {
            tracing::debug!(old = %old, new = %new, "writing system tag normalized");
            ctx.decisions.record_tag_normalization(old, new);
        }
    }

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        fix_owner(node, ctx, log);
        normalize_tags(node, ctx.decisions, log);
        dedup_alternatives(node, log);
        reset_dates(node, log);
        prune_references(node, ctx, log);
        FixOutcome::Keep
    }
}

fn fix_owner(node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) {
    let guid = node.guid();
    let indexed = ctx.index.owner_of(guid);
    let Some(raw) = node.owner_attr().map(str::to_string) else {
        if let Some(owner) = indexed {
            node.set_owner(owner);
            let line = format!("Added missing owner {owner} to {} {guid}", node.class());
            log_now(log, guid, &line);
        }
        return;
    };

    let declared = raw.parse::<Guid>().ok();
    if declared.is_some() && declared == indexed {
        return;
    }
    // Owners that are being merged away are re-pointed by the merger itself.
    if declared.and_then(|d| ctx.decisions.redirect_of(d)).is_some() {
        return;
    }
    match indexed.filter(|o| ctx.index.is_known(*o)) {
        Some(owner) => {
            node.set_owner(owner);
            let line = format!(
                "Changed owner of {} {guid} from {raw} to {owner}, the node holding its owning reference",
                node.class()
            );
            log_now(log, guid, &line);
        }
        None => {
            node.clear_owner();
            let line = format!(
                "Removed owner {raw} from {} {guid}: no node holds an owning reference to it",
                node.class()
            );
            log_now(log, guid, &line);
        }
    }
}

fn normalize_tags(node: &mut Node, decisions: &Decisions, log: &mut dyn ChangeLogger) {
    if decisions.tag_normalizations().is_empty() {
        return;
    }
    let mut rewritten: BTreeMap<(String, String), usize> = BTreeMap::new();
    node.visit_elements_mut(&mut |e: &mut Element| {
        let Some(ws) = e.attr("ws") else {
            return;
        };
        if let Some(new) = decisions.normalized_tag(ws) {
            let key = (ws.to_string(), new.to_string());
            e.set_attr("ws", new);
            *rewritten.entry(key).or_insert(0) += 1;
        }
    });
    let guid = node.guid();
    for ((old, new), places) in rewritten {
        let line = format!(
            "Normalized writing system '{old}' to '{new}' in {} {guid} ({places} place(s))",
            node.class()
        );
        log_now(log, guid, &line);
    }
}

fn dedup_alternatives(node: &mut Node, log: &mut dyn ChangeLogger) {
    let mut removed = Vec::new();
    for prop in node.properties_mut() {
        let mut seen = HashSet::new();
        let dropped = prop.retain_elements(|alt| {
            if !ALTERNATIVE_ELEMENTS.contains(&alt.name.as_str()) {
                return true;
            }
            match alt.attr("ws") {
                Some(ws) => seen.insert(ws.to_string()),
                None => true,
            }
        });
        for alt in dropped {
            removed.push((prop.name.clone(), alt.attr("ws").unwrap_or("").to_string()));
        }
    }
    let guid = node.guid();
    for (prop, ws) in removed {
        let line = format!(
            "Removed duplicate '{ws}' alternative of {prop} in {} {guid}",
            node.class()
        );
        log_now(log, guid, &line);
    }
}

fn reset_dates(node: &mut Node, log: &mut dyn ChangeLogger) {
    let mut reset = Vec::new();
    for prop in node.properties_mut() {
        if !is_date_property(&prop.name) {
            continue;
        }
        let Some(value) = prop.attr("val") else {
            continue;
        };
        if parse_date(value).is_none() {
            reset.push((prop.name.clone(), value.to_string()));
            prop.set_attr("val", ZERO_DATE);
        }
    }
    let guid = node.guid();
    for (prop, old) in reset {
        let line = format!(
            "Reset unreadable {prop} '{old}' of {} {guid} to {ZERO_DATE}",
            node.class()
        );
        log_now(log, guid, &line);
    }
}

fn prune_references(node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) {
    let guid = node.guid();
    let class = node.class().to_string();
    let mut owned_here = HashSet::new();
    let mut lines = Vec::new();

    node.retain_references(|prop, sur| {
        let Some(target) = sur.target else {
            lines.push(format!("Removed malformed reference in {prop} of {class} {guid}"));
            return false;
        };
        if ctx.decisions.redirect_of(target).is_some() || ctx.decisions.is_claimed(guid, target) {
            return true;
        }
        if !ctx.index.is_known(target) {
            lines.push(format!(
                "Removed reference in {prop} of {class} {guid} to missing node {target}"
            ));
            return false;
        }
        if ctx.pending.contains(target) {
            lines.push(format!(
                "Removed reference in {prop} of {class} {guid} to deleted {}",
                ctx.describe(target)
            ));
            return false;
        }
        if sur.owning {
            match ctx.index.owner_of(target) {
                Some(owner) if owner != guid => {
                    lines.push(format!(
                        "Removed owning reference in {prop} of {class} {guid} to {}: already owned by {owner}",
                        ctx.describe(target)
                    ));
                    return false;
                }
                _ => {}
            }
            if !owned_here.insert(target) {
                lines.push(format!(
                    "Removed repeated owning reference in {prop} of {class} {guid} to {target}"
                ));
                return false;
            }
        }
        true
    });

    for line in lines {
        log_now(log, guid, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    fn run(doc: &str) -> crate::RepairedText {
        Pipeline::new(vec![Box::new(BaselineFixer::new())])
            .unwrap()
            .repair_str(doc)
            .unwrap()
    }

    #[test]
    fn dangling_reference_and_emptied_property_are_removed() {
        let out = run(r#"<languageproject>
<rt class="LexEntry" guid="00000000-0000-0000-0000-000000000001">
<Senses><objsur guid="00000000-0000-0000-0000-000000000009" t="o"/></Senses>
<MainEntriesOrSenses><objsur guid="00000000-0000-0000-0000-000000000001" t="r"/></MainEntriesOrSenses>
</rt>
</languageproject>"#);
        assert_eq!(out.log.len(), 1);
        assert!(out.log.entries()[0].description.contains("missing node"));
        assert!(!out.text.contains("<Senses>"));
        assert!(out.text.contains("<MainEntriesOrSenses>"));
    }

    #[test]
    fn owner_attribute_follows_owning_reference() {
        let out = run(r#"<languageproject>
<rt class="LexEntry" guid="00000000-0000-0000-0000-000000000001">
<Senses><objsur guid="00000000-0000-0000-0000-000000000002" t="o"/></Senses>
</rt>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000002" ownerguid="00000000-0000-0000-0000-000000000005"/>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000003" ownerguid="00000000-0000-0000-0000-000000000001"/>
</languageproject>"#);
        assert_eq!(out.log.len(), 2);
        assert!(out.text.contains(
            r#"guid="00000000-0000-0000-0000-000000000002" ownerguid="00000000-0000-0000-0000-000000000001""#
        ));
        assert!(out
            .text
            .contains(r#"<rt class="LexSense" guid="00000000-0000-0000-0000-000000000003"/>"#));
    }

    #[test]
    fn second_owner_loses_its_reference() {
        let out = run(r#"<languageproject>
<rt class="LexEntry" guid="00000000-0000-0000-0000-000000000001">
<Senses><objsur guid="00000000-0000-0000-0000-000000000003" t="o"/></Senses>
</rt>
<rt class="LexEntry" guid="00000000-0000-0000-0000-000000000002">
<Senses><objsur guid="00000000-0000-0000-0000-000000000003" t="o"/><objsur guid="00000000-0000-0000-0000-000000000004" t="o"/></Senses>
</rt>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000003" ownerguid="00000000-0000-0000-0000-000000000001"/>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000004" ownerguid="00000000-0000-0000-0000-000000000002"/>
</languageproject>"#);
        assert_eq!(out.report.conflicts.len(), 1);
        assert_eq!(out.log.len(), 1);
        assert!(out.log.entries()[0].description.contains("already owned by"));
        assert_eq!(out.text.matches(r#"guid="00000000-0000-0000-0000-000000000003" t="o""#).count(), 1);
    }

    #[test]
    fn tags_dates_and_duplicate_alternatives() {
        let out = run(r#"<languageproject>
<rt class="LexSense" guid="00000000-0000-0000-0000-000000000001">
<Gloss><AUni ws="en_US">rope</AUni><AUni ws="en-US">cord</AUni><AUni ws="fr">corde</AUni></Gloss>
<DateModified val="yesterday"/>
<DateCreated val="2011-2-2 19:39:28.829"/>
</rt>
</languageproject>"#);
        assert!(out.text.contains(r#"<AUni ws="en-US">rope</AUni>"#));
        assert!(!out.text.contains("cord"));
        assert!(out.text.contains(r#"<DateModified val="0001-01-01 00:00:00.000"/>"#));
        assert!(out.text.contains("2011-2-2 19:39:28.829"));
        assert_eq!(out.report.tag_normalizations.get("en_US").map(String::as_str), Some("en-US"));
        assert_eq!(out.log.len(), 3);

        let again = run(&out.text);
        assert!(again.log.is_empty());
    }
}

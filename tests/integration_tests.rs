//! Integration tests for the complete repair pipeline
//!
//! A small project carrying the typical damage of an offline merge is
//! written to disk and repaired in place; the result is read back and
//! checked node by node:
//! - every surviving reference resolves, every owned node has one owner
//! - deleted owners take their owned nodes with them
//! - homographs, duplicate wordforms, unused analyses, emptied chart rows
//! - a second run finds nothing to do
//!
//! Run with: cargo test --test integration_tests

use mendgraph_engine::NullProgress;
use mendgraph_model::{DocumentReader, Guid, Node, Record};
use mendgraph_storage::{repair_file, RepairConfig, RepairOutcome};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Fixture
// ============================================================================

const PROJECT: u128 = 0x01;
const STEM: u128 = 0x02;

const STYLE_A: u128 = 0x11;
const STYLE_B: u128 = 0x12;
const LIST_A: u128 = 0x21;
const LIST_B: u128 = 0x22;

const ENTRY_1: u128 = 0x101;
const ENTRY_2: u128 = 0x102;
const ENTRY_3: u128 = 0x103;
const FORM_1: u128 = 0x111;
const FORM_2: u128 = 0x112;
const FORM_3: u128 = 0x113;
const SENSE_1: u128 = 0x121;
const SENSE_3: u128 = 0x123;
const MSA_USED: u128 = 0x131;
const MSA_UNUSED: u128 = 0x132;
const MISSING: u128 = 0xdead;

const WORDFORM_1: u128 = 0x201;
const WORDFORM_2: u128 = 0x202;
const ANALYSIS_1: u128 = 0x211;
const ANALYSIS_2: u128 = 0x212;
const SEGMENT: u128 = 0x301;

const CHART: u128 = 0x401;
const ROW_EMPTIED: u128 = 0x411;
const ROW_KEPT: u128 = 0x412;
const GROUP_LOST: u128 = 0x421;
const GROUP_KEPT: u128 = 0x422;
const SEGMENT_GONE_A: u128 = 0x431;
const SEGMENT_GONE_B: u128 = 0x432;

fn g(n: u128) -> Guid {
    Guid::from_u128(n)
}

fn o(n: u128) -> String {
    format!(r#"<objsur guid="{}" t="o"/>"#, g(n))
}

fn r(n: u128) -> String {
    format!(r#"<objsur guid="{}" t="r"/>"#, g(n))
}

fn rt(class: &str, guid: u128, owner: Option<u128>, body: &str) -> String {
    let owner = owner.map(|o| format!(r#" ownerguid="{}""#, g(o))).unwrap_or_default();
    if body.is_empty() {
        format!("<rt class=\"{class}\" guid=\"{}\"{owner}/>\n", g(guid))
    } else {
        format!("<rt class=\"{class}\" guid=\"{}\"{owner}>\n{body}\n</rt>\n", g(guid))
    }
}

fn allomorph(guid: u128, entry: u128, form: &str) -> String {
    rt(
        "MoStemAllomorph",
        guid,
        Some(entry),
        &format!(
            "<Form><AUni ws=\"seh\">{form}</AUni></Form>\n<MorphType>{}</MorphType>",
            r(STEM)
        ),
    )
}

/// One project with the damage of a merge of two offline copies.
fn merged_project() -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<languageproject version=\"7000072\">\n");

    doc += &rt(
        "LangProject",
        PROJECT,
        None,
        &format!(
            "<Styles>\n{}\n{}\n</Styles>\n<Lists>\n{}\n{}\n</Lists>",
            o(STYLE_A),
            o(STYLE_B),
            o(LIST_A),
            o(LIST_B)
        ),
    );
    doc += &rt("MoMorphType", STEM, None, "");
    // Both copies added the same style and the same list.
    for style in [STYLE_A, STYLE_B] {
        doc += &rt("StStyle", style, Some(PROJECT), "<Name><Uni>Emphasis</Uni></Name>");
    }
    for list in [LIST_A, LIST_B] {
        doc += &rt(
            "CmPossibilityList",
            list,
            Some(PROJECT),
            "<Name><AUni ws=\"en\">Places</AUni></Name>",
        );
    }

    // Both copies added "kamba" as a new entry; neither numbered it.
    doc += &rt(
        "LexEntry",
        ENTRY_1,
        None,
        &format!(
            "<HomographNumber val=\"0\"/>\n<LexemeForm>{}</LexemeForm>\n<MorphoSyntaxAnalyses>\n{}\n{}\n</MorphoSyntaxAnalyses>\n<Senses>{}</Senses>",
            o(FORM_1),
            o(MSA_USED),
            o(MSA_UNUSED),
            o(SENSE_1)
        ),
    );
    doc += &allomorph(FORM_1, ENTRY_1, "kamba");
    doc += &rt("MoStemMsa", MSA_USED, Some(ENTRY_1), "");
    doc += &rt("MoStemMsa", MSA_UNUSED, Some(ENTRY_1), "");
    doc += &rt(
        "LexSense",
        SENSE_1,
        Some(ENTRY_1),
        &format!("<MorphoSyntaxAnalysis>{}</MorphoSyntaxAnalysis>", r(MSA_USED)),
    );
    doc += &rt(
        "LexEntry",
        ENTRY_2,
        None,
        &format!("<HomographNumber val=\"0\"/>\n<LexemeForm>{}</LexemeForm>", o(FORM_2)),
    );
    doc += &allomorph(FORM_2, ENTRY_2, "kamba");

    // An unrelated entry that picked up a deleted sense and someone else's.
    doc += &rt(
        "LexEntry",
        ENTRY_3,
        None,
        &format!(
            "<HomographNumber val=\"0\"/>\n<LexemeForm>{}</LexemeForm>\n<Senses>\n{}\n{}\n{}\n</Senses>",
            o(FORM_3),
            o(SENSE_3),
            o(MISSING),
            o(SENSE_1)
        ),
    );
    doc += &allomorph(FORM_3, ENTRY_3, "nyumba");
    doc += &rt("LexSense", SENSE_3, Some(ENTRY_3), "");

    // Both copies parsed the same word.
    for (wordform, analysis) in [(WORDFORM_1, ANALYSIS_1), (WORDFORM_2, ANALYSIS_2)] {
        doc += &rt(
            "WfiWordform",
            wordform,
            None,
            &format!(
                "<Form><AUni ws=\"seh\">kamba</AUni></Form>\n<Analyses>{}</Analyses>",
                o(analysis)
            ),
        );
        doc += &rt("WfiAnalysis", analysis, Some(wordform), "");
    }
    doc += &rt("Segment", SEGMENT, None, &format!("<Analyses>{}</Analyses>", r(WORDFORM_2)));

    // One side deleted the text a chart row was built on.
    doc += &rt(
        "DsConstChart",
        CHART,
        None,
        &format!("<Rows>\n{}\n{}\n</Rows>", o(ROW_EMPTIED), o(ROW_KEPT)),
    );
    doc += &rt("ConstChartRow", ROW_EMPTIED, Some(CHART), &format!("<Cells>{}</Cells>", o(GROUP_LOST)));
    doc += &rt("ConstChartRow", ROW_KEPT, Some(CHART), &format!("<Cells>{}</Cells>", o(GROUP_KEPT)));
    doc += &rt(
        "ConstChartWordGroup",
        GROUP_LOST,
        Some(ROW_EMPTIED),
        &format!(
            "<BeginSegment>{}</BeginSegment>\n<EndSegment>{}</EndSegment>",
            r(SEGMENT_GONE_A),
            r(SEGMENT_GONE_B)
        ),
    );
    doc += &rt(
        "ConstChartWordGroup",
        GROUP_KEPT,
        Some(ROW_KEPT),
        &format!(
            "<BeginSegment>{}</BeginSegment>\n<EndSegment>{}</EndSegment>",
            r(SEGMENT),
            r(SEGMENT)
        ),
    );

    doc += "</languageproject>\n";
    doc
}

// ============================================================================
// Helpers
// ============================================================================

struct Repaired {
    _dir: TempDir,
    path: PathBuf,
    outcome: RepairOutcome,
    nodes: HashMap<Guid, Node>,
}

impl Repaired {
    fn node(&self, n: u128) -> &Node {
        self.nodes
            .get(&g(n))
            .unwrap_or_else(|| panic!("{} should survive", g(n)))
    }

    fn survives(&self, n: u128) -> bool {
        self.nodes.contains_key(&g(n))
    }
}

fn read_nodes(text: &str) -> HashMap<Guid, Node> {
    let mut reader = DocumentReader::new(text.as_bytes()).expect("repaired document parses");
    let mut nodes = HashMap::new();
    while let Some(record) = reader.next_record().unwrap() {
        if let Record::Node(node) = record {
            nodes.insert(node.guid(), node);
        }
    }
    nodes
}

fn repair_merged() -> Repaired {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sena.fwdata");
    fs::write(&path, merged_project()).unwrap();
    let outcome = repair_file(&path, &RepairConfig::default(), &mut NullProgress).unwrap();
    let nodes = read_nodes(&fs::read_to_string(&path).unwrap());
    Repaired {
        _dir: dir,
        path,
        outcome,
        nodes,
    }
}

// ============================================================================
// Graph-wide properties
// ============================================================================

#[test]
fn test_every_surviving_reference_resolves() {
    let repaired = repair_merged();
    for node in repaired.nodes.values() {
        for (prop, s) in node.references() {
            let target = s.target.expect("well-formed reference");
            assert!(
                repaired.nodes.contains_key(&target),
                "{} {} {prop} -> {target}",
                node.class(),
                node.guid()
            );
        }
    }
}

#[test]
fn test_each_owned_node_has_exactly_one_owning_reference() {
    let repaired = repair_merged();
    let mut holders: HashMap<Guid, Vec<Guid>> = HashMap::new();
    for node in repaired.nodes.values() {
        for child in node.owning_targets() {
            holders.entry(child).or_default().push(node.guid());
        }
    }
    for node in repaired.nodes.values() {
        match node.owner() {
            Some(owner) => assert_eq!(holders.get(&node.guid()), Some(&vec![owner]), "{}", node.guid()),
            None => assert!(!holders.contains_key(&node.guid()), "{}", node.guid()),
        }
    }
}

#[test]
fn test_exactly_the_damaged_nodes_are_deleted() {
    let repaired = repair_merged();
    let before: HashSet<Guid> = read_nodes(&merged_project()).into_keys().collect();
    let after: HashSet<Guid> = repaired.nodes.keys().copied().collect();
    let deleted: HashSet<Guid> = before.difference(&after).copied().collect();

    let expected: HashSet<Guid> = [MSA_UNUSED, WORDFORM_2, ROW_EMPTIED, GROUP_LOST, STYLE_B]
        .into_iter()
        .map(g)
        .collect();
    assert_eq!(deleted, expected);
    assert_eq!(repaired.outcome.report.nodes_deleted, expected.len() as u64);
    for guid in &expected {
        assert!(repaired.outcome.log.mentions(*guid), "{guid} deleted silently");
    }
}

#[test]
fn test_second_run_changes_nothing() {
    let repaired = repair_merged();
    let first = fs::read_to_string(&repaired.path).unwrap();

    let again = repair_file(&repaired.path, &RepairConfig::default(), &mut NullProgress).unwrap();

    assert!(again.is_clean(), "{:?}", again.log.entries());
    assert!(again.backup.is_none());
    assert_eq!(fs::read_to_string(&repaired.path).unwrap(), first);
}

// ============================================================================
// Individual repairs
// ============================================================================

#[test]
fn test_homographs_numbered_in_first_seen_order() {
    let repaired = repair_merged();
    assert_eq!(repaired.node(ENTRY_1).int_val("HomographNumber"), Some(1));
    assert_eq!(repaired.node(ENTRY_2).int_val("HomographNumber"), Some(2));
    assert_eq!(repaired.node(ENTRY_3).int_val("HomographNumber"), Some(0));
}

#[test]
fn test_duplicate_wordform_merged_and_segment_redirected() {
    let repaired = repair_merged();
    assert!(!repaired.survives(WORDFORM_2));
    assert_eq!(
        repaired.node(WORDFORM_1).reference_targets("Analyses"),
        vec![g(ANALYSIS_1), g(ANALYSIS_2)]
    );
    assert_eq!(repaired.node(ANALYSIS_2).owner(), Some(g(WORDFORM_1)));
    assert_eq!(repaired.node(SEGMENT).reference_targets("Analyses"), vec![g(WORDFORM_1)]);
}

#[test]
fn test_only_referenced_analyses_survive() {
    let repaired = repair_merged();
    assert_eq!(
        repaired.node(ENTRY_1).reference_targets("MorphoSyntaxAnalyses"),
        vec![g(MSA_USED)]
    );
    assert_eq!(
        repaired.node(SENSE_1).reference_target("MorphoSyntaxAnalysis"),
        Some(g(MSA_USED))
    );
}

#[test]
fn test_emptied_chart_row_goes_with_the_chart_reference() {
    let repaired = repair_merged();
    assert!(!repaired.survives(ROW_EMPTIED));
    assert!(!repaired.survives(GROUP_LOST));
    assert_eq!(repaired.node(CHART).reference_targets("Rows"), vec![g(ROW_KEPT)]);
    assert_eq!(repaired.node(ROW_KEPT).reference_targets("Cells"), vec![g(GROUP_KEPT)]);
}

#[test]
fn test_second_owner_and_dangling_sense_dropped() {
    let repaired = repair_merged();
    assert_eq!(repaired.node(ENTRY_3).reference_targets("Senses"), vec![g(SENSE_3)]);
    assert_eq!(repaired.node(SENSE_1).owner(), Some(g(ENTRY_1)));
    assert!(!repaired.outcome.report.conflicts.is_empty());
}

#[test]
fn test_sibling_duplicates_resolved() {
    let repaired = repair_merged();
    assert!(!repaired.survives(STYLE_B));
    assert_eq!(
        repaired.node(PROJECT).reference_targets("Styles"),
        vec![g(STYLE_A)]
    );
    assert_eq!(
        repaired.node(LIST_B).first_alternative("Name"),
        Some(("en".to_string(), "Places (2)".to_string()))
    );
}

// ============================================================================
// Side effects
// ============================================================================

#[test]
fn test_backup_holds_the_original_and_fixlog_lists_every_change() {
    let repaired = repair_merged();
    let config = RepairConfig::default();

    assert_eq!(
        fs::read_to_string(config.backup_path(&repaired.path)).unwrap(),
        merged_project()
    );

    let log = fs::read_to_string(config.log_path(&repaired.path)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), repaired.outcome.log.len());
    assert_eq!(lines.len(), repaired.outcome.report.changes);
    for line in lines {
        let mut parts = line.splitn(3, ' ');
        let guid = parts.next().unwrap();
        let date = parts.next().unwrap();
        let description = parts.next().unwrap();
        assert!(guid.parse::<Guid>().is_ok(), "{line}");
        assert!(date.contains('T'), "{line}");
        assert!(!description.is_empty());
    }
}

#[test]
fn test_changes_are_attributed_to_their_fixers() {
    let repaired = repair_merged();
    let by_fixer = &repaired.outcome.report.changes_by_fixer;
    for fixer in ["baseline", "unused-analysis", "homograph", "wordform-merger", "empty-sequence", "duplicate-list-name", "deletions"] {
        assert!(by_fixer.get(fixer).copied().unwrap_or(0) > 0, "{fixer}: {by_fixer:?}");
    }
    assert_eq!(by_fixer.values().sum::<usize>(), repaired.outcome.report.changes);
}

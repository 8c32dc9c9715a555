//! Class tags the repair policies care about, plus the slice of the class
//! hierarchy needed to resolve custom-field declarations made on an abstract
//! superclass.

pub const LEX_ENTRY: &str = "LexEntry";
pub const LEX_SENSE: &str = "LexSense";
pub const MO_STEM_ALLOMORPH: &str = "MoStemAllomorph";
pub const MO_AFFIX_ALLOMORPH: &str = "MoAffixAllomorph";
pub const WFI_WORDFORM: &str = "WfiWordform";
pub const WFI_ANALYSIS: &str = "WfiAnalysis";
pub const WFI_MORPH_BUNDLE: &str = "WfiMorphBundle";
pub const SEGMENT: &str = "Segment";
pub const DS_CONST_CHART: &str = "DsConstChart";
pub const CONST_CHART_ROW: &str = "ConstChartRow";
pub const CONST_CHART_WORD_GROUP: &str = "ConstChartWordGroup";
pub const CONST_CHART_CLAUSE_MARKER: &str = "ConstChartClauseMarker";
pub const PH_SEQUENCE_CONTEXT: &str = "PhSequenceContext";
pub const ST_STYLE: &str = "StStyle";
pub const CM_POSSIBILITY_LIST: &str = "CmPossibilityList";

/// Concrete grammatical-analysis (MSA) classes owned by entries.
pub const ANALYSIS_CLASSES: &[&str] = &[
    "MoStemMsa",
    "MoInflAffMsa",
    "MoDerivAffMsa",
    "MoDerivStepMsa",
    "MoUnclassifiedAffixMsa",
];

/// `(class, direct superclass)` pairs. Classes not listed derive directly
/// from `CmObject`.
const SUPERCLASSES: &[(&str, &str)] = &[
    ("MoStemMsa", "MoMorphSynAnalysis"),
    ("MoInflAffMsa", "MoMorphSynAnalysis"),
    ("MoDerivAffMsa", "MoMorphSynAnalysis"),
    ("MoDerivStepMsa", "MoMorphSynAnalysis"),
    ("MoUnclassifiedAffixMsa", "MoMorphSynAnalysis"),
    ("MoStemAllomorph", "MoForm"),
    ("MoAffixAllomorph", "MoAffixForm"),
    ("MoAffixProcess", "MoAffixForm"),
    ("MoAffixForm", "MoForm"),
    ("CmCustomItem", "CmPossibility"),
    ("CmSemanticDomain", "CmPossibility"),
    ("CmAnthroItem", "CmPossibility"),
    ("CmPerson", "CmPossibility"),
    ("CmLocation", "CmPossibility"),
    ("PartOfSpeech", "CmPossibility"),
    ("MoMorphType", "CmPossibility"),
    ("LexEntryType", "CmPossibility"),
    ("LexRefType", "CmPossibility"),
    ("ConstChartWordGroup", "ConstituentChartCellPart"),
    ("ConstChartMovedTextMarker", "ConstituentChartCellPart"),
    ("ConstChartClauseMarker", "ConstituentChartCellPart"),
    ("ConstChartTag", "ConstituentChartCellPart"),
    ("PhSequenceContext", "PhContextOrVar"),
    ("PhSimpleContextSeg", "PhPhonContext"),
    ("PhPhonContext", "PhContextOrVar"),
    ("StText", "CmObject"),
];

pub const ROOT_CLASS: &str = "CmObject";

pub fn superclass(class: &str) -> Option<&'static str> {
    if class == ROOT_CLASS {
        return None;
    }
    Some(
        SUPERCLASSES
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, sup)| *sup)
            .unwrap_or(ROOT_CLASS),
    )
}

/// True when `class` is `ancestor` or derives from it.
pub fn is_a(class: &str, ancestor: &str) -> bool {
    if class == ancestor || ancestor == ROOT_CLASS {
        return true;
    }
    let mut current = class;
    while let Some(sup) = superclass(current) {
        if sup == ancestor {
            return true;
        }
        current = sup;
    }
    false
}

pub fn is_analysis(class: &str) -> bool {
    is_a(class, "MoMorphSynAnalysis")
}

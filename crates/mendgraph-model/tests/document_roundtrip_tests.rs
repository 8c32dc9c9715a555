use mendgraph_model::{
    CustomFieldKind, DocumentError, DocumentReader, DocumentWriter, Guid, Record,
};

const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<languageproject version="7000072">
  <AdditionalFields>
    <CustomField class="LexEntry" name="Rank" type="Integer" />
    <CustomField class="MoForm" name="Note" type="String" wsSelector="-1" />
  </AdditionalFields>
  <rt class="LexEntry" guid="6D2C0C8C-0000-4000-8000-000000000001">
    <HomographNumber val="0" />
    <LexemeForm>
      <objsur guid="6d2c0c8c-0000-4000-8000-000000000002" t="o" />
    </LexemeForm>
    <Custom name="Rank" val="3" />
  </rt>
  <rt class="MoStemAllomorph" guid="6d2c0c8c-0000-4000-8000-000000000002" ownerguid="6d2c0c8c-0000-4000-8000-000000000001">
    <Form>
      <AUni ws="seh">kamba</AUni>
    </Form>
    <Comment><AStr ws="en"><Run ws="en">a </Run><Run ws="en" namedStyle="Emphasis">rope</Run></AStr></Comment>
  </rt>
  <ProjectSettings scope="all"><![CDATA[raw <settings>]]></ProjectSettings>
</languageproject>
"#;

fn read_all(text: &str) -> (mendgraph_model::DocumentHeader, Vec<Record>) {
    let mut reader = DocumentReader::new(text.as_bytes()).expect("header");
    let mut records = Vec::new();
    while let Some(r) = reader.next_record().expect("record") {
        records.push(r);
    }
    (reader.header().clone(), records)
}

#[test]
fn project_reads_into_header_nodes_and_pass_through() {
    let (header, records) = read_all(PROJECT);
    assert_eq!(header.custom_fields.len(), 2);
    assert_eq!(header.custom_fields[1].kind, CustomFieldKind::String);
    assert_eq!(records.len(), 3);

    let Record::Node(entry) = &records[0] else {
        panic!("first record is a node");
    };
    // Identities are case-insensitive on input.
    assert_eq!(
        entry.guid(),
        "6d2c0c8c-0000-4000-8000-000000000001".parse::<Guid>().unwrap()
    );
    assert_eq!(entry.int_val("HomographNumber"), Some(0));
    assert_eq!(entry.custom_names(), vec!["Rank".to_string()]);

    let Record::Node(allo) = &records[1] else {
        panic!("second record is a node");
    };
    assert_eq!(allo.first_alternative("Form"), Some(("seh".into(), "kamba".into())));
    assert_eq!(allo.alternatives("Comment")[0].1, "a rope");

    let Record::Other(settings) = &records[2] else {
        panic!("third record passes through");
    };
    assert_eq!(settings.text(), "raw <settings>");
}

#[test]
fn rewrite_preserves_every_record() {
    let (header, records) = read_all(PROJECT);

    let mut writer = DocumentWriter::new(Vec::new(), &header).expect("writer");
    for r in &records {
        match r {
            Record::Node(n) => writer.write_node(n).expect("node"),
            Record::Other(e) => writer.write_element(e).expect("element"),
        }
    }
    assert_eq!(writer.nodes_written(), 2);
    let out = String::from_utf8(writer.finish().expect("finish")).expect("utf8");

    let (header2, records2) = read_all(&out);
    assert_eq!(header2, header);
    assert_eq!(records2, records);

    // A second rewrite is byte-identical to the first.
    let mut writer = DocumentWriter::new(Vec::new(), &header2).expect("writer");
    for r in &records2 {
        match r {
            Record::Node(n) => writer.write_node(n).expect("node"),
            Record::Other(e) => writer.write_element(e).expect("element"),
        }
    }
    let again = String::from_utf8(writer.finish().expect("finish")).expect("utf8");
    assert_eq!(again, out);
}

#[test]
fn malformed_xml_reports_position() {
    let doc = "<languageproject>\n<rt class=\"LexEntry\" guid=\"00000000-0000-0000-0000-000000000001\">\n</wrong>\n</languageproject>";
    let mut reader = match DocumentReader::new(doc.as_bytes()) {
        Ok(r) => r,
        Err(err) => {
            assert!(matches!(err, DocumentError::Xml { .. }), "{err}");
            return;
        }
    };
    let err = reader.next_record().expect_err("mismatched end tag");
    assert!(matches!(err, DocumentError::Xml { .. }), "{err}");
}

#[test]
fn invalid_guid_is_rejected() {
    let doc = r#"<languageproject><rt class="LexEntry" guid="not-a-guid"/></languageproject>"#;
    let err = DocumentReader::new(doc.as_bytes()).err().expect("invalid guid");
    assert!(matches!(err, DocumentError::InvalidGuid { .. }), "{err}");
}

#[test]
fn empty_root_has_no_records() {
    let mut reader = DocumentReader::new(r#"<languageproject version="1"/>"#.as_bytes()).unwrap();
    assert!(reader.header().additional_fields.is_none());
    assert!(reader.next_record().unwrap().is_none());
}
